//! Deterministic key derivation from PUF responses.
//!
//! The response bytes are hashed with SHA-256, the digest is read as a
//! big-endian integer and reduced modulo the curve order.  A zero result is
//! rejected with [`PufError::InvalidScalar`] rather than re-hashed; the odds
//! of hitting it are about 2^-256.  The same response on the same curve always
//! yields the same key pair, so the key never has to be stored: whoever holds
//! the device can derive it again.

use std::fmt;
use std::str::FromStr;

use k256::elliptic_curve::ops::Reduce;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::error::PufError;

/// Named curves a key can be derived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    /// NIST P-256 (SECP256R1), the canonical choice.
    #[default]
    P256,
    /// SECP256K1, as used by Ethereum-style ledgers.
    Secp256k1,
}

impl Curve {
    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Curve::P256 => "p256",
            Curve::Secp256k1 => "secp256k1",
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Curve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p256" | "p-256" | "secp256r1" | "prime256v1" => Ok(Curve::P256),
            "secp256k1" | "k256" => Ok(Curve::Secp256k1),
            other => Err(format!("unsupported curve: {other}")),
        }
    }
}

#[derive(Clone)]
pub(crate) enum SigningInner {
    P256(p256::ecdsa::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum VerifyingInner {
    P256(p256::ecdsa::VerifyingKey),
    Secp256k1(k256::ecdsa::VerifyingKey),
}

/// Public half of a derived key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingInner,
}

impl PublicKey {
    /// Parses a SEC1 point (compressed or uncompressed) on `curve`.
    pub fn from_sec1_bytes(curve: Curve, bytes: &[u8]) -> Result<Self, PufError> {
        let inner = match curve {
            Curve::P256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes).map(VerifyingInner::P256),
            Curve::Secp256k1 => {
                k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes).map(VerifyingInner::Secp256k1)
            }
        }
        .map_err(|err| PufError::MalformedKey(format!("{curve} public key: {err}")))?;
        Ok(Self { inner })
    }

    /// Parses a hex-encoded SEC1 point on `curve`.
    pub fn from_hex(curve: Curve, input: &str) -> Result<Self, PufError> {
        let bytes = hex::decode(input.trim().trim_start_matches("0x"))
            .map_err(|err| PufError::MalformedKey(err.to_string()))?;
        Self::from_sec1_bytes(curve, &bytes)
    }

    /// Curve the point lives on.
    pub fn curve(&self) -> Curve {
        match self.inner {
            VerifyingInner::P256(_) => Curve::P256,
            VerifyingInner::Secp256k1(_) => Curve::Secp256k1,
        }
    }

    /// Uncompressed X9.62 encoding, `0x04 || X || Y`.
    pub fn to_uncompressed(&self) -> Vec<u8> {
        self.encode(false)
    }

    /// Compressed SEC1 encoding.
    pub fn to_compressed(&self) -> Vec<u8> {
        self.encode(true)
    }

    /// Hex of the uncompressed encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_uncompressed())
    }

    /// Ethereum-style address: the last 20 bytes of Keccak-256 over `X || Y`.
    pub fn ledger_address(&self) -> String {
        let point = self.to_uncompressed();
        let digest = Keccak256::digest(&point[1..]);
        format!("0x{}", hex::encode(&digest[12..]))
    }

    pub(crate) fn inner(&self) -> &VerifyingInner {
        &self.inner
    }

    fn encode(&self, compress: bool) -> Vec<u8> {
        match &self.inner {
            VerifyingInner::P256(vk) => vk.to_encoded_point(compress).as_bytes().to_vec(),
            VerifyingInner::Secp256k1(vk) => vk.to_encoded_point(compress).as_bytes().to_vec(),
        }
    }
}

/// Key pair derived from a PUF response.
///
/// The private scalar is wiped when the key is dropped.
#[derive(Clone)]
pub struct DerivedKey {
    signing: SigningInner,
    public: PublicKey,
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("curve", &self.curve())
            .field("public_key", &self.public.to_hex())
            .finish_non_exhaustive()
    }
}

impl DerivedKey {
    /// Builds the key whose scalar is `digest` reduced modulo the curve order.
    pub fn from_digest(digest: &[u8; 32], curve: Curve) -> Result<Self, PufError> {
        let signing = match curve {
            Curve::P256 => {
                let bytes = p256::FieldBytes::from(*digest);
                let scalar = <p256::Scalar as Reduce<p256::U256>>::reduce_bytes(&bytes);
                let secret: Option<p256::NonZeroScalar> = p256::NonZeroScalar::new(scalar).into();
                SigningInner::P256(p256::ecdsa::SigningKey::from(
                    secret.ok_or(PufError::InvalidScalar)?,
                ))
            }
            Curve::Secp256k1 => {
                let bytes = k256::FieldBytes::from(*digest);
                let scalar = <k256::Scalar as Reduce<k256::U256>>::reduce_bytes(&bytes);
                let secret: Option<k256::NonZeroScalar> = k256::NonZeroScalar::new(scalar).into();
                SigningInner::Secp256k1(k256::ecdsa::SigningKey::from(
                    secret.ok_or(PufError::InvalidScalar)?,
                ))
            }
        };
        let public = PublicKey {
            inner: match &signing {
                SigningInner::P256(sk) => VerifyingInner::P256(sk.verifying_key().clone()),
                SigningInner::Secp256k1(sk) => VerifyingInner::Secp256k1(sk.verifying_key().clone()),
            },
        };
        Ok(Self { signing, public })
    }

    /// Curve of the key pair.
    pub fn curve(&self) -> Curve {
        self.public.curve()
    }

    /// Public key paired with the private scalar.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Private scalar as 32 big-endian bytes.
    pub fn private_key_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        match &self.signing {
            SigningInner::P256(sk) => out.copy_from_slice(&sk.to_bytes()),
            SigningInner::Secp256k1(sk) => out.copy_from_slice(&sk.to_bytes()),
        }
        out
    }

    /// Hex of [`private_key_bytes`](Self::private_key_bytes).
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.private_key_bytes())
    }

    pub(crate) fn signing(&self) -> &SigningInner {
        &self.signing
    }
}

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// Derives the key pair for `response_bytes` on `curve`.
pub fn derive_private_key(
    response_bytes: impl AsRef<[u8]>,
    curve: Curve,
) -> Result<DerivedKey, PufError> {
    let digest = sha256(response_bytes.as_ref());
    let key = DerivedKey::from_digest(&digest, curve)?;
    tracing::debug!(
        curve = %curve,
        public_key = %key.public_key().to_hex(),
        "derived key from response"
    );
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::elliptic_curve::group::Curve as _;
    use k256::elliptic_curve::sec1::ToEncodedPoint;

    const P256_ORDER: &str = "ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551";
    const K256_ORDER: &str = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";

    fn order(hex_str: &str) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&hex::decode(hex_str).unwrap());
        out
    }

    #[test]
    fn derivation_is_deterministic() {
        for curve in [Curve::P256, Curve::Secp256k1] {
            let a = derive_private_key(b"response", curve).unwrap();
            let b = derive_private_key(b"response", curve).unwrap();
            assert_eq!(a.private_key_bytes(), b.private_key_bytes());
            assert_eq!(a.public_key(), b.public_key());
            assert_eq!(a.curve(), curve);
        }
    }

    #[test]
    fn small_digest_is_used_verbatim() {
        let digest = sha256(b"abc");
        // 0xba78... is below both orders, so no reduction happens.
        let key = derive_private_key(b"abc", Curve::P256).unwrap();
        assert_eq!(key.private_key_bytes(), digest);
    }

    #[test]
    fn order_reduces_to_zero_and_is_rejected() {
        assert_eq!(
            DerivedKey::from_digest(&order(P256_ORDER), Curve::P256).unwrap_err(),
            PufError::InvalidScalar
        );
        assert_eq!(
            DerivedKey::from_digest(&order(K256_ORDER), Curve::Secp256k1).unwrap_err(),
            PufError::InvalidScalar
        );
    }

    #[test]
    fn digest_above_order_wraps() {
        let key = DerivedKey::from_digest(&[0xff; 32], Curve::P256).unwrap();
        let private = key.private_key_bytes();
        assert!(private < order(P256_ORDER));
        // 2^256 - 1 - n
        assert_eq!(
            hex::encode(private),
            "00000000ffffffff00000000000000004319055258e8617b0c46353d039cdaae"
        );
    }

    #[test]
    fn public_key_is_generator_multiple() {
        let key = derive_private_key(b"generator check", Curve::P256).unwrap();
        let secret = p256::NonZeroScalar::try_from(&key.private_key_bytes()[..]).unwrap();
        let point = (p256::ProjectivePoint::GENERATOR * *secret).to_affine();
        assert_eq!(
            point.to_encoded_point(false).as_bytes(),
            key.public_key().to_uncompressed().as_slice()
        );

        let key = derive_private_key(b"generator check", Curve::Secp256k1).unwrap();
        let secret = k256::NonZeroScalar::try_from(&key.private_key_bytes()[..]).unwrap();
        let point = (k256::ProjectivePoint::GENERATOR * *secret).to_affine();
        assert_eq!(
            point.to_encoded_point(false).as_bytes(),
            key.public_key().to_uncompressed().as_slice()
        );
    }

    #[test]
    fn public_key_encodings_parse_back() {
        let key = derive_private_key(b"encodings", Curve::P256).unwrap();
        let public = key.public_key();
        assert_eq!(public.to_uncompressed().len(), 65);
        assert_eq!(public.to_uncompressed()[0], 0x04);
        assert_eq!(public.to_compressed().len(), 33);
        assert_eq!(&PublicKey::from_hex(Curve::P256, &public.to_hex()).unwrap(), public);
        assert_eq!(
            &PublicKey::from_sec1_bytes(Curve::P256, &public.to_compressed()).unwrap(),
            public
        );
        assert!(matches!(
            PublicKey::from_hex(Curve::P256, "04dead"),
            Err(PufError::MalformedKey(_))
        ));
    }

    #[test]
    fn ledger_address_shape() {
        let key = derive_private_key(b"address", Curve::Secp256k1).unwrap();
        let address = key.public_key().ledger_address();
        assert!(address.starts_with("0x"));
        assert_eq!(address.len(), 42);
    }

    #[test]
    fn curve_names_parse() {
        assert_eq!("secp256r1".parse::<Curve>().unwrap(), Curve::P256);
        assert_eq!("P256".parse::<Curve>().unwrap(), Curve::P256);
        assert_eq!("k256".parse::<Curve>().unwrap(), Curve::Secp256k1);
        assert!("ed25519".parse::<Curve>().is_err());
        assert_eq!(Curve::Secp256k1.to_string(), "secp256k1");
    }

    #[test]
    fn debug_hides_private_scalar() {
        let key = derive_private_key(b"debug", Curve::P256).unwrap();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains(&key.private_key_hex()));
    }
}
