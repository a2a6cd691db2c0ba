//! ECDSA signing with derived keys.
//!
//! Messages are hashed with SHA-256 first and the 32-byte digest is what gets
//! signed.  The ECDSA-SHA256 scheme then hashes that digest once more as part
//! of its own convention, so a signature here verifies with any standard
//! ECDSA-SHA256 verifier given `SHA-256(message)` as the payload.

use std::fmt;
use std::str::FromStr;

use p256::ecdsa::signature::{RandomizedSigner, Signer, Verifier};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::PufError;
use crate::kdf::{sha256, Curve, DerivedKey, PublicKey, SigningInner, VerifyingInner};

/// How the per-signature nonce is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceMode {
    /// RFC 6979 hedged with fresh OS entropy; repeated signatures differ.
    #[default]
    Random,
    /// Plain RFC 6979; the same key and message always give the same bytes.
    Deterministic,
}

impl fmt::Display for NonceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonceMode::Random => f.write_str("random"),
            NonceMode::Deterministic => f.write_str("deterministic"),
        }
    }
}

impl FromStr for NonceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" | "hedged" => Ok(NonceMode::Random),
            "deterministic" | "rfc6979" => Ok(NonceMode::Deterministic),
            other => Err(format!("unknown nonce mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SignatureInner {
    P256(p256::ecdsa::Signature),
    Secp256k1(k256::ecdsa::Signature),
}

/// ECDSA signature tagged with its curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    inner: SignatureInner,
}

impl Signature {
    /// Curve the signature was produced on.
    pub fn curve(&self) -> Curve {
        match self.inner {
            SignatureInner::P256(_) => Curve::P256,
            SignatureInner::Secp256k1(_) => Curve::Secp256k1,
        }
    }

    /// ASN.1 DER encoding.
    pub fn to_der(&self) -> Vec<u8> {
        match &self.inner {
            SignatureInner::P256(sig) => sig.to_der().as_bytes().to_vec(),
            SignatureInner::Secp256k1(sig) => sig.to_der().as_bytes().to_vec(),
        }
    }

    /// Hex of the DER encoding.
    pub fn to_der_hex(&self) -> String {
        hex::encode(self.to_der())
    }

    /// Fixed-width `r || s` encoding (64 bytes).
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.inner {
            SignatureInner::P256(sig) => sig.to_bytes().to_vec(),
            SignatureInner::Secp256k1(sig) => sig.to_bytes().to_vec(),
        }
    }

    /// Parses a DER signature on `curve`.
    pub fn from_der(curve: Curve, bytes: &[u8]) -> Result<Self, PufError> {
        let inner = match curve {
            Curve::P256 => p256::ecdsa::Signature::from_der(bytes).map(SignatureInner::P256),
            Curve::Secp256k1 => k256::ecdsa::Signature::from_der(bytes).map(SignatureInner::Secp256k1),
        }
        .map_err(|err| PufError::MalformedSignature(err.to_string()))?;
        Ok(Self { inner })
    }

    /// Parses a fixed-width `r || s` signature on `curve`.
    pub fn from_bytes(curve: Curve, bytes: &[u8]) -> Result<Self, PufError> {
        let inner = match curve {
            Curve::P256 => p256::ecdsa::Signature::from_slice(bytes).map(SignatureInner::P256),
            Curve::Secp256k1 => {
                k256::ecdsa::Signature::from_slice(bytes).map(SignatureInner::Secp256k1)
            }
        }
        .map_err(|err| PufError::MalformedSignature(err.to_string()))?;
        Ok(Self { inner })
    }

    /// Parses hex holding either encoding; 64 bytes are read as `r || s`.
    pub fn from_hex(curve: Curve, input: &str) -> Result<Self, PufError> {
        let bytes = hex::decode(input.trim().trim_start_matches("0x"))
            .map_err(|err| PufError::MalformedSignature(err.to_string()))?;
        if bytes.len() == 64 {
            Self::from_bytes(curve, &bytes)
        } else {
            Self::from_der(curve, &bytes)
        }
    }
}

/// Signs `message` with `key`.
pub fn sign(key: &DerivedKey, message: &[u8], nonce: NonceMode) -> Result<Signature, PufError> {
    if message.is_empty() {
        return Err(PufError::EmptyMessage);
    }
    let digest = sha256(message);
    let inner = match (key.signing(), nonce) {
        (SigningInner::P256(sk), NonceMode::Random) => {
            let sig: p256::ecdsa::Signature = sk
                .try_sign_with_rng(&mut OsRng, &digest)
                .map_err(|err| PufError::Entropy(err.to_string()))?;
            SignatureInner::P256(sig)
        }
        (SigningInner::P256(sk), NonceMode::Deterministic) => {
            let sig: p256::ecdsa::Signature = sk
                .try_sign(&digest)
                .map_err(|err| PufError::MalformedKey(err.to_string()))?;
            SignatureInner::P256(sig)
        }
        (SigningInner::Secp256k1(sk), NonceMode::Random) => {
            let sig: k256::ecdsa::Signature = sk
                .try_sign_with_rng(&mut OsRng, &digest)
                .map_err(|err| PufError::Entropy(err.to_string()))?;
            SignatureInner::Secp256k1(sig)
        }
        (SigningInner::Secp256k1(sk), NonceMode::Deterministic) => {
            let sig: k256::ecdsa::Signature = sk
                .try_sign(&digest)
                .map_err(|err| PufError::MalformedKey(err.to_string()))?;
            SignatureInner::Secp256k1(sig)
        }
    };
    tracing::debug!(curve = %key.curve(), nonce = %nonce, len = message.len(), "signed message");
    Ok(Signature { inner })
}

/// Checks `signature` over `message` against `public_key`.
///
/// A signature that simply does not verify yields `Ok(false)`; a signature
/// from a different curve than the key is a caller error.  High-S secp256k1
/// signatures are normalized before checking.
pub fn verify(
    public_key: &PublicKey,
    message: &[u8],
    signature: &Signature,
) -> Result<bool, PufError> {
    if message.is_empty() {
        return Err(PufError::EmptyMessage);
    }
    let digest = sha256(message);
    match (public_key.inner(), &signature.inner) {
        (VerifyingInner::P256(vk), SignatureInner::P256(sig)) => Ok(vk.verify(&digest, sig).is_ok()),
        (VerifyingInner::Secp256k1(vk), SignatureInner::Secp256k1(sig)) => {
            let sig = sig.normalize_s().unwrap_or(*sig);
            Ok(vk.verify(&digest, &sig).is_ok())
        }
        _ => Err(PufError::MalformedKey(format!(
            "{} signature checked against a {} key",
            signature.curve(),
            public_key.curve()
        ))),
    }
}
