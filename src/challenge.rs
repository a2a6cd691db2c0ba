//! Challenge vectors and their generators.
//!
//! A [`Challenge`] is a fixed-length bit vector.  The arbiter model consumes
//! it in bipolar form using the `(-1)^b` convention: bit `0` drives the chain
//! as `+1` and bit `1` as `-1`.  Packed representations are most significant
//! bit first within each byte, bits taken in vector order, with the trailing
//! pad bits of the last byte cleared.

use crate::entropy::EntropySource;
use crate::error::PufError;
use crate::prng::{derive_seed, SimplePrng};

const CHALLENGE_DOMAIN: &[u8] = b"PUFSIGN_CHALLENGE";
const EXPAND_DOMAIN: &[u8] = b"PUFSIGN_EXPAND";

/// Seed of the canonical fixed challenge.
pub const DEFAULT_CHALLENGE_SEED: u64 = 1;

/// Ordered bit vector fed to a PUF.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Challenge {
    bits: Vec<bool>,
}

impl Challenge {
    /// Builds a challenge from raw bits.
    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self { bits }
    }

    /// Builds a challenge from bipolar values, rejecting anything but `±1`.
    pub fn from_bipolar(values: &[i8]) -> Result<Self, PufError> {
        let mut bits = Vec::with_capacity(values.len());
        for (index, &value) in values.iter().enumerate() {
            match value {
                1 => bits.push(false),
                -1 => bits.push(true),
                _ => return Err(PufError::InvalidChallengeValue { index, value }),
            }
        }
        Ok(Self { bits })
    }

    /// Unpacks `len` bits from exactly `ceil(len / 8)` packed bytes.
    ///
    /// Returns `None` for any other byte count. Pad bits are ignored.
    pub fn from_packed(bytes: &[u8], len: usize) -> Option<Self> {
        if bytes.len() != len.div_ceil(8) {
            return None;
        }
        let bits = (0..len)
            .map(|i| (bytes[i / 8] >> (7 - i % 8)) & 1 == 1)
            .collect();
        Some(Self { bits })
    }

    /// Packs the bits into `ceil(len / 8)` bytes.
    pub fn to_packed(&self) -> Vec<u8> {
        pack_bits(&self.bits)
    }

    /// Number of bits in the challenge.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns `true` for a zero-width challenge.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Raw bits in vector order.
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Bipolar view of the challenge (`+1` for bit `0`, `-1` for bit `1`).
    pub fn bipolar(&self) -> impl Iterator<Item = i8> + '_ {
        self.bits.iter().map(|&bit| if bit { -1 } else { 1 })
    }

    /// Expands this root challenge into a batch of `count` challenges.
    ///
    /// The first entry is the root itself; the rest come from a stream seeded
    /// by the root's width and packed bits, so the batch is a pure function of
    /// the root.
    pub fn expand(&self, count: usize) -> Vec<Challenge> {
        let mut batch = Vec::with_capacity(count);
        if count == 0 {
            return batch;
        }
        batch.push(self.clone());
        let width = (self.bits.len() as u64).to_be_bytes();
        let packed = self.to_packed();
        let mut stream = SimplePrng::from_seed_bytes(derive_seed(EXPAND_DOMAIN, &[&width, &packed]));
        for _ in 1..count {
            batch.push(Challenge::from_bits(stream.next_bits(self.bits.len())));
        }
        batch
    }
}

pub(crate) fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            out[i / 8] |= 1 << (7 - i % 8);
        }
    }
    out
}

/// Returns the reproducible challenge for `fixed_seed`.
///
/// Reusing the same PUF instance with this challenge re-derives the same key
/// across processes and restarts.
pub fn fixed_challenge(stage_count: usize, fixed_seed: u64) -> Challenge {
    let mut stream = SimplePrng::with_domain(CHALLENGE_DOMAIN, fixed_seed);
    Challenge::from_bits(stream.next_bits(stage_count))
}

/// Draws a fresh challenge from `entropy`.
pub fn random_challenge<E>(stage_count: usize, entropy: &mut E) -> Result<Challenge, PufError>
where
    E: EntropySource + ?Sized,
{
    let mut bytes = vec![0u8; stage_count.div_ceil(8)];
    entropy.fill(&mut bytes)?;
    tracing::debug!(source = entropy.name(), stage_count, "drew random challenge");
    Challenge::from_packed(&bytes, stage_count).ok_or(PufError::InvalidChallengeLength {
        index: 0,
        expected: stage_count,
        actual: bytes.len() * 8,
    })
}
