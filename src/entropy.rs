//! Entropy sources for randomized challenges.
//!
//! Random challenges are the only non-deterministic input of the pipeline.
//! The source is passed in explicitly, so tests can swap the operating-system
//! generator for a seeded stream.

use rand::{rngs::OsRng, RngCore};

use crate::error::PufError;
use crate::prng::SimplePrng;

const SEEDED_DOMAIN: &[u8] = b"PUFSIGN_SEEDED_ENTROPY";

/// Capability that supplies random bytes.
pub trait EntropySource {
    /// Fills `dest` entirely with random bytes.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), PufError>;

    /// Short label for logging.
    fn name(&self) -> &'static str;
}

/// Cryptographically strong randomness from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), PufError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|err| PufError::Entropy(err.to_string()))
    }

    fn name(&self) -> &'static str {
        "os"
    }
}

/// Reproducible substitute for [`OsEntropy`].
///
/// Not suitable for anything but tests and demonstrations.
#[derive(Debug, Clone)]
pub struct SeededEntropy {
    stream: SimplePrng,
}

impl SeededEntropy {
    /// Creates a source whose output is fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            stream: SimplePrng::with_domain(SEEDED_DOMAIN, seed),
        }
    }
}

impl EntropySource for SeededEntropy {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), PufError> {
        self.stream.fill_bytes(dest);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "seeded"
    }
}
