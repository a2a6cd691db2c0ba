//! Arbiter PUF simulation.
//!
//! The model is the additive delay model of an arbiter PUF: a signal races
//! down two delay chains whose wiring is crossed or kept straight by each
//! challenge bit, and the arbiter reports which chain won.  The race
//! reduces to the sign of
//!
//! ```text
//! Δ(c) = bias + Σ_i w_i · φ_i(c),   φ_i(c) = Π_{j ≥ i} c_j
//! ```
//!
//! where `c_j ∈ {+1, -1}` is the bipolar challenge and `w_i` is the delay
//! difference introduced by stage `i`.  Stage delays are integer samples of
//! an approximately Gaussian distribution drawn from the seeded stream, so the
//! whole evaluation is exact integer arithmetic.

use crate::challenge::Challenge;
use crate::error::PufError;
use crate::prng::SimplePrng;

const PUF_DOMAIN: &[u8] = b"PUFSIGN_ARBITER";

/// Canonical number of delay stages.
pub const DEFAULT_STAGE_COUNT: usize = 256;
/// Seed of the canonical simulated device.
pub const DEFAULT_PUF_SEED: u64 = 45;

// Irwin-Hall: twelve uniform draws of 20 bits each, centered on zero.
const DELAY_TERMS: usize = 12;
const DELAY_BITS: u32 = 20;

/// Simulated arbiter PUF.
///
/// Immutable after construction; evaluation never mutates the instance, so a
/// single device can be shared freely between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbiterPuf {
    stage_count: usize,
    seed: u64,
    weights: Vec<i64>,
    bias: i64,
}

impl ArbiterPuf {
    /// Builds the device identified by `(stage_count, seed)`.
    pub fn new(stage_count: usize, seed: u64) -> Result<Self, PufError> {
        if stage_count == 0 {
            return Err(PufError::InvalidStageCount);
        }
        let mut stream = SimplePrng::with_domain(PUF_DOMAIN, seed);
        let weights = (0..stage_count).map(|_| sample_delay(&mut stream)).collect();
        let bias = sample_delay(&mut stream);
        tracing::debug!(stage_count, seed, "built arbiter PUF");
        Ok(Self {
            stage_count,
            seed,
            weights,
            bias,
        })
    }

    /// Number of delay stages, which is also the required challenge width.
    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    /// Seed that fixed this device's delay parameters.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Evaluates a batch of challenges, one bipolar response per challenge.
    ///
    /// Responses are `+1` or `-1`, or `0` when the race is exactly balanced.
    pub fn evaluate(&self, challenges: &[Challenge]) -> Result<Vec<i8>, PufError> {
        challenges
            .iter()
            .enumerate()
            .map(|(index, challenge)| {
                self.check_width(index, challenge)?;
                Ok(self.race(challenge))
            })
            .collect()
    }

    /// Evaluates a single challenge.
    pub fn evaluate_one(&self, challenge: &Challenge) -> Result<i8, PufError> {
        self.check_width(0, challenge)?;
        Ok(self.race(challenge))
    }

    fn check_width(&self, index: usize, challenge: &Challenge) -> Result<(), PufError> {
        if challenge.len() != self.stage_count {
            return Err(PufError::InvalidChallengeLength {
                index,
                expected: self.stage_count,
                actual: challenge.len(),
            });
        }
        Ok(())
    }

    fn race(&self, challenge: &Challenge) -> i8 {
        let values: Vec<i8> = challenge.bipolar().collect();
        let mut parity = 1i64;
        let mut delta = self.bias;
        for (weight, &value) in self.weights.iter().zip(values.iter()).rev() {
            parity *= value as i64;
            delta += weight * parity;
        }
        delta.signum() as i8
    }
}

fn sample_delay(stream: &mut SimplePrng) -> i64 {
    let half = 1i64 << (DELAY_BITS - 1);
    (0..DELAY_TERMS)
        .map(|_| (stream.next_u64() >> (64 - DELAY_BITS)) as i64 - half)
        .sum()
}
