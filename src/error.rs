//! Error taxonomy shared by every pipeline stage.
//!
//! Each stage is a pure function of its inputs, so every failure is local and
//! synchronous: it is reported at the call that detects it and nothing has to
//! be unwound.  Retrying is left to the caller.

use thiserror::Error;

/// Errors raised by the PUF simulation, key derivation and signing stages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PufError {
    #[error("stage count must be positive")]
    /// A PUF was requested with zero delay stages.
    InvalidStageCount,
    #[error("challenge {index} has {actual} bits, expected {expected}")]
    /// A challenge width did not match the PUF's stage count.
    InvalidChallengeLength {
        /// Position of the offending challenge in the evaluated batch.
        index: usize,
        /// Stage count of the PUF.
        expected: usize,
        /// Width of the supplied challenge.
        actual: usize,
    },
    #[error("challenge value {value} at position {index} is not bipolar")]
    /// A bipolar challenge contained something other than `+1` or `-1`.
    InvalidChallengeValue {
        /// Position of the offending value.
        index: usize,
        /// The rejected value.
        value: i8,
    },
    #[error("response digest reduced to the zero scalar")]
    /// Hash-to-scalar reduction produced zero.
    InvalidScalar,
    #[error("malformed key: {0}")]
    /// Key material was undecodable or belonged to a different curve.
    MalformedKey(String),
    #[error("malformed signature: {0}")]
    /// Signature encoding could not be parsed for the requested curve.
    MalformedSignature(String),
    #[error("message must not be empty")]
    /// Signing or verifying was attempted over an empty message.
    EmptyMessage,
    #[error("entropy source failure: {0}")]
    /// The entropy source could not supply bytes.
    Entropy(String),
}
