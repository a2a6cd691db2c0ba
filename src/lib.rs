#![deny(missing_docs)]

//! # puf_sign
//!
//! **puf_sign** derives elliptic-curve keys from a simulated physical
//! unclonable function and signs messages with them.  The key is never
//! stored: holding the same device (the same simulated PUF) and asking it the
//! same challenge re-derives the same key pair.
//!
//! ## Pipeline
//!
//! * **PUF simulation**: [`ArbiterPuf`] models an arbiter PUF with the
//!   additive delay model; its parameters are fixed by a seed.
//! * **Challenges**: [`fixed_challenge`] is reproducible from a seed,
//!   [`random_challenge`] draws from an injected [`EntropySource`].
//! * **Response encoding**: [`respond`] expands a challenge into one
//!   challenge per stage, evaluates them and packs the bits with [`encode`].
//! * **Key derivation**: [`derive_private_key`] hashes response bytes with
//!   SHA-256 and reduces the digest into a private scalar on a [`Curve`].
//! * **Signing**: [`sign`] and [`verify`] implement ECDSA over the SHA-256
//!   digest of a message.
//!
//! ## Usage
//!
//! ```rust
//! use puf_sign::{
//!     derive_private_key, fixed_challenge, respond, sign, verify, ArbiterPuf, Curve, NonceMode,
//! };
//!
//! let puf = ArbiterPuf::new(256, 45).unwrap();
//! let response = respond(&puf, &fixed_challenge(256, 1)).unwrap();
//! assert_eq!(response.as_bytes().len(), 32);
//!
//! let key = derive_private_key(&response, Curve::P256).unwrap();
//! let signature = sign(&key, b"Example message1", NonceMode::Random).unwrap();
//! assert!(verify(key.public_key(), b"Example message1", &signature).unwrap());
//! ```

pub mod challenge;
pub mod config;
pub mod entropy;
mod error;
mod io;
pub mod kdf;
pub mod pipeline;
mod prng;
pub mod puf;
pub mod response;
pub mod signer;

pub use challenge::{fixed_challenge, random_challenge, Challenge, DEFAULT_CHALLENGE_SEED};
pub use config::{ConfigError, PipelineConfig, DEFAULT_MESSAGE};
pub use entropy::{EntropySource, OsEntropy, SeededEntropy};
pub use error::PufError;
pub use io::write_report;
pub use kdf::{derive_private_key, sha256, Curve, DerivedKey, PublicKey};
pub use pipeline::{Pipeline, PipelineReport};
pub use prng::SimplePrng;
pub use puf::{ArbiterPuf, DEFAULT_PUF_SEED, DEFAULT_STAGE_COUNT};
pub use response::{encode, respond, ResponseBytes};
pub use signer::{sign, verify, NonceMode, Signature};
