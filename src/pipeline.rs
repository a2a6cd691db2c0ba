//! End-to-end PUF key pipeline.
//!
//! A run evaluates the device on the fixed challenge (the key-bearing
//! response) and on a fresh random challenge (to show response variability),
//! derives the key from the fixed response, signs the message and checks the
//! signature against the derived public key.

use serde::{Deserialize, Serialize};

use crate::challenge::{fixed_challenge, random_challenge};
use crate::config::PipelineConfig;
use crate::entropy::EntropySource;
use crate::error::PufError;
use crate::kdf::{derive_private_key, Curve, DerivedKey};
use crate::puf::ArbiterPuf;
use crate::response::{respond, ResponseBytes};
use crate::signer::{sign, verify, NonceMode};

/// Hex-encoded outcome of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Curve of the derived key.
    pub curve: Curve,
    /// Nonce policy used for the signature.
    pub nonce: NonceMode,
    /// Response bytes for the fixed challenge.
    pub fixed_response: String,
    /// Response bytes for the random challenge.
    pub random_response: String,
    /// Differing bits between the two responses.
    pub response_distance: u32,
    /// Private scalar, 32 bytes big-endian.
    pub private_key: String,
    /// Uncompressed X9.62 public point.
    pub public_key: String,
    /// Ethereum-style address of the public key.
    pub ledger_address: String,
    /// Message that was signed.
    pub message: String,
    /// DER-encoded signature.
    pub signature: String,
    /// Whether the signature verified against the derived public key.
    pub verified: bool,
}

/// A configured device plus the parameters of its canonical flow.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    puf: ArbiterPuf,
}

impl Pipeline {
    /// Builds the simulated device described by `config`.
    pub fn new(config: PipelineConfig) -> Result<Self, PufError> {
        let puf = ArbiterPuf::new(config.stage_count, config.puf_seed)?;
        Ok(Self { config, puf })
    }

    /// Configuration the pipeline was built from.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The simulated device.
    pub fn puf(&self) -> &ArbiterPuf {
        &self.puf
    }

    /// Response bytes for the configured fixed challenge.
    pub fn fixed_response(&self) -> Result<ResponseBytes, PufError> {
        let challenge = fixed_challenge(self.puf.stage_count(), self.config.challenge_seed);
        respond(&self.puf, &challenge)
    }

    /// Response bytes for a fresh random challenge.
    pub fn random_response<E>(&self, entropy: &mut E) -> Result<ResponseBytes, PufError>
    where
        E: EntropySource + ?Sized,
    {
        let challenge = random_challenge(self.puf.stage_count(), entropy)?;
        respond(&self.puf, &challenge)
    }

    /// Re-derives the device key from the fixed challenge.
    pub fn derive_key(&self) -> Result<DerivedKey, PufError> {
        derive_private_key(self.fixed_response()?, self.config.curve)
    }

    /// Runs the whole chain for `message`.
    pub fn run<E>(&self, message: &str, entropy: &mut E) -> Result<PipelineReport, PufError>
    where
        E: EntropySource + ?Sized,
    {
        let fixed = self.fixed_response()?;
        let random = self.random_response(entropy)?;
        let key = derive_private_key(&fixed, self.config.curve)?;
        let signature = sign(&key, message.as_bytes(), self.config.nonce)?;
        let verified = verify(key.public_key(), message.as_bytes(), &signature)?;
        let response_distance = fixed.hamming_distance(&random).unwrap_or_default();
        tracing::info!(
            stage_count = self.puf.stage_count(),
            puf_seed = self.puf.seed(),
            curve = %self.config.curve,
            response_distance,
            verified,
            "pipeline run complete"
        );
        Ok(PipelineReport {
            curve: self.config.curve,
            nonce: self.config.nonce,
            fixed_response: fixed.to_hex(),
            random_response: random.to_hex(),
            response_distance,
            private_key: key.private_key_hex(),
            public_key: key.public_key().to_hex(),
            ledger_address: key.public_key().ledger_address(),
            message: message.to_string(),
            signature: signature.to_der_hex(),
            verified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::SeededEntropy;

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            stage_count: 64,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn run_produces_verified_report() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        let report = pipeline
            .run("Example message1", &mut SeededEntropy::new(3))
            .unwrap();
        assert!(report.verified);
        assert_eq!(report.fixed_response.len(), 16);
        assert_eq!(report.random_response.len(), 16);
        assert_eq!(report.private_key.len(), 64);
        assert_eq!(report.public_key.len(), 130);
        assert!(report.public_key.starts_with("04"));
    }

    #[test]
    fn derive_key_matches_run() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        let key = pipeline.derive_key().unwrap();
        let report = pipeline.run("m", &mut SeededEntropy::new(1)).unwrap();
        assert_eq!(report.private_key, key.private_key_hex());
        assert_eq!(report.public_key, key.public_key().to_hex());
    }

    #[test]
    fn empty_message_aborts_run() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        assert_eq!(
            pipeline.run("", &mut SeededEntropy::new(1)).unwrap_err(),
            PufError::EmptyMessage
        );
    }

    #[test]
    fn zero_stage_config_is_rejected() {
        let cfg = PipelineConfig {
            stage_count: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(Pipeline::new(cfg).unwrap_err(), PufError::InvalidStageCount);
    }

    #[test]
    fn report_serializes_to_json() {
        let pipeline = Pipeline::new(small_config()).unwrap();
        let report = pipeline.run("m", &mut SeededEntropy::new(2)).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let parsed: PipelineReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
        assert!(json.contains("\"curve\":\"p256\""));
    }
}
