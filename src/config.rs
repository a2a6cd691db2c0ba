//! Pipeline configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! `PUFSIGN_*` environment variables, then whatever the CLI passes on top.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::challenge::DEFAULT_CHALLENGE_SEED;
use crate::kdf::Curve;
use crate::puf::{DEFAULT_PUF_SEED, DEFAULT_STAGE_COUNT};
use crate::signer::NonceMode;

/// Message signed when none is supplied.
pub const DEFAULT_MESSAGE: &str = "Example message1";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    /// Configuration file could not be read.
    Io(String),
    #[error("decode error: {0}")]
    /// File or variable contents could not be parsed.
    Decode(String),
    #[error("invalid configuration: {0}")]
    /// Parsed values violate an invariant.
    Invalid(String),
}

/// Parameters of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// PUF width in delay stages.
    pub stage_count: usize,
    /// Seed identifying the simulated device.
    pub puf_seed: u64,
    /// Seed of the fixed challenge used for key derivation.
    pub challenge_seed: u64,
    /// Curve the key is derived on.
    pub curve: Curve,
    /// Nonce policy for signing.
    pub nonce: NonceMode,
    /// Message signed by a run.
    pub message: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_count: DEFAULT_STAGE_COUNT,
            puf_seed: DEFAULT_PUF_SEED,
            challenge_seed: DEFAULT_CHALLENGE_SEED,
            curve: Curve::P256,
            nonce: NonceMode::Random,
            message: DEFAULT_MESSAGE.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Parses a JSON document; absent fields keep their defaults.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|err| ConfigError::Decode(err.to_string()))
    }

    /// Loads a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        Self::from_json_str(&contents)
    }

    /// Applies `PUFSIGN_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides using `lookup` to resolve variable names.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PUFSIGN_STAGES") {
            self.stage_count = parse_var("PUFSIGN_STAGES", &value)?;
        }
        if let Some(value) = lookup("PUFSIGN_PUF_SEED") {
            self.puf_seed = parse_var("PUFSIGN_PUF_SEED", &value)?;
        }
        if let Some(value) = lookup("PUFSIGN_CHALLENGE_SEED") {
            self.challenge_seed = parse_var("PUFSIGN_CHALLENGE_SEED", &value)?;
        }
        if let Some(value) = lookup("PUFSIGN_CURVE") {
            self.curve = value.parse().map_err(ConfigError::Decode)?;
        }
        if let Some(value) = lookup("PUFSIGN_NONCE") {
            self.nonce = value.parse().map_err(ConfigError::Decode)?;
        }
        if let Some(value) = lookup("PUFSIGN_MESSAGE") {
            self.message = value;
        }
        Ok(())
    }

    /// Checks invariants that the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stage_count == 0 {
            return Err(ConfigError::Invalid("stage_count must be positive".into()));
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| ConfigError::Decode(format!("{name}={value}: {err}")))
}
