//! # Bet Client Configuration
//!
//! Network endpoints, program ids and timing bounds of the submission flow.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

use crate::adapters::DEFAULT_ARCIUM_PROGRAM_ID;
use crate::algorithms::RetryPolicy;
use crate::domain::{BetClientError, Commitment};

/// Default prediction market program.
pub const DEFAULT_PROGRAM_ID: &str = "3vttzXAnNXM1SGdMWQgVBJWEkEFmtExhX5hDgEGv9qux";

/// Default JSON-RPC endpoint (local validator).
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8899";

/// MXE key retrieval settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyFetchConfig {
    /// Total attempts before giving up.
    pub max_retries: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for KeyFetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            retry_delay_ms: 500,
        }
    }
}

impl KeyFetchConfig {
    /// As a retry policy.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }
}

/// Bet client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BetClientConfig {
    /// Prediction market program (base58).
    pub program_id: String,

    /// MPC runtime program (base58).
    pub arcium_program_id: String,

    /// Cluster used for computations.
    pub cluster_offset: u32,

    /// JSON-RPC endpoint.
    pub rpc_url: String,

    /// MXE key retrieval.
    pub key_fetch: KeyFetchConfig,

    /// Bound on the finalization wait, in seconds.
    pub finalization_timeout_secs: u64,

    /// Commitment for submission and finalization.
    pub commitment: Commitment,

    /// How long a terminal status stays visible, in milliseconds.
    pub status_reset_delay_ms: u64,
}

impl Default for BetClientConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID.to_string(),
            arcium_program_id: DEFAULT_ARCIUM_PROGRAM_ID.to_string(),
            cluster_offset: 0,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            key_fetch: KeyFetchConfig::default(),
            finalization_timeout_secs: 120,
            commitment: Commitment::Confirmed,
            status_reset_delay_ms: 3_000,
        }
    }
}

impl BetClientConfig {
    /// Create a config for testing (short bounds).
    pub fn for_testing() -> Self {
        Self {
            key_fetch: KeyFetchConfig {
                max_retries: 3,
                retry_delay_ms: 10,
            },
            finalization_timeout_secs: 5,
            status_reset_delay_ms: 100,
            ..Self::default()
        }
    }

    /// Load from a TOML file; missing fields take their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, BetClientError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BetClientError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Parse TOML and validate.
    pub fn from_toml_str(raw: &str) -> Result<Self, BetClientError> {
        let config: Self =
            toml::from_str(raw).map_err(|e| BetClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject unusable settings.
    pub fn validate(&self) -> Result<(), BetClientError> {
        if self.key_fetch.max_retries == 0 {
            return Err(BetClientError::Config(
                "key_fetch.max_retries must be at least 1".to_string(),
            ));
        }
        if self.finalization_timeout_secs == 0 {
            return Err(BetClientError::Config(
                "finalization_timeout_secs must be positive".to_string(),
            ));
        }
        self.program_pubkey()?;
        self.arcium_program_pubkey()?;
        Ok(())
    }

    /// Parsed `program_id`.
    pub fn program_pubkey(&self) -> Result<Pubkey, BetClientError> {
        Pubkey::from_str(&self.program_id)
            .map_err(|e| BetClientError::Config(format!("program_id: {e}")))
    }

    /// Parsed `arcium_program_id`.
    pub fn arcium_program_pubkey(&self) -> Result<Pubkey, BetClientError> {
        Pubkey::from_str(&self.arcium_program_id)
            .map_err(|e| BetClientError::Config(format!("arcium_program_id: {e}")))
    }

    /// Finalization bound.
    pub fn finalization_timeout(&self) -> Duration {
        Duration::from_secs(self.finalization_timeout_secs)
    }

    /// Display delay of terminal statuses.
    pub fn status_reset_delay(&self) -> Duration {
        Duration::from_millis(self.status_reset_delay_ms)
    }
}
