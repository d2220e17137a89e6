//! Environment-driven service configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::{
    ledger::{decode_address, Commitment},
    registry_layout::PUBKEY_LEN,
    registry_service::{DEFAULT_PROGRAM_ID, DEFAULT_PROGRAM_ID_BASE58},
};

pub const ENV_RPC_URL: &str = "SOLANA_RPC_URL";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_PROGRAM_ID: &str = "REGISTRY_PROGRAM_ID";
pub const ENV_STATUS_LOG_PATH: &str = "STATUS_LOG_PATH";
pub const ENV_COMMITMENT: &str = "RPC_COMMITMENT";

pub const DEFAULT_RPC_URL: &str = "http://validator:8899";
pub const DEFAULT_STATUS_LOG_PATH: &str = "storage/ci-status.json";
pub const MIN_API_KEY_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} is not set")]
    Missing { key: &'static str },
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Settings for the ledger reader and the access guard.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub rpc_url: String,
    pub api_key: String,
    pub program_id: [u8; PUBKEY_LEN],
    pub status_log_path: PathBuf,
    pub commitment: Commitment,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("rpc_url", &self.rpc_url)
            .field("api_key", &"<redacted>")
            .field("program_id", &bs58::encode(self.program_id).into_string())
            .field("status_log_path", &self.status_log_path)
            .field("commitment", &self.commitment)
            .finish()
    }
}

/// Ledger-only subset used by tooling that never touches the access guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub program_id: [u8; PUBKEY_LEN],
    pub commitment: Commitment,
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let rpc_url = lookup(ENV_RPC_URL).unwrap_or_else(|| DEFAULT_RPC_URL.to_owned());
        if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: ENV_RPC_URL,
                reason: "must start with http:// or https://".to_owned(),
            });
        }

        let program_id = match lookup(ENV_PROGRAM_ID) {
            Some(encoded) => decode_address(&encoded).ok_or_else(|| ConfigError::Invalid {
                key: ENV_PROGRAM_ID,
                reason: format!("{encoded} is not a 32-byte base58 address"),
            })?,
            None => DEFAULT_PROGRAM_ID,
        };

        let commitment = match lookup(ENV_COMMITMENT) {
            Some(level) => level.parse::<Commitment>().map_err(|reason| ConfigError::Invalid {
                key: ENV_COMMITMENT,
                reason,
            })?,
            None => Commitment::default(),
        };

        Ok(Self {
            rpc_url,
            program_id,
            commitment,
        })
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let LedgerConfig {
            rpc_url,
            program_id,
            commitment,
        } = LedgerConfig::from_lookup(&lookup)?;

        let api_key = lookup(ENV_API_KEY).ok_or(ConfigError::Missing { key: ENV_API_KEY })?;
        if api_key.len() < MIN_API_KEY_LEN {
            return Err(ConfigError::Invalid {
                key: ENV_API_KEY,
                reason: format!("must be at least {MIN_API_KEY_LEN} bytes"),
            });
        }

        let status_log_path =
            lookup(ENV_STATUS_LOG_PATH).unwrap_or_else(|| DEFAULT_STATUS_LOG_PATH.to_owned());
        if status_log_path.is_empty() {
            return Err(ConfigError::Invalid {
                key: ENV_STATUS_LOG_PATH,
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(Self {
            rpc_url,
            api_key,
            program_id,
            status_log_path: PathBuf::from(status_log_path),
            commitment,
        })
    }

    pub fn program_id_base58(&self) -> String {
        if self.program_id == DEFAULT_PROGRAM_ID {
            DEFAULT_PROGRAM_ID_BASE58.to_owned()
        } else {
            bs58::encode(self.program_id).into_string()
        }
    }
}
