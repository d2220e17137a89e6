//! Ledger read collaborator.
//!
//! The registry service only needs one thing from the chain: the raw bytes and
//! owning program of the account at a given address. [`LedgerReader`] is that
//! seam; [`RpcLedgerReader`] speaks JSON-RPC `getAccountInfo` and
//! [`MemoryLedger`] backs tests and offline tooling.

use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        RwLock,
    },
    time::Duration,
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::registry_layout::PUBKEY_LEN;

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Account snapshot as returned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAccount {
    pub owner: [u8; PUBKEY_LEN],
    pub data: Vec<u8>,
    pub lamports: u64,
    pub executable: bool,
}

impl LedgerAccount {
    pub fn owned_by(owner: [u8; PUBKEY_LEN], data: Vec<u8>) -> Self {
        Self {
            owner,
            data,
            lamports: 0,
            executable: false,
        }
    }
}

/// Infrastructure failures. These are never produced for malformed account
/// contents, only for problems reaching or talking to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("rpc transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed rpc response: {0}")]
    MalformedResponse(String),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Returns `Ok(None)` when no account exists at `address`.
    async fn get_account(
        &self,
        address: &[u8; PUBKEY_LEN],
    ) -> Result<Option<LedgerAccount>, LedgerError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(format!("unknown commitment level: {other}")),
        }
    }
}

/// JSON-RPC `getAccountInfo` reader. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct RpcLedgerReader {
    client: reqwest::Client,
    url: String,
    commitment: Commitment,
}

impl RpcLedgerReader {
    pub fn new(url: impl Into<String>, commitment: Commitment) -> Result<Self, LedgerError> {
        let client = reqwest::Client::builder().timeout(RPC_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
            commitment,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LedgerReader for RpcLedgerReader {
    async fn get_account(
        &self,
        address: &[u8; PUBKEY_LEN],
    ) -> Result<Option<LedgerAccount>, LedgerError> {
        let request = get_account_info_request(address, self.commitment);
        debug!(url = %self.url, address = %bs58::encode(address).into_string(), "getAccountInfo");

        let body: Value = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_get_account_info(body)
    }
}

pub fn get_account_info_request(address: &[u8; PUBKEY_LEN], commitment: Commitment) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "getAccountInfo",
        "params": [
            bs58::encode(address).into_string(),
            { "encoding": "base64", "commitment": commitment.as_str() }
        ]
    })
}

#[derive(Deserialize)]
struct RpcEnvelope {
    result: Option<RpcResult>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct RpcResult {
    value: Option<RpcAccount>,
}

#[derive(Deserialize)]
struct RpcAccount {
    data: (String, String),
    owner: String,
    lamports: u64,
    executable: bool,
}

/// Turns a `getAccountInfo` response body into an account snapshot.
pub fn parse_get_account_info(body: Value) -> Result<Option<LedgerAccount>, LedgerError> {
    let envelope: RpcEnvelope = serde_json::from_value(body)
        .map_err(|err| LedgerError::MalformedResponse(err.to_string()))?;

    if let Some(error) = envelope.error {
        return Err(LedgerError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    let result = envelope
        .result
        .ok_or_else(|| LedgerError::MalformedResponse("missing result".to_owned()))?;
    let Some(account) = result.value else {
        return Ok(None);
    };

    let (encoded, encoding) = account.data;
    if encoding != "base64" {
        return Err(LedgerError::MalformedResponse(format!(
            "unexpected data encoding {encoding}"
        )));
    }
    let data = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|err| LedgerError::MalformedResponse(format!("account data: {err}")))?;
    let owner = decode_address(&account.owner)
        .ok_or_else(|| LedgerError::MalformedResponse(format!("owner {}", account.owner)))?;

    Ok(Some(LedgerAccount {
        owner,
        data,
        lamports: account.lamports,
        executable: account.executable,
    }))
}

/// Parses a base58 address, rejecting anything that is not exactly 32 bytes.
pub fn decode_address(encoded: &str) -> Option<[u8; PUBKEY_LEN]> {
    let bytes = bs58::decode(encoded).into_vec().ok()?;
    bytes.try_into().ok()
}

/// In-process ledger keyed by address.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: RwLock<HashMap<[u8; PUBKEY_LEN], LedgerAccount>>,
    reads: AtomicUsize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, address: [u8; PUBKEY_LEN], account: LedgerAccount) {
        self.accounts
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(address, account);
    }

    pub fn remove(&self, address: &[u8; PUBKEY_LEN]) -> Option<LedgerAccount> {
        self.accounts
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(address)
    }

    /// Number of `get_account` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LedgerReader for MemoryLedger {
    async fn get_account(
        &self,
        address: &[u8; PUBKEY_LEN],
    ) -> Result<Option<LedgerAccount>, LedgerError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .accounts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(address)
            .cloned())
    }
}
