//! Registry lookups by authority.
//!
//! Derives the registry address for an authority, reads the account through a
//! [`LedgerReader`], checks ownership and decodes it. Malformed or foreign
//! accounts are indistinguishable from missing ones at the `get_by_authority`
//! boundary; [`RegistryService::lookup`] keeps the distinction for callers that
//! want to report on it.

use std::sync::Arc;

use solana_address::Address;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    ledger::{decode_address, LedgerError, LedgerReader},
    registry_layout::{decode_registry_account, RegistryDecodeError, RegistryRecord, PUBKEY_LEN},
};

mod program_ids {
    include!(concat!(env!("OUT_DIR"), "/program_ids.rs"));
}
pub use program_ids::{DEFAULT_PROGRAM_ID, DEFAULT_PROGRAM_ID_BASE58};

pub const REGISTRY_SEED: &[u8] = b"registry";
const PREVIEW_LEN: usize = 100;

/// Program-derived address of the registry owned by `authority`.
pub fn derive_registry_address(
    authority: &[u8; PUBKEY_LEN],
    program_id: &[u8; PUBKEY_LEN],
) -> ([u8; PUBKEY_LEN], u8) {
    let program = Address::new_from_array(*program_id);
    let (address, bump) = Address::find_program_address(&[REGISTRY_SEED, authority.as_ref()], &program);
    (address.to_bytes(), bump)
}

/// Outcome of a lookup with the failure kind preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryLookup {
    Found(RegistryRecord),
    NotFound,
    InvalidAuthority,
    ForeignOwner { owner: [u8; PUBKEY_LEN] },
    Malformed(RegistryDecodeError),
}

impl RegistryLookup {
    pub fn into_record(self) -> Option<RegistryRecord> {
        match self {
            Self::Found(record) => Some(record),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryLookupError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub struct RegistryService {
    ledger: Arc<dyn LedgerReader>,
    program_id: [u8; PUBKEY_LEN],
}

impl RegistryService {
    pub fn new(ledger: Arc<dyn LedgerReader>, program_id: [u8; PUBKEY_LEN]) -> Self {
        Self { ledger, program_id }
    }

    /// Registry for `authority`, or `None` when there is no usable account.
    ///
    /// # Errors
    ///
    /// Only ledger failures are returned; bad input and bad account data
    /// become `Ok(None)`.
    pub async fn get_by_authority(
        &self,
        authority: &str,
    ) -> Result<Option<RegistryRecord>, RegistryLookupError> {
        Ok(self.lookup(authority).await?.into_record())
    }

    pub async fn lookup(&self, authority: &str) -> Result<RegistryLookup, RegistryLookupError> {
        let Some(authority_key) = decode_address(authority) else {
            warn!(authority, "invalid authority address");
            return Ok(RegistryLookup::InvalidAuthority);
        };

        let (registry_address, _) = derive_registry_address(&authority_key, &self.program_id);
        let Some(account) = self.ledger.get_account(&registry_address).await? else {
            debug!(authority, "registry account not found");
            return Ok(RegistryLookup::NotFound);
        };

        if account.owner != self.program_id {
            warn!(
                authority,
                owner = %bs58::encode(account.owner).into_string(),
                "registry address owned by another program"
            );
            return Ok(RegistryLookup::ForeignOwner { owner: account.owner });
        }

        match decode_registry_account(&account.data) {
            Ok(record) => {
                debug!(
                    authority = %record.authority,
                    version = record.version,
                    uri_len = record.metadata_uri.len(),
                    checksum_prefix = ?&record.metadata_checksum[..4],
                    "decoded registry"
                );
                Ok(RegistryLookup::Found(record))
            }
            Err(err) => {
                warn!(
                    authority,
                    kind = ?err,
                    size = account.data.len(),
                    "failed to decode registry account"
                );
                debug!(
                    preview = %hex::encode(&account.data[..account.data.len().min(PREVIEW_LEN)]),
                    "registry account preview"
                );
                Ok(RegistryLookup::Malformed(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        anchor_compat::ACCT_REGISTRY,
        ledger::{LedgerAccount, MemoryLedger},
        registry_layout::{RegistryView, REGISTRY_ACCOUNT_LEN},
    };
    use async_trait::async_trait;

    const AUTHORITY: &str = "EaDViQQPiBUqBCUXXkEsihCVHRcTuMctmnfEn9Mv9sqA";

    fn authority_key() -> [u8; 32] {
        decode_address(AUTHORITY).unwrap()
    }

    fn registry_data(uri: &str, checksum: [u8; 32]) -> Vec<u8> {
        let mut data = vec![0u8; REGISTRY_ACCOUNT_LEN];
        data[..8].copy_from_slice(&ACCT_REGISTRY);
        RegistryView {
            authority: authority_key(),
            version: 1,
            bump: 255,
            metadata_uri: uri.to_owned(),
            metadata_checksum: checksum,
        }
        .write_to_account_data(&mut data)
        .unwrap();
        data
    }

    fn service_with(data: Vec<u8>, owner: [u8; 32]) -> (RegistryService, Arc<MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new());
        let (address, _) = derive_registry_address(&authority_key(), &DEFAULT_PROGRAM_ID);
        ledger.insert(address, LedgerAccount::owned_by(owner, data));
        (RegistryService::new(ledger.clone(), DEFAULT_PROGRAM_ID), ledger)
    }

    struct UnreachableLedger;

    #[async_trait]
    impl LedgerReader for UnreachableLedger {
        async fn get_account(
            &self,
            _address: &[u8; PUBKEY_LEN],
        ) -> Result<Option<LedgerAccount>, LedgerError> {
            Err(LedgerError::Unavailable("RPC connection failed".to_owned()))
        }
    }

    #[test]
    fn derived_address_is_a_valid_program_address() {
        let (address, bump) = derive_registry_address(&authority_key(), &DEFAULT_PROGRAM_ID);
        let recreated = Address::create_program_address(
            &[REGISTRY_SEED, authority_key().as_ref(), &[bump]],
            &Address::new_from_array(DEFAULT_PROGRAM_ID),
        )
        .unwrap();
        assert_eq!(recreated.to_bytes(), address);
    }

    #[test]
    fn derivation_depends_on_authority_and_program() {
        let (a, _) = derive_registry_address(&[1u8; 32], &DEFAULT_PROGRAM_ID);
        let (b, _) = derive_registry_address(&[2u8; 32], &DEFAULT_PROGRAM_ID);
        let (c, _) = derive_registry_address(&[1u8; 32], &[9u8; 32]);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, derive_registry_address(&[1u8; 32], &DEFAULT_PROGRAM_ID).0);
    }

    #[test]
    fn default_program_id_matches_base58() {
        assert_eq!(decode_address(DEFAULT_PROGRAM_ID_BASE58), Some(DEFAULT_PROGRAM_ID));
    }

    #[tokio::test]
    async fn returns_none_when_account_missing() {
        let ledger = Arc::new(MemoryLedger::new());
        let service = RegistryService::new(ledger.clone(), DEFAULT_PROGRAM_ID);

        assert_eq!(service.get_by_authority(AUTHORITY).await.unwrap(), None);
        assert_eq!(service.lookup(AUTHORITY).await.unwrap(), RegistryLookup::NotFound);
        assert_eq!(ledger.reads(), 2);
    }

    #[tokio::test]
    async fn foreign_owner_looks_like_not_found() {
        let (service, _) = service_with(registry_data("", [0u8; 32]), [4u8; 32]);

        assert_eq!(service.get_by_authority(AUTHORITY).await.unwrap(), None);
        assert_eq!(
            service.lookup(AUTHORITY).await.unwrap(),
            RegistryLookup::ForeignOwner { owner: [4u8; 32] }
        );
    }

    #[tokio::test]
    async fn short_account_looks_like_not_found() {
        let (service, _) = service_with(vec![0u8; 52], DEFAULT_PROGRAM_ID);

        assert_eq!(service.get_by_authority(AUTHORITY).await.unwrap(), None);
        assert_eq!(
            service.lookup(AUTHORITY).await.unwrap(),
            RegistryLookup::Malformed(RegistryDecodeError::TooShort { len: 52 })
        );
    }

    #[tokio::test]
    async fn wrong_discriminator_looks_like_not_found() {
        let (service, _) = service_with(vec![0u8; REGISTRY_ACCOUNT_LEN], DEFAULT_PROGRAM_ID);
        assert_eq!(service.get_by_authority(AUTHORITY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn decodes_empty_registry() {
        let (service, _) = service_with(registry_data("", [0u8; 32]), DEFAULT_PROGRAM_ID);

        let record = service.get_by_authority(AUTHORITY).await.unwrap().unwrap();
        assert_eq!(record.authority, AUTHORITY);
        assert_eq!(record.version, 1);
        assert_eq!(record.bump, 255);
        assert_eq!(record.metadata_uri, "");
        assert_eq!(record.metadata_checksum, [0u8; 32]);
    }

    #[tokio::test]
    async fn decodes_registry_with_uri_and_checksum() {
        let uri = "https://example.com/metadata.json";
        let (service, _) = service_with(registry_data(uri, [42u8; 32]), DEFAULT_PROGRAM_ID);

        let record = service.get_by_authority(AUTHORITY).await.unwrap().unwrap();
        assert_eq!(record.metadata_uri, uri);
        assert_eq!(record.metadata_checksum, [42u8; 32]);
    }

    #[tokio::test]
    async fn oversized_uri_prefix_looks_like_not_found() {
        let mut data = registry_data("", [0u8; 32]);
        data[49..53].copy_from_slice(&201u32.to_le_bytes());
        let (service, _) = service_with(data, DEFAULT_PROGRAM_ID);

        assert_eq!(
            service.lookup(AUTHORITY).await.unwrap(),
            RegistryLookup::Malformed(RegistryDecodeError::UriTooLong { declared: 201 })
        );
    }

    #[tokio::test]
    async fn invalid_authority_skips_ledger_read() {
        let ledger = Arc::new(MemoryLedger::new());
        let service = RegistryService::new(ledger.clone(), DEFAULT_PROGRAM_ID);

        assert_eq!(service.get_by_authority("invalid-address").await.unwrap(), None);
        assert_eq!(
            service.lookup("invalid-address").await.unwrap(),
            RegistryLookup::InvalidAuthority
        );
        assert_eq!(ledger.reads(), 0);
    }

    #[tokio::test]
    async fn ledger_failure_stays_distinguishable() {
        let service = RegistryService::new(Arc::new(UnreachableLedger), DEFAULT_PROGRAM_ID);

        let err = service.get_by_authority(AUTHORITY).await.unwrap_err();
        assert!(matches!(err, RegistryLookupError::Ledger(LedgerError::Unavailable(_))));
    }
}
