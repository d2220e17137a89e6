use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anchor_compat::{ACCT_REGISTRY, ANCHOR_DISCRIMINATOR_LEN};

pub const PUBKEY_LEN: usize = 32;
pub const CHECKSUM_LEN: usize = 32;
pub const URI_LIMIT: usize = 200;
pub const URI_LEN_PREFIX_LEN: usize = 4;

const AUTHORITY_OFFSET: usize = ANCHOR_DISCRIMINATOR_LEN;
const VERSION_OFFSET: usize = AUTHORITY_OFFSET + PUBKEY_LEN;
const BUMP_OFFSET: usize = VERSION_OFFSET + 8;
const URI_LEN_OFFSET: usize = BUMP_OFFSET + 1;
pub const URI_OFFSET: usize = URI_LEN_OFFSET + URI_LEN_PREFIX_LEN;

/// Smallest buffer that can carry every fixed-width field ahead of the URI.
pub const REGISTRY_MIN_LEN: usize = URI_OFFSET;
/// Space the program allocates for a registry account (URI at its ceiling).
pub const REGISTRY_ACCOUNT_LEN: usize = REGISTRY_MIN_LEN + URI_LIMIT + CHECKSUM_LEN;

/// Reasons an account buffer is rejected. Every variant is recoverable: the
/// access layer treats all of them as "no registry here".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryDecodeError {
    #[error("account data is {len} bytes, need at least 53")]
    TooShort { len: usize },
    #[error("account discriminator does not match Registry")]
    DiscriminatorMismatch { found: [u8; ANCHOR_DISCRIMINATOR_LEN] },
    #[error("declared metadata uri length {declared} exceeds 200")]
    UriTooLong { declared: u32 },
    #[error("account data is {actual} bytes, layout requires {required}")]
    BufferTooShort { required: usize, actual: usize },
    #[error("metadata uri is not valid utf-8")]
    InvalidUtf8,
}

/// Failures on the write path, where the caller owns the destination buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("destination slice too short")]
    SliceTooShort,
    #[error("metadata uri exceeds 200 bytes")]
    UriTooLong,
}

/// Raw view of a registry account, field-for-field with the on-chain struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryView {
    pub authority: [u8; PUBKEY_LEN],
    pub version: u64,
    pub bump: u8,
    pub metadata_uri: String,
    pub metadata_checksum: [u8; CHECKSUM_LEN],
}

impl RegistryView {
    /// Decodes account bytes, failing on the first violated bound.
    ///
    /// Checks run in a fixed order (length, discriminator, declared URI
    /// length, full length, UTF-8) so a given buffer always produces the same
    /// failure. Bytes past the checksum are ignored.
    pub fn read_from_account_data(data: &[u8]) -> Result<Self, RegistryDecodeError> {
        if data.len() < REGISTRY_MIN_LEN {
            return Err(RegistryDecodeError::TooShort { len: data.len() });
        }

        let mut found = [0u8; ANCHOR_DISCRIMINATOR_LEN];
        found.copy_from_slice(&data[..ANCHOR_DISCRIMINATOR_LEN]);
        if found != ACCT_REGISTRY {
            return Err(RegistryDecodeError::DiscriminatorMismatch { found });
        }

        let mut authority = [0u8; PUBKEY_LEN];
        authority.copy_from_slice(&data[AUTHORITY_OFFSET..VERSION_OFFSET]);
        let version = read_u64_at(data, VERSION_OFFSET);
        let bump = data[BUMP_OFFSET];

        let declared = read_u32_at(data, URI_LEN_OFFSET);
        if declared as usize > URI_LIMIT {
            return Err(RegistryDecodeError::UriTooLong { declared });
        }
        let uri_len = declared as usize;

        let checksum_offset = URI_OFFSET + uri_len;
        let required = checksum_offset + CHECKSUM_LEN;
        if data.len() < required {
            return Err(RegistryDecodeError::BufferTooShort {
                required,
                actual: data.len(),
            });
        }

        let metadata_uri = if uri_len == 0 {
            String::new()
        } else {
            core::str::from_utf8(&data[URI_OFFSET..checksum_offset])
                .map_err(|_| RegistryDecodeError::InvalidUtf8)?
                .to_owned()
        };

        let mut metadata_checksum = [0u8; CHECKSUM_LEN];
        metadata_checksum.copy_from_slice(&data[checksum_offset..required]);

        Ok(Self {
            authority,
            version,
            bump,
            metadata_uri,
            metadata_checksum,
        })
    }

    /// Writes every field after the discriminator. The discriminator itself is
    /// left to the caller, matching how account creation stamps it once.
    pub fn write_to_account_data(&self, data: &mut [u8]) -> Result<(), LayoutError> {
        let uri = self.metadata_uri.as_bytes();
        if uri.len() > URI_LIMIT {
            return Err(LayoutError::UriTooLong);
        }
        if data.len() < self.encoded_len() {
            return Err(LayoutError::SliceTooShort);
        }

        data[AUTHORITY_OFFSET..VERSION_OFFSET].copy_from_slice(&self.authority);
        data[VERSION_OFFSET..BUMP_OFFSET].copy_from_slice(&self.version.to_le_bytes());
        data[BUMP_OFFSET] = self.bump;
        data[URI_LEN_OFFSET..URI_OFFSET].copy_from_slice(&(uri.len() as u32).to_le_bytes());
        let checksum_offset = URI_OFFSET + uri.len();
        data[URI_OFFSET..checksum_offset].copy_from_slice(uri);
        data[checksum_offset..checksum_offset + CHECKSUM_LEN].copy_from_slice(&self.metadata_checksum);
        Ok(())
    }

    pub fn encoded_len(&self) -> usize {
        REGISTRY_MIN_LEN + self.metadata_uri.len() + CHECKSUM_LEN
    }
}

/// Decoded registry state as handed to query layers: the authority is
/// rendered in base58, everything else is carried as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    pub authority: String,
    pub version: u64,
    pub bump: u8,
    pub metadata_uri: String,
    pub metadata_checksum: [u8; CHECKSUM_LEN],
}

impl RegistryRecord {
    /// All-zero checksum is the "never set" sentinel written at initialization.
    pub fn checksum_is_unset(&self) -> bool {
        self.metadata_checksum == [0u8; CHECKSUM_LEN]
    }

    pub fn metadata_view(&self) -> MetadataView {
        MetadataView {
            authority: self.authority.clone(),
            metadata_uri: self.metadata_uri.clone(),
            metadata_checksum: self.metadata_checksum,
            version: self.version,
        }
    }
}

impl From<RegistryView> for RegistryRecord {
    fn from(view: RegistryView) -> Self {
        Self {
            authority: bs58::encode(view.authority).into_string(),
            version: view.version,
            bump: view.bump,
            metadata_uri: view.metadata_uri,
            metadata_checksum: view.metadata_checksum,
        }
    }
}

/// Read projection served for metadata lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataView {
    pub authority: String,
    pub metadata_uri: String,
    pub metadata_checksum: [u8; CHECKSUM_LEN],
    pub version: u64,
}

/// Decodes a registry account into its boundary representation.
pub fn decode_registry_account(data: &[u8]) -> Result<RegistryRecord, RegistryDecodeError> {
    RegistryView::read_from_account_data(data).map(RegistryRecord::from)
}

// Callers guarantee `data.len() >= REGISTRY_MIN_LEN`, which covers both reads.
fn read_u64_at(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

fn read_u32_at(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}
