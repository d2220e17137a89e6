use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    anchor_compat::{ANCHOR_DISCRIMINATOR_LEN, IX_INITIALIZE_REGISTRY, IX_UPDATE_METADATA},
    registry_layout::{CHECKSUM_LEN, URI_LEN_PREFIX_LEN},
};

pub const INITIALIZE_REGISTRY_IX_LEN: usize = ANCHOR_DISCRIMINATOR_LEN + 8;
pub const UPDATE_METADATA_IX_MIN_LEN: usize = ANCHOR_DISCRIMINATOR_LEN + URI_LEN_PREFIX_LEN + CHECKSUM_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InstructionLayoutError {
    #[error("instruction data too short")]
    SliceTooShort,
    #[error("instruction discriminator does not match")]
    WrongDiscriminator,
    #[error("checksum must be 32 bytes, got {len}")]
    ChecksumLengthInvalid { len: usize },
    #[error("instruction uri is not valid utf-8")]
    InvalidUtf8,
    #[error("uri of {len} bytes does not fit a u32 length prefix")]
    UriLengthOverflow { len: usize },
}

/// `initialize_registry(version)` payload: tag followed by the little-endian
/// version.
pub fn encode_initialize_registry(version: u64) -> Vec<u8> {
    let mut ix = Vec::with_capacity(INITIALIZE_REGISTRY_IX_LEN);
    ix.extend_from_slice(&IX_INITIALIZE_REGISTRY);
    ix.extend_from_slice(&version.to_le_bytes());
    ix
}

/// `update_metadata({uri, checksum})` payload.
///
/// The URI is length-prefixed but not bounded here; the program rejects
/// anything over its 200-byte ceiling. The checksum width and the prefix range
/// are the only checks.
pub fn encode_update_metadata(uri: &str, checksum: &[u8]) -> Result<Vec<u8>, InstructionLayoutError> {
    if checksum.len() != CHECKSUM_LEN {
        return Err(InstructionLayoutError::ChecksumLengthInvalid { len: checksum.len() });
    }
    let uri = uri.as_bytes();
    let uri_len = uri_len_prefix(uri.len())?;

    let mut ix = Vec::with_capacity(UPDATE_METADATA_IX_MIN_LEN + uri.len());
    ix.extend_from_slice(&IX_UPDATE_METADATA);
    ix.extend_from_slice(&uri_len.to_le_bytes());
    ix.extend_from_slice(uri);
    ix.extend_from_slice(checksum);
    Ok(ix)
}

fn uri_len_prefix(len: usize) -> Result<u32, InstructionLayoutError> {
    u32::try_from(len).map_err(|_| InstructionLayoutError::UriLengthOverflow { len })
}

/// Checksum used when the caller publishes a URI without one: SHA-256 of the
/// URI text itself.
pub fn default_metadata_checksum(uri: &str) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(uri.as_bytes());
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializeRegistryArgs {
    pub version: u64,
}

impl InitializeRegistryArgs {
    pub fn parse(ix_data: &[u8]) -> Result<Self, InstructionLayoutError> {
        if ix_data.len() < INITIALIZE_REGISTRY_IX_LEN {
            return Err(InstructionLayoutError::SliceTooShort);
        }
        if ix_data[..8] != IX_INITIALIZE_REGISTRY {
            return Err(InstructionLayoutError::WrongDiscriminator);
        }

        Ok(Self {
            version: u64::from_le_bytes(
                ix_data[8..16].try_into().map_err(|_| InstructionLayoutError::SliceTooShort)?,
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateMetadataArgs {
    pub uri: String,
    pub checksum: [u8; CHECKSUM_LEN],
}

impl UpdateMetadataArgs {
    pub fn parse(ix_data: &[u8]) -> Result<Self, InstructionLayoutError> {
        if ix_data.len() < UPDATE_METADATA_IX_MIN_LEN {
            return Err(InstructionLayoutError::SliceTooShort);
        }
        if ix_data[..8] != IX_UPDATE_METADATA {
            return Err(InstructionLayoutError::WrongDiscriminator);
        }

        let uri_len = u32::from_le_bytes(
            ix_data[8..12].try_into().map_err(|_| InstructionLayoutError::SliceTooShort)?,
        ) as usize;
        let uri_start = ANCHOR_DISCRIMINATOR_LEN + URI_LEN_PREFIX_LEN;
        let uri_end = uri_start
            .checked_add(uri_len)
            .ok_or(InstructionLayoutError::SliceTooShort)?;
        let checksum_end = uri_end
            .checked_add(CHECKSUM_LEN)
            .ok_or(InstructionLayoutError::SliceTooShort)?;
        if ix_data.len() < checksum_end {
            return Err(InstructionLayoutError::SliceTooShort);
        }

        let uri = core::str::from_utf8(&ix_data[uri_start..uri_end])
            .map_err(|_| InstructionLayoutError::InvalidUtf8)?
            .to_owned();
        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(&ix_data[uri_end..checksum_end]);

        Ok(Self { uri, checksum })
    }
}
