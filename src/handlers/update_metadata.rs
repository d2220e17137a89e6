use pinocchio::error::ProgramError;

use crate::{
    errors::AuditRegistryError,
    instruction_layouts::UpdateMetadataArgs,
    registry_layout::{RegistryView, PUBKEY_LEN, URI_LIMIT},
};

/// Replaces the metadata pointer. `version` and `bump` are carried over
/// untouched.
pub fn process_anchor_bytes(
    signer_pubkey: [u8; PUBKEY_LEN],
    registry_account_data: &mut [u8],
    ix_data: &[u8],
) -> Result<(), ProgramError> {
    let args = UpdateMetadataArgs::parse(ix_data)
        .map_err(|_| ProgramError::InvalidInstructionData)?;

    let mut registry = RegistryView::read_from_account_data(registry_account_data)
        .map_err(|_| ProgramError::InvalidAccountData)?;

    if registry.authority != signer_pubkey {
        return Err(ProgramError::MissingRequiredSignature);
    }
    if args.uri.len() > URI_LIMIT {
        return Err(AuditRegistryError::UriTooLong.into());
    }

    let previous_len = registry.encoded_len();
    registry.metadata_uri = args.uri;
    registry.metadata_checksum = args.checksum;
    let next_len = registry.encoded_len();

    registry
        .write_to_account_data(registry_account_data)
        .map_err(|_| ProgramError::AccountDataTooSmall)?;
    if previous_len > next_len {
        registry_account_data[next_len..previous_len].fill(0);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        anchor_compat::account_discriminator,
        instruction_layouts::encode_update_metadata,
        registry_layout::{CHECKSUM_LEN, REGISTRY_ACCOUNT_LEN},
    };

    fn sample_registry(authority: [u8; 32], uri: &str) -> [u8; REGISTRY_ACCOUNT_LEN] {
        let view = RegistryView {
            authority,
            version: 1,
            bump: 254,
            metadata_uri: uri.to_owned(),
            metadata_checksum: [0u8; CHECKSUM_LEN],
        };

        let mut data = [0u8; REGISTRY_ACCOUNT_LEN];
        data[..8].copy_from_slice(&account_discriminator("Registry"));
        view.write_to_account_data(&mut data).unwrap();
        data
    }

    #[test]
    fn applies_update_to_registry_layout() {
        let authority = [7u8; 32];
        let mut data = sample_registry(authority, "");
        let ix = encode_update_metadata("https://example.com/metadata.json", &[42u8; 32]).unwrap();

        process_anchor_bytes(authority, &mut data, &ix).unwrap();

        let parsed = RegistryView::read_from_account_data(&data).unwrap();
        assert_eq!(parsed.metadata_uri, "https://example.com/metadata.json");
        assert_eq!(parsed.metadata_checksum, [42u8; 32]);
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.bump, 254);
    }

    #[test]
    fn rejects_non_authority_signer() {
        let mut data = sample_registry([7u8; 32], "");
        let ix = encode_update_metadata("https://example.com", &[1u8; 32]).unwrap();

        let err = process_anchor_bytes([8u8; 32], &mut data, &ix).unwrap_err();
        assert!(matches!(err, ProgramError::MissingRequiredSignature));
        assert_eq!(RegistryView::read_from_account_data(&data).unwrap().metadata_uri, "");
    }

    #[test]
    fn rejects_uri_over_limit() {
        let authority = [7u8; 32];
        let mut data = sample_registry(authority, "");
        let ix = encode_update_metadata(&"a".repeat(URI_LIMIT + 1), &[1u8; 32]).unwrap();

        let err = process_anchor_bytes(authority, &mut data, &ix).unwrap_err();
        assert!(matches!(err, ProgramError::Custom(6001)));
    }

    #[test]
    fn accepts_uri_at_limit() {
        let authority = [7u8; 32];
        let mut data = sample_registry(authority, "");
        let uri = "a".repeat(URI_LIMIT);
        let ix = encode_update_metadata(&uri, &[1u8; 32]).unwrap();

        process_anchor_bytes(authority, &mut data, &ix).unwrap();
        assert_eq!(RegistryView::read_from_account_data(&data).unwrap().metadata_uri, uri);
    }

    #[test]
    fn shrinking_uri_clears_stale_tail() {
        let authority = [7u8; 32];
        let mut data = sample_registry(authority, "https://example.com/a/very/long/metadata/path.json");
        let ix = encode_update_metadata("ipfs://x", &[5u8; 32]).unwrap();

        process_anchor_bytes(authority, &mut data, &ix).unwrap();

        let parsed = RegistryView::read_from_account_data(&data).unwrap();
        assert_eq!(parsed.metadata_uri, "ipfs://x");
        assert!(data[parsed.encoded_len()..].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn rejects_uninitialized_account() {
        let mut data = [0u8; REGISTRY_ACCOUNT_LEN];
        let ix = encode_update_metadata("https://example.com", &[1u8; 32]).unwrap();

        let err = process_anchor_bytes([7u8; 32], &mut data, &ix).unwrap_err();
        assert!(matches!(err, ProgramError::InvalidAccountData));
    }
}
