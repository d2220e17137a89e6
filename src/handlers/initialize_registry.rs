use pinocchio::error::ProgramError;

use crate::{
    anchor_compat::account_discriminator,
    errors::AuditRegistryError,
    instruction_layouts::InitializeRegistryArgs,
    registry_layout::{RegistryView, CHECKSUM_LEN, PUBKEY_LEN, REGISTRY_ACCOUNT_LEN},
};

pub fn process_anchor_bytes(
    authority_pubkey: [u8; PUBKEY_LEN],
    registry_account_data: &mut [u8],
    registry_bump: u8,
    ix_data: &[u8],
) -> Result<(), ProgramError> {
    let args = InitializeRegistryArgs::parse(ix_data)
        .map_err(|_| ProgramError::InvalidInstructionData)?;

    if args.version == 0 {
        return Err(AuditRegistryError::InvalidVersion.into());
    }
    if registry_account_data.len() != REGISTRY_ACCOUNT_LEN {
        return Err(ProgramError::InvalidAccountData);
    }
    if registry_account_data[..8] != [0u8; 8] {
        return Err(ProgramError::AccountAlreadyInitialized);
    }

    registry_account_data[..8].copy_from_slice(&account_discriminator("Registry"));
    RegistryView {
        authority: authority_pubkey,
        version: args.version,
        bump: registry_bump,
        metadata_uri: String::new(),
        metadata_checksum: [0u8; CHECKSUM_LEN],
    }
    .write_to_account_data(registry_account_data)
    .map_err(|_| ProgramError::InvalidAccountData)?;

    Ok(())
}
