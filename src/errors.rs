use core::fmt;

use pinocchio::error::ProgramError;

/// Custom error codes raised by the registry program. Values follow Anchor's
/// `#[error_code]` numbering so client-side logs line up with on-chain ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum AuditRegistryError {
    InvalidVersion = 6000,
    UriTooLong = 6001,
}

impl AuditRegistryError {
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidVersion => "Version must be greater than zero",
            Self::UriTooLong => "Metadata URI exceeds limit",
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            6000 => Some(Self::InvalidVersion),
            6001 => Some(Self::UriTooLong),
            _ => None,
        }
    }
}

impl fmt::Display for AuditRegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), *self as u32)
    }
}

impl From<AuditRegistryError> for ProgramError {
    fn from(value: AuditRegistryError) -> Self {
        ProgramError::Custom(value as u32)
    }
}
