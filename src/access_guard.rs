//! Shared-secret gate for mutation-triggering entry points.

use std::fmt;

use subtle::ConstantTimeEq;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Allowed,
    Denied,
    /// No secret is configured. A server fault, not a failed attempt.
    Unconfigured,
}

impl AccessOutcome {
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// HTTP status an outer transport should answer with.
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Allowed => 200,
            Self::Denied => 401,
            Self::Unconfigured => 500,
        }
    }
}

/// Compares `provided` against `expected`.
///
/// Mismatched lengths are rejected up front. Equal-length inputs are compared
/// in constant time.
pub fn check(provided: Option<&str>, expected: &str) -> AccessOutcome {
    if expected.is_empty() {
        return AccessOutcome::Unconfigured;
    }
    let Some(provided) = provided else {
        return AccessOutcome::Denied;
    };
    let (provided, expected) = (provided.as_bytes(), expected.as_bytes());
    if provided.len() != expected.len() {
        return AccessOutcome::Denied;
    }
    if bool::from(provided.ct_eq(expected)) {
        AccessOutcome::Allowed
    } else {
        AccessOutcome::Denied
    }
}

/// Owns the configured secret.
#[derive(Clone)]
pub struct AccessGuard {
    expected: String,
}

impl AccessGuard {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    pub fn check(&self, provided: Option<&str>) -> AccessOutcome {
        let outcome = check(provided, &self.expected);
        match outcome {
            AccessOutcome::Unconfigured => error!("access secret is not configured"),
            AccessOutcome::Denied => debug!(present = provided.is_some(), "access denied"),
            AccessOutcome::Allowed => {}
        }
        outcome
    }
}

impl fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGuard")
            .field("expected", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-1234";

    #[test]
    fn matching_secret_is_allowed() {
        assert_eq!(check(Some(SECRET), SECRET), AccessOutcome::Allowed);
    }

    #[test]
    fn missing_secret_is_denied() {
        assert_eq!(check(None, SECRET), AccessOutcome::Denied);
    }

    #[test]
    fn wrong_secret_is_denied() {
        assert_eq!(check(Some("wrong-secret-key-123"), SECRET), AccessOutcome::Denied);
        assert_eq!(check(Some(""), SECRET), AccessOutcome::Denied);
    }

    #[test]
    fn length_mismatch_is_denied() {
        assert_eq!(check(Some("test-secret-key-12345"), SECRET), AccessOutcome::Denied);
        assert_eq!(check(Some("test"), SECRET), AccessOutcome::Denied);
    }

    #[test]
    fn empty_expected_is_unconfigured() {
        assert_eq!(check(Some(SECRET), ""), AccessOutcome::Unconfigured);
        assert_eq!(check(None, ""), AccessOutcome::Unconfigured);
    }

    #[test]
    fn outcomes_map_to_status_codes() {
        assert_eq!(AccessOutcome::Allowed.status_code(), 200);
        assert_eq!(AccessOutcome::Denied.status_code(), 401);
        assert_eq!(AccessOutcome::Unconfigured.status_code(), 500);
        assert!(AccessOutcome::Allowed.is_allowed());
        assert!(!AccessOutcome::Denied.is_allowed());
    }

    #[test]
    fn guard_checks_against_owned_secret() {
        let guard = AccessGuard::new(SECRET);
        assert_eq!(guard.check(Some(SECRET)), AccessOutcome::Allowed);
        assert_eq!(guard.check(Some("x")), AccessOutcome::Denied);
        assert_eq!(AccessGuard::new("").check(Some(SECRET)), AccessOutcome::Unconfigured);
    }

    #[test]
    fn debug_output_hides_secret() {
        let rendered = format!("{:?}", AccessGuard::new(SECRET));
        assert!(!rendered.contains(SECRET));
    }
}
