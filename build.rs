use std::{env, fmt::Write as _, fs, path::PathBuf};

use sha2::{Digest, Sha256};

const ACCOUNTS: &[&str] = &["Registry"];
const INSTRUCTIONS: &[&str] = &["initialize_registry", "update_metadata"];
const DEFAULT_PROGRAM_ID: &str = "H3ZDWgBkZ9kxer2KjCeL2oFZkftZRUTikpd6PseXkgpL";

fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

fn decode_address(encoded: &str) -> [u8; 32] {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .unwrap_or_else(|err| panic!("invalid base58 address {encoded}: {err}"));
    bytes
        .try_into()
        .unwrap_or_else(|_| panic!("address {encoded} does not decode to 32 bytes"))
}

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    let mut discriminators = String::new();
    for name in ACCOUNTS {
        let value = discriminator("account", name);
        writeln!(
            discriminators,
            "pub const ACCT_{}: [u8; 8] = {:?};",
            name.to_uppercase(),
            value
        )
        .unwrap();
    }
    for name in INSTRUCTIONS {
        let value = discriminator("global", name);
        writeln!(
            discriminators,
            "pub const IX_{}: [u8; 8] = {:?};",
            name.to_uppercase(),
            value
        )
        .unwrap();
    }
    fs::write(out_dir.join("discriminators.rs"), discriminators).unwrap();

    let program_ids = format!(
        "pub const DEFAULT_PROGRAM_ID: [u8; 32] = {:?};\npub const DEFAULT_PROGRAM_ID_BASE58: &str = {:?};\n",
        decode_address(DEFAULT_PROGRAM_ID),
        DEFAULT_PROGRAM_ID,
    );
    fs::write(out_dir.join("program_ids.rs"), program_ids).unwrap();

    println!("cargo:rerun-if-changed=build.rs");
}
