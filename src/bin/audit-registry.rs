//! audit-registry - offline and RPC tooling for registry accounts.
//!
//! Derives registry addresses, inspects live accounts and prints instruction
//! payloads as hex for handing to a transaction builder.

use anyhow::{Context, Result};
use audit_registry::config::LedgerConfig;
use audit_registry::instruction_layouts::{
    default_metadata_checksum, encode_initialize_registry, encode_update_metadata,
};
use audit_registry::ledger::{decode_address, LedgerReader, RpcLedgerReader};
use audit_registry::registry_layout::decode_registry_account;
use audit_registry::registry_service::derive_registry_address;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PREVIEW_LEN: usize = 100;

/// Registry account tooling
#[derive(Parser, Debug)]
#[command(name = "audit-registry")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the registry address and bump for an authority
    Address {
        /// Base58 authority public key
        authority: String,
    },
    /// Fetch and decode the registry account for an authority
    Inspect {
        /// Base58 authority public key
        authority: String,
    },
    /// Print an `initialize_registry` payload as hex
    EncodeInitialize {
        version: u64,
    },
    /// Print an `update_metadata` payload as hex
    EncodeUpdate {
        uri: String,

        /// 32-byte checksum as 64 hex characters; defaults to sha256(uri)
        #[arg(long, value_name = "HEX")]
        checksum: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing();

    match args.command {
        Command::Address { authority } => {
            let config = LedgerConfig::from_env()?;
            let authority_key = parse_authority(&authority)?;
            let (address, bump) = derive_registry_address(&authority_key, &config.program_id);
            println!("{}", bs58::encode(address).into_string());
            println!("bump: {bump}");
        }
        Command::Inspect { authority } => inspect(&authority).await?,
        Command::EncodeInitialize { version } => {
            println!("{}", hex::encode(encode_initialize_registry(version)));
        }
        Command::EncodeUpdate { uri, checksum } => {
            let checksum = match checksum {
                Some(encoded) => hex::decode(encoded.trim()).context("checksum is not valid hex")?,
                None => default_metadata_checksum(&uri).to_vec(),
            };
            println!("{}", hex::encode(encode_update_metadata(&uri, &checksum)?));
        }
    }

    Ok(())
}

async fn inspect(authority: &str) -> Result<()> {
    let config = LedgerConfig::from_env()?;
    let authority_key = parse_authority(authority)?;
    let (address, _) = derive_registry_address(&authority_key, &config.program_id);
    let address_b58 = bs58::encode(address).into_string();

    let reader = RpcLedgerReader::new(config.rpc_url.clone(), config.commitment)?;
    info!(rpc = %reader.url(), commitment = %config.commitment, "fetching registry");
    let Some(account) = reader
        .get_account(&address)
        .await
        .with_context(|| format!("reading {address_b58}"))?
    else {
        println!("no account at {address_b58}");
        return Ok(());
    };

    println!("address: {address_b58}");
    println!("owner:   {}", bs58::encode(account.owner).into_string());
    println!("size:    {}", account.data.len());
    if account.owner != config.program_id {
        println!("account is not owned by the registry program");
        return Ok(());
    }

    match decode_registry_account(&account.data) {
        Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        Err(err) => {
            println!("decode failed: {err}");
            let end = account.data.len().min(PREVIEW_LEN);
            println!("preview: {}", hex::encode(&account.data[..end]));
        }
    }
    Ok(())
}

fn parse_authority(authority: &str) -> Result<[u8; 32]> {
    decode_address(authority)
        .with_context(|| format!("{authority} is not a 32-byte base58 public key"))
}

fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
