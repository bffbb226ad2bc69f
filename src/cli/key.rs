//! Key-file commands.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Subcommand;
use ethers::types::{Signature, H256};
use ethers::utils::keccak256;

use crate::cli::{load_signer, resolve_password};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::sheet::{self, KeyRow};
use crate::wallet;

#[derive(Subcommand)]
pub enum KeyCommand {
    /// Generate encrypted key files.
    Gen {
        /// How many keys to generate.
        count: usize,
        /// Worker threads.
        #[arg(long, default_value_t = 4)]
        threads: usize,
        /// Directory for the key files (defaults to the configured key dir).
        #[arg(long)]
        out: Option<PathBuf>,
        /// CSV report of the generated addresses.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Key-file password (or EVMCTL_PASSWORD).
        #[arg(long)]
        password: Option<String>,
    },
    /// List key files and their addresses.
    List {
        /// Directory to list (defaults to the configured key dir).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Sign the keccak-256 digest of hex data.
    Sign {
        /// Hex data to hash and sign.
        data: String,
        /// Key file of the signing wallet.
        #[arg(long)]
        key: PathBuf,
        /// Key-file password (or EVMCTL_PASSWORD).
        #[arg(long)]
        password: Option<String>,
    },
    /// Recover the address behind a signature.
    Verify {
        /// Hex data; a 32-byte value is taken as the digest itself.
        data: String,
        /// 65-byte hex signature.
        #[arg(long)]
        signature: String,
    },
    /// Keccak-256 digest of hex data.
    Hash {
        /// Hex data.
        data: String,
    },
}

pub fn run(command: KeyCommand, settings: &Settings) -> Result<()> {
    match command {
        KeyCommand::Gen {
            count,
            threads,
            out,
            report,
            password,
        } => {
            let password = resolve_password(password)?;
            let dir = out.unwrap_or_else(|| settings.key_dir.clone());
            let generated = wallet::generate_batch(&dir, count, &password, threads)?;
            for (path, address) in &generated {
                eprintln!("{address:#x} {}", path.display());
            }
            if let Some(report) = report {
                let rows: Vec<KeyRow> = generated
                    .iter()
                    .enumerate()
                    .map(|(i, (path, address))| KeyRow {
                        index: i as u64 + 1,
                        address: format!("{address:#x}"),
                        path: path.display().to_string(),
                    })
                    .collect();
                sheet::write_key_rows(&report, &rows)?;
            }
            println!("{} keys written to {}", generated.len(), dir.display());
        }
        KeyCommand::List { dir } => {
            let dir = dir.unwrap_or_else(|| settings.key_dir.clone());
            for (path, address) in wallet::list_key_files(&dir)? {
                println!("{address} {}", path.display());
            }
        }
        KeyCommand::Sign {
            data,
            key,
            password,
        } => {
            let data = decode_hex(&data)?;
            let signer = load_signer(&key, password)?;
            let signature = wallet::sign_data(signer.signer(), &data)?;
            println!("0x{signature}");
        }
        KeyCommand::Verify { data, signature } => {
            let signature = Signature::from_str(signature.trim_start_matches("0x"))
                .map_err(|e| Error::Other(format!("bad signature: {e}")))?;
            let address = wallet::recover_signer(parse_digest(&data)?, &signature)?;
            println!("signed by {address:#x}");
        }
        KeyCommand::Hash { data } => {
            println!("0x{}", hex::encode(keccak256(decode_hex(&data)?)));
        }
    }
    Ok(())
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|_| Error::Other(format!("'{text}' is not hex data")))
}

/// Data that already decodes to 32 bytes is the digest; anything else gets
/// hashed first.
fn parse_digest(data: &str) -> Result<H256> {
    let bytes = decode_hex(data)?;
    if bytes.len() == 32 {
        Ok(H256::from_slice(&bytes))
    } else {
        Ok(H256::from(keccak256(&bytes)))
    }
}
