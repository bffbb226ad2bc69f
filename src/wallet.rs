//! Encrypted key files.
//!
//! A key file is a small JSON document `{ "address": ..., "key": ... }`
//! where `key` holds the hex private key encrypted with an Argon2-derived
//! AES-256-GCM key, serialized as `salt.payload` (both base64, the payload
//! carrying a random 96-bit nonce prefix). The address is stored in the
//! clear so key files can be listed without the password.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, KeyInit, Nonce};
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Signature, H256};
use ethers::utils::keccak256;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Error, Result};

const NONCE_LEN: usize = 12;
const MAX_GENERATOR_THREADS: usize = 64;

/// Key derived from the password for one salt.
struct FileKey(Key<Aes256Gcm>);

impl FileKey {
    fn derive(password: &str, salt: &SaltString) -> Result<Self> {
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), salt)
            .map_err(|e| Error::Wallet(format!("key derivation failed: {e}")))?;
        let hash = hash
            .hash
            .ok_or_else(|| Error::Wallet("key derivation produced no output".to_string()))?;
        Ok(Self(Key::<Aes256Gcm>::clone_from_slice(hash.as_bytes())))
    }

    fn seal(&self, plaintext: &str) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new(&self.0);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| Error::Wallet(format!("encryption failed: {e}")))?;
        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(&self, sealed: &[u8]) -> Result<SecretString> {
        if sealed.len() < NONCE_LEN {
            return Err(Error::Wallet(
                "sealed key is too short to carry a nonce".to_string(),
            ));
        }
        let cipher = Aes256Gcm::new(&self.0);
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::Wallet("decryption failed, likely a wrong password".to_string()))?;
        let plaintext = String::from_utf8(plaintext)
            .map_err(|_| Error::Wallet("decrypted key is not valid utf-8".to_string()))?;
        Ok(SecretString::new(plaintext))
    }
}

/// Encrypt a hex private key into `salt.payload` form with a fresh salt.
fn seal_key_material(private_key_hex: &str, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let key = FileKey::derive(password, &salt)?;
    let payload = key.seal(private_key_hex)?;
    Ok(format!(
        "{}.{}",
        STANDARD_NO_PAD.encode(salt.as_str()),
        STANDARD_NO_PAD.encode(payload)
    ))
}

/// Reverse of `seal_key_material`.
fn open_key_material(sealed: &str, password: &str) -> Result<SecretString> {
    let (salt_b64, payload_b64) = sealed
        .split_once('.')
        .ok_or_else(|| Error::Wallet("sealed key is not in salt.payload form".to_string()))?;
    let salt = STANDARD_NO_PAD
        .decode(salt_b64)
        .map_err(|e| Error::Wallet(format!("bad salt encoding: {e}")))?;
    let salt = String::from_utf8(salt)
        .map_err(|_| Error::Wallet("salt is not valid utf-8".to_string()))?;
    let salt = SaltString::from_b64(&salt)
        .map_err(|e| Error::Wallet(format!("bad salt: {e}")))?;
    let payload = STANDARD_NO_PAD
        .decode(payload_b64)
        .map_err(|e| Error::Wallet(format!("bad payload encoding: {e}")))?;
    FileKey::derive(password, &salt)?.open(&payload)
}

#[derive(Serialize, Deserialize)]
struct KeyFileDocument {
    address: String,
    key: String,
}

/// A signing wallet backed by one encrypted key file.
pub struct Wallet {
    path: PathBuf,
    signer: LocalWallet,
}

impl Wallet {
    /// Create a wallet with a fresh random key. Nothing touches disk until
    /// `save`.
    pub fn generate(path: PathBuf) -> Self {
        let signer = LocalWallet::new(&mut rand::thread_rng());
        Wallet { path, signer }
    }

    /// Load and decrypt an existing key file.
    pub fn load(path: PathBuf, password: &str) -> Result<Self> {
        let data = fs::read_to_string(&path)?;
        let document: KeyFileDocument = serde_json::from_str(&data)?;
        let key_hex = open_key_material(&document.key, password)?;
        let signer: LocalWallet = key_hex
            .expose_secret()
            .parse()
            .map_err(|_| Error::Wallet(format!("{}: invalid key material", path.display())))?;
        Ok(Wallet { path, signer })
    }

    /// Encrypt and write the key file.
    pub fn save(&self, password: &str) -> Result<()> {
        let key_hex = hex::encode(self.signer.signer().to_bytes());
        let document = KeyFileDocument {
            address: format!("{:#x}", self.signer.address()),
            key: seal_key_material(&key_hex, password)?,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&document)?)?;
        debug!(path = %self.path.display(), "key file written");
        Ok(())
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &LocalWallet {
        &self.signer
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Sign the keccak-256 digest of `data` with the wallet key. The signature
/// carries a recovery id, so no public key is needed to verify it.
pub fn sign_data(signer: &LocalWallet, data: &[u8]) -> Result<Signature> {
    let digest = H256::from(keccak256(data));
    signer
        .sign_hash(digest)
        .map_err(|e| Error::Wallet(format!("signing failed: {e}")))
}

/// Recover the address that produced `signature` over `digest`.
pub fn recover_signer(digest: H256, signature: &Signature) -> Result<Address> {
    signature
        .recover(digest)
        .map_err(|e| Error::Wallet(format!("signature recovery failed: {e}")))
}

/// List key files in a directory without decrypting them, sorted by path.
pub fn list_key_files(dir: &Path) -> Result<Vec<(PathBuf, String)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Ok(data) = fs::read_to_string(&path) else {
            continue;
        };
        let Ok(document) = serde_json::from_str::<KeyFileDocument>(&data) else {
            continue;
        };
        entries.push((path, document.address));
    }
    entries.sort();
    Ok(entries)
}

/// Load and decrypt every key file in a directory, sorted by path.
pub fn load_key_files(dir: &Path, password: &str) -> Result<Vec<Wallet>> {
    let mut wallets = Vec::new();
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();
    for path in paths {
        wallets.push(Wallet::load(path, password)?);
    }
    Ok(wallets)
}

/// Generate `count` key files named `key_<n>.json` under `dir`, spread over
/// a fixed-size pool of worker threads. Each worker owns a contiguous index
/// range and pushes its results into a shared list; the call returns after
/// every worker has joined. Individual failures are logged and skipped.
pub fn generate_batch(
    dir: &Path,
    count: usize,
    password: &str,
    threads: usize,
) -> Result<Vec<(PathBuf, Address)>> {
    fs::create_dir_all(dir)?;
    let threads = threads.clamp(1, MAX_GENERATOR_THREADS).min(count.max(1));
    let per_worker = count / threads;
    let results = Arc::new(Mutex::new(Vec::with_capacity(count)));

    std::thread::scope(|scope| {
        for worker in 0..threads {
            let start = worker * per_worker + 1;
            let size = if worker == threads - 1 {
                count - worker * per_worker
            } else {
                per_worker
            };
            let results = Arc::clone(&results);
            scope.spawn(move || {
                for offset in 0..size {
                    let path = dir.join(format!("key_{}.json", start + offset));
                    let wallet = Wallet::generate(path.clone());
                    if let Err(e) = wallet.save(password) {
                        error!(path = %path.display(), error = %e, "key generation failed");
                        continue;
                    }
                    if let Ok(mut list) = results.lock() {
                        list.push((path, wallet.address()));
                    }
                }
            });
        }
    });

    let mut generated = results
        .lock()
        .map_err(|_| Error::Wallet("key generator pool poisoned".to_string()))?
        .clone();
    generated.sort();
    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let sealed = seal_key_material("deadbeef", "hunter2").unwrap();
        assert!(sealed.contains('.'));
        let opened = open_key_material(&sealed, "hunter2").unwrap();
        assert_eq!(opened.expose_secret(), "deadbeef");
    }

    #[test]
    fn wrong_password_is_rejected() {
        let sealed = seal_key_material("deadbeef", "hunter2").unwrap();
        assert!(matches!(
            open_key_material(&sealed, "hunter3"),
            Err(Error::Wallet(_))
        ));
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key_1.json");
        let wallet = Wallet::generate(path.clone());
        let address = wallet.address();
        wallet.save("pw").unwrap();

        let loaded = Wallet::load(path, "pw").unwrap();
        assert_eq!(loaded.address(), address);
    }

    #[test]
    fn listing_does_not_need_the_password() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = Wallet::generate(dir.path().join("key_1.json"));
        wallet.save("pw").unwrap();

        let listed = list_key_files(dir.path()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].1, format!("{:#x}", wallet.address()));
    }

    #[test]
    fn signatures_recover_to_the_signing_address() {
        let wallet = Wallet::generate(PathBuf::from("unused.json"));
        let data = hex::decode("deadbeef").unwrap();

        let signature = sign_data(wallet.signer(), &data).unwrap();
        let digest = H256::from(keccak256(&data));
        assert_eq!(
            recover_signer(digest, &signature).unwrap(),
            wallet.address()
        );

        // Over any other digest the signature does not name this wallet.
        let recovered = recover_signer(H256::repeat_byte(0x11), &signature);
        assert!(recovered.map_or(true, |a| a != wallet.address()));
    }

    #[test]
    fn batch_generation_covers_the_whole_range() {
        let dir = tempfile::tempdir().unwrap();
        let generated = generate_batch(dir.path(), 5, "pw", 3).unwrap();
        assert_eq!(generated.len(), 5);

        let wallets = load_key_files(dir.path(), "pw").unwrap();
        assert_eq!(wallets.len(), 5);
        // Each file decrypts back to the address recorded at generation.
        for (path, address) in &generated {
            let loaded = Wallet::load(path.clone(), "pw").unwrap();
            assert_eq!(loaded.address(), *address);
        }
    }
}
