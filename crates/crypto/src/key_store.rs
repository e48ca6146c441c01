// Path: crates/crypto/src/key_store.rs
//! Local encryption of cached identities.
//!
//! Current format (writes and reads):
//! `v2.` + base64( [ Nonce: 12B ] [ AES-256-GCM ciphertext + tag ] )
//! under a random per-user key kept in the same store.
//!
//! Legacy format (reads only):
//! base64( AES-256-CBC / PKCS#7 ciphertext ), fixed IV, key = SHA-256(passphrase).

use crate::algorithms::hash::sha256;
use crate::error::CryptoError;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dashmap::DashMap;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Prefix marking blobs written in the current format.
pub const VERSION_TAG: &str = "v2.";
/// Store key prefix for per-user symmetric keys.
pub const SYM_KEY_PREFIX: &str = "stitch_sym_key_";
/// Store key prefix for encrypted identity records.
pub const IDENTITY_PREFIX: &str = "stitch_identity_";

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const LEGACY_IV: [u8; 16] = *b"stitch-legacy-iv";

type LegacyDecryptor = cbc::Decryptor<aes::Aes256>;

/// A container for sensitive data that zeroizes on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SensitiveBytes(pub Vec<u8>);

/// A string key/value store for locally persisted client state.
pub trait LocalStore: Send + Sync {
    /// Reads a value.
    fn get(&self, key: &str) -> Result<Option<String>, CryptoError>;
    /// Writes a value.
    fn set(&self, key: &str, value: &str) -> Result<(), CryptoError>;
    /// Deletes a value; missing keys are not an error.
    fn remove(&self, key: &str) -> Result<(), CryptoError>;
}

/// An in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CryptoError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CryptoError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CryptoError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A store keeping one file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self, CryptoError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| CryptoError::Store(format!("create {}: {e}", dir.display())))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path(&self, key: &str) -> Result<PathBuf, CryptoError> {
        if !is_store_name(key) {
            return Err(CryptoError::Store(format!(
                "'{}' is not a valid store name",
                sanitize_key(key)
            )));
        }
        Ok(self.dir.join(key))
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CryptoError> {
        match std::fs::read_to_string(self.path(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CryptoError::Store(format!("read {key}: {e}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CryptoError> {
        std::fs::write(self.path(key)?, value)
            .map_err(|e| CryptoError::Store(format!("write {key}: {e}")))
    }

    fn remove(&self, key: &str) -> Result<(), CryptoError> {
        match std::fs::remove_file(self.path(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CryptoError::Store(format!("remove {key}: {e}"))),
        }
    }
}

fn is_plain_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-')
}

/// Encodes a name into `[A-Za-z0-9._%-]`. Bytes outside `[A-Za-z0-9._-]`,
/// `%` included, become `%XX`, so distinct names never share an encoding.
pub fn sanitize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        if is_plain_key_byte(b) {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Whether `key` can name a file in a [`FileStore`] as is.
fn is_store_name(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && key.bytes().all(|b| is_plain_key_byte(b) || b == b'%')
}

/// Drops every character outside `[A-Za-z0-9._:+/=-]`.
pub fn sanitize_value(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '+' | '/' | '=' | '-'))
        .collect()
}

/// An identity cached on the local machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIdentity {
    /// The MSP the identity belongs to.
    pub msp_id: String,
    /// The PEM certificate.
    pub cert: String,
    /// The PEM private key.
    pub private_key: String,
}

impl Drop for StoredIdentity {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

/// Encrypts and decrypts per-user data in a [`LocalStore`].
pub struct IdentityVault<S: LocalStore> {
    store: S,
    legacy_passphrase: Option<Zeroizing<String>>,
}

impl<S: LocalStore> IdentityVault<S> {
    /// Wraps a store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            legacy_passphrase: None,
        }
    }

    /// Enables reading blobs written by the legacy cipher.
    pub fn with_legacy_passphrase(mut self, passphrase: &str) -> Self {
        self.legacy_passphrase = Some(Zeroizing::new(passphrase.to_string()));
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn existing_key(&self, username: &str) -> Result<Option<Zeroizing<Vec<u8>>>, CryptoError> {
        let name = format!("{SYM_KEY_PREFIX}{}", sanitize_key(username));
        let Some(encoded) = self.store.get(&name)? else {
            return Ok(None);
        };
        let key = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| CryptoError::Store(format!("corrupt key for {username}: {e}")))?,
        );
        if key.len() != KEY_LEN {
            return Err(CryptoError::Store(format!(
                "key for {username} has {} bytes",
                key.len()
            )));
        }
        Ok(Some(key))
    }

    fn key_for_write(&self, username: &str) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        if let Some(key) = self.existing_key(username)? {
            return Ok(key);
        }
        let mut fresh = Zeroizing::new(vec![0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut fresh);
        let name = format!("{SYM_KEY_PREFIX}{}", sanitize_key(username));
        self.store
            .set(&name, &sanitize_value(&STANDARD.encode(fresh.as_slice())))?;
        log::info!("generated local encryption key for {}", sanitize_key(username));
        Ok(fresh)
    }

    /// Encrypts `plaintext` under the user's key, creating the key on first use.
    pub fn encrypt_local(&self, username: &str, plaintext: &[u8]) -> Result<String, CryptoError> {
        let key = self.key_for_write(username)?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        let mut packed = nonce.to_vec();
        packed.extend_from_slice(&ciphertext);
        Ok(format!("{VERSION_TAG}{}", STANDARD.encode(packed)))
    }

    /// Decrypts a blob, falling back to the legacy cipher for untagged input.
    pub fn decrypt_local(&self, username: &str, blob: &str) -> Result<SensitiveBytes, CryptoError> {
        let blob = blob.trim();
        let Some(body) = blob.strip_prefix(VERSION_TAG) else {
            let passphrase = self.legacy_passphrase.as_ref().ok_or_else(|| {
                CryptoError::Decryption("legacy blob but no legacy passphrase configured".into())
            })?;
            log::debug!("decrypting legacy blob for {}", sanitize_key(username));
            return legacy_decrypt(blob, passphrase);
        };
        let key = self
            .existing_key(username)?
            .ok_or_else(|| CryptoError::Decryption(format!("no local key for {username}")))?;
        let packed = STANDARD
            .decode(body)
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;
        if packed.len() < NONCE_LEN {
            return Err(CryptoError::Decryption("blob too short".into()));
        }
        let (nonce, ciphertext) = packed.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map(SensitiveBytes)
            .map_err(|_| CryptoError::Decryption("authentication failed".into()))
    }

    /// Encrypts and stores an identity record.
    pub fn save_identity(&self, username: &str, identity: &StoredIdentity) -> Result<(), CryptoError> {
        let json = Zeroizing::new(
            serde_json::to_vec(identity).map_err(|e| CryptoError::Store(e.to_string()))?,
        );
        let blob = self.encrypt_local(username, &json)?;
        self.store.set(
            &format!("{IDENTITY_PREFIX}{}", sanitize_key(username)),
            &sanitize_value(&blob),
        )
    }

    /// Loads and decrypts an identity record.
    pub fn load_identity(&self, username: &str) -> Result<Option<StoredIdentity>, CryptoError> {
        let name = format!("{IDENTITY_PREFIX}{}", sanitize_key(username));
        let Some(blob) = self.store.get(&name)? else {
            return Ok(None);
        };
        let plain = self.decrypt_local(username, &blob)?;
        serde_json::from_slice(&plain.0)
            .map(Some)
            .map_err(|e| CryptoError::Store(format!("corrupt identity for {username}: {e}")))
    }

    /// Deletes an identity record and its key.
    pub fn remove_identity(&self, username: &str) -> Result<(), CryptoError> {
        let user = sanitize_key(username);
        self.store.remove(&format!("{IDENTITY_PREFIX}{user}"))?;
        self.store.remove(&format!("{SYM_KEY_PREFIX}{user}"))
    }
}

/// Decrypts a legacy (untagged) blob.
pub fn legacy_decrypt(blob: &str, passphrase: &str) -> Result<SensitiveBytes, CryptoError> {
    let ciphertext = STANDARD
        .decode(blob.trim())
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    let key = Zeroizing::new(sha256(passphrase.as_bytes()));
    let decryptor = LegacyDecryptor::new_from_slices(key.as_slice(), &LEGACY_IV)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map(SensitiveBytes)
        .map_err(|_| CryptoError::Decryption("legacy padding check failed".into()))
}
