//! Password-protected vault backed by sled + XChaCha20-Poly1305.
//!
//! A vault holds one encrypted record: the secret data of an unlocked
//! session. The encryption key is derived from the passphrase with
//! Argon2id; the salt, the KDF cost and an encrypted verification token
//! live in an internal meta tree.
//!
//! ## Security
//!
//! - The passphrase is NEVER stored
//! - Every write uses a fresh random nonce
//! - A missing vault, a wrong passphrase and a damaged vault all fail with
//!   the same [`StoreError::UnlockFailed`]
//! - The derived key is zeroized on drop
//!
//! ## Example
//!
//! ```no_run
//! use whistle_store::vault::{KdfParams, Vault};
//! use std::path::Path;
//!
//! let path = Path::new("/tmp/whistle-vault");
//! let vault = Vault::create(path, b"correct horse", &KdfParams::default()).unwrap();
//! vault.store(&vec![1u8, 2, 3]).unwrap();
//! drop(vault);
//!
//! let vault = Vault::open(path, b"correct horse").unwrap();
//! let data: Option<Vec<u8>> = vault.load().unwrap();
//! assert_eq!(data, Some(vec![1, 2, 3]));
//! ```

use std::path::{Path, PathBuf};

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use whistle_crypto::symmetric::{open, seal, SealedBytes, SymmetricKey};

use crate::{Result, StoreError};

/// Salt size in bytes.
const SALT_SIZE: usize = 32;

/// Name of the meta tree for internal storage.
const META_TREE_NAME: &str = "__meta__";

const SALT_KEY: &[u8] = b"salt";
const KDF_KEY: &[u8] = b"kdf";
const VERIFY_KEY: &[u8] = b"verify";
const VERIFY_VALUE: &[u8] = b"WHISTLE_VAULT_v1";

/// Key of the single secret data record in the default tree.
const SECRET_DATA_KEY: &[u8] = b"secret_data";

const ARGON2_OUTPUT_LEN: usize = 32;

/// Argon2id cost parameters.
///
/// Persisted in the vault at creation so that reopening always uses the
/// cost the vault was created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Parallel lanes.
    pub parallelism: u32,
}

impl KdfParams {
    /// Production cost: 64 MiB, 3 passes, 4 lanes.
    pub const fn production() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 4,
        }
    }

    /// Minimal cost for tests. Never use for a real vault.
    pub const fn low_cost() -> Self {
        Self {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(ARGON2_OUTPUT_LEN),
        )
        .map_err(|e| StoreError::Kdf(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::production()
    }
}

/// A vault encryption key derived from a passphrase.
#[derive(Zeroize, ZeroizeOnDrop)]
struct VaultKey {
    key: SymmetricKey,
}

impl VaultKey {
    fn derive(passphrase: &[u8], salt: &[u8; SALT_SIZE], params: &KdfParams) -> Result<Self> {
        let mut key_bytes = Zeroizing::new([0u8; ARGON2_OUTPUT_LEN]);
        params
            .argon2()?
            .hash_password_into(passphrase, salt, &mut key_bytes[..])
            .map_err(|e| StoreError::Kdf(e.to_string()))?;
        Ok(Self {
            key: SymmetricKey::from_bytes(&key_bytes[..])?,
        })
    }
}

/// An open, unlocked vault.
///
/// sled holds an exclusive lock on the directory while this value lives;
/// drop it before opening the same path again.
pub struct Vault {
    db: sled::Db,
    key: VaultKey,
    path: PathBuf,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Vault {
    /// Check whether a vault directory exists at `path`.
    pub fn exists(path: &Path) -> bool {
        path.is_dir()
    }

    /// Create a new vault.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if something already exists at
    /// `path`, or a database/KDF error if creation fails.
    pub fn create(path: &Path, passphrase: &[u8], params: &KdfParams) -> Result<Self> {
        if path.exists() {
            return Err(StoreError::AlreadyExists);
        }

        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let key = VaultKey::derive(passphrase, &salt, params)?;

        let db = sled::open(path)
            .map_err(|e| StoreError::Database(format!("Failed to create vault: {}", e)))?;
        let meta = open_meta(&db)?;

        let kdf_bytes =
            bincode::serialize(params).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let verify = seal(&key.key, VERIFY_VALUE)?;

        meta.insert(SALT_KEY, &salt[..])
            .and_then(|_| meta.insert(KDF_KEY, kdf_bytes))
            .and_then(|_| meta.insert(VERIFY_KEY, verify.to_bytes()))
            .map_err(|e| StoreError::Database(format!("Failed to write vault header: {}", e)))?;
        db.flush()
            .map_err(|e| StoreError::Database(format!("Failed to flush: {}", e)))?;

        Ok(Self {
            db,
            key,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing vault with `passphrase`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnlockFailed` for any failure, without saying
    /// which.
    pub fn open(path: &Path, passphrase: &[u8]) -> Result<Self> {
        if !Self::exists(path) {
            return Err(StoreError::UnlockFailed);
        }
        Self::try_open(path, passphrase).map_err(|_| StoreError::UnlockFailed)
    }

    fn try_open(path: &Path, passphrase: &[u8]) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| StoreError::Database(format!("Failed to open vault: {}", e)))?;
        let meta = open_meta(&db)?;

        let salt: [u8; SALT_SIZE] = read_meta(&meta, SALT_KEY)?
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::UnlockFailed)?;
        let params: KdfParams = bincode::deserialize(&read_meta(&meta, KDF_KEY)?)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let key = VaultKey::derive(passphrase, &salt, &params)?;

        let verify = SealedBytes::from_bytes(&read_meta(&meta, VERIFY_KEY)?)?;
        if open(&key.key, &verify)? != VERIFY_VALUE {
            return Err(StoreError::UnlockFailed);
        }

        Ok(Self {
            db,
            key,
            path: path.to_path_buf(),
        })
    }

    /// Encrypt and persist `value`, replacing the previous record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization, encryption or the write fails.
    pub fn store<T: Serialize>(&self, value: &T) -> Result<()> {
        let plaintext = Zeroizing::new(
            bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?,
        );
        let sealed = seal(&self.key.key, &plaintext)?;

        self.db
            .insert(SECRET_DATA_KEY, sealed.to_bytes())
            .map_err(|e| StoreError::Database(format!("Failed to insert: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| StoreError::Database(format!("Failed to flush: {}", e)))?;
        Ok(())
    }

    /// Load and decrypt the stored record, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be decrypted or decoded.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let Some(bytes) = self
            .db
            .get(SECRET_DATA_KEY)
            .map_err(|e| StoreError::Database(format!("Failed to get: {}", e)))?
        else {
            return Ok(None);
        };

        let sealed = SealedBytes::from_bytes(&bytes)?;
        let plaintext = Zeroizing::new(open(&self.key.key, &sealed)?);
        let value = bincode::deserialize(&plaintext)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(value))
    }

    /// Remove the vault directory at `path`. Missing vaults are not an error.
    ///
    /// Any open [`Vault`] for the path must be dropped first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be removed.
    pub fn delete(path: &Path) -> Result<()> {
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Get the path to the vault directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_meta(db: &sled::Db) -> Result<sled::Tree> {
    db.open_tree(META_TREE_NAME)
        .map_err(|e| StoreError::Database(format!("Failed to open meta tree: {}", e)))
}

fn read_meta(meta: &sled::Tree, key: &[u8]) -> Result<Vec<u8>> {
    meta.get(key)
        .map_err(|e| StoreError::Database(format!("Failed to read meta: {}", e)))?
        .map(|v| v.to_vec())
        .ok_or(StoreError::UnlockFailed)
}
