//! Encrypted on-disk storage for the activated license.
//!
//! The store holds exactly one record: the license this machine activated
//! with, plus the authority's signed certificate for it. The file is
//! encrypted with a key derived from the hardware fingerprint, so copying
//! it to another machine yields nothing readable.
//!
//! File layout: `magic || version || salt || nonce || ciphertext`.

use crate::device::HardwareId;
use crate::error::{LicenseError, LicenseResult};
use crate::record::LicenseRecord;
use rackside_crypto::{decrypt, derive_key, encrypt, EncryptedData, KdfParams, Salt, SALT_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"RSLS";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1 + SALT_SIZE;

/// What the store persists: the cached record plus its signed certificate.
///
/// The record duplicates the certificate payload so callers can display
/// license details without re-parsing; the certificate remains the source
/// of truth for anything trust-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLicense {
    /// The license record as last received from the authority.
    pub record: LicenseRecord,
    /// The raw signed certificate the record came from.
    pub certificate: String,
}

/// Encrypted single-record store for the local license.
///
/// Opened explicitly with the resolved hardware ID; there is no global
/// instance. The encryption key is re-derived from the file's salt on every
/// read, so a store file swapped in from another machine simply fails to
/// decrypt.
pub struct LicenseStore {
    path: PathBuf,
    hardware_id: String,
    params: KdfParams,
}

impl LicenseStore {
    /// Opens the store at `path`, keyed to the given hardware ID.
    ///
    /// The file is not required to exist; reads of a missing file return
    /// `None` and the first `set` creates it.
    pub fn open(path: impl Into<PathBuf>, hardware_id: &HardwareId) -> Self {
        Self::open_with_params(path, hardware_id, KdfParams::default())
    }

    /// Opens the store with explicit KDF parameters.
    /// Used by tests to avoid the production Argon2id cost.
    pub fn open_with_params(
        path: impl Into<PathBuf>,
        hardware_id: &HardwareId,
        params: KdfParams,
    ) -> Self {
        Self {
            path: path.into(),
            hardware_id: hardware_id.as_str().to_string(),
            params,
        }
    }

    /// The default store location under the user's data directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rackside")
            .join("license.bin")
    }

    /// Returns the path of the store file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and decrypts the stored license, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageCorrupt` if the file exists but cannot be parsed or
    /// decrypted (including a file copied from a different machine), and
    /// `Storage` for I/O failures.
    pub fn get(&self) -> LicenseResult<Option<StoredLicense>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LicenseError::Storage(format!(
                    "failed to read license store: {e}"
                )))
            }
        };

        if bytes.len() < HEADER_LEN {
            return Err(LicenseError::StorageCorrupt(
                "license store file truncated".to_string(),
            ));
        }
        if &bytes[..MAGIC.len()] != MAGIC {
            return Err(LicenseError::StorageCorrupt(
                "not a license store file".to_string(),
            ));
        }
        let version = bytes[MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(LicenseError::StorageCorrupt(format!(
                "unsupported store format version {version}"
            )));
        }

        let mut salt_bytes = [0u8; SALT_SIZE];
        salt_bytes.copy_from_slice(&bytes[MAGIC.len() + 1..HEADER_LEN]);
        let salt = Salt::from_bytes(salt_bytes);

        let encrypted = EncryptedData::from_bytes(&bytes[HEADER_LEN..])
            .map_err(|e| LicenseError::StorageCorrupt(format!("bad ciphertext framing: {e}")))?;

        let key = derive_key(&self.hardware_id, &salt, &self.params)
            .map_err(|e| LicenseError::Storage(format!("key derivation failed: {e}")))?;

        let plaintext = decrypt(&key, &encrypted).map_err(|e| {
            LicenseError::StorageCorrupt(format!("license store undecryptable: {e}"))
        })?;

        let stored: StoredLicense = serde_json::from_slice(&plaintext)
            .map_err(|e| LicenseError::StorageCorrupt(format!("bad license payload: {e}")))?;

        Ok(Some(stored))
    }

    /// Encrypts and persists the license, replacing any previous one.
    ///
    /// The write is atomic: the new content lands in a temp file in the same
    /// directory which is then renamed over the store, so a crash mid-write
    /// never leaves a partial record.
    pub fn set(&self, license: &StoredLicense) -> LicenseResult<()> {
        let plaintext = serde_json::to_vec(license)?;

        let salt = Salt::random();
        let key = derive_key(&self.hardware_id, &salt, &self.params)
            .map_err(|e| LicenseError::Storage(format!("key derivation failed: {e}")))?;
        let encrypted = encrypt(&key, &plaintext)
            .map_err(|e| LicenseError::Storage(format!("encryption failed: {e}")))?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + encrypted.len());
        bytes.extend_from_slice(MAGIC);
        bytes.push(FORMAT_VERSION);
        bytes.extend_from_slice(salt.as_bytes());
        bytes.extend_from_slice(&encrypted.to_bytes());

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LicenseError::Storage(format!("failed to create {parent:?}: {e}"))
            })?;
        }

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)
            .map_err(|e| LicenseError::Storage(format!("failed to write license store: {e}")))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            LicenseError::Storage(format!("failed to commit license store: {e}"))
        })?;

        Ok(())
    }

    /// Removes the stored license. Succeeds if none exists.
    pub fn clear(&self) -> LicenseResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LicenseError::Storage(format!(
                "failed to remove license store: {e}"
            ))),
        }
    }
}
