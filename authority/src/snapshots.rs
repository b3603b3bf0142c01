//! On-disk storage for uploaded database snapshots.
//!
//! Layout is one directory per gym under the store root, one file per
//! snapshot. Writes land in a temporary sibling first and are renamed into
//! place, so a crash mid-upload never leaves a partial file under a name a
//! download could pick up. Mutations of one gym's directory are serialized
//! through a per-gym async lock; reads go lock-free against the last
//! completed rename.

use crate::error::{AuthorityError, AuthorityResult};
use rackside_types::GymId;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const TMP_SUFFIX: &str = ".tmp";

/// File store for gym database snapshots.
pub struct SnapshotStore {
    root: PathBuf,
    locks: Mutex<HashMap<GymId, Arc<tokio::sync::Mutex<()>>>>,
}

impl SnapshotStore {
    /// Creates a store rooted at the given directory. The directory is
    /// created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Stores a snapshot for a gym, returning its size and hex SHA-256.
    pub async fn store(
        &self,
        gym_id: GymId,
        file_name: &str,
        bytes: &[u8],
    ) -> AuthorityResult<(u64, String)> {
        validate_file_name(file_name)?;
        let lock = self.gym_lock(gym_id);
        let _guard = lock.lock().await;

        let dir = self.gym_dir(gym_id);
        fs::create_dir_all(&dir)
            .map_err(|e| AuthorityError::Storage(format!("failed to create snapshot dir: {e}")))?;

        let staged = dir.join(format!("{file_name}{TMP_SUFFIX}"));
        fs::write(&staged, bytes)
            .map_err(|e| AuthorityError::Storage(format!("failed to write snapshot: {e}")))?;
        fs::rename(&staged, dir.join(file_name))
            .map_err(|e| AuthorityError::Storage(format!("failed to finalize snapshot: {e}")))?;

        Ok((bytes.len() as u64, hex::encode(Sha256::digest(bytes))))
    }

    /// Reads a stored snapshot back.
    pub fn read(&self, gym_id: GymId, file_name: &str) -> AuthorityResult<Vec<u8>> {
        validate_file_name(file_name)?;
        let path = self.gym_dir(gym_id).join(file_name);
        if !path.exists() {
            return Err(AuthorityError::NotFound(format!(
                "backup {file_name} for gym {gym_id}"
            )));
        }
        fs::read(&path)
            .map_err(|e| AuthorityError::Storage(format!("failed to read snapshot: {e}")))
    }

    /// Lists the gym's stored snapshot names, sorted.
    pub fn list(&self, gym_id: GymId) -> AuthorityResult<Vec<String>> {
        let dir = self.gym_dir(gym_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir)
            .map_err(|e| AuthorityError::Storage(format!("failed to list snapshots: {e}")))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| AuthorityError::Storage(format!("failed to list snapshots: {e}")))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(TMP_SUFFIX) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Removes every snapshot belonging to a gym.
    pub async fn remove_gym(&self, gym_id: GymId) -> AuthorityResult<()> {
        let lock = self.gym_lock(gym_id);
        let _guard = lock.lock().await;

        let dir = self.gym_dir(gym_id);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| {
                AuthorityError::Storage(format!("failed to remove snapshot dir: {e}"))
            })?;
        }
        Ok(())
    }

    fn gym_dir(&self, gym_id: GymId) -> PathBuf {
        self.root.join(gym_id.to_string())
    }

    fn gym_lock(&self, gym_id: GymId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(gym_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Snapshot names are plain file names; anything that could traverse out of
/// the gym's directory is rejected before it touches the filesystem.
fn validate_file_name(name: &str) -> AuthorityResult<()> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.ends_with(TMP_SUFFIX)
    {
        return Err(AuthorityError::InvalidRequest(format!(
            "illegal snapshot file name: {name}"
        )));
    }
    Ok(())
}
