//! Stage-verify-swap application of pushed database snapshots.
//!
//! A pushed snapshot never touches the live database until it has been
//! fully written to a staging file and its size and SHA-256 both match the
//! push envelope. The swap itself is two renames: live to `.bak`, staged to
//! live. A crash between them leaves the backup intact, and [`recover`]
//! puts it back on the next launch, so the gym always has a valid database.

use crate::error::{TenantError, TenantResult};
use rackside_license::PushEnvelope;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const STAGE_SUFFIX: &str = ".staged";
const BACKUP_SUFFIX: &str = ".bak";

/// Writes snapshot bytes to the staging file next to the live database.
///
/// Returns the staging path. The live database is not touched.
pub fn stage(live_db: &Path, bytes: &[u8]) -> TenantResult<PathBuf> {
    if let Some(parent) = live_db.parent() {
        fs::create_dir_all(parent)?;
    }
    let staged = sibling(live_db, STAGE_SUFFIX);
    fs::write(&staged, bytes)?;
    Ok(staged)
}

/// Checks a staged snapshot against its push envelope.
///
/// # Errors
///
/// `SnapshotVerification` when the file size or SHA-256 does not match the
/// envelope.
pub fn verify(staged: &Path, envelope: &PushEnvelope) -> TenantResult<()> {
    let len = fs::metadata(staged)?.len();
    if len != envelope.size_bytes {
        return Err(TenantError::SnapshotVerification(format!(
            "size mismatch for {}: expected {}, got {}",
            envelope.file_name, envelope.size_bytes, len
        )));
    }

    let bytes = fs::read(staged)?;
    let digest = hex::encode(Sha256::digest(&bytes));
    if !digest.eq_ignore_ascii_case(&envelope.sha256_hex) {
        return Err(TenantError::SnapshotVerification(format!(
            "checksum mismatch for {}",
            envelope.file_name
        )));
    }
    Ok(())
}

/// Replaces the live database with the staged snapshot.
///
/// The previous live file is kept as `.bak`. Only call this after
/// [`verify`] has passed.
pub fn swap(staged: &Path, live_db: &Path) -> TenantResult<()> {
    if live_db.exists() {
        fs::rename(live_db, sibling(live_db, BACKUP_SUFFIX))?;
    }
    fs::rename(staged, live_db)?;
    Ok(())
}

/// Heals an interrupted swap.
///
/// A crash between the two renames leaves no live database but a `.bak`
/// with the previous valid one. Returns `true` when the backup was
/// restored, `false` when nothing needed doing. Call on every launch
/// before opening the database.
pub fn recover(live_db: &Path) -> TenantResult<bool> {
    if live_db.exists() {
        return Ok(false);
    }
    let backup = sibling(live_db, BACKUP_SUFFIX);
    if !backup.exists() {
        return Ok(false);
    }
    fs::rename(&backup, live_db)?;
    warn!(
        "Recovered previous tenant database from {}",
        live_db.display()
    );
    Ok(true)
}

/// Applies a pushed snapshot: stage, verify, swap.
///
/// Safe to retry: a failed verification removes the staging file and
/// leaves the live database untouched, and re-applying an already applied
/// snapshot just swaps in the same bytes again.
pub fn apply_snapshot(
    live_db: &Path,
    bytes: &[u8],
    envelope: &PushEnvelope,
) -> TenantResult<()> {
    let staged = stage(live_db, bytes)?;
    if let Err(e) = verify(&staged, envelope) {
        let _ = fs::remove_file(&staged);
        return Err(e);
    }
    swap(&staged, live_db)?;
    info!(
        "Applied database snapshot {} for gym {}",
        envelope.file_name, envelope.gym_id
    );
    Ok(())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
