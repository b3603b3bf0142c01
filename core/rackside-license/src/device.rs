//! Hardware identity resolution for license binding.
//!
//! Produces a stable fingerprint that identifies the machine the app is
//! installed on. Licenses are bound to this fingerprint so a key cannot be
//! shared across gyms.

use crate::error::{LicenseError, LicenseResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use std::path::{Path, PathBuf};

/// A stable identifier for the machine the app runs on.
///
/// Derived from OS-level machine identifiers, so it survives reboots and
/// reinstalls but changes when the license moves to different hardware.
/// Resolution never touches the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HardwareId(String);

impl HardwareId {
    /// Resolves the hardware ID for the current machine.
    ///
    /// Uses the default fallback location under the user's data directory
    /// for machines with no OS identifier.
    ///
    /// # Errors
    ///
    /// Returns an error only if no OS identifier exists and the fallback
    /// file can neither be read nor created.
    pub fn resolve() -> LicenseResult<Self> {
        Self::resolve_from(default_fallback_path())
    }

    /// Resolves the hardware ID using an explicit fallback file location.
    ///
    /// The fingerprint combines OS name, CPU architecture, hostname, and the
    /// platform machine ID, hashed with SHA-256. When the platform provides
    /// no machine ID, a random identifier is generated once, persisted at
    /// `fallback_path`, and reused on every subsequent call so the
    /// fingerprint stays stable.
    pub fn resolve_from(fallback_path: impl Into<PathBuf>) -> LicenseResult<Self> {
        let machine_id = match get_machine_id() {
            Some(id) => id,
            None => load_or_create_fallback(&fallback_path.into())?,
        };

        let mut components = vec![
            env::consts::OS.to_string(),
            env::consts::ARCH.to_string(),
            get_hostname(),
        ];
        components.push(machine_id);

        let combined = components.join("|");
        let mut hasher = Sha256::new();
        hasher.update(combined.as_bytes());
        let hash = hasher.finalize();

        Ok(Self(BASE64.encode(&hash[..16])))
    }

    /// Wraps an already-resolved fingerprint string.
    ///
    /// Used by the authority, which stores fingerprints it receives over the
    /// wire and never resolves its own.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the fingerprint string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this fingerprint matches the given string.
    #[must_use]
    pub fn matches(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl std::fmt::Display for HardwareId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default location of the fallback machine identifier.
fn default_fallback_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rackside")
        .join("machine-id")
}

/// Loads the persisted fallback identifier, creating it on first use.
fn load_or_create_fallback(path: &Path) -> LicenseResult<String> {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    let id = uuid::Uuid::now_v7().to_string();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| LicenseError::Storage(format!("failed to create {parent:?}: {e}")))?;
    }
    std::fs::write(path, &id)
        .map_err(|e| LicenseError::Storage(format!("failed to write {path:?}: {e}")))?;
    Ok(id)
}

/// Gets the machine hostname.
fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Gets the machine ID (platform-specific unique identifier).
fn get_machine_id() -> Option<String> {
    #[cfg(target_os = "macos")]
    {
        // Hardware UUID from IOPlatformExpertDevice
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(target_os = "linux")]
    {
        // Try /etc/machine-id first, then /var/lib/dbus/machine-id
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
    }

    #[cfg(target_os = "windows")]
    {
        // MachineGuid from the registry via reg.exe, avoiding a winreg dependency
        std::process::Command::new("reg")
            .args([
                "query",
                r"HKLM\SOFTWARE\Microsoft\Cryptography",
                "/v",
                "MachineGuid",
            ])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .split_whitespace()
                    .last()
                    .map(|guid| guid.to_string())
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_created_once_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machine-id");

        let first = load_or_create_fallback(&path).unwrap();
        let second = load_or_create_fallback(&path).unwrap();

        assert_eq!(first, second);
        assert!(path.exists());
    }

    #[test]
    fn fallback_survives_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machine-id");
        std::fs::write(&path, "  abc-123  \n").unwrap();

        assert_eq!(load_or_create_fallback(&path).unwrap(), "abc-123");
    }

    #[test]
    fn empty_fallback_file_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("machine-id");
        std::fs::write(&path, "").unwrap();

        let id = load_or_create_fallback(&path).unwrap();
        assert!(!id.is_empty());
    }

    #[test]
    fn fallback_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("machine-id");

        let id = load_or_create_fallback(&path).unwrap();
        assert!(!id.is_empty());
        assert!(path.exists());
    }
}
