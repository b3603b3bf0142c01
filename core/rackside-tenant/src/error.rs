//! Error types for the tenant data layer.

use rackside_license::ActivationState;
use thiserror::Error;

/// Tenant-layer errors.
#[derive(Debug, Error)]
pub enum TenantError {
    /// A mutation was attempted without an active license.
    #[error("license is not active (state: {0:?}), writes are disabled")]
    LicenseNotActive(ActivationState),

    /// The referenced row does not exist for this gym.
    #[error("no such row: {0}")]
    NotFound(String),

    /// A snapshot failed size or checksum verification.
    #[error("snapshot verification failed: {0}")]
    SnapshotVerification(String),

    /// Database error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem error while staging or swapping a snapshot.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tenant operations.
pub type TenantResult<T> = Result<T, TenantError>;
