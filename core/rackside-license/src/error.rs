//! Error types for the licensing module.

use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// License key is unknown to the authority or malformed.
    #[error("invalid license key: {0}")]
    InvalidKey(String),

    /// Ed25519 certificate signature verification failed.
    #[error("certificate signature invalid")]
    InvalidSignature,

    /// Certificate payload is malformed or missing required fields.
    #[error("invalid certificate payload: {0}")]
    InvalidPayload(String),

    /// License is already bound to a different machine.
    #[error("license is already bound to another machine")]
    AlreadyBound,

    /// License has expired.
    #[error("license expired on {0}")]
    Expired(String),

    /// License has been revoked by the authority.
    #[error("license has been revoked")]
    Revoked,

    /// Stored hardware binding does not match this machine.
    #[error("license is bound to different hardware")]
    HardwareMismatch,

    /// No license is stored on this machine.
    #[error("no license activated on this machine")]
    NotActivated,

    /// The authority could not be reached.
    #[error("authority unreachable: {0}")]
    NetworkUnavailable(String),

    /// The license store exists but cannot be read or decrypted.
    #[error("license store corrupt: {0}")]
    StorageCorrupt(String),

    /// The authority rejected the request's credentials.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The requested resource does not exist on the authority.
    #[error("not found: {0}")]
    NotFound(String),

    /// The authority reported an internal failure.
    #[error("authority error: {0}")]
    Authority(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
