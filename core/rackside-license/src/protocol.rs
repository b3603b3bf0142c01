//! Wire types shared by the client, the authority server, and the shell
//! bridge.
//!
//! Every fallible surface speaks the same error envelope: [`ApiFault`] with
//! an exhaustive [`ErrorKind`]. Faults travel as values in response bodies,
//! never as exceptions or panics across a boundary.

use crate::error::LicenseError;
use chrono::{DateTime, Utc};
use rackside_types::{GymId, PushId};
use serde::{Deserialize, Serialize};

/// URL prefix of every authority route.
pub const API_PREFIX: &str = "/api/v1";

/// Header carrying the gym's license key on the push routes.
pub const LICENSE_KEY_HEADER: &str = "x-license-key";

/// Request to bind a license key to this machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateRequest {
    pub license_key: String,
    pub hardware_id: String,
    pub app_version: String,
}

/// Successful activation: the signed record for the local cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateResponse {
    pub certificate: String,
}

/// Periodic check-in from an activated gym.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinRequest {
    pub license_key: String,
    pub hardware_id: String,
    pub app_version: String,
}

/// Check-in result: a re-signed certificate reflecting the authority's
/// current decision, plus the pending database push if one is queued.
///
/// Revocation and expiry arrive in-band here: the fresh certificate carries
/// `active = false` or a past `expires_at`, and the client derives its state
/// from that, exactly as it does offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinResponse {
    pub certificate: String,
    pub pending_push: Option<PushEnvelope>,
}

/// Metadata for a queued database push awaiting delivery to a gym.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub push_id: PushId,
    pub gym_id: GymId,
    pub file_name: String,
    pub size_bytes: u64,
    /// Hex SHA-256 of the snapshot file, verified by the client before swap.
    pub sha256_hex: String,
    pub queued_at: DateTime<Utc>,
}

/// Body of the pending-push poll response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingPushResponse {
    pub pending_push: Option<PushEnvelope>,
}

/// Acknowledgement that a push was applied locally.
///
/// Sent only after the snapshot passed verification and the atomic swap
/// completed, so the authority keeps the entry pending through any client
/// crash in between.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckRequest {
    pub push_id: PushId,
}

/// Classification of every fault the licensing surface can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidKey,
    AlreadyBound,
    Expired,
    Revoked,
    HardwareMismatch,
    NetworkUnavailable,
    StorageCorrupt,
    PermissionDenied,
    NotFound,
    Internal,
}

/// The error envelope carried in failure response bodies and bridge replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiFault {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiFault {
    /// Creates a fault with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<&LicenseError> for ErrorKind {
    fn from(err: &LicenseError) -> Self {
        match err {
            LicenseError::InvalidKey(_) => Self::InvalidKey,
            LicenseError::AlreadyBound => Self::AlreadyBound,
            LicenseError::Expired(_) => Self::Expired,
            LicenseError::Revoked => Self::Revoked,
            LicenseError::HardwareMismatch => Self::HardwareMismatch,
            LicenseError::NetworkUnavailable(_) => Self::NetworkUnavailable,
            // A cached certificate that fails verification is corrupt state
            LicenseError::InvalidSignature
            | LicenseError::InvalidPayload(_)
            | LicenseError::StorageCorrupt(_) => Self::StorageCorrupt,
            LicenseError::PermissionDenied(_) => Self::PermissionDenied,
            LicenseError::NotActivated | LicenseError::NotFound(_) => Self::NotFound,
            LicenseError::Authority(_)
            | LicenseError::Storage(_)
            | LicenseError::Serialization(_) => Self::Internal,
        }
    }
}

impl From<&LicenseError> for ApiFault {
    fn from(err: &LicenseError) -> Self {
        Self::new(ErrorKind::from(err), err.to_string())
    }
}

impl From<ApiFault> for LicenseError {
    fn from(fault: ApiFault) -> Self {
        match fault.kind {
            ErrorKind::InvalidKey => Self::InvalidKey(fault.message),
            ErrorKind::AlreadyBound => Self::AlreadyBound,
            ErrorKind::Expired => Self::Expired(fault.message),
            ErrorKind::Revoked => Self::Revoked,
            ErrorKind::HardwareMismatch => Self::HardwareMismatch,
            ErrorKind::NetworkUnavailable => Self::NetworkUnavailable(fault.message),
            ErrorKind::StorageCorrupt => Self::StorageCorrupt(fault.message),
            ErrorKind::PermissionDenied => Self::PermissionDenied(fault.message),
            ErrorKind::NotFound => Self::NotFound(fault.message),
            ErrorKind::Internal => Self::Authority(fault.message),
        }
    }
}
