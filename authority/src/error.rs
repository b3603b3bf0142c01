//! Error type for the authority, mapped onto HTTP responses.
//!
//! Every failure leaves the server as a mapped status code plus an
//! [`ApiFault`] body, so clients and the admin console always see the same
//! envelope the rest of the product speaks.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rackside_license::{ApiFault, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthorityError {
    /// License key is unknown.
    #[error("invalid license key: {0}")]
    InvalidKey(String),

    /// License is bound to a different machine.
    #[error("license is already bound to another machine")]
    AlreadyBound,

    /// License validity window has passed.
    #[error("license expired on {0}")]
    Expired(String),

    /// License was administratively revoked.
    #[error("license has been revoked")]
    Revoked,

    /// Caller's hardware id does not match the binding.
    #[error("license is bound to different hardware")]
    HardwareMismatch,

    /// Missing or wrong credentials.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The referenced organization, gym, push, or backup does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Registry or snapshot store failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AuthorityError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            Self::InvalidKey(_) => (StatusCode::BAD_REQUEST, ErrorKind::InvalidKey, self.to_string()),
            Self::AlreadyBound => (StatusCode::CONFLICT, ErrorKind::AlreadyBound, self.to_string()),
            Self::Expired(_) => (StatusCode::FORBIDDEN, ErrorKind::Expired, self.to_string()),
            Self::Revoked => (StatusCode::FORBIDDEN, ErrorKind::Revoked, self.to_string()),
            Self::HardwareMismatch => {
                (StatusCode::FORBIDDEN, ErrorKind::HardwareMismatch, self.to_string())
            }
            Self::PermissionDenied(_) => {
                (StatusCode::UNAUTHORIZED, ErrorKind::PermissionDenied, self.to_string())
            }
            Self::NotFound(_) => (StatusCode::NOT_FOUND, ErrorKind::NotFound, self.to_string()),
            Self::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, ErrorKind::Internal, self.to_string())
            }
            Self::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorKind::Internal,
                    "internal error".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorKind::Internal,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(ApiFault::new(kind, message))).into_response()
    }
}

pub type AuthorityResult<T> = Result<T, AuthorityError>;
