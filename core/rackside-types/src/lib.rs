//! Core type definitions for Rackside.
//!
//! This crate defines the tenant and organization identifiers shared by the
//! licensing core, the tenant data layer, and the authority server:
//! - `GymId`: one tenant installation of the application (UUID v7)
//! - `OrgId`: the organization a license was issued to (UUID v7)
//! - `PushId`: one queued database push from the authority to a gym
//!
//! Domain types (license records, customers, payments) belong to their
//! respective crates, not here.

mod ids;

pub use ids::{GymId, OrgId, PushId};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
