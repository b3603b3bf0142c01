//! Licensing and activation for Rackside.
//!
//! This crate handles:
//! - Hardware fingerprinting for device binding
//! - License certificate verification via Ed25519 signatures
//! - The encrypted on-disk license store
//! - The activation state machine and authority check-ins
//! - The typed request bridge exposed to the UI shell
//!
//! # Design Principles
//!
//! - **Offline-first**: after activation, every state decision is derived
//!   from the locally cached certificate; the network is only needed to
//!   refresh it
//! - **Device binding**: the license is bound to a hardware fingerprint,
//!   and the store is encrypted with a key derived from it
//! - **Signed decisions**: the client never trusts a bare record; only
//!   certificates signed by the authority count
//! - **Errors as values**: every fault crossing the shell boundary is a
//!   typed `ApiFault`, never a panic
//!
//! # Certificate Format
//!
//! Certificates are formatted as: `base64url(record).base64url(signature)`
//! The record is a JSON object signed with Ed25519, containing the license
//! key, gym identity, hardware binding, and validity window.

mod activation;
mod bridge;
mod certificate;
mod device;
mod error;
mod protocol;
mod record;
mod store;

#[cfg(feature = "online")]
mod client;

pub use activation::{ActivationState, LicenseManager, StatusReport};
pub use bridge::{ShellBridge, ShellRequest, ShellResponse};
pub use certificate::{Certificate, AUTHORITY_PUBLIC_KEY};
pub use device::HardwareId;
pub use error::{LicenseError, LicenseResult};
pub use protocol::{
    AckRequest, ActivateRequest, ActivateResponse, ApiFault, CheckinRequest, CheckinResponse,
    ErrorKind, PendingPushResponse, PushEnvelope, API_PREFIX, LICENSE_KEY_HEADER,
};
pub use record::LicenseRecord;
pub use store::{LicenseStore, StoredLicense};

// Callers of `LicenseStore::open_with_params` need the KDF parameter type.
pub use rackside_crypto::KdfParams;

#[cfg(feature = "online")]
pub use client::AuthorityClient;
