//! Activation state machine and the license manager that drives it.
//!
//! State transitions:
//!
//! ```text
//! Unactivated -> PendingValidation -> Active
//!                      |                |
//!                      v                v
//!                 (fault kinds)   Expired / Revoked / HardwareMismatch
//! ```
//!
//! `Active`, `Expired`, `Revoked`, and `HardwareMismatch` are all derived
//! from the certificate cached at the last successful authority contact;
//! deriving them needs no network and is idempotent.

use crate::certificate::{Certificate, AUTHORITY_PUBLIC_KEY};
use crate::device::HardwareId;
use crate::error::LicenseResult;
use crate::record::LicenseRecord;
use crate::store::{LicenseStore, StoredLicense};
use chrono::Utc;
use rackside_types::GymId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

#[cfg(feature = "online")]
use crate::client::AuthorityClient;
#[cfg(feature = "online")]
use crate::error::LicenseError;
#[cfg(feature = "online")]
use crate::protocol::{ActivateRequest, CheckinRequest, PushEnvelope};

/// Where this machine stands in the license lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationState {
    /// No license on this machine.
    Unactivated,
    /// An activation request is in flight with the authority.
    PendingValidation,
    /// Valid license bound to this machine.
    Active,
    /// The cached record's validity window has passed.
    Expired,
    /// The authority revoked the license.
    Revoked,
    /// The cached record is bound to different hardware.
    HardwareMismatch,
}

impl ActivationState {
    /// True when the license permits normal use of the app.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Snapshot of the activation state plus the cached record, for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: ActivationState,
    pub record: Option<LicenseRecord>,
}

/// Owns the license lifecycle for one installation.
///
/// Holds the store, the resolved hardware ID, and the authority public key.
/// Created explicitly by the app shell at startup; nothing here is a global.
pub struct LicenseManager {
    store: LicenseStore,
    hardware_id: HardwareId,
    authority_key: [u8; 32],
    validating: AtomicBool,
}

/// Clears the in-flight flag on every exit path of an activation attempt.
struct ValidationGuard<'a>(&'a AtomicBool);

impl Drop for ValidationGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl LicenseManager {
    /// Creates a manager verifying against the production authority key.
    #[must_use]
    pub fn new(store: LicenseStore, hardware_id: HardwareId) -> Self {
        Self::with_authority_key(store, hardware_id, AUTHORITY_PUBLIC_KEY)
    }

    /// Creates a manager verifying against a custom authority key.
    /// Used for testing with a generated key pair.
    #[must_use]
    pub fn with_authority_key(
        store: LicenseStore,
        hardware_id: HardwareId,
        authority_key: [u8; 32],
    ) -> Self {
        Self {
            store,
            hardware_id,
            authority_key,
            validating: AtomicBool::new(false),
        }
    }

    /// The hardware ID this installation is keyed to.
    #[must_use]
    pub fn hardware_id(&self) -> &HardwareId {
        &self.hardware_id
    }

    /// Derives the current activation state from the cached certificate.
    ///
    /// Never touches the network. A store that is missing, unreadable, or
    /// carries a certificate that fails verification reports `Unactivated`
    /// rather than an error, so a damaged cache degrades to the activation
    /// screen instead of wedging the app.
    #[must_use]
    pub fn status(&self) -> ActivationState {
        if self.validating.load(Ordering::SeqCst) {
            return ActivationState::PendingValidation;
        }
        match self.load_verified() {
            Some(cert) => cert.record().local_state(&self.hardware_id, Utc::now()),
            None => ActivationState::Unactivated,
        }
    }

    /// Like [`status`](Self::status), but includes the cached record.
    #[must_use]
    pub fn status_report(&self) -> StatusReport {
        if self.validating.load(Ordering::SeqCst) {
            return StatusReport {
                state: ActivationState::PendingValidation,
                record: None,
            };
        }
        match self.load_verified() {
            Some(cert) => StatusReport {
                state: cert.record().local_state(&self.hardware_id, Utc::now()),
                record: Some(cert.into_record()),
            },
            None => StatusReport {
                state: ActivationState::Unactivated,
                record: None,
            },
        }
    }

    /// The tenant this machine is licensed for, if any.
    #[must_use]
    pub fn gym_id(&self) -> Option<GymId> {
        self.load_verified().map(|cert| cert.record().gym_id)
    }

    /// The license key this machine activated with, if any.
    #[must_use]
    pub fn license_key(&self) -> Option<String> {
        self.load_verified()
            .map(|cert| cert.record().license_key.clone())
    }

    /// Clears the local record, returning the machine to `Unactivated`.
    ///
    /// Purely local: the authority still considers the license bound until
    /// an admin resets the hardware ID.
    pub fn deactivate(&self) -> LicenseResult<ActivationState> {
        self.store.clear()?;
        info!("License deactivated, local record cleared");
        Ok(ActivationState::Unactivated)
    }

    /// Activates a license key on this machine.
    ///
    /// The machine is in `PendingValidation` while the request is in
    /// flight. On success the authority's certificate is verified and
    /// cached, and the derived state (normally `Active`) is returned.
    ///
    /// # Errors
    ///
    /// `InvalidKey`, `AlreadyBound`, `Expired`, `Revoked` from the
    /// authority; `NetworkUnavailable` if it cannot be reached. Failure
    /// leaves any previously cached license untouched.
    #[cfg(feature = "online")]
    pub async fn activate(
        &self,
        client: &AuthorityClient,
        license_key: &str,
        app_version: &str,
    ) -> LicenseResult<ActivationState> {
        self.validating.store(true, Ordering::SeqCst);
        let _guard = ValidationGuard(&self.validating);

        let req = ActivateRequest {
            license_key: license_key.trim().to_string(),
            hardware_id: self.hardware_id.as_str().to_string(),
            app_version: app_version.to_string(),
        };
        let resp = client.activate(&req).await?;

        let cert = Certificate::parse_with_key(&resp.certificate, &self.authority_key)?;
        self.store.set(&StoredLicense {
            record: cert.record().clone(),
            certificate: cert.raw().to_string(),
        })?;
        info!("License activated for gym {}", cert.record().gym_id);

        Ok(cert.record().local_state(&self.hardware_id, Utc::now()))
    }

    /// Checks in with the authority and refreshes the cached certificate.
    ///
    /// Returns the pending database push, if the authority has one queued
    /// for this gym. Revocation and expiry arrive through the refreshed
    /// certificate; after a sync, [`status`](Self::status) reflects them.
    ///
    /// # Errors
    ///
    /// `NotActivated` if no license is cached, `NetworkUnavailable` if the
    /// authority is unreachable. An unreachable authority leaves the cache
    /// untouched and the cached decision keeps applying.
    #[cfg(feature = "online")]
    pub async fn sync(
        &self,
        client: &AuthorityClient,
        app_version: &str,
    ) -> LicenseResult<Option<PushEnvelope>> {
        let cert = self.load_verified().ok_or(LicenseError::NotActivated)?;

        let req = CheckinRequest {
            license_key: cert.record().license_key.clone(),
            hardware_id: self.hardware_id.as_str().to_string(),
            app_version: app_version.to_string(),
        };
        let resp = client.checkin(&req).await?;

        let fresh = Certificate::parse_with_key(&resp.certificate, &self.authority_key)?;
        self.store.set(&StoredLicense {
            record: fresh.record().clone(),
            certificate: fresh.raw().to_string(),
        })?;

        Ok(resp.pending_push)
    }

    /// Best-effort check-in that reports the running app version.
    ///
    /// Failures are logged and swallowed; version reporting never blocks or
    /// breaks the app.
    #[cfg(feature = "online")]
    pub async fn report_version(&self, client: &AuthorityClient, app_version: &str) {
        if let Err(e) = self.sync(client, app_version).await {
            warn!("Failed to report app version: {}", e);
        }
    }

    /// Loads the stored license and verifies its certificate.
    ///
    /// Corrupt storage and failed verification are logged and mapped to
    /// `None`; callers treat both as not activated.
    fn load_verified(&self) -> Option<Certificate> {
        let stored = match self.store.get() {
            Ok(Some(stored)) => stored,
            Ok(None) => return None,
            Err(e) => {
                warn!("License store unreadable, treating as unactivated: {}", e);
                return None;
            }
        };

        match Certificate::parse_with_key(&stored.certificate, &self.authority_key) {
            Ok(cert) => Some(cert),
            Err(e) => {
                warn!(
                    "Cached certificate failed verification, treating as unactivated: {}",
                    e
                );
                None
            }
        }
    }
}
