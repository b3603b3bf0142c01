//! The license record issued and maintained by the authority.

use crate::activation::ActivationState;
use crate::device::HardwareId;
use chrono::{DateTime, Utc};
use rackside_types::GymId;
use serde::{Deserialize, Serialize};

/// The authority's record of one gym's license.
///
/// This is the payload of every certificate the authority signs. The client
/// caches the most recently received record and derives its local activation
/// state from it without contacting the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// The license key the gym activates with.
    pub license_key: String,
    /// The tenant this license belongs to.
    pub gym_id: GymId,
    /// Display name of the gym, denormalized from its organization.
    pub gym_name: String,
    /// Hardware fingerprint the license is bound to, if activated.
    pub hardware_id: Option<String>,
    /// When the license was issued.
    pub issued_at: DateTime<Utc>,
    /// When the license expires. `None` means perpetual.
    pub expires_at: Option<DateTime<Utc>>,
    /// False once the authority revokes the license.
    pub active: bool,
    /// App version last reported by the gym.
    pub app_version: Option<String>,
    /// When the gym last checked in with the authority.
    pub last_sync: Option<DateTime<Utc>>,
}

impl LicenseRecord {
    /// Returns true if the record's validity window has passed at `now`.
    ///
    /// Perpetual licenses (`expires_at = None`) never expire.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => false,
            Some(exp) => now >= exp,
        }
    }

    /// Derives the local activation state from this cached record.
    ///
    /// Revocation wins over every other condition, so a revoked license
    /// reports `Revoked` even when also expired. A record with no hardware
    /// binding imposes no mismatch.
    #[must_use]
    pub fn local_state(&self, hardware_id: &HardwareId, now: DateTime<Utc>) -> ActivationState {
        if !self.active {
            return ActivationState::Revoked;
        }
        if let Some(bound) = &self.hardware_id {
            if !hardware_id.matches(bound) {
                return ActivationState::HardwareMismatch;
            }
        }
        if self.is_expired_at(now) {
            return ActivationState::Expired;
        }
        ActivationState::Active
    }
}
