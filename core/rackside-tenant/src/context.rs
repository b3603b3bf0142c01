//! The scoping handle every data-access call carries.
//!
//! A [`TenantContext`] pins a query to one gym and one observed license
//! state. The database layer never consults any ambient "current gym";
//! if you hold a context you can read that gym's rows, and only an
//! `Active` context can write them.

use crate::error::{TenantError, TenantResult};
use rackside_license::{ActivationState, StatusReport};
use rackside_types::GymId;

/// Identifies the gym whose data is being accessed and the license state
/// under which the access happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    gym_id: GymId,
    state: ActivationState,
}

impl TenantContext {
    /// Creates a context for the given gym and license state.
    #[must_use]
    pub fn new(gym_id: GymId, state: ActivationState) -> Self {
        Self { gym_id, state }
    }

    /// Builds a context from the license manager's status report.
    ///
    /// Returns `None` when no license record is cached, since there is no
    /// gym to scope to.
    #[must_use]
    pub fn from_report(report: &StatusReport) -> Option<Self> {
        report
            .record
            .as_ref()
            .map(|record| Self::new(record.gym_id, report.state))
    }

    /// The gym this context is scoped to.
    #[must_use]
    pub fn gym_id(&self) -> GymId {
        self.gym_id
    }

    /// The license state observed when the context was built.
    #[must_use]
    pub fn state(&self) -> ActivationState {
        self.state
    }

    /// True when mutations are permitted under this context.
    #[must_use]
    pub fn can_write(&self) -> bool {
        self.state.is_active()
    }

    /// Fails with `LicenseNotActive` unless the license is `Active`.
    ///
    /// Reads never call this: a revoked or expired gym can still view its
    /// own data, it just cannot change it.
    pub fn ensure_active(&self) -> TenantResult<()> {
        if self.can_write() {
            Ok(())
        } else {
            Err(TenantError::LicenseNotActive(self.state))
        }
    }
}
