//! Typed request surface for the UI shell.
//!
//! The shell serializes a [`ShellRequest`], the bridge dispatches it against
//! the license manager, and every outcome comes back as a [`ShellResponse`]
//! value: `ok` with a JSON payload, or `err` with a typed fault. Nothing
//! crosses this boundary as a panic or an untyped object.

use crate::activation::LicenseManager;
use crate::error::LicenseError;
use crate::protocol::ErrorKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(feature = "online")]
use crate::client::AuthorityClient;

/// Operations the UI shell can request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ShellRequest {
    /// Activate a license key on this machine.
    Activate { license_key: String },
    /// Return this machine's hardware fingerprint.
    GetHardwareId,
    /// Return the current activation state and cached record.
    GetStatus,
    /// Clear the local license.
    Deactivate,
    /// Best-effort check-in reporting the running app version.
    ReportVersion { app_version: String },
}

/// Outcome of a shell request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ShellResponse {
    Ok { data: serde_json::Value },
    Err { kind: ErrorKind, message: String },
}

impl ShellResponse {
    /// Wraps a serializable payload in a success response.
    pub fn ok<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::Ok { data: value },
            Err(e) => Self::err(
                ErrorKind::Internal,
                format!("response serialization failed: {e}"),
            ),
        }
    }

    /// Creates a failure response.
    pub fn err(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Err {
            kind,
            message: message.into(),
        }
    }

    /// True for `Ok` responses.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

impl From<&LicenseError> for ShellResponse {
    fn from(err: &LicenseError) -> Self {
        Self::err(ErrorKind::from(err), err.to_string())
    }
}

/// Dispatches shell requests against the license manager.
pub struct ShellBridge {
    manager: Arc<LicenseManager>,
    #[cfg(feature = "online")]
    client: AuthorityClient,
    #[cfg(feature = "online")]
    app_version: String,
}

impl ShellBridge {
    /// Creates a bridge over the given manager and authority client.
    #[cfg(feature = "online")]
    pub fn new(
        manager: Arc<LicenseManager>,
        client: AuthorityClient,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            client,
            app_version: app_version.into(),
        }
    }

    /// Creates a bridge for an offline build.
    #[cfg(not(feature = "online"))]
    pub fn new(manager: Arc<LicenseManager>) -> Self {
        Self { manager }
    }

    /// Handles one request. Infallible by construction: every failure
    /// becomes an `err` response.
    pub async fn dispatch(&self, request: ShellRequest) -> ShellResponse {
        match request {
            ShellRequest::Activate { license_key } => self.activate(license_key).await,
            ShellRequest::GetHardwareId => ShellResponse::ok(&serde_json::json!({
                "hardware_id": self.manager.hardware_id().as_str(),
            })),
            ShellRequest::GetStatus => ShellResponse::ok(&self.manager.status_report()),
            ShellRequest::Deactivate => match self.manager.deactivate() {
                Ok(_) => ShellResponse::ok(&self.manager.status_report()),
                Err(e) => ShellResponse::from(&e),
            },
            ShellRequest::ReportVersion { app_version } => self.report_version(app_version).await,
        }
    }

    #[cfg(feature = "online")]
    async fn activate(&self, license_key: String) -> ShellResponse {
        match self
            .manager
            .activate(&self.client, &license_key, &self.app_version)
            .await
        {
            Ok(_) => ShellResponse::ok(&self.manager.status_report()),
            Err(e) => ShellResponse::from(&e),
        }
    }

    #[cfg(not(feature = "online"))]
    async fn activate(&self, _license_key: String) -> ShellResponse {
        ShellResponse::err(
            ErrorKind::NetworkUnavailable,
            "this build has no online support",
        )
    }

    #[cfg(feature = "online")]
    async fn report_version(&self, app_version: String) -> ShellResponse {
        self.manager.report_version(&self.client, &app_version).await;
        ShellResponse::ok(&serde_json::json!({}))
    }

    #[cfg(not(feature = "online"))]
    async fn report_version(&self, _app_version: String) -> ShellResponse {
        ShellResponse::ok(&serde_json::json!({}))
    }
}
