//! HTTP client for the license authority.
//!
//! Transport failures map to [`LicenseError::NetworkUnavailable`], never to
//! a key rejection: an unreachable authority means the gym may simply be
//! offline, and callers keep honoring the cached certificate.

use crate::error::{LicenseError, LicenseResult};
use crate::protocol::{
    AckRequest, ActivateRequest, ActivateResponse, ApiFault, CheckinRequest, CheckinResponse,
    PendingPushResponse, PushEnvelope, API_PREFIX, LICENSE_KEY_HEADER,
};
use rackside_types::{GymId, PushId};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Client for the authority's `/api/v1` surface.
#[derive(Debug, Clone)]
pub struct AuthorityClient {
    base_url: String,
    http: Client,
}

impl AuthorityClient {
    /// Creates a client for the authority at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    /// Binds a license key to this machine.
    ///
    /// # Errors
    ///
    /// `InvalidKey`, `AlreadyBound`, `Expired`, or `Revoked` when the
    /// authority rejects the key; `NetworkUnavailable` when it cannot be
    /// reached.
    pub async fn activate(&self, req: &ActivateRequest) -> LicenseResult<ActivateResponse> {
        let resp = self
            .http
            .post(self.url("/activate"))
            .json(req)
            .send()
            .await
            .map_err(|e| LicenseError::NetworkUnavailable(e.to_string()))?;
        parse_response(resp).await
    }

    /// Checks in with the authority, refreshing the signed record.
    pub async fn checkin(&self, req: &CheckinRequest) -> LicenseResult<CheckinResponse> {
        let resp = self
            .http
            .post(self.url("/checkin"))
            .json(req)
            .send()
            .await
            .map_err(|e| LicenseError::NetworkUnavailable(e.to_string()))?;
        parse_response(resp).await
    }

    /// Polls for a queued database push without a full check-in.
    pub async fn pending_push(
        &self,
        gym_id: GymId,
        license_key: &str,
    ) -> LicenseResult<Option<PushEnvelope>> {
        let resp = self
            .http
            .get(self.url(&format!("/push/{gym_id}/pending")))
            .header(LICENSE_KEY_HEADER, license_key)
            .send()
            .await
            .map_err(|e| LicenseError::NetworkUnavailable(e.to_string()))?;
        let body: PendingPushResponse = parse_response(resp).await?;
        Ok(body.pending_push)
    }

    /// Downloads the snapshot bytes for a queued push.
    pub async fn download_push(
        &self,
        gym_id: GymId,
        push_id: PushId,
        license_key: &str,
    ) -> LicenseResult<Vec<u8>> {
        let resp = self
            .http
            .get(self.url(&format!("/push/{gym_id}/download/{push_id}")))
            .header(LICENSE_KEY_HEADER, license_key)
            .send()
            .await
            .map_err(|e| LicenseError::NetworkUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(fault_from(resp).await);
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| LicenseError::NetworkUnavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// Acknowledges a push after the snapshot was applied locally.
    ///
    /// Only call this once the stage-verify-swap completed; the authority
    /// keeps the push pending until it hears this.
    pub async fn ack_push(
        &self,
        gym_id: GymId,
        push_id: PushId,
        license_key: &str,
    ) -> LicenseResult<()> {
        let resp = self
            .http
            .post(self.url(&format!("/push/{gym_id}/ack")))
            .header(LICENSE_KEY_HEADER, license_key)
            .json(&AckRequest { push_id })
            .send()
            .await
            .map_err(|e| LicenseError::NetworkUnavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(fault_from(resp).await);
        }
        Ok(())
    }
}

/// Decodes a success body, or maps the fault envelope to a typed error.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> LicenseResult<T> {
    if resp.status().is_success() {
        resp.json::<T>()
            .await
            .map_err(|e| LicenseError::Authority(format!("malformed response body: {e}")))
    } else {
        Err(fault_from(resp).await)
    }
}

async fn fault_from(resp: reqwest::Response) -> LicenseError {
    let status = resp.status();
    match resp.json::<ApiFault>().await {
        Ok(fault) => fault.into(),
        Err(_) => LicenseError::Authority(format!("unexpected status {status}")),
    }
}
