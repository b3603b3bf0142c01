//! HTTP handlers for the client and admin surfaces.

use crate::auth;
use crate::error::{AuthorityError, AuthorityResult};
use crate::registry::{Organization, Stats};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use rackside_license::{
    AckRequest, ActivateRequest, ActivateResponse, Certificate, CheckinRequest, CheckinResponse,
    LicenseRecord, PendingPushResponse, PushEnvelope,
};
use rackside_types::{GymId, OrgId, PushId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ── Client surface ───────────────────────────────────────────────

/// `POST /activate`: validate the key, bind it to the machine, and hand
/// back a signed certificate for the local cache.
pub async fn activate(
    State(state): State<AppState>,
    Json(req): Json<ActivateRequest>,
) -> AuthorityResult<Json<ActivateResponse>> {
    let record = state
        .registry
        .activate(req.license_key.trim(), &req.hardware_id, &req.app_version)?;
    let certificate = sign_record(&state, &record)?;
    tracing::info!(
        "Activated license {} for gym {} ({})",
        record.license_key,
        record.gym_name,
        record.gym_id
    );
    Ok(Json(ActivateResponse { certificate }))
}

/// `POST /checkin`: re-sign the authority's current decision and piggyback
/// the pending database push, if any.
///
/// Revoked and expired licenses check in successfully; their verdict rides
/// home inside the certificate. They do not receive pushes.
pub async fn checkin(
    State(state): State<AppState>,
    Json(req): Json<CheckinRequest>,
) -> AuthorityResult<Json<CheckinResponse>> {
    let record = state
        .registry
        .checkin(req.license_key.trim(), &req.hardware_id, &req.app_version)?;
    let pending_push = if record.active && !record.is_expired_at(Utc::now()) {
        state.registry.pending_for(record.gym_id)?
    } else {
        None
    };
    let certificate = sign_record(&state, &record)?;
    tracing::debug!("Check-in from gym {} (app {})", record.gym_id, req.app_version);
    Ok(Json(CheckinResponse {
        certificate,
        pending_push,
    }))
}

/// `GET /push/{gym_id}/pending`: poll for a queued push.
pub async fn pending_push(
    State(state): State<AppState>,
    Path(gym_id): Path<GymId>,
    headers: HeaderMap,
) -> AuthorityResult<Json<PendingPushResponse>> {
    let record = auth::require_gym_key(&state, gym_id, &headers)?;
    let pending_push = if record.active && !record.is_expired_at(Utc::now()) {
        state.registry.pending_for(gym_id)?
    } else {
        None
    };
    Ok(Json(PendingPushResponse { pending_push }))
}

/// `GET /push/{gym_id}/download/{push_id}`: fetch the snapshot bytes.
pub async fn download_push(
    State(state): State<AppState>,
    Path((gym_id, push_id)): Path<(GymId, PushId)>,
    headers: HeaderMap,
) -> AuthorityResult<Vec<u8>> {
    auth::require_gym_key(&state, gym_id, &headers)?;
    let envelope = state
        .registry
        .find_push(gym_id, push_id)?
        .ok_or_else(|| AuthorityError::NotFound(format!("push {push_id} for gym {gym_id}")))?;
    state.snapshots.read(gym_id, &envelope.file_name)
}

/// `POST /push/{gym_id}/ack`: mark a push delivered after the client's swap
/// completed.
pub async fn ack_push(
    State(state): State<AppState>,
    Path(gym_id): Path<GymId>,
    headers: HeaderMap,
    Json(req): Json<AckRequest>,
) -> AuthorityResult<Json<serde_json::Value>> {
    auth::require_gym_key(&state, gym_id, &headers)?;
    state.registry.ack(req.push_id)?;
    tracing::info!("Gym {} acknowledged push {}", gym_id, req.push_id);
    Ok(Json(serde_json::json!({ "acked": true })))
}

// ── Admin surface ────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub template_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateLicenseRequest {
    pub org_id: OrgId,
    /// Zero (or omitted) issues a perpetual license.
    #[serde(default)]
    pub months_validity: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtendValidityRequest {
    /// Zero makes the license perpetual.
    #[serde(default)]
    pub months: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RestoreBackupRequest {
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
pub struct PushQuery {
    pub file_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupListResponse {
    pub backups: Vec<String>,
}

pub async fn create_organization(
    State(state): State<AppState>,
    Json(req): Json<CreateOrganizationRequest>,
) -> AuthorityResult<Json<Organization>> {
    let org = state
        .registry
        .create_organization(&req.name, req.email, req.template_path)?;
    tracing::info!("Created organization {} ({})", org.name, org.org_id);
    Ok(Json(org))
}

pub async fn list_organizations(
    State(state): State<AppState>,
) -> AuthorityResult<Json<Vec<Organization>>> {
    Ok(Json(state.registry.list_organizations()?))
}

pub async fn generate_license(
    State(state): State<AppState>,
    Json(req): Json<GenerateLicenseRequest>,
) -> AuthorityResult<Json<LicenseRecord>> {
    let record = state
        .registry
        .generate_license(req.org_id, req.months_validity)?;
    tracing::info!(
        "Issued license {} to gym {} ({})",
        record.license_key,
        record.gym_name,
        record.gym_id
    );
    Ok(Json(record))
}

pub async fn list_gyms(State(state): State<AppState>) -> AuthorityResult<Json<Vec<LicenseRecord>>> {
    Ok(Json(state.registry.list_gyms()?))
}

pub async fn revoke_license(
    State(state): State<AppState>,
    Path(gym_id): Path<GymId>,
) -> AuthorityResult<Json<LicenseRecord>> {
    let record = state.registry.revoke(gym_id)?;
    tracing::warn!("Revoked license for gym {}", gym_id);
    Ok(Json(record))
}

pub async fn reset_hardware(
    State(state): State<AppState>,
    Path(gym_id): Path<GymId>,
) -> AuthorityResult<Json<LicenseRecord>> {
    let record = state.registry.reset_hardware(gym_id)?;
    tracing::info!("Reset hardware binding for gym {}", gym_id);
    Ok(Json(record))
}

pub async fn extend_validity(
    State(state): State<AppState>,
    Path(gym_id): Path<GymId>,
    Json(req): Json<ExtendValidityRequest>,
) -> AuthorityResult<Json<LicenseRecord>> {
    let record = state.registry.extend_validity(gym_id, req.months)?;
    tracing::info!(
        "Extended license for gym {} until {}",
        gym_id,
        record
            .expires_at
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "perpetual".to_string())
    );
    Ok(Json(record))
}

pub async fn delete_gym(
    State(state): State<AppState>,
    Path(gym_id): Path<GymId>,
) -> AuthorityResult<Json<serde_json::Value>> {
    state.registry.delete_gym(gym_id)?;
    state.snapshots.remove_gym(gym_id).await?;
    tracing::warn!("Deleted gym {} and its snapshots", gym_id);
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn get_stats(State(state): State<AppState>) -> AuthorityResult<Json<Stats>> {
    Ok(Json(state.registry.stats()?))
}

/// `POST /admin/gyms/{gym_id}/push?file_name=...`: upload a snapshot and
/// queue it for the gym, superseding any pending push.
pub async fn push_db(
    State(state): State<AppState>,
    Path(gym_id): Path<GymId>,
    Query(query): Query<PushQuery>,
    body: Bytes,
) -> AuthorityResult<Json<PushEnvelope>> {
    let record = state
        .registry
        .find_by_gym(gym_id)?
        .ok_or_else(|| AuthorityError::NotFound(format!("gym {gym_id}")))?;

    let (size_bytes, sha256_hex) = state.snapshots.store(gym_id, &query.file_name, &body).await?;
    let envelope = PushEnvelope {
        push_id: PushId::new(),
        gym_id,
        file_name: query.file_name,
        size_bytes,
        sha256_hex,
        queued_at: Utc::now(),
    };
    state.registry.queue_push(&envelope)?;
    tracing::info!(
        "Queued push {} ({} bytes) for gym {}",
        envelope.file_name,
        envelope.size_bytes,
        record.gym_name
    );
    Ok(Json(envelope))
}

/// `POST /admin/gyms/{gym_id}/restore`: queue a previously stored snapshot
/// as the gym's pending push.
pub async fn restore_backup(
    State(state): State<AppState>,
    Path(gym_id): Path<GymId>,
    Json(req): Json<RestoreBackupRequest>,
) -> AuthorityResult<Json<PushEnvelope>> {
    if state.registry.find_by_gym(gym_id)?.is_none() {
        return Err(AuthorityError::NotFound(format!("gym {gym_id}")));
    }

    let bytes = state.snapshots.read(gym_id, &req.file_name)?;
    let envelope = PushEnvelope {
        push_id: PushId::new(),
        gym_id,
        file_name: req.file_name,
        size_bytes: bytes.len() as u64,
        sha256_hex: hex::encode(Sha256::digest(&bytes)),
        queued_at: Utc::now(),
    };
    state.registry.queue_push(&envelope)?;
    tracing::info!("Queued restore of {} for gym {}", envelope.file_name, gym_id);
    Ok(Json(envelope))
}

pub async fn list_backups(
    State(state): State<AppState>,
    Path(gym_id): Path<GymId>,
) -> AuthorityResult<Json<BackupListResponse>> {
    if state.registry.find_by_gym(gym_id)?.is_none() {
        return Err(AuthorityError::NotFound(format!("gym {gym_id}")));
    }
    Ok(Json(BackupListResponse {
        backups: state.snapshots.list(gym_id)?,
    }))
}

fn sign_record(state: &AppState, record: &LicenseRecord) -> AuthorityResult<String> {
    let certificate = Certificate::issue(&state.signing_key, record)
        .map_err(|e| AuthorityError::Internal(format!("failed to sign certificate: {e}")))?;
    Ok(certificate.raw().to_string())
}
