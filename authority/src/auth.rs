//! Request authentication.
//!
//! Two caller populations, two schemes: the admin console presents the
//! operator bearer token on every `/admin` route, and gym clients present
//! their license key in the `x-license-key` header on the push routes.
//! Activation and check-in authenticate by license key in the body instead,
//! because they are exactly the calls a not-yet-trusted machine makes.

use crate::error::{AuthorityError, AuthorityResult};
use crate::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use rackside_license::{LicenseRecord, LICENSE_KEY_HEADER};
use rackside_types::GymId;

/// Extracts the token from an `Authorization: Bearer` header.
///
/// Returns the token without the prefix, or None if the header is missing,
/// malformed, or empty after the prefix.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Middleware guarding the admin routes with the operator bearer token.
pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthorityError> {
    let token = extract_bearer_token(request.headers())
        .ok_or_else(|| AuthorityError::PermissionDenied("missing bearer token".to_string()))?;
    if token != state.admin_token.as_str() {
        return Err(AuthorityError::PermissionDenied(
            "invalid admin token".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

/// Authorizes a push-route call: the `x-license-key` header must carry the
/// key of the gym addressed by the path. Returns the gym's license record.
pub fn require_gym_key(
    state: &AppState,
    gym_id: GymId,
    headers: &HeaderMap,
) -> AuthorityResult<LicenseRecord> {
    let presented = headers
        .get(LICENSE_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            AuthorityError::PermissionDenied("missing license key header".to_string())
        })?;

    let record = state
        .registry
        .find_by_gym(gym_id)?
        .ok_or_else(|| AuthorityError::NotFound(format!("gym {gym_id}")))?;
    if record.license_key != presented {
        return Err(AuthorityError::PermissionDenied(
            "license key does not match this gym".to_string(),
        ));
    }
    Ok(record)
}
