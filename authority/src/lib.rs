//! The Rackside license authority.
//!
//! Central HTTP service the desktop clients and the admin console talk to.
//! It owns the registry of organizations and licenses, signs every
//! certificate the clients cache, and queues database snapshots for
//! delivery to gym machines.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod snapshots;

use axum::routing::{delete, get, post};
use axum::{middleware, Router};
use ed25519_dalek::SigningKey;
use rackside_license::API_PREFIX;
use registry::Registry;
use snapshots::SnapshotStore;
use std::sync::Arc;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub snapshots: Arc<SnapshotStore>,
    pub signing_key: Arc<SigningKey>,
    pub admin_token: String,
}

/// Builds the HTTP API router with the given state.
///
/// Client routes authenticate per-call (license key in body or header);
/// everything under `/admin` is guarded by the operator bearer token.
pub fn build_router(state: AppState) -> Router {
    let admin = Router::new()
        .route(
            "/organizations",
            post(handlers::create_organization).get(handlers::list_organizations),
        )
        .route("/licenses", post(handlers::generate_license))
        .route("/gyms", get(handlers::list_gyms))
        .route("/gyms/{gym_id}", delete(handlers::delete_gym))
        .route("/gyms/{gym_id}/revoke", post(handlers::revoke_license))
        .route("/gyms/{gym_id}/reset-hardware", post(handlers::reset_hardware))
        .route("/gyms/{gym_id}/extend", post(handlers::extend_validity))
        .route("/gyms/{gym_id}/push", post(handlers::push_db))
        .route("/gyms/{gym_id}/restore", post(handlers::restore_backup))
        .route("/gyms/{gym_id}/backups", get(handlers::list_backups))
        .route("/stats", get(handlers::get_stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::admin_auth,
        ));

    let api = Router::new()
        .route("/activate", post(handlers::activate))
        .route("/checkin", post(handlers::checkin))
        .route("/push/{gym_id}/pending", get(handlers::pending_push))
        .route(
            "/push/{gym_id}/download/{push_id}",
            get(handlers::download_push),
        )
        .route("/push/{gym_id}/ack", post(handlers::ack_push))
        .nest("/admin", admin);

    Router::new().nest(API_PREFIX, api).with_state(state)
}
