//! Shared test helpers: a real authority on a loopback port.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use ed25519_dalek::SigningKey;
use rackside_authority::registry::Registry;
use rackside_authority::snapshots::SnapshotStore;
use rackside_authority::{build_router, AppState};
use rackside_license::LicenseRecord;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const ADMIN_TOKEN: &str = "test-operator-token";

/// Deterministic authority key pair so tests can verify certificates.
pub fn test_signing_key() -> SigningKey {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    SigningKey::from_bytes(&seed)
}

pub struct TestAuthority {
    pub base: String,
    pub client: reqwest::Client,
    /// Public half of the test signing key, for certificate verification.
    pub public_key: [u8; 32],
    pub registry_path: PathBuf,
    _data_dir: TempDir,
}

/// Spin up the authority on an OS-assigned port with a fresh data directory.
pub async fn spawn_authority() -> TestAuthority {
    let data_dir = TempDir::new().unwrap();
    let registry_path = data_dir.path().join("registry.db");
    let signing_key = test_signing_key();
    let public_key = signing_key.verifying_key().to_bytes();

    let state = AppState {
        registry: Arc::new(Registry::open(&registry_path).unwrap()),
        snapshots: Arc::new(SnapshotStore::new(data_dir.path().join("backups"))),
        signing_key: Arc::new(signing_key),
        admin_token: ADMIN_TOKEN.to_string(),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestAuthority {
        base: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        public_key,
        registry_path,
        _data_dir: data_dir,
    }
}

impl TestAuthority {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base, path)
    }

    pub async fn admin_post(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(ADMIN_TOKEN)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn admin_get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(ADMIN_TOKEN)
            .send()
            .await
            .unwrap()
    }

    /// Creates an organization and issues one license under it.
    pub async fn issue_license(&self, org_name: &str, months_validity: u32) -> LicenseRecord {
        let resp = self
            .admin_post("/admin/organizations", json!({ "name": org_name }))
            .await;
        assert_eq!(resp.status(), 200);
        let org: serde_json::Value = resp.json().await.unwrap();

        let resp = self
            .admin_post(
                "/admin/licenses",
                json!({ "org_id": org["org_id"], "months_validity": months_validity }),
            )
            .await;
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    pub async fn activate(&self, license_key: &str, hardware_id: &str) -> reqwest::Response {
        self.client
            .post(self.url("/activate"))
            .json(&json!({
                "license_key": license_key,
                "hardware_id": hardware_id,
                "app_version": "2.4.1",
            }))
            .send()
            .await
            .unwrap()
    }

    pub async fn checkin(&self, license_key: &str, hardware_id: &str) -> reqwest::Response {
        self.client
            .post(self.url("/checkin"))
            .json(&json!({
                "license_key": license_key,
                "hardware_id": hardware_id,
                "app_version": "2.4.1",
            }))
            .send()
            .await
            .unwrap()
    }

    /// Rewrites a license's expiry behind the server's back, so tests can
    /// produce genuinely expired licenses.
    pub fn force_expiry(&self, license_key: &str, expires_at: DateTime<Utc>) {
        let conn = rusqlite::Connection::open(&self.registry_path).unwrap();
        conn.execute(
            "UPDATE licenses SET expires_at = ?1 WHERE license_key = ?2",
            rusqlite::params![expires_at.to_rfc3339(), license_key],
        )
        .unwrap();
    }
}

/// Reads the fault kind out of an error response body.
pub async fn fault_kind(resp: reqwest::Response) -> String {
    let body: serde_json::Value = resp.json().await.unwrap();
    body["kind"].as_str().unwrap().to_string()
}
