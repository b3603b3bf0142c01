#![cfg(feature = "online")]

mod common;

use common::{issue, make_record, manager_at, open_fast_store, stored, test_hardware_id, test_keypair};
use rackside_license::{
    AuthorityClient, ErrorKind, LicenseManager, ShellBridge, ShellRequest, ShellResponse,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bridge_over(manager: Arc<LicenseManager>, base_url: &str) -> ShellBridge {
    ShellBridge::new(manager, AuthorityClient::new(base_url), "2.4.1")
}

fn expect_ok(resp: ShellResponse) -> serde_json::Value {
    match resp {
        ShellResponse::Ok { data } => data,
        ShellResponse::Err { kind, message } => panic!("expected ok, got {kind:?}: {message}"),
    }
}

fn expect_err(resp: ShellResponse) -> (ErrorKind, String) {
    match resp {
        ShellResponse::Ok { data } => panic!("expected err, got ok: {data}"),
        ShellResponse::Err { kind, message } => (kind, message),
    }
}

// ── Dispatch ─────────────────────────────────────────────────────

#[tokio::test]
async fn get_hardware_id_reports_fingerprint() {
    let (_, pk) = test_keypair();
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(manager_at(dir.path(), &test_hardware_id(), pk));
    let bridge = bridge_over(manager, "http://127.0.0.1:9");

    let data = expect_ok(bridge.dispatch(ShellRequest::GetHardwareId).await);
    assert_eq!(data["hardware_id"], "hw-test-fingerprint-001");
}

#[tokio::test]
async fn get_status_on_fresh_machine() {
    let (_, pk) = test_keypair();
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(manager_at(dir.path(), &test_hardware_id(), pk));
    let bridge = bridge_over(manager, "http://127.0.0.1:9");

    let data = expect_ok(bridge.dispatch(ShellRequest::GetStatus).await);
    assert_eq!(data["state"], "unactivated");
    assert!(data["record"].is_null());
}

#[tokio::test]
async fn get_status_with_cached_license() {
    let (sk, pk) = test_keypair();
    let hw = test_hardware_id();
    let dir = tempfile::tempdir().unwrap();

    open_fast_store(dir.path(), &hw)
        .set(&stored(&sk, make_record(Some(hw.as_str()))))
        .unwrap();
    let manager = Arc::new(manager_at(dir.path(), &hw, pk));
    let bridge = bridge_over(manager, "http://127.0.0.1:9");

    let data = expect_ok(bridge.dispatch(ShellRequest::GetStatus).await);
    assert_eq!(data["state"], "active");
    assert_eq!(data["record"]["gym_name"], "Iron Works Gym");
}

#[tokio::test]
async fn deactivate_clears_license() {
    let (sk, pk) = test_keypair();
    let hw = test_hardware_id();
    let dir = tempfile::tempdir().unwrap();

    open_fast_store(dir.path(), &hw)
        .set(&stored(&sk, make_record(Some(hw.as_str()))))
        .unwrap();
    let manager = Arc::new(manager_at(dir.path(), &hw, pk));
    let bridge = bridge_over(Arc::clone(&manager), "http://127.0.0.1:9");

    let data = expect_ok(bridge.dispatch(ShellRequest::Deactivate).await);
    assert_eq!(data["state"], "unactivated");
    assert!(manager.license_key().is_none());
}

#[tokio::test]
async fn activate_via_bridge() {
    let server = MockServer::start().await;
    let (sk, pk) = test_keypair();
    let hw = test_hardware_id();
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(manager_at(dir.path(), &hw, pk));

    let record = make_record(Some(hw.as_str()));
    let cert = issue(&sk, &record);

    Mock::given(method("POST"))
        .and(path("/api/v1/activate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "certificate": cert.raw(),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = bridge_over(manager, &server.uri());
    let data = expect_ok(
        bridge
            .dispatch(ShellRequest::Activate {
                license_key: record.license_key.clone(),
            })
            .await,
    );
    assert_eq!(data["state"], "active");
    assert_eq!(data["record"]["license_key"], record.license_key.as_str());
}

#[tokio::test]
async fn activate_failure_is_err_response() {
    let server = MockServer::start().await;
    let (_, pk) = test_keypair();
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(manager_at(dir.path(), &test_hardware_id(), pk));

    Mock::given(method("POST"))
        .and(path("/api/v1/activate"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "kind": "invalid_key",
            "message": "no such key",
        })))
        .mount(&server)
        .await;

    let bridge = bridge_over(manager, &server.uri());
    let resp = bridge
        .dispatch(ShellRequest::Activate {
            license_key: "RSD-ZZZZZ-ZZZZZ-ZZZZZ-ZZZZZ".to_string(),
        })
        .await;

    assert!(!resp.is_ok());
    let (kind, message) = expect_err(resp);
    assert_eq!(kind, ErrorKind::InvalidKey);
    assert!(message.contains("no such key"));
}

#[tokio::test]
async fn report_version_never_fails() {
    let (_, pk) = test_keypair();
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(manager_at(dir.path(), &test_hardware_id(), pk));
    let bridge = bridge_over(manager, "http://127.0.0.1:9");

    let resp = bridge
        .dispatch(ShellRequest::ReportVersion {
            app_version: "2.4.1".to_string(),
        })
        .await;
    assert!(resp.is_ok());
}

// ── Wire shapes ──────────────────────────────────────────────────

#[test]
fn requests_deserialize_from_tagged_json() {
    let req: ShellRequest =
        serde_json::from_value(json!({ "op": "activate", "license_key": "RSD-X" })).unwrap();
    assert!(matches!(req, ShellRequest::Activate { license_key } if license_key == "RSD-X"));

    let req: ShellRequest = serde_json::from_value(json!({ "op": "get_status" })).unwrap();
    assert!(matches!(req, ShellRequest::GetStatus));

    let req: ShellRequest = serde_json::from_value(json!({ "op": "get_hardware_id" })).unwrap();
    assert!(matches!(req, ShellRequest::GetHardwareId));
}

#[test]
fn responses_serialize_with_outcome_tag() {
    let ok = ShellResponse::ok(&json!({ "n": 1 }));
    assert_eq!(
        serde_json::to_value(&ok).unwrap(),
        json!({ "outcome": "ok", "data": { "n": 1 } })
    );

    let err = ShellResponse::err(ErrorKind::Revoked, "license has been revoked");
    assert_eq!(
        serde_json::to_value(&err).unwrap(),
        json!({
            "outcome": "err",
            "kind": "revoked",
            "message": "license has been revoked",
        })
    );
}
