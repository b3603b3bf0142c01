mod common;

use chrono::{Duration, Utc};
use common::{make_record, perpetual_record, test_hardware_id};
use rackside_license::ActivationState;

// ── Expiry ───────────────────────────────────────────────────────

#[test]
fn fresh_record_not_expired() {
    let record = make_record(None);
    assert!(!record.is_expired_at(Utc::now()));
}

#[test]
fn record_expired_after_window() {
    let record = make_record(None);
    let later = Utc::now() + Duration::days(366);
    assert!(record.is_expired_at(later));
}

#[test]
fn perpetual_record_never_expires() {
    let record = perpetual_record(None);
    let far_future = Utc::now() + Duration::days(365 * 100);
    assert!(!record.is_expired_at(far_future));
}

#[test]
fn expiry_boundary_is_inclusive() {
    let record = make_record(None);
    let exp = record.expires_at.unwrap();
    assert!(record.is_expired_at(exp));
    assert!(!record.is_expired_at(exp - Duration::seconds(1)));
}

// ── Local state derivation ───────────────────────────────────────

#[test]
fn bound_active_record_is_active() {
    let hw = test_hardware_id();
    let record = make_record(Some(hw.as_str()));
    assert_eq!(record.local_state(&hw, Utc::now()), ActivationState::Active);
}

#[test]
fn revoked_record_is_revoked() {
    let hw = test_hardware_id();
    let mut record = make_record(Some(hw.as_str()));
    record.active = false;
    assert_eq!(record.local_state(&hw, Utc::now()), ActivationState::Revoked);
}

#[test]
fn revocation_wins_over_expiry() {
    // A revoked license reports Revoked even when also past its window
    let hw = test_hardware_id();
    let mut record = make_record(Some(hw.as_str()));
    record.active = false;
    let later = Utc::now() + Duration::days(400);
    assert_eq!(record.local_state(&hw, later), ActivationState::Revoked);
}

#[test]
fn revocation_wins_over_hardware_mismatch() {
    let hw = test_hardware_id();
    let mut record = make_record(Some("some-other-machine"));
    record.active = false;
    assert_eq!(record.local_state(&hw, Utc::now()), ActivationState::Revoked);
}

#[test]
fn foreign_binding_is_hardware_mismatch() {
    let hw = test_hardware_id();
    let record = make_record(Some("some-other-machine"));
    assert_eq!(
        record.local_state(&hw, Utc::now()),
        ActivationState::HardwareMismatch
    );
}

#[test]
fn expired_record_is_expired() {
    let hw = test_hardware_id();
    let record = make_record(Some(hw.as_str()));
    let later = Utc::now() + Duration::days(400);
    assert_eq!(record.local_state(&hw, later), ActivationState::Expired);
}

#[test]
fn perpetual_record_stays_active_forever() {
    let hw = test_hardware_id();
    let record = perpetual_record(Some(hw.as_str()));
    let far_future = Utc::now() + Duration::days(365 * 100);
    assert_eq!(record.local_state(&hw, far_future), ActivationState::Active);
}

#[test]
fn unbound_record_imposes_no_mismatch() {
    // hardware_id = None (e.g. after an admin reset) binds no one out
    let hw = test_hardware_id();
    let record = make_record(None);
    assert_eq!(record.local_state(&hw, Utc::now()), ActivationState::Active);
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn record_serde_roundtrip() {
    let record = make_record(Some("hw-x"));
    let json = serde_json::to_string(&record).unwrap();
    let parsed: rackside_license::LicenseRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);
}

#[test]
fn record_serde_preserves_none_expiry() {
    let record = perpetual_record(None);
    let json = serde_json::to_string(&record).unwrap();
    let parsed: rackside_license::LicenseRecord = serde_json::from_str(&json).unwrap();
    assert!(parsed.expires_at.is_none());
    assert!(parsed.hardware_id.is_none());
}

// ── ActivationState ──────────────────────────────────────────────

#[test]
fn only_active_state_is_active() {
    assert!(ActivationState::Active.is_active());
    assert!(!ActivationState::Unactivated.is_active());
    assert!(!ActivationState::PendingValidation.is_active());
    assert!(!ActivationState::Expired.is_active());
    assert!(!ActivationState::Revoked.is_active());
    assert!(!ActivationState::HardwareMismatch.is_active());
}

#[test]
fn activation_state_serde_snake_case() {
    let json = serde_json::to_string(&ActivationState::PendingValidation).unwrap();
    assert_eq!(json, "\"pending_validation\"");
    let json = serde_json::to_string(&ActivationState::HardwareMismatch).unwrap();
    assert_eq!(json, "\"hardware_mismatch\"");
}
