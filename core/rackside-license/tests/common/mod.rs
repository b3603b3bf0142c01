//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use ed25519_dalek::SigningKey;
use rackside_crypto::KdfParams;
use rackside_license::{Certificate, HardwareId, LicenseRecord, LicenseStore, StoredLicense};
use rackside_types::GymId;
use std::path::Path;

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> (SigningKey, [u8; 32]) {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    let signing_key = SigningKey::from_bytes(&seed);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key.to_bytes())
}

/// The fingerprint used as "this machine" throughout the tests.
pub fn test_hardware_id() -> HardwareId {
    HardwareId::from_string("hw-test-fingerprint-001")
}

/// A record for a fictional gym, bound to the given hardware ID,
/// expiring in one year.
pub fn make_record(hardware_id: Option<&str>) -> LicenseRecord {
    LicenseRecord {
        license_key: "RSD-AAAAA-BBBBB-CCCCC-DDDDD".to_string(),
        gym_id: GymId::new(),
        gym_name: "Iron Works Gym".to_string(),
        hardware_id: hardware_id.map(String::from),
        issued_at: Utc::now(),
        expires_at: Some(Utc::now() + Duration::days(365)),
        active: true,
        app_version: Some("2.4.1".to_string()),
        last_sync: Some(Utc::now()),
    }
}

/// A perpetual record (no expiry).
pub fn perpetual_record(hardware_id: Option<&str>) -> LicenseRecord {
    LicenseRecord {
        expires_at: None,
        ..make_record(hardware_id)
    }
}

/// Signs a record into a certificate.
pub fn issue(signing_key: &SigningKey, record: &LicenseRecord) -> Certificate {
    Certificate::issue(signing_key, record).unwrap()
}

/// Builds the stored form of a signed record.
pub fn stored(signing_key: &SigningKey, record: LicenseRecord) -> StoredLicense {
    let cert = Certificate::issue(signing_key, &record).unwrap();
    StoredLicense {
        record,
        certificate: cert.raw().to_string(),
    }
}

/// Opens a store in `dir` with KDF parameters fast enough for tests.
pub fn open_fast_store(dir: &Path, hardware_id: &HardwareId) -> LicenseStore {
    LicenseStore::open_with_params(
        dir.join("license.bin"),
        hardware_id,
        KdfParams::fast_insecure(),
    )
}

/// Builds a manager over a fast store in `dir`, trusting `authority_key`.
pub fn manager_at(
    dir: &Path,
    hardware_id: &HardwareId,
    authority_key: [u8; 32],
) -> rackside_license::LicenseManager {
    rackside_license::LicenseManager::with_authority_key(
        open_fast_store(dir, hardware_id),
        hardware_id.clone(),
        authority_key,
    )
}
