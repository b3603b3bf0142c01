mod common;

use common::{issue, make_record, test_keypair};
use rackside_license::Certificate;

// ── Issue and parse ──────────────────────────────────────────────

#[test]
fn issue_then_parse_roundtrip() {
    let (sk, pk) = test_keypair();
    let record = make_record(Some("hw-1"));
    let cert = issue(&sk, &record);

    let parsed = Certificate::parse_with_key(cert.raw(), &pk).unwrap();
    assert_eq!(parsed.record(), &record);
    assert_eq!(parsed.raw(), cert.raw());
}

#[test]
fn certificate_has_two_dot_separated_parts() {
    let (sk, _) = test_keypair();
    let cert = issue(&sk, &make_record(None));
    assert_eq!(cert.raw().split('.').count(), 2);
}

#[test]
fn parse_with_surrounding_whitespace() {
    let (sk, pk) = test_keypair();
    let cert = issue(&sk, &make_record(None));
    let padded = format!("  {}  \n", cert.raw());
    assert!(Certificate::parse_with_key(&padded, &pk).is_ok());
}

#[test]
fn into_record_returns_payload() {
    let (sk, pk) = test_keypair();
    let record = make_record(Some("hw-2"));
    let cert = issue(&sk, &record);
    let parsed = Certificate::parse_with_key(cert.raw(), &pk).unwrap();
    assert_eq!(parsed.into_record(), record);
}

// ── Verification failures ────────────────────────────────────────

#[test]
fn wrong_public_key_rejected() {
    let (sk, _) = test_keypair();
    let cert = issue(&sk, &make_record(None));

    let other_seed: [u8; 32] = [9; 32];
    let other_pk = ed25519_dalek::SigningKey::from_bytes(&other_seed)
        .verifying_key()
        .to_bytes();
    assert!(Certificate::parse_with_key(cert.raw(), &other_pk).is_err());
}

#[test]
fn tampered_payload_rejected() {
    let (sk, pk) = test_keypair();
    let cert = issue(&sk, &make_record(None));
    let parts: Vec<&str> = cert.raw().split('.').collect();
    let tampered = format!("X{}.{}", &parts[0][1..], parts[1]);
    assert!(Certificate::parse_with_key(&tampered, &pk).is_err());
}

#[test]
fn tampered_signature_rejected() {
    let (sk, pk) = test_keypair();
    let cert = issue(&sk, &make_record(None));
    let parts: Vec<&str> = cert.raw().split('.').collect();
    let tampered = format!(
        "{}.AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
        parts[0]
    );
    assert!(Certificate::parse_with_key(&tampered, &pk).is_err());
}

#[test]
fn missing_dot_rejected() {
    let (_, pk) = test_keypair();
    assert!(Certificate::parse_with_key("nodothere", &pk).is_err());
}

#[test]
fn three_parts_rejected() {
    let (_, pk) = test_keypair();
    assert!(Certificate::parse_with_key("a.b.c", &pk).is_err());
}

#[test]
fn invalid_base64_rejected() {
    let (_, pk) = test_keypair();
    assert!(Certificate::parse_with_key("!!!.!!!", &pk).is_err());
}

#[test]
fn valid_signature_over_non_record_json_rejected() {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use ed25519_dalek::Signer;

    let (sk, pk) = test_keypair();
    // Correctly signed, but the payload is not a license record
    let payload_b64 = URL_SAFE_NO_PAD.encode(br#"{"sub":1}"#);
    let sig = sk.sign(payload_b64.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(sig.to_bytes());
    let cert = format!("{payload_b64}.{sig_b64}");

    assert!(Certificate::parse_with_key(&cert, &pk).is_err());
}

#[test]
fn record_swap_between_certificates_rejected() {
    // Payload of one certificate with the signature of another
    let (sk, pk) = test_keypair();
    let cert_a = issue(&sk, &make_record(Some("hw-a")));
    let cert_b = issue(&sk, &make_record(Some("hw-b")));

    let payload_a = cert_a.raw().split('.').next().unwrap();
    let sig_b = cert_b.raw().split('.').nth(1).unwrap();
    let spliced = format!("{payload_a}.{sig_b}");

    assert!(Certificate::parse_with_key(&spliced, &pk).is_err());
}
