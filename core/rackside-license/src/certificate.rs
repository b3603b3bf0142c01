//! Signed license certificates.
//!
//! Certificates use the format: `base64url(record_json).base64url(signature)`
//!
//! The payload is the JSON serialization of a [`LicenseRecord`]. The Ed25519
//! signature covers `payload_b64.as_bytes()` (the base64url-encoded payload
//! string, not the decoded JSON), matching the authority implementation.
//!
//! The authority signs; the client only verifies. A certificate cached on
//! disk therefore carries the authority's last decision in tamper-evident
//! form, and the client can keep honoring it with no network at all.

use crate::error::{LicenseError, LicenseResult};
use crate::record::LicenseRecord;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

/// Embedded Ed25519 public key of the production license authority (32 bytes).
pub const AUTHORITY_PUBLIC_KEY: [u8; 32] = [
    167, 91, 42, 57, 25, 152, 18, 107, 198, 44, 172, 124, 4, 166, 95, 247,
    40, 250, 196, 206, 61, 203, 35, 183, 55, 86, 36, 76, 43, 233, 95, 131,
];

/// A parsed and verified license certificate.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The raw certificate string.
    raw: String,
    /// The verified record payload.
    record: LicenseRecord,
}

impl Certificate {
    /// Signs a record, producing the certificate string plus its parsed form.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized.
    pub fn issue(signing_key: &SigningKey, record: &LicenseRecord) -> LicenseResult<Self> {
        let payload_json = serde_json::to_vec(record)?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(&payload_json);
        let signature = signing_key.sign(payload_b64.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());

        Ok(Self {
            raw: format!("{payload_b64}.{sig_b64}"),
            record: record.clone(),
        })
    }

    /// Parses and verifies a certificate string using the embedded
    /// production authority key.
    ///
    /// # Errors
    ///
    /// Returns an error if the format is invalid or signature verification
    /// fails.
    pub fn parse(raw: &str) -> LicenseResult<Self> {
        Self::parse_with_key(raw, &AUTHORITY_PUBLIC_KEY)
    }

    /// Parses and verifies a certificate string using a custom public key.
    /// Used for testing with a generated key pair.
    pub fn parse_with_key(raw: &str, pub_key_bytes: &[u8; 32]) -> LicenseResult<Self> {
        let raw = raw.trim();

        // Split into payload and signature parts
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() != 2 {
            return Err(LicenseError::InvalidPayload(
                "certificate must have exactly two parts separated by a dot".to_string(),
            ));
        }

        let payload_b64 = parts[0];
        let signature_b64 = parts[1];

        // Decode signature
        let sig_bytes = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
            LicenseError::InvalidPayload(format!("invalid signature base64: {e}"))
        })?;

        let signature = Signature::from_slice(&sig_bytes).map_err(|_| {
            LicenseError::InvalidPayload("invalid signature length".to_string())
        })?;

        // Build verifying key
        let verifying_key = VerifyingKey::from_bytes(pub_key_bytes)
            .map_err(|_| LicenseError::InvalidPayload("invalid public key".to_string()))?;

        // Verify signature over the base64url-encoded payload bytes
        verifying_key
            .verify(payload_b64.as_bytes(), &signature)
            .map_err(|_| LicenseError::InvalidSignature)?;

        // Decode record JSON
        let payload_json = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|e| {
            LicenseError::InvalidPayload(format!("invalid payload base64: {e}"))
        })?;

        let record: LicenseRecord = serde_json::from_slice(&payload_json)
            .map_err(|e| LicenseError::InvalidPayload(format!("invalid record JSON: {e}")))?;

        Ok(Self {
            raw: raw.to_string(),
            record,
        })
    }

    /// Returns the raw certificate string.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the verified record.
    #[must_use]
    pub fn record(&self) -> &LicenseRecord {
        &self.record
    }

    /// Consumes the certificate, returning the verified record.
    #[must_use]
    pub fn into_record(self) -> LicenseRecord {
        self.record
    }
}
