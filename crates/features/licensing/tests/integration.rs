//! End-to-end coverage of the envelope codec, serializer, and validation rules
//! working together: generate a license, frame it into an envelope, and check it
//! back out the way a client would.

#![cfg(feature = "issuance")]

use chrono::Duration;
use mhub_domain::FeatureMap;
use mhub_licensing::rules::{RuleRegistry, ValidationContext};
use mhub_licensing::serializer::{JsonLicenseSerializer, LicenseSerializer};
use mhub_licensing::{codec, model, secrets, LicenseError};

fn issue_envelope(license: &mhub_domain::License) -> (Vec<u8>, rsa::RsaPublicKey) {
    let (private_key, public_key) = secrets::generate_keypair().unwrap();
    let serializer = JsonLicenseSerializer;
    let payload = serializer.serialize(license).unwrap();
    let envelope = codec::encode(&payload, &private_key).unwrap();
    (envelope, public_key)
}

/// S1: a `Standard` license round-trips through the full codec pipeline and
/// validates for its bound user.
#[test]
fn standard_license_end_to_end() {
    let license = model::new_standard("Acme Inc.", "Jane Doe", FeatureMap::new(), None);
    let (envelope, public_key) = issue_envelope(&license);

    let payload = codec::decode(&envelope, &public_key).unwrap();
    let parsed = JsonLicenseSerializer.deserialize(&payload).unwrap();

    let registry = RuleRegistry::with_builtin_rules();
    let ctx = ValidationContext { user_name: Some("Jane Doe".into()), ..Default::default() };
    registry.validate(&parsed, &ctx).unwrap();

    let wrong_user = ValidationContext { user_name: Some("John Smith".into()), ..Default::default() };
    assert!(registry.validate(&parsed, &wrong_user).is_err());
}

/// S2: a `Trial` license validates before its period elapses and is rejected after.
#[test]
fn trial_license_expires() {
    let license = model::new_trial("Acme Inc.", Duration::seconds(1), FeatureMap::new()).unwrap();
    let (envelope, public_key) = issue_envelope(&license);

    let payload = codec::decode(&envelope, &public_key).unwrap();
    let parsed = JsonLicenseSerializer.deserialize(&payload).unwrap();

    let registry = RuleRegistry::with_builtin_rules();
    let before = ValidationContext { now: Some(parsed.base().issued_on), ..Default::default() };
    registry.validate(&parsed, &before).unwrap();

    let after = ValidationContext {
        now: Some(parsed.base().issued_on + Duration::days(1)),
        ..Default::default()
    };
    assert!(matches!(
        registry.validate(&parsed, &after).unwrap_err(),
        LicenseError::ExpiredLicense { .. }
    ));
}

/// S3: a `NodeLocked` license validates only against its bound hardware id.
#[test]
fn node_locked_license_binds_to_hardware() {
    let license = model::new_node_locked("Acme Inc.", "HWID-workstation-7", FeatureMap::new());
    let (envelope, public_key) = issue_envelope(&license);

    let payload = codec::decode(&envelope, &public_key).unwrap();
    let parsed = JsonLicenseSerializer.deserialize(&payload).unwrap();

    let registry = RuleRegistry::with_builtin_rules();
    let right = ValidationContext { hardware_id: Some("HWID-workstation-7".into()), ..Default::default() };
    registry.validate(&parsed, &right).unwrap();

    let wrong = ValidationContext { hardware_id: Some("HWID-other-machine".into()), ..Default::default() };
    assert!(matches!(
        registry.validate(&parsed, &wrong).unwrap_err(),
        LicenseError::HardwareMismatch { .. }
    ));
}

/// Property: tampering with any byte of the envelope is caught before the
/// serializer ever sees a payload.
#[test]
fn tampered_envelope_never_reaches_the_serializer() {
    let license = model::new_standard("Acme Inc.", "Jane Doe", FeatureMap::new(), None);
    let (mut envelope, public_key) = issue_envelope(&license);

    let last = envelope.len() - 1;
    envelope[last] ^= 0x01;

    assert!(matches!(
        codec::decode(&envelope, &public_key).unwrap_err(),
        LicenseError::InvalidLicenseSignature { .. }
    ));
}

/// Property: decoding with a public key that doesn't match the signing private key
/// is always rejected, regardless of the payload's own validity.
#[test]
fn cross_key_decoding_is_rejected() {
    let license = model::new_standard("Acme Inc.", "Jane Doe", FeatureMap::new(), None);
    let (envelope, _) = issue_envelope(&license);
    let (_, other_public_key) = secrets::generate_keypair().unwrap();

    assert!(codec::decode(&envelope, &other_public_key).is_err());
}
