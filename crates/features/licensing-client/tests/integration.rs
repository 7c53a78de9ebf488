//! End-to-end scenarios for the client-side license manager (C6) and feature manager
//! (C7), exercising them against an in-process activation engine through
//! `DirectTransport` rather than a real network hop.

#![cfg(feature = "issuance")]

use chrono::Duration as ChronoDuration;
use mhub_activation::{ActivationEngine, InMemoryPersistence, LicenseStatus, PersistencePort, StoredLicense};
use mhub_domain::{Feature, FeatureMap};
use mhub_licensing::secrets;
use mhub_licensing::LicenseSerializer;
use mhub_licensing_client::manager::LicenseManager;
use mhub_licensing_client::transport::DirectTransport;
use mhub_licensing_client::{ActivationTransport, FeatureManager, LoadOutcome};
use std::sync::Arc;

fn envelope_for(license: &mhub_domain::License, private_key: &rsa::RsaPrivateKey) -> Vec<u8> {
    let serializer = mhub_licensing::JsonLicenseSerializer;
    let payload = serializer.serialize(license).unwrap();
    mhub_licensing::codec::encode(&payload, private_key).unwrap()
}

async fn seed(store: &InMemoryPersistence, license: mhub_domain::License) -> mhub_domain::LicenseId {
    let license_id = license.base().license_id;
    store.put_license(license_id, StoredLicense { license, status: LicenseStatus::Active }).await.unwrap();
    license_id
}

/// A `Standard` license needs no server contact at all: `load` succeeds offline and
/// its features are readable through the feature manager.
#[tokio::test]
async fn standard_license_loads_offline_and_exposes_features() {
    let (private_key, public_key) = secrets::generate_keypair().unwrap();
    let mut features = FeatureMap::new();
    features.insert("reports".to_owned(), Feature::Boolean(true));
    features.insert("seat_limit".to_owned(), Feature::Integer(10));
    let license = mhub_licensing::model::new_standard("Acme Inc.", "Jane Doe", features, None);
    let envelope = envelope_for(&license, &private_key);

    let manager = Arc::new(LicenseManager::builder(public_key).build());
    let outcome = manager.load_bytes(&envelope, Some("Jane Doe")).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Offline);

    let features = FeatureManager::new(Arc::clone(&manager));
    assert!(features.is_enabled("reports").await.unwrap());
    assert_eq!(features.as_int("seat_limit").await.unwrap(), 10);
    assert!(!features.is_enabled("nonexistent").await.unwrap());
    assert!(!features.as_bool("seat_limit").await.unwrap(), "wrong type falls back to the type's default");
    assert_eq!(features.as_int("nonexistent").await.unwrap(), 0, "missing feature falls back to the type's default");
}

/// A `Floating` license requires a transport; without one, `load` fails rather than
/// silently granting an unaccounted seat.
#[tokio::test]
async fn floating_license_without_transport_is_rejected() {
    let (private_key, public_key) = secrets::generate_keypair().unwrap();
    let license = mhub_licensing::model::new_floating("Acme Inc.", "Shared Pool", 3, FeatureMap::new()).unwrap();
    let envelope = envelope_for(&license, &private_key);

    let manager = LicenseManager::builder(public_key).build();
    assert!(manager.load_bytes(&envelope, None).await.is_err());
}

/// A `Concurrent` license activates through `DirectTransport` against a real engine,
/// and closing the manager releases the seat.
#[tokio::test]
async fn concurrent_license_activates_and_releases_through_direct_transport() {
    let (private_key, public_key) = secrets::generate_keypair().unwrap();
    let store = Arc::new(InMemoryPersistence::new());
    let license = mhub_licensing::model::new_concurrent("Acme Inc.", "Shared Pool", 1, FeatureMap::new()).unwrap();
    let license_id = seed(&store, license.clone()).await;
    let envelope = envelope_for(&license, &private_key);

    let engine = Arc::new(ActivationEngine::builder(store, public_key.clone()).build().unwrap());
    let transport = Arc::new(DirectTransport::new(Arc::clone(&engine)));

    let manager = Arc::new(
        LicenseManager::builder(public_key)
            .transport(transport)
            .heartbeat_interval(std::time::Duration::from_secs(3600))
            .build(),
    );

    let outcome = manager.load_bytes(&envelope, None).await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Online { .. }));

    // The one seat is taken; a second contender for the same license is rejected.
    assert!(engine.activate(license_id, None, Some("someone_else".into())).await.is_err());

    manager.close().await.unwrap();

    // Releasing frees the seat for a fresh activation.
    engine.activate(license_id, None, Some("someone_else".into())).await.unwrap();
}

/// Renewing a `Subscription` through `DirectTransport` extends its envelope, not just
/// the server's bookkeeping: the freshly signed bytes decode to the extended license.
#[tokio::test]
async fn subscription_renewal_through_direct_transport_extends_envelope() {
    let (private_key, public_key) = secrets::generate_keypair().unwrap();
    let store = Arc::new(InMemoryPersistence::new());
    let license = mhub_licensing::model::new_subscription(
        "Acme Inc.",
        "Jane Doe",
        chrono::Utc::now(),
        ChronoDuration::days(30),
        FeatureMap::new(),
    )
    .unwrap();
    let license_id = license.base().license_id;
    let original_expiry = license.base().expiration_date.unwrap();
    seed(&store, license).await;

    let engine =
        Arc::new(ActivationEngine::builder(store, public_key.clone()).private_key(private_key).build().unwrap());
    let transport = DirectTransport::new(Arc::clone(&engine)).renewal_extension(ChronoDuration::days(30));

    let renewed_envelope = transport.renew(license_id).await.unwrap();
    let payload = mhub_licensing::codec::decode(&renewed_envelope, &public_key).unwrap();
    let renewed = mhub_licensing::JsonLicenseSerializer.deserialize(&payload).unwrap();
    assert_eq!(renewed.base().expiration_date.unwrap(), original_expiry + ChronoDuration::days(30));
}
