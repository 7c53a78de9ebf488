//! Scenarios exercising the activation engine against the in-memory persistence
//! reference implementation: concurrent seat accounting, stale-seat reclamation, and
//! subscription renewal.

#![cfg(feature = "issuance")]

use chrono::Duration as ChronoDuration;
use mhub_activation::persistence::{LicenseStatus, PersistencePort, StoredLicense};
use mhub_activation::{ActivationEngine, ActivationError, InMemoryPersistence};
use mhub_domain::FeatureMap;
use mhub_licensing::secrets;
use std::sync::Arc;
use std::time::Duration as StdDuration;

async fn seed(store: &InMemoryPersistence, license: mhub_domain::License) -> mhub_domain::LicenseId {
    let license_id = license.base().license_id;
    store.put_license(license_id, StoredLicense { license, status: LicenseStatus::Active }).await.unwrap();
    license_id
}

/// S4: exactly `max_active_users_count` concurrent `activate` calls succeed; the
/// rest are rejected with `MaximumActivationsReached`.
#[tokio::test]
async fn concurrent_activation_respects_seat_cap() {
    let (_, public_key) = secrets::generate_keypair().unwrap();
    let store = Arc::new(InMemoryPersistence::new());
    let license = mhub_licensing::model::new_floating("Acme Inc.", "Shared Pool", 3, FeatureMap::new()).unwrap();
    let license_id = seed(&store, license).await;

    let engine = Arc::new(ActivationEngine::builder(store, public_key).build().unwrap());

    let mut handles = Vec::new();
    for i in 0..5 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.activate(license_id, Some(format!("HWID-{i}")), None).await
        }));
    }

    let results: Vec<_> = futures_join_all(handles).await;
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejections = results
        .iter()
        .filter(|r| matches!(r, Err(ActivationError::MaximumActivationsReached { .. })))
        .count();

    assert_eq!(successes, 3);
    assert_eq!(rejections, 2);
}

async fn futures_join_all<T>(handles: Vec<tokio::task::JoinHandle<T>>) -> Vec<T> {
    let mut out = Vec::with_capacity(handles.len());
    for h in handles {
        out.push(h.await.unwrap());
    }
    out
}

/// S5: an activation whose heartbeat goes stale beyond `stale_after` is reclaimed,
/// freeing its seat for a new activation. Backdates the heartbeat directly rather
/// than racing a real clock against the sweep's timer.
#[tokio::test]
async fn stale_activations_are_reclaimed() {
    let (_, public_key) = secrets::generate_keypair().unwrap();
    let store = Arc::new(InMemoryPersistence::new());
    let license = mhub_licensing::model::new_concurrent("Acme Inc.", "Shared Pool", 1, FeatureMap::new()).unwrap();
    let license_id = seed(&store, license).await;

    let engine = Arc::new(
        ActivationEngine::builder(Arc::clone(&store), public_key)
            .heartbeat_interval(ChronoDuration::seconds(1))
            .stale_after(ChronoDuration::seconds(5))
            .build()
            .unwrap(),
    );

    let first = engine.activate(license_id, None, Some("alice".into())).await.unwrap();
    assert!(matches!(
        engine.activate(license_id, None, Some("bob".into())).await,
        Err(ActivationError::MaximumActivationsReached { .. })
    ));

    store.touch_activation(license_id, first, chrono::Utc::now() - ChronoDuration::seconds(10)).await.unwrap();

    let reclaimed = store.reclaim_stale(chrono::Utc::now() - ChronoDuration::seconds(5)).await.unwrap();
    assert_eq!(reclaimed.len(), 1);
    assert_eq!(reclaimed[0].1.activation_id, first);

    assert!(engine.heartbeat(license_id, first).await.is_err(), "stale activation should have been removed");
    engine.activate(license_id, None, Some("bob".into())).await.unwrap();
}

/// `validate` treats a persisted `expiration_date` in the past as `Expired` for every
/// variant, independent of the rule registry, and persists the `Expired` status so
/// subsequent calls short-circuit without re-checking the clock.
#[tokio::test]
async fn expired_license_is_marked_and_rejected() {
    let (_, public_key) = secrets::generate_keypair().unwrap();
    let store = Arc::new(InMemoryPersistence::new());
    let mut license = mhub_licensing::model::new_floating("Acme Inc.", "Shared Pool", 3, FeatureMap::new()).unwrap();
    license.base_mut().expiration_date = Some(chrono::Utc::now() - ChronoDuration::days(1));
    let license_id = seed(&store, license).await;

    let engine = Arc::new(ActivationEngine::builder(Arc::clone(&store), public_key).build().unwrap());
    let ctx = mhub_licensing::ValidationContext::default();

    assert!(matches!(engine.validate(license_id, &ctx).await, Err(ActivationError::Expired { .. })));
    assert_eq!(store.get_license(license_id).await.unwrap().unwrap().status, LicenseStatus::Expired);

    assert!(matches!(
        engine.activate(license_id, None, None).await,
        Err(ActivationError::Expired { .. })
    ));
}

/// S6: renewing a `Subscription` extends its expiration and clears a prior
/// revocation.
#[tokio::test]
async fn subscription_renewal_extends_and_unrevokes() {
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

    let engine = Arc::new(
        ActivationEngine::builder(store.clone(), public_key)
            .private_key(private_key)
            .build()
            .unwrap(),
    );

    engine.revoke(license_id).await.unwrap();
    let ctx = mhub_licensing::ValidationContext::default();
    assert!(matches!(engine.validate(license_id, &ctx).await, Err(ActivationError::Revoked { .. })));

    engine.renew(license_id, ChronoDuration::days(30)).await.unwrap();

    let renewed = store.get_license(license_id).await.unwrap().unwrap();
    assert_eq!(renewed.status, LicenseStatus::Active);
    assert_eq!(renewed.license.base().expiration_date.unwrap(), original_expiry + ChronoDuration::days(30));

    engine.validate(license_id, &ctx).await.unwrap();
}

/// Revocation is terminal for variants other than `Subscription`: nothing
/// un-revokes a revoked `Standard` license.
#[tokio::test]
async fn revocation_is_terminal_for_non_subscription_variants() {
    let (_, public_key) = secrets::generate_keypair().unwrap();
    let store = Arc::new(InMemoryPersistence::new());
    let license = mhub_licensing::model::new_standard("Acme Inc.", "Jane Doe", FeatureMap::new(), None);
    let license_id = seed(&store, license).await;

    let engine = Arc::new(ActivationEngine::builder(store, public_key).build().unwrap());
    engine.revoke(license_id).await.unwrap();

    let ctx = mhub_licensing::ValidationContext::default();
    assert!(matches!(engine.validate(license_id, &ctx).await, Err(ActivationError::Revoked { .. })));
}
