//! # Activation Engine (C8)
//!
//! Server-side seat accounting, revocation, renewal, and the background sweep that
//! reclaims seats from clients that stopped heartbeating without disconnecting
//! cleanly (crash, network loss, killed process).

use crate::error::ActivationError;
use crate::persistence::{ActivationOutcome, ActivationRecord, LicenseStatus, PersistencePort, StoredLicense};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use mhub_domain::{License, LicenseId};
use mhub_licensing::{LicenseSerializer, RuleRegistry, ValidationContext};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

fn max_seats(license: &License) -> Option<u32> {
    match license {
        License::Floating(l) => Some(l.max_active_users_count),
        License::Concurrent(l) => Some(l.max_active_users_count),
        _ => None,
    }
}

/// Builds an [`ActivationEngine`].
pub struct ActivationEngineBuilder {
    store: Arc<dyn PersistencePort>,
    public_key: RsaPublicKey,
    private_key: Option<RsaPrivateKey>,
    rules: RuleRegistry,
    reclaim_interval: StdDuration,
    stale_after: ChronoDuration,
    heartbeat_interval: ChronoDuration,
}

impl ActivationEngineBuilder {
    #[must_use]
    pub fn new(store: Arc<dyn PersistencePort>, public_key: RsaPublicKey) -> Self {
        Self {
            store,
            public_key,
            private_key: None,
            rules: RuleRegistry::with_builtin_rules(),
            reclaim_interval: StdDuration::from_secs(300),
            stale_after: ChronoDuration::minutes(10),
            heartbeat_interval: ChronoDuration::minutes(2),
        }
    }

    /// Required to `generate`/`renew` licenses; without it the engine only validates
    /// and accounts for seats on already-issued envelopes.
    #[cfg(feature = "issuance")]
    #[must_use]
    pub fn private_key(mut self, key: RsaPrivateKey) -> Self {
        self.private_key = Some(key);
        self
    }

    #[must_use]
    pub fn reclaim_interval(mut self, interval: StdDuration) -> Self {
        self.reclaim_interval = interval;
        self
    }

    #[must_use]
    pub fn stale_after(mut self, duration: ChronoDuration) -> Self {
        self.stale_after = duration;
        self
    }

    #[must_use]
    pub fn heartbeat_interval(mut self, duration: ChronoDuration) -> Self {
        self.heartbeat_interval = duration;
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    /// Returns [`ActivationError::Internal`] if `stale_after` does not exceed
    /// `heartbeat_interval` — a reclamation threshold at or below the client's own
    /// heartbeat cadence would reclaim seats out from under clients that are still
    /// alive.
    pub fn build(self) -> Result<ActivationEngine, ActivationError> {
        if self.stale_after <= self.heartbeat_interval {
            return Err(ActivationError::Internal {
                message: format!(
                    "stale_after ({}) must exceed heartbeat_interval ({}): otherwise a client heartbeating exactly on schedule could still be reclaimed",
                    self.stale_after, self.heartbeat_interval
                )
                .into(),
                context: Some("building activation engine".into()),
            });
        }
        Ok(ActivationEngine {
            store: self.store,
            public_key: self.public_key,
            private_key: self.private_key,
            rules: self.rules,
            serializer: mhub_licensing::JsonLicenseSerializer,
            reclaim_interval: self.reclaim_interval,
            stale_after: self.stale_after,
        })
    }
}

/// Server-side license activation and seat accounting engine.
pub struct ActivationEngine {
    store: Arc<dyn PersistencePort>,
    public_key: RsaPublicKey,
    private_key: Option<RsaPrivateKey>,
    rules: RuleRegistry,
    serializer: mhub_licensing::JsonLicenseSerializer,
    reclaim_interval: StdDuration,
    stale_after: ChronoDuration,
}

impl ActivationEngine {
    #[must_use]
    pub fn builder(store: Arc<dyn PersistencePort>, public_key: RsaPublicKey) -> ActivationEngineBuilder {
        ActivationEngineBuilder::new(store, public_key)
    }

    /// Registers a freshly issued license with the engine and returns its signed
    /// envelope.
    ///
    /// # Errors
    /// Returns [`ActivationError::Internal`] if no private key was configured, or
    /// [`ActivationError::Codec`] if encoding fails.
    #[cfg(feature = "issuance")]
    pub async fn generate(&self, license: License) -> Result<Vec<u8>, ActivationError> {
        let private_key = self.private_key.as_ref().ok_or_else(|| ActivationError::Internal {
            message: "no private key configured; this engine cannot sign licenses".into(),
            context: Some("generating license".into()),
        })?;

        let license_id = license.base().license_id;
        self.store
            .put_license(license_id, StoredLicense { license: license.clone(), status: LicenseStatus::Active })
            .await?;

        self.encode(&license, private_key)
    }

    #[cfg(feature = "issuance")]
    fn encode(&self, license: &License, private_key: &RsaPrivateKey) -> Result<Vec<u8>, ActivationError> {
        let payload = self
            .serializer
            .serialize(license)
            .map_err(|e| ActivationError::Codec { source: e, context: Some("serializing license".into()) })?;
        mhub_licensing::codec::encode(&payload, private_key)
            .map_err(|e| ActivationError::Codec { source: e, context: Some("encoding license envelope".into()) })
    }

    /// Checks a stored license's status and validation rules, without touching
    /// activation accounting.
    ///
    /// # Errors
    /// Returns [`ActivationError::NotFound`] if unknown, [`ActivationError::Revoked`]
    /// if revoked, or the rule registry's error mapped onto this crate's error type.
    pub async fn validate(&self, license_id: LicenseId, ctx: &ValidationContext) -> Result<License, ActivationError> {
        let stored = self.load_active(license_id).await?;
        self.rules.validate(&stored.license, ctx).map_err(|e| match e {
            mhub_licensing::LicenseError::ExpiredLicense { message, context } => {
                ActivationError::Expired { message, context }
            },
            other => ActivationError::Codec { source: other, context: Some("validating license".into()) },
        })?;
        Ok(stored.license)
    }

    async fn load_active(&self, license_id: LicenseId) -> Result<StoredLicense, ActivationError> {
        let stored = self.store.get_license(license_id).await?.ok_or_else(|| ActivationError::NotFound {
            message: "no license with this id is registered".into(),
            context: None,
        })?;
        if stored.status == LicenseStatus::Revoked {
            return Err(ActivationError::Revoked {
                message: "this license has been revoked".into(),
                context: None,
            });
        }
        if stored.status == LicenseStatus::Expired {
            return Err(ActivationError::Expired {
                message: "this license has expired".into(),
                context: None,
            });
        }
        if let Some(expiration_date) = stored.license.base().expiration_date {
            if expiration_date < Utc::now() {
                self.store.set_status(license_id, LicenseStatus::Expired).await?;
                return Err(ActivationError::Expired {
                    message: "this license has expired".into(),
                    context: None,
                });
            }
        }
        Ok(stored)
    }

    /// Requests a seat for `license_id`. Only `Floating` and `Concurrent` licenses
    /// have a seat pool; every other variant always grants a single ungoverned
    /// activation once validation passes.
    ///
    /// # Errors
    /// Returns [`ActivationError::MaximumActivationsReached`] if the seat pool is
    /// full, or the same errors as [`Self::validate`].
    pub async fn activate(
        &self,
        license_id: LicenseId,
        hardware_id: Option<String>,
        user_name: Option<String>,
    ) -> Result<Uuid, ActivationError> {
        let ctx = ValidationContext { hardware_id: hardware_id.clone(), user_name: user_name.clone(), ..Default::default() };
        let license = self.validate(license_id, &ctx).await?;

        let now = Utc::now();
        let record = ActivationRecord {
            activation_id: Uuid::new_v4(),
            hardware_id,
            user_name,
            activated_at: now,
            last_heartbeat: now,
        };

        let Some(max_seats) = max_seats(&license) else {
            // No seat pool: always grant, but still track the activation so a
            // heartbeat/disconnect on it is meaningful.
            self.store.try_activate(license_id, u32::MAX, record.clone()).await?;
            return Ok(record.activation_id);
        };

        match self.store.try_activate(license_id, max_seats, record.clone()).await? {
            ActivationOutcome::Granted(granted) => Ok(granted.activation_id),
            ActivationOutcome::SeatsExhausted => Err(ActivationError::MaximumActivationsReached {
                message: format!("all {max_seats} seats are in use").into(),
                context: Some("activating license".into()),
            }),
        }
    }

    /// Records a liveness heartbeat for a live activation.
    ///
    /// # Errors
    /// Returns [`ActivationError::NotFound`] if the activation is not live.
    pub async fn heartbeat(&self, license_id: LicenseId, activation_id: Uuid) -> Result<(), ActivationError> {
        self.store.touch_activation(license_id, activation_id, Utc::now()).await
    }

    /// Releases a seat explicitly, e.g. on clean client shutdown.
    ///
    /// # Errors
    /// Propagates persistence errors; releasing an already-gone activation is not an
    /// error.
    pub async fn disconnect_concurrent(&self, license_id: LicenseId, activation_id: Uuid) -> Result<(), ActivationError> {
        self.store.remove_activation(license_id, activation_id).await
    }

    /// Revokes a license. Terminal for every variant except `Subscription`, which
    /// [`Self::renew`] can bring back to `Active`.
    ///
    /// # Errors
    /// Returns [`ActivationError::NotFound`] if unknown.
    pub async fn revoke(&self, license_id: LicenseId) -> Result<(), ActivationError> {
        self.store.get_license(license_id).await?.ok_or_else(|| ActivationError::NotFound {
            message: "no license with this id is registered".into(),
            context: Some("revoking license".into()),
        })?;
        self.store.set_status(license_id, LicenseStatus::Revoked).await
    }

    /// Extends a `Subscription` license by `extension` and re-signs its envelope,
    /// clearing any prior revocation.
    ///
    /// # Errors
    /// Returns [`ActivationError::BadRequest`] if `license_id` does not identify a
    /// `Subscription`, [`ActivationError::NotFound`] if unknown, or
    /// [`ActivationError::Internal`]/[`ActivationError::Codec`] as in
    /// [`Self::generate`].
    #[cfg(feature = "issuance")]
    pub async fn renew(&self, license_id: LicenseId, extension: ChronoDuration) -> Result<Vec<u8>, ActivationError> {
        let private_key = self.private_key.as_ref().ok_or_else(|| ActivationError::Internal {
            message: "no private key configured; this engine cannot sign licenses".into(),
            context: Some("renewing license".into()),
        })?;

        let mut stored = self.store.get_license(license_id).await?.ok_or_else(|| ActivationError::NotFound {
            message: "no license with this id is registered".into(),
            context: Some("renewing license".into()),
        })?;

        let License::Subscription(subscription) = &mut stored.license else {
            return Err(ActivationError::BadRequest {
                message: "only Subscription licenses can be renewed".into(),
                context: Some("renewing license".into()),
            });
        };
        subscription.subscription_duration = subscription.subscription_duration + extension;
        subscription.base.expiration_date =
            Some(subscription.subscription_start_date + subscription.subscription_duration);
        stored.status = LicenseStatus::Active;

        let license = stored.license.clone();
        self.store.put_license(license_id, stored).await?;
        self.encode(&license, private_key)
    }

    /// Verifies and parses an externally received envelope, without registering it.
    /// Used by a server validating what a client has already been issued.
    ///
    /// # Errors
    /// Returns [`ActivationError::Codec`] if the envelope doesn't verify or parse.
    pub fn decode_envelope(&self, envelope: &[u8]) -> Result<License, ActivationError> {
        let payload = mhub_licensing::codec::decode(envelope, &self.public_key)
            .map_err(|e| ActivationError::Codec { source: e, context: Some("decoding license envelope".into()) })?;
        self.serializer
            .deserialize(&payload)
            .map_err(|e| ActivationError::Codec { source: e, context: Some("parsing license payload".into()) })
    }

    /// Spawns the background sweep that reclaims seats from activations that have
    /// not heartbeated within `stale_after`.
    #[must_use]
    pub fn spawn_reclamation(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(engine.reclaim_interval);
            loop {
                ticker.tick().await;
                let cutoff = Utc::now() - engine.stale_after;
                match engine.store.reclaim_stale(cutoff).await {
                    Ok(reclaimed) if reclaimed.is_empty() => {},
                    Ok(reclaimed) => info!(count = reclaimed.len(), "reclaimed stale activations"),
                    Err(e) => warn!(error = %e, "reclamation sweep failed"),
                }
            }
        })
    }
}

/// A timestamp helper used by tests to simulate stale heartbeats without sleeping.
#[must_use]
pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - ChronoDuration::minutes(minutes)
}
