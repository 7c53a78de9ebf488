//! # Persistence Port (C9)
//!
//! An abstract store for licenses and their live activations. Any ordered,
//! transactional key-value or relational store satisfies this trait — the reference
//! [`InMemoryPersistence`] implementation is a `tokio::sync::Mutex`-guarded row per
//! license id, giving the engine per-license-row locking without serializing
//! unrelated licenses' activation traffic against each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mhub_domain::{License, LicenseId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::ActivationError;

/// Whether a stored license is still honored by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseStatus {
    Active,
    Expired,
    Revoked,
}

/// A license as the server tracks it, independent of its wire envelope.
#[derive(Debug, Clone)]
pub struct StoredLicense {
    pub license: License,
    pub status: LicenseStatus,
}

/// One live seat against a `Floating`/`Concurrent` license.
#[derive(Debug, Clone)]
pub struct ActivationRecord {
    pub activation_id: Uuid,
    pub hardware_id: Option<String>,
    pub user_name: Option<String>,
    pub activated_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
}

/// The result of an atomic check-and-insert activation attempt.
#[derive(Debug, Clone)]
pub enum ActivationOutcome {
    Granted(ActivationRecord),
    SeatsExhausted,
}

/// The store the activation engine (C8) is built against.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Inserts or overwrites a license record.
    async fn put_license(&self, license_id: LicenseId, stored: StoredLicense) -> Result<(), ActivationError>;

    /// Fetches a license record, if one exists.
    async fn get_license(&self, license_id: LicenseId) -> Result<Option<StoredLicense>, ActivationError>;

    /// Updates a license's status in place.
    async fn set_status(&self, license_id: LicenseId, status: LicenseStatus) -> Result<(), ActivationError>;

    /// Atomically checks the current seat count against `max_seats` and, if there's
    /// room, inserts `record`. The check-then-insert happens under the row's own
    /// lock so concurrent callers for the same license never overrun `max_seats`.
    async fn try_activate(
        &self,
        license_id: LicenseId,
        max_seats: u32,
        record: ActivationRecord,
    ) -> Result<ActivationOutcome, ActivationError>;

    /// Removes an activation, e.g. on client disconnect or seat reclamation.
    async fn remove_activation(&self, license_id: LicenseId, activation_id: Uuid) -> Result<(), ActivationError>;

    /// Updates an activation's last-heartbeat timestamp.
    async fn touch_activation(
        &self,
        license_id: LicenseId,
        activation_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), ActivationError>;

    /// Lists every live activation for a license.
    async fn list_activations(&self, license_id: LicenseId) -> Result<Vec<ActivationRecord>, ActivationError>;

    /// Removes and returns every activation across all licenses whose
    /// `last_heartbeat` is older than `older_than`.
    async fn reclaim_stale(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<(LicenseId, ActivationRecord)>, ActivationError>;
}

#[derive(Default)]
struct LicenseRow {
    stored: Option<StoredLicense>,
    activations: HashMap<Uuid, ActivationRecord>,
}

/// In-memory reference implementation of [`PersistencePort`].
///
/// Intended for tests and for embedding a single-process server; a real deployment
/// swaps this for a relational or key-value store behind the same trait.
#[derive(Default)]
pub struct InMemoryPersistence {
    rows: RwLock<HashMap<LicenseId, Arc<Mutex<LicenseRow>>>>,
}

impl InMemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn row(&self, license_id: LicenseId) -> Arc<Mutex<LicenseRow>> {
        if let Some(row) = self.rows.read().await.get(&license_id) {
            return row.clone();
        }
        let mut rows = self.rows.write().await;
        rows.entry(license_id).or_insert_with(|| Arc::new(Mutex::new(LicenseRow::default()))).clone()
    }
}

#[async_trait]
impl PersistencePort for InMemoryPersistence {
    async fn put_license(&self, license_id: LicenseId, stored: StoredLicense) -> Result<(), ActivationError> {
        let row = self.row(license_id).await;
        row.lock().await.stored = Some(stored);
        Ok(())
    }

    async fn get_license(&self, license_id: LicenseId) -> Result<Option<StoredLicense>, ActivationError> {
        let row = self.row(license_id).await;
        Ok(row.lock().await.stored.clone())
    }

    async fn set_status(&self, license_id: LicenseId, status: LicenseStatus) -> Result<(), ActivationError> {
        let row = self.row(license_id).await;
        let mut row = row.lock().await;
        let stored = row.stored.as_mut().ok_or_else(|| ActivationError::NotFound {
            message: "no license with this id is stored".into(),
            context: Some("setting license status".into()),
        })?;
        stored.status = status;
        Ok(())
    }

    async fn try_activate(
        &self,
        license_id: LicenseId,
        max_seats: u32,
        record: ActivationRecord,
    ) -> Result<ActivationOutcome, ActivationError> {
        let row = self.row(license_id).await;
        let mut row = row.lock().await;
        if row.stored.is_none() {
            return Err(ActivationError::NotFound {
                message: "no license with this id is stored".into(),
                context: Some("activating license".into()),
            });
        }
        if row.activations.len() >= max_seats as usize {
            return Ok(ActivationOutcome::SeatsExhausted);
        }
        row.activations.insert(record.activation_id, record.clone());
        Ok(ActivationOutcome::Granted(record))
    }

    async fn remove_activation(&self, license_id: LicenseId, activation_id: Uuid) -> Result<(), ActivationError> {
        let row = self.row(license_id).await;
        row.lock().await.activations.remove(&activation_id);
        Ok(())
    }

    async fn touch_activation(
        &self,
        license_id: LicenseId,
        activation_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), ActivationError> {
        let row = self.row(license_id).await;
        let mut row = row.lock().await;
        let activation = row.activations.get_mut(&activation_id).ok_or_else(|| ActivationError::NotFound {
            message: "no activation with this id is live for this license".into(),
            context: Some("recording heartbeat".into()),
        })?;
        activation.last_heartbeat = at;
        Ok(())
    }

    async fn list_activations(&self, license_id: LicenseId) -> Result<Vec<ActivationRecord>, ActivationError> {
        let row = self.row(license_id).await;
        Ok(row.lock().await.activations.values().cloned().collect())
    }

    async fn reclaim_stale(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<(LicenseId, ActivationRecord)>, ActivationError> {
        let license_ids: Vec<LicenseId> = self.rows.read().await.keys().copied().collect();
        let mut reclaimed = Vec::new();
        for license_id in license_ids {
            let row = self.row(license_id).await;
            let mut row = row.lock().await;
            let stale_ids: Vec<Uuid> = row
                .activations
                .iter()
                .filter(|(_, a)| a.last_heartbeat < older_than)
                .map(|(id, _)| *id)
                .collect();
            for id in stale_ids {
                if let Some(record) = row.activations.remove(&id) {
                    reclaimed.push((license_id, record));
                }
            }
        }
        Ok(reclaimed)
    }
}
