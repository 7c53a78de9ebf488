//! # Feature Manager (C7)
//!
//! Typed access to the features carried by whatever license is currently loaded.
//! Reads go through [`crate::manager::LicenseManager::current`], so a manager that
//! reloads or closes its license is immediately reflected here — there's no separate
//! feature cache to go stale.

use crate::error::FeatureError;
use crate::manager::LicenseManager;
use chrono::{DateTime, Utc};
use mhub_domain::Feature;
use std::sync::Arc;

/// Reads feature grants off whatever license a [`LicenseManager`] currently holds.
pub struct FeatureManager {
    manager: Arc<LicenseManager>,
}

impl FeatureManager {
    #[must_use]
    pub const fn new(manager: Arc<LicenseManager>) -> Self {
        Self { manager }
    }

    async fn feature(&self, name: &str) -> Result<Feature, FeatureError> {
        let license = self
            .manager
            .current()
            .await
            .ok_or_else(|| FeatureError::NotLoaded { context: None })?;
        license
            .base()
            .features
            .get(name)
            .cloned()
            .ok_or_else(|| FeatureError::FeatureNotLicensed { name: name.to_owned(), context: None })
    }

    /// As [`Self::feature`], but a feature the license doesn't carry is `Ok(None)`
    /// rather than an error: the typed accessors fall back to the type's default in
    /// that case instead of propagating `FeatureNotLicensed`.
    async fn feature_opt(&self, name: &str) -> Result<Option<Feature>, FeatureError> {
        match self.feature(name).await {
            Ok(feature) => Ok(Some(feature)),
            Err(FeatureError::FeatureNotLicensed { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    /// Whether `name` is present and enabled (spec §3's per-type default rule).
    ///
    /// # Errors
    /// Returns [`FeatureError::NotLoaded`] if no license is loaded.
    pub async fn is_enabled(&self, name: &str) -> Result<bool, FeatureError> {
        match self.feature(name).await {
            Ok(feature) => Ok(feature.is_enabled()),
            Err(FeatureError::FeatureNotLicensed { .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Returns `Ok(())` if `name` is present and enabled, otherwise an error
    /// identifying why the gate failed. Intended for call sites that should refuse
    /// to run a feature rather than silently degrade.
    ///
    /// # Errors
    /// Returns [`FeatureError::NotLoaded`] or [`FeatureError::FeatureNotLicensed`].
    pub async fn require(&self, name: &str) -> Result<(), FeatureError> {
        let feature = self.feature(name).await?;
        if feature.is_enabled() {
            Ok(())
        } else {
            Err(FeatureError::FeatureNotLicensed { name: name.to_owned(), context: Some("feature present but disabled".into()) })
        }
    }

    /// Reads `name` as a boolean; `false` if it is absent or a different kind.
    ///
    /// # Errors
    /// Returns [`FeatureError::NotLoaded`] if no license is loaded.
    pub async fn as_bool(&self, name: &str) -> Result<bool, FeatureError> {
        Ok(self.feature_opt(name).await?.and_then(|f| f.as_bool()).unwrap_or_default())
    }

    /// Reads `name` as an integer; `0` if it is absent or a different kind.
    ///
    /// # Errors
    /// Returns [`FeatureError::NotLoaded`] if no license is loaded.
    pub async fn as_int(&self, name: &str) -> Result<i32, FeatureError> {
        Ok(self.feature_opt(name).await?.and_then(|f| f.as_int()).unwrap_or_default())
    }

    /// Reads `name` as a float; `0.0` if it is absent or a different kind.
    ///
    /// # Errors
    /// Returns [`FeatureError::NotLoaded`] if no license is loaded.
    pub async fn as_float(&self, name: &str) -> Result<f32, FeatureError> {
        Ok(self.feature_opt(name).await?.and_then(|f| f.as_float()).unwrap_or_default())
    }

    /// Reads `name` as a string; empty if it is absent or a different kind.
    ///
    /// # Errors
    /// Returns [`FeatureError::NotLoaded`] if no license is loaded.
    pub async fn as_string(&self, name: &str) -> Result<String, FeatureError> {
        Ok(self.feature_opt(name).await?.and_then(|f| f.as_string().map(str::to_owned)).unwrap_or_default())
    }

    /// Reads `name` as a timestamp; the Unix epoch if it is absent or a different kind.
    ///
    /// # Errors
    /// Returns [`FeatureError::NotLoaded`] if no license is loaded.
    pub async fn as_datetime(&self, name: &str) -> Result<DateTime<Utc>, FeatureError> {
        Ok(self.feature_opt(name).await?.and_then(|f| f.as_datetime()).unwrap_or_default())
    }

    /// Reads `name` as raw bytes; empty if it is absent or a different kind.
    ///
    /// # Errors
    /// Returns [`FeatureError::NotLoaded`] if no license is loaded.
    pub async fn as_bytes(&self, name: &str) -> Result<Vec<u8>, FeatureError> {
        Ok(self.feature_opt(name).await?.and_then(|f| f.as_bytes().map(<[u8]>::to_vec)).unwrap_or_default())
    }
}
