//! The license data model: a discriminated sum over six license shapes, all sharing a
//! common [`BaseLicense`] header.
//!
//! This crate only defines the shapes and their wire representation. Smart
//! constructors that enforce the per-variant invariants (e.g. a `Trial`'s expiration
//! always following from its period) live in `mhub-licensing`, alongside the
//! validation rules that re-check those invariants at load time.

use crate::feature::FeatureMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique, immutable identifier assigned to a license at issuance.
pub type LicenseId = Uuid;

/// The license-type discriminator. Serializes as the bare variant name so it can
/// double as the `Type` field the serializer port writes into the wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseType {
    Standard,
    Trial,
    NodeLocked,
    Subscription,
    Floating,
    Concurrent,
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Standard => "Standard",
            Self::Trial => "Trial",
            Self::NodeLocked => "NodeLocked",
            Self::Subscription => "Subscription",
            Self::Floating => "Floating",
            Self::Concurrent => "Concurrent",
        };
        f.write_str(s)
    }
}

/// Attributes common to every license variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseLicense {
    pub license_id: LicenseId,
    pub license_key: String,
    /// Wire name is `type`, matching the serializer port's discriminator (spec §4.3).
    #[serde(rename = "type")]
    pub license_type: LicenseType,
    pub issued_on: DateTime<Utc>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub issuer: String,
    pub features: FeatureMap,
}

/// Serializes a [`chrono::Duration`] as whole seconds.
pub mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.num_seconds().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(d)?;
        Ok(Duration::seconds(secs))
    }
}

/// A named-user license with no hardware or seat binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standard {
    #[serde(flatten)]
    pub base: BaseLicense,
    pub user_name: String,
}

/// A time-boxed evaluation license. `base.expiration_date` always equals
/// `base.issued_on + trial_period`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trial {
    #[serde(flatten)]
    pub base: BaseLicense,
    #[serde(with = "duration_seconds")]
    pub trial_period: chrono::Duration,
}

/// A license bound to a single machine fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLocked {
    #[serde(flatten)]
    pub base: BaseLicense,
    pub hardware_id: String,
}

/// A recurring license whose extent is derived from a start date and duration.
/// `base.expiration_date` always equals `subscription_start_date + subscription_duration`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(flatten)]
    pub base: BaseLicense,
    pub user_name: String,
    pub subscription_start_date: DateTime<Utc>,
    #[serde(with = "duration_seconds")]
    pub subscription_duration: chrono::Duration,
}

/// A license with a floating seat pool of a fixed maximum size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Floating {
    #[serde(flatten)]
    pub base: BaseLicense,
    pub user_name: String,
    pub max_active_users_count: u32,
}

/// A license with a concurrently-enforced seat pool of a fixed maximum size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concurrent {
    #[serde(flatten)]
    pub base: BaseLicense,
    pub user_name: String,
    pub max_active_users_count: u32,
}

/// The tagged sum over all six license shapes.
///
/// Dispatch in the validator, activation engine, and serializer uses exhaustive case
/// analysis over this enum rather than dynamic downcasting. This type intentionally
/// has no `Serialize`/`Deserialize` of its own: the serializer port (`mhub-licensing`)
/// owns discriminator-based dispatch, serializing each variant's own flattened
/// representation (which already carries the `type` field via [`BaseLicense`]).
#[derive(Debug, Clone)]
pub enum License {
    Standard(Standard),
    Trial(Trial),
    NodeLocked(NodeLocked),
    Subscription(Subscription),
    Floating(Floating),
    Concurrent(Concurrent),
}

impl License {
    #[must_use]
    pub const fn base(&self) -> &BaseLicense {
        match self {
            Self::Standard(l) => &l.base,
            Self::Trial(l) => &l.base,
            Self::NodeLocked(l) => &l.base,
            Self::Subscription(l) => &l.base,
            Self::Floating(l) => &l.base,
            Self::Concurrent(l) => &l.base,
        }
    }

    #[must_use]
    pub fn base_mut(&mut self) -> &mut BaseLicense {
        match self {
            Self::Standard(l) => &mut l.base,
            Self::Trial(l) => &mut l.base,
            Self::NodeLocked(l) => &mut l.base,
            Self::Subscription(l) => &mut l.base,
            Self::Floating(l) => &mut l.base,
            Self::Concurrent(l) => &mut l.base,
        }
    }

    #[must_use]
    pub const fn license_type(&self) -> LicenseType {
        self.base().license_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(license_type: LicenseType) -> BaseLicense {
        BaseLicense {
            license_id: Uuid::new_v4(),
            license_key: Uuid::new_v4().to_string(),
            license_type,
            issued_on: Utc::now(),
            expiration_date: None,
            issuer: "Acme".to_owned(),
            features: FeatureMap::new(),
        }
    }

    #[test]
    fn standard_roundtrips_through_json_with_type_discriminator() {
        let standard = Standard { base: base(LicenseType::Standard), user_name: "John Doe".to_owned() };
        let json = serde_json::to_value(&standard).unwrap();
        assert_eq!(json["type"], "Standard");

        let back: Standard = serde_json::from_value(json).unwrap();
        let license = License::Standard(back);
        assert_eq!(license.license_type(), LicenseType::Standard);
    }

    #[test]
    fn trial_period_serializes_as_seconds() {
        let trial = Trial { base: base(LicenseType::Trial), trial_period: chrono::Duration::days(7) };
        let json = serde_json::to_value(&trial).unwrap();
        assert_eq!(json["trialPeriod"], 7 * 24 * 3600);
    }
}
