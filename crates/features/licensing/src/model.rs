//! # License Smart Constructors
//!
//! Builds each license variant while enforcing the invariants `mhub-domain` only
//! describes in its doc comments: a [`Trial`]'s expiration always follows from its
//! period, a [`Subscription`]'s from its start date and duration, and every seat-pool
//! variant requires a positive seat count.

use crate::error::LicenseError;
use chrono::{DateTime, Duration, Utc};
use mhub_domain::{
    BaseLicense, Concurrent, FeatureMap, Floating, License, LicenseType, NodeLocked, Standard,
    Subscription, Trial,
};
use uuid::Uuid;

fn base(issuer: &str, license_type: LicenseType, features: FeatureMap, license_key: Option<String>) -> BaseLicense {
    BaseLicense {
        license_id: Uuid::new_v4(),
        license_key: license_key.unwrap_or_else(|| Uuid::new_v4().to_string()),
        license_type,
        issued_on: Utc::now(),
        expiration_date: None,
        issuer: issuer.to_owned(),
        features,
    }
}

fn require_positive(duration: Duration, field: &'static str) -> Result<(), LicenseError> {
    if duration <= Duration::zero() {
        return Err(LicenseError::Validation {
            message: format!("{field} must be a positive duration").into(),
            context: Some("constructing license".into()),
        });
    }
    Ok(())
}

fn require_nonzero_seats(count: u32, field: &'static str) -> Result<(), LicenseError> {
    if count == 0 {
        return Err(LicenseError::Validation {
            message: format!("{field} must be greater than zero").into(),
            context: Some("constructing license".into()),
        });
    }
    Ok(())
}

/// A named-user license with no expiration and no hardware/seat binding.
#[must_use]
pub fn new_standard(issuer: &str, user_name: &str, features: FeatureMap, license_key: Option<String>) -> License {
    License::Standard(Standard {
        base: base(issuer, LicenseType::Standard, features, license_key),
        user_name: user_name.to_owned(),
    })
}

/// A time-boxed evaluation license. `expiration_date` is pinned to `issued_on +
/// trial_period`.
///
/// # Errors
/// Returns [`LicenseError::Validation`] if `trial_period` is not positive.
pub fn new_trial(issuer: &str, trial_period: Duration, features: FeatureMap) -> Result<License, LicenseError> {
    require_positive(trial_period, "trial_period")?;
    let mut b = base(issuer, LicenseType::Trial, features, None);
    b.expiration_date = Some(b.issued_on + trial_period);
    Ok(License::Trial(Trial { base: b, trial_period }))
}

/// A license bound to a single machine fingerprint, with no expiration.
#[must_use]
pub fn new_node_locked(issuer: &str, hardware_id: &str, features: FeatureMap) -> License {
    License::NodeLocked(NodeLocked {
        base: base(issuer, LicenseType::NodeLocked, features, None),
        hardware_id: hardware_id.to_owned(),
    })
}

/// A recurring license. `expiration_date` is pinned to
/// `subscription_start_date + subscription_duration`.
///
/// # Errors
/// Returns [`LicenseError::Validation`] if `subscription_duration` is not positive.
pub fn new_subscription(
    issuer: &str,
    user_name: &str,
    subscription_start_date: DateTime<Utc>,
    subscription_duration: Duration,
    features: FeatureMap,
) -> Result<License, LicenseError> {
    require_positive(subscription_duration, "subscription_duration")?;
    let mut b = base(issuer, LicenseType::Subscription, features, None);
    b.expiration_date = Some(subscription_start_date + subscription_duration);
    Ok(License::Subscription(Subscription {
        base: b,
        user_name: user_name.to_owned(),
        subscription_start_date,
        subscription_duration,
    }))
}

/// A license with a floating seat pool of fixed maximum size, with no expiration.
///
/// # Errors
/// Returns [`LicenseError::Validation`] if `max_active_users_count` is zero.
pub fn new_floating(
    issuer: &str,
    user_name: &str,
    max_active_users_count: u32,
    features: FeatureMap,
) -> Result<License, LicenseError> {
    require_nonzero_seats(max_active_users_count, "max_active_users_count")?;
    Ok(License::Floating(Floating {
        base: base(issuer, LicenseType::Floating, features, None),
        user_name: user_name.to_owned(),
        max_active_users_count,
    }))
}

/// A license with a concurrently-enforced seat pool of fixed maximum size, with no
/// expiration. `base.type` is always `Concurrent`, independent of how the seat pool
/// ends up being enforced downstream.
///
/// # Errors
/// Returns [`LicenseError::Validation`] if `max_active_users_count` is zero.
pub fn new_concurrent(
    issuer: &str,
    user_name: &str,
    max_active_users_count: u32,
    features: FeatureMap,
) -> Result<License, LicenseError> {
    require_nonzero_seats(max_active_users_count, "max_active_users_count")?;
    Ok(License::Concurrent(Concurrent {
        base: base(issuer, LicenseType::Concurrent, features, None),
        user_name: user_name.to_owned(),
        max_active_users_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_expiration_follows_period() {
        let license = new_trial("Acme", Duration::days(14), FeatureMap::new()).unwrap();
        let base = license.base();
        assert_eq!(base.expiration_date, Some(base.issued_on + Duration::days(14)));
    }

    #[test]
    fn trial_rejects_non_positive_period() {
        assert!(new_trial("Acme", Duration::zero(), FeatureMap::new()).is_err());
        assert!(new_trial("Acme", Duration::days(-1), FeatureMap::new()).is_err());
    }

    #[test]
    fn subscription_expiration_follows_start_and_duration() {
        let start = Utc::now();
        let license =
            new_subscription("Acme", "Jane Doe", start, Duration::days(365), FeatureMap::new()).unwrap();
        assert_eq!(license.base().expiration_date, Some(start + Duration::days(365)));
    }

    #[test]
    fn seat_pools_reject_zero_capacity() {
        assert!(new_floating("Acme", "Jane Doe", 0, FeatureMap::new()).is_err());
        assert!(new_concurrent("Acme", "Jane Doe", 0, FeatureMap::new()).is_err());
    }

    #[test]
    fn concurrent_type_is_set_unconditionally() {
        let license = new_concurrent("Acme", "Jane Doe", 5, FeatureMap::new()).unwrap();
        assert_eq!(license.license_type(), LicenseType::Concurrent);
    }

    #[test]
    fn standard_and_node_locked_have_no_expiration() {
        assert!(new_standard("Acme", "Jane Doe", FeatureMap::new(), None).base().expiration_date.is_none());
        assert!(new_node_locked("Acme", "HWID-1", FeatureMap::new()).base().expiration_date.is_none());
    }
}
