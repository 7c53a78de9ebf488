//! # Validation Rule Registry (C5)
//!
//! Per-[`LicenseType`] checks applied after the envelope has already been decoded and
//! verified (C1/C2) and the payload parsed (C3): expiration, hardware binding, and
//! identity matching. Seat-pool accounting for `Floating`/`Concurrent` licenses is the
//! activation engine's job (C8), not a static rule here — it needs live server state
//! this registry doesn't have.

use crate::error::LicenseError;
use chrono::{DateTime, Utc};
use mhub_domain::{License, LicenseType};
use std::borrow::Cow;
use std::collections::HashMap;

/// Parameters a caller supplies to check a license against: whatever of the current
/// machine, current user, and wall clock the check needs. Fields the checked
/// license's variant doesn't need are simply ignored.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub now: Option<DateTime<Utc>>,
    pub hardware_id: Option<String>,
    pub user_name: Option<String>,
    pub license_key: Option<String>,
    pub max_active_users_count: Option<u32>,
}

impl ValidationContext {
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

/// The outcome of a single rule check.
#[derive(Debug, Clone)]
pub enum RuleStatus {
    Valid,
    Invalid(Cow<'static, str>),
}

impl RuleStatus {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// A single named check against a license and the caller-supplied context.
pub trait ValidationRule: Send + Sync {
    /// A short, stable name for diagnostics.
    fn name(&self) -> &'static str;

    /// Runs the check.
    fn check(&self, license: &License, ctx: &ValidationContext) -> RuleStatus;
}

/// Rejects a license whose `expiration_date` has passed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpirationRule;

impl ValidationRule for ExpirationRule {
    fn name(&self) -> &'static str {
        "expiration"
    }

    fn check(&self, license: &License, ctx: &ValidationContext) -> RuleStatus {
        match license.base().expiration_date {
            Some(expiry) if ctx.now() >= expiry => RuleStatus::Invalid("license has expired".into()),
            _ => RuleStatus::Valid,
        }
    }
}

/// Rejects a `NodeLocked` license whose `hardware_id` does not match the caller's.
#[derive(Debug, Default, Clone, Copy)]
pub struct HardwareMatchRule;

impl ValidationRule for HardwareMatchRule {
    fn name(&self) -> &'static str {
        "hardware_match"
    }

    fn check(&self, license: &License, ctx: &ValidationContext) -> RuleStatus {
        let License::NodeLocked(node_locked) = license else { return RuleStatus::Valid };
        match &ctx.hardware_id {
            Some(current) if *current == node_locked.hardware_id => RuleStatus::Valid,
            Some(_) => RuleStatus::Invalid("hardware id does not match this license".into()),
            None => RuleStatus::Invalid("no hardware id supplied to check against a node-locked license".into()),
        }
    }
}

/// Rejects a license whose bound user name does not match the caller's, for variants
/// that carry a `user_name` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct UserNameMatchRule;

impl ValidationRule for UserNameMatchRule {
    fn name(&self) -> &'static str {
        "user_name_match"
    }

    fn check(&self, license: &License, ctx: &ValidationContext) -> RuleStatus {
        let bound_user_name = match license {
            License::Standard(l) => Some(l.user_name.as_str()),
            License::Subscription(l) => Some(l.user_name.as_str()),
            License::Floating(l) => Some(l.user_name.as_str()),
            License::Concurrent(l) => Some(l.user_name.as_str()),
            License::Trial(_) | License::NodeLocked(_) => None,
        };
        match (bound_user_name, &ctx.user_name) {
            (Some(bound), Some(supplied)) if bound == supplied => RuleStatus::Valid,
            (Some(_), Some(_)) => {
                RuleStatus::Invalid("user name does not match this license".into())
            },
            (None, _) | (_, None) => RuleStatus::Valid,
        }
    }
}

/// Rejects a license whose `license_key` does not match the caller's, when supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct LicenseKeyMatchRule;

impl ValidationRule for LicenseKeyMatchRule {
    fn name(&self) -> &'static str {
        "license_key_match"
    }

    fn check(&self, license: &License, ctx: &ValidationContext) -> RuleStatus {
        match &ctx.license_key {
            Some(supplied) if *supplied != license.base().license_key => {
                RuleStatus::Invalid("license key does not match this license".into())
            },
            _ => RuleStatus::Valid,
        }
    }
}

/// Rejects a `Floating`/`Concurrent` license whose seat-pool size does not match the
/// caller's, when supplied. The caller-supplied count is the identity-binding half of
/// the pooled-seat check; the live seat count itself is the activation engine's job.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeatCountMatchRule;

impl ValidationRule for SeatCountMatchRule {
    fn name(&self) -> &'static str {
        "seat_count_match"
    }

    fn check(&self, license: &License, ctx: &ValidationContext) -> RuleStatus {
        let bound_count = match license {
            License::Floating(l) => Some(l.max_active_users_count),
            License::Concurrent(l) => Some(l.max_active_users_count),
            _ => None,
        };
        match (bound_count, ctx.max_active_users_count) {
            (Some(bound), Some(supplied)) if bound == supplied => RuleStatus::Valid,
            (Some(_), Some(_)) => {
                RuleStatus::Invalid("max active users count does not match this license".into())
            },
            (None, _) | (_, None) => RuleStatus::Valid,
        }
    }
}

fn status_to_error(name: &'static str, status: RuleStatus) -> Result<(), LicenseError> {
    match status {
        RuleStatus::Valid => Ok(()),
        RuleStatus::Invalid(reason) => Err(match name {
            "expiration" => LicenseError::ExpiredLicense { message: reason, context: None },
            "hardware_match" => LicenseError::HardwareMismatch { message: reason, context: None },
            "user_name_match" | "license_key_match" | "seat_count_match" => {
                LicenseError::UserMismatch { message: reason, context: None }
            },
            _ => LicenseError::Validation { message: reason, context: Some(name.into()) },
        }),
    }
}

/// Per-[`LicenseType`] collection of [`ValidationRule`]s, seeded with the built-in
/// rule set and open to additional rules.
pub struct RuleRegistry {
    rules: HashMap<LicenseType, Vec<Box<dyn ValidationRule>>>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field(
                "rule_counts",
                &self.rules.iter().map(|(t, r)| (*t, r.len())).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtin_rules()
    }
}

impl RuleRegistry {
    /// An empty registry with no rules for any license type.
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: HashMap::new() }
    }

    /// The built-in rule set: expiration checks where a variant carries an
    /// expiration date, hardware binding for `NodeLocked`, and identity matching for
    /// every variant that carries a `user_name` or is checked by license key.
    #[must_use]
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::empty();

        registry.register(LicenseType::Standard, Box::new(ExpirationRule));
        registry.register(LicenseType::Standard, Box::new(UserNameMatchRule));
        registry.register(LicenseType::Standard, Box::new(LicenseKeyMatchRule));

        registry.register(LicenseType::Trial, Box::new(ExpirationRule));
        registry.register(LicenseType::Trial, Box::new(LicenseKeyMatchRule));

        registry.register(LicenseType::NodeLocked, Box::new(ExpirationRule));
        registry.register(LicenseType::NodeLocked, Box::new(HardwareMatchRule));
        registry.register(LicenseType::NodeLocked, Box::new(LicenseKeyMatchRule));

        registry.register(LicenseType::Subscription, Box::new(ExpirationRule));
        registry.register(LicenseType::Subscription, Box::new(UserNameMatchRule));
        registry.register(LicenseType::Subscription, Box::new(LicenseKeyMatchRule));

        registry.register(LicenseType::Floating, Box::new(ExpirationRule));
        registry.register(LicenseType::Floating, Box::new(UserNameMatchRule));
        registry.register(LicenseType::Floating, Box::new(SeatCountMatchRule));

        registry.register(LicenseType::Concurrent, Box::new(ExpirationRule));
        registry.register(LicenseType::Concurrent, Box::new(UserNameMatchRule));
        registry.register(LicenseType::Concurrent, Box::new(SeatCountMatchRule));

        registry
    }

    /// Adds a rule to the set checked for `license_type`.
    pub fn register(&mut self, license_type: LicenseType, rule: Box<dyn ValidationRule>) {
        self.rules.entry(license_type).or_default().push(rule);
    }

    /// Runs every rule registered for `license`'s type, stopping at the first
    /// failure.
    ///
    /// # Errors
    /// Returns the [`LicenseError`] variant matching the first failing rule.
    pub fn validate(&self, license: &License, ctx: &ValidationContext) -> Result<(), LicenseError> {
        let Some(rules) = self.rules.get(&license.license_type()) else { return Ok(()) };
        for rule in rules {
            status_to_error(rule.name(), rule.check(license, ctx))?;
        }
        Ok(())
    }
}
