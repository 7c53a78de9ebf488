//! # Domain Models
//!
//! Pure domain types for the licensing system: the typed [`Feature`] union, the
//! [`LicenseType`] discriminator, and the six license-variant payload shapes.
//! Keep this crate lean: no I/O, no cryptography, no persistence — just data,
//! its wire encoding, and the handful of pure predicates (`Feature::is_enabled`)
//! that follow directly from the data.

pub mod feature;
pub mod license;

pub use feature::{Feature, FeatureMap};
pub use license::{
    BaseLicense, Concurrent, Floating, License, LicenseId, LicenseType, NodeLocked, Standard,
    Subscription, Trial,
};
