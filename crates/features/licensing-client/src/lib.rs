//! # Licensing Client
//!
//! Client-side license lifecycle: loading and validating a license envelope (C6,
//! [`manager`]) and reading the features it grants (C7, [`features`]). The
//! [`transport`] module is the seam between this crate and a server-side activation
//! engine (C8) — see [`transport::ActivationTransport`].

pub mod error;
pub mod features;
pub mod manager;
pub mod transport;

pub use crate::error::{FeatureError, ManagerError};
pub use crate::features::FeatureManager;
pub use crate::manager::{LoadOutcome, LicenseManager, LicenseManagerBuilder};
pub use crate::transport::ActivationTransport;
#[cfg(feature = "online")]
pub use crate::transport::HttpTransport;
pub use crate::transport::DirectTransport;
