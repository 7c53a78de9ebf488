//! # Activation
//!
//! Server-side half of the licensing system: the abstract persistence port (C9,
//! [`persistence`]) and the activation engine built on top of it (C8, [`engine`]) —
//! seat accounting for `Floating`/`Concurrent` licenses, revocation, `Subscription`
//! renewal, and the background sweep that reclaims seats from clients that stopped
//! heartbeating.

pub mod engine;
pub mod error;
pub mod persistence;

pub use crate::engine::{ActivationEngine, ActivationEngineBuilder};
pub use crate::error::ActivationError;
pub use crate::persistence::{ActivationOutcome, ActivationRecord, InMemoryPersistence, LicenseStatus, PersistencePort, StoredLicense};
