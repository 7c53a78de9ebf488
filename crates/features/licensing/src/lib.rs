//! # Licensing
//!
//! Tamper-resistant license codec (C1–C3) and license-type policy engine (C4–C5).
//!
//! * [`crypto`] — RSA-2048/PKCS#1v1.5-SHA256 signing and AES-256-CBC encryption (C1).
//! * [`codec`] — the four-field length-prefixed envelope built on top of `crypto` (C2).
//! * [`serializer`] — the pluggable JSON license (de)serializer (C3).
//! * [`model`] — smart constructors enforcing each variant's invariants.
//! * [`hardware`] — the hardware-fingerprint port used by `NodeLocked` checks (C4).
//! * [`rules`] — the per-license-type validation rule registry (C5).
//! * [`secrets`] — vendor-side RSA keypair generation and secrets-file storage.
//!
//! Signing, encryption key generation, and secrets-file I/O are gated behind the
//! `issuance` feature: production client and server binaries only ever hold a public
//! key, so they never link code that touches a private key.

pub mod codec;
pub mod crypto;
mod error;
pub mod hardware;
pub mod model;
pub mod rules;
#[cfg(feature = "issuance")]
pub mod secrets;
pub mod serializer;

pub use crate::error::LicenseError;
pub use crate::hardware::{HardwareIdentifier, MachineHardwareIdentifier};
pub use crate::rules::{RuleRegistry, RuleStatus, ValidationContext, ValidationRule};
pub use crate::serializer::{JsonLicenseSerializer, LicenseSerializer};
