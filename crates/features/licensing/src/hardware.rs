//! # Hardware Identifier Port (C4)
//!
//! A stable fingerprint for the current machine, used to bind and check
//! [`mhub_domain::NodeLocked`] licenses. Modeled as a trait so the fingerprint
//! algorithm is a static plugin point rather than baked into the validation rules
//! that consume it (spec §9's "static plugin points" design note).

use crate::error::LicenseError;
use machineid_rs::{Encryption, HWIDComponent, IdBuilder};

/// Produces a hardware identifier for the machine it runs on.
pub trait HardwareIdentifier: Send + Sync {
    /// Computes the current machine's hardware id.
    ///
    /// # Errors
    /// Returns [`LicenseError::Internal`] if the underlying platform APIs fail.
    fn current_hardware_id(&self) -> Result<String, LicenseError>;
}

/// Default [`HardwareIdentifier`]: a SHA-256 digest over the machine's CPU, system,
/// and MAC-address identifiers plus its hostname.
#[derive(Debug, Default, Clone, Copy)]
pub struct MachineHardwareIdentifier;

impl HardwareIdentifier for MachineHardwareIdentifier {
    fn current_hardware_id(&self) -> Result<String, LicenseError> {
        let mut builder = IdBuilder::new(Encryption::SHA256);
        builder
            .add_component(HWIDComponent::SystemID)
            .add_component(HWIDComponent::CPUID)
            .add_component(HWIDComponent::MacAddress);

        let machine_id = builder.build("mhub-licensing").map_err(|e| LicenseError::Internal {
            message: e.to_string().into(),
            context: Some("collecting machine hardware id".into()),
        })?;

        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown-host".to_owned());

        Ok(format!("{machine_id}:{host}"))
    }
}
