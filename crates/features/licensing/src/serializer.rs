//! # License Serializer Port (C3)
//!
//! A pluggable serializer over [`License`]. The default (and, per spec, only
//! required) implementation is JSON: it dispatches on the wire `type` discriminator
//! to the matching variant struct, each of which already flattens [`BaseLicense`] and
//! so carries that discriminator itself.

use crate::error::LicenseError;
use mhub_domain::{Concurrent, Floating, License, LicenseType, NodeLocked, Standard, Subscription, Trial};
use serde::Deserialize;

/// Converts between a [`License`] and its wire bytes.
///
/// Implemented as a trait (rather than a free function) so that vendors embedding
/// this crate can plug in an alternative wire format without touching the rest of
/// the licensing pipeline — the envelope codec (C2) only ever sees opaque payload
/// bytes.
pub trait LicenseSerializer: Send + Sync {
    /// Serializes `license` to its wire representation.
    ///
    /// # Errors
    /// Returns [`LicenseError::Serialize`] if encoding fails.
    fn serialize(&self, license: &License) -> Result<Vec<u8>, LicenseError>;

    /// Parses wire `bytes` back into a [`License`], dispatching on the `type` field.
    ///
    /// # Errors
    /// Returns [`LicenseError::InvalidLicenseFormat`] if the discriminator is missing
    /// or unrecognized, or [`LicenseError::Serialize`] if the matched variant fails
    /// to parse.
    fn deserialize(&self, bytes: &[u8]) -> Result<License, LicenseError>;
}

/// Probes just the `type` discriminator without committing to a variant shape.
#[derive(Deserialize)]
struct TypeProbe {
    #[serde(rename = "type")]
    license_type: LicenseType,
}

fn wrap_serialize_error(source: serde_json::Error, context: &'static str) -> LicenseError {
    LicenseError::Serialize { source, context: Some(context.into()) }
}

/// The default serializer: JSON with a `type` discriminator.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLicenseSerializer;

impl LicenseSerializer for JsonLicenseSerializer {
    fn serialize(&self, license: &License) -> Result<Vec<u8>, LicenseError> {
        let bytes = match license {
            License::Standard(l) => serde_json::to_vec(l),
            License::Trial(l) => serde_json::to_vec(l),
            License::NodeLocked(l) => serde_json::to_vec(l),
            License::Subscription(l) => serde_json::to_vec(l),
            License::Floating(l) => serde_json::to_vec(l),
            License::Concurrent(l) => serde_json::to_vec(l),
        };
        bytes.map_err(|e| wrap_serialize_error(e, "serializing license"))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<License, LicenseError> {
        let probe: TypeProbe = serde_json::from_slice(bytes).map_err(|e| {
            LicenseError::InvalidLicenseFormat {
                message: format!("could not read license type discriminator: {e}").into(),
                context: Some("parsing license payload".into()),
            }
        })?;

        match probe.license_type {
            LicenseType::Standard => serde_json::from_slice::<Standard>(bytes)
                .map(License::Standard)
                .map_err(|e| wrap_serialize_error(e, "parsing Standard license")),
            LicenseType::Trial => serde_json::from_slice::<Trial>(bytes)
                .map(License::Trial)
                .map_err(|e| wrap_serialize_error(e, "parsing Trial license")),
            LicenseType::NodeLocked => serde_json::from_slice::<NodeLocked>(bytes)
                .map(License::NodeLocked)
                .map_err(|e| wrap_serialize_error(e, "parsing NodeLocked license")),
            LicenseType::Subscription => serde_json::from_slice::<Subscription>(bytes)
                .map(License::Subscription)
                .map_err(|e| wrap_serialize_error(e, "parsing Subscription license")),
            LicenseType::Floating => serde_json::from_slice::<Floating>(bytes)
                .map(License::Floating)
                .map_err(|e| wrap_serialize_error(e, "parsing Floating license")),
            LicenseType::Concurrent => serde_json::from_slice::<Concurrent>(bytes)
                .map(License::Concurrent)
                .map_err(|e| wrap_serialize_error(e, "parsing Concurrent license")),
        }
    }
}
