//! Typed feature entries carried inside a license.
//!
//! A [`Feature`] is a small tagged union over the six value kinds a license can grant.
//! On the wire it is always `{ "type": ..., "data": <base64> }` rather than relying on
//! serde's native per-variant tagging: the `data` field is a uniform base64 byte buffer
//! whose layout depends on `type`. This keeps the encoding stable across future value
//! kinds and matches how the source system emits `Type`/`Data` pairs for every feature
//! entry.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// A feature-name → [`Feature`] map. Lookups are case-sensitive and exact-match.
pub type FeatureMap = BTreeMap<String, Feature>;

/// A single typed feature value.
#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Boolean(bool),
    Integer(i32),
    Float(f32),
    String(String),
    DateTime(DateTime<Utc>),
    ByteArray(Vec<u8>),
}

impl Feature {
    /// The discriminator string used on the wire and in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::Integer(_) => "Integer",
            Self::Float(_) => "Float",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
            Self::ByteArray(_) => "ByteArray",
        }
    }

    /// Whether this feature counts as "enabled", per the per-type default rule:
    /// `Boolean=true`, `Integer≠0`, `Float≠0`, `String` non-empty, `DateTime` not the
    /// Unix epoch, `ByteArray` non-empty.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Integer(i) => *i != 0,
            #[allow(clippy::float_cmp)]
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::DateTime(dt) => *dt != DateTime::<Utc>::UNIX_EPOCH,
            Self::ByteArray(b) => !b.is_empty(),
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::ByteArray(b) => Some(b),
            _ => None,
        }
    }

    /// Encodes the value's payload to raw bytes, per `type_name`'s layout.
    fn encode_data(&self) -> Vec<u8> {
        match self {
            Self::Boolean(b) => vec![u8::from(*b)],
            Self::Integer(i) => i.to_le_bytes().to_vec(),
            Self::Float(f) => f.to_le_bytes().to_vec(),
            Self::String(s) => s.as_bytes().to_vec(),
            Self::DateTime(dt) => dt.to_rfc3339().into_bytes(),
            Self::ByteArray(b) => b.clone(),
        }
    }

    /// Reconstructs a value from a discriminator and its raw payload bytes.
    fn decode_data(type_name: &str, data: &[u8]) -> Result<Self, String> {
        match type_name {
            "Boolean" => Ok(Self::Boolean(data.first().is_some_and(|b| *b != 0))),
            "Integer" => {
                let bytes: [u8; 4] =
                    data.try_into().map_err(|_| "Integer feature data must be 4 bytes".to_owned())?;
                Ok(Self::Integer(i32::from_le_bytes(bytes)))
            },
            "Float" => {
                let bytes: [u8; 4] =
                    data.try_into().map_err(|_| "Float feature data must be 4 bytes".to_owned())?;
                Ok(Self::Float(f32::from_le_bytes(bytes)))
            },
            "String" => String::from_utf8(data.to_vec())
                .map(Self::String)
                .map_err(|e| format!("String feature data is not valid UTF-8: {e}")),
            "DateTime" => {
                let s = std::str::from_utf8(data)
                    .map_err(|e| format!("DateTime feature data is not valid UTF-8: {e}"))?;
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| Self::DateTime(dt.with_timezone(&Utc)))
                    .map_err(|e| format!("DateTime feature data is not RFC 3339: {e}"))
            },
            "ByteArray" => Ok(Self::ByteArray(data.to_vec())),
            other => Err(format!("unknown feature type discriminator '{other}'")),
        }
    }
}

/// Wire shape: `{ "type": "...", "data": "<base64>" }`.
#[derive(Serialize, Deserialize)]
struct FeatureWire {
    #[serde(rename = "type")]
    type_name: String,
    data: String,
}

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = FeatureWire {
            type_name: self.type_name().to_owned(),
            data: BASE64.encode(self.encode_data()),
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Feature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = FeatureWire::deserialize(deserializer)?;
        let data = BASE64.decode(&wire.data).map_err(serde::de::Error::custom)?;
        Self::decode_data(&wire.type_name, &data).map_err(serde::de::Error::custom)
    }
}
