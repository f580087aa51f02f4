//! Envelope and header types

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

/// Missing and `null` fields both take the type's zero value
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One published unit of telemetry
///
/// Only the type tag is required; other absent fields decode as zero values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Producer name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Type tag (e.g. "octavebands")
    #[serde(rename = "type")]
    pub kind: String,
    /// Sensor id
    #[serde(default, deserialize_with = "null_as_default")]
    pub sensor: i64,
    /// Channel id
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel: i64,
    /// Numeric payload
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<f32>,
}

impl Envelope {
    /// Create a new envelope
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        sensor: i64,
        channel: i64,
        values: Vec<f32>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            sensor,
            channel,
            values,
        }
    }

    /// Parse a full envelope from raw bytes
    pub fn decode(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }

    /// Serialize to the wire representation
    pub fn encode(&self) -> serde_json::Result<Bytes> {
        serde_json::to_vec(self).map(Bytes::from)
    }

    /// The routing view of this envelope
    pub fn header(&self) -> EnvelopeHeader {
        EnvelopeHeader {
            kind: self.kind.clone(),
            sensor: self.sensor,
            channel: self.channel,
        }
    }
}

/// The type/sensor/channel view of an envelope
///
/// Decoding only these fields skips the (potentially large) value array's
/// allocation. The same shape is used for inbound filter-update frames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvelopeHeader {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sensor: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel: i64,
}

impl EnvelopeHeader {
    pub fn new(kind: impl Into<String>, sensor: i64, channel: i64) -> Self {
        Self {
            kind: kind.into(),
            sensor,
            channel,
        }
    }

    /// Decode the header fields from raw envelope bytes
    pub fn decode(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }
}

impl std::fmt::Display for EnvelopeHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.sensor, self.channel)
    }
}
