//! Per-connection subscription filter
//!
//! Written by the connection's control reader, read by its forwarding
//! writer. The three fields are always replaced together under one lock,
//! so a reader can never observe a half-applied update.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::envelope::message::null_as_default;
use crate::envelope::EnvelopeHeader;

/// Selection criteria for forwarded envelopes
///
/// A control frame must name a type; a missing sensor or channel means 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sensor: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel: i64,
}

impl Filter {
    pub fn new(kind: impl Into<String>, sensor: i64, channel: i64) -> Self {
        Self {
            kind: kind.into(),
            sensor,
            channel,
        }
    }

    /// Parse a control frame `{"type": .., "sensor": .., "channel": ..}`
    pub fn decode(frame: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(frame)
    }

    /// All three fields must be equal
    pub fn matches(&self, header: &EnvelopeHeader) -> bool {
        self.kind == header.kind && self.sensor == header.sensor && self.channel == header.channel
    }
}

impl From<EnvelopeHeader> for Filter {
    fn from(header: EnvelopeHeader) -> Self {
        Self {
            kind: header.kind,
            sensor: header.sensor,
            channel: header.channel,
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.sensor, self.channel)
    }
}

/// A [`Filter`] shared between the two halves of one connection
///
/// The lock is only ever held for a clone, a compare or a swap.
#[derive(Debug, Clone)]
pub struct SharedFilter {
    inner: Arc<Mutex<Filter>>,
}

impl SharedFilter {
    pub fn new(filter: Filter) -> Self {
        Self {
            inner: Arc::new(Mutex::new(filter)),
        }
    }

    /// Replace the whole filter, returning the previous one
    pub fn replace(&self, filter: Filter) -> Filter {
        std::mem::replace(&mut *self.inner.lock(), filter)
    }

    /// Copy of the current filter
    pub fn snapshot(&self) -> Filter {
        self.inner.lock().clone()
    }

    /// Evaluate `header` against the current filter
    pub fn matches(&self, header: &EnvelopeHeader) -> bool {
        self.inner.lock().matches(header)
    }
}
