//! Telemetry envelope data model
//!
//! An [`Envelope`] is what producers publish. The hub only ever handles its
//! raw bytes; subscribers decode the [`EnvelopeHeader`] view on demand to
//! evaluate their filter, then forward the original bytes untouched.

pub mod message;
pub mod validate;

pub use message::{Envelope, EnvelopeHeader};
pub use validate::{TypeRegistry, DEFAULT_TYPES};
