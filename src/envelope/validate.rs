//! Submission validation
//!
//! Producers' submissions are checked here before they reach the hub. A
//! body is accepted when it parses as an [`Envelope`] and its type tag is in
//! the allow-list; the accepted bytes are handed on verbatim.

use bytes::Bytes;

use crate::error::ValidationError;

use super::message::Envelope;

/// Type tags accepted when no allow-list is configured
pub const DEFAULT_TYPES: &[&str] = &["octavebands", "frequencybins"];

/// Allow-list of envelope type tags
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: Vec<String>,
}

impl TypeRegistry {
    /// Create a registry from a list of type tags
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }

    /// Check a type tag against the allow-list
    pub fn is_valid_type(&self, kind: &str) -> bool {
        self.types.iter().any(|t| t == kind)
    }

    /// Configured type tags
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Validate a submitted body, returning it unchanged on success
    pub fn validate(&self, body: Bytes) -> Result<Bytes, ValidationError> {
        let envelope = Envelope::decode(&body)?;

        if !self.is_valid_type(&envelope.kind) {
            return Err(ValidationError::UnknownType(envelope.kind));
        }

        Ok(body)
    }

    /// Resolve a requested subscription type, falling back to `default`
    /// when it is missing or not recognized
    pub fn resolve_or<'a>(&self, requested: Option<&'a str>, default: &'a str) -> &'a str {
        match requested {
            Some(kind) if self.is_valid_type(kind) => kind,
            Some(kind) => {
                tracing::debug!(requested = kind, fallback = default, "Unknown type requested");
                default
            }
            None => default,
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_TYPES.iter().copied())
    }
}
