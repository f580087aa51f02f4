//! Error types
//!
//! Connection-local faults ([`TransportError`]) and rejected submissions
//! ([`ValidationError`]) never cross into the hub; only startup faults
//! surface as a process-level [`Error`].

use std::fmt;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error (bind, accept, serve)
    Io(std::io::Error),
    /// Invalid configuration
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Fault on a subscriber's duplex transport
#[derive(Debug)]
pub enum TransportError {
    /// Peer went away or the transport was closed underneath us
    Closed,
    /// Read or write failed
    Io(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Closed => write!(f, "Transport closed"),
            TransportError::Io(msg) => write!(f, "Transport I/O error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Reason a published submission was rejected before reaching the hub
#[derive(Debug)]
pub enum ValidationError {
    /// Body is not a well-formed envelope
    Malformed(serde_json::Error),
    /// Envelope type tag is not in the allow-list
    UnknownType(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Malformed(e) => write!(f, "Malformed envelope: {}", e),
            ValidationError::UnknownType(t) => write!(f, "Unknown type: {}", t),
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ValidationError::Malformed(e) => Some(e),
            ValidationError::UnknownType(_) => None,
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        ValidationError::Malformed(e)
    }
}
