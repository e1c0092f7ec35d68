//! Unified error types.

use std::net::AddrParseError;

use crate::method::Method;

/// Boxed error used for body read failures coming from arbitrary body types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by waypoint's fallible operations.
///
/// Application-level failures (a bad query string, a missing user) are
/// expressed as [`Response`](crate::Response) values, not as `Error`s. This
/// type surfaces infrastructure failures only.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("invalid route `{method} {pattern}`: {source}")]
    Route {
        method: Method,
        pattern: String,
        #[source]
        source: matchit::InsertError,
    },

    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),
}

/// Why a parser rejected its input.
///
/// The message is surfaced verbatim after `Invalid <source>: ` in the
/// `400` response a failing parser produces.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct DecodeError {
    reason: String,
}

impl DecodeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_urlencoded::de::Error> for DecodeError {
    fn from(e: serde_urlencoded::de::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_urlencoded::ser::Error> for DecodeError {
    fn from(e: serde_urlencoded::ser::Error) -> Self {
        Self::new(e.to_string())
    }
}
