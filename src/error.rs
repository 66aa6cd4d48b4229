//! Error types.
//!
//! Two families live here and they never mix:
//!
//! - [`Error`] and [`RouteError`] are infrastructure failures: binding a port,
//!   a broken listener, a shutdown that overran its deadline, a malformed
//!   route template at startup.
//! - [`HandlerError`] is what a handler (or middleware) hands back to the
//!   dispatcher. It is a sum type on purpose: a [`RequestError`] is an
//!   expected client mistake and becomes a 4xx JSON body; a [`FatalError`] is
//!   never shown to the client and starts a graceful process shutdown.

use std::collections::BTreeMap;
use std::time::Duration;

use http::StatusCode;

use crate::context::ContextMissing;

/// Infrastructure failures surfaced by [`Server`](crate::Server).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The listener stopped accepting connections.
    #[error("listener: {0}")]
    Transport(#[source] std::io::Error),

    /// In-flight connections were still running when the deadline expired.
    #[error("could not stop server gracefully within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Route registration failures. Raised at startup only.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("invalid route `{path}`: {reason}")]
    Malformed { path: String, reason: String },

    #[error("route `{method} {path}` conflicts with an existing route")]
    Conflict { method: http::Method, path: String },
}

/// An expected, client-facing failure.
///
/// Rendered as `{"error": "...", "fields": {...}}` with [`status`](Self::status).
#[derive(Debug, Clone)]
pub struct RequestError {
    status: StatusCode,
    message: String,
    fields: BTreeMap<String, String>,
}

impl RequestError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), fields: BTreeMap::new() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Attach a per-field validation message.
    pub fn with_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.fields.insert(field.into(), message.into());
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }
    pub fn fields(&self) -> &BTreeMap<String, String> { &self.fields }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for RequestError {}

/// A failure nobody planned for. Always triggers shutdown.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    /// The request scope carries no [`RequestContext`](crate::RequestContext):
    /// the dispatcher was bypassed or wired incorrectly.
    #[error(transparent)]
    ContextMissing(#[from] ContextMissing),

    #[error("encoding response: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl FatalError {
    /// Wrap any error as an internal fault.
    pub fn internal(err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self::Internal(err.into())
    }
}

/// The error half of a handler's result.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("client error: {0}")]
    Client(RequestError),

    #[error("fatal: {0}")]
    Fatal(#[from] FatalError),
}

impl HandlerError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl From<RequestError> for HandlerError {
    fn from(e: RequestError) -> Self {
        Self::Client(e)
    }
}

impl From<ContextMissing> for HandlerError {
    fn from(e: ContextMissing) -> Self {
        Self::Fatal(FatalError::ContextMissing(e))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Fatal(FatalError::Serialization(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_missing_is_fatal() {
        let err: HandlerError = ContextMissing.into();
        assert!(err.is_fatal());
    }

    #[test]
    fn request_error_is_not_fatal() {
        let err: HandlerError = RequestError::bad_request("nope").into();
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "client error: 400 nope");
    }
}
