//! Request scope and per-request values.
//!
//! Every request runs inside a [`Scope`]. The dispatcher derives a child
//! scope carrying a fresh [`RequestContext`] before it calls the middleware
//! chain, and that scope is passed by value down to the terminal handler.
//! There is no ambient lookup: code that needs the trace id or start time
//! asks the scope it was handed.
//!
//! A scope without a context is not a normal condition. [`Scope::values`]
//! reports it as [`ContextMissing`], which converts into a fatal handler
//! error.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// The scope was never given a [`RequestContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("missing web value from context")]
pub struct ContextMissing;

/// Mutable per-request record.
#[derive(Debug)]
pub struct RequestContext {
    trace_id: String,
    now: DateTime<Utc>,
    started: Instant,
    // 0 means unset. Written only by the chain serving this request.
    status_code: AtomicU16,
}

impl RequestContext {
    fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            now: Utc::now(),
            started: Instant::now(),
            status_code: AtomicU16::new(0),
        }
    }

    pub fn trace_id(&self) -> &str { &self.trace_id }

    /// Wall-clock time the request was received.
    pub fn now(&self) -> DateTime<Utc> { self.now }

    pub fn elapsed(&self) -> Duration { self.started.elapsed() }

    /// The status recorded by the response encoder, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self.status_code.load(Ordering::Relaxed) {
            0 => None,
            code => Some(code),
        }
    }
}

/// A cancellable request scope, optionally carrying a [`RequestContext`].
#[derive(Debug, Clone)]
pub struct Scope {
    values: Option<Arc<RequestContext>>,
    cancel: CancellationToken,
}

impl Scope {
    /// A scope with no values, cancelled through `cancel`.
    pub fn new(cancel: CancellationToken) -> Self {
        Self { values: None, cancel }
    }

    /// A scope with no values that is never cancelled.
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    pub fn values(&self) -> Result<&RequestContext, ContextMissing> {
        self.values.as_deref().ok_or(ContextMissing)
    }

    pub fn set_status_code(&self, code: u16) -> Result<(), ContextMissing> {
        let values = self.values()?;
        values.status_code.store(code, Ordering::Relaxed);
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the client went away or the server started draining.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// Derive a child of `parent` carrying a new [`RequestContext`].
///
/// The child shares the parent's cancellation; any values on the parent are
/// replaced.
pub fn request_context(parent: &Scope) -> (Scope, Arc<RequestContext>) {
    let values = Arc::new(RequestContext::new());
    let scope = Scope {
        values: Some(Arc::clone(&values)),
        cancel: parent.cancel.clone(),
    };
    (scope, values)
}
