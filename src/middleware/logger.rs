//! Access logging.

use std::sync::Arc;

use tracing::{error, info};

use crate::context::Scope;
use crate::error::{FatalError, HandlerError};
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, HandlerResult};
use crate::middleware::Middleware;
use crate::request::Request;

/// Logs one line when a request enters the chain and one when it leaves.
///
/// The exit line carries the status the response encoder recorded on the
/// request context and the time since the request was received. A request
/// that reaches this layer without a context is a wiring fault and fails
/// with [`FatalError::ContextMissing`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

pub fn logger() -> Logger {
    Logger
}

impl Middleware for Logger {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(Logged { next })
    }
}

struct Logged {
    next: BoxedHandler,
}

impl ErasedHandler for Logged {
    fn call(&self, scope: Scope, req: Request) -> BoxFuture<HandlerResult> {
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            let values = scope.values().map_err(FatalError::from)?;
            let trace_id = values.trace_id().to_owned();
            let method = req.method().clone();
            let path = req.path().to_owned();
            let remote = req.remote_addr().map(|a| a.to_string()).unwrap_or_default();

            info!(%trace_id, %method, %path, %remote, "request started");

            let res = next.call(scope.clone(), req).await;

            let values = scope.values().map_err(FatalError::from)?;
            let status = values.status_code().unwrap_or_default();
            let since = values.elapsed();
            match &res {
                Err(HandlerError::Fatal(e)) => {
                    error!(
                        %trace_id, %method, %path, %remote, status, ?since, error = %e,
                        "request failed"
                    );
                }
                _ => {
                    info!(%trace_id, %method, %path, %remote, status, ?since, "request completed");
                }
            }
            res
        })
    }
}
