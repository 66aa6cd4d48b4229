//! The dispatcher.
//!
//! [`App`] owns the route table, the global middleware and a [`Shutdown`]
//! handle. Each request moves through
//! `received → matched → context attached → chain executing` and ends either
//! completed (a response was produced) or faulted, in which case the
//! shutdown notice has been sent and the client gets a bare `500`.

use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::{debug, error};

use crate::context::{Scope, request_context};
use crate::error::{HandlerError, RequestError, RouteError};
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, HandlerResult};
use crate::middleware::{BoxedMiddleware, wrap_middleware};
use crate::request::Request;
use crate::response::{Response, error_response, method_not_allowed};
use crate::router::{Resolved, Router};
use crate::server::Service;
use crate::shutdown::{Shutdown, ShutdownReason};

/// Entry point for the API listener.
pub struct App {
    router: Router,
    mw: Vec<BoxedMiddleware>,
    shutdown: Shutdown,
}

impl App {
    /// `mw` is the global chain, applied outside every route's own chain.
    pub fn new(shutdown: Shutdown, mw: Vec<BoxedMiddleware>) -> Self {
        Self { router: Router::new(), mw, shutdown }
    }

    /// Register `handler` for `method` at `/{group}{path}` (or `path` alone
    /// when `group` is empty), wrapped first in `mw` and then in the global
    /// middleware.
    ///
    /// Outcomes are settled twice: once around `handler`, so route middleware
    /// observes the final status, and once around the route chain, so global
    /// middleware does too even when a route middleware failed. Client errors
    /// become JSON error responses; fatal errors record `500` and pass
    /// through untouched.
    pub fn handle(
        &mut self,
        method: Method,
        group: &str,
        path: &str,
        handler: impl Handler,
        mw: &[BoxedMiddleware],
    ) -> Result<(), RouteError> {
        let handler = Settle::wrap(handler.into_boxed_handler());
        let handler = Settle::wrap(wrap_middleware(mw, handler));
        let handler = wrap_middleware(&self.mw, handler);

        let final_path = if group.is_empty() {
            path.to_owned()
        } else {
            format!("/{group}{path}")
        };

        debug!(%method, path = %final_path, "route registered");
        self.router.insert(method, &final_path, handler)
    }

    /// Ask the process owner to begin a graceful stop.
    pub fn signal_shutdown(&self) -> bool {
        self.shutdown.signal(ShutdownReason::Fault { trace_id: None })
    }

    /// Route and run one request.
    pub async fn serve_request(&self, scope: Scope, mut req: Request) -> Response {
        let (handler, params) = match self.router.resolve(req.method(), req.path()) {
            Resolved::Found { handler, params } => (handler, params),
            Resolved::MethodNotAllowed { allowed } => {
                return method_not_allowed(&scope, &allowed);
            }
            Resolved::NotFound => {
                return error_response(&scope, &RequestError::not_found("route not found"));
            }
        };
        req.set_params(params);

        let (scope, values) = request_context(&scope);

        match handler.call(scope.clone(), req).await {
            Ok(res) => res,
            Err(HandlerError::Client(e)) => error_response(&scope, &e),
            Err(HandlerError::Fatal(e)) => {
                let _ = scope.set_status_code(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
                let trace_id = values.trace_id().to_owned();
                error!(%trace_id, error = %e, "unrecoverable handler error, requesting shutdown");
                self.shutdown.signal(ShutdownReason::Fault { trace_id: Some(trace_id) });
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl Service for App {
    fn serve(&self, scope: Scope, req: Request) -> impl Future<Output = Response> + Send {
        self.serve_request(scope, req)
    }
}

/// Turns a chain's outcome into what the layers outside it observe.
///
/// Client errors become responses here. A fatal error stays an error, but
/// its `500` is recorded first so the access log reports what the client
/// will get.
struct Settle {
    next: BoxedHandler,
}

impl Settle {
    fn wrap(next: BoxedHandler) -> BoxedHandler {
        Arc::new(Self { next })
    }
}

impl ErasedHandler for Settle {
    fn call(&self, scope: Scope, req: Request) -> BoxFuture<HandlerResult> {
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            match next.call(scope.clone(), req).await {
                Err(HandlerError::Client(e)) => Ok(error_response(&scope, &e)),
                Err(HandlerError::Fatal(e)) => {
                    let _ = scope.set_status_code(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
                    Err(HandlerError::Fatal(e))
                }
                ok => ok,
            }
        })
    }
}
