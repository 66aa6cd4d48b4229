//! Debug / ops listener.
//!
//! A second listener, separate from the API, for probes and operator
//! tooling. Handlers mounted here run bare: no middleware, no request
//! context, and an error never triggers a shutdown.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/debug/liveness` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/debug/readiness` | Can it serve traffic? Failure → out of the pool. |

use http::{Method, StatusCode};
use serde::Serialize;
use tracing::error;

use crate::context::Scope;
use crate::error::{FatalError, HandlerError, RequestError, RouteError};
use crate::handler::{Handler, HandlerResult};
use crate::request::Request;
use crate::response::{Response, error_response, method_not_allowed};
use crate::router::{Resolved, Router};
use crate::server::Service;

/// Route table for raw debug handlers.
#[derive(Default)]
pub struct DebugMux {
    router: Router,
}

impl DebugMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mux with the liveness and readiness probes already mounted.
    pub fn standard(build: &str) -> Result<Self, RouteError> {
        let mut mux = Self::new();
        let build = build.to_owned();
        mux.handle(Method::GET, "/debug/liveness", move |scope: Scope, req: Request| {
            liveness(build.clone(), scope, req)
        })?;
        mux.handle(Method::GET, "/debug/readiness", readiness)?;
        Ok(mux)
    }

    /// Mount an arbitrary handler.
    pub fn handle(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
    ) -> Result<(), RouteError> {
        self.router.insert(method, path, handler.into_boxed_handler())
    }

    pub async fn serve_request(&self, scope: Scope, req: Request) -> Response {
        let handler = match self.router.resolve(req.method(), req.path()) {
            Resolved::Found { handler, .. } => handler,
            Resolved::MethodNotAllowed { allowed } => return method_not_allowed(&scope, &allowed),
            Resolved::NotFound => {
                return error_response(&scope, &RequestError::not_found("route not found"));
            }
        };

        match handler.call(scope.clone(), req).await {
            Ok(res) => res,
            Err(HandlerError::Client(e)) => error_response(&scope, &e),
            Err(HandlerError::Fatal(e)) => {
                error!(error = %e, "debug handler failed");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl Service for DebugMux {
    fn serve(&self, scope: Scope, req: Request) -> impl Future<Output = Response> + Send {
        self.serve_request(scope, req)
    }
}

#[derive(Serialize)]
struct Liveness<'a> {
    status: &'a str,
    build: &'a str,
    pid: u32,
}

/// Liveness probe. If the process can answer HTTP at all, it is alive.
pub async fn liveness(build: String, _scope: Scope, _req: Request) -> HandlerResult {
    let body = Liveness { status: "up", build: &build, pid: std::process::id() };
    let body = serde_json::to_vec(&body).map_err(FatalError::from)?;
    Ok(Response::json(body))
}

/// Readiness probe (default implementation). Nothing to warm up, so always
/// ready.
pub async fn readiness(_scope: Scope, _req: Request) -> HandlerResult {
    Ok(Response::json(br#"{"status":"ok"}"#.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(target: &str) -> Request {
        Request::new(Method::GET, target)
    }

    #[tokio::test]
    async fn probes_answer() {
        let mux = DebugMux::standard("test-build").unwrap();

        let res = mux.serve_request(Scope::background(), get("/debug/liveness")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        let doc: serde_json::Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(doc["status"], "up");
        assert_eq!(doc["build"], "test-build");

        let res = mux.serve_request(Scope::background(), get("/debug/readiness")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn failing_debug_handler_is_a_plain_500() {
        let mut mux = DebugMux::new();
        mux.handle(Method::GET, "/debug/boom", |_: Scope, _: Request| async {
            HandlerResult::Err(FatalError::internal("boom").into())
        })
        .unwrap();

        let res = mux.serve_request(Scope::background(), get("/debug/boom")).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
