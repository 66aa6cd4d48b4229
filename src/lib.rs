//! # wt
//!
//! A small HTTP service scaffold: routing, a middleware chain, per-request
//! values, a JSON response encoder, and a shutdown path that fails fast.
//!
//! ## The contract
//!
//! Handlers return `Result<Response, HandlerError>`. The error is one of two
//! kinds and the kind decides what happens next:
//!
//! - **Client** ([`RequestError`]) becomes a JSON error document with its
//!   status. The process carries on.
//! - **Fatal** ([`FatalError`]) means the process can no longer be trusted.
//!   The client gets a bare `500`, a shutdown notice goes out, and the
//!   server drains in-flight requests within the shutdown timeout.
//!
//! Only the first shutdown notice counts, whether it came from SIGTERM,
//! Ctrl-C or a handler.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use http::{Method, StatusCode};
//! use wt::middleware::{BoxedMiddleware, logger};
//! use wt::{App, HandlerResult, Request, Scope, Server, respond, shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (notify, mut listener) = shutdown::channel();
//!     shutdown::listen_for_os_signals(notify.clone());
//!
//!     let global: Vec<BoxedMiddleware> = vec![Arc::new(logger())];
//!     let mut app = App::new(notify, global);
//!     app.handle(Method::GET, "v1", "/users/:id", get_user, &[])?;
//!
//!     Server::bind("0.0.0.0:3000")
//!         .await?
//!         .serve(app, async move {
//!             listener.recv().await;
//!         })
//!         .await?;
//!     Ok(())
//! }
//!
//! async fn get_user(scope: Scope, req: Request) -> HandlerResult {
//!     let id = req.param("id").unwrap_or_default().to_owned();
//!     Ok(respond(&scope, &serde_json::json!({ "id": id }), StatusCode::OK)?)
//! }
//! ```

pub mod api;
pub mod config;
pub mod debug;
pub mod middleware;
pub mod shutdown;
pub mod store;

mod app;
mod context;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub use app::App;
pub use context::{ContextMissing, RequestContext, Scope, request_context};
pub use debug::DebugMux;
pub use error::{Error, FatalError, HandlerError, RequestError, RouteError};
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, HandlerResult};
pub use request::Request;
pub use response::{Response, ResponseBuilder, error_response, respond};
pub use router::{Resolved, Router};
pub use server::{Server, Service};
pub use shutdown::{Shutdown, ShutdownListener, ShutdownReason};
