//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* types in one table, so every
//! handler is hidden behind a trait object (`dyn ErasedHandler`). Middleware
//! consumes and produces the same erased type, which is what lets a chain of
//! wrappers be folded into a single [`BoxedHandler`] at registration time.
//!
//! ```text
//! async fn create(scope: Scope, req: Request) -> HandlerResult { … }
//!        ↓ app.handle(Method::POST, "v1", "/users", create, &[])
//! create.into_boxed_handler()                      ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(create))                      ← BoxedHandler
//!        ↓ wrap_middleware(route_mw), wrap_middleware(global_mw)
//! handler.call(scope, req)  at request time        ← one vtable call per layer
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Scope;
use crate::error::HandlerError;
use crate::request::Request;
use crate::response::Response;

// ── Internal types ────────────────────────────────────────────────────────────

/// What every handler and middleware layer resolves to.
pub type HandlerResult = Result<Response, HandlerError>;

/// A heap-allocated, type-erased future.
///
/// `Pin<Box<…>>` because the runtime polls the future in place and must not
/// move it after the first poll. `Send + 'static` lets tokio move it across
/// worker threads.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Object-safe dispatch interface.
///
/// Implement this directly when a middleware layer is easier to express as
/// a struct holding the next handler than as a closure.
pub trait ErasedHandler: Send + Sync + 'static {
    fn call(&self, scope: Scope, req: Request) -> BoxFuture<HandlerResult>;
}

/// A type-erased handler shared across concurrent requests.
///
/// `Arc` rather than `Box`: a route's composed chain is cloned into every
/// request future, and that should cost one atomic increment, not a copy.
pub type BoxedHandler = Arc<dyn ErasedHandler>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Automatically satisfied for any function or closure with the shape
///
/// ```text
/// async fn name(scope: Scope, req: Request) -> HandlerResult
/// ```
///
/// The trait is sealed: only the blanket impl below satisfies it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// `Sealed` is unnameable outside this crate, so nobody else can implement
/// [`Handler`] for their own types.
mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut> private::Sealed for F
where
    F: Fn(Scope, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
}

impl<F, Fut> Handler for F
where
    F: Fn(Scope, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete `F` to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut> ErasedHandler for FnHandler<F>
where
    F: Fn(Scope, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, scope: Scope, req: Request) -> BoxFuture<HandlerResult> {
        // The concrete `Fut` differs per handler; boxing it is what lets every
        // route share the one `BoxFuture` return type.
        Box::pin((self.0)(scope, req))
    }
}
