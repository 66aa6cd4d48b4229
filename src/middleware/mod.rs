//! Middleware layer.
//!
//! A middleware turns one handler into another. Composition is a plain
//! nested call, onion style: for `[A, B]` wrapped around `h`, a request runs
//! A's entry, B's entry, `h`, B's exit, A's exit. An error from an inner layer
//! returns through every outer layer, so each still runs its exit logic and
//! sees the error unchanged.
//!
//! [`App::handle`](crate::App::handle) composes twice: route middleware
//! around the handler first, then the application's global middleware around
//! that. Global layers therefore observe the whole route, including its
//! final status or error.

mod logger;

use std::sync::Arc;

use crate::handler::BoxedHandler;

pub use logger::{Logger, logger};

/// A `Handler → Handler` transformation.
///
/// Closures of type `Fn(BoxedHandler) -> BoxedHandler` implement it.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

/// Shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Wrap `handler` so that `mw[0]` is the outermost layer.
pub fn wrap_middleware(mw: &[BoxedMiddleware], handler: BoxedHandler) -> BoxedHandler {
    mw.iter().rev().fold(handler, |next, layer| layer.wrap(next))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::Method;

    use super::*;
    use crate::context::Scope;
    use crate::error::{FatalError, HandlerError};
    use crate::handler::{Handler, HandlerResult};
    use crate::request::Request;
    use crate::response::Response;

    type Trail = Arc<Mutex<Vec<String>>>;

    fn recording(name: &'static str, trail: &Trail) -> BoxedMiddleware {
        let trail = Arc::clone(trail);
        Arc::new(move |next: BoxedHandler| -> BoxedHandler {
            let trail = Arc::clone(&trail);
            (move |scope: Scope, req: Request| {
                let next = Arc::clone(&next);
                let trail = Arc::clone(&trail);
                async move {
                    trail.lock().unwrap().push(format!("enter {name}"));
                    let res = next.call(scope, req).await;
                    let outcome = if res.is_ok() { "ok" } else { "err" };
                    trail.lock().unwrap().push(format!("exit {name} {outcome}"));
                    res
                }
            })
            .into_boxed_handler()
        })
    }

    fn terminal(trail: &Trail, fail: bool) -> BoxedHandler {
        let trail = Arc::clone(trail);
        (move |_: Scope, _: Request| {
            let trail = Arc::clone(&trail);
            async move {
                trail.lock().unwrap().push("handler".to_owned());
                if fail {
                    return Err(HandlerError::Fatal(FatalError::internal("boom")));
                }
                HandlerResult::Ok(Response::text("ok"))
            }
        })
        .into_boxed_handler()
    }

    fn run(handler: BoxedHandler) -> HandlerResult {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(handler.call(Scope::background(), Request::new(Method::GET, "/")))
    }

    #[test]
    fn global_wraps_route_middleware() {
        let trail = Trail::default();
        let global = [recording("A", &trail), recording("B", &trail)];
        let route = [recording("C", &trail)];

        let handler = wrap_middleware(&route, terminal(&trail, false));
        let handler = wrap_middleware(&global, handler);
        assert!(run(handler).is_ok());

        assert_eq!(*trail.lock().unwrap(), [
            "enter A", "enter B", "enter C", "handler", "exit C ok", "exit B ok", "exit A ok",
        ]);
    }

    #[test]
    fn errors_unwind_through_every_layer() {
        let trail = Trail::default();
        let handler = wrap_middleware(
            &[recording("A", &trail), recording("B", &trail)],
            terminal(&trail, true),
        );

        let err = run(handler).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "fatal: boom");
        assert_eq!(*trail.lock().unwrap(), [
            "enter A", "enter B", "handler", "exit B err", "exit A err",
        ]);
    }

    #[test]
    fn empty_chain_is_the_handler() {
        let trail = Trail::default();
        assert!(run(wrap_middleware(&[], terminal(&trail, false))).is_ok());
        assert_eq!(*trail.lock().unwrap(), ["handler"]);
    }
}
