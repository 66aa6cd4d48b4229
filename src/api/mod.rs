//! The service's route table.
//!
//! Everything under `/v1`. Handlers are methods on small `Handlers` structs
//! holding the store they need; [`bind`] turns such a method into a route
//! handler.

pub mod products;
pub mod users;

use std::sync::Arc;

use http::{Method, StatusCode};

use crate::app::App;
use crate::context::Scope;
use crate::debug::DebugMux;
use crate::error::{HandlerError, RequestError, RouteError};
use crate::handler::{Handler, HandlerResult};
use crate::middleware::{BoxedMiddleware, logger};
use crate::request::Request;
use crate::shutdown::Shutdown;
use crate::store::{Page, ProductStore, StoreError, UserStore};

const VERSION: &str = "v1";

/// Everything the API handlers need.
pub struct ApiMuxConfig {
    pub shutdown: Shutdown,
    pub users: Arc<UserStore>,
    pub products: Arc<ProductStore>,
}

/// Build the API dispatcher with every route mounted.
pub fn api_mux(cfg: ApiMuxConfig) -> Result<App, RouteError> {
    let global: Vec<BoxedMiddleware> = vec![Arc::new(logger())];
    let mut app = App::new(cfg.shutdown, global);

    mount_users(&mut app, cfg.users)?;
    mount_products(&mut app, cfg.products)?;

    Ok(app)
}

fn mount_users(app: &mut App, store: Arc<UserStore>) -> Result<(), RouteError> {
    use self::users::Handlers;

    let h = Handlers::new(store);
    app.handle(Method::GET, VERSION, "/users", bind(&h, Handlers::query), &[])?;
    app.handle(Method::GET, VERSION, "/users/:id", bind(&h, Handlers::query_by_id), &[])?;
    app.handle(Method::POST, VERSION, "/users", bind(&h, Handlers::create), &[])?;
    app.handle(Method::PUT, VERSION, "/users/:id", bind(&h, Handlers::update), &[])?;
    app.handle(Method::DELETE, VERSION, "/users/:id", bind(&h, Handlers::delete), &[])?;
    Ok(())
}

fn mount_products(app: &mut App, store: Arc<ProductStore>) -> Result<(), RouteError> {
    use self::products::Handlers;

    let h = Handlers::new(store);
    app.handle(Method::GET, VERSION, "/products", bind(&h, Handlers::query), &[])?;
    app.handle(Method::GET, VERSION, "/products/:id", bind(&h, Handlers::query_by_id), &[])?;
    app.handle(Method::POST, VERSION, "/products", bind(&h, Handlers::create), &[])?;
    app.handle(Method::PUT, VERSION, "/products/:id", bind(&h, Handlers::update), &[])?;
    app.handle(Method::DELETE, VERSION, "/products/:id", bind(&h, Handlers::delete), &[])?;
    Ok(())
}

/// The debug listener's routes.
pub fn debug_mux(build: &str) -> Result<DebugMux, RouteError> {
    DebugMux::standard(build)
}

/// Pair a handler method with (a clone of) its receiver.
pub fn bind<H, F, Fut>(handlers: &H, f: F) -> impl Handler
where
    H: Clone + Send + Sync + 'static,
    F: Fn(H, Scope, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let handlers = handlers.clone();
    move |scope: Scope, req: Request| f(handlers.clone(), scope, req)
}

/// Map store failures onto client errors.
fn store_error(err: StoreError) -> HandlerError {
    match err {
        StoreError::NotFound => RequestError::not_found(err.to_string()).into(),
        StoreError::InvalidId(_) => RequestError::bad_request(err.to_string()).into(),
        StoreError::Validation(errs) => {
            let mut req_err = RequestError::new(StatusCode::BAD_REQUEST, "data validation error");
            for (field, problems) in errs.field_errors() {
                let reason = problems
                    .iter()
                    .map(|p| p.code.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                req_err = req_err.with_field(field.to_string(), reason);
            }
            req_err.into()
        }
    }
}

/// Parse `?page=&rows=`. Both optional, both positive.
fn page(req: &Request) -> Result<Page, RequestError> {
    let mut page = Page::default();
    if let Some(raw) = req.query("page") {
        page.number = positive(&raw).ok_or_else(|| {
            RequestError::bad_request(format!("invalid page format [{raw}]"))
        })?;
    }
    if let Some(raw) = req.query("rows") {
        page.rows = positive(&raw).ok_or_else(|| {
            RequestError::bad_request(format!("invalid rows format [{raw}]"))
        })?;
    }
    Ok(page)
}

fn positive(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok().filter(|n| *n > 0)
}
