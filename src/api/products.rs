//! `/v1/products` handlers.

use std::sync::Arc;

use http::StatusCode;

use super::{page, store_error};
use crate::context::Scope;
use crate::error::RequestError;
use crate::handler::HandlerResult;
use crate::request::Request;
use crate::response::respond;
use crate::store::{NewProduct, ProductStore, UpdateProduct};

#[derive(Clone)]
pub struct Handlers {
    store: Arc<ProductStore>,
}

impl Handlers {
    pub fn new(store: Arc<ProductStore>) -> Self {
        Self { store }
    }

    pub async fn query(self, scope: Scope, req: Request) -> HandlerResult {
        let products = self.store.query(page(&req)?);
        Ok(respond(&scope, &products, StatusCode::OK)?)
    }

    pub async fn query_by_id(self, scope: Scope, req: Request) -> HandlerResult {
        let prd = self.store.query_by_id(id(&req)?).map_err(store_error)?;
        Ok(respond(&scope, &prd, StatusCode::OK)?)
    }

    pub async fn create(self, scope: Scope, req: Request) -> HandlerResult {
        let now = scope.values()?.now();
        let np: NewProduct = req.decode()?;
        let prd = self.store.create(np, now).map_err(store_error)?;
        Ok(respond(&scope, &prd, StatusCode::CREATED)?)
    }

    pub async fn update(self, scope: Scope, req: Request) -> HandlerResult {
        let now = scope.values()?.now();
        let up: UpdateProduct = req.decode()?;
        self.store.update(id(&req)?, up, now).map_err(store_error)?;
        Ok(respond(&scope, &(), StatusCode::NO_CONTENT)?)
    }

    pub async fn delete(self, scope: Scope, req: Request) -> HandlerResult {
        self.store.delete(id(&req)?).map_err(store_error)?;
        Ok(respond(&scope, &(), StatusCode::NO_CONTENT)?)
    }
}

fn id(req: &Request) -> Result<&str, RequestError> {
    req.param("id").ok_or_else(|| RequestError::bad_request("missing product id"))
}
