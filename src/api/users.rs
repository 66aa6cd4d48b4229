//! `/v1/users` handlers.

use std::sync::Arc;

use http::StatusCode;

use super::{page, store_error};
use crate::context::Scope;
use crate::error::RequestError;
use crate::handler::HandlerResult;
use crate::request::Request;
use crate::response::respond;
use crate::store::{NewUser, UpdateUser, UserStore};

#[derive(Clone)]
pub struct Handlers {
    store: Arc<UserStore>,
}

impl Handlers {
    pub fn new(store: Arc<UserStore>) -> Self {
        Self { store }
    }

    /// `GET /v1/users?page=&rows=`
    pub async fn query(self, scope: Scope, req: Request) -> HandlerResult {
        let page = page(&req)?;
        let users = self.store.query(page);
        Ok(respond(&scope, &users, StatusCode::OK)?)
    }

    /// `GET /v1/users/:id`
    pub async fn query_by_id(self, scope: Scope, req: Request) -> HandlerResult {
        let id = id(&req)?;
        let usr = self.store.query_by_id(id).map_err(store_error)?;
        Ok(respond(&scope, &usr, StatusCode::OK)?)
    }

    /// `POST /v1/users`
    pub async fn create(self, scope: Scope, req: Request) -> HandlerResult {
        let now = scope.values()?.now();
        let nu: NewUser = req.decode()?;
        let usr = self.store.create(nu, now).map_err(store_error)?;
        Ok(respond(&scope, &usr, StatusCode::CREATED)?)
    }

    /// `PUT /v1/users/:id`
    pub async fn update(self, scope: Scope, req: Request) -> HandlerResult {
        let now = scope.values()?.now();
        let id = id(&req)?;
        let uu: UpdateUser = req.decode()?;
        self.store.update(id, uu, now).map_err(store_error)?;
        Ok(respond(&scope, &(), StatusCode::NO_CONTENT)?)
    }

    /// `DELETE /v1/users/:id`
    pub async fn delete(self, scope: Scope, req: Request) -> HandlerResult {
        let id = id(&req)?;
        self.store.delete(id).map_err(store_error)?;
        Ok(respond(&scope, &(), StatusCode::NO_CONTENT)?)
    }
}

fn id(req: &Request) -> Result<&str, RequestError> {
    req.param("id").ok_or_else(|| RequestError::bad_request("missing user id"))
}
