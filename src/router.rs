//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup via [`matchit`]. Static
//! segments win over parameters when both could match, so `/users/me` and
//! `/users/:id` can live side by side.
//!
//! Templates accept `:name` and `*rest` as well as matchit's own `{name}` and
//! `{*rest}`. Registering the same method and template twice is an error, as
//! is registering two templates that differ only in a parameter's name.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::{InsertError, Router as MatchitRouter};

use crate::error::RouteError;
use crate::handler::BoxedHandler;

/// Outcome of [`Router::resolve`].
pub enum Resolved {
    Found {
        handler: BoxedHandler,
        params: HashMap<String, String>,
    },
    /// The path exists, but not for this method.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

/// The route table. Built once at startup, read-only afterwards.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` + `template`.
    pub fn insert(
        &mut self,
        method: Method,
        template: &str,
        handler: BoxedHandler,
    ) -> Result<(), RouteError> {
        let path = translate(template)?;
        self.routes
            .entry(method.clone())
            .or_default()
            .insert(path, handler)
            .map_err(|e| match e {
                InsertError::Conflict { .. } => RouteError::Conflict {
                    method,
                    path: template.to_owned(),
                },
                other => RouteError::Malformed {
                    path: template.to_owned(),
                    reason: other.to_string(),
                },
            })
    }

    pub fn resolve(&self, method: &Method, path: &str) -> Resolved {
        if let Some(matched) = self.routes.get(method).and_then(|tree| tree.at(path).ok()) {
            let params = matched
                .params
                .iter()
                .map(|(k, v)| (k.to_owned(), decode(v)))
                .collect();
            return Resolved::Found { handler: Arc::clone(matched.value), params };
        }

        let mut allowed: Vec<Method> = self
            .routes
            .iter()
            .filter(|(m, tree)| *m != method && tree.at(path).is_ok())
            .map(|(m, _)| m.clone())
            .collect();

        if allowed.is_empty() {
            return Resolved::NotFound;
        }
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Resolved::MethodNotAllowed { allowed }
    }
}

/// Rewrite `:name` / `*rest` segments into matchit syntax.
fn translate(template: &str) -> Result<String, RouteError> {
    let malformed = |reason: &str| RouteError::Malformed {
        path: template.to_owned(),
        reason: reason.to_owned(),
    };

    if !template.starts_with('/') {
        return Err(malformed("path must begin with `/`"));
    }

    let segments: Vec<&str> = template[1..].split('/').collect();
    let last = segments.len() - 1;
    let mut out = String::with_capacity(template.len() + 4);

    for (i, segment) in segments.iter().enumerate() {
        out.push('/');
        if let Some(name) = segment.strip_prefix(':') {
            if !is_ident(name) {
                return Err(malformed("parameter names must be non-empty identifiers"));
            }
            out.push('{');
            out.push_str(name);
            out.push('}');
        } else if let Some(name) = segment.strip_prefix('*') {
            if !is_ident(name) {
                return Err(malformed("catch-all names must be non-empty identifiers"));
            }
            if i != last {
                return Err(malformed("catch-all must be the final segment"));
            }
            out.push_str("{*");
            out.push_str(name);
            out.push('}');
        } else {
            out.push_str(segment);
        }
    }
    Ok(out)
}

fn is_ident(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_owned())
}
