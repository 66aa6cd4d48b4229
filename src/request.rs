//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::de::DeserializeOwned;

use crate::error::RequestError;

/// An incoming HTTP request with its body fully read.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) remote_addr: Option<SocketAddr>,
}

impl Request {
    /// Build a request by hand. `target` may carry a query string.
    ///
    /// The server builds requests from the wire; this constructor exists for
    /// tests and for driving an [`App`](crate::App) without a listener.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
            None => (target.to_owned(), None),
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            remote_addr: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub(crate) fn from_parts(
        parts: http::request::Parts,
        body: Bytes,
        remote_addr: SocketAddr,
    ) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            body,
            params: HashMap::new(),
            remote_addr: Some(remote_addr),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the first query-string value for `key`.
    ///
    /// Keys and values are both form-decoded before use, so `?pa%67e=2`
    /// answers `query("page")`.
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        query
            .split('&')
            .filter_map(|pair| {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                (form_decode(k) == key).then_some(v)
            })
            .next()
            .map(form_decode)
    }

    /// Deserialize the JSON body.
    ///
    /// Any decoding problem (empty body, bad syntax, a missing required
    /// field, an unknown field on a `deny_unknown_fields` type) is the
    /// client's fault and comes back as a `400`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        if self.body.is_empty() {
            return Err(RequestError::bad_request("request body is empty"));
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| RequestError::bad_request(format!("unable to decode payload: {e}")))
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

/// `application/x-www-form-urlencoded` decoding. Invalid UTF-8 keeps the raw
/// text.
fn form_decode(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw).map(|s| s.into_owned()).unwrap_or(raw)
}
