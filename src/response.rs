//! Outgoing HTTP response type and the JSON response encoder.
//!
//! Handlers build a [`Response`] and return it. Most of them go through
//! [`respond`], which serializes a value, records the status code on the
//! request context for the logging middleware, and treats `204 No Content`
//! as "status line only".

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use crate::context::Scope;
use crate::error::{FatalError, RequestError};

const APPLICATION_JSON: &str = "application/json";
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// An outgoing HTTP response.
///
/// ```rust
/// use wt::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/v1/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

impl Response {
    /// `200 OK` with an `application/json` body.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` with a `text/plain` body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { status: code, headers: HeaderMap::new(), body: Bytes::new() }
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: StatusCode::OK, headers: HeaderMap::new() }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Convert into the hyper response handed to the connection.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

/// Fluent builder for [`Response`]. Defaults to `200 OK`.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderMap,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    /// Adds a header. Names or values that are not valid HTTP are skipped.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish(APPLICATION_JSON, body.into())
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(TEXT_PLAIN, Bytes::from(body.into()))
    }

    /// Terminate with no body (e.g. `204 No Content`).
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Bytes::new() }
    }

    fn finish(mut self, content_type: &'static str, body: Bytes) -> Response {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Response { status: self.status, headers: self.headers, body }
    }
}

/// Encode `data` as JSON with `status`, recording the status on `scope`.
///
/// `204 No Content` never carries a body, whatever `data` is. A value that
/// fails to serialize is a [`FatalError::Serialization`]; the caller decides
/// whether to recover from it.
pub fn respond<T>(scope: &Scope, data: &T, status: StatusCode) -> Result<Response, FatalError>
where
    T: Serialize + ?Sized,
{
    if status == StatusCode::NO_CONTENT {
        scope.set_status_code(status.as_u16())?;
        return Ok(Response::status(status));
    }

    let body = serde_json::to_vec(data)?;
    scope.set_status_code(status.as_u16())?;
    Ok(Response::builder().status(status).json(body))
}

/// Wire shape of a client error.
#[derive(Debug, Serialize)]
struct ErrorDocument<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a std::collections::BTreeMap<String, String>>,
}

/// Render a [`RequestError`] as its JSON error document.
///
/// Used at the handler boundary and by the dispatcher. The status is recorded
/// on `scope` when it carries a request context; a bare scope is fine here.
pub fn error_response(scope: &Scope, err: &RequestError) -> Response {
    let _ = scope.set_status_code(err.status().as_u16());
    let fields = (!err.fields().is_empty()).then_some(err.fields());
    let doc = ErrorDocument { error: err.message(), fields };
    match serde_json::to_vec(&doc) {
        Ok(body) => Response::builder().status(err.status()).json(body),
        Err(_) => Response::status(err.status()),
    }
}

/// `405` with the `allow` header listing the methods the path does accept.
pub(crate) fn method_not_allowed(scope: &Scope, allowed: &[http::Method]) -> Response {
    let err = RequestError::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
    let mut res = error_response(scope, &err);
    let allow = allowed.iter().map(http::Method::as_str).collect::<Vec<_>>().join(", ");
    if let Ok(value) = HeaderValue::try_from(allow) {
        res.headers.insert(ALLOW, value);
    }
    res
}
