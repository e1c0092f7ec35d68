//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! A [`Response`] is built once, by a handler or by a middleware that stops
//! the chain, and is consumed exactly once by the dispatch adapter.
//!
//! A route's set of possible outcomes is whatever its handler's return type
//! can express. Model a union of outcomes as your own enum:
//!
//! ```rust
//! use waypoint::{IntoResponse, Response};
//!
//! enum GetUser {
//!     Found(String),
//!     Missing,
//! }
//!
//! impl IntoResponse for GetUser {
//!     fn into_response(self) -> Response {
//!         match self {
//!             Self::Found(json) => Response::json(json),
//!             Self::Missing     => Response::not_found(),
//!         }
//!     }
//! }
//! ```

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;
use tracing::warn;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response: a status, optional headers, an optional body.
///
/// # Shortcuts
///
/// ```rust
/// use waypoint::Response;
///
/// Response::ok("foo");
/// Response::json(r#"{"id":1}"#);
/// Response::no_content();
/// Response::bad_request("Invalid query: missing field `q`");
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use http::StatusCode;
/// use waypoint::Response;
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(r#"{"id":42}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

macro_rules! status_shortcuts {
    ($( $(#[$doc:meta])* $name:ident => $code:ident ),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name() -> Self {
                Self::new(StatusCode::$code)
            }
        )*
    };
}

macro_rules! redirects {
    ($( $(#[$doc:meta])* $name:ident => $code:ident ),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(location: impl Into<String>) -> Self {
                Self::new(StatusCode::$code).with_header("location", location)
            }
        )*
    };
}

impl Response {
    /// A response with the given status and nothing else.
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: Vec::new(), body: None }
    }

    /// `200 OK` with a body and no content type.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK).with_body(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// `200 OK`, `application/json`.
    ///
    /// Bytes straight from your serialiser: `serde_json::to_vec(&user)?`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `400 Bad Request` with a body and no content type.
    pub fn bad_request(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::BAD_REQUEST).with_body(body)
    }

    status_shortcuts! {
        /// `201 Created`.
        created => CREATED,
        /// `202 Accepted`.
        accepted => ACCEPTED,
        /// `204 No Content`.
        no_content => NO_CONTENT,
        /// `401 Unauthorized`.
        unauthorized => UNAUTHORIZED,
        /// `403 Forbidden`.
        forbidden => FORBIDDEN,
        /// `404 Not Found`.
        not_found => NOT_FOUND,
        /// `409 Conflict`.
        conflict => CONFLICT,
        /// `500 Internal Server Error`.
        internal_server_error => INTERNAL_SERVER_ERROR,
    }

    redirects! {
        /// `301 Moved Permanently` to `location`.
        moved_permanently => MOVED_PERMANENTLY,
        /// `302 Found` to `location`.
        found => FOUND,
        /// `303 See Other` to `location`.
        see_other => SEE_OTHER,
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> Option<&Bytes> { self.body.as_ref() }

    /// First value of a header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Converts into the host's response type.
    ///
    /// Headers are appended in order with no rewriting; a pair the `http`
    /// crate refuses (bad name or value bytes) is dropped and logged. A
    /// missing body becomes an empty one.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body.unwrap_or_default()));
        *res.status_mut() = self.status;
        for (name, value) in self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(n), Ok(v)) => { res.headers_mut().append(n, v); }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        res
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by one of `json`, `text`, `body` or `no_body`.
#[derive(Debug)]
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish(Some(JSON), body.into())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(Some(TEXT), Bytes::from(body.into()))
    }

    /// Terminate with a body and whatever content type you set yourself.
    pub fn body(self, body: impl Into<Bytes>) -> Response {
        self.finish(None, body.into())
    }

    /// Terminate with no body (e.g. `204 No Content`, redirects).
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: None }
    }

    fn finish(self, content_type: Option<&str>, body: Bytes) -> Response {
        let mut headers = Vec::with_capacity(self.headers.len() + 1);
        if let Some(ct) = content_type {
            headers.push(("content-type".to_owned(), ct.to_owned()));
        }
        headers.extend(self.headers);
        Response { status: self.status, headers, body: Some(body) }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Handlers may return any type implementing this. `Result<A, B>` converts
/// either arm, so `Result<Created, Conflict>` is a two-outcome route.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a status directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::new(self) }
}

impl<B: Into<Bytes>> IntoResponse for (StatusCode, B) {
    fn into_response(self) -> Response { Response::new(self.0).with_body(self.1) }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(ok) => ok.into_response(),
            Err(err) => err.into_response(),
        }
    }
}
