//! Incoming HTTP request type.
//!
//! This is the raw request handle every [`Context`](crate::Context) carries.
//! The body is already fully buffered; parsers and handlers read it as bytes.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Uri};

/// An incoming HTTP request with its route parameters, once matched.
#[derive(Debug)]
pub struct Request {
    method: http::Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
}

impl Request {
    pub fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: HashMap::new(),
        }
    }

    /// Attaches the route parameters extracted by the path matcher.
    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> &http::Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// Case-insensitive header lookup. Non-UTF-8 values are reported as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_parts_and_params() {
        let req = http::Request::post("/users/42?full=1")
            .header("X-Trace", "abc")
            .body(Bytes::from_static(b"{}"))
            .unwrap();
        let req = Request::from(req)
            .with_params(HashMap::from([("id".to_owned(), "42".to_owned())]));

        assert_eq!(req.method(), http::Method::POST);
        assert_eq!(req.path(), "/users/42");
        assert_eq!(req.query(), Some("full=1"));
        assert_eq!(req.header("x-trace"), Some("abc"));
        assert_eq!(req.body().as_ref(), b"{}");
        assert_eq!(req.param("id"), Some("42"));
        assert_eq!(req.param("missing"), None);
    }
}
