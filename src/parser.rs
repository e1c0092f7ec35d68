//! Parsers: typed decoding of one request input source.
//!
//! A parser is ordinary [`Middleware`]. It reads its [`Source`] from the raw
//! request, and either continues the chain with the decoded value or stops it
//! with `400 Bad Request` and a body of the form `Invalid <source>: <reason>`.
//! Because parsers are just chain steps, they run wherever they are placed
//! relative to other middleware.
//!
//! ```rust
//! use serde::Deserialize;
//! use waypoint::{Context, Response, parser, route};
//!
//! #[derive(Deserialize)]
//! struct Search { q: String }
//!
//! let search = route::get("/search")
//!     .with(parser::query::<Search>())
//!     .handle(|ctx: Context| async move {
//!         let q = ctx.query::<Search>().map(|s| s.q.clone()).unwrap_or_default();
//!         Response::text(q)
//!     });
//! ```

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::context::{Body, Context, Fields, Headers, Query, RouteParams};
use crate::error::DecodeError;
use crate::middleware::{BoxFuture, Middleware, Outcome};
use crate::request::Request;
use crate::response::Response;

/// Where a parser reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    /// Path parameters (e.g. `/users/{id}`)
    Params,
    Query,
    Body,
    Headers,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Params  => "params",
            Self::Query   => "query",
            Self::Body    => "body",
            Self::Headers => "headers",
        }
    }

    fn input(self, request: &Request) -> Input<'_> {
        match self {
            Self::Params  => Input::Params(request.params()),
            Self::Query   => Input::Query(request.query().unwrap_or_default()),
            Self::Body    => Input::Body(request.body()),
            Self::Headers => Input::Headers(request.headers()),
        }
    }

    fn fields<T: Send + Sync + 'static>(self, value: T) -> Fields {
        match self {
            Self::Params  => Fields::new().with(RouteParams(value)),
            Self::Query   => Fields::new().with(Query(value)),
            Self::Body    => Fields::new().with(Body(value)),
            Self::Headers => Fields::new().with(Headers(value)),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw input handed to a [`Decoder`], borrowed from the request.
#[derive(Clone, Copy, Debug)]
pub enum Input<'a> {
    Params(&'a HashMap<String, String>),
    /// Raw query string without the `?`; empty when the URI has none.
    Query(&'a str),
    Body(&'a [u8]),
    Headers(&'a HeaderMap),
}

// ── Decoders ──────────────────────────────────────────────────────────────────

/// A pure decoding capability.
pub trait Decoder<T>: Send + Sync + 'static {
    fn decode(&self, input: Input<'_>) -> Result<T, DecodeError>;
}

/// Decodes any [`DeserializeOwned`] type with serde.
///
/// Params and headers are treated as form pairs, so numeric fields parse from
/// their string form; the query string is form-decoded; the body is JSON.
/// Header names are lower-case; a repeated header contributes its first value.
/// Headers whose value is not visible ASCII are left out of the decode, and
/// named in the reason if the decode then fails. Route params arrive already
/// percent-decoded.
#[derive(Clone, Copy, Debug, Default)]
pub struct Serde;

impl<T: DeserializeOwned> Decoder<T> for Serde {
    fn decode(&self, input: Input<'_>) -> Result<T, DecodeError> {
        match input {
            Input::Params(params) => from_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
            Input::Query(query) => Ok(serde_urlencoded::from_str(query)?),
            Input::Body(body) => Ok(serde_json::from_slice(body)?),
            Input::Headers(headers) => {
                let mut pairs = Vec::new();
                let mut opaque = Vec::new();
                for name in headers.keys() {
                    let Some(value) = headers.get(name) else { continue };
                    match value.to_str() {
                        Ok(value) => pairs.push((name.as_str(), value)),
                        Err(_) => opaque.push(name.as_str()),
                    }
                }
                from_pairs(pairs.into_iter()).map_err(|e| match opaque.as_slice() {
                    [] => e,
                    names => DecodeError::new(format!("{e} (skipped non-UTF-8 headers: {})", names.join(", "))),
                })
            }
        }
    }
}

fn from_pairs<'a, T: DeserializeOwned>(
    pairs: impl Iterator<Item = (&'a str, &'a str)>,
) -> Result<T, DecodeError> {
    let pairs: Vec<_> = pairs.collect();
    let encoded = serde_urlencoded::to_string(&pairs)?;
    Ok(serde_urlencoded::from_str(&encoded)?)
}

/// A decoder built from a function. See [`decode_fn`].
#[derive(Clone, Copy)]
pub struct DecodeFn<F>(F);

/// Wraps `Fn(Input) -> Result<T, DecodeError>` as a [`Decoder`].
pub fn decode_fn<T, F>(f: F) -> DecodeFn<F>
where
    F: Fn(Input<'_>) -> Result<T, DecodeError> + Send + Sync + 'static,
{
    DecodeFn(f)
}

impl<T, F> Decoder<T> for DecodeFn<F>
where
    F: Fn(Input<'_>) -> Result<T, DecodeError> + Send + Sync + 'static,
{
    fn decode(&self, input: Input<'_>) -> Result<T, DecodeError> {
        (self.0)(input)
    }
}

// ── Parser middleware ─────────────────────────────────────────────────────────

/// A decoder bound to one input source, usable as a chain step.
pub struct Parser<T, D = Serde> {
    source: Source,
    decoder: D,
    _output: PhantomData<fn() -> T>,
}

impl<T, D> Parser<T, D> {
    pub fn source(&self) -> Source {
        self.source
    }
}

impl<T, D> fmt::Debug for Parser<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("source", &self.source)
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}

/// Decodes the matched route parameters into `T`.
pub fn params<T: DeserializeOwned + Send + Sync + 'static>() -> Parser<T> {
    custom(Source::Params, Serde)
}

/// Decodes the query string into `T`.
pub fn query<T: DeserializeOwned + Send + Sync + 'static>() -> Parser<T> {
    custom(Source::Query, Serde)
}

/// Decodes the JSON request body into `T`.
pub fn body<T: DeserializeOwned + Send + Sync + 'static>() -> Parser<T> {
    custom(Source::Body, Serde)
}

/// Decodes the request headers into `T`.
pub fn headers<T: DeserializeOwned + Send + Sync + 'static>() -> Parser<T> {
    custom(Source::Headers, Serde)
}

/// Binds any decoder to a source.
pub fn custom<T, D: Decoder<T>>(source: Source, decoder: D) -> Parser<T, D> {
    Parser { source, decoder, _output: PhantomData }
}

impl<T, D> Parser<T, D>
where
    T: Send + Sync + 'static,
    D: Decoder<T>,
{
    fn outcome(&self, request: &Request) -> Outcome {
        match self.decoder.decode(self.source.input(request)) {
            Ok(value) => Outcome::next(self.source.fields(value)),
            Err(e) => Outcome::Stop(rejection(self.source, &e)),
        }
    }
}

/// The `400` a failed decode of `source` answers with.
pub(crate) fn rejection(source: Source, error: &DecodeError) -> Response {
    debug!(%source, reason = %error, "rejecting request input");
    Response::bad_request(format!("Invalid {source}: {error}"))
}

impl<T, D> Middleware for Parser<T, D>
where
    T: Send + Sync + 'static,
    D: Decoder<T>,
{
    fn call(&self, ctx: Context) -> BoxFuture<'_, Outcome> {
        let outcome = self.outcome(ctx.request());
        Box::pin(std::future::ready(outcome))
    }

    fn statuses(&self) -> &[StatusCode] {
        &[StatusCode::BAD_REQUEST]
    }

    fn name(&self) -> &'static str {
        match self.source {
            Source::Params  => "parser::params",
            Source::Query   => "parser::query",
            Source::Body    => "parser::body",
            Source::Headers => "parser::headers",
        }
    }
}
