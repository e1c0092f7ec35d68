//! Middleware: chain steps that augment the context or answer early.
//!
//! A middleware receives the current [`Context`] and resolves to an
//! [`Outcome`]:
//!
//! - [`Outcome::Next`] continues the chain, contributing extra context
//!   [`Fields`] and optionally a [`Finalizer`] to run once the request's
//!   outcome is known;
//! - [`Outcome::Stop`] ends the chain with a response. Nothing after it runs,
//!   not even the handler; finalizers registered before it still do.
//!
//! Closures become middleware through [`from_fn`]:
//!
//! ```rust
//! use http::StatusCode;
//! use waypoint::middleware::{self, Outcome};
//! use waypoint::{Context, Fields, Response};
//!
//! struct ApiKey(String);
//!
//! let auth = middleware::from_fn(|ctx: Context| async move {
//!     match ctx.request().header("x-api-key") {
//!         Some(key) => Outcome::next(Fields::new().with(ApiKey(key.to_owned()))),
//!         None => Outcome::stop(Response::unauthorized()),
//!     }
//! })
//! .responds(StatusCode::UNAUTHORIZED);
//! ```

pub(crate) mod chain;

use std::any::{Any, type_name};
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;

use http::StatusCode;

use crate::context::{Context, Fields};
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ── Outcome ───────────────────────────────────────────────────────────────────

/// What a middleware decided.
pub enum Outcome {
    Next {
        fields: Fields,
        finalizer: Option<Finalizer>,
    },
    Stop(Response),
}

impl Outcome {
    /// Continue the chain with extra context fields.
    pub fn next(fields: Fields) -> Self {
        Self::Next { fields, finalizer: None }
    }

    /// Continue the chain and register a cleanup action.
    pub fn next_with(fields: Fields, finalizer: impl FnOnce() + Send + 'static) -> Self {
        Self::Next { fields, finalizer: Some(Finalizer::new(finalizer)) }
    }

    /// End the chain with `response`.
    pub fn stop(response: impl IntoResponse) -> Self {
        Self::Stop(response.into_response())
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next { fields, finalizer } => f
                .debug_struct("Next")
                .field("fields", fields)
                .field("finalizer", &finalizer.is_some())
                .finish(),
            Self::Stop(response) => f.debug_tuple("Stop").field(response).finish(),
        }
    }
}

// ── Finalizer ─────────────────────────────────────────────────────────────────

/// A deferred cleanup action, owned by the chain executor once registered.
///
/// Finalizers run in reverse registration order. A panicking finalizer is
/// caught and logged; it never affects the response or its siblings.
pub struct Finalizer(Box<dyn FnOnce() + Send + 'static>);

impl Finalizer {
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub(crate) fn run(self) -> Result<(), Box<dyn Any + Send>> {
        panic::catch_unwind(AssertUnwindSafe(self.0))
    }
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Finalizer")
    }
}

// ── Middleware trait ──────────────────────────────────────────────────────────

/// One step of a route's chain.
///
/// Implemented by parsers and by [`from_fn`] closures; implement it yourself
/// for middleware that carries configuration.
pub trait Middleware: Send + Sync + 'static {
    /// Runs this step against a fresh copy of the current context.
    fn call(&self, ctx: Context) -> BoxFuture<'_, Outcome>;

    /// Statuses this step can stop the chain with.
    ///
    /// Contributes to a route's declared outcome set; see
    /// [`RouteBuilder::responds`](crate::route::RouteBuilder::responds).
    fn statuses(&self) -> &[StatusCode] {
        &[]
    }

    /// Name used in logs.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

// ── Closure middleware ────────────────────────────────────────────────────────

/// Middleware built from an async closure. See [`from_fn`].
pub struct FromFn<F> {
    f: F,
    statuses: Vec<StatusCode>,
}

/// Wraps `async fn(Context) -> Outcome` as [`Middleware`].
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    FromFn { f, statuses: Vec::new() }
}

impl<F> FromFn<F> {
    /// Declares a status this middleware may stop with.
    pub fn responds(mut self, status: StatusCode) -> Self {
        self.statuses.push(status);
        self
    }
}

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture<'_, Outcome> {
        Box::pin((self.f)(ctx))
    }

    fn statuses(&self) -> &[StatusCode] {
        &self.statuses
    }
}

impl<F> fmt::Debug for FromFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FromFn").field("statuses", &self.statuses).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::request::Request;

    #[test]
    fn finalizer_panics_are_caught() {
        assert!(Finalizer::new(|| panic!("boom")).run().is_err());
        assert!(Finalizer::new(|| {}).run().is_ok());
    }

    #[tokio::test]
    async fn from_fn_calls_the_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mw = from_fn(move |_ctx| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                Outcome::stop(StatusCode::FORBIDDEN)
            }
        })
        .responds(StatusCode::FORBIDDEN);

        let ctx = Context::new(Request::from(http::Request::get("/").body(Bytes::new()).unwrap()));
        match mw.call(ctx).await {
            Outcome::Stop(res) => assert_eq!(res.status(), StatusCode::FORBIDDEN),
            other => panic!("expected stop, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(mw.statuses(), &[StatusCode::FORBIDDEN]);
    }
}
