//! Route declaration.
//!
//! A route binds one method and path pattern to a middleware chain and a
//! handler:
//!
//! ```rust
//! use serde::Deserialize;
//! use waypoint::{Context, Response, parser, route};
//!
//! #[derive(Deserialize)]
//! struct NewUser { name: String }
//!
//! let create = route::post("/users")
//!     .with(parser::body::<NewUser>())
//!     .handle(|ctx: Context| async move {
//!         let name = ctx.body::<NewUser>().map(|u| u.name.as_str()).unwrap_or("");
//!         Response::builder()
//!             .status(http::StatusCode::CREATED)
//!             .text(format!("created {name}"))
//!     });
//! ```
//!
//! Middleware shared by many routes goes into a [`Pipeline`]; every route
//! started from it runs that chain first:
//!
//! ```rust,ignore
//! let authed = route::pipeline().with(auth);
//! let me     = authed.get("/me").handle(me);
//! let logout = authed.post("/logout").handle(logout);
//! ```

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use tracing::{Instrument, debug_span, warn};

use crate::context::Context;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::Middleware;
use crate::middleware::chain::{self, BoxedMiddleware};
use crate::request::Request;
use crate::response::Response;

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// An ordered middleware chain not yet bound to a handler.
///
/// Cloning shares the middleware; adding to a clone never affects the
/// original.
#[derive(Clone, Default)]
pub struct Pipeline {
    middleware: Vec<BoxedMiddleware>,
    declared: Vec<StatusCode>,
}

/// An empty [`Pipeline`].
pub fn pipeline() -> Pipeline {
    Pipeline::new()
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chain step.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Declares statuses the handler may produce. See [`RouteBuilder::responds`].
    pub fn responds(mut self, statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        self.declared.extend(statuses);
        self
    }

    /// Starts a route pre-seeded with this chain.
    pub fn route(&self, method: Method, pattern: impl Into<String>) -> RouteBuilder {
        RouteBuilder { method, pattern: pattern.into(), pipeline: self.clone() }
    }

    /// Binds the chain to a handler without a method or pattern.
    pub fn handle(self, handler: impl Handler) -> RouteHandler {
        let declared = if self.declared.is_empty() {
            Vec::new()
        } else {
            let mut all = self.declared;
            for status in self.middleware.iter().flat_map(|m| m.statuses()) {
                if !all.contains(status) {
                    all.push(*status);
                }
            }
            all
        };
        RouteHandler {
            middleware: self.middleware.into(),
            handler: handler.into_boxed_handler(),
            declared: declared.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("middleware", &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("declared", &self.declared)
            .finish()
    }
}

macro_rules! method_routes {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            #[doc = concat!("Starts a `", stringify!($name), "` route with no middleware.")]
            pub fn $name(pattern: impl Into<String>) -> RouteBuilder {
                Pipeline::new().route(Method::$method, pattern)
            }
        )*

        impl Pipeline {
            $(
                #[doc = concat!("Starts a `", stringify!($name), "` route running this chain first.")]
                pub fn $name(&self, pattern: impl Into<String>) -> RouteBuilder {
                    self.route(Method::$method, pattern)
                }
            )*
        }
    };
}

method_routes! {
    get     => Get,
    post    => Post,
    put     => Put,
    patch   => Patch,
    delete  => Delete,
    head    => Head,
    options => Options,
    connect => Connect,
    trace   => Trace,
}

// ── RouteBuilder ──────────────────────────────────────────────────────────────

/// A route whose chain is still being declared.
#[derive(Debug)]
pub struct RouteBuilder {
    method: Method,
    pattern: String,
    pipeline: Pipeline,
}

impl RouteBuilder {
    /// Appends a chain step: a parser or any other middleware.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.pipeline = self.pipeline.with(middleware);
        self
    }

    /// Enumerates the statuses the handler can produce.
    ///
    /// Once declared, the route's outcome set is these plus every status its
    /// middleware declare (parsers declare `400`). A response outside that
    /// set is still delivered, and logged at `warn`.
    pub fn responds(mut self, statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        self.pipeline = self.pipeline.responds(statuses);
        self
    }

    pub fn handle(self, handler: impl Handler) -> Route {
        Route {
            method: self.method,
            pattern: self.pattern,
            handler: self.pipeline.handle(handler),
        }
    }
}

// ── RouteHandler ──────────────────────────────────────────────────────────────

/// A middleware chain bound to a handler, runnable without a router.
pub struct RouteHandler {
    middleware: Arc<[BoxedMiddleware]>,
    handler: BoxedHandler,
    declared: Arc<[StatusCode]>,
}

impl RouteHandler {
    /// Runs the chain and handler against one request.
    ///
    /// Panics from middleware or the handler propagate to the caller after
    /// the finalizers registered so far have run.
    pub async fn run(&self, request: Request) -> Response {
        let response = chain::run(&self.middleware, &self.handler, Context::new(request)).await;
        if !self.declared.is_empty() && !self.declared.contains(&response.status()) {
            warn!(
                status = %response.status(),
                declared = ?self.declared,
                "route produced an undeclared status",
            );
        }
        response
    }

    /// The declared outcome set; empty when the handler declared nothing.
    pub fn statuses(&self) -> &[StatusCode] {
        &self.declared
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHandler")
            .field("middleware", &self.middleware.len())
            .field("declared", &self.declared)
            .finish()
    }
}

// ── Route ─────────────────────────────────────────────────────────────────────

/// One method + pattern bound to a chain and handler. Immutable.
#[derive(Debug)]
pub struct Route {
    method: Method,
    pattern: String,
    handler: RouteHandler,
}

impl Route {
    pub fn method(&self) -> Method { self.method }
    pub fn pattern(&self) -> &str { &self.pattern }
    pub fn handler(&self) -> &RouteHandler { &self.handler }

    pub fn statuses(&self) -> &[StatusCode] {
        self.handler.statuses()
    }

    pub(crate) async fn run(&self, request: Request) -> Response {
        let span = debug_span!("route", method = %self.method, pattern = %self.pattern);
        self.handler.run(request).instrument(span).await
    }
}
