//! Immutable route sets and their compiled dispatch form.
//!
//! A [`Router`] is a value: [`Router::add`] and [`Router::merge`] return a new
//! router and leave the receiver as it was, so a route set handed to one part
//! of the program is never changed by another.
//!
//! [`Router::handler`] compiles the set into a [`RouterHandler`]: one radix
//! tree per HTTP method, O(path-length) lookup. Pattern syntax and precedence
//! between static and parameterised segments are [`matchit`]'s; when two
//! routes collide outright, the one registered first wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use matchit::{InsertError, Params, Router as MatchitRouter};
use percent_encoding::percent_decode_str;
use tracing::{debug, warn};

use crate::error::{DecodeError, Error};
use crate::method::Method;
use crate::route::Route;

/// An ordered, immutable collection of routes.
#[derive(Clone, Default)]
pub struct Router {
    routes: Arc<[Arc<Route>]>,
}

/// Builds a router from routes, keeping their order.
pub fn router(routes: impl IntoIterator<Item = Route>) -> Router {
    Router::new().add(routes)
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new router holding this router's routes followed by `routes`.
    pub fn add(&self, routes: impl IntoIterator<Item = Route>) -> Self {
        self.extended(routes.into_iter().map(Arc::new))
    }

    /// A new router holding this router's routes followed by `other`'s.
    pub fn merge(&self, other: &Router) -> Self {
        self.extended(other.routes.iter().cloned())
    }

    fn extended(&self, more: impl Iterator<Item = Arc<Route>>) -> Self {
        Self { routes: self.routes.iter().cloned().chain(more).collect() }
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Compiles the routes into a single dispatch entry point.
    ///
    /// A route whose pattern conflicts with an earlier one on the same method
    /// is skipped (and logged); a syntactically invalid pattern is an error.
    pub fn handler(&self) -> Result<RouterHandler, Error> {
        let mut trees: HashMap<Method, MatchitRouter<Arc<Route>>> = HashMap::new();

        for route in self.routes.iter() {
            let tree = trees.entry(route.method()).or_default();
            match tree.insert(route.pattern(), Arc::clone(route)) {
                Ok(()) => debug!(method = %route.method(), pattern = route.pattern(), "route registered"),
                Err(InsertError::Conflict { with }) => warn!(
                    method = %route.method(),
                    pattern = route.pattern(),
                    existing = %with,
                    "route shadowed by an earlier registration; skipping",
                ),
                Err(source) => {
                    return Err(Error::Route {
                        method: route.method(),
                        pattern: route.pattern().to_owned(),
                        source,
                    });
                }
            }
        }

        Ok(RouterHandler { trees })
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| format!("{} {}", r.method(), r.pattern())))
            .finish()
    }
}

/// A compiled router. Shared read-only across every request.
pub struct RouterHandler {
    trees: HashMap<Method, MatchitRouter<Arc<Route>>>,
}

impl RouterHandler {
    /// Finds the route for `method` and `path`.
    ///
    /// Param values are percent-decoded. A value that is not UTF-8 once
    /// decoded still matches the route, with the failure in place of the map.
    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(Arc<Route>, Result<HashMap<String, String>, DecodeError>)> {
        let tree = self.trees.get(&method)?;
        let matched = tree.at(path).ok()?;
        Some((Arc::clone(matched.value), decode_params(&matched.params)))
    }
}

fn decode_params(params: &Params<'_, '_>) -> Result<HashMap<String, String>, DecodeError> {
    params
        .iter()
        .map(|(name, raw)| {
            let value = percent_decode_str(raw).decode_utf8().map_err(|_| {
                DecodeError::new(format!("`{name}` is not valid UTF-8 once percent-decoded"))
            })?;
            Ok::<_, DecodeError>((name.to_owned(), value.into_owned()))
        })
        .collect()
}

impl fmt::Debug for RouterHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterHandler").field("methods", &self.trees.len()).finish()
    }
}
