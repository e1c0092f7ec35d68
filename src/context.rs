//! Per-request context threaded through a middleware chain.
//!
//! A [`Context`] starts out holding only the raw [`Request`]. Each middleware
//! that continues the chain returns a set of [`Fields`]; the executor merges
//! them into a *new* context for the next step. Fields are keyed by their Rust
//! type, so a field is read back with the type it was stored as:
//!
//! ```rust,ignore
//! struct User { id: u64 }
//!
//! // in an auth middleware
//! Outcome::next(Fields::new().with(User { id: 7 }))
//!
//! // later, in the handler
//! let user = ctx.get::<User>().expect("auth middleware runs first");
//! ```
//!
//! Decoded parser output lands under the source-specific wrappers
//! [`RouteParams`], [`Query`], [`Body`] and [`Headers`].

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::request::Request;

type Field = Arc<dyn Any + Send + Sync>;

/// The accumulated, per-request set of values visible to middleware and handlers.
///
/// Cloning is shallow: values are reference-counted and never mutated.
#[derive(Clone)]
pub struct Context {
    request: Arc<Request>,
    fields: HashMap<TypeId, Field>,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self { request: Arc::new(request), fields: HashMap::new() }
    }

    /// The raw request handle.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// A field contributed earlier in the chain.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.fields.get(&TypeId::of::<T>())?.downcast_ref()
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.fields.contains_key(&TypeId::of::<T>())
    }

    /// Number of contributed fields (the raw request is not counted).
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Route parameters decoded by a `parser::params` step.
    pub fn route_params<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.get::<RouteParams<T>>().map(|p| &p.0)
    }

    /// Query string decoded by a `parser::query` step.
    pub fn query<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.get::<Query<T>>().map(|q| &q.0)
    }

    /// Request body decoded by a `parser::body` step.
    pub fn body<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.get::<Body<T>>().map(|b| &b.0)
    }

    /// Headers decoded by a `parser::headers` step.
    pub fn headers<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.get::<Headers<T>>().map(|h| &h.0)
    }

    /// Returns the context extended with `fields`.
    ///
    /// A field of a type already present replaces the old value; that is
    /// logged, never silent. All other fields are carried over untouched.
    pub(crate) fn merge(mut self, fields: Fields) -> Self {
        for entry in fields.entries {
            if self.fields.insert(entry.id, entry.value).is_some() {
                warn!(field = entry.name, "context field replaced by a later middleware");
            }
        }
        self
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.request.method())
            .field("path", &self.request.path())
            .field("fields", &self.fields.len())
            .finish()
    }
}

// ── Fields ────────────────────────────────────────────────────────────────────

struct Entry {
    id: TypeId,
    name: &'static str,
    value: Field,
}

/// Additional context fields contributed by one middleware step.
#[derive(Default)]
pub struct Fields {
    entries: Vec<Entry>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, keyed by its type. Within one `Fields` the last value of
    /// a type wins.
    pub fn with<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.entries.push(Entry {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            value: Arc::new(value),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter().map(|e| e.name)).finish()
    }
}

// ── Decoded input keys ────────────────────────────────────────────────────────

/// Decoded URL parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteParams<T>(pub T);

/// Decoded query string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query<T>(pub T);

/// Decoded request body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Body<T>(pub T);

/// Decoded request headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Headers<T>(pub T);

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn ctx() -> Context {
        Context::new(Request::from(http::Request::get("/").body(Bytes::new()).unwrap()))
    }

    #[derive(Debug, PartialEq)]
    struct UserId(u64);

    #[test]
    fn merge_adds_fields_and_leaves_the_rest() {
        let base = ctx().merge(Fields::new().with(UserId(1)));
        let next = base.clone().merge(Fields::new().with("tenant-a"));

        assert_eq!(base.len(), 1);
        assert_eq!(next.len(), 2);
        assert_eq!(next.get::<UserId>(), Some(&UserId(1)));
        assert_eq!(next.get::<&'static str>(), Some(&"tenant-a"));
        assert!(!base.contains::<&'static str>());
    }

    #[test]
    fn later_field_of_same_type_wins() {
        let ctx = ctx()
            .merge(Fields::new().with(UserId(1)))
            .merge(Fields::new().with(UserId(2)));
        assert_eq!(ctx.get::<UserId>(), Some(&UserId(2)));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn decoded_accessors_unwrap_their_keys() {
        let ctx = ctx().merge(
            Fields::new()
                .with(Query(5u8))
                .with(Body("payload".to_owned()))
                .with(RouteParams(UserId(9)))
                .with(Headers(true)),
        );
        assert_eq!(ctx.query::<u8>(), Some(&5));
        assert_eq!(ctx.body::<String>().map(String::as_str), Some("payload"));
        assert_eq!(ctx.route_params::<UserId>(), Some(&UserId(9)));
        assert_eq!(ctx.headers::<bool>(), Some(&true));
        assert_eq!(ctx.query::<u16>(), None);
    }

    #[test]
    fn empty_fields() {
        let fields = Fields::new();
        assert!(fields.is_empty());
        assert!(ctx().merge(fields).is_empty());
    }
}
