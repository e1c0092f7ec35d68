//! Route handlers and their type-erased storage.
//!
//! Routes of one router are stored side by side, so each handler is boxed
//! behind one object-safe trait:
//!
//! ```text
//! async fn show(ctx: Context) -> Response      route::get("/x").handle(show)
//!                 │                                   │
//!                 └──── Handler::into_boxed_handler ◀─┘
//!                                │
//!                   Arc<FnHandler<show>> as BoxedHandler
//!                                │
//!           chain completes ──▶ call(ctx) ──▶ show(ctx).await.into_response()
//! ```

use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::middleware::BoxFuture;
use crate::response::{IntoResponse, Response};

/// Object-safe form of [`Handler`]. Public only because it names the return
/// type of [`Handler::into_boxed_handler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: Context) -> BoxFuture<'static, Response>;
}

/// A type-erased handler shared by every request hitting its route.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Anything a route can end in.
///
/// Sealed, and implemented for every `async fn` or closure shaped like:
///
/// ```text
/// async fn name(ctx: Context) -> impl IntoResponse
/// ```
///
/// The handler sees the fully accumulated context: the raw request plus
/// everything the route's parsers and middleware contributed.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture<'static, Response> {
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await.into_response() })
    }
}
