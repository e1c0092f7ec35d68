//! The chain executor.
//!
//! Runs a route's middleware strictly in order, threading the context through
//! and collecting finalizers, then the handler. Finalizers always run once
//! the outcome is known, most recently registered first:
//!
//! ```text
//! mw1 ─Next(f1)─▶ mw2 ─Next(f2)─▶ mw3 ─Stop(401)─┐
//!                                                 ▼
//!                                      f2, then f1, then 401 is returned
//! ```
//!
//! A panic in a middleware or the handler is not turned into a response here.
//! It is held just long enough to run the finalizers registered so far, then
//! resumed so the dispatch boundary sees it unchanged.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, trace, warn};

use crate::context::Context;
use crate::handler::BoxedHandler;
use crate::middleware::{Finalizer, Middleware, Outcome};
use crate::response::Response;

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

pub(crate) async fn run(
    middleware: &[BoxedMiddleware],
    handler: &BoxedHandler,
    mut ctx: Context,
) -> Response {
    let mut finalizers = Finalizers::default();

    for (index, step) in middleware.iter().enumerate() {
        let call = async { step.call(ctx.clone()).await };
        let outcome = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                finalizers.run();
                panic::resume_unwind(payload);
            }
        };

        match outcome {
            Outcome::Stop(response) => {
                debug!(
                    middleware = step.name(),
                    index,
                    status = %response.status(),
                    "middleware stopped the chain",
                );
                finalizers.run();
                return response;
            }
            Outcome::Next { fields, finalizer } => {
                trace!(middleware = step.name(), index, fields = fields.len(), "middleware continued");
                ctx = ctx.merge(fields);
                if let Some(finalizer) = finalizer {
                    finalizers.push(finalizer);
                }
            }
        }
    }

    let result = AssertUnwindSafe(async move { handler.call(ctx).await }).catch_unwind().await;
    finalizers.run();
    result.unwrap_or_else(|payload| panic::resume_unwind(payload))
}

/// LIFO stack of registered finalizers.
///
/// Dropping it runs whatever is left, which covers a request future that is
/// cancelled between two steps.
#[derive(Default)]
struct Finalizers(Vec<Finalizer>);

impl Finalizers {
    fn push(&mut self, finalizer: Finalizer) {
        self.0.push(finalizer);
    }

    fn run(&mut self) {
        while let Some(finalizer) = self.0.pop() {
            if let Err(payload) = finalizer.run() {
                warn!(reason = panic_message(&*payload), "finalizer panicked; ignoring");
            }
        }
    }
}

impl Drop for Finalizers {
    fn drop(&mut self) {
        self.run();
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}
