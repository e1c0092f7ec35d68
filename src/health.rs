//! Built-in health probe routes.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? |
//! | **Readiness** | `/readyz` | Can it serve traffic? |
//!
//! Merge them into an application router:
//!
//! ```rust
//! use waypoint::{Context, health, route, router};
//!
//! let app = router([route::get("/").handle(|_ctx: Context| async { "home" })])
//!     .merge(&health::routes());
//! assert_eq!(app.len(), 3);
//! ```
//!
//! To gate readiness on dependencies, register your own `/readyz` route
//! instead and merge only [`liveness`]:
//!
//! ```rust
//! use waypoint::{Context, Response, health, route, router};
//!
//! async fn readiness(_ctx: Context) -> Response {
//!     if dependencies_are_healthy().await {
//!         Response::text("ready")
//!     } else {
//!         Response::new(http::StatusCode::SERVICE_UNAVAILABLE)
//!     }
//! }
//!
//! async fn dependencies_are_healthy() -> bool { true }
//!
//! let probes = router([
//!     route::get("/healthz").handle(health::liveness),
//!     route::get("/readyz").handle(readiness),
//! ]);
//! ```

use http::StatusCode;

use crate::context::Context;
use crate::response::Response;
use crate::route;
use crate::router::{Router, router};

/// `GET /healthz` and `GET /readyz` with the default handlers.
pub fn routes() -> Router {
    router([
        route::get("/healthz").responds([StatusCode::OK]).handle(liveness),
        route::get("/readyz").responds([StatusCode::OK]).handle(readiness),
    ])
}

/// Liveness probe. Always `200 OK` with body `"ok"`.
pub async fn liveness(_ctx: Context) -> Response {
    Response::text("ok")
}

/// Default readiness probe. Always `200 OK` with body `"ready"`.
pub async fn readiness(_ctx: Context) -> Response {
    Response::text("ready")
}
