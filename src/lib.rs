//! # waypoint
//!
//! Typed route pipelines on top of hyper.
//!
//! A route is a method, a path pattern, an ordered chain of middleware and a
//! handler. Each chain step sees everything the steps before it produced, and
//! either continues with more fields or stops with a response. Parsers are
//! chain steps too: they decode params, query, body or headers into your
//! types, or stop with `400 Bad Request`. Cleanup registered along the way
//! runs exactly once, in reverse, whatever the outcome.
//!
//! What waypoint owns:
//!
//! - The chain executor: in-order steps, short-circuit, LIFO finalizers
//! - Typed decoding of request inputs with serde
//! - Immutable, composable route sets compiled to radix trees via [`matchit`]
//! - A hyper host server with graceful shutdown
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde::Deserialize;
//! use waypoint::{Context, Response, Server, health, parser, route, router};
//!
//! #[derive(Deserialize)]
//! struct UserId { id: u64 }
//!
//! #[derive(Deserialize)]
//! struct NewUser { name: String }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), waypoint::Error> {
//!     let app = router([
//!         route::get("/users/{id}").with(parser::params::<UserId>()).handle(get_user),
//!         route::post("/users").with(parser::body::<NewUser>()).handle(create_user),
//!     ])
//!     .merge(&health::routes());
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn get_user(ctx: Context) -> Response {
//!     let id = ctx.route_params::<UserId>().map_or(0, |p| p.id);
//!     Response::json(format!(r#"{{"id":{id}}}"#))
//! }
//!
//! async fn create_user(ctx: Context) -> Response {
//!     let name = ctx.body::<NewUser>().map_or("", |u| u.name.as_str());
//!     Response::builder()
//!         .status(http::StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .text(format!("created {name}"))
//! }
//! ```

mod context;
mod dispatch;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod health;
pub mod middleware;
pub mod parser;
pub mod route;

pub use context::{Body, Context, Fields, Headers, Query, RouteParams};
pub use dispatch::Dispatch;
pub use error::{BoxError, DecodeError, Error};
pub use handler::Handler;
pub use method::Method;
pub use middleware::{Middleware, Outcome};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use route::{Pipeline, Route, RouteBuilder, RouteHandler};
pub use router::{Router, RouterHandler, router};
pub use server::Server;
