//! Minimal waypoint example: typed parsers, an auth chain with cleanup, and
//! health probes.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/abc                      # 400 Invalid params
//!   curl -X POST http://localhost:3000/users \
//!        -H 'x-api-key: demo' -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl -X POST http://localhost:3000/users -d '{}'           # 401
//!   curl 'http://localhost:3000/search?q=rust&limit=5'
//!   curl http://localhost:3000/healthz

use std::time::Instant;

use http::StatusCode;
use serde::Deserialize;
use tracing::info;
use waypoint::middleware::{self, Outcome};
use waypoint::{Context, Fields, Response, Server, health, parser, route, router};

#[derive(Deserialize)]
struct UserId {
    id: u64,
}

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

#[derive(Deserialize)]
struct Search {
    q: String,
    #[serde(default)]
    limit: Option<u32>,
}

struct Caller(String);

#[tokio::main]
async fn main() -> Result<(), waypoint::Error> {
    tracing_subscriber::fmt::init();

    // Every route started from `authed` checks the key and times itself.
    let authed = route::pipeline()
        .with(middleware::from_fn(|ctx: Context| async move {
            match ctx.request().header("x-api-key") {
                Some(key) => Outcome::next(Fields::new().with(Caller(key.to_owned()))),
                None => Outcome::stop(Response::unauthorized()),
            }
        }).responds(StatusCode::UNAUTHORIZED))
        .with(middleware::from_fn(|ctx: Context| async move {
            let started = Instant::now();
            let path = ctx.request().path().to_owned();
            Outcome::next_with(Fields::new(), move || {
                info!(path, elapsed_us = started.elapsed().as_micros() as u64, "authed request done");
            })
        }));

    let app = router([
        route::get("/users/{id}")
            .with(parser::params::<UserId>())
            .responds([StatusCode::OK])
            .handle(get_user),
        route::get("/search")
            .with(parser::query::<Search>())
            .handle(search),
        authed
            .post("/users")
            .with(parser::body::<NewUser>())
            .responds([StatusCode::CREATED])
            .handle(create_user),
    ])
    .merge(&health::routes());

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

// GET /users/{id}
async fn get_user(ctx: Context) -> Response {
    let id = ctx.route_params::<UserId>().map_or(0, |p| p.id);
    Response::json(format!(r#"{{"id":{id},"name":"alice"}}"#))
}

// GET /search?q=..&limit=..
async fn search(ctx: Context) -> String {
    match ctx.query::<Search>() {
        Some(s) => format!("searching {:?}, limit {}", s.q, s.limit.unwrap_or(10)),
        None => String::new(),
    }
}

// POST /users
async fn create_user(ctx: Context) -> Response {
    let caller = ctx.get::<Caller>().map_or("?", |c| c.0.as_str());
    let name = ctx.body::<NewUser>().map_or("", |u| u.name.as_str());
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(format!(r#"{{"id":99,"name":"{name}","created_by":"{caller}"}}"#))
}
