use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use waypoint::{Context, Dispatch, Response, RouterHandler, health, route, router};

fn text(pattern: &str, body: &'static str) -> waypoint::Route {
    route::get(pattern).handle(move |_ctx: Context| async move { Response::text(body) })
}

fn request(method: http::Method, uri: &str) -> http::Request<Full<Bytes>> {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Dispatches a request that must match, returning status and body.
async fn call(handler: &RouterHandler, method: http::Method, uri: &str) -> (StatusCode, Bytes) {
    match handler.dispatch(request(method, uri)).await.unwrap() {
        Dispatch::Handled(res) => {
            let status = res.status();
            (status, res.into_body().collect().await.unwrap().to_bytes())
        }
        Dispatch::Unmatched(req) => panic!("{} {} was not matched", req.method(), req.uri()),
    }
}

async fn matched(handler: &RouterHandler, method: http::Method, uri: &str) -> bool {
    handler.dispatch(request(method, uri)).await.unwrap().is_handled()
}

#[tokio::test]
async fn get_foo_returns_foo() {
    let handler = router([text("/foo", "foo")]).handler().unwrap();

    let (status, body) = call(&handler, http::Method::GET, "/foo").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "foo");
}

#[tokio::test]
async fn add_leaves_the_original_router_unchanged() {
    let base = router([text("/foo", "foo")]);
    let extended = base.add([text("/bar", "bar")]);

    let base_handler = base.handler().unwrap();
    let extended_handler = extended.handler().unwrap();

    assert!(!matched(&base_handler, http::Method::GET, "/bar").await);
    assert!(matched(&extended_handler, http::Method::GET, "/foo").await);
    assert!(matched(&extended_handler, http::Method::GET, "/bar").await);
}

#[tokio::test]
async fn merge_grouping_does_not_change_the_route_set() {
    let a = router([text("/a", "a")]);
    let b = router([text("/b", "b")]);
    let c = router([text("/c", "c")]);

    let left: Vec<_> = a.merge(&b).merge(&c).routes().map(|r| r.pattern().to_owned()).collect();
    let right: Vec<_> = a.merge(&b.merge(&c)).routes().map(|r| r.pattern().to_owned()).collect();

    assert_eq!(left, right);
    assert_eq!(left, ["/a", "/b", "/c"]);
}

#[tokio::test]
async fn first_registered_route_wins() {
    let handler = router([text("/dup", "first")]).add([text("/dup", "second")]).handler().unwrap();

    let (_, body) = call(&handler, http::Method::GET, "/dup").await;

    assert_eq!(body, "first");
}

#[tokio::test]
async fn static_segment_takes_precedence_over_a_parameter() {
    let handler = router([
        route::get("/users/{id}").handle(|ctx: Context| async move {
            format!("user {}", ctx.request().param("id").unwrap_or_default())
        }),
        text("/users/me", "me"),
    ])
    .handler()
    .unwrap();

    assert_eq!(call(&handler, http::Method::GET, "/users/me").await.1, "me");
    assert_eq!(call(&handler, http::Method::GET, "/users/7").await.1, "user 7");
}

#[tokio::test]
async fn methods_match_exactly() {
    let handler = router([
        text("/items", "list"),
        route::delete("/items/{id}").handle(|_ctx: Context| async { StatusCode::NO_CONTENT }),
    ])
    .handler()
    .unwrap();

    assert!(!matched(&handler, http::Method::POST, "/items").await);
    assert!(!matched(&handler, http::Method::HEAD, "/items").await);
    assert!(!matched(&handler, http::Method::GET, "/items/1").await);
    assert_eq!(call(&handler, http::Method::DELETE, "/items/1").await.0, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unmatched_paths_are_returned_to_the_host() {
    let handler = router([text("/foo", "foo")]).handler().unwrap();

    let dispatched = handler.dispatch(request(http::Method::GET, "/nope?x=1")).await.unwrap();

    let Dispatch::Unmatched(req) = dispatched else {
        panic!("/nope has no route");
    };
    assert_eq!(req.uri(), "/nope?x=1");
}

#[tokio::test]
async fn catch_all_captures_the_rest_of_the_path() {
    let handler = router([route::get("/files/{*path}").handle(|ctx: Context| async move {
        ctx.request().param("path").unwrap_or_default().to_owned()
    })])
    .handler()
    .unwrap();

    assert_eq!(call(&handler, http::Method::GET, "/files/a/b/c.txt").await.1, "a/b/c.txt");
}

#[tokio::test]
async fn health_routes_merge_into_an_application() {
    let app = router([text("/", "home")]).merge(&health::routes());
    let handler = app.handler().unwrap();

    assert_eq!(call(&handler, http::Method::GET, "/healthz").await, (StatusCode::OK, Bytes::from("ok")));
    assert_eq!(call(&handler, http::Method::GET, "/readyz").await, (StatusCode::OK, Bytes::from("ready")));
    assert_eq!(call(&handler, http::Method::GET, "/").await.1, "home");
}
