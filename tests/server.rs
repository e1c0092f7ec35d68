use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use waypoint::{Context, Error, Response, Server, route, router};

async fn start() -> (SocketAddr, oneshot::Sender<()>, JoinHandle<Result<(), Error>>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let app = router([
        route::get("/foo").handle(|_ctx: Context| async { Response::text("foo") }),
        route::get("/boom").handle(|ctx: Context| async move {
            if ctx.request().path() == "/boom" {
                panic!("handler blew up");
            }
            Response::no_content()
        }),
    ]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(
        Server::from_listener(listener).serve_with_shutdown(app, async {
            let _ = stopped.await;
        }),
    );
    (addr, stop, server)
}

async fn raw_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_matched_routes_over_http1() {
    let (addr, stop, server) = start().await;

    let response = raw_get(addr, "/foo").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.to_ascii_lowercase().contains("content-type: text/plain"), "{response}");
    assert!(response.ends_with("\r\n\r\nfoo"), "{response}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn unmatched_requests_get_404() {
    let (addr, stop, server) = start().await;

    let response = raw_get(addr, "/missing").await;

    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"), "{response}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn handler_panics_become_500() {
    let (addr, stop, server) = start().await;

    let response = raw_get(addr, "/boom").await;
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{response}");

    // The connection task survived the panic; the server keeps serving.
    let response = raw_get(addr, "/foo").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn invalid_route_fails_before_serving() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let app = router([route::get("/a/{*rest}/b").handle(|_ctx: Context| async { "x" })]);

    let result = Server::from_listener(listener)
        .serve_with_shutdown(app, std::future::pending())
        .await;

    assert!(matches!(result, Err(Error::Route { .. })));
}

#[test]
fn bad_bind_address_is_an_error() {
    let err = Server::bind("not-an-address").err().unwrap();
    assert!(matches!(err, Error::Addr { .. }), "{err}");
}
