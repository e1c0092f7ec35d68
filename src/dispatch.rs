//! The dispatch adapter between a host HTTP stack and a compiled router.
//!
//! Matching happens on method and path alone, before the body is touched, so
//! a request no route claims is handed back to the caller exactly as it came
//! in. What the host does with it (a 404, another router, a static file
//! service) is its own business.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use tracing::{Instrument, debug, debug_span, trace};

use crate::error::{BoxError, Error};
use crate::method::Method;
use crate::parser::{self, Source};
use crate::request::Request;
use crate::router::RouterHandler;

/// What became of one request offered to a [`RouterHandler`].
#[derive(Debug)]
pub enum Dispatch<B> {
    /// A route matched and produced this response.
    Handled(http::Response<Full<Bytes>>),
    /// No route matched. The request is returned untouched.
    Unmatched(http::Request<B>),
}

impl<B> Dispatch<B> {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled(_))
    }
}

impl RouterHandler {
    /// Offers one request to the compiled routes.
    ///
    /// On a match the body is collected, the route's chain and handler run,
    /// and the response is returned. A body that fails to read is an
    /// [`Error::Body`]. A panic in the chain propagates once the route's
    /// finalizers have run.
    pub async fn dispatch<B>(&self, req: http::Request<B>) -> Result<Dispatch<B>, Error>
    where
        B: hyper::body::Body,
        B::Error: Into<BoxError>,
    {
        let matched = Method::try_from(req.method())
            .ok()
            .and_then(|method| self.lookup(method, req.uri().path()));

        let Some((route, params)) = matched else {
            trace!(method = %req.method(), path = req.uri().path(), "no route matched");
            return Ok(Dispatch::Unmatched(req));
        };

        let span = debug_span!("dispatch", method = %req.method(), path = req.uri().path());
        async move {
            let params = match params {
                Ok(params) => params,
                Err(e) => return Ok(Dispatch::Handled(parser::rejection(Source::Params, &e).into_http())),
            };
            let (parts, body) = req.into_parts();
            let body = body.collect().await.map_err(|e| Error::Body(e.into()))?.to_bytes();

            debug!(pattern = route.pattern(), params = params.len(), "route matched");
            let request = Request::from_parts(parts, body).with_params(params);
            let response = route.run(request).await;

            debug!(status = %response.status(), "route responded");
            Ok(Dispatch::Handled(response.into_http()))
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use http::StatusCode;
    use http_body_util::StreamBody;
    use hyper::body::Frame;

    use super::*;
    use crate::context::Context;
    use crate::response::Response;
    use crate::route;
    use crate::router::router;

    fn handler() -> RouterHandler {
        router([
            route::get("/users/{id}").handle(|ctx: Context| async move {
                Response::text(ctx.request().param("id").unwrap_or_default().to_owned())
            }),
            route::post("/echo").handle(|ctx: Context| async move {
                Response::ok(ctx.request().body().clone())
            }),
        ])
        .handler()
        .unwrap()
    }

    async fn body_of(res: http::Response<Full<Bytes>>) -> Bytes {
        res.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn matched_request_is_handled_with_params() {
        let req = http::Request::get("/users/42").body(Full::new(Bytes::new())).unwrap();
        match handler().dispatch(req).await.unwrap() {
            Dispatch::Handled(res) => {
                assert_eq!(res.status(), StatusCode::OK);
                assert_eq!(body_of(res).await, "42");
            }
            Dispatch::Unmatched(_) => panic!("expected a match"),
        }
    }

    #[tokio::test]
    async fn body_is_collected_before_the_chain_runs() {
        let req = http::Request::post("/echo").body(Full::new(Bytes::from("ping"))).unwrap();
        match handler().dispatch(req).await.unwrap() {
            Dispatch::Handled(res) => assert_eq!(body_of(res).await, "ping"),
            Dispatch::Unmatched(_) => panic!("expected a match"),
        }
    }

    #[tokio::test]
    async fn unmatched_request_comes_back_untouched() {
        let req = http::Request::put("/users/42")
            .header("x-trace", "abc")
            .body(Full::new(Bytes::from("payload")))
            .unwrap();

        let Dispatch::Unmatched(req) = handler().dispatch(req).await.unwrap() else {
            panic!("PUT has no route");
        };
        assert_eq!(req.method(), http::Method::PUT);
        assert_eq!(req.headers()["x-trace"], "abc");
        assert_eq!(body_of_request(req).await, "payload");
    }

    #[tokio::test]
    async fn params_are_percent_decoded() {
        let req = http::Request::get("/users/ada%20lovelace").body(Full::new(Bytes::new())).unwrap();
        let Dispatch::Handled(res) = handler().dispatch(req).await.unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(body_of(res).await, "ada lovelace");
    }

    #[tokio::test]
    async fn param_that_is_not_utf8_is_a_400() {
        let req = http::Request::get("/users/%C3%28").body(Full::new(Bytes::new())).unwrap();
        let Dispatch::Handled(res) = handler().dispatch(req).await.unwrap() else {
            panic!("expected a match");
        };
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_of(res).await;
        assert!(body.starts_with(b"Invalid params: "), "{body:?}");
    }

    #[tokio::test]
    async fn unknown_method_is_unmatched() {
        let method = http::Method::from_bytes(b"PURGE").unwrap();
        let req = http::Request::builder()
            .method(method)
            .uri("/users/1")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert!(!handler().dispatch(req).await.unwrap().is_handled());
    }

    #[tokio::test]
    async fn body_read_failure_is_an_error() {
        let frames = futures::stream::iter([
            Ok::<_, std::io::Error>(Frame::data(Bytes::from("par"))),
            Err(std::io::Error::other("connection reset")),
        ]);
        let req = http::Request::post("/echo").body(StreamBody::new(frames)).unwrap();

        let Err(err) = handler().dispatch(req).await else {
            panic!("expected a body read error");
        };
        assert!(matches!(err, Error::Body(_)), "{err}");
    }

    async fn body_of_request(req: http::Request<Full<Bytes>>) -> Bytes {
        let body: Result<_, Infallible> = req.into_body().collect().await;
        body.unwrap().to_bytes()
    }
}
