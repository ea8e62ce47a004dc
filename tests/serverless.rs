//! The `http` binding as a serverless entry point would use it.

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, StatusCode};
use weave::serverless::{Request, Response, error_response};
use weave::{Chain, Error, Unit, chain, middleware};

type U = Unit<Request, Response>;

fn only_post() -> U {
    U::sync(|req, _res| {
        if *req.method() == Method::POST {
            Ok(())
        } else {
            Err(Error::msg(format!("{} not allowed", req.method())))
        }
    })
}

fn tag_header() -> U {
    U::sync(|req, _res| {
        req.headers_mut().insert("x-foo", HeaderValue::from_static("foo"));
        Ok(())
    })
}

fn app() -> Chain<Request, Response> {
    chain([
        middleware::trace("entry"),
        only_post(),
        tag_header(),
        middleware::log_errors("entry"),
        error_response(StatusCode::METHOD_NOT_ALLOWED),
    ])
    .handler(|req, res| {
        Box::pin(async move {
            let echoed = req.headers().get("x-foo").cloned();
            if let Some(value) = echoed {
                res.headers_mut().insert("x-foo", value);
            }
            *res.body_mut() = Bytes::from_static(b"bar");
        })
    })
}

fn request(method: Method) -> Request {
    let mut req = Request::default();
    *req.method_mut() = method;
    req
}

#[tokio::test]
async fn handler_sees_what_units_wrote_on_the_request() {
    let res = app().invoke(request(Method::POST)).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("x-foo").map(HeaderValue::as_bytes), Some(&b"foo"[..]));
    assert_eq!(&res.body()[..], b"bar");
}

#[tokio::test]
async fn error_response_answers_for_the_chain() {
    let res = app().invoke(request(Method::GET)).await;

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        res.headers().get(CONTENT_TYPE).map(HeaderValue::as_bytes),
        Some(&b"text/plain; charset=utf-8"[..])
    );
    assert_eq!(&res.body()[..], b"GET not allowed");
    assert!(res.headers().get("x-foo").is_none());
}

#[tokio::test]
async fn unabsorbed_error_leaves_the_default_response() {
    let app = chain([only_post()]).handler(|_req, res| {
        Box::pin(async move {
            *res.body_mut() = Bytes::from_static(b"unreachable");
        })
    });

    let res = app.invoke(request(Method::DELETE)).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.body().is_empty());
}
