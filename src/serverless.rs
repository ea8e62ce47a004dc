//! Binding to the `http` crate's request/response types.
//!
//! Serverless HTTP runtimes hand an entry point an owned request and expect an
//! owned response back. Express-style units instead share one response that
//! each of them may write to. [`Chain::invoke`] bridges the two: it creates a
//! blank `200 OK` response, runs the chain over the pair, and returns whatever
//! the units and the handler left in it.
//!
//! ```rust
//! use weave::serverless::{Request, Response, error_response};
//! use weave::{Error, Unit, chain};
//! use http::{HeaderValue, StatusCode};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let app = chain([
//!     Unit::<Request, Response>::sync(|req, _| match req.headers().get("x-api-key") {
//!         Some(_) => Ok(()),
//!         None => Err(Error::msg("missing api key")),
//!     }),
//!     error_response(StatusCode::UNAUTHORIZED),
//! ])
//! .handler(|_req, res| Box::pin(async move {
//!     *res.body_mut() = "hello".into();
//! }));
//!
//! let res = app.invoke(Request::default()).await;
//! assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
//! assert_eq!(&res.body()[..], b"missing api key");
//!
//! let mut req = Request::default();
//! req.headers_mut().insert("x-api-key", HeaderValue::from_static("k"));
//! let res = app.invoke(req).await;
//! assert_eq!(res.status(), StatusCode::OK);
//! assert_eq!(&res.body()[..], b"hello");
//! # }
//! ```

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::StatusCode;

use crate::chain::Chain;
use crate::unit::Unit;

/// An incoming request with a fully buffered body.
pub type Request = http::Request<Bytes>;

/// The response units and the handler write into.
pub type Response = http::Response<Bytes>;

impl Chain<Request, Response> {
    /// Runs one invocation and returns the response it produced.
    pub async fn invoke(&self, mut req: Request) -> Response {
        let mut res = Response::default();
        self.call(&mut req, &mut res).await;
        res
    }
}

/// Error-handling unit that answers with `status` and the error message as a
/// plain-text body. Absorbs the error; nothing after it runs.
pub fn error_response(status: StatusCode) -> Unit<Request, Response> {
    Unit::<Request, Response>::error_handler(move |err, _req, res, _next| {
        *res.status_mut() = status;
        res.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        *res.body_mut() = Bytes::from(err.to_string());
        Box::pin(async {})
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::chain;
    use crate::error::Error;

    #[tokio::test]
    async fn error_response_writes_status_type_and_message() {
        let app = chain([
            Unit::<Request, Response>::sync(|_, _| Err(Error::msg("quota exhausted"))),
            error_response(StatusCode::TOO_MANY_REQUESTS),
        ])
        .handler(|_req, res| Box::pin(async move {
            *res.body_mut() = Bytes::from_static(b"unreachable");
        }));

        let res = app.invoke(Request::default()).await;

        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            res.headers().get(CONTENT_TYPE).map(HeaderValue::as_bytes),
            Some(&b"text/plain; charset=utf-8"[..])
        );
        assert_eq!(&res.body()[..], b"quota exhausted");
    }
}
