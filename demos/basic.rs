//! Minimal weave example — one serverless entry point behind three units.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Each simulated invocation builds a request, hands it to the same chain and
//! prints the response the platform would send back.

use bytes::Bytes;
use http::{HeaderValue, StatusCode};
use weave::serverless::{Request, Response, error_response};
use weave::{Config, Error, Unit, chain, middleware};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weave=info".into()),
        )
        .init();

    // Built once, like a handler defined at module scope.
    let app = chain([
        middleware::trace("entry"),
        require_api_key(),
        tag_request_id(),
        middleware::log_errors("entry"),
        error_response(StatusCode::UNAUTHORIZED),
    ])
    .config(Config::from_env().with_name("greeter"))
    .handler(|req, res| Box::pin(async move { greet(req, res) }));

    for key in [Some("secret"), None] {
        let mut req = Request::default();
        if let Some(key) = key {
            req.headers_mut().insert("x-api-key", HeaderValue::from_static(key));
        }

        let res = app.invoke(req).await;
        println!(
            "{} {}",
            res.status(),
            String::from_utf8_lossy(res.body())
        );
    }
}

// Rejects the invocation before any real work happens.
fn require_api_key() -> Unit<Request, Response> {
    Unit::<Request, Response>::sync(|req, _res| match req.headers().get("x-api-key") {
        Some(v) if v == "secret" => Ok(()),
        Some(_) => Err(Error::msg("bad api key")),
        None => Err(Error::msg("missing api key")),
    })
}

// Continues after an await point, the way a unit that hits a cache or a
// secrets store would.
fn tag_request_id() -> Unit<Request, Response> {
    Unit::<Request, Response>::ordinary(|req, res, next| {
        Box::pin(async move {
            tokio::task::yield_now().await;
            res.headers_mut()
                .insert("x-request-id", HeaderValue::from_static("req-0001"));
            next.run(req, res).await;
            Ok(())
        })
    })
}

fn greet(_req: &mut Request, res: &mut Response) {
    *res.body_mut() = Bytes::from_static(b"hello from weave");
}
