//! # weave
//!
//! Express-style middleware chains for serverless functions that live for
//! exactly one request.
//!
//! ## The contract
//!
//! A serverless platform calls your entry point with a request and a
//! response, once. There is no router to hang middleware on and no server
//! loop to own it. weave takes an ordered list of units and a terminal
//! handler and gives back one function of `(req, res)`.
//!
//! What the platform owns — weave intentionally ignores:
//!
//! - **Routing** — one function, one route
//! - **HTTP parsing and connections** — you get a request object, not bytes
//! - **Retries and timeouts** — the platform's invocation settings
//!
//! What's left for weave:
//!
//! - Run units in order, each one deciding to continue, stop, or fail
//! - Route failures past ordinary units to the next error handler
//! - Call the handler once, only if the chain got all the way through
//!
//! ## Quick start
//!
//! ```rust
//! use weave::{Error, Unit, chain};
//!
//! #[derive(Default)]
//! struct Req { user: Option<&'static str> }
//! #[derive(Default)]
//! struct Res { status: u16, body: String }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let app = chain([
//!     Unit::<Req, Res>::sync(|req, _| {
//!         req.user.map(|_| ()).ok_or_else(|| Error::msg("no user"))
//!     }),
//!     Unit::<Req, Res>::error_handler(|err, _req, res, _next| Box::pin(async move {
//!         res.status = 401;
//!         res.body = err.to_string();
//!     })),
//! ])
//! .handler(|req, res| Box::pin(async move {
//!     res.status = 200;
//!     res.body = format!("hello {}", req.user.unwrap_or_default());
//! }));
//!
//! let (mut req, mut res) = (Req { user: Some("ada") }, Res::default());
//! app.call(&mut req, &mut res).await;
//! assert_eq!(res.body, "hello ada");
//!
//! let (mut req, mut res) = (Req::default(), Res::default());
//! app.call(&mut req, &mut res).await;
//! assert_eq!((res.status, res.body.as_str()), (401, "no user"));
//! # }
//! ```

mod chain;
mod compose;
mod config;
mod error;
mod next;
mod unit;

pub mod middleware;
pub mod serverless;

pub use chain::{Chain, ChainBuilder, attach, chain};
pub use compose::compose;
pub use config::{Config, UNHANDLED_ENV, Unhandled};
pub use error::Error;
pub use next::{BoxFuture, Next};
pub use unit::Unit;

#[doc(hidden)]
pub use chain::HandlerFn;
#[doc(hidden)]
pub use unit::{ErrorFn, OrdinaryFn};
