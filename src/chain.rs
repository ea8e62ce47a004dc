//! Attaching a terminal handler and invoking the result.
//!
//! # One invocation
//!
//! ```text
//! chain.call(&mut req, &mut res)
//!   └─ composed units ── next.run ──▶ terminal handler(req, res)
//!                    └─ next.fail ─▶ Unhandled::Abort   → logged, handler skipped
//!                                    Unhandled::Proceed → logged, handler runs
//! ```
//!
//! The returned future resolves when the last unit that ran has finished,
//! whether or not the handler was reached. A unit that never continues ends
//! the invocation there; nothing in this crate times it out.
//!
//! Panics from error-handling units, from the handler, or from a unit that
//! already continued are not turned into errors. They leave `call` with
//! their original payload.

use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt as _;
use tracing::{Instrument as _, debug, debug_span, error, warn};

use crate::compose::{fold, original_payload};
use crate::config::{Config, Unhandled};
use crate::error::Error;
use crate::next::{BoxFuture, Next};
use crate::unit::{OrdinaryFn, Unit};

/// The terminal handler: `(req, res) -> ()`, possibly async.
#[doc(hidden)]
pub type HandlerFn<Req, Res> =
    Arc<dyn for<'r> Fn(&'r mut Req, &'r mut Res) -> BoxFuture<'r, ()> + Send + Sync + 'static>;

// ── attach / chain ────────────────────────────────────────────────────────────

/// Attaches `handler` after `unit`, using the default [`Config`].
///
/// `unit` is usually the result of [`compose`](crate::compose); any unit
/// works, an error-handling one is simply skipped.
pub fn attach<Req, Res, F>(unit: Unit<Req, Res>, handler: F) -> Chain<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
    F: for<'r> Fn(&'r mut Req, &'r mut Res) -> BoxFuture<'r, ()> + Send + Sync + 'static,
{
    Chain {
        unit: fold([unit]),
        handler: Arc::new(handler),
        config: Config::new(),
    }
}

/// Starts a chain from an ordered list of units.
///
/// ```rust
/// use weave::{Unhandled, Unit, chain};
///
/// #[derive(Default)]
/// struct Req { trail: Vec<&'static str> }
/// #[derive(Default)]
/// struct Res { body: String }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let app = chain([
///     Unit::<Req, Res>::sync(|req, _| { req.trail.push("auth"); Ok(()) }),
///     Unit::<Req, Res>::sync(|req, _| { req.trail.push("parse"); Ok(()) }),
/// ])
/// .unhandled(Unhandled::Abort)
/// .handler(|req, res| Box::pin(async move {
///     res.body = req.trail.join(",");
/// }));
///
/// let (mut req, mut res) = (Req::default(), Res::default());
/// app.call(&mut req, &mut res).await;
/// assert_eq!(res.body, "auth,parse");
/// # }
/// ```
pub fn chain<Req, Res, I>(units: I) -> ChainBuilder<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
    I: IntoIterator<Item = Unit<Req, Res>>,
{
    ChainBuilder { unit: fold(units), config: Config::new() }
}

// ── ChainBuilder ──────────────────────────────────────────────────────────────

/// Composed units waiting for their terminal handler.
///
/// Obtain via [`chain`]. Terminated by [`handler`](ChainBuilder::handler).
pub struct ChainBuilder<Req, Res> {
    unit: OrdinaryFn<Req, Res>,
    config: Config,
}

impl<Req, Res> ChainBuilder<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    pub fn name(mut self, name: &'static str) -> Self {
        self.config = self.config.with_name(name);
        self
    }

    pub fn unhandled(mut self, policy: Unhandled) -> Self {
        self.config = self.config.with_unhandled(policy);
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Attaches the terminal handler.
    pub fn handler<F>(self, handler: F) -> Chain<Req, Res>
    where
        F: for<'r> Fn(&'r mut Req, &'r mut Res) -> BoxFuture<'r, ()> + Send + Sync + 'static,
    {
        Chain { unit: self.unit, handler: Arc::new(handler), config: self.config }
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// Units plus a terminal handler: the function a serverless entry point calls.
///
/// Immutable and cheap to clone. Build it once, call it for every invocation;
/// concurrent calls share nothing but the `Arc`'d functions.
pub struct Chain<Req, Res> {
    unit: OrdinaryFn<Req, Res>,
    handler: HandlerFn<Req, Res>,
    config: Config,
}

impl<Req, Res> Chain<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one invocation over `req` and `res`.
    pub fn call<'r>(&self, req: &'r mut Req, res: &'r mut Res) -> BoxFuture<'r, ()> {
        let unit = Arc::clone(&self.unit);
        let handler = Arc::clone(&self.handler);
        let policy = self.config.unhandled;
        let span = debug_span!("chain", name = self.config.name);

        // Set once control falls off the last unit, error or not.
        let settled = Arc::new(AtomicBool::new(false));
        let tail = {
            let settled = Arc::clone(&settled);
            Next::new(move |err, req, res| {
                settled.store(true, Ordering::Release);
                finish(&handler, policy, err, req, res)
            })
        };

        Box::pin(
            async move {
                let outcome = AssertUnwindSafe(unit(req, res, tail)).catch_unwind().await;
                match outcome {
                    Ok(result) => debug_assert!(result.is_ok()),
                    Err(payload) => resume_unwind(original_payload(payload)),
                }
                if !settled.load(Ordering::Acquire) {
                    debug!("chain ended before reaching the handler");
                }
            }
            .instrument(span),
        )
    }
}

impl<Req, Res> Clone for Chain<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            unit: Arc::clone(&self.unit),
            handler: Arc::clone(&self.handler),
            config: self.config,
        }
    }
}

/// The terminal continuation: apply the unhandled-error policy, then maybe
/// run the handler.
fn finish<'r, Req, Res>(
    handler: &HandlerFn<Req, Res>,
    policy: Unhandled,
    err: Option<Error>,
    req: &'r mut Req,
    res: &'r mut Res,
) -> BoxFuture<'r, ()> {
    let Some(err) = err else {
        return handler(req, res);
    };
    match policy {
        Unhandled::Abort => {
            error!(error = %err, panic = err.is_panic(), "unhandled error; handler skipped");
            Box::pin(async {})
        }
        Unhandled::Proceed => {
            warn!(error = %err, panic = err.is_panic(), "unhandled error; running handler anyway");
            handler(req, res)
        }
    }
}
