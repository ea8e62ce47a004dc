//! The continuation a unit consumes to hand control back to the chain.
//!
//! Every unit receives its own [`Next`], bound to *its* successor. Calling
//! it is the only way forward:
//!
//! ```text
//! next.run(req, res)        → the following ordinary unit (or the handler)
//! next.fail(err, req, res)  → the following error-handling unit
//! drop(next)                → nothing; the chain stops here
//! ```
//!
//! `Next` is consumed by value, so a unit can continue at most once. The
//! request and response travel with the call as `&mut` borrows: the unit
//! lends them to its successor and gets them back when the returned future
//! completes, which is what lets a unit do work *after* downstream finishes.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::Error;

/// A heap-allocated, type-erased future borrowing the request/response for `'a`.
///
/// `Send` so a chain can be driven from any multi-threaded executor.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The boxed one-shot closure behind a [`Next`].
///
/// Higher-ranked over `'r`: the continuation owns nothing borrowed, so it
/// accepts whatever borrow of the request/response the current unit holds.
type Continuation<Req, Res> = Box<
    dyn for<'r> FnOnce(Option<Error>, &'r mut Req, &'r mut Res) -> BoxFuture<'r, ()> + Send,
>;

/// Continuation handed to every unit.
pub struct Next<Req, Res> {
    cont: Continuation<Req, Res>,
}

impl<Req, Res> Next<Req, Res> {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: for<'r> FnOnce(Option<Error>, &'r mut Req, &'r mut Res) -> BoxFuture<'r, ()>
            + Send
            + 'static,
    {
        Self { cont: Box::new(f) }
    }

    /// Proceed normally: error-handling units are skipped until the next
    /// ordinary unit, or the terminal handler.
    pub fn run<'r>(self, req: &'r mut Req, res: &'r mut Res) -> BoxFuture<'r, ()> {
        (self.cont)(None, req, res)
    }

    /// Signal failure: ordinary units are skipped until the next
    /// error-handling unit, which receives `err` as-is.
    pub fn fail<'r>(
        self,
        err: impl Into<Error>,
        req: &'r mut Req,
        res: &'r mut Res,
    ) -> BoxFuture<'r, ()> {
        (self.cont)(Some(err.into()), req, res)
    }

    /// General form of [`run`](Next::run) / [`fail`](Next::fail).
    pub fn resume<'r>(
        self,
        err: Option<Error>,
        req: &'r mut Req,
        res: &'r mut Res,
    ) -> BoxFuture<'r, ()> {
        (self.cont)(err, req, res)
    }
}

impl<Req, Res> fmt::Debug for Next<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}
