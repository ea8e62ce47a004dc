//! Middleware units and type erasure.
//!
//! # Two kinds of unit
//!
//! A chain mixes two shapes of function, and the caller says which is which
//! when building the list. Nothing is inferred from the function itself:
//!
//! ```text
//! Unit::ordinary(|req, res, next| …)           runs while no error is pending
//! Unit::error_handler(|err, req, res, next| …) runs only while one is pending
//! ```
//!
//! # How units are stored
//!
//! A chain is a `Vec` of units with *different* closure types, so each one is
//! boxed behind a trait object (`dyn Fn`) and shared through an `Arc`:
//!
//! ```text
//! |req, res, next| Box::pin(async move { … })   ← user writes this
//!        ↓ Unit::ordinary(f)
//! Arc::new(f) as OrdinaryFn<Req, Res>            ← one allocation, at build time
//!        ↓ cloned into each composed layer
//! unit(req, res, next)  at request time          ← one vtable dispatch
//! ```
//!
//! Cloning a `Unit` is one atomic increment; building the chain once and
//! calling it for every invocation costs nothing beyond the continuations.

use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::next::{BoxFuture, Next};

// ── Erased function types ─────────────────────────────────────────────────────

/// An ordinary unit: `(req, res, next) -> Result<(), Error>`.
///
/// `#[doc(hidden)] pub` because it appears in the public [`Unit`] variants.
#[doc(hidden)]
pub type OrdinaryFn<Req, Res> = Arc<
    dyn for<'r> Fn(&'r mut Req, &'r mut Res, Next<Req, Res>) -> BoxFuture<'r, Result<(), Error>>
        + Send
        + Sync
        + 'static,
>;

/// An error-handling unit: `(err, req, res, next) -> ()`.
///
/// No `Result` here: an error handler forwards failures through `next.fail`,
/// and anything it panics with is not caught by the chain.
#[doc(hidden)]
pub type ErrorFn<Req, Res> = Arc<
    dyn for<'r> Fn(Error, &'r mut Req, &'r mut Res, Next<Req, Res>) -> BoxFuture<'r, ()>
        + Send
        + Sync
        + 'static,
>;

// ── Unit ──────────────────────────────────────────────────────────────────────

/// One middleware function in a chain.
///
/// Build units with the constructors below; the variants are public so that
/// callers can match on a unit's kind.
///
/// ```rust
/// use weave::{Error, Unit};
///
/// struct Req { user: Option<String> }
/// struct Res { status: u16 }
///
/// let auth = Unit::<Req, Res>::ordinary(|req, res, next| Box::pin(async move {
///     if req.user.is_none() {
///         return Err(Error::msg("anonymous"));
///     }
///     next.run(req, res).await;
///     Ok(())
/// }));
///
/// let deny = Unit::<Req, Res>::error_handler(|_err, _req, res, _next| Box::pin(async move {
///     res.status = 401;
/// }));
///
/// assert!(!auth.is_error_handler());
/// assert!(deny.is_error_handler());
/// ```
pub enum Unit<Req, Res> {
    Ordinary(OrdinaryFn<Req, Res>),
    ErrorHandling(ErrorFn<Req, Res>),
}

impl<Req, Res> Unit<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    /// An ordinary unit.
    ///
    /// Continue with `next.run(req, res).await`. Returning `Err` (or
    /// panicking) before continuing is the same as calling `next.fail`.
    pub fn ordinary<F>(f: F) -> Self
    where
        F: for<'r> Fn(&'r mut Req, &'r mut Res, Next<Req, Res>) -> BoxFuture<'r, Result<(), Error>>
            + Send
            + Sync
            + 'static,
    {
        Self::Ordinary(Arc::new(f))
    }

    /// An error-handling unit. Receives the pending error first.
    ///
    /// Not calling `next` absorbs the error and ends the chain. Calling
    /// `next.run` resumes the ordinary units that follow; `next.fail` hands
    /// an error on to the next error handler.
    pub fn error_handler<F>(f: F) -> Self
    where
        F: for<'r> Fn(Error, &'r mut Req, &'r mut Res, Next<Req, Res>) -> BoxFuture<'r, ()>
            + Send
            + Sync
            + 'static,
    {
        Self::ErrorHandling(Arc::new(f))
    }

    /// An ordinary unit from a synchronous function. Continues on `Ok`.
    ///
    /// ```rust
    /// use weave::Unit;
    ///
    /// let tag = Unit::<Vec<&str>, ()>::sync(|req, _res| {
    ///     req.push("seen");
    ///     Ok(())
    /// });
    /// # let _ = tag;
    /// ```
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&mut Req, &mut Res) -> Result<(), Error> + Send + Sync + 'static,
    {
        Self::ordinary(move |req, res, next| {
            let outcome = f(req, res);
            Box::pin(async move {
                outcome?;
                next.run(req, res).await;
                Ok(())
            })
        })
    }
}

impl<Req, Res> Unit<Req, Res> {
    pub fn is_error_handler(&self) -> bool {
        matches!(self, Self::ErrorHandling(_))
    }
}

impl<Req, Res> Clone for Unit<Req, Res> {
    fn clone(&self) -> Self {
        match self {
            Self::Ordinary(f) => Self::Ordinary(Arc::clone(f)),
            Self::ErrorHandling(f) => Self::ErrorHandling(Arc::clone(f)),
        }
    }
}

impl<Req, Res> fmt::Debug for Unit<Req, Res> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ordinary(_) => f.write_str("Unit::Ordinary"),
            Self::ErrorHandling(_) => f.write_str("Unit::ErrorHandling"),
        }
    }
}
