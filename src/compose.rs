//! Folding a list of units into one.
//!
//! [`compose`] is a left fold starting from the identity unit. Each step
//! wraps everything folded so far (`acc`) and decides, once `acc` hands off,
//! whether the next unit (`mid`) runs or is skipped:
//!
//! | pending error | `mid` is ordinary          | `mid` is an error handler |
//! |---------------|----------------------------|---------------------------|
//! | none          | run `mid`, faults → `fail` | skip                      |
//! | some          | skip, keep the error       | run `mid` with the error  |
//!
//! Whatever leaves the last step goes to the composed unit's own `next`, so
//! the result is an ordinary unit like any other and can itself be composed.

use std::any::Any;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt as _;
use tracing::{debug, warn};

use crate::error::Error;
use crate::next::{BoxFuture, Next};
use crate::unit::{ErrorFn, OrdinaryFn, Unit};

/// Composes `units` into a single ordinary unit that runs them in order.
///
/// An empty list yields a pass-through: `(req, res, next) -> next.run()`.
///
/// A panic from an error-handling unit leaves the composed unit wrapped in a
/// private marker, so that enclosing compositions let it through. Only
/// [`Chain::call`](crate::Chain::call) restores the original payload; code
/// that runs a composed unit's function directly under `catch_unwind` gets
/// the wrapped one.
///
/// ```rust
/// use weave::{Unit, compose};
///
/// let a = Unit::<Vec<u8>, ()>::sync(|req, _| { req.push(1); Ok(()) });
/// let b = Unit::<Vec<u8>, ()>::sync(|req, _| { req.push(2); Ok(()) });
///
/// let both = compose([a, b]);
/// assert!(!both.is_error_handler());
/// ```
pub fn compose<Req, Res, I>(units: I) -> Unit<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
    I: IntoIterator<Item = Unit<Req, Res>>,
{
    Unit::Ordinary(fold(units))
}

pub(crate) fn fold<Req, Res, I>(units: I) -> OrdinaryFn<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
    I: IntoIterator<Item = Unit<Req, Res>>,
{
    units.into_iter().fold(identity(), combine)
}

fn identity<Req, Res>() -> OrdinaryFn<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    erase(|req, res, next| {
        Box::pin(async move {
            next.run(req, res).await;
            Ok(())
        })
    })
}

/// One fold step: `acc` followed by `mid`.
fn combine<Req, Res>(acc: OrdinaryFn<Req, Res>, mid: Unit<Req, Res>) -> OrdinaryFn<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    erase(move |req, res, next| {
        let mid = mid.clone();
        acc(req, res, Next::new(move |err, req, res| step(mid, err, req, res, next)))
    })
}

/// Routes control into `mid`, or past it, once everything before it is done.
fn step<'r, Req, Res>(
    mid: Unit<Req, Res>,
    err: Option<Error>,
    req: &'r mut Req,
    res: &'r mut Res,
    next: Next<Req, Res>,
) -> BoxFuture<'r, ()>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    match (err, mid) {
        (Some(err), Unit::ErrorHandling(handler)) => Box::pin(escalating(handler, err, req, res, next)),
        (Some(err), Unit::Ordinary(_)) => next.fail(err, req, res),
        (None, Unit::ErrorHandling(_)) => next.run(req, res),
        (None, Unit::Ordinary(unit)) => Box::pin(guarded(unit, req, res, next)),
    }
}

/// Runs an ordinary unit, turning an `Err` return or a panic into `next.fail`.
///
/// The unit gets a stand-in continuation; the real one stays in `slot` until
/// the unit calls it. If the unit faults before that, `slot` still holds it
/// and the fault is routed through it. If the unit already handed off, the
/// successor has run and must not run again: a late `Err` is dropped and a
/// late panic escalates.
async fn guarded<Req, Res>(
    unit: OrdinaryFn<Req, Res>,
    req: &mut Req,
    res: &mut Res,
    next: Next<Req, Res>,
) where
    Req: Send + 'static,
    Res: Send + 'static,
{
    let slot = Arc::new(Mutex::new(Some(next)));
    let handoff = {
        let slot = Arc::clone(&slot);
        Next::new(move |err, req, res| match take(&slot) {
            Some(next) => next.resume(err, req, res),
            None => Box::pin(async {}),
        })
    };

    let outcome = AssertUnwindSafe(async { unit(&mut *req, &mut *res, handoff).await })
        .catch_unwind()
        .await;

    let fault = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(err)) => Fault::Returned(err),
        Err(payload) if payload.is::<Escalated>() => resume_unwind(payload),
        Err(payload) => Fault::Panicked(payload),
    };

    match (take(&slot), fault) {
        (Some(next), Fault::Returned(err)) => {
            debug!(error = %err, panic = false, "unit failed; routing to error handlers");
            next.fail(err, req, res).await;
        }
        (Some(next), Fault::Panicked(payload)) => {
            let err = Error::from_panic(payload);
            debug!(error = %err, panic = true, "unit panicked; routing to error handlers");
            next.fail(err, req, res).await;
        }
        (None, Fault::Panicked(payload)) => escalate(payload),
        (None, Fault::Returned(err)) => {
            warn!(error = %err, "unit failed after continuing; error dropped");
        }
    }
}

enum Fault {
    Returned(Error),
    Panicked(Box<dyn Any + Send>),
}

/// Runs an error-handling unit. Its panics are never converted: they are
/// tagged so that every enclosing guard lets them through.
async fn escalating<Req, Res>(
    handler: ErrorFn<Req, Res>,
    err: Error,
    req: &mut Req,
    res: &mut Res,
    next: Next<Req, Res>,
) where
    Req: Send + 'static,
    Res: Send + 'static,
{
    let outcome = AssertUnwindSafe(async { handler(err, &mut *req, &mut *res, next).await })
        .catch_unwind()
        .await;
    if let Err(payload) = outcome {
        escalate(payload);
    }
}

// ── Escalated panics ──────────────────────────────────────────────────────────

/// A panic payload on its way out of the whole chain.
///
/// Guards re-raise it untouched, whether or not their own unit has handed
/// off yet. [`Chain::call`](crate::Chain::call) unwraps it, so the caller
/// sees the original payload.
struct Escalated(Box<dyn Any + Send>);

fn escalate(payload: Box<dyn Any + Send>) -> ! {
    if payload.is::<Escalated>() {
        resume_unwind(payload)
    }
    resume_unwind(Box::new(Escalated(payload)))
}

/// Strips the escalation tag, if any.
pub(crate) fn original_payload(payload: Box<dyn Any + Send>) -> Box<dyn Any + Send> {
    match payload.downcast::<Escalated>() {
        Ok(escalated) => escalated.0,
        Err(payload) => payload,
    }
}

fn take<Req, Res>(slot: &Mutex<Option<Next<Req, Res>>>) -> Option<Next<Req, Res>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Pins down the higher-ranked signature so closures coerce to [`OrdinaryFn`].
fn erase<Req, Res, F>(f: F) -> OrdinaryFn<Req, Res>
where
    F: for<'r> Fn(&'r mut Req, &'r mut Res, Next<Req, Res>) -> BoxFuture<'r, Result<(), Error>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Seen {
        trail: Vec<&'static str>,
        continued: bool,
        escaped: Option<String>,
    }

    type U = Unit<Seen, ()>;

    /// Records what reached the composed unit's own continuation.
    fn outer() -> Next<Seen, ()> {
        Next::<Seen, ()>::new(|err, seen, _| {
            seen.continued = true;
            seen.escaped = err.map(|e| e.to_string());
            Box::pin(async {})
        })
    }

    async fn drive(unit: U) -> Seen {
        let Unit::Ordinary(f) = unit else {
            panic!("composition always yields an ordinary unit");
        };
        let mut seen = Seen::default();
        f(&mut seen, &mut (), outer()).await.expect("composed units route errors through next");
        seen
    }

    #[tokio::test]
    async fn empty_composition_passes_through() {
        let seen = drive(compose(Vec::<U>::new())).await;
        assert!(seen.continued);
        assert!(seen.escaped.is_none());
    }

    #[tokio::test]
    async fn unabsorbed_error_escapes_to_outer_next() {
        let seen = drive(compose([
            U::sync(|seen, _| { seen.trail.push("a"); Ok(()) }),
            U::sync(|_, _| Err(Error::msg("lost"))),
            U::sync(|seen, _| { seen.trail.push("b"); Ok(()) }),
        ]))
        .await;

        assert_eq!(seen.trail, ["a"]);
        assert!(seen.continued);
        assert_eq!(seen.escaped.as_deref(), Some("lost"));
    }

    #[tokio::test]
    async fn error_handler_panic_is_restored_only_by_unwrapping() {
        let Unit::Ordinary(f) = compose([
            U::sync(|_, _| Err(Error::msg("first"))),
            U::error_handler(|_, _, _, _| panic!("handler broke")),
        ]) else {
            panic!("composition always yields an ordinary unit");
        };
        let mut seen = Seen::default();

        let payload = AssertUnwindSafe(f(&mut seen, &mut (), outer()))
            .catch_unwind()
            .await
            .expect_err("error-handler panics are not converted");

        assert!(payload.is::<Escalated>());
        let original = original_payload(payload);
        assert_eq!(original.downcast_ref::<&str>(), Some(&"handler broke"));
        assert!(!seen.continued);
    }

    #[tokio::test]
    async fn leading_error_handler_is_skipped() {
        let seen = drive(compose([
            U::error_handler(|_, seen, res, next| {
                seen.trail.push("error-handler");
                next.run(seen, res)
            }),
            U::sync(|seen, _| { seen.trail.push("a"); Ok(()) }),
        ]))
        .await;

        assert_eq!(seen.trail, ["a"]);
        assert!(seen.continued);
        assert!(seen.escaped.is_none());
    }
}
