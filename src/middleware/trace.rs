use std::time::Instant;

use tracing::{debug, warn};

use crate::unit::Unit;

/// Ordinary unit that logs when it is reached and how long everything after
/// it took. Place it first to time the whole invocation.
pub fn trace<Req, Res>(label: &'static str) -> Unit<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    Unit::ordinary(move |req, res, next| {
        Box::pin(async move {
            let started = Instant::now();
            debug!(unit = label, "entering");
            next.run(req, res).await;
            let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            debug!(unit = label, elapsed_us, "downstream finished");
            Ok(())
        })
    })
}

/// Error-handling unit that logs the pending error at `warn` and forwards
/// it unchanged. Does not absorb anything.
pub fn log_errors<Req, Res>(label: &'static str) -> Unit<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    Unit::error_handler(move |err, req, res, next| {
        warn!(unit = label, error = %err, panic = err.is_panic(), "pending error");
        next.fail(err, req, res)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::chain;
    use crate::error::Error;

    #[derive(Default)]
    struct Res {
        handled: bool,
        caught: Option<String>,
    }

    #[tokio::test]
    async fn trace_is_transparent() {
        let app = chain([trace::<(), Res>("outer"), trace("inner")])
            .handler(|_, res| Box::pin(async move { res.handled = true; }));

        let mut res = Res::default();
        app.call(&mut (), &mut res).await;
        assert!(res.handled);
    }

    #[tokio::test]
    async fn log_errors_forwards_the_same_error() {
        let app = chain([
            Unit::<(), Res>::sync(|_, _| Err(Error::msg("upstream"))),
            log_errors("audit"),
            Unit::error_handler(|err, _, res: &mut Res, _| {
                res.caught = Some(err.to_string());
                Box::pin(async {})
            }),
        ])
        .handler(|_, res| Box::pin(async move { res.handled = true; }));

        let mut res = Res::default();
        app.call(&mut (), &mut res).await;
        assert_eq!(res.caught.as_deref(), Some("upstream"));
        assert!(!res.handled);
    }
}
