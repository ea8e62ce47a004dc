//! `Config::from_env`. Kept in its own test binary: it mutates the process
//! environment, which must not race with other tests.

use weave::{Config, UNHANDLED_ENV, Unhandled};

#[test]
fn policy_follows_the_environment() {
    // SAFETY: the only test in this binary; no other thread reads the environment.
    unsafe { std::env::remove_var(UNHANDLED_ENV) };
    assert_eq!(Config::from_env().unhandled(), Unhandled::Abort);

    unsafe { std::env::set_var(UNHANDLED_ENV, "proceed") };
    assert_eq!(Config::from_env().unhandled(), Unhandled::Proceed);

    unsafe { std::env::set_var(UNHANDLED_ENV, " abort ") };
    assert_eq!(Config::from_env().unhandled(), Unhandled::Abort);

    unsafe { std::env::set_var(UNHANDLED_ENV, "sometimes") };
    assert_eq!(Config::from_env().unhandled(), Unhandled::Abort);

    unsafe { std::env::remove_var(UNHANDLED_ENV) };
}
