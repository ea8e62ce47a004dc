//! Chain configuration.
//!
//! There is exactly one behavioural knob: what happens when an error falls
//! off the end of the chain with no error-handling unit left to absorb it.
//! Everything else in a chain is decided by the units themselves.
//!
//! ```rust
//! use weave::{Config, Unhandled};
//!
//! let config = Config::new().with_name("checkout").with_unhandled(Unhandled::Proceed);
//! assert_eq!(config.name(), "checkout");
//! assert_eq!(config.unhandled(), Unhandled::Proceed);
//! ```

use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Environment variable read by [`Config::from_env`].
pub const UNHANDLED_ENV: &str = "WEAVE_UNHANDLED";

// ── Unhandled ─────────────────────────────────────────────────────────────────

/// Policy for an error that reaches the terminal handler's continuation.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Unhandled {
    /// Log the error at `error` level and skip the handler.
    #[default]
    Abort,
    /// Log the error at `warn` level and run the handler anyway.
    Proceed,
}

impl Unhandled {
    /// Returns the lowercase name (e.g. `"abort"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abort   => "abort",
            Self::Proceed => "proceed",
        }
    }
}

/// Parses a lowercase policy name. Case-sensitive.
impl FromStr for Unhandled {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort"   => Ok(Self::Abort),
            "proceed" => Ok(Self::Proceed),
            _         => Err(()),
        }
    }
}

impl fmt::Display for Unhandled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Config ────────────────────────────────────────────────────────────────────

/// Settings for an attached [`Chain`](crate::Chain).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    pub(crate) name: &'static str,
    pub(crate) unhandled: Unhandled,
}

impl Config {
    /// `name = "chain"`, `unhandled = Unhandled::Abort`.
    pub fn new() -> Self {
        Self { name: "chain", unhandled: Unhandled::default() }
    }

    /// Defaults, with the policy overridden by `WEAVE_UNHANDLED` when set.
    ///
    /// An unrecognised value is logged and ignored.
    pub fn from_env() -> Self {
        let config = Self::new();
        match std::env::var(UNHANDLED_ENV) {
            Ok(raw) => match raw.trim().parse() {
                Ok(policy) => config.with_unhandled(policy),
                Err(()) => {
                    warn!(var = UNHANDLED_ENV, value = %raw, "unknown unhandled-error policy, using default");
                    config
                }
            },
            Err(_) => config,
        }
    }

    /// Sets the label recorded on the tracing span of every invocation.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_unhandled(mut self, policy: Unhandled) -> Self {
        self.unhandled = policy;
        self
    }

    pub fn name(&self) -> &'static str { self.name }
    pub fn unhandled(&self) -> Unhandled { self.unhandled }
}

impl Default for Config {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_names_parse_back() {
        for policy in [Unhandled::Abort, Unhandled::Proceed] {
            assert_eq!(policy.as_str().parse::<Unhandled>(), Ok(policy));
            assert_eq!(policy.to_string(), policy.as_str());
        }
        assert_eq!("Abort".parse::<Unhandled>(), Err(()));
    }

    #[test]
    fn defaults_abort() {
        let config = Config::default();
        assert_eq!(config.name(), "chain");
        assert_eq!(config.unhandled(), Unhandled::Abort);
    }
}
