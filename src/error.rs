//! Unified error type.

use std::any::Any;
use std::fmt;

/// The error value threaded through a middleware chain.
///
/// Units raise one by calling [`Next::fail`](crate::Next::fail), by returning
/// `Err` from an ordinary unit, or by panicking inside an ordinary unit. In
/// every case the value that reaches the next error-handling unit is an
/// `Error`; only [`is_panic`](Error::is_panic) tells the three apart.
///
/// ```rust
/// use weave::Error;
///
/// let err = Error::msg("token expired");
/// assert_eq!(err.to_string(), "token expired");
///
/// let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
/// let err = Error::from(io);
/// assert!(err.downcast_ref::<std::io::Error>().is_some());
/// ```
#[derive(Debug)]
pub struct Error(Repr);

#[derive(Debug)]
enum Repr {
    Message(String),
    Wrapped(Box<dyn std::error::Error + Send + Sync + 'static>),
    Panic(String),
}

impl Error {
    /// An error carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(Repr::Message(message.into()))
    }

    /// Wraps any standard error. It stays reachable through
    /// [`downcast_ref`](Error::downcast_ref) and `source()`.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Repr::Wrapped(Box::new(error)))
    }

    /// Converts a caught panic payload. `panic!` payloads are either
    /// `&'static str` or `String`; anything else gets a fixed message.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => match payload.downcast_ref::<&'static str>() {
                Some(s) => (*s).to_owned(),
                None => "unit panicked".to_owned(),
            },
        };
        Self(Repr::Panic(message))
    }

    /// `true` when this error was produced by a panicking ordinary unit.
    pub fn is_panic(&self) -> bool {
        matches!(self.0, Repr::Panic(_))
    }

    /// Returns the wrapped error if it is of type `E`.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match &self.0 {
            Repr::Wrapped(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Message(m) | Repr::Panic(m) => f.write_str(m),
            Repr::Wrapped(inner) => fmt::Display::fmt(inner, f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.0 {
            Repr::Wrapped(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(e)
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::msg(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_keep_their_message() {
        let owned = Error::from_panic(Box::new(String::from("boom")));
        let borrowed = Error::from_panic(Box::new("boom"));
        let opaque = Error::from_panic(Box::new(42_u8));

        assert!(owned.is_panic());
        assert_eq!(owned.to_string(), "boom");
        assert_eq!(borrowed.to_string(), "boom");
        assert_eq!(opaque.to_string(), "unit panicked");
    }

    #[test]
    fn wrapped_errors_expose_source() {
        use std::error::Error as _;

        let err = Error::from(std::io::Error::other("disk"));
        assert!(!err.is_panic());
        assert_eq!(err.to_string(), "disk");
        assert!(err.source().is_some());
        assert!(Error::msg("plain").source().is_none());
    }
}
