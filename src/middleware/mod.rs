//! Built-in units.
//!
//! Cross-cutting concerns that need nothing from the request or response:
//! - [`trace`] — per-unit span events with downstream latency
//! - [`log_errors`] — log a pending error and pass it on

mod trace;

pub use trace::{log_errors, trace};
