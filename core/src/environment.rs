//! Injected dependencies that are not part of a message's data flow.

use chrono::{DateTime, Utc};

/// Abstracts time so failure timestamps can be fixed in tests.
///
/// # Examples
///
/// ```
/// use pick_request_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let _now = clock.now();
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
