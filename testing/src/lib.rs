//! # Pick Request Testing
//!
//! Testing utilities for pick request reconciliation.
//!
//! This crate provides:
//! - In-memory implementations of the collaborator traits, with failure
//!   injection and call recording
//! - A fixed clock
//! - Message builders and seeded pick request fixtures
//!
//! ## Example
//!
//! ```
//! use pick_request_core::store::PickRequestStore;
//! use pick_request_testing::{InMemoryPickRequestStore, fixtures};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryPickRequestStore::new();
//! fixtures::seed_default_pick_requests(&store);
//!
//! let stored = store.get_pick_request("2", "TEST-WMS-1").await?;
//! assert!(stored.is_some());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use pick_request_core::environment::Clock;

pub mod bus_mocks;
pub mod fixtures;
pub mod store_mocks;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use pick_request_testing::mocks::FixedClock;
    /// use pick_request_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use bus_mocks::{InMemoryDeduplicator, RecordingDeadLetterSink, RecordingPublisher};
pub use mocks::{FixedClock, test_clock};
pub use store_mocks::InMemoryPickRequestStore;
