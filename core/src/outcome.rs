//! What happened to a message that did not fail.

use std::fmt;

/// Result of handling one inbound message successfully.
///
/// Every variant means the message is done and may be acknowledged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A new pick request was stored and forwarded to routing.
    Created,
    /// A create arrived for a pick request that already exists. Nothing changed.
    DuplicateCreate,
    /// The stored pick request was updated.
    Updated {
        /// Whether the update was forwarded to routing
        published: bool,
    },
    /// The stored pick request was forwarded to routing for cancellation.
    CancellationForwarded,
    /// The pick request is past the point where it can be cancelled.
    CancellationSkipped,
    /// The delivery was seen before and skipped.
    DuplicateDelivery,
    /// The operation attribute was not recognized.
    IgnoredOperation,
    /// The message failed with an error that will not go away on retry. It was
    /// dead-lettered (if enabled) and acknowledged.
    Discarded,
}

impl Outcome {
    /// Stable, low-cardinality label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::DuplicateCreate => "duplicate_create",
            Self::Updated { published: true } => "updated_published",
            Self::Updated { published: false } => "updated",
            Self::CancellationForwarded => "cancellation_forwarded",
            Self::CancellationSkipped => "cancellation_skipped",
            Self::DuplicateDelivery => "duplicate_delivery",
            Self::IgnoredOperation => "ignored_operation",
            Self::Discarded => "discarded",
        }
    }

    /// Whether a message was sent to the routing topic.
    #[must_use]
    pub const fn published(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::CancellationForwarded | Self::Updated { published: true }
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn published_outcomes() {
        assert!(Outcome::Created.published());
        assert!(Outcome::CancellationForwarded.published());
        assert!(Outcome::Updated { published: true }.published());
        assert!(!Outcome::Updated { published: false }.published());
        assert!(!Outcome::DuplicateCreate.published());
        assert!(!Outcome::CancellationSkipped.published());
        assert!(!Outcome::Discarded.published());
    }
}
