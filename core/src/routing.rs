//! Routing messages and the known-automation allow-list.

use crate::message::MessageAttributes;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Default routing topic name.
pub const ROUTING_TOPIC: &str = "routing-topic";

/// A message for the routing service.
#[derive(Clone, Debug, PartialEq)]
pub struct RoutingMessage {
    /// JSON body: a pick request record or an update payload
    pub body: Value,
    /// Message attributes
    pub attributes: MessageAttributes,
}

impl RoutingMessage {
    /// Serialize `body` into a routing message.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `body` cannot be represented as JSON.
    pub fn new<T: Serialize>(
        body: &T,
        attributes: MessageAttributes,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            body: serde_json::to_value(body)?,
            attributes,
        })
    }
}

/// Automation system prefix: the lowercased token before the first `-`.
///
/// `"IWS-STO-1"` → `"iws"`, `"iws"` → `"iws"`.
#[must_use]
pub fn automation_prefix(automation_system_identifier: &str) -> String {
    automation_system_identifier
        .split('-')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Automation systems whose non-manual updates are forwarded to routing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnownAutomationSystems(BTreeSet<String>);

impl KnownAutomationSystems {
    /// Build an allow-list from prefixes; entries are lowercased and trimmed,
    /// blank entries are dropped.
    #[must_use]
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            prefixes
                .into_iter()
                .map(|prefix| prefix.as_ref().trim().to_lowercase())
                .filter(|prefix| !prefix.is_empty())
                .collect(),
        )
    }

    /// Parse a comma-separated list, e.g. `"iws,autostore"`.
    #[must_use]
    pub fn from_csv(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Whether the automation system's prefix is in the allow-list.
    #[must_use]
    pub fn contains(&self, automation_system_identifier: &str) -> bool {
        self.0.contains(&automation_prefix(automation_system_identifier))
    }

    /// Allowed prefixes in sorted order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Default for KnownAutomationSystems {
    fn default() -> Self {
        Self::new(["iws"])
    }
}
