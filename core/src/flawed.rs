//! Handling of messages whose processing failed.
//!
//! The processor hands every failure to a [`FlawedMessageHandler`]. The handler
//! decides between two endings:
//!
//! - `Ok(())`: the message is finished and the bus may acknowledge it
//! - `Err(_)`: the bus should redeliver it later

use crate::error::ReconcileError;
use crate::message::InboundMessage;
use std::future::Future;
use std::pin::Pin;

/// Decides what happens to a message that failed.
pub trait FlawedMessageHandler: Send + Sync {
    /// Handle `error` raised while processing `message`.
    ///
    /// # Errors
    ///
    /// Returns the error (or a replacement) when the message should be
    /// redelivered.
    fn handle_flawed_message<'a>(
        &'a self,
        source_topic: &'a str,
        message: &'a InboundMessage,
        error: ReconcileError,
    ) -> Pin<Box<dyn Future<Output = Result<(), ReconcileError>> + Send + 'a>>;
}
