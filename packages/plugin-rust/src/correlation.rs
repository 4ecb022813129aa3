//! Correlation ids: one stable token per message, reused on every later hop.

use breadcrumb_core::Message;
use uuid::Uuid;

/// Returns the message's correlation id, assigning a random UUID v4 first if
/// the client did not set one. The id is written onto the message so later
/// events and downstream brokers see the same value.
pub fn ensure_correlation_id(message: &Message) -> &str {
    message.correlation_id_or_init(|| Uuid::new_v4().to_string())
}
