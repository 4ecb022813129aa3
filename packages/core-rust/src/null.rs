//! No-op [`Broker`] implementation.
//!
//! [`NullBroker`] accepts every lifecycle call without side effects. It sits
//! at the end of a chain in tests, demos, and embedded setups that only need
//! the filters in front of it.

use crate::context::ConnectionContext;
use crate::error::BrokerError;
use crate::exchange::{ProducerExchange, Subscription};
use crate::message::{Message, MessageReference};
use crate::traits::{Broker, PoisonCause};

/// Terminal broker that accepts everything.
///
/// Sends succeed and dead-letter routing reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBroker;

impl Broker for NullBroker {
    fn send(&self, _exchange: &ProducerExchange, _message: &Message) -> Result<(), BrokerError> {
        Ok(())
    }

    fn message_consumed(&self, _context: Option<&ConnectionContext>, _reference: &MessageReference) {}

    fn message_delivered(&self, _context: Option<&ConnectionContext>, _reference: &MessageReference) {}

    fn message_discarded(
        &self,
        _context: Option<&ConnectionContext>,
        _subscription: &Subscription,
        _reference: &MessageReference,
    ) {
    }

    fn message_expired(
        &self,
        _context: Option<&ConnectionContext>,
        _reference: &MessageReference,
        _subscription: Option<&Subscription>,
    ) {
    }

    fn send_to_dead_letter_queue(
        &self,
        _context: Option<&ConnectionContext>,
        _reference: &MessageReference,
        _subscription: Option<&Subscription>,
        _poison_cause: Option<PoisonCause<'_>>,
    ) -> bool {
        true
    }
}
