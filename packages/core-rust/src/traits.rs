use std::error::Error;

use crate::context::ConnectionContext;
use crate::error::{BrokerError, StatisticError};
use crate::exchange::{ProducerExchange, Subscription};
use crate::message::{Message, MessageReference};

/// Cause handed to the dead-letter path.
pub type PoisonCause<'a> = &'a (dyn Error + Send + Sync + 'static);

/// One link in the broker's message-handling chain.
///
/// Handlers are composed by wrapping: each filter owns the next handler and
/// forwards every call to it. The innermost handler is the broker's own
/// region logic.
pub trait Broker: Send + Sync {
    /// A producer sent `message`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when the broker refuses the message.
    fn send(&self, exchange: &ProducerExchange, message: &Message) -> Result<(), BrokerError>;

    /// A consumer acknowledged the message.
    fn message_consumed(&self, context: Option<&ConnectionContext>, reference: &MessageReference);

    /// The message was dispatched to a consumer.
    fn message_delivered(&self, context: Option<&ConnectionContext>, reference: &MessageReference);

    /// A subscription dropped the message (e.g. slow consumer eviction).
    fn message_discarded(
        &self,
        context: Option<&ConnectionContext>,
        subscription: &Subscription,
        reference: &MessageReference,
    );

    /// The message passed its expiration time.
    fn message_expired(
        &self,
        context: Option<&ConnectionContext>,
        reference: &MessageReference,
        subscription: Option<&Subscription>,
    );

    /// Route a poisoned message to its dead-letter destination.
    /// Returns whether the routing succeeded.
    fn send_to_dead_letter_queue(
        &self,
        context: Option<&ConnectionContext>,
        reference: &MessageReference,
        subscription: Option<&Subscription>,
        poison_cause: Option<PoisonCause<'_>>,
    ) -> bool;
}

impl<B: Broker + ?Sized> Broker for Box<B> {
    fn send(&self, exchange: &ProducerExchange, message: &Message) -> Result<(), BrokerError> {
        (**self).send(exchange, message)
    }

    fn message_consumed(&self, context: Option<&ConnectionContext>, reference: &MessageReference) {
        (**self).message_consumed(context, reference);
    }

    fn message_delivered(&self, context: Option<&ConnectionContext>, reference: &MessageReference) {
        (**self).message_delivered(context, reference);
    }

    fn message_discarded(
        &self,
        context: Option<&ConnectionContext>,
        subscription: &Subscription,
        reference: &MessageReference,
    ) {
        (**self).message_discarded(context, subscription, reference);
    }

    fn message_expired(
        &self,
        context: Option<&ConnectionContext>,
        reference: &MessageReference,
        subscription: Option<&Subscription>,
    ) {
        (**self).message_expired(context, reference, subscription);
    }

    fn send_to_dead_letter_queue(
        &self,
        context: Option<&ConnectionContext>,
        reference: &MessageReference,
        subscription: Option<&Subscription>,
        poison_cause: Option<PoisonCause<'_>>,
    ) -> bool {
        (**self).send_to_dead_letter_queue(context, reference, subscription, poison_cause)
    }
}

/// Installs a handler in front of an existing chain.
pub trait BrokerPlugin: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Wrap `next`, returning the new head of the chain.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::PluginInstall`] if the plugin cannot be set up.
    fn install(&self, next: Box<dyn Broker>) -> Result<Box<dyn Broker>, BrokerError>;
}

/// Flow-control statistics the broker computes for a producer.
pub trait FlowStatistics: Send + Sync {
    /// Fraction of sends that blocked on flow control, in `[0, 1]`.
    fn percentage_blocked(&self) -> f64;

    /// Total time the producer spent blocked, in milliseconds. Some brokers
    /// derive this from a per-window average and fail on an empty window.
    ///
    /// # Errors
    ///
    /// Returns [`StatisticError::DivisionByZero`] on an empty sampling window.
    fn total_time_blocked(&self) -> Result<u64, StatisticError>;
}
