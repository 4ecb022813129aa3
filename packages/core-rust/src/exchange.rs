//! Per-call broker state passed alongside messages: producer exchanges and
//! consumer subscriptions.

use std::sync::Arc;

use crate::context::ConnectionContext;
use crate::destination::Destination;
use crate::error::StatisticError;
use crate::traits::FlowStatistics;

/// Producer-side state for one send.
#[derive(Clone)]
pub struct ProducerExchange {
    context: Option<Arc<ConnectionContext>>,
    flow: Arc<dyn FlowStatistics>,
}

impl ProducerExchange {
    /// Exchange with default (empty) flow-control statistics.
    #[must_use]
    pub fn new(context: Option<Arc<ConnectionContext>>) -> Self {
        Self::with_flow(context, Arc::new(FlowControlInfo::default()))
    }

    /// Exchange reporting the given flow-control statistics.
    #[must_use]
    pub fn with_flow(
        context: Option<Arc<ConnectionContext>>,
        flow: Arc<dyn FlowStatistics>,
    ) -> Self {
        Self { context, flow }
    }

    /// Connection the producer is sending on.
    #[must_use]
    pub fn connection_context(&self) -> Option<&ConnectionContext> {
        self.context.as_deref()
    }

    /// Flow-control statistics of the producer.
    #[must_use]
    pub fn flow(&self) -> &dyn FlowStatistics {
        self.flow.as_ref()
    }
}

impl std::fmt::Debug for ProducerExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProducerExchange")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Counters the broker keeps about producer flow control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowControlInfo {
    /// Sends observed for this producer.
    pub total_sends: u64,
    /// Sends that had to wait for memory or a usage limit.
    pub sends_blocked: u64,
    /// Total time spent blocked, in milliseconds.
    pub total_time_blocked_ms: u64,
}

impl FlowStatistics for FlowControlInfo {
    #[allow(clippy::cast_precision_loss)]
    fn percentage_blocked(&self) -> f64 {
        if self.total_sends == 0 {
            0.0
        } else {
            self.sends_blocked as f64 / self.total_sends as f64
        }
    }

    fn total_time_blocked(&self) -> Result<u64, StatisticError> {
        Ok(self.total_time_blocked_ms)
    }
}

/// A consumer subscription involved in a dispatch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Broker-assigned consumer id.
    pub consumer_id: String,
    /// Destination the consumer subscribed to.
    pub destination: Destination,
}
