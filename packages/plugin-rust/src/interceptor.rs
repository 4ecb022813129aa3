//! Lifecycle interceptor: writes one breadcrumb line per broker event, then
//! hands the call to the next broker in the chain.
//!
//! The logging pipeline runs under `catch_unwind`, so nothing it does can
//! stop the call from reaching the next handler. Only the next handler's own
//! result is returned to the caller.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use breadcrumb_core::{
    Broker, BrokerError, ConnectionContext, Message, MessageReference, PoisonCause,
    ProducerExchange, Subscription,
};
use tower::Layer;

use crate::classify::classify;
use crate::config::BreadcrumbConfig;
use crate::extract::{append_body, extract};
use crate::record::{ExtraFields, FieldValue, Op};
use crate::serialize::serialize;
use crate::sink::{LogSink, Severity, TracingSink};

// ---------------------------------------------------------------------------
// BreadcrumbLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps a broker with a [`BreadcrumbBroker`].
#[derive(Clone)]
pub struct BreadcrumbLayer {
    config: Arc<BreadcrumbConfig>,
    sink: Arc<dyn LogSink>,
}

impl BreadcrumbLayer {
    /// Layer writing through `tracing`.
    #[must_use]
    pub fn new(config: BreadcrumbConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Layer writing to `sink`.
    #[must_use]
    pub fn with_sink(config: BreadcrumbConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            config: Arc::new(config),
            sink,
        }
    }
}

impl<B> Layer<B> for BreadcrumbLayer {
    type Service = BreadcrumbBroker<B>;

    fn layer(&self, inner: B) -> Self::Service {
        BreadcrumbBroker {
            next: inner,
            config: Arc::clone(&self.config),
            sink: Arc::clone(&self.sink),
        }
    }
}

// ---------------------------------------------------------------------------
// BreadcrumbBroker
// ---------------------------------------------------------------------------

/// Broker filter emitting a breadcrumb record for every lifecycle event.
///
/// Stateless across calls. Advisory traffic is written at debug severity,
/// everything else at info.
pub struct BreadcrumbBroker<B> {
    next: B,
    config: Arc<BreadcrumbConfig>,
    sink: Arc<dyn LogSink>,
}

impl<B> BreadcrumbBroker<B> {
    /// Wraps `next` with the default configuration, writing through `tracing`.
    #[must_use]
    pub fn new(next: B) -> Self {
        BreadcrumbLayer::new(BreadcrumbConfig::default()).layer(next)
    }

    /// The wrapped broker.
    pub fn next(&self) -> &B {
        &self.next
    }

    /// Runs the logging pipeline for one event. Never panics and never
    /// returns an error; failures become warning lines.
    fn log(
        &self,
        context: Option<&ConnectionContext>,
        message: &Message,
        op: Op,
        extras: impl FnOnce() -> ExtraFields,
    ) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.emit(context, message, op, extras());
        }));
        if let Err(payload) = outcome {
            let line = format!(
                "breadcrumb logging failed for {op}: {}",
                panic_message(payload.as_ref())
            );
            let _ = panic::catch_unwind(AssertUnwindSafe(|| {
                self.sink.write_line(Severity::Warn, &line);
            }));
        }
    }

    fn emit(
        &self,
        context: Option<&ConnectionContext>,
        message: &Message,
        op: Op,
        extras: ExtraFields,
    ) {
        let sink = self.sink.as_ref();
        let mut record = extract(context, message, op, sink);
        record.merge(extras);
        if self.config.log_body {
            append_body(&mut record, message, sink);
        }
        let class = classify(&message.destination, &self.config.advisory_prefixes);
        let line = serialize(&record, sink);
        sink.write_line(class.severity(), &line);
    }
}

impl<B: Broker> Broker for BreadcrumbBroker<B> {
    fn send(&self, exchange: &ProducerExchange, message: &Message) -> Result<(), BrokerError> {
        self.log(exchange.connection_context(), message, Op::ProducerSend, || {
            send_extras(exchange)
        });
        self.next.send(exchange, message)
    }

    fn message_consumed(&self, context: Option<&ConnectionContext>, reference: &MessageReference) {
        self.log(context, reference.message(), Op::MessageConsumed, Vec::new);
        self.next.message_consumed(context, reference);
    }

    fn message_delivered(&self, context: Option<&ConnectionContext>, reference: &MessageReference) {
        self.log(context, reference.message(), Op::MessageDelivered, Vec::new);
        self.next.message_delivered(context, reference);
    }

    fn message_discarded(
        &self,
        context: Option<&ConnectionContext>,
        subscription: &Subscription,
        reference: &MessageReference,
    ) {
        self.log(context, reference.message(), Op::MessageDiscarded, Vec::new);
        self.next.message_discarded(context, subscription, reference);
    }

    fn message_expired(
        &self,
        context: Option<&ConnectionContext>,
        reference: &MessageReference,
        subscription: Option<&Subscription>,
    ) {
        self.log(context, reference.message(), Op::MessageExpired, Vec::new);
        self.next.message_expired(context, reference, subscription);
    }

    fn send_to_dead_letter_queue(
        &self,
        context: Option<&ConnectionContext>,
        reference: &MessageReference,
        subscription: Option<&Subscription>,
        poison_cause: Option<PoisonCause<'_>>,
    ) -> bool {
        self.log(context, reference.message(), Op::SendToDeadLetter, || {
            vec![("poisonCause", poison_cause.map(ToString::to_string).into())]
        });
        self.next
            .send_to_dead_letter_queue(context, reference, subscription, poison_cause)
    }
}

/// Flow-control figures for a send. `totalTimeBlocked` is left out when the
/// broker cannot compute it (empty sampling window).
fn send_extras(exchange: &ProducerExchange) -> ExtraFields {
    let flow = exchange.flow();
    let mut extras = vec![(
        "percentageBlocked",
        FieldValue::Float(flow.percentage_blocked()),
    )];
    if let Ok(total) = flow.total_time_blocked() {
        extras.push(("totalTimeBlocked", FieldValue::from(total)));
    }
    extras
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fmt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use breadcrumb_core::{
        ConnectionInfo, ConnectionState, Destination, FlowControlInfo, FlowStatistics, MessageId,
        Principal, SecurityContext, StatisticError, ADVISORY_TOPIC_PREFIX,
    };
    use parking_lot::Mutex;
    use serde_json::Value;
    use tower::ServiceBuilder;

    use super::*;
    use crate::sink::MemorySink;

    /// Next-handler stub recording which calls reached it.
    #[derive(Default)]
    struct RecordingBroker {
        calls: Mutex<Vec<&'static str>>,
        dlq_result: bool,
        reject_sends: bool,
    }

    impl RecordingBroker {
        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().clone()
        }
    }

    impl Broker for RecordingBroker {
        fn send(&self, _exchange: &ProducerExchange, _message: &Message) -> Result<(), BrokerError> {
            self.calls.lock().push("send");
            if self.reject_sends {
                Err(BrokerError::Rejected("queue full".to_string()))
            } else {
                Ok(())
            }
        }

        fn message_consumed(&self, _context: Option<&ConnectionContext>, _reference: &MessageReference) {
            self.calls.lock().push("consumed");
        }

        fn message_delivered(&self, _context: Option<&ConnectionContext>, _reference: &MessageReference) {
            self.calls.lock().push("delivered");
        }

        fn message_discarded(
            &self,
            _context: Option<&ConnectionContext>,
            _subscription: &Subscription,
            _reference: &MessageReference,
        ) {
            self.calls.lock().push("discarded");
        }

        fn message_expired(
            &self,
            _context: Option<&ConnectionContext>,
            _reference: &MessageReference,
            _subscription: Option<&Subscription>,
        ) {
            self.calls.lock().push("expired");
        }

        fn send_to_dead_letter_queue(
            &self,
            _context: Option<&ConnectionContext>,
            _reference: &MessageReference,
            _subscription: Option<&Subscription>,
            _poison_cause: Option<PoisonCause<'_>>,
        ) -> bool {
            self.calls.lock().push("dlq");
            self.dlq_result
        }
    }

    /// Flow statistics whose blocked-time computation hits an empty window.
    struct EmptyWindowFlow {
        percentage: f64,
    }

    impl FlowStatistics for EmptyWindowFlow {
        fn percentage_blocked(&self) -> f64 {
            self.percentage
        }

        fn total_time_blocked(&self) -> Result<u64, StatisticError> {
            Err(StatisticError::DivisionByZero {
                statistic: "totalTimeBlocked",
            })
        }
    }

    /// Flow statistics that panic, standing in for a broken host.
    struct PanickingFlow;

    impl FlowStatistics for PanickingFlow {
        fn percentage_blocked(&self) -> f64 {
            panic!("flow statistics unavailable")
        }

        fn total_time_blocked(&self) -> Result<u64, StatisticError> {
            Ok(0)
        }
    }

    /// Sink that panics on every write.
    struct ExplodingSink {
        attempted: AtomicBool,
    }

    impl LogSink for ExplodingSink {
        fn write_line(&self, _severity: Severity, _line: &str) {
            self.attempted.store(true, Ordering::SeqCst);
            panic!("sink is down");
        }
    }

    #[derive(Debug)]
    struct DiskFull;

    impl fmt::Display for DiskFull {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("disk full")
        }
    }

    impl std::error::Error for DiskFull {}

    fn make_broker(
        next: RecordingBroker,
        config: BreadcrumbConfig,
    ) -> (BreadcrumbBroker<RecordingBroker>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let broker = BreadcrumbLayer::with_sink(config, sink.clone()).layer(next);
        (broker, sink)
    }

    fn make_message(destination: Destination) -> Message {
        Message::new(MessageId::new("ID:producer-1", 1), destination)
    }

    fn only_line(sink: &MemorySink, severity: Severity) -> Value {
        let lines = sink.lines_at(severity);
        assert_eq!(lines.len(), 1, "expected one {severity:?} line, got {lines:?}");
        serde_json::from_str(&lines[0]).unwrap()
    }

    fn client_context() -> ConnectionContext {
        ConnectionContext {
            wire_format_info: None,
            security_context: Some(SecurityContext {
                user_name: Some("svc-billing".to_string()),
                principals: HashSet::from([Principal::Group("producers".to_string())]),
            }),
            connection_state: Some(ConnectionState {
                info: Some(ConnectionInfo {
                    client_ip: Some("tcp://10.1.2.3:61616".to_string()),
                    client_id: Some("billing".to_string()),
                }),
            }),
        }
    }

    // -- send ---------------------------------------------------------------

    #[test]
    fn send_with_empty_window_drops_total_time_blocked() {
        let (broker, sink) = make_broker(RecordingBroker::default(), BreadcrumbConfig::default());
        let exchange = ProducerExchange::with_flow(
            Some(Arc::new(client_context())),
            Arc::new(EmptyWindowFlow { percentage: 0.42 }),
        );
        let msg = make_message(Destination::queue("orders"));

        broker.send(&exchange, &msg).unwrap();

        let record = only_line(&sink, Severity::Info);
        assert_eq!(record["op"], "producer-send");
        assert_eq!(record["percentageBlocked"], serde_json::json!(0.42));
        assert!(record.get("totalTimeBlocked").is_none());
        assert_eq!(record["username"], "svc-billing");
        assert_eq!(record["clientId"], "billing");
        assert_eq!(broker.next().calls(), vec!["send"]);
    }

    #[test]
    fn send_includes_total_time_blocked_when_available() {
        let (broker, sink) = make_broker(RecordingBroker::default(), BreadcrumbConfig::default());
        let flow = FlowControlInfo {
            total_sends: 4,
            sends_blocked: 1,
            total_time_blocked_ms: 250,
        };
        let exchange = ProducerExchange::with_flow(None, Arc::new(flow));

        broker
            .send(&exchange, &make_message(Destination::queue("orders")))
            .unwrap();

        let record = only_line(&sink, Severity::Info);
        assert_eq!(record["percentageBlocked"], serde_json::json!(0.25));
        assert_eq!(record["totalTimeBlocked"], serde_json::json!(250));
    }

    #[test]
    fn send_error_from_next_propagates_after_logging() {
        let next = RecordingBroker {
            reject_sends: true,
            ..RecordingBroker::default()
        };
        let (broker, sink) = make_broker(next, BreadcrumbConfig::default());

        let err = broker
            .send(&ProducerExchange::new(None), &make_message(Destination::queue("q")))
            .unwrap_err();

        assert!(matches!(err, BrokerError::Rejected(ref reason) if reason == "queue full"));
        assert_eq!(sink.lines_at(Severity::Info).len(), 1);
    }

    // -- correlation ----------------------------------------------------------

    #[test]
    fn correlation_id_is_stable_across_events() {
        let (broker, sink) = make_broker(RecordingBroker::default(), BreadcrumbConfig::default());
        let msg = Arc::new(make_message(Destination::queue("orders")));
        assert!(msg.correlation_id().is_none());

        broker.send(&ProducerExchange::new(None), &msg).unwrap();
        let reference = MessageReference::from(Arc::clone(&msg));
        broker.message_delivered(None, &reference);
        broker.message_consumed(None, &reference);

        let id = msg.correlation_id().expect("assigned on first event").to_string();
        let lines = sink.lines_at(Severity::Info);
        assert_eq!(lines.len(), 3);
        for line in lines {
            let record: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(record["correlationId"], id.as_str());
        }
    }

    #[test]
    fn client_correlation_id_is_kept() {
        let (broker, sink) = make_broker(RecordingBroker::default(), BreadcrumbConfig::default());
        let msg = make_message(Destination::queue("orders")).with_correlation_id("order-123");

        broker.send(&ProducerExchange::new(None), &msg).unwrap();

        assert_eq!(msg.correlation_id(), Some("order-123"));
        assert_eq!(only_line(&sink, Severity::Info)["correlationId"], "order-123");
    }

    // -- dispatch events -------------------------------------------------------

    #[test]
    fn every_event_logs_once_and_delegates() {
        let (broker, sink) = make_broker(RecordingBroker::default(), BreadcrumbConfig::default());
        let reference = MessageReference::new(make_message(Destination::queue("orders")));
        let sub = Subscription {
            consumer_id: "ID:consumer-1".to_string(),
            destination: Destination::queue("orders"),
        };

        broker.message_consumed(None, &reference);
        broker.message_delivered(None, &reference);
        broker.message_discarded(None, &sub, &reference);
        broker.message_expired(None, &reference, Some(&sub));

        let ops: Vec<String> = sink
            .lines_at(Severity::Info)
            .iter()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["op"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            ops,
            vec!["message-consumed", "message-delivered", "message-discarded", "message-expired"]
        );
        assert_eq!(
            broker.next().calls(),
            vec!["consumed", "delivered", "discarded", "expired"]
        );
    }

    #[test]
    fn non_send_events_have_no_extra_fields() {
        let (broker, sink) = make_broker(RecordingBroker::default(), BreadcrumbConfig::default());
        let reference = MessageReference::new(make_message(Destination::queue("orders")));

        broker.message_expired(None, &reference, None);

        let record = only_line(&sink, Severity::Info);
        let object = record.as_object().unwrap();
        assert_eq!(object.len(), 15);
        assert!(!object.contains_key("percentageBlocked"));
        assert!(!object.contains_key("poisonCause"));
    }

    // -- dead letter -------------------------------------------------------------

    #[test]
    fn dead_letter_records_poison_cause_and_passes_result_through() {
        for expected in [true, false] {
            let next = RecordingBroker {
                dlq_result: expected,
                ..RecordingBroker::default()
            };
            let (broker, sink) = make_broker(next, BreadcrumbConfig::default());
            let reference = MessageReference::new(make_message(Destination::queue("orders")));

            let routed = broker.send_to_dead_letter_queue(None, &reference, None, Some(&DiskFull));

            assert_eq!(routed, expected);
            let record = only_line(&sink, Severity::Info);
            assert_eq!(record["op"], "send-to-dlq");
            assert_eq!(record["poisonCause"], "disk full");
        }
    }

    #[test]
    fn dead_letter_without_cause_logs_null() {
        let (broker, sink) = make_broker(RecordingBroker::default(), BreadcrumbConfig::default());
        let reference = MessageReference::new(make_message(Destination::queue("orders")));

        broker.send_to_dead_letter_queue(None, &reference, None, None);

        assert_eq!(only_line(&sink, Severity::Info)["poisonCause"], Value::Null);
    }

    // -- classification ------------------------------------------------------------

    #[test]
    fn advisory_traffic_logs_at_debug() {
        let (broker, sink) = make_broker(RecordingBroker::default(), BreadcrumbConfig::default());
        let advisory = Destination::topic(format!("{ADVISORY_TOPIC_PREFIX}Connection"));
        let reference = MessageReference::new(make_message(advisory));

        broker.message_delivered(None, &reference);

        assert_eq!(only_line(&sink, Severity::Debug)["op"], "message-delivered");
        assert!(sink.lines_at(Severity::Info).is_empty());
    }

    #[test]
    fn configured_prefixes_drive_classification() {
        let config = BreadcrumbConfig {
            advisory_prefixes: vec!["ops.".to_string()],
            ..BreadcrumbConfig::default()
        };
        let (broker, sink) = make_broker(RecordingBroker::default(), config);

        broker.message_delivered(
            None,
            &MessageReference::new(make_message(Destination::topic("ops.heartbeat"))),
        );
        broker.message_delivered(
            None,
            &MessageReference::new(make_message(Destination::topic("ActiveMQ.Advisory.Queue"))),
        );

        assert_eq!(sink.lines_at(Severity::Debug).len(), 1);
        assert_eq!(sink.lines_at(Severity::Info).len(), 1);
    }

    // -- body ----------------------------------------------------------------------

    #[test]
    fn body_is_logged_only_when_enabled() {
        let msg = make_message(Destination::queue("orders")).with_text("hello");

        let (quiet, quiet_sink) =
            make_broker(RecordingBroker::default(), BreadcrumbConfig::default());
        quiet.send(&ProducerExchange::new(None), &msg).unwrap();
        assert!(only_line(&quiet_sink, Severity::Info).get("body").is_none());

        let config = BreadcrumbConfig {
            log_body: true,
            ..BreadcrumbConfig::default()
        };
        let (verbose, verbose_sink) = make_broker(RecordingBroker::default(), config);
        verbose.send(&ProducerExchange::new(None), &msg).unwrap();
        assert_eq!(only_line(&verbose_sink, Severity::Info)["body"], "hello");
    }

    // -- failure isolation -------------------------------------------------------------

    #[test]
    fn panic_in_pipeline_still_delegates() {
        let (broker, sink) = make_broker(RecordingBroker::default(), BreadcrumbConfig::default());
        let exchange = ProducerExchange::with_flow(None, Arc::new(PanickingFlow));

        let result = broker.send(&exchange, &make_message(Destination::queue("orders")));

        assert!(result.is_ok());
        assert_eq!(broker.next().calls(), vec!["send"]);
        let warnings = sink.lines_at(Severity::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("producer-send"));
        assert!(warnings[0].contains("flow statistics unavailable"));
    }

    #[test]
    fn panicking_sink_never_blocks_delivery() {
        let sink = Arc::new(ExplodingSink {
            attempted: AtomicBool::new(false),
        });
        let next = RecordingBroker {
            dlq_result: true,
            ..RecordingBroker::default()
        };
        let broker = BreadcrumbLayer::with_sink(BreadcrumbConfig::default(), sink.clone()).layer(next);
        let reference = MessageReference::new(make_message(Destination::queue("orders")));

        assert!(broker.send_to_dead_letter_queue(None, &reference, None, Some(&DiskFull)));
        broker.message_consumed(None, &reference);

        assert!(sink.attempted.load(Ordering::SeqCst));
        assert_eq!(broker.next().calls(), vec!["dlq", "consumed"]);
    }

    #[test]
    fn serialization_fallback_still_emits_a_line() {
        let (broker, sink) = make_broker(RecordingBroker::default(), BreadcrumbConfig::default());
        let exchange = ProducerExchange::with_flow(
            None,
            Arc::new(EmptyWindowFlow {
                percentage: f64::NAN,
            }),
        );
        let msg = make_message(Destination::queue("orders")).with_correlation_id("cid-nan");

        broker.send(&exchange, &msg).unwrap();

        let info = sink.lines_at(Severity::Info);
        assert_eq!(info.len(), 1);
        assert!(info[0].starts_with("{correlationId=cid-nan, op=producer-send"));
        assert!(info[0].contains("percentageBlocked=NaN"));
        let warnings = sink.lines_at(Severity::Warn);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("cid-nan"));
    }

    // -- composition ---------------------------------------------------------------------

    #[test]
    fn layers_compose_with_service_builder() {
        let outer = Arc::new(MemorySink::new());
        let inner = Arc::new(MemorySink::new());
        let chain = ServiceBuilder::new()
            .layer(BreadcrumbLayer::with_sink(BreadcrumbConfig::default(), outer.clone()))
            .layer(BreadcrumbLayer::with_sink(BreadcrumbConfig::default(), inner.clone()))
            .service(RecordingBroker::default());

        let msg = make_message(Destination::queue("orders"));
        chain.send(&ProducerExchange::new(None), &msg).unwrap();

        let outer_record: Value = serde_json::from_str(&outer.lines()[0].1).unwrap();
        let inner_record: Value = serde_json::from_str(&inner.lines()[0].1).unwrap();
        assert_eq!(outer_record["correlationId"], inner_record["correlationId"]);
        assert_eq!(chain.next().next().calls(), vec!["send"]);
    }

    #[test]
    fn concurrent_events_share_one_correlation_id() {
        let (broker, sink) = make_broker(RecordingBroker::default(), BreadcrumbConfig::default());
        let reference = MessageReference::new(make_message(Destination::queue("orders")));
        let counter = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    broker.message_delivered(None, &reference);
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        assert_eq!(counter.load(Ordering::SeqCst), 8);
        let ids: HashSet<String> = sink
            .lines_at(Severity::Info)
            .iter()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["correlationId"].to_string())
            .collect();
        assert_eq!(ids.len(), 1);
    }
}
