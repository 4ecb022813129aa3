//! Drives one message through every lifecycle event so the breadcrumb
//! output can be inspected.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use breadcrumb_core::{
    Broker, ConnectionContext, ConnectionInfo, ConnectionState, Destination,
    FlowControlInfo, Message, MessageId, MessageReference, NullBroker, Principal,
    ProducerExchange, PropertyMap, PropertyValue, SecurityContext, Subscription, WireFormatInfo,
    ADVISORY_TOPIC_PREFIX,
};
use breadcrumb_plugin::{init_tracing, BreadcrumbConfig, BreadcrumbPlugin, LogFormat, PluginChain};
use clap::Parser;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "breadcrumb-demo", about = "Emit sample breadcrumb records")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, env = "BREADCRUMB_LOG_FORMAT")]
    format: LogFormat,

    /// Include text bodies in records.
    #[arg(long)]
    log_body: bool,

    /// Filter directive used when neither BREADCRUMB_LOG nor RUST_LOG is set.
    #[arg(long, default_value = "debug")]
    filter: String,

    /// JSON plugin config file. Command-line flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug)]
struct PoisonAck(&'static str);

impl fmt::Display for PoisonAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for PoisonAck {}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.format, &cli.filter)?;

    let mut config = match &cli.config {
        Some(path) => BreadcrumbConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BreadcrumbConfig::default(),
    };
    config.log_body |= cli.log_body;

    let mut chain = PluginChain::new();
    chain.register(Arc::new(BreadcrumbPlugin::new(config)));
    let broker = chain.install(Box::new(NullBroker))?;
    info!(plugins = ?chain.names().collect::<Vec<_>>(), "broker chain ready");

    let context = Arc::new(client_context());
    let exchange = ProducerExchange::with_flow(
        Some(Arc::clone(&context)),
        Arc::new(FlowControlInfo {
            total_sends: 10,
            sends_blocked: 3,
            total_time_blocked_ms: 1_250,
        }),
    );
    let subscription = Subscription {
        consumer_id: "ID:demo-consumer-1".to_string(),
        destination: Destination::queue("orders"),
    };

    let mut properties = PropertyMap::new();
    properties.insert("tenant".to_string(), PropertyValue::from("acme"));
    properties.insert("priority".to_string(), PropertyValue::Int(4));
    properties.insert("signature".to_string(), PropertyValue::Bytes(vec![0xde, 0xad]));

    let mut message = Message::new(
        MessageId::new("ID:demo-producer-1", 1),
        Destination::queue("orders"),
    )
    .with_text(r#"{"order":42}"#)
    .with_properties(properties);
    message.size = 512;
    let reference = MessageReference::new(message);
    let ctx = Some(context.as_ref());

    broker.send(&exchange, reference.message())?;
    broker.message_delivered(ctx, &reference);
    broker.message_consumed(ctx, &reference);
    broker.message_discarded(ctx, &subscription, &reference);
    broker.message_expired(ctx, &reference, Some(&subscription));
    let cause = PoisonAck("redelivery limit exceeded");
    let routed =
        broker.send_to_dead_letter_queue(ctx, &reference, Some(&subscription), Some(&cause));
    info!(routed, "dead-letter routing finished");

    let advisory = MessageReference::new(Message::new(
        MessageId::new("ID:broker", 1),
        Destination::topic(format!("{ADVISORY_TOPIC_PREFIX}Consumer.Queue.orders")),
    ));
    broker.message_delivered(None, &advisory);

    Ok(())
}

fn client_context() -> ConnectionContext {
    ConnectionContext {
        wire_format_info: Some(WireFormatInfo::new(12, "ActiveMQ", "5.18.3")),
        security_context: Some(SecurityContext {
            user_name: Some("demo-user".to_string()),
            principals: HashSet::from([
                Principal::User("demo-user".to_string()),
                Principal::Group("producers".to_string()),
            ]),
        }),
        connection_state: Some(ConnectionState {
            info: Some(ConnectionInfo {
                client_ip: Some("tcp://127.0.0.1:54012".to_string()),
                client_id: Some("demo-client".to_string()),
            }),
        }),
    }
}
