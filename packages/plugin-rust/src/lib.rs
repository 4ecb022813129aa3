//! Breadcrumb Plugin: a broker filter that writes one structured audit
//! record per message lifecycle event.
//!
//! Each record carries a correlation id that is assigned on first sight and
//! travels with the message, so every hop of a message can be joined in the
//! logs. Logging never interferes with delivery: failures degrade to null
//! fields or warning lines and the call always reaches the next broker.

pub mod chain;
pub mod classify;
pub mod config;
pub mod correlation;
pub mod extract;
pub mod interceptor;
pub mod logging;
pub mod plugin;
pub mod record;
pub mod serialize;
pub mod sink;

pub use chain::{install_plugins, PluginChain};
pub use classify::{classify, TrafficClass};
pub use config::{BreadcrumbConfig, ConfigError};
pub use correlation::ensure_correlation_id;
pub use interceptor::{BreadcrumbBroker, BreadcrumbLayer};
pub use logging::{init_tracing, LogFormat, LOG_ENV};
pub use plugin::BreadcrumbPlugin;
pub use record::{BreadcrumbRecord, ExtraFields, FieldValue, Op};
pub use serialize::{serialize, RecordSerializer};
pub use sink::{LogSink, MemorySink, Severity, TracingSink, BREADCRUMB_TARGET};
