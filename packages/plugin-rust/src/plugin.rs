//! Broker plugin that installs the breadcrumb interceptor.

use std::sync::Arc;

use breadcrumb_core::{Broker, BrokerError, BrokerPlugin};
use tower::Layer;
use tracing::info;

use crate::config::BreadcrumbConfig;
use crate::interceptor::BreadcrumbLayer;
use crate::sink::{LogSink, TracingSink};

/// Plugin wrapping the next broker in a [`BreadcrumbBroker`](crate::BreadcrumbBroker).
pub struct BreadcrumbPlugin {
    config: BreadcrumbConfig,
    sink: Arc<dyn LogSink>,
}

impl BreadcrumbPlugin {
    /// Plugin writing through `tracing`.
    #[must_use]
    pub fn new(config: BreadcrumbConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Plugin writing to `sink`.
    #[must_use]
    pub fn with_sink(config: BreadcrumbConfig, sink: Arc<dyn LogSink>) -> Self {
        Self { config, sink }
    }

    #[must_use]
    pub fn config(&self) -> &BreadcrumbConfig {
        &self.config
    }

    /// The layer this plugin applies, for hosts composing with `tower`.
    #[must_use]
    pub fn layer(&self) -> BreadcrumbLayer {
        BreadcrumbLayer::with_sink(self.config.clone(), Arc::clone(&self.sink))
    }
}

impl Default for BreadcrumbPlugin {
    fn default() -> Self {
        Self::new(BreadcrumbConfig::default())
    }
}

impl BrokerPlugin for BreadcrumbPlugin {
    fn name(&self) -> &'static str {
        "breadcrumb"
    }

    fn install(&self, next: Box<dyn Broker>) -> Result<Box<dyn Broker>, BrokerError> {
        info!(
            advisory_prefixes = ?self.config.advisory_prefixes,
            log_body = self.config.log_body,
            "breadcrumb plugin loaded"
        );
        Ok(Box::new(self.layer().layer(next)))
    }
}
