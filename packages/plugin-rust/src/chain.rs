//! Ordered plugin chain: installs broker plugins around a core broker.

use std::sync::Arc;

use breadcrumb_core::{Broker, BrokerError, BrokerPlugin};
use tracing::debug;

/// Plugins in registration order. The first registered plugin ends up
/// outermost and sees every call first.
#[derive(Default)]
pub struct PluginChain {
    plugins: Vec<Arc<dyn BrokerPlugin>>,
}

impl PluginChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a plugin. Registration order determines call order.
    pub fn register(&mut self, plugin: Arc<dyn BrokerPlugin>) -> &mut Self {
        self.plugins.push(plugin);
        self
    }

    /// Registered plugin names, outermost first.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.iter().map(|p| p.name())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Wraps `core` with every registered plugin.
    ///
    /// # Errors
    ///
    /// Returns the first plugin's install error; plugins after it are not
    /// installed.
    pub fn install(&self, core: Box<dyn Broker>) -> Result<Box<dyn Broker>, BrokerError> {
        install_plugins(core, &self.plugins)
    }
}

/// Installs `plugins` around `core`, innermost last, so `plugins[0]` is the
/// outermost filter.
///
/// # Errors
///
/// Returns the first install error encountered.
pub fn install_plugins(
    core: Box<dyn Broker>,
    plugins: &[Arc<dyn BrokerPlugin>],
) -> Result<Box<dyn Broker>, BrokerError> {
    plugins.iter().rev().try_fold(core, |next, plugin| {
        debug!(plugin = plugin.name(), "installing broker plugin");
        plugin.install(next)
    })
}
