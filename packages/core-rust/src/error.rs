//! Error types shared by the broker model and lifecycle traits.

/// Errors raised while reading broker-owned message or wire-format state.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// Marshalled properties could not be decoded.
    #[error("failed to decode marshalled properties: {0}")]
    PropertyDecode(String),
    /// Properties could not be marshalled.
    #[error("failed to encode properties: {0}")]
    PropertyEncode(String),
    /// A text body did not hold valid UTF-8.
    #[error("text body is not valid UTF-8: {0}")]
    InvalidText(#[from] std::str::Utf8Error),
}

/// A property value has no string rendering (bytes, lists, maps).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert {kind} property to string")]
pub struct PropertyConversionError {
    /// Type name of the offending value.
    pub kind: &'static str,
}

/// Errors from the broker's own flow-control statistics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatisticError {
    /// The statistic's sampling window was empty.
    #[error("division by zero computing {statistic}")]
    DivisionByZero {
        /// Name of the statistic being computed.
        statistic: &'static str,
    },
}

/// Errors returned by broker handlers in the lifecycle chain.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The broker refused the message.
    #[error("message rejected: {0}")]
    Rejected(String),
    /// A plugin could not be installed into the chain.
    #[error("failed to install plugin {plugin}: {reason}")]
    PluginInstall {
        /// Name of the plugin.
        plugin: &'static str,
        /// Why installation failed.
        reason: String,
    },
    /// Any other handler failure.
    #[error("internal broker error: {0}")]
    Internal(String),
}
