//! Breadcrumb Core: the broker-owned message model, connection context,
//! and the lifecycle traits a broker filter chain is built from.

pub mod context;
pub mod destination;
pub mod error;
pub mod exchange;
pub mod message;
pub mod null;
pub mod properties;
pub mod traits;

pub use context::{
    ConnectionContext, ConnectionInfo, ConnectionState, Principal, SecurityContext, WireFormatInfo,
};
pub use destination::{Destination, ADVISORY_TOPIC_PREFIX};
pub use error::{BrokerError, MessageError, PropertyConversionError, StatisticError};
pub use exchange::{FlowControlInfo, ProducerExchange, Subscription};
pub use message::{Message, MessageBody, MessageId, MessageReference};
pub use null::NullBroker;
pub use properties::{PropertyMap, PropertyStore, PropertyValue};
pub use traits::{Broker, BrokerPlugin, FlowStatistics, PoisonCause};
