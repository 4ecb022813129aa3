//! The in-flight message envelope as the broker hands it to lifecycle handlers.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::destination::Destination;
use crate::error::MessageError;
use crate::properties::PropertyStore;

// ---------------------------------------------------------------------------
// MessageId
// ---------------------------------------------------------------------------

/// Broker-unique message identifier: producer id plus per-producer sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId {
    pub producer_id: String,
    pub producer_sequence_id: u64,
}

impl MessageId {
    #[must_use]
    pub fn new(producer_id: impl Into<String>, producer_sequence_id: u64) -> Self {
        Self {
            producer_id: producer_id.into(),
            producer_sequence_id,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.producer_id, self.producer_sequence_id)
    }
}

// ---------------------------------------------------------------------------
// MessageBody
// ---------------------------------------------------------------------------

/// Message payload. Text bodies stay in their encoded form until read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text(Vec<u8>),
    Bytes(Vec<u8>),
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A message envelope.
///
/// The correlation id is a write-once slot: it can be filled through a
/// shared reference, and once filled it never changes, even when several
/// threads race to fill it.
#[derive(Debug, Clone)]
pub struct Message {
    pub message_id: MessageId,
    correlation_id: OnceLock<String>,
    pub destination: Destination,
    /// Application-defined type tag (`JMSType`).
    pub message_type: Option<String>,
    /// Encoded size in bytes.
    pub size: u32,
    /// Expiration as epoch milliseconds. `0` means never.
    pub expiration: i64,
    /// Ids of the brokers this message has passed through, oldest first.
    pub broker_path: Option<Vec<String>>,
    /// Epoch milliseconds the message entered this broker.
    pub broker_in_time: i64,
    /// Epoch milliseconds the message left this broker.
    pub broker_out_time: i64,
    pub properties: PropertyStore,
    pub body: Option<MessageBody>,
}

impl Message {
    /// Creates an empty message with no correlation id.
    #[must_use]
    pub fn new(message_id: MessageId, destination: Destination) -> Self {
        Self {
            message_id,
            correlation_id: OnceLock::new(),
            destination,
            message_type: None,
            size: 0,
            expiration: 0,
            broker_path: None,
            broker_in_time: 0,
            broker_out_time: 0,
            properties: PropertyStore::default(),
            body: None,
        }
    }

    /// Builder-style helper presetting the correlation id.
    #[must_use]
    pub fn with_correlation_id(self, id: impl Into<String>) -> Self {
        // Fresh slot on a by-value message, so the set cannot lose.
        let _ = self.correlation_id.set(id.into());
        self
    }

    /// Builder-style helper setting a UTF-8 text body.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.body = Some(MessageBody::Text(text.into().into_bytes()));
        self
    }

    /// Builder-style helper replacing the property store.
    #[must_use]
    pub fn with_properties(mut self, properties: impl Into<PropertyStore>) -> Self {
        self.properties = properties.into();
        self
    }

    /// The correlation id, if one has been set.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.get().map(String::as_str)
    }

    /// Returns the correlation id, filling it with `init()` first if absent.
    ///
    /// When several callers race, exactly one `init` result is stored and all
    /// callers observe it.
    pub fn correlation_id_or_init(&self, init: impl FnOnce() -> String) -> &str {
        self.correlation_id.get_or_init(init)
    }

    /// Runtime message type, named after the body kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self.body {
            Some(MessageBody::Text(_)) => "TextMessage",
            Some(MessageBody::Bytes(_)) => "BytesMessage",
            None => "Message",
        }
    }

    /// The text body, if this is a text message.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidText`] when the stored text is not UTF-8.
    pub fn text(&self) -> Result<Option<&str>, MessageError> {
        match &self.body {
            Some(MessageBody::Text(bytes)) => Ok(Some(std::str::from_utf8(bytes)?)),
            _ => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// MessageReference
// ---------------------------------------------------------------------------

/// Shared handle to a message held by the broker's dispatch structures.
#[derive(Debug, Clone)]
pub struct MessageReference {
    message: Arc<Message>,
}

impl MessageReference {
    #[must_use]
    pub fn new(message: Message) -> Self {
        Self {
            message: Arc::new(message),
        }
    }

    /// The referenced message.
    #[must_use]
    pub fn message(&self) -> &Message {
        &self.message
    }
}

impl From<Arc<Message>> for MessageReference {
    fn from(message: Arc<Message>) -> Self {
        Self { message }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
