use std::collections::HashSet;

use crate::error::MessageError;
use crate::properties::{PropertyMap, PropertyStore, PropertyValue};

/// Per-connection state the broker threads through lifecycle calls.
/// Every part is optional: an anonymous, half-negotiated connection is normal.
#[derive(Debug, Clone, Default)]
pub struct ConnectionContext {
    /// Negotiated wire format, once the handshake has completed.
    pub wire_format_info: Option<WireFormatInfo>,
    /// Authenticated identity, when authentication is enabled.
    pub security_context: Option<SecurityContext>,
    /// Transport-level connection state.
    pub connection_state: Option<ConnectionState>,
}

/// Wire format negotiated with the client. Provider details live in a
/// marshalled property block, so reading them may fail.
#[derive(Debug, Clone, Default)]
pub struct WireFormatInfo {
    /// Protocol version number.
    pub version: u32,
    properties: PropertyStore,
}

impl WireFormatInfo {
    const PROVIDER_NAME: &'static str = "ProviderName";
    const PROVIDER_VERSION: &'static str = "ProviderVersion";

    /// Wire format info with the given provider name and version.
    #[must_use]
    pub fn new(version: u32, provider_name: &str, provider_version: &str) -> Self {
        let mut map = PropertyMap::new();
        map.insert(Self::PROVIDER_NAME.to_string(), PropertyValue::from(provider_name));
        map.insert(
            Self::PROVIDER_VERSION.to_string(),
            PropertyValue::from(provider_version),
        );
        Self {
            version,
            properties: PropertyStore::Decoded(map),
        }
    }

    /// Wire format info backed by an arbitrary property store.
    #[must_use]
    pub fn from_properties(version: u32, properties: PropertyStore) -> Self {
        Self {
            version,
            properties,
        }
    }

    /// Client library name, e.g. `ActiveMQ`.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::PropertyDecode`] if the property block is corrupt.
    pub fn provider_name(&self) -> Result<Option<String>, MessageError> {
        self.property(Self::PROVIDER_NAME)
    }

    /// Client library version.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::PropertyDecode`] if the property block is corrupt.
    pub fn provider_version(&self) -> Result<Option<String>, MessageError> {
        self.property(Self::PROVIDER_VERSION)
    }

    fn property(&self, key: &str) -> Result<Option<String>, MessageError> {
        let map = self.properties.read()?;
        Ok(map.get(key).and_then(|v| v.to_property_string().ok()))
    }
}

/// Authenticated principal attached to a security context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    /// An individual identity.
    User(String),
    /// A group the identity belongs to; these are reported as roles.
    Group(String),
}

impl Principal {
    /// Name of the principal regardless of kind.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::User(name) | Self::Group(name) => name,
        }
    }

    /// Whether this is a group principal.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

/// Security identity of a connection.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    /// Login name, if the authenticator recorded one.
    pub user_name: Option<String>,
    /// All principals granted at login. Iteration order is unspecified.
    pub principals: HashSet<Principal>,
}

/// Transport-level state of a connection.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    /// Client-supplied connection info, once received.
    pub info: Option<ConnectionInfo>,
}

/// Connection info sent by the client on connect.
#[derive(Debug, Clone, Default)]
pub struct ConnectionInfo {
    /// Remote address of the client, e.g. `tcp://10.0.0.5:51234`.
    pub client_ip: Option<String>,
    /// Client-chosen identifier.
    pub client_id: Option<String>,
}
