//! Message destinations.

use std::fmt;

/// Physical-name prefix of the broker's advisory topics.
pub const ADVISORY_TOPIC_PREFIX: &str = "ActiveMQ.Advisory.";

/// Where a message is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    Queue(String),
    Topic(String),
    TempQueue(String),
    TempTopic(String),
    /// Fan-out to several destinations at once.
    Composite(Vec<Destination>),
}

impl Destination {
    /// Creates a queue destination.
    #[must_use]
    pub fn queue(name: impl Into<String>) -> Self {
        Self::Queue(name.into())
    }

    /// Creates a topic destination.
    #[must_use]
    pub fn topic(name: impl Into<String>) -> Self {
        Self::Topic(name.into())
    }

    /// Physical name. Composite destinations join their members with `,`.
    #[must_use]
    pub fn physical_name(&self) -> String {
        match self {
            Self::Queue(name) | Self::Topic(name) | Self::TempQueue(name) | Self::TempTopic(name) => {
                name.clone()
            }
            Self::Composite(members) => members
                .iter()
                .map(Destination::physical_name)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Whether this is a (possibly temporary) topic.
    #[must_use]
    pub fn is_topic(&self) -> bool {
        matches!(self, Self::Topic(_) | Self::TempTopic(_))
    }

    /// Members of a composite destination, or `self` alone otherwise.
    #[must_use]
    pub fn members(&self) -> &[Destination] {
        match self {
            Self::Composite(members) => members,
            other => std::slice::from_ref(other),
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            Self::Queue(_) => "queue",
            Self::Topic(_) => "topic",
            Self::TempQueue(_) => "temp-queue",
            Self::TempTopic(_) => "temp-topic",
            Self::Composite(_) => "composite",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme(), self.physical_name())
    }
}
