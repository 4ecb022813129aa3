//! Traffic classification: broker advisory traffic vs. application traffic.

use breadcrumb_core::Destination;

use crate::sink::Severity;

/// Kind of traffic a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficClass {
    /// Broker advisory/administrative messages.
    System,
    /// Everything else.
    Application,
}

impl TrafficClass {
    /// Severity the breadcrumb line is written at.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::System => Severity::Debug,
            Self::Application => Severity::Info,
        }
    }
}

/// Classifies a destination. A topic whose physical name starts with one of
/// `advisory_prefixes` is system traffic; a composite destination is system
/// traffic if any member is.
#[must_use]
pub fn classify(destination: &Destination, advisory_prefixes: &[String]) -> TrafficClass {
    let advisory = destination.members().iter().any(|member| {
        member.is_topic() && {
            let name = member.physical_name();
            advisory_prefixes.iter().any(|p| name.starts_with(p.as_str()))
        }
    });
    if advisory {
        TrafficClass::System
    } else {
        TrafficClass::Application
    }
}
