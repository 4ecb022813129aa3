//! Record serialization: pretty-printed JSON with a plain-text fallback.

use std::sync::OnceLock;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::record::BreadcrumbRecord;
use crate::sink::{LogSink, Severity};

static SHARED: OnceLock<RecordSerializer> = OnceLock::new();

/// JSON rendering settings for breadcrumb records.
///
/// One process-wide instance is created on first use by [`serialize`] and
/// shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct RecordSerializer {
    indent: &'static [u8],
}

impl Default for RecordSerializer {
    fn default() -> Self {
        Self { indent: b"  " }
    }
}

impl RecordSerializer {
    /// The process-wide serializer.
    pub fn shared() -> &'static Self {
        SHARED.get_or_init(Self::default)
    }

    /// Renders `record` as pretty-printed JSON. Keys keep record order and
    /// null fields are written as `null`.
    ///
    /// # Errors
    ///
    /// Returns the encoder error when a value has no JSON form (non-finite
    /// floats).
    pub fn to_json(&self, record: &BreadcrumbRecord) -> Result<String, serde_json::Error> {
        let mut buf = Vec::with_capacity(512);
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(self.indent));
        record.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Renders `record`, falling back to its plain `{key=value}` dump when
    /// JSON encoding fails. The failure is reported to `sink` as a warning
    /// carrying the correlation id; it is never returned.
    pub fn render(&self, record: &BreadcrumbRecord, sink: &dyn LogSink) -> String {
        match self.to_json(record) {
            Ok(json) => json,
            Err(e) => {
                sink.write_line(
                    Severity::Warn,
                    &format!(
                        "unable to convert breadcrumb {} to json, falling back to plain text: {e}",
                        record.correlation_id()
                    ),
                );
                record.to_string()
            }
        }
    }
}

/// Renders `record` with the shared serializer. See [`RecordSerializer::render`].
pub fn serialize(record: &BreadcrumbRecord, sink: &dyn LogSink) -> String {
    RecordSerializer::shared().render(record, sink)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
