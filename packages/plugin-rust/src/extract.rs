//! Field extraction: flattens connection context and message envelope into a
//! [`BreadcrumbRecord`].
//!
//! Every lookup is an optional chain. A missing link anywhere yields a null
//! field, never an error; reads that can fail (wire-format properties,
//! marshalled message properties, text bodies) degrade the same way.

use std::collections::BTreeMap;

use breadcrumb_core::{ConnectionContext, ConnectionInfo, Message, SecurityContext};

use crate::correlation::ensure_correlation_id;
use crate::record::{BreadcrumbRecord, FieldValue, Op};
use crate::sink::{LogSink, Severity};

/// Builds the base record for `op`.
///
/// Assigns a correlation id to `message` if it has none. Fields are written
/// in a fixed order; `messageProperties` is left out only when the property
/// mapping itself cannot be read.
pub fn extract(
    context: Option<&ConnectionContext>,
    message: &Message,
    op: Op,
    sink: &dyn LogSink,
) -> BreadcrumbRecord {
    let mut record = BreadcrumbRecord::new();

    record.insert("correlationId", ensure_correlation_id(message));
    record.insert("op", op.as_str());

    let wire = context.and_then(|c| c.wire_format_info.as_ref());
    record.insert(
        "providerName",
        wire.and_then(|w| w.provider_name().ok().flatten()),
    );
    record.insert(
        "providerVersion",
        wire.and_then(|w| w.provider_version().ok().flatten()),
    );

    let security = context.and_then(|c| c.security_context.as_ref());
    record.insert("username", security.and_then(|s| s.user_name.clone()));
    record.insert("roles", role_names(security));

    let info = connection_info(context);
    record.insert("clientIp", info.and_then(|i| i.client_ip.clone()));
    record.insert("clientId", info.and_then(|i| i.client_id.clone()));

    if let Some(properties) = string_properties(message, sink) {
        record.insert("messageProperties", FieldValue::Map(properties));
    }

    record.insert("messageType", message.message_type.clone());
    record.insert("messageExpiration", message.expiration);
    record.insert("brokerPath", message.broker_path.clone());
    record.insert("brokerInTime", message.broker_in_time);
    record.insert("brokerOutTime", message.broker_out_time);
    record.insert("messageSize", message.size);

    record
}

/// Appends the text body as `body`. Non-text messages are left alone; an
/// unreadable text body is reported and skipped.
pub fn append_body(record: &mut BreadcrumbRecord, message: &Message, sink: &dyn LogSink) {
    match message.text() {
        Ok(Some(text)) => record.insert("body", text),
        Ok(None) => {}
        Err(e) => sink.write_line(
            Severity::Warn,
            &format!(
                "unable to get message body for {}: {e}",
                record.correlation_id()
            ),
        ),
    }
}

/// Names of group principals. Order follows the principal set and is not
/// stable across runs.
fn role_names(security: Option<&SecurityContext>) -> Vec<String> {
    security
        .map(|s| {
            s.principals
                .iter()
                .filter(|p| p.is_group())
                .map(|p| p.name().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn connection_info(context: Option<&ConnectionContext>) -> Option<&ConnectionInfo> {
    context
        .and_then(|c| c.connection_state.as_ref())
        .and_then(|s| s.info.as_ref())
}

/// Message properties rendered as strings. Values without a string form are
/// reported once each and dropped; an unreadable mapping yields `None`.
fn string_properties(
    message: &Message,
    sink: &dyn LogSink,
) -> Option<BTreeMap<String, FieldValue>> {
    let properties = message.properties.read().ok()?;
    let mut rendered = BTreeMap::new();
    for (name, value) in properties.iter() {
        match value.to_property_string() {
            Ok(text) => {
                rendered.insert(name.clone(), FieldValue::String(text));
            }
            Err(_) => sink.write_line(
                Severity::Warn,
                &format!(
                    "unable to convert property to string: property name - {name}, \
                     message type - {}, property type - {}",
                    message.kind_name(),
                    value.type_name()
                ),
            ),
        }
    }
    Some(rendered)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
