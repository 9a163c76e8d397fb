//! Envelope: the JSON message wrapper exchanged over the live-update channel.
//!
//! DESIGN
//! ======
//! Both directions share one shape: `{ "type", "data", "timestamp"? }`.
//! Outbound envelopes are always stamped at send time. Inbound envelopes are
//! accepted with or without a type tag (an empty tag is no tag) and with any
//! timestamp value; the tag only decides which event name the envelope is
//! dispatched under.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Event name used for inbound envelopes that carry no type tag.
pub const GENERIC_EVENT: &str = "message";

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("invalid envelope JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("envelope must be a JSON object")]
    NotAnObject,
    #[error("failed to format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// One message on the live-update wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Type tag. Required on outbound messages, optional inbound.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Opaque payload. Missing inbound data decodes as `null`.
    #[serde(default)]
    pub data: Value,
    /// ISO-8601 send time. Never validated on inbound messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
}

impl Envelope {
    /// Build an outbound envelope stamped with the current UTC time.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Timestamp`] if the clock cannot be rendered
    /// as RFC 3339.
    pub fn outbound(kind: impl Into<String>, data: Value) -> Result<Self, EnvelopeError> {
        Ok(Self { kind: Some(kind.into()), data, timestamp: Some(Value::String(now_rfc3339()?)) })
    }

    /// Parse an inbound text payload.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Json`] for non-JSON text or mistyped fields
    /// and [`EnvelopeError::NotAnObject`] for JSON arrays and scalars.
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(EnvelopeError::NotAnObject);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize for transmission.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Name of the event this envelope is dispatched under. An empty type
    /// tag counts as no tag.
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.kind.as_deref().filter(|kind| !kind.is_empty()).unwrap_or(GENERIC_EVENT)
    }
}

fn now_rfc3339() -> Result<String, EnvelopeError> {
    Ok(OffsetDateTime::now_utc().format(&Rfc3339)?)
}

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;
