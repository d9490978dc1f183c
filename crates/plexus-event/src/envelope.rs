//! Wire intake normalization.
//!
//! External producers reach the router through one of two equivalent
//! JSON encodings, normalized here to the same internal [`Event`]:
//!
//! ```text
//! {"event": "ns:verb", "data": {...}, "_context": {...}}
//!
//! {"type": "ksi_tool_use", "id": "...", "name": "ns:verb", "input": {...}}
//! ```
//!
//! The tool-call shape exists because LLM-driven producers are more
//! reliable emitting tool calls for payloads with multi-line or nested
//! content. Both shapes are first-class; nothing downstream of intake
//! can tell which one arrived.

use crate::{validate_event_name, Event, EventContext, EventError};
use chrono::{DateTime, Utc};
use plexus_types::{CorrelationId, EventId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The `type` discriminator of the tool-call wire shape.
pub const TOOL_CALL_TYPE: &str = "ksi_tool_use";

/// Context fields as they appear on the wire. All optional; missing
/// fields are synthesized at normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct WireContext {
    correlation_id: Option<Uuid>,
    parent_event_id: Option<Uuid>,
    root_event_id: Option<Uuid>,
    depth: Option<u32>,
    client_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
}

impl WireContext {
    fn into_context(self) -> EventContext {
        EventContext {
            correlation_id: self
                .correlation_id
                .map(CorrelationId)
                .unwrap_or_else(CorrelationId::new),
            parent_event_id: self.parent_event_id.map(EventId),
            root_event_id: self.root_event_id.map(EventId),
            depth: self.depth.unwrap_or(0),
            client_id: self.client_id,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        }
    }

    fn from_context(ctx: &EventContext) -> Self {
        Self {
            correlation_id: Some(ctx.correlation_id.uuid()),
            parent_event_id: ctx.parent_event_id.map(|id| id.uuid()),
            root_event_id: ctx.root_event_id.map(|id| id.uuid()),
            depth: Some(ctx.depth),
            client_id: ctx.client_id.clone(),
            timestamp: Some(ctx.timestamp),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FlatWire {
    event: String,
    #[serde(default)]
    data: Value,
    #[serde(rename = "_context", default)]
    context: Option<WireContext>,
}

#[derive(Debug, Deserialize)]
struct ToolCallWire {
    name: String,
    #[serde(default)]
    input: Value,
    #[serde(rename = "_context", default)]
    context: Option<WireContext>,
}

/// Wire envelope intake.
pub struct Envelope;

impl Envelope {
    /// Normalizes a wire JSON value to an internal [`Event`].
    ///
    /// Accepts both the flat shape and the tool-call shape; unknown
    /// shapes and invalid event names are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::MalformedEnvelope`] for unrecognized
    /// shapes and [`EventError::InvalidName`] for bad event names.
    pub fn normalize(value: Value) -> Result<Event, EventError> {
        let Some(obj) = value.as_object() else {
            return Err(EventError::MalformedEnvelope(
                "envelope must be a JSON object".into(),
            ));
        };

        let (name, data, context) = if obj.get("type").and_then(Value::as_str)
            == Some(TOOL_CALL_TYPE)
        {
            let wire: ToolCallWire = serde_json::from_value(value)
                .map_err(|e| EventError::MalformedEnvelope(format!("tool-call shape: {e}")))?;
            (wire.name, wire.input, wire.context)
        } else if obj.contains_key("event") {
            let wire: FlatWire = serde_json::from_value(value)
                .map_err(|e| EventError::MalformedEnvelope(format!("flat shape: {e}")))?;
            (wire.event, wire.data, wire.context)
        } else {
            return Err(EventError::MalformedEnvelope(
                "expected 'event' key or type 'ksi_tool_use'".into(),
            ));
        };

        validate_event_name(&name)?;

        let context = context.unwrap_or_default().into_context();
        Ok(Event::with_context(name, data, context))
    }

    /// Serializes an event back to the flat wire shape.
    ///
    /// Used when routing results and error events out to external
    /// clients. Every context field is carried; nothing is dropped at
    /// the boundary.
    #[must_use]
    pub fn to_wire(event: &Event) -> Value {
        serde_json::json!({
            "event": event.name,
            "data": event.payload,
            "_context": WireContext::from_context(&event.context),
        })
    }
}
