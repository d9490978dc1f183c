//! Mapping template resolution.
//!
//! A mapping value is a string with `{{dotted.path}}` placeholders
//! resolved against the source event. A template that is exactly one
//! placeholder substitutes the raw JSON value, preserving its type;
//! anything else interpolates into a string.
//!
//! Resolution is all-or-nothing: any placeholder that does not
//! resolve fails the whole transformation. A literal `{{var}}` is
//! never emitted as output.

use crate::TransformError;
use plexus_event::Event;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Builds the `{"data": ..., "context": ...}` scope templates and
/// conditions resolve against.
pub(crate) fn scope_of(event: &Event) -> Value {
    json!({
        "data": event.payload,
        "context": {
            "correlation_id": event.context.correlation_id,
            "parent_event_id": event.context.parent_event_id,
            "root_event_id": event.context.root_event_id,
            "depth": event.context.depth,
            "client_id": event.context.client_id,
            "timestamp": event.context.timestamp,
        },
    })
}

/// Resolves a full mapping into a target payload.
///
/// An empty mapping passes the source payload through unmodified.
///
/// # Errors
///
/// Returns [`TransformError::TemplateUnresolved`] naming the first
/// placeholder that fails to resolve.
pub(crate) fn resolve_mapping(
    mapping: &BTreeMap<String, String>,
    event: &Event,
) -> Result<Value, TransformError> {
    if mapping.is_empty() {
        return Ok(event.payload.clone());
    }

    let scope = scope_of(event);
    let mut payload = Map::new();
    for (field, template) in mapping {
        payload.insert(field.clone(), resolve_template(template, &scope)?);
    }
    Ok(Value::Object(payload))
}

/// Resolves one template string against a scope.
pub(crate) fn resolve_template(template: &str, scope: &Value) -> Result<Value, TransformError> {
    // Whole-string placeholder: substitute the raw value.
    if let Some(path) = sole_placeholder(template) {
        return lookup(scope, path).cloned().ok_or_else(|| unresolved(template, path));
    }

    let mut output = String::new();
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start..].find("}}") else {
            // Unterminated braces are literal text.
            break;
        };
        output.push_str(&rest[..start]);
        let path = rest[start + 2..start + end].trim();
        let value = lookup(scope, path).ok_or_else(|| unresolved(template, path))?;
        output.push_str(&stringify(value));
        rest = &rest[start + end + 2..];
    }
    output.push_str(rest);
    Ok(Value::String(output))
}

/// Returns the inner path when the template is exactly one
/// placeholder.
fn sole_placeholder(template: &str) -> Option<&str> {
    let inner = template.strip_prefix("{{")?.strip_suffix("}}")?;
    let inner = inner.trim();
    if inner.contains('{') || inner.contains('}') {
        return None;
    }
    Some(inner)
}

fn lookup<'a>(scope: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cursor = scope;
    for segment in path.split('.') {
        cursor = cursor.as_object()?.get(segment)?;
    }
    // A JSON null is an absent value for templating purposes.
    if cursor.is_null() {
        return None;
    }
    Some(cursor)
}

fn unresolved(template: &str, variable: &str) -> TransformError {
    TransformError::TemplateUnresolved {
        template: template.to_string(),
        variable: variable.to_string(),
    }
}

/// Interpolation form of a value: strings bare, everything else as
/// compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
