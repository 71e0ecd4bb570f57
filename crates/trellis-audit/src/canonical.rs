//! Canonical byte encoding of events and envelopes.
//!
//! Hashing and signing both operate on these bytes, so the encoding must be
//! an injective, deterministic function of the logical value:
//!
//!   1. Object keys are emitted in lexicographic order at every depth. For an
//!      event this is the fixed order listed in `STANDARD_FIELDS`, with any
//!      custom-schema fields merged into the same ordering.
//!   2. `message`, `old`, and `new` are always emitted as JSON strings. A
//!      structured value is first reduced to its canonical JSON text, because
//!      the service stores these fields as opaque strings and hashed exactly
//!      that text.
//!   3. Absent fields are omitted. No `null` placeholders are written.
//!   4. No insignificant whitespace.

use std::collections::BTreeMap;

use serde_json::Value;

use trellis_contracts::{
    error::{TrellisError, TrellisResult},
    event::{Event, EventEnvelope, EventField, STANDARD_FIELDS},
};

/// Render `value` as canonical JSON: sorted keys, no whitespace.
pub fn canonical_json(value: &Value) -> TrellisResult<String> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> TrellisResult<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out)?,
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Sort explicitly: serde_json's map type preserves insertion
            // order when its `preserve_order` feature is enabled anywhere in
            // the dependency graph.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out)?;
                out.push(':');
                write_canonical(&map[key.as_str()], out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_string(s: &str, out: &mut String) -> TrellisResult<()> {
    let escaped = serde_json::to_string(s).map_err(|e| TrellisError::EncodingError {
        reason: format!("string cannot be JSON-escaped: {e}"),
    })?;
    out.push_str(&escaped);
    Ok(())
}

/// The string form of a `message`/`old`/`new` field.
pub fn field_text(field: &EventField) -> TrellisResult<String> {
    match field {
        EventField::Text(s) => Ok(s.clone()),
        EventField::Structured(value) => canonical_json(value),
    }
}

/// The logical key/value view of an event that the canonical bytes encode.
///
/// Fails with `EncodingError` when a custom field collides with a standard
/// field or has an empty name.
pub fn event_value(event: &Event) -> TrellisResult<Value> {
    let mut fields: BTreeMap<String, Value> = BTreeMap::new();

    let text_fields = [
        ("action", &event.action),
        ("actor", &event.actor),
        ("source", &event.source),
        ("status", &event.status),
        ("target", &event.target),
        ("tenant_id", &event.tenant_id),
        ("timestamp", &event.timestamp),
    ];
    for (name, value) in text_fields {
        if let Some(v) = value {
            fields.insert(name.to_string(), Value::String(v.clone()));
        }
    }

    let json_fields = [
        ("message", &event.message),
        ("new", &event.new),
        ("old", &event.old),
    ];
    for (name, value) in json_fields {
        if let Some(field) = value {
            fields.insert(name.to_string(), Value::String(field_text(field)?));
        }
    }

    for (name, value) in &event.custom {
        if name.is_empty() {
            return Err(TrellisError::EncodingError {
                reason: "custom field with an empty name".to_string(),
            });
        }
        if STANDARD_FIELDS.contains(&name.as_str()) {
            return Err(TrellisError::EncodingError {
                reason: format!("custom field '{name}' collides with a standard event field"),
            });
        }
        if value.is_null() {
            continue;
        }
        fields.insert(name.clone(), value.clone());
    }

    Ok(Value::Object(fields.into_iter().collect()))
}

/// Canonical bytes of an event. These are the bytes a signature covers.
pub fn canonicalize_event(event: &Event) -> TrellisResult<Vec<u8>> {
    Ok(canonical_json(&event_value(event)?)?.into_bytes())
}

/// Canonical bytes of an envelope. These are the bytes the service hashes.
///
/// The envelope is encoded as an object with keys `event`, `public_key`,
/// `received_at`, `signature`; absent optional members are omitted.
pub fn canonicalize_envelope(envelope: &EventEnvelope) -> TrellisResult<Vec<u8>> {
    let mut fields: BTreeMap<String, Value> = BTreeMap::new();
    fields.insert("event".to_string(), event_value(&envelope.event)?);
    if let Some(public_key) = &envelope.public_key {
        fields.insert("public_key".to_string(), Value::String(public_key.clone()));
    }
    fields.insert(
        "received_at".to_string(),
        Value::String(envelope.received_at.clone()),
    );
    if let Some(signature) = &envelope.signature {
        fields.insert("signature".to_string(), Value::String(signature.clone()));
    }
    Ok(canonical_json(&Value::Object(fields.into_iter().collect()))?.into_bytes())
}
