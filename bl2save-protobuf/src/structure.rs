//! `apply_structure`/`remove_structure`: converting a raw [`Message`] into a
//! named, typed, human-readable JSON tree and back, driven by a caller-supplied
//! [`Schema`].
//!
//! The domain schema itself (the real field-number-to-name dictionary for
//! Borderlands 2 saves) is an external collaborator per this codec's scope; this
//! module only provides the generic conversion engine a caller's schema plugs
//! into.

use std::rc::Rc;

use base64::Engine as _;
use serde_json::{Map, Value};

use bl2save_core::error::{CodecError, Result};

use crate::wire::{Message, WireValue};

/// How to interpret one field's occurrences when converting to/from JSON.
#[derive(Clone)]
pub enum FieldKind {
    /// A protobuf varint interpreted as an integer.
    Integer,
    /// Length-delimited bytes: UTF-8 text if valid, base64 otherwise (mirrors
    /// the source's `conv_binary_to_str` best-effort decoding).
    Str,
    /// Length-delimited bytes that must be valid UTF-8.
    Utf8,
    /// Length-delimited bytes always represented as base64 text.
    Base64Bytes,
    /// A length-delimited nested sub-message, recursively structured.
    Message(Rc<Schema>),
    /// A caller-supplied transform for fields the built-in kinds don't cover
    /// (the item and challenge sub-codecs plug in here).
    Custom {
        decode: Rc<dyn Fn(&[u8]) -> Result<Value>>,
        encode: Rc<dyn Fn(&Value) -> Result<Vec<u8>>>,
    },
}

/// One field's schema entry: its human-readable name, interpretation, and
/// whether multiple occurrences should be exposed as a JSON array.
#[derive(Clone)]
pub struct FieldSpec {
    /// Human-readable field name used as the JSON object key.
    pub name: String,
    /// How to interpret the field's occurrences.
    pub kind: FieldKind,
    /// If true, always emit a JSON array even for a single occurrence.
    pub repeated: bool,
}

/// A schema: field number to [`FieldSpec`], in declaration order.
#[derive(Clone, Default)]
pub struct Schema {
    fields: Vec<(u32, FieldSpec)>,
}

impl Schema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field.
    pub fn field(mut self, number: u32, name: impl Into<String>, kind: FieldKind, repeated: bool) -> Self {
        self.fields.push((
            number,
            FieldSpec {
                name: name.into(),
                kind,
                repeated,
            },
        ));
        self
    }

    fn by_number(&self, number: u32) -> Option<&FieldSpec> {
        self.fields.iter().find(|(n, _)| *n == number).map(|(_, s)| s)
    }

    fn by_name(&self, name: &str) -> Option<(u32, &FieldSpec)> {
        self.fields
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(n, s)| (*n, s))
    }
}

fn decode_scalar(field: u32, kind: &FieldKind, value: &WireValue) -> Result<Value> {
    match (kind, value) {
        (FieldKind::Integer, WireValue::Varint(v)) => Ok(Value::from(*v)),
        (FieldKind::Integer, WireValue::Fixed32(v)) => Ok(Value::from(*v)),
        (FieldKind::Integer, WireValue::Fixed64(v)) => Ok(Value::from(*v)),
        (FieldKind::Str, WireValue::LengthDelimited(bytes)) => Ok(decode_str_best_effort(bytes)),
        (FieldKind::Utf8, WireValue::LengthDelimited(bytes)) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|_| CodecError::schema_mismatch(field, "utf8", "invalid utf8"))?;
            Ok(Value::String(text.to_string()))
        }
        (FieldKind::Base64Bytes, WireValue::LengthDelimited(bytes)) => {
            Ok(Value::String(base64::engine::general_purpose::STANDARD.encode(bytes)))
        }
        (FieldKind::Message(sub_schema), WireValue::LengthDelimited(bytes)) => {
            let sub_message = crate::wire::read_protobuf(bytes)?;
            apply_structure(&sub_message, sub_schema)
        }
        (FieldKind::Custom { decode, .. }, WireValue::LengthDelimited(bytes)) => decode(bytes),
        (_, other) => Err(CodecError::schema_mismatch(
            field,
            "length-delimited bytes",
            format!("wire type {}", other.wire_type()),
        )),
    }
}

fn encode_scalar(field: u32, kind: &FieldKind, value: &Value) -> Result<WireValue> {
    match kind {
        FieldKind::Integer => {
            let n = value
                .as_u64()
                .ok_or_else(|| CodecError::schema_mismatch(field, "integer", "non-integer JSON value"))?;
            Ok(WireValue::Varint(n))
        }
        FieldKind::Str => {
            let text = value
                .as_str()
                .ok_or_else(|| CodecError::schema_mismatch(field, "string", "non-string JSON value"))?;
            Ok(WireValue::LengthDelimited(encode_str_best_effort(text)?))
        }
        FieldKind::Utf8 => {
            let text = value
                .as_str()
                .ok_or_else(|| CodecError::schema_mismatch(field, "utf8 string", "non-string JSON value"))?;
            Ok(WireValue::LengthDelimited(text.as_bytes().to_vec()))
        }
        FieldKind::Base64Bytes => {
            let text = value
                .as_str()
                .ok_or_else(|| CodecError::schema_mismatch(field, "base64 string", "non-string JSON value"))?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|_| CodecError::schema_mismatch(field, "base64", "invalid base64"))?;
            Ok(WireValue::LengthDelimited(bytes))
        }
        FieldKind::Message(sub_schema) => {
            let sub_message = remove_structure(value, sub_schema)?;
            Ok(WireValue::LengthDelimited(crate::wire::write_protobuf(&sub_message)))
        }
        FieldKind::Custom { encode, .. } => Ok(WireValue::LengthDelimited(encode(value)?)),
    }
}

/// Best-effort bytes-to-text: UTF-8 if valid, `"base64:<...>"` otherwise. This
/// mirrors the source's `conv_binary_to_str`, which keeps human-readable text
/// readable in the JSON output while still round-tripping arbitrary bytes.
fn decode_str_best_effort(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::String(format!("utf8:{text}")),
        Err(_) => Value::String(format!(
            "base64:{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )),
    }
}

fn encode_str_best_effort(text: &str) -> Result<Vec<u8>> {
    if let Some(rest) = text.strip_prefix("utf8:") {
        Ok(rest.as_bytes().to_vec())
    } else if let Some(rest) = text.strip_prefix("base64:") {
        base64::engine::general_purpose::STANDARD
            .decode(rest)
            .map_err(|_| CodecError::schema_mismatch(0, "base64", "invalid base64"))
    } else {
        Err(CodecError::schema_mismatch(0, "utf8:/base64: prefix", "unrecognized string encoding"))
    }
}

/// Convert a raw [`Message`] into a named, typed JSON tree per `schema`.
///
/// Fields the schema does not cover pass through keyed by their numeric field
/// number (as a string) with a raw best-effort representation, so
/// `remove_structure(apply_structure(m, schema), schema) == m` holds for every
/// message the schema fully covers, and partial coverage degrades gracefully
/// rather than losing data.
pub fn apply_structure(message: &Message, schema: &Schema) -> Result<Value> {
    let mut object = Map::new();
    for (field_number, occurrences) in message.iter() {
        match schema.by_number(*field_number) {
            Some(spec) => {
                let decoded: Result<Vec<Value>> = occurrences
                    .iter()
                    .map(|v| decode_scalar(*field_number, &spec.kind, v))
                    .collect();
                let decoded = decoded?;
                let value = if spec.repeated {
                    Value::Array(decoded)
                } else {
                    decoded.into_iter().next().unwrap_or(Value::Null)
                };
                object.insert(spec.name.clone(), value);
            }
            None => {
                let raw: Vec<Value> = occurrences.iter().map(raw_passthrough).collect();
                object.insert(
                    field_number.to_string(),
                    if raw.len() == 1 {
                        raw.into_iter().next().unwrap()
                    } else {
                        Value::Array(raw)
                    },
                );
            }
        }
    }
    Ok(Value::Object(object))
}

fn raw_passthrough(value: &WireValue) -> Value {
    match value {
        WireValue::Varint(v) => Value::from(*v),
        WireValue::Fixed32(v) => Value::from(*v),
        WireValue::Fixed64(v) => Value::from(*v),
        WireValue::LengthDelimited(bytes) => decode_str_best_effort(bytes),
    }
}

/// Invert [`apply_structure`]: rebuild a [`Message`] from a JSON tree and
/// `schema`.
pub fn remove_structure(tree: &Value, schema: &Schema) -> Result<Message> {
    let object = tree
        .as_object()
        .ok_or_else(|| CodecError::schema_mismatch(0, "JSON object", "non-object JSON value"))?;

    let mut message = Message::new();
    for (key, value) in object.iter() {
        if let Some((field_number, spec)) = schema.by_name(key) {
            let occurrences: Vec<&Value> = if spec.repeated {
                value
                    .as_array()
                    .ok_or_else(|| CodecError::schema_mismatch(field_number, "array", "non-array JSON value"))?
                    .iter()
                    .collect()
            } else {
                vec![value]
            };
            for occurrence in occurrences {
                let wire_value = encode_scalar(field_number, &spec.kind, occurrence)?;
                message.push(field_number, wire_value);
            }
        } else {
            let field_number: u32 = key
                .parse()
                .map_err(|_| CodecError::schema_mismatch(0, "numeric field key", key.clone()))?;
            match value {
                Value::Array(items) => {
                    for item in items {
                        message.push(field_number, raw_from_json(item)?);
                    }
                }
                other => message.push(field_number, raw_from_json(other)?),
            }
        }
    }
    Ok(message)
}

fn raw_from_json(value: &Value) -> Result<WireValue> {
    match value {
        Value::Number(n) if n.is_u64() => Ok(WireValue::Varint(n.as_u64().unwrap())),
        Value::String(text) => Ok(WireValue::LengthDelimited(encode_str_best_effort(text)?)),
        _ => Err(CodecError::schema_mismatch(0, "number or string", "unsupported JSON value")),
    }
}
