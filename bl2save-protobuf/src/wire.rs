//! Varint/fixed32/fixed64/length-delimited protobuf wire format.

use bl2save_core::error::{CodecError, Layer, Result};

/// A single decoded protobuf value, tagged by its wire type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    /// Wire type 0.
    Varint(u64),
    /// Wire type 1.
    Fixed64(u64),
    /// Wire type 2.
    LengthDelimited(Vec<u8>),
    /// Wire type 5.
    Fixed32(u32),
}

impl WireValue {
    /// The wire-type tag this value serializes as.
    pub fn wire_type(&self) -> u64 {
        match self {
            WireValue::Varint(_) => 0,
            WireValue::Fixed64(_) => 1,
            WireValue::LengthDelimited(_) => 2,
            WireValue::Fixed32(_) => 5,
        }
    }

    /// View this value as a varint, if it is one.
    pub fn as_varint(&self) -> Option<u64> {
        match self {
            WireValue::Varint(v) => Some(*v),
            _ => None,
        }
    }

    /// View this value as length-delimited bytes, if it is one.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            WireValue::LengthDelimited(b) => Some(b),
            _ => None,
        }
    }
}

/// A parsed protobuf message: an ordered map from field number to the ordered
/// list of occurrences of that field, in first-seen field order.
///
/// This mirrors the Python source's pseudo-dict representation exactly, including
/// its write-back behavior: occurrences are grouped by field (first-occurrence
/// order), not interleaved as they may have appeared on the wire. Real save
/// payloads always serialize each field's occurrences contiguously, so this is a
/// byte-exact round trip in practice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    fields: Vec<(u32, Vec<WireValue>)>,
}

impl Message {
    /// An empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate over `(field_number, occurrences)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &(u32, Vec<WireValue>)> {
        self.fields.iter()
    }

    /// All occurrences of `field`, if any.
    pub fn get(&self, field: u32) -> Option<&[WireValue]> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_slice())
    }

    /// Mutable access to all occurrences of `field`.
    pub fn get_mut(&mut self, field: u32) -> Option<&mut Vec<WireValue>> {
        self.fields.iter_mut().find(|(f, _)| *f == field).map(|(_, v)| v)
    }

    /// The first occurrence of `field`, if any.
    pub fn first(&self, field: u32) -> Option<&WireValue> {
        self.get(field).and_then(|v| v.first())
    }

    /// Append an occurrence of `field`, creating the field's slot at the end of
    /// the insertion order if this is its first occurrence.
    pub fn push(&mut self, field: u32, value: WireValue) {
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some((_, occurrences)) => occurrences.push(value),
            None => self.fields.push((field, vec![value])),
        }
    }

    /// Replace all occurrences of `field` with a single value, preserving the
    /// field's existing position in insertion order (or appending it if new).
    pub fn set_single(&mut self, field: u32, value: WireValue) {
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some((_, occurrences)) => {
                occurrences.clear();
                occurrences.push(value);
            }
            None => self.fields.push((field, vec![value])),
        }
    }

    /// Number of distinct fields present.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

fn read_varint(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| CodecError::truncated(Layer::Protobuf))?;
        *pos += 1;
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 64 {
            return Err(CodecError::truncated(Layer::Protobuf));
        }
    }
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        } else {
            out.push(byte | 0x80);
        }
    }
}

/// Parse a complete protobuf message from `data`.
pub fn read_protobuf(data: &[u8]) -> Result<Message> {
    let mut message = Message::new();
    let mut pos = 0usize;
    while pos < data.len() {
        let tag = read_varint(data, &mut pos)?;
        let field = (tag >> 3) as u32;
        let wire_type = tag & 0x7;
        let value = read_protobuf_value(data, &mut pos, wire_type, field)?;
        message.push(field, value);
    }
    Ok(message)
}

fn read_protobuf_value(data: &[u8], pos: &mut usize, wire_type: u64, field: u32) -> Result<WireValue> {
    match wire_type {
        0 => Ok(WireValue::Varint(read_varint(data, pos)?)),
        1 => {
            let bytes = data
                .get(*pos..*pos + 8)
                .ok_or_else(|| CodecError::truncated(Layer::Protobuf))?;
            *pos += 8;
            Ok(WireValue::Fixed64(u64::from_le_bytes(bytes.try_into().unwrap())))
        }
        2 => {
            let len = read_varint(data, pos)? as usize;
            let bytes = data
                .get(*pos..*pos + len)
                .ok_or_else(|| CodecError::truncated(Layer::Protobuf))?;
            *pos += len;
            Ok(WireValue::LengthDelimited(bytes.to_vec()))
        }
        5 => {
            let bytes = data
                .get(*pos..*pos + 4)
                .ok_or_else(|| CodecError::truncated(Layer::Protobuf))?;
            *pos += 4;
            Ok(WireValue::Fixed32(u32::from_le_bytes(bytes.try_into().unwrap())))
        }
        other => Err(CodecError::InvalidProtobufWireType {
            wire_type: other,
            field,
        }),
    }
}

/// Serialize `message` back into bytes, in field-insertion / occurrence order.
pub fn write_protobuf(message: &Message) -> Vec<u8> {
    let mut out = Vec::new();
    for (field, occurrences) in message.iter() {
        for value in occurrences {
            let tag = ((*field as u64) << 3) | value.wire_type();
            write_varint(&mut out, tag);
            match value {
                WireValue::Varint(v) => write_varint(&mut out, *v),
                WireValue::Fixed64(v) => out.extend_from_slice(&v.to_le_bytes()),
                WireValue::Fixed32(v) => out.extend_from_slice(&v.to_le_bytes()),
                WireValue::LengthDelimited(bytes) => {
                    write_varint(&mut out, bytes.len() as u64);
                    out.extend_from_slice(bytes);
                }
            }
        }
    }
    out
}

/// Decode a packed-repeated field's raw payload (no field tags, just
/// back-to-back values of one wire type) into the list of decoded values.
pub fn read_repeated_protobuf_value(data: &[u8], wire_type: u64) -> Result<Vec<u64>> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    match wire_type {
        0 => {
            while pos < data.len() {
                out.push(read_varint(data, &mut pos)?);
            }
        }
        1 => {
            if data.len() % 8 != 0 {
                return Err(CodecError::truncated(Layer::Protobuf));
            }
            for chunk in data.chunks(8) {
                out.push(u64::from_le_bytes(chunk.try_into().unwrap()));
            }
        }
        5 => {
            if data.len() % 4 != 0 {
                return Err(CodecError::truncated(Layer::Protobuf));
            }
            for chunk in data.chunks(4) {
                out.push(u32::from_le_bytes(chunk.try_into().unwrap()) as u64);
            }
        }
        other => {
            return Err(CodecError::InvalidProtobufWireType {
                wire_type: other,
                field: 0,
            });
        }
    }
    Ok(out)
}

/// Inverse of [`read_repeated_protobuf_value`]: pack `values` back-to-back as
/// `wire_type`.
pub fn write_repeated_protobuf_value(values: &[u64], wire_type: u64) -> Vec<u8> {
    let mut out = Vec::new();
    match wire_type {
        0 => {
            for &v in values {
                write_varint(&mut out, v);
            }
        }
        1 => {
            for &v in values {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        5 => {
            for &v in values {
                out.extend_from_slice(&(v as u32).to_le_bytes());
            }
        }
        _ => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        for &v in &[0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX] {
            let mut out = Vec::new();
            write_varint(&mut out, v);
            let mut pos = 0;
            assert_eq!(read_varint(&out, &mut pos).unwrap(), v);
            assert_eq!(pos, out.len());
        }
    }

    #[test]
    fn test_message_roundtrip_mixed_wire_types() {
        let mut msg = Message::new();
        msg.push(1, WireValue::Varint(42));
        msg.push(2, WireValue::LengthDelimited(b"hello".to_vec()));
        msg.push(1, WireValue::Varint(43));
        msg.push(3, WireValue::Fixed32(0xDEADBEEF));
        msg.push(4, WireValue::Fixed64(0x1122334455667788));

        let bytes = write_protobuf(&msg);
        let parsed = read_protobuf(&bytes).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_write_read_is_byte_exact_for_grouped_fields() {
        let mut msg = Message::new();
        msg.push(6, WireValue::Varint(1000));
        msg.push(6, WireValue::Varint(0));
        msg.push(15, WireValue::LengthDelimited(vec![1, 2, 3]));

        let bytes = write_protobuf(&msg);
        let bytes2 = write_protobuf(&read_protobuf(&bytes).unwrap());
        assert_eq!(bytes, bytes2);
    }

    #[test]
    fn test_unknown_wire_type_errors() {
        // tag byte encodes field 1, wire type 3 (unsupported, start-group)
        let data = vec![(1 << 3) | 3];
        assert!(read_protobuf(&data).is_err());
    }

    #[test]
    fn test_truncated_length_delimited_errors() {
        // field 1, wire type 2, length 10, but no payload bytes follow
        let data = vec![(1 << 3) | 2, 10];
        assert!(read_protobuf(&data).is_err());
    }

    #[test]
    fn test_read_repeated_protobuf_value_varint() {
        let mut packed = Vec::new();
        write_varint(&mut packed, 1);
        write_varint(&mut packed, 300);
        write_varint(&mut packed, 70000);
        let values = read_repeated_protobuf_value(&packed, 0).unwrap();
        assert_eq!(values, vec![1, 300, 70000]);

        let rewritten = write_repeated_protobuf_value(&values, 0);
        assert_eq!(rewritten, packed);
    }
}
