use crate::bb::{ByteBufferMut, FieldIter, FieldValue, WireType};

use std::fmt;
use std::str;

/// This type holds one field value decoded without a schema.
///
/// Opaque blobs such as declaration options are decoded into values of this
/// type when nobody registered a concrete message type for them. Varints are
/// kept as raw 64-bit patterns; the `as_*` helpers reinterpret them.
#[derive(Clone, PartialEq)]
pub enum Value {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
    Bytes(Vec<u8>),
    Group(RawMessage),
}

impl Value {
    /// A convenience method to extract a bool out of a [Varint](#variant.Varint).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Varint(value) => value != 0,
            _ => false,
        }
    }

    /// A convenience method to extract the raw bits of a numeric value.
    /// Returns `0` for bytes and groups.
    pub fn as_u64(&self) -> u64 {
        match *self {
            Value::Varint(value) | Value::Fixed64(value) => value,
            Value::Fixed32(value) => u64::from(value),
            _ => 0,
        }
    }

    /// A convenience method to extract an `int32`/`int64` out of a numeric
    /// value. Returns `0` for bytes and groups.
    pub fn as_i64(&self) -> i64 {
        self.as_u64() as i64
    }

    /// Like [as_i64](#method.as_i64) but truncated to 32 bits.
    pub fn as_i32(&self) -> i32 {
        self.as_u64() as i32
    }

    /// A convenience method to reinterpret a [Fixed32](#variant.Fixed32) as a float.
    /// Returns `0.0` for other value kinds.
    pub fn as_f32(&self) -> f32 {
        match *self {
            Value::Fixed32(value) => f32::from_bits(value),
            _ => 0.0,
        }
    }

    /// A convenience method to reinterpret a [Fixed64](#variant.Fixed64) as a double.
    /// Returns `0.0` for other value kinds.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::Fixed64(value) => f64::from_bits(value),
            _ => 0.0,
        }
    }

    /// A convenience method to get the contents of a [Bytes](#variant.Bytes).
    /// Returns an empty slice for other value kinds.
    pub fn as_bytes(&self) -> &[u8] {
        match *self {
            Value::Bytes(ref value) => value.as_slice(),
            _ => &[],
        }
    }

    /// A convenience method to view [Bytes](#variant.Bytes) as UTF-8.
    /// Returns `""` for other value kinds or invalid UTF-8.
    pub fn as_str(&self) -> &str {
        str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    /// Decodes a [Bytes](#variant.Bytes) as a nested message, or clones the
    /// fields of a [Group](#variant.Group). Returns `None` if the bytes are not
    /// a well-formed message or for other value kinds.
    pub fn as_message(&self) -> Option<RawMessage> {
        match *self {
            Value::Bytes(ref value) => RawMessage::decode(value).ok(),
            Value::Group(ref message) => Some(message.clone()),
            _ => None,
        }
    }

    pub fn wire_type(&self) -> WireType {
        match *self {
            Value::Varint(_) => WireType::Varint,
            Value::Fixed32(_) => WireType::Fixed32,
            Value::Fixed64(_) => WireType::Fixed64,
            Value::Bytes(_) => WireType::Bytes,
            Value::Group(_) => WireType::StartGroup,
        }
    }

    fn from_field(value: FieldValue<'_>) -> Result<Value, ()> {
        Ok(match value {
            FieldValue::Varint(value) => Value::Varint(value),
            FieldValue::Fixed32(value) => Value::Fixed32(value),
            FieldValue::Fixed64(value) => Value::Fixed64(value),
            FieldValue::Bytes(value) => Value::Bytes(value.to_vec()),
            FieldValue::Group(body) => Value::Group(RawMessage::decode(body)?),
        })
    }

    /// Encodes this value, preceded by its tag, to the end of `bb`.
    pub fn encode_bb(&self, number: u32, bb: &mut ByteBufferMut) {
        bb.write_tag(number, self.wire_type());
        match *self {
            Value::Varint(value) => bb.write_varint(value),
            Value::Fixed32(value) => bb.write_fixed32(value),
            Value::Fixed64(value) => bb.write_fixed64(value),
            Value::Bytes(ref value) => bb.write_bytes(value),
            Value::Group(ref message) => {
                message.encode_bb(bb);
                bb.write_tag(number, WireType::EndGroup);
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Varint(value) => value.fmt(f),
            Value::Fixed32(value) => write!(f, "{:#010x}", value),
            Value::Fixed64(value) => write!(f, "{:#018x}", value),
            Value::Bytes(ref value) => match str::from_utf8(value) {
                Ok(text) => text.fmt(f),
                Err(_) => value.fmt(f),
            },
            Value::Group(ref message) => message.fmt(f),
        }
    }
}

/// A message body decoded without a schema: every field in encoded order.
///
/// ```
/// use protodesc_wire::{RawMessage, Value};
///
/// let message = RawMessage::decode(&[16, 1, 56, 1]).unwrap();
/// assert_eq!(message.get(2), Some(&Value::Varint(1)));
/// assert_eq!(format!("{:?}", message), "{2: 1, 7: 1}");
/// assert_eq!(message.encode(), [16, 1, 56, 1]);
/// ```
#[derive(Clone, Default, PartialEq)]
pub struct RawMessage {
    fields: Vec<(u32, Value)>,
}

impl RawMessage {
    pub fn new() -> RawMessage {
        RawMessage { fields: vec![] }
    }

    /// Decodes every field of `bytes`. Fails if any field is malformed.
    pub fn decode(bytes: &[u8]) -> Result<RawMessage, ()> {
        let mut fields = vec![];
        for field in FieldIter::new(bytes) {
            let (_, number, value) = field?;
            fields.push((number, Value::from_field(value)?));
        }
        Ok(RawMessage { fields })
    }

    /// Encodes the fields back in the order they are stored.
    pub fn encode(&self) -> Vec<u8> {
        let mut bb = ByteBufferMut::new();
        self.encode_bb(&mut bb);
        bb.data()
    }

    /// Encodes the fields to the end of `bb`. This is mainly useful as a
    /// helper routine for [encode](#method.encode).
    pub fn encode_bb(&self, bb: &mut ByteBufferMut) {
        for (number, value) in &self.fields {
            value.encode_bb(*number, bb);
        }
    }

    pub fn fields(&self) -> &[(u32, Value)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the last occurrence of field `number`, which is the one that
    /// wins for a singular field.
    pub fn get(&self, number: u32) -> Option<&Value> {
        self.fields
            .iter()
            .rev()
            .find(|(n, _)| *n == number)
            .map(|(_, value)| value)
    }

    /// Returns every occurrence of field `number`, in encoded order.
    pub fn get_all(&self, number: u32) -> impl Iterator<Item = &Value> + '_ {
        self.fields
            .iter()
            .filter(move |(n, _)| *n == number)
            .map(|(_, value)| value)
    }

    /// Appends a field.
    pub fn push(&mut self, number: u32, value: Value) {
        self.fields.push((number, value));
    }

    /// Removes every occurrence of field `number`.
    pub fn remove(&mut self, number: u32) {
        self.fields.retain(|(n, _)| *n != number);
    }
}

impl fmt::Debug for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{{")?;
        let mut first = true;

        for (number, value) in &self.fields {
            if first {
                first = false;
            } else {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", number, value)?;
        }

        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_basic() {
        let message = RawMessage::decode(&[
            8, 150, 1, //
            21, 0, 0, 128, 63, //
            26, 3, 102, 111, 111, //
            34, 2, 255, 254, //
            43, 8, 5, 44,
        ])
        .unwrap();

        assert_eq!(message.len(), 5);
        assert_eq!(message.get(1), Some(&Value::Varint(150)));
        assert_eq!(message.get(2).map(Value::as_f32), Some(1.0));
        assert_eq!(message.get(3).map(Value::as_str), Some("foo"));
        assert_eq!(message.get(4).map(Value::as_str), Some(""));
        assert_eq!(message.get(4).map(Value::as_bytes), Some(&[255u8, 254][..]));
        assert_eq!(
            message.get(5).and_then(Value::as_message).and_then(|m| m.get(1).cloned()),
            Some(Value::Varint(5))
        );
        assert_eq!(message.get(6), None);

        assert_eq!(
            format!("{:?}", message),
            "{1: 150, 2: 0x3f800000, 3: \"foo\", 4: [255, 254], 5: {1: 5}}"
        );
    }

    #[test]
    fn value_numeric_views() {
        let minus_one = Value::Varint(u64::MAX);
        assert_eq!(minus_one.as_i64(), -1);
        assert_eq!(minus_one.as_i32(), -1);
        assert!(minus_one.as_bool());
        assert!(!Value::Varint(0).as_bool());
        assert_eq!(Value::Fixed64(2.5f64.to_bits()).as_f64(), 2.5);
        assert_eq!(Value::Bytes(vec![1]).as_u64(), 0);
        assert_eq!(Value::Varint(1).as_message(), None);
    }

    #[test]
    fn value_last_occurrence_wins() {
        let message = RawMessage::decode(&[16, 0, 16, 1]).unwrap();
        assert_eq!(message.get(2), Some(&Value::Varint(1)));
        assert_eq!(message.get_all(2).count(), 2);
    }

    #[test]
    fn value_push_and_remove() {
        let mut message = RawMessage::new();
        assert!(message.is_empty());

        message.push(7, Value::Varint(1));
        message.push(2, Value::Bytes(b"x".to_vec()));
        message.push(7, Value::Varint(0));
        assert_eq!(message.len(), 3);
        assert_eq!(message.encode(), [56, 1, 18, 1, 120, 56, 0]);

        message.remove(7);
        assert_eq!(message.len(), 1);
        assert_eq!(message.get(7), None);
        assert_eq!(message.encode(), [18, 1, 120]);
    }

    #[test]
    fn value_encode_and_decode_group() {
        let bytes = [11, 16, 3, 12, 24, 1];
        let message = RawMessage::decode(&bytes).unwrap();
        assert_eq!(message.encode(), bytes);
        assert_eq!(RawMessage::decode(&[11, 16, 3]), Err(()));
    }
}
