//! Field default values.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::deps::EnumValueLink;
use crate::types::Kind;
use crate::utils::fatal;

/// The default of a singular scalar or enum field.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(SharedBytes),
    Enum(i32),
}

impl DefaultValue {
    /// The value used when a field declares no default. `Enum` kinds are
    /// resolved by the caller against the enum's values.
    pub(crate) fn zero(kind: Kind) -> DefaultValue {
        match kind {
            Kind::Bool => DefaultValue::Bool(false),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => DefaultValue::Int32(0),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => DefaultValue::Int64(0),
            Kind::Uint32 | Kind::Fixed32 => DefaultValue::Uint32(0),
            Kind::Uint64 | Kind::Fixed64 => DefaultValue::Uint64(0),
            Kind::Float => DefaultValue::Float(0.0),
            Kind::Double => DefaultValue::Double(0.0),
            Kind::String => DefaultValue::String(String::new()),
            Kind::Bytes => DefaultValue::Bytes(SharedBytes::new(Vec::new())),
            Kind::Enum | Kind::Message | Kind::Group => DefaultValue::Enum(0),
        }
    }

    pub fn as_bytes(&self) -> Option<&SharedBytes> {
        match self {
            DefaultValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// A byte-string default. Every access to a field default hands out the
/// same buffer, and the field checks on each access that it still holds
/// the published contents.
#[derive(Clone)]
pub struct SharedBytes(Arc<RwLock<Vec<u8>>>);

impl SharedBytes {
    pub fn new(bytes: Vec<u8>) -> SharedBytes {
        SharedBytes(Arc::new(RwLock::new(bytes)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.0.write()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.read().clone()
    }
}

impl PartialEq for SharedBytes {
    fn eq(&self, other: &SharedBytes) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0.read() == *other.0.read()
    }
}

impl fmt::Debug for SharedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0.read()))
    }
}

/// The default recorded for one field by the full pass.
#[derive(Default)]
pub(crate) struct DefaultSlot {
    /// As declared, for re-encoding.
    pub text: Option<String>,
    pub value: Option<DefaultValue>,
    pub enum_value: Option<EnumValueLink>,
    pristine: Option<Vec<u8>>,
}

impl DefaultSlot {
    pub fn explicit(text: String, value: DefaultValue, enum_value: Option<EnumValueLink>) -> DefaultSlot {
        let pristine = value.as_bytes().map(SharedBytes::to_vec);
        DefaultSlot {
            text: Some(text),
            value: Some(value),
            enum_value,
            pristine,
        }
    }

    /// The declared value, after checking that a published byte default
    /// was not changed in place.
    pub fn checked(&self, full_name: &str) -> Option<&DefaultValue> {
        if let (Some(DefaultValue::Bytes(bytes)), Some(pristine)) = (&self.value, &self.pristine) {
            if *bytes.read() != *pristine {
                fatal(format_args!("detected mutation on the default bytes for {}", full_name));
            }
        }
        self.value.as_ref()
    }
}

/// Parses the textual default of a non-enum field.
pub(crate) fn parse_scalar(text: &str, kind: Kind) -> Result<DefaultValue, String> {
    let invalid = || format!("invalid default value {:?} for {:?} field", text, kind);
    let value = match kind {
        Kind::Bool => match text {
            "true" => DefaultValue::Bool(true),
            "false" => DefaultValue::Bool(false),
            _ => return Err(invalid()),
        },
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => DefaultValue::Int32(text.parse().map_err(|_| invalid())?),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => DefaultValue::Int64(text.parse().map_err(|_| invalid())?),
        Kind::Uint32 | Kind::Fixed32 => DefaultValue::Uint32(text.parse().map_err(|_| invalid())?),
        Kind::Uint64 | Kind::Fixed64 => DefaultValue::Uint64(text.parse().map_err(|_| invalid())?),
        Kind::Float => DefaultValue::Float(match text {
            "inf" => f32::INFINITY,
            "-inf" => f32::NEG_INFINITY,
            "nan" => f32::NAN,
            _ => text.parse().map_err(|_| invalid())?,
        }),
        Kind::Double => DefaultValue::Double(match text {
            "inf" => f64::INFINITY,
            "-inf" => f64::NEG_INFINITY,
            "nan" => f64::NAN,
            _ => text.parse().map_err(|_| invalid())?,
        }),
        Kind::String => DefaultValue::String(text.to_owned()),
        Kind::Bytes => DefaultValue::Bytes(SharedBytes::new(unescape_c(text).ok_or_else(invalid)?)),
        Kind::Enum | Kind::Message | Kind::Group => return Err(invalid()),
    };
    Ok(value)
}

/// Undoes the C-style escaping `protoc` applies to bytes defaults.
pub(crate) fn unescape_c(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let mut bytes = text.bytes().peekable();

    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let escaped = bytes.next()?;
        let byte = match escaped {
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'v' => 0x0b,
            b'\\' | b'\'' | b'"' | b'?' => escaped,
            b'0'..=b'7' => {
                let mut value = u32::from(escaped - b'0');
                for _ in 0..2 {
                    match bytes.peek() {
                        Some(&d) if (b'0'..=b'7').contains(&d) => {
                            value = value * 8 + u32::from(d - b'0');
                            bytes.next();
                        }
                        _ => break,
                    }
                }
                u8::try_from(value).ok()?
            }
            b'x' | b'X' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    match bytes.peek().and_then(|&d| char::from(d).to_digit(16)) {
                        Some(d) => {
                            value = value * 16 + d;
                            bytes.next();
                            digits += 1;
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    return None;
                }
                value as u8
            }
            _ => return None,
        };
        out.push(byte);
    }

    Some(out)
}
