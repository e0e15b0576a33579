use serde::{Deserialize, Serialize};

/// The `syntax` of a schema file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    #[default]
    Proto2,
    Proto3,
}

impl Syntax {
    /// Parses the encoded `syntax` string. An absent or empty value means
    /// proto2.
    pub fn from_name(name: &str) -> Option<Syntax> {
        match name {
            "" | "proto2" => Some(Syntax::Proto2),
            "proto3" => Some(Syntax::Proto3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Syntax::Proto2 => "proto2",
            Syntax::Proto3 => "proto3",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Optional = 1,
    Required = 2,
    Repeated = 3,
}

impl Cardinality {
    pub fn from_i32(value: i32) -> Option<Cardinality> {
        match value {
            1 => Some(Cardinality::Optional),
            2 => Some(Cardinality::Required),
            3 => Some(Cardinality::Repeated),
            _ => None,
        }
    }

    pub fn to_i32(self) -> i32 {
        self as i32
    }
}

/// The declared type of a field, numbered as in `FieldDescriptorProto.Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Double = 1,
    Float = 2,
    Int64 = 3,
    Uint64 = 4,
    Int32 = 5,
    Fixed64 = 6,
    Fixed32 = 7,
    Bool = 8,
    String = 9,
    Group = 10,
    Message = 11,
    Bytes = 12,
    Uint32 = 13,
    Enum = 14,
    Sfixed32 = 15,
    Sfixed64 = 16,
    Sint32 = 17,
    Sint64 = 18,
}

impl Kind {
    pub fn from_i32(value: i32) -> Option<Kind> {
        Some(match value {
            1 => Kind::Double,
            2 => Kind::Float,
            3 => Kind::Int64,
            4 => Kind::Uint64,
            5 => Kind::Int32,
            6 => Kind::Fixed64,
            7 => Kind::Fixed32,
            8 => Kind::Bool,
            9 => Kind::String,
            10 => Kind::Group,
            11 => Kind::Message,
            12 => Kind::Bytes,
            13 => Kind::Uint32,
            14 => Kind::Enum,
            15 => Kind::Sfixed32,
            16 => Kind::Sfixed64,
            17 => Kind::Sint32,
            18 => Kind::Sint64,
            _ => return None,
        })
    }

    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// Message and group fields.
    pub fn is_message(self) -> bool {
        matches!(self, Kind::Message | Kind::Group)
    }

    /// Kinds that take an entry from the dependency index list.
    pub fn has_dependency(self) -> bool {
        matches!(self, Kind::Enum | Kind::Message | Kind::Group)
    }

    /// Kinds that may use the packed repeated encoding.
    pub fn is_packable(self) -> bool {
        !matches!(self, Kind::String | Kind::Bytes | Kind::Message | Kind::Group)
    }
}

/// The declaration an options blob belongs to. Options prototypes are
/// registered per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    File,
    Message,
    Field,
    Oneof,
    Enum,
    EnumValue,
    ExtensionRange,
    Service,
    Method,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_numbers() {
        for n in 1..=18 {
            assert_eq!(Kind::from_i32(n).map(Kind::to_i32), Some(n));
        }
        assert_eq!(Kind::from_i32(0), None);
        assert_eq!(Kind::from_i32(19), None);
        assert!(Kind::Group.has_dependency());
        assert!(!Kind::Bytes.is_packable());
        assert!(Kind::Float.is_packable());
    }

    #[test]
    fn syntax_names() {
        assert_eq!(Syntax::from_name(""), Some(Syntax::Proto2));
        assert_eq!(Syntax::from_name("proto3"), Some(Syntax::Proto3));
        assert_eq!(Syntax::from_name("editions"), None);
        assert_eq!(serde_json::to_string(&Kind::Sfixed64).unwrap(), "\"sfixed64\"");
    }
}
