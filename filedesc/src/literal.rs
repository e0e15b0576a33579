//! Plain nested records describing a schema file. A tree of these is the
//! input of [`LiteralBuilder`](crate::LiteralBuilder); the wire path also
//! decodes each declaration body into one before populating the graph.

use serde::{Deserialize, Serialize};

use crate::types::{Cardinality, Kind, Syntax};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLiteral {
    pub path:       String,
    pub package:    String,
    pub syntax:     Syntax,
    pub imports:    Vec<ImportLiteral>,
    pub enums:      Vec<EnumLiteral>,
    pub messages:   Vec<MessageLiteral>,
    pub extensions: Vec<FieldLiteral>,
    pub services:   Vec<ServiceLiteral>,
    /// Encoded `FileOptions`.
    pub options:    Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportLiteral {
    pub path:   String,
    pub public: bool,
    pub weak:   bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumLiteral {
    pub name:            String,
    pub values:          Vec<EnumValueLiteral>,
    pub reserved_names:  Vec<String>,
    /// Inclusive on both ends.
    pub reserved_ranges: Vec<(i32, i32)>,
    pub options:         Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnumValueLiteral {
    pub name:    String,
    pub number:  i32,
    pub options: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageLiteral {
    pub name:             String,
    pub fields:           Vec<FieldLiteral>,
    pub oneofs:           Vec<OneofLiteral>,
    pub enums:            Vec<EnumLiteral>,
    pub messages:         Vec<MessageLiteral>,
    pub extensions:       Vec<FieldLiteral>,
    pub extension_ranges: Vec<ExtensionRangeLiteral>,
    pub reserved_names:   Vec<String>,
    /// Half-open: `start` is reserved, `end` is not.
    pub reserved_ranges:  Vec<(i32, i32)>,
    pub is_map_entry:     bool,
    pub is_message_set:   bool,
    pub options:          Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneofLiteral {
    pub name:    String,
    pub options: Vec<u8>,
}

/// Half-open range of extension numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionRangeLiteral {
    pub start:   i32,
    pub end:     i32,
    pub options: Vec<u8>,
}

/// A message field or an extension (when `extendee` is set).
///
/// `type_name` and `extendee` hold dotted full names, with or without a
/// leading '.'.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLiteral {
    pub name:            String,
    pub number:          i32,
    pub kind:            Kind,
    #[serde(default)]
    pub cardinality:     Cardinality,
    #[serde(default)]
    pub type_name:       String,
    #[serde(default)]
    pub extendee:        String,
    /// Default in its textual form: C-escaped for bytes, the value name
    /// for enums.
    #[serde(default)]
    pub default:         Option<String>,
    #[serde(default)]
    pub json_name:       Option<String>,
    #[serde(default)]
    pub oneof_index:     Option<i32>,
    #[serde(default)]
    pub packed:          Option<bool>,
    #[serde(default)]
    pub weak:            bool,
    #[serde(default)]
    pub proto3_optional: bool,
    #[serde(default)]
    pub options:         Vec<u8>,
}

impl FieldLiteral {
    pub fn new(name: impl Into<String>, number: i32, kind: Kind) -> FieldLiteral {
        FieldLiteral {
            name: name.into(),
            number,
            kind,
            cardinality: Cardinality::Optional,
            type_name: String::new(),
            extendee: String::new(),
            default: None,
            json_name: None,
            oneof_index: None,
            packed: None,
            weak: false,
            proto3_optional: false,
            options: Vec::new(),
        }
    }

    pub fn repeated(mut self) -> FieldLiteral {
        self.cardinality = Cardinality::Repeated;
        self
    }

    pub fn typed(mut self, type_name: impl Into<String>) -> FieldLiteral {
        self.type_name = type_name.into();
        self
    }

    pub fn extending(mut self, extendee: impl Into<String>) -> FieldLiteral {
        self.extendee = extendee.into();
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> FieldLiteral {
        self.default = Some(default.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceLiteral {
    pub name:    String,
    pub methods: Vec<MethodLiteral>,
    pub options: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodLiteral {
    pub name:             String,
    pub input_type:       String,
    pub output_type:      String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub options:          Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_from_json() {
        let field: FieldLiteral =
            serde_json::from_str(r#"{ "name": "f2", "number": 2, "kind": "float", "cardinality": "repeated" }"#)
                .unwrap();
        assert_eq!(field, FieldLiteral::new("f2", 2, Kind::Float).repeated());
    }

    #[test]
    fn message_from_json() {
        let message: MessageLiteral = serde_json::from_str(
            r#"{ "name": "M", "fields": [{ "name": "f1", "number": 1, "kind": "message", "type_name": "M.M1" }] }"#,
        )
        .unwrap();
        assert_eq!(message.name, "M");
        assert_eq!(message.fields[0].type_name, "M.M1");
        assert!(message.messages.is_empty());
        assert!(!message.is_map_entry);
    }
}
