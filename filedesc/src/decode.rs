//! Decodes wire-format declaration bodies into literal records.
//!
//! Each body is decoded on its own: nested enums, messages and extensions
//! are left empty because the full pass visits them through the flattened
//! declaration lists.

use protodesc_wire::{consume_varint, FieldIter, FieldValue};

use crate::fieldnum;
use crate::literal::{
    EnumLiteral, EnumValueLiteral, ExtensionRangeLiteral, FieldLiteral, FileLiteral, ImportLiteral,
    MessageLiteral, MethodLiteral, OneofLiteral, ServiceLiteral,
};
use crate::types::{Cardinality, Kind, Syntax};
use crate::utils::malformed;
use crate::walk::decl_body;

pub(crate) fn string(path: &str, what: &str, value: FieldValue<'_>) -> String {
    String::from_utf8_lossy(decl_body(path, what, value)).into_owned()
}

fn varint(path: &str, what: &str, value: FieldValue<'_>) -> u64 {
    match value {
        FieldValue::Varint(v) => v,
        other => malformed(path, format_args!("{} has wire type {:?}", what, other.wire_type())),
    }
}

fn int32(path: &str, what: &str, value: FieldValue<'_>) -> i32 {
    varint(path, what, value) as i32
}

fn boolean(path: &str, what: &str, value: FieldValue<'_>) -> bool {
    varint(path, what, value) != 0
}

/// Reads a repeated int32 that may be encoded either packed or not.
fn int32_list(path: &str, what: &str, value: FieldValue<'_>, out: &mut Vec<i32>) {
    match value {
        FieldValue::Varint(v) => out.push(v as i32),
        FieldValue::Bytes(mut packed) => {
            while !packed.is_empty() {
                let (v, n) = consume_varint(packed);
                if n == 0 {
                    malformed(path, format_args!("truncated packed {}", what));
                }
                out.push(v as i32);
                packed = &packed[n..];
            }
        }
        other => malformed(path, format_args!("{} has wire type {:?}", what, other.wire_type())),
    }
}

fn fields<'a>(path: &'a str, what: &'a str, body: &'a [u8]) -> impl Iterator<Item = (u32, FieldValue<'a>)> + 'a {
    FieldIter::new(body).map(move |field| match field {
        Ok((_, number, value)) => (number, value),
        Err(()) => malformed(path, format_args!("truncated {}", what)),
    })
}

/// File-level attributes other than the declarations.
pub(crate) fn file_shell(raw: &[u8]) -> FileLiteral {
    let mut file = FileLiteral::default();
    let mut dependencies = Vec::new();
    let mut public_indexes = Vec::new();
    let mut weak_indexes = Vec::new();

    // The path is not known until field 1 is read.
    let path = "<file>";
    for (number, value) in fields(path, "file descriptor", raw) {
        match number {
            fieldnum::file::NAME => file.path = string(path, "name", value),
            fieldnum::file::PACKAGE => file.package = string(&file.path, "package", value),
            fieldnum::file::SYNTAX => {
                let name = string(&file.path, "syntax", value);
                file.syntax = Syntax::from_name(&name)
                    .unwrap_or_else(|| malformed(&file.path, format_args!("unsupported syntax {:?}", name)));
            }
            fieldnum::file::DEPENDENCY => dependencies.push(string(&file.path, "dependency", value)),
            fieldnum::file::PUBLIC_DEPENDENCY => int32_list(&file.path, "public_dependency", value, &mut public_indexes),
            fieldnum::file::WEAK_DEPENDENCY => int32_list(&file.path, "weak_dependency", value, &mut weak_indexes),
            fieldnum::file::OPTIONS => file.options.extend_from_slice(decl_body(&file.path, "options", value)),
            _ => {}
        }
    }

    file.imports = dependencies
        .into_iter()
        .map(|path| ImportLiteral { path, public: false, weak: false })
        .collect();
    for (list, public) in [(&public_indexes, true), (&weak_indexes, false)] {
        for &i in list {
            let import = usize::try_from(i)
                .ok()
                .and_then(|i| file.imports.get_mut(i))
                .unwrap_or_else(|| malformed(&file.path, format_args!("import index {} out of range", i)));
            if public {
                import.public = true;
            } else {
                import.weak = true;
            }
        }
    }

    file
}

pub(crate) fn enum_shell(path: &str, body: &[u8]) -> EnumLiteral {
    let mut e = EnumLiteral::default();

    for (number, value) in fields(path, "enum declaration", body) {
        match number {
            fieldnum::enums::NAME => e.name = string(path, "name", value),
            fieldnum::enums::VALUE => e.values.push(enum_value(path, decl_body(path, "value", value))),
            fieldnum::enums::OPTIONS => e.options.extend_from_slice(decl_body(path, "options", value)),
            fieldnum::enums::RESERVED_RANGE => {
                let (start, end, _) = range(path, decl_body(path, "reserved_range", value));
                e.reserved_ranges.push((start, end));
            }
            fieldnum::enums::RESERVED_NAME => e.reserved_names.push(string(path, "reserved_name", value)),
            _ => {}
        }
    }

    e
}

fn enum_value(path: &str, body: &[u8]) -> EnumValueLiteral {
    let mut v = EnumValueLiteral::default();
    for (number, value) in fields(path, "enum value", body) {
        match number {
            fieldnum::enum_value::NAME => v.name = string(path, "name", value),
            fieldnum::enum_value::NUMBER => v.number = int32(path, "number", value),
            fieldnum::enum_value::OPTIONS => v.options.extend_from_slice(decl_body(path, "options", value)),
            _ => {}
        }
    }
    v
}

/// `(start, end, options)` of a reserved or extension range, as encoded.
fn range(path: &str, body: &[u8]) -> (i32, i32, Vec<u8>) {
    let (mut start, mut end, mut options) = (0, 0, Vec::new());
    for (number, value) in fields(path, "range", body) {
        match number {
            fieldnum::range::START => start = int32(path, "start", value),
            fieldnum::range::END => end = int32(path, "end", value),
            fieldnum::range::OPTIONS => options.extend_from_slice(decl_body(path, "options", value)),
            _ => {}
        }
    }
    (start, end, options)
}

pub(crate) fn message_shell(path: &str, body: &[u8]) -> MessageLiteral {
    let mut m = MessageLiteral::default();

    for (number, value) in fields(path, "message declaration", body) {
        match number {
            fieldnum::message::NAME => m.name = string(path, "name", value),
            fieldnum::message::FIELD => m.fields.push(field(path, decl_body(path, "field", value))),
            fieldnum::message::ONEOF_DECL => {
                let mut oneof = OneofLiteral::default();
                for (number, value) in fields(path, "oneof", decl_body(path, "oneof_decl", value)) {
                    match number {
                        fieldnum::oneof::NAME => oneof.name = string(path, "name", value),
                        fieldnum::oneof::OPTIONS => oneof.options.extend_from_slice(decl_body(path, "options", value)),
                        _ => {}
                    }
                }
                m.oneofs.push(oneof);
            }
            fieldnum::message::EXTENSION_RANGE => {
                let (start, end, options) = range(path, decl_body(path, "extension_range", value));
                m.extension_ranges.push(ExtensionRangeLiteral { start, end, options });
            }
            fieldnum::message::RESERVED_RANGE => {
                let (start, end, _) = range(path, decl_body(path, "reserved_range", value));
                m.reserved_ranges.push((start, end));
            }
            fieldnum::message::RESERVED_NAME => m.reserved_names.push(string(path, "reserved_name", value)),
            fieldnum::message::OPTIONS => {
                let options = decl_body(path, "options", value);
                for (number, value) in fields(path, "message options", options) {
                    match number {
                        fieldnum::message_options::MAP_ENTRY => m.is_map_entry = boolean(path, "map_entry", value),
                        fieldnum::message_options::MESSAGE_SET_WIRE_FORMAT => {
                            m.is_message_set = boolean(path, "message_set_wire_format", value)
                        }
                        _ => {}
                    }
                }
                m.options.extend_from_slice(options);
            }
            _ => {}
        }
    }

    m
}

/// A message field or an extension.
pub(crate) fn field(path: &str, body: &[u8]) -> FieldLiteral {
    let mut name = String::new();
    let mut number = 0;
    let mut kind = None;
    let mut cardinality = Cardinality::Optional;
    let mut f = FieldLiteral::new("", 0, Kind::Int32);

    for (n, value) in fields(path, "field declaration", body) {
        match n {
            fieldnum::field::NAME => name = string(path, "name", value),
            fieldnum::field::NUMBER => number = int32(path, "number", value),
            fieldnum::field::LABEL => {
                let label = int32(path, "label", value);
                cardinality = Cardinality::from_i32(label)
                    .unwrap_or_else(|| malformed(path, format_args!("invalid label {} on field {:?}", label, name)));
            }
            fieldnum::field::TYPE => {
                let ty = int32(path, "type", value);
                kind = Some(
                    Kind::from_i32(ty)
                        .unwrap_or_else(|| malformed(path, format_args!("invalid type {} on field {:?}", ty, name))),
                );
            }
            fieldnum::field::TYPE_NAME => f.type_name = string(path, "type_name", value),
            fieldnum::field::EXTENDEE => f.extendee = string(path, "extendee", value),
            fieldnum::field::DEFAULT_VALUE => f.default = Some(string(path, "default_value", value)),
            fieldnum::field::JSON_NAME => f.json_name = Some(string(path, "json_name", value)),
            fieldnum::field::ONEOF_INDEX => f.oneof_index = Some(int32(path, "oneof_index", value)),
            fieldnum::field::PROTO3_OPTIONAL => f.proto3_optional = boolean(path, "proto3_optional", value),
            fieldnum::field::OPTIONS => {
                let options = decl_body(path, "options", value);
                for (number, value) in fields(path, "field options", options) {
                    match number {
                        fieldnum::field_options::PACKED => f.packed = Some(boolean(path, "packed", value)),
                        fieldnum::field_options::WEAK => f.weak = boolean(path, "weak", value),
                        _ => {}
                    }
                }
                f.options.extend_from_slice(options);
            }
            _ => {}
        }
    }

    f.kind = kind.unwrap_or_else(|| malformed(path, format_args!("field {:?} has no type", name)));
    f.name = name;
    f.number = number;
    f.cardinality = cardinality;
    f
}

pub(crate) fn service_shell(path: &str, body: &[u8]) -> ServiceLiteral {
    let mut s = ServiceLiteral::default();

    for (number, value) in fields(path, "service declaration", body) {
        match number {
            fieldnum::service::NAME => s.name = string(path, "name", value),
            fieldnum::service::METHOD => s.methods.push(method(path, decl_body(path, "method", value))),
            fieldnum::service::OPTIONS => s.options.extend_from_slice(decl_body(path, "options", value)),
            _ => {}
        }
    }

    s
}

fn method(path: &str, body: &[u8]) -> MethodLiteral {
    let mut m = MethodLiteral::default();
    for (number, value) in fields(path, "method declaration", body) {
        match number {
            fieldnum::method::NAME => m.name = string(path, "name", value),
            fieldnum::method::INPUT_TYPE => m.input_type = string(path, "input_type", value),
            fieldnum::method::OUTPUT_TYPE => m.output_type = string(path, "output_type", value),
            fieldnum::method::OPTIONS => m.options.extend_from_slice(decl_body(path, "options", value)),
            fieldnum::method::CLIENT_STREAMING => m.client_streaming = boolean(path, "client_streaming", value),
            fieldnum::method::SERVER_STREAMING => m.server_streaming = boolean(path, "server_streaming", value),
            _ => {}
        }
    }
    m
}
