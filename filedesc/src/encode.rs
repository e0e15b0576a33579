//! Writing graphs and literal trees back out.
//!
//! `FileLiteral::encode` produces the standard encoded descriptor. Every
//! repeated declaration field is written as one contiguous run, which is
//! the shape the seed pass requires. [`to_literal`] rebuilds a tree from a
//! built file and [`to_wire`] produces everything the wire builder needs to
//! rebuild an equivalent graph.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use protodesc_wire::{ByteBufferMut, FieldIter};

use crate::builder::TypeHandle;
use crate::enums::EnumDescriptor;
use crate::field::FieldDescriptor;
use crate::fieldnum;
use crate::file::{FileDescriptor, FileInner};
use crate::literal::{
    EnumLiteral, EnumValueLiteral, ExtensionRangeLiteral, FieldLiteral, FileLiteral, ImportLiteral,
    MessageLiteral, MethodLiteral, OneofLiteral, ServiceLiteral,
};
use crate::message::MessageDescriptor;
use crate::service::ServiceDescriptor;
use crate::types::Syntax;

impl FileLiteral {
    /// Encodes the tree as a `FileDescriptorProto`.
    pub fn encode(&self) -> Vec<u8> {
        let mut bb = ByteBufferMut::new();
        bb.write_string_field(fieldnum::file::NAME, &self.path);
        if !self.package.is_empty() {
            bb.write_string_field(fieldnum::file::PACKAGE, &self.package);
        }
        for import in &self.imports {
            bb.write_string_field(fieldnum::file::DEPENDENCY, &import.path);
        }
        for m in &self.messages {
            bb.write_bytes_field(fieldnum::file::MESSAGE_TYPE, &encode_message(m));
        }
        for e in &self.enums {
            bb.write_bytes_field(fieldnum::file::ENUM_TYPE, &encode_enum(e));
        }
        for s in &self.services {
            bb.write_bytes_field(fieldnum::file::SERVICE, &encode_service(s));
        }
        for x in &self.extensions {
            bb.write_bytes_field(fieldnum::file::EXTENSION, &encode_field(x));
        }
        if !self.options.is_empty() {
            bb.write_bytes_field(fieldnum::file::OPTIONS, &self.options);
        }
        for (i, import) in self.imports.iter().enumerate() {
            if import.public {
                bb.write_int32_field(fieldnum::file::PUBLIC_DEPENDENCY, i as i32);
            }
        }
        for (i, import) in self.imports.iter().enumerate() {
            if import.weak {
                bb.write_int32_field(fieldnum::file::WEAK_DEPENDENCY, i as i32);
            }
        }
        // proto2 is the default and is left implicit.
        if self.syntax == Syntax::Proto3 {
            bb.write_string_field(fieldnum::file::SYNTAX, self.syntax.as_str());
        }
        bb.data()
    }
}

/// Appends each set flag to an options blob unless the blob already
/// carries that field.
fn with_flags<'a>(options: &'a [u8], flags: &[(u32, Option<bool>)]) -> Cow<'a, [u8]> {
    let present: Vec<u32> = FieldIter::new(options)
        .filter_map(|field| field.ok().map(|(_, number, _)| number))
        .collect();

    let mut extra = ByteBufferMut::new();
    for &(number, value) in flags {
        if let Some(value) = value {
            if !present.contains(&number) {
                extra.write_bool_field(number, value);
            }
        }
    }

    if extra.is_empty() {
        Cow::Borrowed(options)
    } else {
        let mut merged = options.to_vec();
        merged.extend_from_slice(extra.as_slice());
        Cow::Owned(merged)
    }
}

fn write_range(start: i32, end: i32, options: &[u8]) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    bb.write_int32_field(fieldnum::range::START, start);
    bb.write_int32_field(fieldnum::range::END, end);
    if !options.is_empty() {
        bb.write_bytes_field(fieldnum::range::OPTIONS, options);
    }
    bb.data()
}

fn encode_enum(e: &EnumLiteral) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    bb.write_string_field(fieldnum::enums::NAME, &e.name);
    for v in &e.values {
        let mut value = ByteBufferMut::new();
        value.write_string_field(fieldnum::enum_value::NAME, &v.name);
        value.write_int32_field(fieldnum::enum_value::NUMBER, v.number);
        if !v.options.is_empty() {
            value.write_bytes_field(fieldnum::enum_value::OPTIONS, &v.options);
        }
        bb.write_bytes_field(fieldnum::enums::VALUE, value.as_slice());
    }
    if !e.options.is_empty() {
        bb.write_bytes_field(fieldnum::enums::OPTIONS, &e.options);
    }
    for &(start, end) in &e.reserved_ranges {
        bb.write_bytes_field(fieldnum::enums::RESERVED_RANGE, &write_range(start, end, &[]));
    }
    for name in &e.reserved_names {
        bb.write_string_field(fieldnum::enums::RESERVED_NAME, name);
    }
    bb.data()
}

fn encode_message(m: &MessageLiteral) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    bb.write_string_field(fieldnum::message::NAME, &m.name);
    for f in &m.fields {
        bb.write_bytes_field(fieldnum::message::FIELD, &encode_field(f));
    }
    for nested in &m.messages {
        bb.write_bytes_field(fieldnum::message::NESTED_TYPE, &encode_message(nested));
    }
    for e in &m.enums {
        bb.write_bytes_field(fieldnum::message::ENUM_TYPE, &encode_enum(e));
    }
    for range in &m.extension_ranges {
        bb.write_bytes_field(
            fieldnum::message::EXTENSION_RANGE,
            &write_range(range.start, range.end, &range.options),
        );
    }
    for x in &m.extensions {
        bb.write_bytes_field(fieldnum::message::EXTENSION, &encode_field(x));
    }

    let options = with_flags(
        &m.options,
        &[
            (fieldnum::message_options::MESSAGE_SET_WIRE_FORMAT, m.is_message_set.then_some(true)),
            (fieldnum::message_options::MAP_ENTRY, m.is_map_entry.then_some(true)),
        ],
    );
    if !options.is_empty() {
        bb.write_bytes_field(fieldnum::message::OPTIONS, &options);
    }

    for oneof in &m.oneofs {
        let mut decl = ByteBufferMut::new();
        decl.write_string_field(fieldnum::oneof::NAME, &oneof.name);
        if !oneof.options.is_empty() {
            decl.write_bytes_field(fieldnum::oneof::OPTIONS, &oneof.options);
        }
        bb.write_bytes_field(fieldnum::message::ONEOF_DECL, decl.as_slice());
    }
    for &(start, end) in &m.reserved_ranges {
        bb.write_bytes_field(fieldnum::message::RESERVED_RANGE, &write_range(start, end, &[]));
    }
    for name in &m.reserved_names {
        bb.write_string_field(fieldnum::message::RESERVED_NAME, name);
    }
    bb.data()
}

fn encode_field(f: &FieldLiteral) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    bb.write_string_field(fieldnum::field::NAME, &f.name);
    if !f.extendee.is_empty() {
        bb.write_string_field(fieldnum::field::EXTENDEE, &f.extendee);
    }
    bb.write_int32_field(fieldnum::field::NUMBER, f.number);
    bb.write_int32_field(fieldnum::field::LABEL, f.cardinality.to_i32());
    bb.write_int32_field(fieldnum::field::TYPE, f.kind.to_i32());
    if !f.type_name.is_empty() {
        bb.write_string_field(fieldnum::field::TYPE_NAME, &f.type_name);
    }
    if let Some(default) = &f.default {
        bb.write_string_field(fieldnum::field::DEFAULT_VALUE, default);
    }

    let options = with_flags(
        &f.options,
        &[
            (fieldnum::field_options::PACKED, f.packed),
            (fieldnum::field_options::WEAK, f.weak.then_some(true)),
        ],
    );
    if !options.is_empty() {
        bb.write_bytes_field(fieldnum::field::OPTIONS, &options);
    }

    if let Some(oneof) = f.oneof_index {
        bb.write_int32_field(fieldnum::field::ONEOF_INDEX, oneof);
    }
    if let Some(json_name) = &f.json_name {
        bb.write_string_field(fieldnum::field::JSON_NAME, json_name);
    }
    if f.proto3_optional {
        bb.write_bool_field(fieldnum::field::PROTO3_OPTIONAL, true);
    }
    bb.data()
}

fn encode_service(s: &ServiceLiteral) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    bb.write_string_field(fieldnum::service::NAME, &s.name);
    for m in &s.methods {
        let mut method = ByteBufferMut::new();
        method.write_string_field(fieldnum::method::NAME, &m.name);
        method.write_string_field(fieldnum::method::INPUT_TYPE, &m.input_type);
        method.write_string_field(fieldnum::method::OUTPUT_TYPE, &m.output_type);
        if !m.options.is_empty() {
            method.write_bytes_field(fieldnum::method::OPTIONS, &m.options);
        }
        if m.client_streaming {
            method.write_bool_field(fieldnum::method::CLIENT_STREAMING, true);
        }
        if m.server_streaming {
            method.write_bool_field(fieldnum::method::SERVER_STREAMING, true);
        }
        bb.write_bytes_field(fieldnum::service::METHOD, method.as_slice());
    }
    if !s.options.is_empty() {
        bb.write_bytes_field(fieldnum::service::OPTIONS, &s.options);
    }
    bb.data()
}

fn dotted(full_name: &str) -> String {
    format!(".{}", full_name)
}

/// Rebuilds the literal tree of a built file. Runs the full pass. Type
/// references are written as dotted full names.
pub fn to_literal(file: &FileDescriptor) -> FileLiteral {
    FileLiteral {
        path: file.path().to_owned(),
        package: file.package().to_owned(),
        syntax: file.syntax(),
        imports: file
            .imports()
            .iter()
            .map(|import| ImportLiteral {
                path: import.file.path().to_owned(),
                public: import.public,
                weak: import.weak,
            })
            .collect(),
        enums: file.enums().map(|e| enum_literal(&e)).collect(),
        messages: file.messages().map(|m| message_literal(&m)).collect(),
        extensions: file.extensions().map(|x| field_literal(&x)).collect(),
        services: file.services().map(|s| service_literal(&s)).collect(),
        options: file.raw_options().to_vec(),
    }
}

fn enum_literal(e: &EnumDescriptor) -> EnumLiteral {
    EnumLiteral {
        name: e.name().to_owned(),
        values: e
            .values()
            .map(|v| EnumValueLiteral {
                name: v.name().to_owned(),
                number: v.number(),
                options: v.raw_options().to_vec(),
            })
            .collect(),
        reserved_names: e.reserved_names().to_vec(),
        reserved_ranges: e.reserved_ranges().iter().map(|r| (*r.start(), *r.end())).collect(),
        options: e.raw_options().to_vec(),
    }
}

fn message_literal(m: &MessageDescriptor) -> MessageLiteral {
    let extension_ranges = m
        .extension_ranges()
        .enumerate()
        .map(|(i, range)| ExtensionRangeLiteral {
            start: range.start,
            end: range.end,
            options: m
                .arena()
                .map(|(file, index)| file.lazy().messages[index].extension_ranges[i].options.raw().to_vec())
                .unwrap_or_default(),
        })
        .collect();

    MessageLiteral {
        name: m.name().to_owned(),
        fields: m.fields().map(|f| field_literal(&f)).collect(),
        oneofs: m
            .oneofs()
            .map(|o| OneofLiteral {
                name: o.name().to_owned(),
                options: o.raw_options().to_vec(),
            })
            .collect(),
        enums: m.nested_enums().map(|e| enum_literal(&e)).collect(),
        messages: m.nested_messages().map(|n| message_literal(&n)).collect(),
        extensions: m.nested_extensions().map(|x| field_literal(&x)).collect(),
        extension_ranges,
        reserved_names: m.reserved_names().to_vec(),
        reserved_ranges: m.reserved_ranges().iter().map(|r| (r.start, r.end)).collect(),
        is_map_entry: m.is_map_entry(),
        is_message_set: m.is_message_set(),
        options: m.raw_options().to_vec(),
    }
}

fn field_literal(f: &FieldDescriptor) -> FieldLiteral {
    let type_name = if f.is_weak() {
        f.type_name().to_owned()
    } else if let Some(e) = f.enum_type() {
        dotted(e.full_name())
    } else if let Some(m) = f.message_type() {
        dotted(m.full_name())
    } else {
        String::new()
    };

    FieldLiteral {
        name: f.name().to_owned(),
        number: f.number(),
        kind: f.kind(),
        cardinality: f.cardinality(),
        type_name,
        extendee: f.extendee().map(|m| dotted(m.full_name())).unwrap_or_default(),
        default: f.default_text().map(str::to_owned),
        json_name: f.has_json_name().then(|| f.json_name().to_owned()),
        oneof_index: f.containing_oneof().map(|o| o.index() as i32),
        packed: f.has_packed().then(|| f.is_packed()),
        weak: f.is_weak(),
        proto3_optional: f.is_proto3_optional(),
        options: f.raw_options().to_vec(),
    }
}

fn service_literal(s: &ServiceDescriptor) -> ServiceLiteral {
    ServiceLiteral {
        name: s.name().to_owned(),
        methods: s
            .methods()
            .map(|m| MethodLiteral {
                name: m.name().to_owned(),
                input_type: dotted(m.input().full_name()),
                output_type: dotted(m.output().full_name()),
                client_streaming: m.is_client_streaming(),
                server_streaming: m.is_server_streaming(),
                options: m.raw_options().to_vec(),
            })
            .collect(),
        options: s.raw_options().to_vec(),
    }
}

/// The inputs of a wire build.
#[derive(Debug, Clone)]
pub struct WireFile {
    pub raw: Bytes,
    pub handles: Vec<TypeHandle>,
    pub dependency_indexes: Vec<usize>,
}

/// Numbers every reference the full pass will request, in request order.
struct IndexWriter<'a> {
    file: &'a Arc<FileInner>,
    local: usize,
    foreign: Vec<TypeHandle>,
    seen: HashMap<String, usize>,
    indexes: Vec<usize>,
}

impl IndexWriter<'_> {
    fn foreign(&mut self, full_name: &str, handle: impl FnOnce() -> TypeHandle) -> usize {
        if let Some(&index) = self.seen.get(full_name) {
            return index;
        }
        let index = self.local + self.foreign.len();
        self.foreign.push(handle());
        self.seen.insert(full_name.to_owned(), index);
        index
    }

    fn enum_type(&mut self, e: &EnumDescriptor) {
        let index = match e.arena() {
            Some((file, i)) if Arc::ptr_eq(file, self.file) => i,
            _ => self.foreign(e.full_name(), || TypeHandle::Enum(e.clone())),
        };
        self.indexes.push(index);
    }

    fn message_type(&mut self, m: &MessageDescriptor) {
        let index = match m.arena() {
            Some((file, i)) if Arc::ptr_eq(file, self.file) => self.file.enums.len() + i,
            _ => self.foreign(m.full_name(), || TypeHandle::Message(m.clone())),
        };
        self.indexes.push(index);
    }

    fn field_type(&mut self, f: &FieldDescriptor) {
        if let Some(e) = f.enum_type() {
            self.enum_type(&e);
        } else if let Some(m) = f.message_type() {
            self.message_type(&m);
        }
    }
}

/// Produces the encoded descriptor, type handles and dependency indices
/// that rebuild `file` through [`Builder`](crate::Builder). Declarations
/// keep their type handles; those built without one get their full name.
/// Returns `None` for placeholder files.
pub fn to_wire(file: &FileDescriptor) -> Option<WireFile> {
    let inner = file.inner()?;

    let enums: Vec<_> = (0..inner.enums.len()).map(|i| EnumDescriptor::node(inner.clone(), i)).collect();
    let messages: Vec<_> = (0..inner.messages.len())
        .map(|i| MessageDescriptor::node(inner.clone(), i))
        .collect();
    let extensions: Vec<_> = (0..inner.extensions.len())
        .map(|i| FieldDescriptor::extension(inner.clone(), i))
        .collect();

    let mut handles: Vec<TypeHandle> = enums
        .iter()
        .map(|e| TypeHandle::declared(e.type_handle().unwrap_or(e.full_name()).to_owned()))
        .collect();
    handles.extend(messages.iter().map(|m| {
        if m.is_map_entry() {
            TypeHandle::Vacant
        } else {
            TypeHandle::declared(m.type_handle().unwrap_or(m.full_name()).to_owned())
        }
    }));

    let mut writer = IndexWriter {
        file: inner,
        local: handles.len(),
        foreign: Vec::new(),
        seen: HashMap::new(),
        indexes: Vec::new(),
    };

    for x in &extensions {
        if let Some(extendee) = x.extendee() {
            writer.message_type(&extendee);
        }
    }
    for m in &messages {
        for f in m.fields() {
            if !f.is_weak() && f.kind().has_dependency() {
                writer.field_type(&f);
            }
        }
    }
    for x in &extensions {
        if x.kind().has_dependency() {
            writer.field_type(x);
        }
    }
    for s in file.services() {
        for method in s.methods() {
            writer.message_type(&method.input());
            writer.message_type(&method.output());
        }
    }

    handles.extend(writer.foreign);
    Some(WireFile {
        raw: Bytes::from(to_literal(file).encode()),
        handles,
        dependency_indexes: writer.indexes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cardinality, Kind};
    use crate::{Builder, LiteralBuilder};

    #[test]
    fn declarations_are_contiguous() {
        let tree = FileLiteral {
            path: "runs.proto".into(),
            imports: vec![
                ImportLiteral { path: "a.proto".into(), ..Default::default() },
                ImportLiteral { path: "b.proto".into(), public: true, ..Default::default() },
            ],
            messages: vec![MessageLiteral { name: "A".into(), ..Default::default() }; 3],
            enums: vec![EnumLiteral { name: "E".into(), ..Default::default() }; 2],
            ..Default::default()
        };
        let raw = tree.encode();
        let numbers: Vec<u32> = FieldIter::new(&raw).map(|f| f.unwrap().1).collect();
        assert_eq!(numbers, [1, 3, 3, 4, 4, 4, 5, 5, 10]);
    }

    #[test]
    fn flags_merge_into_options() {
        let mut f = FieldLiteral::new("ids", 1, Kind::Int32).repeated();
        f.packed = Some(true);
        let decoded = crate::decode::field("x.proto", &encode_field(&f));
        assert_eq!(decoded.packed, Some(true));
        assert_eq!(decoded.cardinality, Cardinality::Repeated);

        let mut options = ByteBufferMut::new();
        options.write_bool_field(fieldnum::field_options::PACKED, false);
        f.options = options.data();
        let decoded = crate::decode::field("x.proto", &encode_field(&f));
        assert_eq!(decoded.packed, Some(false));
        assert_eq!(decoded.options, f.options);
    }

    #[test]
    fn wire_rebuild_shares_foreign_types() {
        let dep = LiteralBuilder::new(FileLiteral {
            path: "dep.proto".into(),
            package: "dep".into(),
            messages: vec![MessageLiteral { name: "D".into(), ..Default::default() }],
            ..Default::default()
        })
        .build();

        let types = Arc::new(crate::TypeRegistry::new());
        types
            .register(crate::TypeDescriptor::Message(dep.messages[0].clone()))
            .unwrap();

        let main = LiteralBuilder::new(FileLiteral {
            path: "main.proto".into(),
            package: "main".into(),
            messages: vec![MessageLiteral {
                name: "M".into(),
                fields: vec![
                    FieldLiteral::new("d", 1, Kind::Message).typed("dep.D"),
                    FieldLiteral::new("again", 2, Kind::Message).typed(".dep.D"),
                    FieldLiteral::new("me", 3, Kind::Message).typed(".main.M"),
                ],
                ..Default::default()
            }],
            ..Default::default()
        })
        .with_registries(crate::Registries { types: Some(types), ..Default::default() })
        .build();

        let wire = to_wire(&main.file).unwrap();
        assert_eq!(wire.handles.len(), 2);
        assert_eq!(wire.dependency_indexes, [1, 1, 0]);

        let rebuilt = Builder::new(wire.raw)
            .with_handles(wire.handles)
            .with_dependency_indexes(wire.dependency_indexes)
            .build();
        let m = &rebuilt.messages[0];
        assert_eq!(m.type_handle(), Some("main.M"));
        assert_eq!(m.field(0).unwrap().message_type(), Some(dep.messages[0].clone()));
        assert_eq!(m.field(2).unwrap().message_type(), Some(m.clone()));
    }
}
