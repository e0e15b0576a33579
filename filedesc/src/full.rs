//! The deferred pass. It runs once per file, on first access to anything
//! the seed pass did not fill in, and produces every remaining attribute.

use std::borrow::Cow;
use std::ops::{Range, RangeInclusive};
use std::sync::atomic::Ordering;

use tracing::debug;

use crate::decode;
use crate::defval::{parse_scalar, DefaultSlot, DefaultValue};
use crate::deps::{Dependencies, EnumLink, EnumValueLink, IndexedDeps, MessageLink, NamedDeps, TypeLink};
use crate::enums::EnumValueDescriptor;
use crate::file::{FileDescriptor, FileImport, FileInner, Pending, PendingInput};
use crate::literal::{EnumLiteral, FieldLiteral, FileLiteral, MessageLiteral, ServiceLiteral};
use crate::lookup::LazyIndex;
use crate::options::LazyOptions;
use crate::registry::FileRegistry;
use crate::types::{Cardinality, DeclKind, Kind, Syntax};
use crate::utils::{fatal, join_name, json_camel_case, malformed, mismatch, parent_name};
use crate::walk::{flatten_literal, flatten_wire};

pub(crate) struct FileL2 {
    pub imports: Vec<FileImport>,
    pub options: LazyOptions,
    pub enums: Box<[EnumL2]>,
    pub messages: Box<[MessageL2]>,
    pub extensions: Box<[ExtensionL2]>,
    pub services: Box<[ServiceL2]>,
}

pub(crate) struct EnumL2 {
    pub values: Vec<EnumValueL2>,
    pub reserved_names: Vec<String>,
    pub reserved_ranges: Vec<RangeInclusive<i32>>,
    pub options: LazyOptions,
    pub by_name: LazyIndex<String>,
    pub by_number: LazyIndex<i32>,
}

pub(crate) struct EnumValueL2 {
    pub name: String,
    pub full_name: String,
    pub number: i32,
    pub options: LazyOptions,
}

pub(crate) struct MessageL2 {
    pub fields: Vec<FieldL2>,
    pub oneofs: Vec<OneofL2>,
    pub reserved_names: Vec<String>,
    pub reserved_ranges: Vec<Range<i32>>,
    pub extension_ranges: Vec<ExtensionRangeL2>,
    pub options: LazyOptions,
    pub by_name: LazyIndex<String>,
    pub by_json_name: LazyIndex<String>,
    pub by_number: LazyIndex<i32>,
}

pub(crate) struct OneofL2 {
    pub name: String,
    pub full_name: String,
    /// Positions in the message's field list.
    pub fields: Vec<usize>,
    pub options: LazyOptions,
}

pub(crate) struct ExtensionRangeL2 {
    pub range: Range<i32>,
    pub options: LazyOptions,
}

pub(crate) struct FieldL2 {
    pub name: String,
    pub full_name: String,
    pub number: i32,
    pub cardinality: Cardinality,
    pub kind: Kind,
    pub json_name: String,
    pub has_json_name: bool,
    pub packed: bool,
    pub has_packed: bool,
    pub weak: bool,
    pub proto3_optional: bool,
    pub oneof: Option<usize>,
    /// As declared.
    pub type_name: String,
    pub link: TypeLink,
    pub default: DefaultSlot,
    pub options: LazyOptions,
}

pub(crate) struct ExtensionL2 {
    pub field: FieldL2,
    pub extendee: MessageLink,
}

pub(crate) struct ServiceL2 {
    pub methods: Vec<MethodL2>,
    pub options: LazyOptions,
    pub by_name: LazyIndex<String>,
}

pub(crate) struct MethodL2 {
    pub name: String,
    pub full_name: String,
    pub input: MessageLink,
    pub output: MessageLink,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub options: LazyOptions,
}

/// Every declaration body of a file, in flattened order.
struct Bodies<'a> {
    header: Cow<'a, FileLiteral>,
    enums: Vec<Cow<'a, EnumLiteral>>,
    messages: Vec<Cow<'a, MessageLiteral>>,
    extensions: Vec<Cow<'a, FieldLiteral>>,
    services: Vec<Cow<'a, ServiceLiteral>>,
}

impl<'a> Bodies<'a> {
    fn wire(path: &str, raw: &'a [u8]) -> Bodies<'a> {
        let decls = flatten_wire(path, raw);
        Bodies {
            header: Cow::Owned(decode::file_shell(raw)),
            enums: decls.enums.iter().map(|b| Cow::Owned(decode::enum_shell(path, b))).collect(),
            messages: decls.messages.iter().map(|b| Cow::Owned(decode::message_shell(path, b))).collect(),
            extensions: decls.extensions.iter().map(|b| Cow::Owned(decode::field(path, b))).collect(),
            services: decls.services.iter().map(|b| Cow::Owned(decode::service_shell(path, b))).collect(),
        }
    }

    fn literal(tree: &'a FileLiteral) -> Bodies<'a> {
        let decls = flatten_literal(tree);
        Bodies {
            header: Cow::Borrowed(tree),
            enums: decls.enums.into_iter().map(Cow::Borrowed).collect(),
            messages: decls.messages.into_iter().map(Cow::Borrowed).collect(),
            extensions: decls.extensions.into_iter().map(Cow::Borrowed).collect(),
            services: decls.services.into_iter().map(Cow::Borrowed).collect(),
        }
    }

    fn check_counts(&self, file: &FileInner) {
        let seeded = (file.enums.len(), file.messages.len(), file.extensions.len(), file.services.len());
        let found = (self.enums.len(), self.messages.len(), self.extensions.len(), self.services.len());
        if seeded != found {
            mismatch(
                &file.path,
                format_args!("full pass found {:?} declarations, seed pass allocated {:?}", found, seeded),
            );
        }
    }
}

pub(crate) fn unmarshal_full(file: &FileInner) -> FileL2 {
    let Pending { input, files, types } = file
        .pending
        .lock()
        .take()
        .unwrap_or_else(|| fatal(format_args!("full pass for {:?} re-entered after a failed attempt", file.path)));

    let l2 = match input {
        PendingInput::Wire { foreign, dependency_indexes } => {
            let raw: &[u8] = file.raw.as_deref().unwrap_or_default();
            let bodies = Bodies::wire(&file.path, raw);
            let deps = IndexedDeps::new(file, foreign, dependency_indexes);
            populate(file, &bodies, deps, files.as_deref())
        }
        PendingInput::Literal(tree) => {
            let bodies = Bodies::literal(&tree);
            let deps = NamedDeps::new(file, types);
            populate(file, &bodies, deps, files.as_deref())
        }
    };

    file.full_passes.fetch_add(1, Ordering::SeqCst);
    debug!(
        file = %file.path,
        imports = l2.imports.len(),
        enums = l2.enums.len(),
        messages = l2.messages.len(),
        extensions = l2.extensions.len(),
        services = l2.services.len(),
        "full pass complete"
    );
    l2
}

fn populate<D: Dependencies>(
    file: &FileInner,
    bodies: &Bodies<'_>,
    mut deps: D,
    files: Option<&FileRegistry>,
) -> FileL2 {
    bodies.check_counts(file);

    let imports = bodies
        .header
        .imports
        .iter()
        .map(|import| FileImport {
            file: files
                .and_then(|registry| registry.find_file_by_path(&import.path))
                .unwrap_or_else(|| FileDescriptor::placeholder(import.path.as_str())),
            public: import.public,
            weak: import.weak,
        })
        .collect();

    let enums: Vec<EnumL2> = bodies
        .enums
        .iter()
        .zip(file.enums.iter())
        .map(|(e, l1)| enum_l2(e, parent_name(&l1.base.full_name)))
        .collect();

    // Dependency requests, in the order the index list is laid out.
    let mut extendees = Vec::with_capacity(bodies.extensions.len());
    for (x, l1) in bodies.extensions.iter().zip(file.extensions.iter()) {
        extendees.push(deps.message_type(l1.base.parent.message(), &x.extendee));
    }

    let mut field_links = Vec::with_capacity(bodies.messages.len());
    for (m, message) in bodies.messages.iter().enumerate() {
        let mut links = Vec::with_capacity(message.fields.len());
        for f in &message.fields {
            links.push(if f.weak {
                TypeLink::Weak
            } else {
                deps.field_type(Some(m), f.kind, &f.type_name)
            });
        }
        field_links.push(links);
    }

    let mut extension_links = Vec::with_capacity(bodies.extensions.len());
    for (x, l1) in bodies.extensions.iter().zip(file.extensions.iter()) {
        extension_links.push(deps.field_type(l1.base.parent.message(), x.kind, &x.type_name));
    }

    let mut method_links = Vec::with_capacity(bodies.services.len());
    for service in &bodies.services {
        let mut links = Vec::with_capacity(service.methods.len());
        for method in &service.methods {
            let input = deps.message_type(None, &method.input_type);
            let output = deps.message_type(None, &method.output_type);
            links.push((input, output));
        }
        method_links.push(links);
    }

    deps.finish();

    let messages = bodies
        .messages
        .iter()
        .zip(field_links)
        .enumerate()
        .map(|(m, (message, links))| message_l2(file, &enums, m, message, links))
        .collect();

    let extensions = bodies
        .extensions
        .iter()
        .zip(file.extensions.iter())
        .zip(extension_links.into_iter().zip(extendees))
        .map(|((x, l1), (link, extendee))| ExtensionL2 {
            field: field_l2(file, &enums, file.scope_name(l1.base.parent), x, link, None),
            extendee,
        })
        .collect();

    let services = bodies
        .services
        .iter()
        .zip(file.services.iter())
        .zip(method_links)
        .map(|((service, l1), links)| ServiceL2 {
            methods: service
                .methods
                .iter()
                .zip(links)
                .map(|(method, (input, output))| MethodL2 {
                    name: method.name.clone(),
                    full_name: join_name(&l1.base.full_name, &method.name),
                    input,
                    output,
                    client_streaming: method.client_streaming,
                    server_streaming: method.server_streaming,
                    options: LazyOptions::new(DeclKind::Method, method.options.clone()),
                })
                .collect(),
            options: LazyOptions::new(DeclKind::Service, service.options.clone()),
            by_name: LazyIndex::default(),
        })
        .collect();

    FileL2 {
        imports,
        options: LazyOptions::new(DeclKind::File, bodies.header.options.clone()),
        enums: enums.into_boxed_slice(),
        messages,
        extensions,
        services,
    }
}

/// `scope` is the full name of the scope enclosing the enum; values are
/// siblings of their enum.
fn enum_l2(e: &EnumLiteral, scope: &str) -> EnumL2 {
    EnumL2 {
        values: e
            .values
            .iter()
            .map(|v| EnumValueL2 {
                name: v.name.clone(),
                full_name: join_name(scope, &v.name),
                number: v.number,
                options: LazyOptions::new(DeclKind::EnumValue, v.options.clone()),
            })
            .collect(),
        reserved_names: e.reserved_names.clone(),
        reserved_ranges: e.reserved_ranges.iter().map(|&(start, end)| start..=end).collect(),
        options: LazyOptions::new(DeclKind::Enum, e.options.clone()),
        by_name: LazyIndex::default(),
        by_number: LazyIndex::default(),
    }
}

fn message_l2(
    file: &FileInner,
    enums: &[EnumL2],
    index: usize,
    message: &MessageLiteral,
    links: Vec<TypeLink>,
) -> MessageL2 {
    let full_name = &file.messages[index].base.full_name;

    let fields: Vec<FieldL2> = message
        .fields
        .iter()
        .zip(links)
        .map(|(f, link)| {
            let oneof = f.oneof_index.map(|i| match usize::try_from(i) {
                Ok(i) if i < message.oneofs.len() => i,
                _ => malformed(
                    &file.path,
                    format_args!("field {}.{} has oneof index {} out of range", full_name, f.name, i),
                ),
            });
            field_l2(file, enums, full_name, f, link, oneof)
        })
        .collect();

    let oneofs = message
        .oneofs
        .iter()
        .enumerate()
        .map(|(i, oneof)| OneofL2 {
            name: oneof.name.clone(),
            full_name: join_name(full_name, &oneof.name),
            fields: (0..fields.len()).filter(|&j| fields[j].oneof == Some(i)).collect(),
            options: LazyOptions::new(DeclKind::Oneof, oneof.options.clone()),
        })
        .collect();

    MessageL2 {
        fields,
        oneofs,
        reserved_names: message.reserved_names.clone(),
        reserved_ranges: message.reserved_ranges.iter().map(|&(start, end)| start..end).collect(),
        extension_ranges: message
            .extension_ranges
            .iter()
            .map(|range| ExtensionRangeL2 {
                range: range.start..range.end,
                options: LazyOptions::new(DeclKind::ExtensionRange, range.options.clone()),
            })
            .collect(),
        options: LazyOptions::new(DeclKind::Message, message.options.clone()),
        by_name: LazyIndex::default(),
        by_json_name: LazyIndex::default(),
        by_number: LazyIndex::default(),
    }
}

fn field_l2(
    file: &FileInner,
    enums: &[EnumL2],
    scope: &str,
    f: &FieldLiteral,
    link: TypeLink,
    oneof: Option<usize>,
) -> FieldL2 {
    let full_name = join_name(scope, &f.name);

    // Only proto3 packs repeated scalars without being asked to.
    let packed = f.packed.unwrap_or(
        file.syntax == Syntax::Proto3 && f.cardinality == Cardinality::Repeated && f.kind.is_packable(),
    );

    let default = match &f.default {
        Some(text) => explicit_default(file, enums, &full_name, f.kind, text, &link),
        None => DefaultSlot::default(),
    };

    FieldL2 {
        name: f.name.clone(),
        number: f.number,
        cardinality: f.cardinality,
        kind: f.kind,
        json_name: f.json_name.clone().unwrap_or_else(|| json_camel_case(&f.name)),
        has_json_name: f.json_name.is_some(),
        packed,
        has_packed: f.packed.is_some(),
        weak: f.weak,
        proto3_optional: f.proto3_optional,
        oneof,
        type_name: f.type_name.clone(),
        link,
        default,
        options: LazyOptions::new(DeclKind::Field, f.options.clone()),
        full_name,
    }
}

/// Enum defaults name a value. Local enums are read from the values built
/// earlier in this pass, since the file's own lazy state is not available
/// until the pass returns.
fn explicit_default(
    file: &FileInner,
    enums: &[EnumL2],
    full_name: &str,
    kind: Kind,
    text: &str,
    link: &TypeLink,
) -> DefaultSlot {
    if kind != Kind::Enum {
        let value = parse_scalar(text, kind)
            .unwrap_or_else(|err| malformed(&file.path, format_args!("{}: {}", full_name, err)));
        return DefaultSlot::explicit(text.to_owned(), value, None);
    }

    let (number, value) = match link {
        TypeLink::Enum(EnumLink::Local(e)) => {
            let index = enums[*e]
                .values
                .iter()
                .position(|v| v.name == text)
                .unwrap_or_else(|| unknown_value(&file.path, full_name, text));
            (enums[*e].values[index].number, EnumValueLink::Local { enum_index: *e, index })
        }
        TypeLink::Enum(EnumLink::Foreign(descriptor)) if descriptor.is_placeholder() => {
            let name = join_name(parent_name(descriptor.full_name()), text);
            (0, EnumValueLink::Foreign(EnumValueDescriptor::placeholder(name)))
        }
        TypeLink::Enum(EnumLink::Foreign(descriptor)) => {
            let value = descriptor
                .value_by_name(text)
                .unwrap_or_else(|| unknown_value(&file.path, full_name, text));
            (value.number(), EnumValueLink::Foreign(value))
        }
        _ => unknown_value(&file.path, full_name, text),
    };

    DefaultSlot::explicit(text.to_owned(), DefaultValue::Enum(number), Some(value))
}

fn unknown_value(path: &str, full_name: &str, text: &str) -> ! {
    malformed(path, format_args!("{}: invalid default value {:?} for enum", full_name, text))
}
