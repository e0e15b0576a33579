//! The eager pass. It fills in only identity (names, parents, child ranges)
//! and the message flags needed before first access, allocating every
//! declaration in flattened order.

use std::borrow::Cow;
use std::ops::Range;

use protodesc_wire::{FieldIter, FieldValue};

use crate::arena::Arena;
use crate::decode::string;
use crate::fieldnum;
use crate::literal::{EnumLiteral, FieldLiteral, FileLiteral, MessageLiteral, ServiceLiteral};
use crate::types::Syntax;
use crate::utils::{join_name, malformed};
use crate::walk::{decl_body, Counts};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Parent {
    #[default]
    File,
    Message(usize),
}

impl Parent {
    /// Arena index of the enclosing message.
    pub fn message(self) -> Option<usize> {
        match self {
            Parent::File => None,
            Parent::Message(index) => Some(index),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Base {
    pub name: String,
    pub full_name: String,
    pub parent: Parent,
    /// Position among the parent's declarations of the same kind.
    pub index: usize,
}

#[derive(Debug, Default)]
pub(crate) struct EnumL1 {
    pub base: Base,
    pub handle: Option<Cow<'static, str>>,
}

#[derive(Debug, Default)]
pub(crate) struct MessageL1 {
    pub base: Base,
    pub enums: Range<usize>,
    pub messages: Range<usize>,
    pub extensions: Range<usize>,
    pub is_map_entry: bool,
    pub is_message_set: bool,
    pub handle: Option<Cow<'static, str>>,
}

#[derive(Debug, Default)]
pub(crate) struct ExtensionL1 {
    pub base: Base,
}

#[derive(Debug, Default)]
pub(crate) struct ServiceL1 {
    pub base: Base,
}

/// Arena ranges of the declarations made directly in the file.
#[derive(Debug, Clone, Default)]
pub(crate) struct Children {
    pub enums: Range<usize>,
    pub messages: Range<usize>,
    pub extensions: Range<usize>,
    pub services: Range<usize>,
}

pub(crate) struct Seeded {
    pub path: String,
    pub package: String,
    pub syntax: Syntax,
    pub top: Children,
    pub enums: Box<[EnumL1]>,
    pub messages: Box<[MessageL1]>,
    pub extensions: Box<[ExtensionL1]>,
    pub services: Box<[ServiceL1]>,
}

/// A contiguous run of one repeated declaration field.
#[derive(Default)]
struct Run {
    count: usize,
    start: usize,
}

impl Run {
    fn tally(&mut self, path: &str, number: u32, prev: u32, offset: usize) {
        if prev != number {
            if self.count > 0 {
                malformed(path, format_args!("non-contiguous repeated field {}", number));
            }
            self.start = offset;
        }
        self.count += 1;
    }

    /// Re-scans only the recorded run.
    fn bodies<'a>(&self, path: &str, buf: &'a [u8]) -> Vec<&'a [u8]> {
        if self.count == 0 {
            return Vec::new();
        }
        FieldIter::new(&buf[self.start..])
            .take(self.count)
            .map(|field| match field {
                Ok((_, _, value)) => decl_body(path, "declaration", value),
                Err(()) => malformed(path, "truncated declaration"),
            })
            .collect()
    }
}

#[derive(Default)]
struct ScopeRuns {
    enums: Run,
    messages: Run,
    extensions: Run,
    services: Run,
}

struct Seeder {
    path: String,
    package: String,
    enums: Arena<EnumL1>,
    messages: Arena<MessageL1>,
    extensions: Arena<ExtensionL1>,
    services: Arena<ServiceL1>,
}

impl Seeder {
    fn new(path: String, package: String, counts: Counts) -> Seeder {
        Seeder {
            path,
            package,
            enums: Arena::with_capacity("enums", counts.enums),
            messages: Arena::with_capacity("messages", counts.messages),
            extensions: Arena::with_capacity("extensions", counts.extensions),
            services: Arena::with_capacity("services", counts.services),
        }
    }

    fn scope_name(&self, parent: Parent) -> &str {
        match parent {
            Parent::File => &self.package,
            Parent::Message(index) => &self.messages.get(index).base.full_name,
        }
    }

    fn base(&self, name: String, parent: Parent, index: usize) -> Base {
        let full_name = join_name(self.scope_name(parent), &name);
        Base { name, full_name, parent, index }
    }

    fn alloc_scope(&mut self, enums: usize, messages: usize, extensions: usize) -> Children {
        Children {
            enums: self.enums.alloc(&self.path, enums),
            messages: self.messages.alloc(&self.path, messages),
            extensions: self.extensions.alloc(&self.path, extensions),
            services: 0..0,
        }
    }

    fn finish(self, syntax: Syntax, top: Children) -> Seeded {
        Seeded {
            enums: self.enums.finish(&self.path),
            messages: self.messages.finish(&self.path),
            extensions: self.extensions.finish(&self.path),
            services: self.services.finish(&self.path),
            path: self.path,
            package: self.package,
            syntax,
            top,
        }
    }
}

pub(crate) fn seed_wire(raw: &[u8], counts: Counts) -> Seeded {
    let mut path = String::new();
    let mut package = String::new();
    let mut syntax = Syntax::Proto2;
    let mut runs = ScopeRuns::default();
    let mut prev = 0;

    for field in FieldIter::new(raw) {
        let (offset, number, value) = field.unwrap_or_else(|()| malformed(&path, "truncated file descriptor"));
        match number {
            fieldnum::file::NAME => path = string(&path, "name", value),
            fieldnum::file::PACKAGE => package = string(&path, "package", value),
            fieldnum::file::SYNTAX => {
                let name = string(&path, "syntax", value);
                syntax = Syntax::from_name(&name)
                    .unwrap_or_else(|| malformed(&path, format_args!("unsupported syntax {:?}", name)));
            }
            fieldnum::file::ENUM_TYPE => runs.enums.tally(&path, number, prev, offset),
            fieldnum::file::MESSAGE_TYPE => runs.messages.tally(&path, number, prev, offset),
            fieldnum::file::EXTENSION => runs.extensions.tally(&path, number, prev, offset),
            fieldnum::file::SERVICE => runs.services.tally(&path, number, prev, offset),
            _ => {}
        }
        prev = number;
    }

    let mut seeder = Seeder::new(path, package, counts);

    // All four kinds are allocated before any child scope is visited.
    let mut top = seeder.alloc_scope(runs.enums.count, runs.messages.count, runs.extensions.count);
    top.services = seeder.services.alloc(&seeder.path, runs.services.count);

    for (i, body) in runs.enums.bodies(&seeder.path, raw).into_iter().enumerate() {
        seeder.enum_wire(body, Parent::File, top.enums.start + i, i);
    }
    for (i, body) in runs.messages.bodies(&seeder.path, raw).into_iter().enumerate() {
        seeder.message_wire(body, Parent::File, top.messages.start + i, i);
    }
    for (i, body) in runs.extensions.bodies(&seeder.path, raw).into_iter().enumerate() {
        seeder.extension_wire(body, Parent::File, top.extensions.start + i, i);
    }
    for (i, body) in runs.services.bodies(&seeder.path, raw).into_iter().enumerate() {
        let name = name_only(&seeder.path, fieldnum::service::NAME, body);
        let base = seeder.base(name, Parent::File, i);
        *seeder.services.get_mut(top.services.start + i) = ServiceL1 { base };
    }

    seeder.finish(syntax, top)
}

/// Reads field 1 of a declaration, ignoring everything else.
fn name_only(path: &str, name_field: u32, body: &[u8]) -> String {
    let mut name = String::new();
    for field in FieldIter::new(body) {
        let (_, number, value) = field.unwrap_or_else(|()| malformed(path, "truncated declaration"));
        if number == name_field {
            name = string(path, "name", value);
        }
    }
    name
}

/// Applies `map_entry` and `message_set_wire_format` from one chunk of
/// encoded `MessageOptions`. Options absent from the chunk keep their value.
fn message_flags(path: &str, options: &[u8], is_map_entry: &mut bool, is_message_set: &mut bool) {
    for field in FieldIter::new(options) {
        let (_, number, value) = field.unwrap_or_else(|()| malformed(path, "truncated message options"));
        let flag = match number {
            fieldnum::message_options::MAP_ENTRY => &mut *is_map_entry,
            fieldnum::message_options::MESSAGE_SET_WIRE_FORMAT => &mut *is_message_set,
            _ => continue,
        };
        match value {
            FieldValue::Varint(v) => *flag = v != 0,
            other => malformed(path, format_args!("message option {} has wire type {:?}", number, other.wire_type())),
        }
    }
}

impl Seeder {
    fn enum_wire(&mut self, body: &[u8], parent: Parent, slot: usize, index: usize) {
        let name = name_only(&self.path, fieldnum::enums::NAME, body);
        let base = self.base(name, parent, index);
        *self.enums.get_mut(slot) = EnumL1 { base, handle: None };
    }

    fn extension_wire(&mut self, body: &[u8], parent: Parent, slot: usize, index: usize) {
        let name = name_only(&self.path, fieldnum::field::NAME, body);
        let base = self.base(name, parent, index);
        *self.extensions.get_mut(slot) = ExtensionL1 { base };
    }

    fn message_wire(&mut self, body: &[u8], parent: Parent, slot: usize, index: usize) {
        let mut name = String::new();
        let (mut is_map_entry, mut is_message_set) = (false, false);
        let mut runs = ScopeRuns::default();
        let mut prev = 0;

        for field in FieldIter::new(body) {
            let (offset, number, value) =
                field.unwrap_or_else(|()| malformed(&self.path, "truncated message declaration"));
            match number {
                fieldnum::message::NAME => name = string(&self.path, "name", value),
                fieldnum::message::OPTIONS => {
                    let options = decl_body(&self.path, "options", value);
                    message_flags(&self.path, options, &mut is_map_entry, &mut is_message_set);
                }
                fieldnum::message::ENUM_TYPE => runs.enums.tally(&self.path, number, prev, offset),
                fieldnum::message::NESTED_TYPE => runs.messages.tally(&self.path, number, prev, offset),
                fieldnum::message::EXTENSION => runs.extensions.tally(&self.path, number, prev, offset),
                _ => {}
            }
            prev = number;
        }

        let base = self.base(name, parent, index);
        let children = self.alloc_scope(runs.enums.count, runs.messages.count, runs.extensions.count);
        *self.messages.get_mut(slot) = MessageL1 {
            base,
            enums: children.enums.clone(),
            messages: children.messages.clone(),
            extensions: children.extensions.clone(),
            is_map_entry,
            is_message_set,
            handle: None,
        };

        let scope = Parent::Message(slot);
        for (i, body) in runs.enums.bodies(&self.path, body).into_iter().enumerate() {
            self.enum_wire(body, scope, children.enums.start + i, i);
        }
        for (i, body) in runs.messages.bodies(&self.path, body).into_iter().enumerate() {
            self.message_wire(body, scope, children.messages.start + i, i);
        }
        for (i, body) in runs.extensions.bodies(&self.path, body).into_iter().enumerate() {
            self.extension_wire(body, scope, children.extensions.start + i, i);
        }
    }
}

pub(crate) fn seed_literal(file: &FileLiteral, counts: Counts) -> Seeded {
    let mut seeder = Seeder::new(file.path.clone(), file.package.clone(), counts);

    let mut top = seeder.alloc_scope(file.enums.len(), file.messages.len(), file.extensions.len());
    top.services = seeder.services.alloc(&seeder.path, file.services.len());

    seeder.scope_literal(Parent::File, &top, &file.enums, &file.messages, &file.extensions);
    for (i, service) in file.services.iter().enumerate() {
        seeder.service_literal(service, top.services.start + i, i);
    }

    seeder.finish(file.syntax, top)
}

impl Seeder {
    fn scope_literal(
        &mut self,
        scope: Parent,
        children: &Children,
        enums: &[EnumLiteral],
        messages: &[MessageLiteral],
        extensions: &[FieldLiteral],
    ) {
        for (i, e) in enums.iter().enumerate() {
            let base = self.base(e.name.clone(), scope, i);
            *self.enums.get_mut(children.enums.start + i) = EnumL1 { base, handle: None };
        }
        for (i, m) in messages.iter().enumerate() {
            self.message_literal(m, scope, children.messages.start + i, i);
        }
        for (i, x) in extensions.iter().enumerate() {
            let base = self.base(x.name.clone(), scope, i);
            *self.extensions.get_mut(children.extensions.start + i) = ExtensionL1 { base };
        }
    }

    fn message_literal(&mut self, message: &MessageLiteral, parent: Parent, slot: usize, index: usize) {
        let base = self.base(message.name.clone(), parent, index);
        let children = self.alloc_scope(message.enums.len(), message.messages.len(), message.extensions.len());
        *self.messages.get_mut(slot) = MessageL1 {
            base,
            enums: children.enums.clone(),
            messages: children.messages.clone(),
            extensions: children.extensions.clone(),
            is_map_entry: message.is_map_entry,
            is_message_set: message.is_message_set,
            handle: None,
        };

        self.scope_literal(
            Parent::Message(slot),
            &children,
            &message.enums,
            &message.messages,
            &message.extensions,
        );
    }

    fn service_literal(&mut self, service: &ServiceLiteral, slot: usize, index: usize) {
        let base = self.base(service.name.clone(), Parent::File, index);
        *self.services.get_mut(slot) = ServiceL1 { base };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::*;
    use crate::walk::{flatten_literal, flatten_wire};
    use protodesc_wire::ByteBufferMut;

    fn nested() -> FileLiteral {
        FileLiteral {
            path: "nested.proto".into(),
            package: "pkg".into(),
            messages: vec![
                MessageLiteral {
                    name: "A".into(),
                    messages: vec![MessageLiteral { name: "A1".into(), ..Default::default() }],
                    enums: vec![EnumLiteral { name: "AE".into(), ..Default::default() }],
                    ..Default::default()
                },
                MessageLiteral {
                    name: "B".into(),
                    is_map_entry: true,
                    ..Default::default()
                },
            ],
            services: vec![ServiceLiteral { name: "S".into(), ..Default::default() }],
            ..Default::default()
        }
    }

    fn full_names(seeded: &Seeded) -> Vec<&str> {
        seeded.messages.iter().map(|m| m.base.full_name.as_str()).collect()
    }

    #[test]
    fn wire_and_literal_agree() {
        let file = nested();
        let raw = file.encode();

        let wire = seed_wire(&raw, flatten_wire("nested.proto", &raw).counts());
        let literal = seed_literal(&file, flatten_literal(&file).counts());

        for seeded in [&wire, &literal] {
            assert_eq!(seeded.path, "nested.proto");
            assert_eq!(full_names(seeded), ["pkg.A", "pkg.B", "pkg.A.A1"]);
            assert_eq!(seeded.messages[2].base.parent, Parent::Message(0));
            assert_eq!(seeded.messages[0].messages, 2..3);
            assert!(seeded.messages[1].is_map_entry);
            assert_eq!(seeded.enums[0].base.full_name, "pkg.A.AE");
            assert_eq!(seeded.services[0].base.full_name, "pkg.S");
            assert_eq!(seeded.top.messages, 0..2);
        }
    }

    #[test]
    #[should_panic(expected = "non-contiguous repeated field 4")]
    fn interleaved_messages() {
        let mut bb = ByteBufferMut::new();
        bb.write_string_field(fieldnum::file::NAME, "bad.proto");
        bb.write_bytes_field(fieldnum::file::MESSAGE_TYPE, b"\x0a\x01A");
        bb.write_bytes_field(fieldnum::file::ENUM_TYPE, b"\x0a\x01E");
        bb.write_bytes_field(fieldnum::file::MESSAGE_TYPE, b"\x0a\x01B");
        let raw = bb.data();
        seed_wire(&raw, flatten_wire("bad.proto", &raw).counts());
    }

    #[test]
    #[should_panic(expected = "arena overflow")]
    fn undersized_counts() {
        let file = nested();
        let raw = file.encode();
        let mut counts = flatten_wire("nested.proto", &raw).counts();
        counts.messages -= 1;
        seed_wire(&raw, counts);
    }

    #[test]
    #[should_panic(expected = "mismatching cardinality")]
    fn oversized_counts() {
        let file = nested();
        let mut counts = flatten_literal(&file).counts();
        counts.enums += 1;
        seed_literal(&file, counts);
    }

    #[test]
    #[should_panic(expected = "unsupported syntax")]
    fn unknown_syntax() {
        let mut bb = ByteBufferMut::new();
        bb.write_string_field(fieldnum::file::SYNTAX, "proto4");
        seed_wire(bb.as_slice(), Counts::default());
    }
}
