//! Flattened declaration order.
//!
//! At every scope the enums, messages and extensions declared there (plus
//! services at file scope) are listed first, then each of that scope's
//! messages is visited in turn. Arena slot `i` of a kind is the `i`-th
//! declaration of that kind in this order, and so is the `i`-th entry of
//! the matching region of an external handle list.

use protodesc_wire::{FieldIter, FieldValue};

use crate::fieldnum;
use crate::literal::{EnumLiteral, FieldLiteral, FileLiteral, MessageLiteral, ServiceLiteral};
use crate::utils::malformed;

pub(crate) struct Flattened<E, M, X, S> {
    pub enums: Vec<E>,
    pub messages: Vec<M>,
    pub extensions: Vec<X>,
    pub services: Vec<S>,
}

impl<E, M, X, S> Flattened<E, M, X, S> {
    fn new() -> Flattened<E, M, X, S> {
        Flattened {
            enums: Vec::new(),
            messages: Vec::new(),
            extensions: Vec::new(),
            services: Vec::new(),
        }
    }

    pub fn counts(&self) -> Counts {
        Counts {
            enums: self.enums.len(),
            messages: self.messages.len(),
            extensions: self.extensions.len(),
            services: self.services.len(),
        }
    }
}

/// Per-kind declaration totals for a whole file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Counts {
    pub enums: usize,
    pub messages: usize,
    pub extensions: usize,
    pub services: usize,
}

/// Encoded bodies of every declaration in a wire-format file.
pub(crate) type WireDecls<'a> = Flattened<&'a [u8], &'a [u8], &'a [u8], &'a [u8]>;

/// Every declaration of a literal tree.
pub(crate) type LiteralDecls<'a> =
    Flattened<&'a EnumLiteral, &'a MessageLiteral, &'a FieldLiteral, &'a ServiceLiteral>;

#[derive(Default)]
struct WireScope<'a> {
    enums: Vec<&'a [u8]>,
    messages: Vec<&'a [u8]>,
    extensions: Vec<&'a [u8]>,
}

pub(crate) fn flatten_wire<'a>(path: &str, raw: &'a [u8]) -> WireDecls<'a> {
    let mut out = Flattened::new();
    let mut scope = WireScope::default();

    for field in FieldIter::new(raw) {
        let (_, number, value) = field.unwrap_or_else(|()| malformed(path, "truncated file descriptor"));
        match number {
            fieldnum::file::ENUM_TYPE => scope.enums.push(decl_body(path, "enum_type", value)),
            fieldnum::file::MESSAGE_TYPE => scope.messages.push(decl_body(path, "message_type", value)),
            fieldnum::file::EXTENSION => scope.extensions.push(decl_body(path, "extension", value)),
            fieldnum::file::SERVICE => out.services.push(decl_body(path, "service", value)),
            _ => {}
        }
    }

    out.push_wire_scope(path, scope);
    out
}

impl<'a> WireDecls<'a> {
    fn push_wire_scope(&mut self, path: &str, scope: WireScope<'a>) {
        self.enums.extend_from_slice(&scope.enums);
        self.messages.extend_from_slice(&scope.messages);
        self.extensions.extend_from_slice(&scope.extensions);

        for body in scope.messages {
            let nested = message_scope(path, body);
            self.push_wire_scope(path, nested);
        }
    }
}

fn message_scope<'a>(path: &str, body: &'a [u8]) -> WireScope<'a> {
    let mut scope = WireScope::default();

    for field in FieldIter::new(body) {
        let (_, number, value) = field.unwrap_or_else(|()| malformed(path, "truncated message declaration"));
        match number {
            fieldnum::message::ENUM_TYPE => scope.enums.push(decl_body(path, "enum_type", value)),
            fieldnum::message::NESTED_TYPE => scope.messages.push(decl_body(path, "nested_type", value)),
            fieldnum::message::EXTENSION => scope.extensions.push(decl_body(path, "extension", value)),
            _ => {}
        }
    }

    scope
}

/// The body of a length-delimited declaration field.
pub(crate) fn decl_body<'a>(path: &str, what: &str, value: FieldValue<'a>) -> &'a [u8] {
    match value {
        FieldValue::Bytes(body) => body,
        other => malformed(path, format_args!("{} has wire type {:?}", what, other.wire_type())),
    }
}

pub(crate) fn flatten_literal(file: &FileLiteral) -> LiteralDecls<'_> {
    let mut out = Flattened::new();
    out.services.extend(file.services.iter());
    out.push_literal_scope(&file.enums, &file.messages, &file.extensions);
    out
}

impl<'a> LiteralDecls<'a> {
    fn push_literal_scope(
        &mut self,
        enums: &'a [EnumLiteral],
        messages: &'a [MessageLiteral],
        extensions: &'a [FieldLiteral],
    ) {
        self.enums.extend(enums.iter());
        self.messages.extend(messages.iter());
        self.extensions.extend(extensions.iter());

        for message in messages {
            self.push_literal_scope(&message.enums, &message.messages, &message.extensions);
        }
    }
}
