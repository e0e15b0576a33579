//! Binding of field types, extendees and method inputs/outputs.
//!
//! The full pass asks for dependencies in a fixed order: the extendee of
//! every extension, the type of every non-weak enum/message/group field of
//! every message, the type of every enum/message/group extension, then the
//! input and output of every method. Wire-built files answer each request
//! by popping the next entry of the dependency index list; literal-built
//! files answer it by resolving the type name.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::builder::TypeHandle;
use crate::enums::{EnumDescriptor, EnumValueDescriptor};
use crate::file::FileInner;
use crate::message::MessageDescriptor;
use crate::registry::TypeRegistry;
use crate::resolve::{resolve, Found};
use crate::types::Kind;
use crate::utils::{malformed, mismatch};

pub(crate) enum EnumLink {
    Local(usize),
    Foreign(EnumDescriptor),
}

pub(crate) enum MessageLink {
    Local(usize),
    Foreign(MessageDescriptor),
}

pub(crate) enum TypeLink {
    None,
    /// Weak message fields are bound on access.
    Weak,
    Enum(EnumLink),
    Message(MessageLink),
}

pub(crate) enum EnumValueLink {
    Local { enum_index: usize, index: usize },
    Foreign(EnumValueDescriptor),
}

impl EnumLink {
    pub fn descriptor(&self, file: &Arc<FileInner>) -> EnumDescriptor {
        match self {
            EnumLink::Local(index) => EnumDescriptor::node(file.clone(), *index),
            EnumLink::Foreign(descriptor) => descriptor.clone(),
        }
    }
}

impl MessageLink {
    pub fn descriptor(&self, file: &Arc<FileInner>) -> MessageDescriptor {
        match self {
            MessageLink::Local(index) => MessageDescriptor::node(file.clone(), *index),
            MessageLink::Foreign(descriptor) => descriptor.clone(),
        }
    }
}

impl EnumValueLink {
    pub fn descriptor(&self, file: &Arc<FileInner>) -> EnumValueDescriptor {
        match self {
            EnumValueLink::Local { enum_index, index } => EnumValueDescriptor::node(file.clone(), *enum_index, *index),
            EnumValueLink::Foreign(descriptor) => descriptor.clone(),
        }
    }
}

pub(crate) trait Dependencies {
    /// `scope` is the arena index of the message the reference appears in,
    /// or `None` for file-level declarations and methods.
    fn enum_type(&mut self, scope: Option<usize>, type_name: &str) -> EnumLink;

    fn message_type(&mut self, scope: Option<usize>, type_name: &str) -> MessageLink;

    /// Called once every request has been made.
    fn finish(self);

    fn field_type(&mut self, scope: Option<usize>, kind: Kind, type_name: &str) -> TypeLink {
        match kind {
            Kind::Enum => TypeLink::Enum(self.enum_type(scope, type_name)),
            Kind::Message | Kind::Group => TypeLink::Message(self.message_type(scope, type_name)),
            _ => TypeLink::None,
        }
    }
}

/// Answers requests from a flat list of indices into the type handle list:
/// enums, then messages of this file, then foreign handles.
pub(crate) struct IndexedDeps<'a> {
    file: &'a FileInner,
    foreign: Vec<TypeHandle>,
    indexes: std::vec::IntoIter<usize>,
    consumed: usize,
}

impl<'a> IndexedDeps<'a> {
    pub fn new(file: &'a FileInner, foreign: Vec<TypeHandle>, indexes: Vec<usize>) -> IndexedDeps<'a> {
        IndexedDeps {
            file,
            foreign,
            indexes: indexes.into_iter(),
            consumed: 0,
        }
    }

    fn next(&mut self, type_name: &str) -> usize {
        let index = self.indexes.next().unwrap_or_else(|| {
            mismatch(
                &self.file.path,
                format_args!(
                    "insufficient dependencies: list exhausted after {} entries while binding {:?}",
                    self.consumed, type_name
                ),
            )
        });
        self.consumed += 1;
        index
    }

    fn foreign(&self, index: usize, type_name: &str) -> &TypeHandle {
        let local = self.file.enums.len() + self.file.messages.len();
        self.foreign.get(index - local).unwrap_or_else(|| {
            mismatch(
                &self.file.path,
                format_args!(
                    "dependency index {} for {:?} is past the {} type handles",
                    index,
                    type_name,
                    local + self.foreign.len()
                ),
            )
        })
    }

    fn check_name(&self, index: usize, type_name: &str, full_name: &str) {
        let expected = type_name.strip_prefix('.').unwrap_or(type_name);
        if !expected.is_empty() && expected != full_name {
            warn!(
                file = %self.file.path,
                index,
                expected,
                bound = full_name,
                "dependency index binds a differently named type"
            );
        }
        trace!(file = %self.file.path, index, bound = full_name, "bound dependency");
    }
}

impl Dependencies for IndexedDeps<'_> {
    fn enum_type(&mut self, _scope: Option<usize>, type_name: &str) -> EnumLink {
        let index = self.next(type_name);
        let (enums, messages) = (self.file.enums.len(), self.file.messages.len());

        let link = if index < enums {
            EnumLink::Local(index)
        } else if index < enums + messages {
            mismatch(
                &self.file.path,
                format_args!("dependency index {} for {:?} is a message, want an enum", index, type_name),
            )
        } else {
            match self.foreign(index, type_name) {
                TypeHandle::Enum(descriptor) => EnumLink::Foreign(descriptor.clone()),
                other => mismatch(
                    &self.file.path,
                    format_args!("dependency index {} for {:?} is {:?}, want an enum", index, type_name, other),
                ),
            }
        };

        let full_name = match &link {
            EnumLink::Local(i) => self.file.enums[*i].base.full_name.as_str(),
            EnumLink::Foreign(descriptor) => descriptor.full_name(),
        };
        self.check_name(index, type_name, full_name);
        link
    }

    fn message_type(&mut self, _scope: Option<usize>, type_name: &str) -> MessageLink {
        let index = self.next(type_name);
        let (enums, messages) = (self.file.enums.len(), self.file.messages.len());

        let link = if index < enums {
            mismatch(
                &self.file.path,
                format_args!("dependency index {} for {:?} is an enum, want a message", index, type_name),
            )
        } else if index < enums + messages {
            MessageLink::Local(index - enums)
        } else {
            match self.foreign(index, type_name) {
                TypeHandle::Message(descriptor) => MessageLink::Foreign(descriptor.clone()),
                other => mismatch(
                    &self.file.path,
                    format_args!("dependency index {} for {:?} is {:?}, want a message", index, type_name, other),
                ),
            }
        };

        let full_name = match &link {
            MessageLink::Local(i) => self.file.messages[*i].base.full_name.as_str(),
            MessageLink::Foreign(descriptor) => descriptor.full_name(),
        };
        self.check_name(index, type_name, full_name);
        link
    }

    fn finish(self) {
        let unused = self.indexes.len();
        if unused > 0 {
            mismatch(
                &self.file.path,
                format_args!("unused dependencies: {} of {} entries left over", unused, self.consumed + unused),
            );
        }
    }
}

/// Answers requests by resolving names against the file itself, then the
/// type registry. Anything still unknown becomes a placeholder.
pub(crate) struct NamedDeps<'a> {
    file: &'a FileInner,
    types: Option<Arc<TypeRegistry>>,
}

impl<'a> NamedDeps<'a> {
    pub fn new(file: &'a FileInner, types: Option<Arc<TypeRegistry>>) -> NamedDeps<'a> {
        NamedDeps { file, types }
    }

    fn lookup(&self, scope: Option<usize>, type_name: &str) -> Option<Found> {
        if type_name.is_empty() {
            malformed(&self.file.path, "reference without a type name");
        }
        resolve(self.file, scope, type_name)
    }
}

fn strip_dot(type_name: &str) -> &str {
    type_name.strip_prefix('.').unwrap_or(type_name)
}

impl Dependencies for NamedDeps<'_> {
    fn enum_type(&mut self, scope: Option<usize>, type_name: &str) -> EnumLink {
        match self.lookup(scope, type_name) {
            Some(Found::Enum(index)) => EnumLink::Local(index),
            found => {
                if found.is_some() {
                    warn!(file = %self.file.path, type_name, "enum reference resolves to a message");
                }
                let name = strip_dot(type_name);
                let descriptor = self
                    .types
                    .as_ref()
                    .and_then(|types| types.find_enum(name))
                    .unwrap_or_else(|| {
                        trace!(file = %self.file.path, type_name, "unresolved enum reference");
                        EnumDescriptor::placeholder(name)
                    });
                EnumLink::Foreign(descriptor)
            }
        }
    }

    fn message_type(&mut self, scope: Option<usize>, type_name: &str) -> MessageLink {
        match self.lookup(scope, type_name) {
            Some(Found::Message(index)) => MessageLink::Local(index),
            found => {
                if found.is_some() {
                    warn!(file = %self.file.path, type_name, "message reference resolves to an enum");
                }
                let name = strip_dot(type_name);
                let descriptor = self
                    .types
                    .as_ref()
                    .and_then(|types| types.find_message(name))
                    .unwrap_or_else(|| {
                        trace!(file = %self.file.path, type_name, "unresolved message reference");
                        MessageDescriptor::placeholder(name)
                    });
                MessageLink::Foreign(descriptor)
            }
        }
    }

    fn finish(self) {}
}
