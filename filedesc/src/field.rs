use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::trace;

use crate::defval::DefaultValue;
use crate::deps::TypeLink;
use crate::enums::{EnumDescriptor, EnumValueDescriptor};
use crate::file::{FileDescriptor, FileInner};
use crate::full::FieldL2;
use crate::message::{MessageDescriptor, OneofDescriptor};
use crate::options::DecodedOptions;
use crate::types::{Cardinality, Kind, Syntax};

/// A handle to a message field or an extension.
#[derive(Clone)]
pub struct FieldDescriptor {
    file: Arc<FileInner>,
    loc: FieldLoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FieldLoc {
    /// `index` is the position in the message's field list.
    Message { message: usize, index: usize },
    /// Arena index of the extension.
    Extension(usize),
}

impl FieldDescriptor {
    pub(crate) fn field(file: Arc<FileInner>, message: usize, index: usize) -> FieldDescriptor {
        FieldDescriptor { file, loc: FieldLoc::Message { message, index } }
    }

    pub(crate) fn extension(file: Arc<FileInner>, index: usize) -> FieldDescriptor {
        FieldDescriptor { file, loc: FieldLoc::Extension(index) }
    }

    /// Arena index of the extension, for extensions.
    pub(crate) fn extension_index(&self) -> Option<usize> {
        match self.loc {
            FieldLoc::Extension(index) => Some(index),
            FieldLoc::Message { .. } => None,
        }
    }

    fn l2(&self) -> &FieldL2 {
        let l2 = self.file.lazy();
        match self.loc {
            FieldLoc::Message { message, index } => &l2.messages[message].fields[index],
            FieldLoc::Extension(index) => &l2.extensions[index].field,
        }
    }

    /// Extension names are known without running the full pass.
    pub fn name(&self) -> &str {
        match self.loc {
            FieldLoc::Extension(index) => &self.file.extensions[index].base.name,
            FieldLoc::Message { .. } => &self.l2().name,
        }
    }

    pub fn full_name(&self) -> &str {
        match self.loc {
            FieldLoc::Extension(index) => &self.file.extensions[index].base.full_name,
            FieldLoc::Message { .. } => &self.l2().full_name,
        }
    }

    pub fn number(&self) -> i32 {
        self.l2().number
    }

    pub fn cardinality(&self) -> Cardinality {
        self.l2().cardinality
    }

    pub fn kind(&self) -> Kind {
        self.l2().kind
    }

    /// Position among the declaring scope's fields or extensions.
    pub fn index(&self) -> usize {
        match self.loc {
            FieldLoc::Message { index, .. } => index,
            FieldLoc::Extension(index) => self.file.extensions[index].base.index,
        }
    }

    pub fn file(&self) -> FileDescriptor {
        FileDescriptor::node(self.file.clone())
    }

    pub fn json_name(&self) -> &str {
        &self.l2().json_name
    }

    /// Whether the JSON name was declared rather than derived.
    pub fn has_json_name(&self) -> bool {
        self.l2().has_json_name
    }

    pub fn is_packed(&self) -> bool {
        self.l2().packed
    }

    /// Whether packing was declared rather than derived from the syntax.
    pub fn has_packed(&self) -> bool {
        self.l2().has_packed
    }

    pub fn is_weak(&self) -> bool {
        self.l2().weak
    }

    pub fn is_proto3_optional(&self) -> bool {
        self.l2().proto3_optional
    }

    pub fn is_extension(&self) -> bool {
        matches!(self.loc, FieldLoc::Extension(_))
    }

    pub fn is_list(&self) -> bool {
        self.cardinality() == Cardinality::Repeated && !self.is_map()
    }

    pub fn is_map(&self) -> bool {
        self.cardinality() == Cardinality::Repeated && self.message_type().is_some_and(|m| m.is_map_entry())
    }

    /// Whether an unset field can be told apart from one set to its default.
    pub fn has_presence(&self) -> bool {
        let l2 = self.l2();
        if l2.cardinality == Cardinality::Repeated {
            return false;
        }
        self.is_extension()
            || l2.kind.is_message()
            || l2.oneof.is_some()
            || self.file.syntax == Syntax::Proto2
    }

    /// The message declaring the field. For extensions this is the extended
    /// message.
    pub fn containing_message(&self) -> MessageDescriptor {
        match self.loc {
            FieldLoc::Message { message, .. } => MessageDescriptor::node(self.file.clone(), message),
            FieldLoc::Extension(index) => self.file.lazy().extensions[index].extendee.descriptor(&self.file),
        }
    }

    /// The message an extension is declared in, if it is not at file level.
    pub fn extension_scope(&self) -> Option<MessageDescriptor> {
        let index = self.extension_index()?;
        let parent = self.file.extensions[index].base.parent.message()?;
        Some(MessageDescriptor::node(self.file.clone(), parent))
    }

    pub fn extendee(&self) -> Option<MessageDescriptor> {
        let index = self.extension_index()?;
        Some(self.file.lazy().extensions[index].extendee.descriptor(&self.file))
    }

    pub fn containing_oneof(&self) -> Option<OneofDescriptor> {
        match self.loc {
            FieldLoc::Message { message, .. } => {
                let oneof = self.l2().oneof?;
                Some(OneofDescriptor::new(self.file.clone(), message, oneof))
            }
            FieldLoc::Extension(_) => None,
        }
    }

    pub fn enum_type(&self) -> Option<EnumDescriptor> {
        match &self.l2().link {
            TypeLink::Enum(link) => Some(link.descriptor(&self.file)),
            _ => None,
        }
    }

    /// Weak fields are looked up in the type registry the file was built
    /// with, on every access, and stay placeholders until registered.
    pub fn message_type(&self) -> Option<MessageDescriptor> {
        let l2 = self.l2();
        match &l2.link {
            TypeLink::Message(link) => Some(link.descriptor(&self.file)),
            TypeLink::Weak => {
                let name = l2.type_name.strip_prefix('.').unwrap_or(&l2.type_name);
                let found = self.file.types.as_ref().and_then(|types| types.find_message(name));
                Some(found.unwrap_or_else(|| {
                    trace!(field = %l2.full_name, type_name = name, "weak field type not registered");
                    MessageDescriptor::placeholder(name)
                }))
            }
            _ => None,
        }
    }

    /// The value an unset singular scalar or enum field reads as. `None` for
    /// repeated and message fields.
    pub fn default_value(&self) -> Option<DefaultValue> {
        let l2 = self.l2();
        if l2.cardinality == Cardinality::Repeated || l2.kind.is_message() {
            return None;
        }
        if let Some(value) = l2.default.checked(&l2.full_name) {
            return Some(value.clone());
        }
        Some(match l2.kind {
            Kind::Enum => DefaultValue::Enum(self.default_enum_value().map_or(0, |v| v.number())),
            kind => DefaultValue::zero(kind),
        })
    }

    /// Whether a default was declared.
    pub fn has_default(&self) -> bool {
        self.l2().default.text.is_some()
    }

    /// The enum value named by the default. Without a declared default this
    /// is the first value in proto2 files and the zero value otherwise.
    pub fn default_enum_value(&self) -> Option<EnumValueDescriptor> {
        let l2 = self.l2();
        if l2.kind != Kind::Enum {
            return None;
        }
        if let Some(link) = &l2.default.enum_value {
            return Some(link.descriptor(&self.file));
        }
        let enum_type = self.enum_type()?;
        match self.file.syntax {
            Syntax::Proto2 => enum_type.value(0),
            Syntax::Proto3 => enum_type.value_by_number(0),
        }
    }

    /// The default as declared.
    pub(crate) fn default_text(&self) -> Option<&str> {
        self.l2().default.text.as_deref()
    }

    /// The type name as declared.
    pub(crate) fn type_name(&self) -> &str {
        &self.l2().type_name
    }

    pub fn options(&self) -> DecodedOptions {
        let l2 = self.l2();
        l2.options.get(self.file.options_registry(), &l2.full_name)
    }

    pub fn raw_options(&self) -> &[u8] {
        self.l2().options.raw()
    }
}

impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &FieldDescriptor) -> bool {
        Arc::ptr_eq(&self.file, &other.file) && self.loc == other.loc
    }
}

impl Eq for FieldDescriptor {}

impl Hash for FieldDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.file).hash(state);
        self.loc.hash(state);
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldDescriptor").field(&self.full_name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::*;
    use crate::registry::{Registries, TypeDescriptor, TypeRegistry};
    use crate::LiteralBuilder;

    fn with_syntax(syntax: Syntax) -> FileLiteral {
        let mut weak = FieldLiteral::new("ext", 5, Kind::Message).typed(".other.Weak");
        weak.weak = true;

        FileLiteral {
            path: "fields.proto".into(),
            package: "pkg".into(),
            syntax,
            enums: vec![EnumLiteral {
                name: "Level".into(),
                values: vec![
                    EnumValueLiteral { name: "HIGH".into(), number: 3, ..Default::default() },
                    EnumValueLiteral { name: "NONE".into(), number: 0, ..Default::default() },
                ],
                ..Default::default()
            }],
            messages: vec![
                MessageLiteral {
                    name: "M".into(),
                    fields: vec![
                        FieldLiteral::new("count", 1, Kind::Int32).with_default("7"),
                        FieldLiteral::new("level", 2, Kind::Enum).typed("pkg.Level"),
                        FieldLiteral::new("ids", 3, Kind::Int32).repeated(),
                        FieldLiteral::new("entries", 4, Kind::Message).repeated().typed("pkg.M.EntriesEntry"),
                        weak,
                    ],
                    messages: vec![MessageLiteral {
                        name: "EntriesEntry".into(),
                        is_map_entry: true,
                        fields: vec![
                            FieldLiteral::new("key", 1, Kind::String),
                            FieldLiteral::new("value", 2, Kind::String),
                        ],
                        ..Default::default()
                    }],
                    extension_ranges: vec![ExtensionRangeLiteral { start: 100, end: 110, ..Default::default() }],
                    ..Default::default()
                },
                MessageLiteral {
                    name: "Scope".into(),
                    extensions: vec![FieldLiteral::new("tag", 101, Kind::String).extending("pkg.M")],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn scalars_and_defaults() {
        let built = LiteralBuilder::new(with_syntax(Syntax::Proto2)).build();
        let m = &built.messages[0];

        let count = m.field_by_name("count").unwrap();
        assert_eq!(count.default_value(), Some(DefaultValue::Int32(7)));
        assert!(count.has_default());
        assert!(count.has_presence());

        let level = m.field_by_name("level").unwrap();
        assert_eq!(level.enum_type().unwrap().full_name(), "pkg.Level");
        assert_eq!(level.default_enum_value().unwrap().name(), "HIGH");
        assert_eq!(level.default_value(), Some(DefaultValue::Enum(3)));
        assert!(!level.has_default());

        let ids = m.field_by_name("ids").unwrap();
        assert!(ids.is_list());
        assert!(!ids.is_packed());
        assert_eq!(ids.default_value(), None);
    }

    #[test]
    fn proto3_zero_values() {
        let built = LiteralBuilder::new(with_syntax(Syntax::Proto3)).build();
        let m = &built.messages[0];

        let level = m.field_by_name("level").unwrap();
        assert_eq!(level.default_enum_value().unwrap().name(), "NONE");
        assert_eq!(level.default_value(), Some(DefaultValue::Enum(0)));
        assert!(!level.has_presence());
        assert!(m.field_by_name("ids").unwrap().is_packed());
    }

    #[test]
    fn maps() {
        let built = LiteralBuilder::new(with_syntax(Syntax::Proto3)).build();
        let entries = built.messages[0].field_by_name("entries").unwrap();
        assert!(entries.is_map());
        assert!(!entries.is_list());
        assert!(entries.message_type().unwrap().is_map_entry());
        assert_eq!(entries.json_name(), "entries");
    }

    #[test]
    fn extensions() {
        let built = LiteralBuilder::new(with_syntax(Syntax::Proto2)).build();
        let tag = &built.extensions[0];
        assert!(tag.is_extension());
        assert_eq!(tag.full_name(), "pkg.Scope.tag");
        assert_eq!(tag.extendee(), Some(built.messages[0].clone()));
        assert_eq!(tag.containing_message(), built.messages[0]);
        assert_eq!(tag.extension_scope().unwrap().full_name(), "pkg.Scope");
        assert!(tag.has_presence());
        assert!(built.messages[0].is_extension_number(tag.number()));
    }

    #[test]
    fn weak_fields_bind_on_access() {
        let types = Arc::new(TypeRegistry::default());
        let registries = Registries {
            types: Some(types.clone()),
            ..Registries::none()
        };
        let built = LiteralBuilder::new(with_syntax(Syntax::Proto2)).with_registries(registries).build();
        let weak = built.messages[0].field_by_name("ext").unwrap();
        assert!(weak.is_weak());
        assert!(weak.message_type().unwrap().is_placeholder());

        let other = LiteralBuilder::new(FileLiteral {
            path: "other.proto".into(),
            package: "other".into(),
            messages: vec![MessageLiteral { name: "Weak".into(), ..Default::default() }],
            ..Default::default()
        })
        .build();
        types.register(TypeDescriptor::Message(other.messages[0].clone())).unwrap();

        let bound = weak.message_type().unwrap();
        assert!(!bound.is_placeholder());
        assert_eq!(bound, other.messages[0]);
    }
}
