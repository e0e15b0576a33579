use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::enums::EnumDescriptor;
use crate::field::FieldDescriptor;
use crate::file::{nodes, FileDescriptor, FileInner, Repr};
use crate::full::{MessageL2, OneofL2};
use crate::options::DecodedOptions;
use crate::registry::TypeDescriptor;
use crate::resolve::resolve;
use crate::seed::MessageL1;
use crate::utils::{fatal, short_name};

/// A handle to a message declaration, or a placeholder carrying only the
/// full name of a message that could not be resolved.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MessageDescriptor {
    repr: Repr,
}

impl MessageDescriptor {
    pub(crate) fn node(file: Arc<FileInner>, index: usize) -> MessageDescriptor {
        MessageDescriptor { repr: Repr::Node { file, index } }
    }

    pub fn placeholder(full_name: impl Into<Arc<str>>) -> MessageDescriptor {
        MessageDescriptor { repr: Repr::Placeholder(full_name.into()) }
    }

    pub(crate) fn arena(&self) -> Option<(&Arc<FileInner>, usize)> {
        self.repr.node()
    }

    fn l2(&self) -> Option<(&Arc<FileInner>, usize, &MessageL2)> {
        let (file, index) = self.repr.node()?;
        Some((file, index, &file.lazy().messages[index]))
    }

    pub fn name(&self) -> &str {
        short_name(self.full_name())
    }

    pub fn full_name(&self) -> &str {
        match &self.repr {
            Repr::Node { file, index } => &file.messages[*index].base.full_name,
            Repr::Placeholder(name) => name,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.repr, Repr::Placeholder(_))
    }

    pub fn file(&self) -> Option<FileDescriptor> {
        self.repr.node().map(|(file, _)| FileDescriptor::node(file.clone()))
    }

    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        let (file, index) = self.repr.node()?;
        let parent = file.messages[index].base.parent.message()?;
        Some(MessageDescriptor::node(file.clone(), parent))
    }

    /// Position among the parent's messages.
    pub fn index(&self) -> usize {
        self.repr.node().map_or(0, |(file, index)| file.messages[index].base.index)
    }

    pub fn type_handle(&self) -> Option<&str> {
        self.repr.node().and_then(|(file, index)| file.messages[index].handle.as_deref())
    }

    /// Available without running the full pass.
    pub fn is_map_entry(&self) -> bool {
        self.repr.node().is_some_and(|(file, index)| file.messages[index].is_map_entry)
    }

    /// Available without running the full pass.
    pub fn is_message_set(&self) -> bool {
        self.repr.node().is_some_and(|(file, index)| file.messages[index].is_message_set)
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldDescriptor> + '_ {
        let (file, index, count) = match self.l2() {
            Some((file, index, l2)) => (Some(file), index, l2.fields.len()),
            None => (None, 0, 0),
        };
        (0..count).filter_map(move |i| file.map(|file| FieldDescriptor::field(file.clone(), index, i)))
    }

    pub fn field(&self, i: usize) -> Option<FieldDescriptor> {
        let (file, index, l2) = self.l2()?;
        (i < l2.fields.len()).then(|| FieldDescriptor::field(file.clone(), index, i))
    }

    pub fn field_by_number(&self, number: i32) -> Option<FieldDescriptor> {
        let (file, index, l2) = self.l2()?;
        let i = l2.by_number.find(&number, || l2.fields.iter().map(|f| f.number))?;
        Some(FieldDescriptor::field(file.clone(), index, i))
    }

    pub fn field_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        let (file, index, l2) = self.l2()?;
        let i = l2.by_name.find(name, || l2.fields.iter().map(|f| f.name.clone()))?;
        Some(FieldDescriptor::field(file.clone(), index, i))
    }

    pub fn field_by_json_name(&self, json_name: &str) -> Option<FieldDescriptor> {
        let (file, index, l2) = self.l2()?;
        let i = l2.by_json_name.find(json_name, || l2.fields.iter().map(|f| f.json_name.clone()))?;
        Some(FieldDescriptor::field(file.clone(), index, i))
    }

    pub fn oneofs(&self) -> impl Iterator<Item = OneofDescriptor> + '_ {
        let (file, index, count) = match self.l2() {
            Some((file, index, l2)) => (Some(file), index, l2.oneofs.len()),
            None => (None, 0, 0),
        };
        (0..count).filter_map(move |i| file.map(|file| OneofDescriptor::new(file.clone(), index, i)))
    }

    pub fn oneof_by_name(&self, name: &str) -> Option<OneofDescriptor> {
        self.oneofs().find(|o| o.name() == name)
    }

    fn children(&self, pick: fn(&MessageL1) -> Range<usize>) -> (Option<&Arc<FileInner>>, Range<usize>) {
        match self.repr.node() {
            Some((file, index)) => (Some(file), pick(&file.messages[index])),
            None => (None, 0..0),
        }
    }

    pub fn nested_enums(&self) -> impl Iterator<Item = EnumDescriptor> + '_ {
        let (file, range) = self.children(|m| m.enums.clone());
        nodes(file, range, EnumDescriptor::node)
    }

    pub fn nested_messages(&self) -> impl Iterator<Item = MessageDescriptor> + '_ {
        let (file, range) = self.children(|m| m.messages.clone());
        nodes(file, range, MessageDescriptor::node)
    }

    pub fn nested_extensions(&self) -> impl Iterator<Item = FieldDescriptor> + '_ {
        let (file, range) = self.children(|m| m.extensions.clone());
        nodes(file, range, FieldDescriptor::extension)
    }

    pub fn reserved_names(&self) -> &[String] {
        self.l2().map(|(_, _, l2)| l2.reserved_names.as_slice()).unwrap_or_default()
    }

    /// Half-open.
    pub fn reserved_ranges(&self) -> &[Range<i32>] {
        self.l2().map(|(_, _, l2)| l2.reserved_ranges.as_slice()).unwrap_or_default()
    }

    pub fn is_reserved_number(&self, number: i32) -> bool {
        self.reserved_ranges().iter().any(|range| range.contains(&number))
    }

    /// Half-open.
    pub fn extension_ranges(&self) -> impl Iterator<Item = Range<i32>> + '_ {
        self.l2()
            .into_iter()
            .flat_map(|(_, _, l2)| l2.extension_ranges.iter().map(|r| r.range.clone()))
    }

    pub fn extension_range_options(&self, i: usize) -> Option<DecodedOptions> {
        let (file, _, l2) = self.l2()?;
        let range = l2.extension_ranges.get(i)?;
        Some(range.options.get(file.options_registry(), self.full_name()))
    }

    pub fn is_extension_number(&self, number: i32) -> bool {
        self.extension_ranges().any(|range| range.contains(&number))
    }

    /// Resolves a full name starting from the scope of this message, the way
    /// a field declared here would.
    pub fn resolve_type(&self, name: &str) -> Option<TypeDescriptor> {
        let (file, index) = self.repr.node()?;
        resolve(file, Some(index), name).map(|found| file.found(found))
    }

    pub fn options(&self) -> DecodedOptions {
        match self.l2() {
            Some((file, _, l2)) => l2.options.get(file.options_registry(), self.full_name()),
            None => fatal(format_args!("options requested on placeholder message {}", self.full_name())),
        }
    }

    pub fn raw_options(&self) -> &[u8] {
        self.l2().map(|(_, _, l2)| l2.options.raw()).unwrap_or_default()
    }
}

impl fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageDescriptor").field(&self.full_name()).finish()
    }
}

/// A handle to a oneof of a message.
#[derive(Clone)]
pub struct OneofDescriptor {
    file: Arc<FileInner>,
    message: usize,
    index: usize,
}

impl OneofDescriptor {
    pub(crate) fn new(file: Arc<FileInner>, message: usize, index: usize) -> OneofDescriptor {
        OneofDescriptor { file, message, index }
    }

    fn l2(&self) -> &OneofL2 {
        &self.file.lazy().messages[self.message].oneofs[self.index]
    }

    pub fn name(&self) -> &str {
        &self.l2().name
    }

    pub fn full_name(&self) -> &str {
        &self.l2().full_name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn containing_message(&self) -> MessageDescriptor {
        MessageDescriptor::node(self.file.clone(), self.message)
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldDescriptor> + '_ {
        self.l2()
            .fields
            .iter()
            .map(|&i| FieldDescriptor::field(self.file.clone(), self.message, i))
    }

    /// Whether this oneof only exists to track presence of a single
    /// proto3 `optional` field.
    pub fn is_synthetic(&self) -> bool {
        let l2 = self.l2();
        let fields = &self.file.lazy().messages[self.message].fields;
        l2.fields.len() == 1 && fields[l2.fields[0]].proto3_optional
    }

    pub fn options(&self) -> DecodedOptions {
        self.l2().options.get(self.file.options_registry(), self.full_name())
    }

    pub fn raw_options(&self) -> &[u8] {
        self.l2().options.raw()
    }
}

impl PartialEq for OneofDescriptor {
    fn eq(&self, other: &OneofDescriptor) -> bool {
        Arc::ptr_eq(&self.file, &other.file) && self.message == other.message && self.index == other.index
    }
}

impl Eq for OneofDescriptor {}

impl fmt::Debug for OneofDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OneofDescriptor").field(&self.full_name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::*;
    use crate::types::{Kind, Syntax};
    use crate::LiteralBuilder;

    fn outer() -> FileLiteral {
        let mut nick = FieldLiteral::new("nick", 3, Kind::String);
        nick.oneof_index = Some(0);
        let mut age = FieldLiteral::new("age", 4, Kind::Int32);
        age.oneof_index = Some(1);
        age.proto3_optional = true;

        FileLiteral {
            path: "outer.proto".into(),
            package: "pkg".into(),
            syntax: Syntax::Proto3,
            messages: vec![MessageLiteral {
                name: "Outer".into(),
                fields: vec![
                    FieldLiteral::new("user_id", 1, Kind::Int64),
                    FieldLiteral::new("inner", 2, Kind::Message).typed("Inner"),
                    nick,
                    age,
                ],
                oneofs: vec![
                    OneofLiteral { name: "handle".into(), ..Default::default() },
                    OneofLiteral { name: "_age".into(), ..Default::default() },
                ],
                messages: vec![MessageLiteral { name: "Inner".into(), ..Default::default() }],
                enums: vec![EnumLiteral { name: "Mode".into(), ..Default::default() }],
                extension_ranges: vec![ExtensionRangeLiteral { start: 100, end: 200, ..Default::default() }],
                reserved_names: vec!["legacy".into()],
                reserved_ranges: vec![(10, 12)],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn field_lookups() {
        let built = LiteralBuilder::new(outer()).build();
        let outer = &built.messages[0];
        assert_eq!(outer.fields().count(), 4);
        assert_eq!(outer.field_by_number(2).unwrap().name(), "inner");
        assert_eq!(outer.field_by_name("user_id").unwrap().number(), 1);
        assert_eq!(outer.field_by_json_name("userId").unwrap().number(), 1);
        assert!(outer.field_by_number(9).is_none());
        assert_eq!(outer.field(0), outer.field_by_number(1));
    }

    #[test]
    fn nested_declarations() {
        let built = LiteralBuilder::new(outer()).build();
        let outer = &built.messages[0];
        let inner = outer.nested_messages().next().unwrap();
        assert_eq!(inner.full_name(), "pkg.Outer.Inner");
        assert_eq!(inner.parent_message().as_ref(), Some(outer));
        assert_eq!(outer.nested_enums().next().unwrap().full_name(), "pkg.Outer.Mode");
        assert_eq!(outer.nested_extensions().count(), 0);
        assert_eq!(outer.field_by_name("inner").unwrap().message_type(), Some(inner));
    }

    #[test]
    fn oneofs() {
        let built = LiteralBuilder::new(outer()).build();
        let outer = &built.messages[0];
        let handle = outer.oneof_by_name("handle").unwrap();
        assert_eq!(handle.full_name(), "pkg.Outer.handle");
        assert_eq!(handle.fields().map(|f| f.number()).collect::<Vec<_>>(), [3]);
        assert!(!handle.is_synthetic());
        assert!(outer.oneof_by_name("_age").unwrap().is_synthetic());
        assert_eq!(outer.field_by_number(3).unwrap().containing_oneof(), Some(handle));
    }

    #[test]
    fn ranges() {
        let built = LiteralBuilder::new(outer()).build();
        let outer = &built.messages[0];
        assert!(outer.is_extension_number(150));
        assert!(!outer.is_extension_number(200));
        assert!(outer.is_reserved_number(11));
        assert!(!outer.is_reserved_number(12));
        assert_eq!(outer.reserved_names(), ["legacy"]);
    }

    #[test]
    fn relative_resolution() {
        let built = LiteralBuilder::new(outer()).build();
        let inner = built.messages[1].clone();
        let found = inner.resolve_type("pkg.Outer.Mode").unwrap();
        assert_eq!(found.full_name(), "pkg.Outer.Mode");
        assert!(inner.resolve_type("pkg.Nope").is_none());
    }

    #[test]
    fn placeholder() {
        let m = MessageDescriptor::placeholder("pkg.Missing");
        assert_eq!(m.name(), "Missing");
        assert_eq!(m.fields().count(), 0);
        assert!(m.field_by_number(1).is_none());
        assert!(!m.is_map_entry());
        assert!(m.resolve_type("pkg.Missing").is_none());
    }
}
