use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::file::{FileDescriptor, FileInner, Repr};
use crate::full::{EnumL2, EnumValueL2};
use crate::message::MessageDescriptor;
use crate::options::DecodedOptions;
use crate::utils::{fatal, short_name};

/// A handle to an enum declaration, or a placeholder carrying only the full
/// name of an enum that could not be resolved.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EnumDescriptor {
    repr: Repr,
}

impl EnumDescriptor {
    pub(crate) fn node(file: Arc<FileInner>, index: usize) -> EnumDescriptor {
        EnumDescriptor { repr: Repr::Node { file, index } }
    }

    pub fn placeholder(full_name: impl Into<Arc<str>>) -> EnumDescriptor {
        EnumDescriptor { repr: Repr::Placeholder(full_name.into()) }
    }

    pub(crate) fn arena(&self) -> Option<(&Arc<FileInner>, usize)> {
        self.repr.node()
    }

    fn l2(&self) -> Option<(&Arc<FileInner>, usize, &EnumL2)> {
        let (file, index) = self.repr.node()?;
        Some((file, index, &file.lazy().enums[index]))
    }

    pub fn name(&self) -> &str {
        short_name(self.full_name())
    }

    pub fn full_name(&self) -> &str {
        match &self.repr {
            Repr::Node { file, index } => &file.enums[*index].base.full_name,
            Repr::Placeholder(name) => name,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.repr, Repr::Placeholder(_))
    }

    /// The declaring file, or `None` for placeholders.
    pub fn file(&self) -> Option<FileDescriptor> {
        self.repr.node().map(|(file, _)| FileDescriptor::node(file.clone()))
    }

    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        let (file, index) = self.repr.node()?;
        let parent = file.enums[index].base.parent.message()?;
        Some(MessageDescriptor::node(file.clone(), parent))
    }

    /// Position among the parent's enums.
    pub fn index(&self) -> usize {
        self.repr.node().map_or(0, |(file, index)| file.enums[index].base.index)
    }

    /// The generated-type handle this enum was declared with, if any.
    pub fn type_handle(&self) -> Option<&str> {
        self.repr.node().and_then(|(file, index)| file.enums[index].handle.as_deref())
    }

    pub fn values(&self) -> impl Iterator<Item = EnumValueDescriptor> + '_ {
        let (file, index, count) = match self.l2() {
            Some((file, index, l2)) => (Some(file), index, l2.values.len()),
            None => (None, 0, 0),
        };
        (0..count).filter_map(move |i| file.map(|file| EnumValueDescriptor::node(file.clone(), index, i)))
    }

    pub fn value(&self, i: usize) -> Option<EnumValueDescriptor> {
        let (file, index, l2) = self.l2()?;
        (i < l2.values.len()).then(|| EnumValueDescriptor::node(file.clone(), index, i))
    }

    pub fn value_by_name(&self, name: &str) -> Option<EnumValueDescriptor> {
        let (file, index, l2) = self.l2()?;
        let i = l2.by_name.find(name, || l2.values.iter().map(|v| v.name.clone()))?;
        Some(EnumValueDescriptor::node(file.clone(), index, i))
    }

    /// The first value declared with `number` when aliases share it.
    pub fn value_by_number(&self, number: i32) -> Option<EnumValueDescriptor> {
        let (file, index, l2) = self.l2()?;
        let i = l2.by_number.find(&number, || l2.values.iter().map(|v| v.number))?;
        Some(EnumValueDescriptor::node(file.clone(), index, i))
    }

    pub fn reserved_names(&self) -> &[String] {
        self.l2().map(|(_, _, l2)| l2.reserved_names.as_slice()).unwrap_or_default()
    }

    /// Inclusive on both ends.
    pub fn reserved_ranges(&self) -> &[RangeInclusive<i32>] {
        self.l2().map(|(_, _, l2)| l2.reserved_ranges.as_slice()).unwrap_or_default()
    }

    pub fn is_reserved_number(&self, number: i32) -> bool {
        self.reserved_ranges().iter().any(|range| range.contains(&number))
    }

    pub fn options(&self) -> DecodedOptions {
        match self.l2() {
            Some((file, _, l2)) => l2.options.get(file.options_registry(), self.full_name()),
            None => fatal(format_args!("options requested on placeholder enum {}", self.full_name())),
        }
    }

    pub fn raw_options(&self) -> &[u8] {
        self.l2().map(|(_, _, l2)| l2.options.raw()).unwrap_or_default()
    }
}

impl fmt::Debug for EnumDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EnumDescriptor").field(&self.full_name()).finish()
    }
}

/// A handle to one value of an enum. Placeholders stand in for enum
/// defaults whose enum could not be resolved.
#[derive(Clone)]
pub struct EnumValueDescriptor {
    repr: ValueRepr,
}

#[derive(Clone)]
enum ValueRepr {
    Node {
        file: Arc<FileInner>,
        enum_index: usize,
        index: usize,
    },
    Placeholder(Arc<str>),
}

impl EnumValueDescriptor {
    pub(crate) fn node(file: Arc<FileInner>, enum_index: usize, index: usize) -> EnumValueDescriptor {
        EnumValueDescriptor { repr: ValueRepr::Node { file, enum_index, index } }
    }

    pub fn placeholder(full_name: impl Into<Arc<str>>) -> EnumValueDescriptor {
        EnumValueDescriptor { repr: ValueRepr::Placeholder(full_name.into()) }
    }

    fn l2(&self) -> Option<(&Arc<FileInner>, &EnumValueL2)> {
        match &self.repr {
            ValueRepr::Node { file, enum_index, index } => Some((file, &file.lazy().enums[*enum_index].values[*index])),
            ValueRepr::Placeholder(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        short_name(self.full_name())
    }

    /// Values are scoped as siblings of their enum.
    pub fn full_name(&self) -> &str {
        match &self.repr {
            ValueRepr::Node { .. } => self.l2().map_or("", |(_, l2)| l2.full_name.as_str()),
            ValueRepr::Placeholder(name) => name,
        }
    }

    /// Zero for placeholders.
    pub fn number(&self) -> i32 {
        self.l2().map_or(0, |(_, l2)| l2.number)
    }

    pub fn index(&self) -> usize {
        match &self.repr {
            ValueRepr::Node { index, .. } => *index,
            ValueRepr::Placeholder(_) => 0,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.repr, ValueRepr::Placeholder(_))
    }

    pub fn parent_enum(&self) -> Option<EnumDescriptor> {
        match &self.repr {
            ValueRepr::Node { file, enum_index, .. } => Some(EnumDescriptor::node(file.clone(), *enum_index)),
            ValueRepr::Placeholder(_) => None,
        }
    }

    pub fn options(&self) -> DecodedOptions {
        match self.l2() {
            Some((file, l2)) => l2.options.get(file.options_registry(), &l2.full_name),
            None => fatal(format_args!("options requested on placeholder enum value {}", self.full_name())),
        }
    }

    pub fn raw_options(&self) -> &[u8] {
        self.l2().map(|(_, l2)| l2.options.raw()).unwrap_or_default()
    }
}

impl PartialEq for EnumValueDescriptor {
    fn eq(&self, other: &EnumValueDescriptor) -> bool {
        match (&self.repr, &other.repr) {
            (
                ValueRepr::Node { file: a, enum_index: e, index: i },
                ValueRepr::Node { file: b, enum_index: f, index: j },
            ) => Arc::ptr_eq(a, b) && e == f && i == j,
            (ValueRepr::Placeholder(a), ValueRepr::Placeholder(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for EnumValueDescriptor {}

impl Hash for EnumValueDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.repr {
            ValueRepr::Node { file, enum_index, index } => {
                Arc::as_ptr(file).hash(state);
                enum_index.hash(state);
                index.hash(state);
            }
            ValueRepr::Placeholder(name) => name.hash(state),
        }
    }
}

impl fmt::Debug for EnumValueDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EnumValueDescriptor")
            .field(&self.full_name())
            .field(&self.number())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::*;
    use crate::LiteralBuilder;

    fn color() -> FileLiteral {
        FileLiteral {
            path: "color.proto".into(),
            package: "paint".into(),
            enums: vec![EnumLiteral {
                name: "Color".into(),
                values: vec![
                    EnumValueLiteral { name: "RED".into(), number: 0, ..Default::default() },
                    EnumValueLiteral { name: "CRIMSON".into(), number: 0, ..Default::default() },
                    EnumValueLiteral { name: "BLUE".into(), number: 2, ..Default::default() },
                ],
                reserved_names: vec!["GREEN".into()],
                reserved_ranges: vec![(5, 7)],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn values_and_aliases() {
        let built = LiteralBuilder::new(color()).build();
        let color = &built.enums[0];
        assert_eq!(color.full_name(), "paint.Color");
        assert_eq!(color.name(), "Color");
        assert!(color.parent_message().is_none());

        let names: Vec<_> = color.values().map(|v| v.full_name().to_owned()).collect();
        assert_eq!(names, ["paint.RED", "paint.CRIMSON", "paint.BLUE"]);
        assert_eq!(color.value_by_number(0).unwrap().name(), "RED");
        assert_eq!(color.value_by_name("BLUE").unwrap().number(), 2);
        assert_eq!(color.value_by_name("BLUE").unwrap().parent_enum().as_ref(), Some(color));
        assert!(color.value_by_name("GREEN").is_none());
        assert!(color.value(3).is_none());
    }

    #[test]
    fn reserved() {
        let built = LiteralBuilder::new(color()).build();
        let color = &built.enums[0];
        assert_eq!(color.reserved_names(), ["GREEN"]);
        assert!(color.is_reserved_number(7));
        assert!(!color.is_reserved_number(8));
    }

    #[test]
    fn placeholders() {
        let e = EnumDescriptor::placeholder("pkg.Missing");
        assert!(e.is_placeholder());
        assert_eq!(e.name(), "Missing");
        assert_eq!(e.values().count(), 0);
        assert!(e.value_by_name("X").is_none());
        assert!(e.file().is_none());

        let v = EnumValueDescriptor::placeholder("pkg.X");
        assert_eq!(v.number(), 0);
        assert_eq!(v.name(), "X");
        assert_eq!(v, EnumValueDescriptor::placeholder("pkg.X"));
    }
}
