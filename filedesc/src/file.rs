use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::builder::TypeHandle;
use crate::enums::EnumDescriptor;
use crate::field::FieldDescriptor;
use crate::full::{self, FileL2};
use crate::literal::FileLiteral;
use crate::message::MessageDescriptor;
use crate::options::{DecodedOptions, OptionsRegistry};
use crate::registry::{FileRegistry, TypeDescriptor, TypeRegistry};
use crate::resolve::{resolve, Found};
use crate::seed::{Children, EnumL1, ExtensionL1, MessageL1, Parent, Seeded, ServiceL1};
use crate::service::ServiceDescriptor;
use crate::types::Syntax;
use crate::utils::fatal;

/// Everything the full pass consumes. Dropped once it has run.
pub(crate) struct Pending {
    pub input: PendingInput,
    pub files: Option<Arc<FileRegistry>>,
    pub types: Option<Arc<TypeRegistry>>,
}

pub(crate) enum PendingInput {
    Wire {
        foreign: Vec<TypeHandle>,
        dependency_indexes: Vec<usize>,
    },
    Literal(FileLiteral),
}

pub(crate) struct FileInner {
    pub path: String,
    pub package: String,
    pub syntax: Syntax,
    pub raw: Option<Bytes>,
    pub top: Children,
    pub enums: Box<[EnumL1]>,
    pub messages: Box<[MessageL1]>,
    pub extensions: Box<[ExtensionL1]>,
    pub services: Box<[ServiceL1]>,
    pub options: Option<Arc<OptionsRegistry>>,
    /// Where weak fields look their message type up on access.
    pub types: Option<Arc<TypeRegistry>>,
    pub lazy: OnceLock<FileL2>,
    pub pending: Mutex<Option<Pending>>,
    pub full_passes: AtomicUsize,
}

impl FileInner {
    pub fn new(
        seeded: Seeded,
        raw: Option<Bytes>,
        options: Option<Arc<OptionsRegistry>>,
        pending: Pending,
    ) -> FileInner {
        FileInner {
            path: seeded.path,
            package: seeded.package,
            syntax: seeded.syntax,
            raw,
            top: seeded.top,
            enums: seeded.enums,
            messages: seeded.messages,
            extensions: seeded.extensions,
            services: seeded.services,
            options,
            types: pending.types.clone(),
            lazy: OnceLock::new(),
            pending: Mutex::new(Some(pending)),
            full_passes: AtomicUsize::new(0),
        }
    }

    /// The fully parsed attributes, running the full pass on first use.
    pub fn lazy(&self) -> &FileL2 {
        self.lazy.get_or_init(|| full::unmarshal_full(self))
    }

    pub fn scope_name(&self, parent: Parent) -> &str {
        match parent {
            Parent::File => &self.package,
            Parent::Message(index) => &self.messages[index].base.full_name,
        }
    }

    pub fn options_registry(&self) -> Option<&OptionsRegistry> {
        self.options.as_deref()
    }

    pub fn found(self: &Arc<Self>, found: Found) -> TypeDescriptor {
        match found {
            Found::Enum(i) => TypeDescriptor::Enum(EnumDescriptor::node(self.clone(), i)),
            Found::Message(i) => TypeDescriptor::Message(MessageDescriptor::node(self.clone(), i)),
        }
    }
}

/// Handles for the arena slots in `range`. Empty for placeholders.
pub(crate) fn nodes<'a, T: 'a>(
    file: Option<&'a Arc<FileInner>>,
    range: Range<usize>,
    make: fn(Arc<FileInner>, usize) -> T,
) -> impl Iterator<Item = T> + 'a {
    range.filter_map(move |i| file.map(|file| make(file.clone(), i)))
}

/// A handle to the descriptor of one schema file, or a placeholder standing
/// in for an import that was not found.
#[derive(Clone)]
pub struct FileDescriptor {
    repr: FileRepr,
}

#[derive(Clone)]
enum FileRepr {
    Node(Arc<FileInner>),
    Placeholder(Arc<str>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileImport {
    pub file: FileDescriptor,
    pub public: bool,
    pub weak: bool,
}

impl FileDescriptor {
    pub(crate) fn node(inner: Arc<FileInner>) -> FileDescriptor {
        FileDescriptor { repr: FileRepr::Node(inner) }
    }

    pub fn placeholder(path: impl Into<Arc<str>>) -> FileDescriptor {
        FileDescriptor { repr: FileRepr::Placeholder(path.into()) }
    }

    pub(crate) fn inner(&self) -> Option<&Arc<FileInner>> {
        match &self.repr {
            FileRepr::Node(inner) => Some(inner),
            FileRepr::Placeholder(_) => None,
        }
    }

    fn lazy(&self) -> Option<&FileL2> {
        self.inner().map(|inner| inner.lazy())
    }

    pub fn path(&self) -> &str {
        match &self.repr {
            FileRepr::Node(inner) => &inner.path,
            FileRepr::Placeholder(path) => path,
        }
    }

    /// Empty for placeholders.
    pub fn package(&self) -> &str {
        self.inner().map_or("", |inner| &inner.package)
    }

    pub fn syntax(&self) -> Syntax {
        self.inner().map_or(Syntax::Proto2, |inner| inner.syntax)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.repr, FileRepr::Placeholder(_))
    }

    /// Whether the full pass has already run.
    pub fn is_initialized(&self) -> bool {
        self.inner().is_some_and(|inner| inner.lazy.get().is_some())
    }

    /// The encoded descriptor, for wire-built files.
    pub fn raw(&self) -> Option<&Bytes> {
        self.inner().and_then(|inner| inner.raw.as_ref())
    }

    pub fn imports(&self) -> &[FileImport] {
        self.lazy().map(|l2| l2.imports.as_slice()).unwrap_or_default()
    }

    pub fn enums(&self) -> impl Iterator<Item = EnumDescriptor> + '_ {
        let range = self.inner().map_or(0..0, |inner| inner.top.enums.clone());
        nodes(self.inner(), range, EnumDescriptor::node)
    }

    pub fn messages(&self) -> impl Iterator<Item = MessageDescriptor> + '_ {
        let range = self.inner().map_or(0..0, |inner| inner.top.messages.clone());
        nodes(self.inner(), range, MessageDescriptor::node)
    }

    pub fn extensions(&self) -> impl Iterator<Item = FieldDescriptor> + '_ {
        let range = self.inner().map_or(0..0, |inner| inner.top.extensions.clone());
        nodes(self.inner(), range, FieldDescriptor::extension)
    }

    pub fn services(&self) -> impl Iterator<Item = ServiceDescriptor> + '_ {
        let range = self.inner().map_or(0..0, |inner| inner.top.services.clone());
        nodes(self.inner(), range, ServiceDescriptor::node)
    }

    pub fn enum_by_name(&self, name: &str) -> Option<EnumDescriptor> {
        self.enums().find(|e| e.name() == name)
    }

    pub fn message_by_name(&self, name: &str) -> Option<MessageDescriptor> {
        self.messages().find(|m| m.name() == name)
    }

    pub fn extension_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        self.extensions().find(|x| x.name() == name)
    }

    pub fn service_by_name(&self, name: &str) -> Option<ServiceDescriptor> {
        self.services().find(|s| s.name() == name)
    }

    /// Resolves a full name against the declarations of this file.
    pub fn resolve_type(&self, full_name: &str) -> Option<TypeDescriptor> {
        let inner = self.inner()?;
        resolve(inner, None, full_name).map(|found| inner.found(found))
    }

    pub fn options(&self) -> DecodedOptions {
        match &self.repr {
            FileRepr::Node(inner) => inner.lazy().options.get(inner.options_registry(), &inner.path),
            FileRepr::Placeholder(path) => fatal(format_args!("options requested on placeholder file {:?}", path)),
        }
    }

    pub fn raw_options(&self) -> &[u8] {
        self.lazy().map(|l2| l2.options.raw()).unwrap_or_default()
    }
}

impl PartialEq for FileDescriptor {
    fn eq(&self, other: &FileDescriptor) -> bool {
        match (&self.repr, &other.repr) {
            (FileRepr::Node(a), FileRepr::Node(b)) => Arc::ptr_eq(a, b),
            (FileRepr::Placeholder(a), FileRepr::Placeholder(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FileDescriptor {}

impl Hash for FileDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.repr {
            FileRepr::Node(inner) => Arc::as_ptr(inner).hash(state),
            FileRepr::Placeholder(path) => path.hash(state),
        }
    }
}

impl fmt::Debug for FileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FileDescriptor").field(&self.path()).finish()
    }
}

/// Identity shared by the enum and message handles.
#[derive(Clone)]
pub(crate) enum Repr {
    Node { file: Arc<FileInner>, index: usize },
    Placeholder(Arc<str>),
}

impl Repr {
    pub fn node(&self) -> Option<(&Arc<FileInner>, usize)> {
        match self {
            Repr::Node { file, index } => Some((file, *index)),
            Repr::Placeholder(_) => None,
        }
    }
}

impl PartialEq for Repr {
    fn eq(&self, other: &Repr) -> bool {
        match (self, other) {
            (Repr::Node { file: a, index: i }, Repr::Node { file: b, index: j }) => Arc::ptr_eq(a, b) && i == j,
            (Repr::Placeholder(a), Repr::Placeholder(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Repr {}

impl Hash for Repr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Repr::Node { file, index } => {
                Arc::as_ptr(file).hash(state);
                index.hash(state);
            }
            Repr::Placeholder(name) => name.hash(state),
        }
    }
}
