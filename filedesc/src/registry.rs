//! File and type registries.
//!
//! Both are internally synchronized and shared behind an `Arc`. Registering
//! only reads the identity filled in by the seed pass, so it never triggers
//! the full pass of the registered file.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::enums::EnumDescriptor;
use crate::error::DescriptorError;
use crate::field::FieldDescriptor;
use crate::file::FileDescriptor;
use crate::message::MessageDescriptor;
use crate::options::OptionsRegistry;

/// Files by path.
#[derive(Default)]
pub struct FileRegistry {
    files: RwLock<HashMap<String, FileDescriptor>>,
    packages: RwLock<HashMap<String, Vec<FileDescriptor>>>,
}

impl FileRegistry {
    pub fn new() -> FileRegistry {
        FileRegistry::default()
    }

    /// Fails if a file with the same path is already registered; the
    /// registry is left unchanged.
    pub fn register(&self, file: FileDescriptor) -> Result<(), DescriptorError> {
        let mut files = self.files.write();
        if files.contains_key(file.path()) {
            return Err(DescriptorError::DuplicateFile { path: file.path().to_owned() });
        }
        self.packages
            .write()
            .entry(file.package().to_owned())
            .or_default()
            .push(file.clone());
        files.insert(file.path().to_owned(), file);
        Ok(())
    }

    pub fn find_file_by_path(&self, path: &str) -> Option<FileDescriptor> {
        self.files.read().get(path).cloned()
    }

    /// In registration order.
    pub fn files_by_package(&self, package: &str) -> Vec<FileDescriptor> {
        self.packages.read().get(package).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Any declaration a type registry can hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Enum(EnumDescriptor),
    Message(MessageDescriptor),
    Extension(FieldDescriptor),
}

impl TypeDescriptor {
    pub fn full_name(&self) -> &str {
        match self {
            TypeDescriptor::Enum(e) => e.full_name(),
            TypeDescriptor::Message(m) => m.full_name(),
            TypeDescriptor::Extension(x) => x.full_name(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            TypeDescriptor::Enum(_) => "enum",
            TypeDescriptor::Message(_) => "message",
            TypeDescriptor::Extension(_) => "extension",
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDescriptor> {
        match self {
            TypeDescriptor::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&MessageDescriptor> {
        match self {
            TypeDescriptor::Message(m) => Some(m),
            _ => None,
        }
    }
}

/// Enums, messages and extensions by full name.
#[derive(Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, TypeDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry::default()
    }

    /// Fails if the full name is already taken; the registry is left
    /// unchanged.
    pub fn register(&self, descriptor: TypeDescriptor) -> Result<(), DescriptorError> {
        let mut types = self.types.write();
        if types.contains_key(descriptor.full_name()) {
            return Err(DescriptorError::DuplicateType {
                kind: descriptor.kind(),
                name: descriptor.full_name().to_owned(),
            });
        }
        types.insert(descriptor.full_name().to_owned(), descriptor);
        Ok(())
    }

    pub fn find_by_name(&self, full_name: &str) -> Option<TypeDescriptor> {
        self.types.read().get(full_name).cloned()
    }

    pub fn find_enum(&self, full_name: &str) -> Option<EnumDescriptor> {
        self.find_by_name(full_name)?.as_enum().cloned()
    }

    pub fn find_message(&self, full_name: &str) -> Option<MessageDescriptor> {
        self.find_by_name(full_name)?.as_message().cloned()
    }

    pub fn find_extension(&self, full_name: &str) -> Option<FieldDescriptor> {
        match self.find_by_name(full_name)? {
            TypeDescriptor::Extension(x) => Some(x),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

lazy_static! {
    static ref GLOBAL_FILES:   Arc<FileRegistry>    = Arc::new(FileRegistry::new());
    static ref GLOBAL_TYPES:   Arc<TypeRegistry>    = Arc::new(TypeRegistry::new());
    static ref GLOBAL_OPTIONS: Arc<OptionsRegistry> = Arc::new(OptionsRegistry::new());
}

/// The process-wide file registry.
pub fn global_files() -> Arc<FileRegistry> {
    GLOBAL_FILES.clone()
}

/// The process-wide type registry.
pub fn global_types() -> Arc<TypeRegistry> {
    GLOBAL_TYPES.clone()
}

/// The process-wide options registry.
pub fn global_options() -> Arc<OptionsRegistry> {
    GLOBAL_OPTIONS.clone()
}

/// The collaborators a builder registers into and resolves against. Each
/// is optional; construction behaves the same without them.
#[derive(Clone, Default)]
pub struct Registries {
    pub files: Option<Arc<FileRegistry>>,
    pub types: Option<Arc<TypeRegistry>>,
    pub options: Option<Arc<OptionsRegistry>>,
}

impl Registries {
    pub fn none() -> Registries {
        Registries::default()
    }

    pub fn global() -> Registries {
        Registries {
            files: Some(global_files()),
            types: Some(global_types()),
            options: Some(global_options()),
        }
    }
}
