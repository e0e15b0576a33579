//! Construction entry points.
//!
//! Both builders run the seed pass eagerly, wrap the result in a file whose
//! full pass is deferred to first access, and register the file and its
//! declarations into whichever registries were supplied.

use std::borrow::Cow;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::decode;
use crate::enums::EnumDescriptor;
use crate::error::DescriptorError;
use crate::field::FieldDescriptor;
use crate::file::{FileDescriptor, FileInner, Pending, PendingInput};
use crate::literal::FileLiteral;
use crate::message::MessageDescriptor;
use crate::registry::{Registries, TypeDescriptor};
use crate::seed::{seed_literal, seed_wire, Seeded};
use crate::service::ServiceDescriptor;
use crate::utils::mismatch;
use crate::walk::{flatten_literal, flatten_wire};

/// One entry of the external type handle list.
///
/// The list holds, in flattened order, a `Declared` handle per enum and per
/// message (`Vacant` for map entries), followed by the `Enum`/`Message`
/// descriptors that dependency indices past the local declarations refer to.
#[derive(Debug, Clone)]
pub enum TypeHandle {
    Vacant,
    Declared(Cow<'static, str>),
    Enum(EnumDescriptor),
    Message(MessageDescriptor),
}

impl TypeHandle {
    pub fn declared(name: impl Into<Cow<'static, str>>) -> TypeHandle {
        TypeHandle::Declared(name.into())
    }
}

/// Everything a build produced. Registration failures are recoverable and
/// reported here; the file is usable regardless.
#[derive(Debug)]
pub struct BuildOutput {
    pub file: FileDescriptor,
    /// Every enum of the file, in flattened order.
    pub enums: Vec<EnumDescriptor>,
    /// Every message of the file, in flattened order.
    pub messages: Vec<MessageDescriptor>,
    /// Every extension of the file, in flattened order.
    pub extensions: Vec<FieldDescriptor>,
    pub services: Vec<ServiceDescriptor>,
    pub errors: Vec<DescriptorError>,
}

/// Builds a file from its encoded descriptor.
pub struct Builder {
    raw: Bytes,
    handles: Vec<TypeHandle>,
    dependency_indexes: Vec<usize>,
    registries: Registries,
}

impl Builder {
    pub fn new(raw: impl Into<Bytes>) -> Builder {
        Builder {
            raw: raw.into(),
            handles: Vec::new(),
            dependency_indexes: Vec::new(),
            registries: Registries::none(),
        }
    }

    pub fn with_handles(mut self, handles: Vec<TypeHandle>) -> Builder {
        self.handles = handles;
        self
    }

    pub fn with_dependency_indexes(mut self, indexes: Vec<usize>) -> Builder {
        self.dependency_indexes = indexes;
        self
    }

    pub fn with_registries(mut self, registries: Registries) -> Builder {
        self.registries = registries;
        self
    }

    pub fn build(self) -> BuildOutput {
        let Builder { raw, handles, dependency_indexes, registries } = self;

        let path = decode::file_shell(&raw).path;
        let counts = flatten_wire(&path, &raw).counts();
        let mut seeded = seed_wire(&raw, counts);
        let foreign = bind_handles(&mut seeded, handles);

        let pending = Pending {
            input: PendingInput::Wire { foreign, dependency_indexes },
            files: registries.files.clone(),
            types: registries.types.clone(),
        };
        let inner = FileInner::new(seeded, Some(raw), registries.options.clone(), pending);
        publish(Arc::new(inner), &registries)
    }
}

/// Builds a file from a literal schema tree. References are bound by name.
pub struct LiteralBuilder {
    tree: FileLiteral,
    registries: Registries,
}

impl LiteralBuilder {
    pub fn new(tree: FileLiteral) -> LiteralBuilder {
        LiteralBuilder { tree, registries: Registries::none() }
    }

    pub fn with_registries(mut self, registries: Registries) -> LiteralBuilder {
        self.registries = registries;
        self
    }

    pub fn build(self) -> BuildOutput {
        let LiteralBuilder { tree, registries } = self;

        let counts = flatten_literal(&tree).counts();
        let seeded = seed_literal(&tree, counts);

        let pending = Pending {
            input: PendingInput::Literal(tree),
            files: registries.files.clone(),
            types: registries.types.clone(),
        };
        let inner = FileInner::new(seeded, None, registries.options.clone(), pending);
        publish(Arc::new(inner), &registries)
    }
}

/// Attaches the local handles to the seeded declarations and returns the
/// foreign remainder.
fn bind_handles(seeded: &mut Seeded, mut handles: Vec<TypeHandle>) -> Vec<TypeHandle> {
    let local = seeded.enums.len() + seeded.messages.len();
    if handles.len() < local {
        mismatch(
            &seeded.path,
            format_args!(
                "{} type handles for {} enums and {} messages",
                handles.len(),
                seeded.enums.len(),
                seeded.messages.len()
            ),
        );
    }
    let foreign = handles.split_off(local);
    let mut handles = handles.into_iter();

    for e in seeded.enums.iter_mut() {
        match handles.next() {
            Some(TypeHandle::Declared(name)) => e.handle = Some(name),
            other => mismatch(
                &seeded.path,
                format_args!("enum {} was given handle {:?}", e.base.full_name, other),
            ),
        }
    }
    for m in seeded.messages.iter_mut() {
        match (m.is_map_entry, handles.next()) {
            (true, Some(TypeHandle::Vacant)) => {}
            (false, Some(TypeHandle::Declared(name))) => m.handle = Some(name),
            (_, other) => mismatch(
                &seeded.path,
                format_args!("message {} was given handle {:?}", m.base.full_name, other),
            ),
        }
    }

    foreign
}

fn publish(inner: Arc<FileInner>, registries: &Registries) -> BuildOutput {
    let file = FileDescriptor::node(inner.clone());
    let enums: Vec<_> = (0..inner.enums.len()).map(|i| EnumDescriptor::node(inner.clone(), i)).collect();
    let messages: Vec<_> = (0..inner.messages.len())
        .map(|i| MessageDescriptor::node(inner.clone(), i))
        .collect();
    let extensions: Vec<_> = (0..inner.extensions.len())
        .map(|i| FieldDescriptor::extension(inner.clone(), i))
        .collect();
    let services: Vec<_> = (0..inner.services.len())
        .map(|i| ServiceDescriptor::node(inner.clone(), i))
        .collect();

    let mut errors = Vec::new();
    if let Some(files) = &registries.files {
        if let Err(err) = files.register(file.clone()) {
            warn!(file = %inner.path, error = %err, "file registration failed");
            errors.push(err);
        }
    }
    if let Some(types) = &registries.types {
        let declared = enums
            .iter()
            .cloned()
            .map(TypeDescriptor::Enum)
            .chain(messages.iter().cloned().map(TypeDescriptor::Message))
            .chain(extensions.iter().cloned().map(TypeDescriptor::Extension));
        for descriptor in declared {
            if let Err(err) = types.register(descriptor) {
                warn!(file = %inner.path, error = %err, "type registration failed");
                errors.push(err);
            }
        }
    }

    debug!(
        file = %inner.path,
        enums = enums.len(),
        messages = messages.len(),
        extensions = extensions.len(),
        services = services.len(),
        "seeded file"
    );

    BuildOutput { file, enums, messages, extensions, services, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::*;
    use crate::registry::{FileRegistry, TypeRegistry};
    use crate::types::Kind;

    fn tree() -> FileLiteral {
        FileLiteral {
            path: "builder.proto".into(),
            package: "pkg".into(),
            enums: vec![EnumLiteral { name: "E".into(), ..Default::default() }],
            messages: vec![MessageLiteral {
                name: "M".into(),
                fields: vec![FieldLiteral::new("e", 1, Kind::Enum).typed(".pkg.E")],
                messages: vec![MessageLiteral {
                    name: "MapEntry".into(),
                    is_map_entry: true,
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn handles() -> Vec<TypeHandle> {
        vec![
            TypeHandle::declared("pkg::E"),
            TypeHandle::declared("pkg::M"),
            TypeHandle::Vacant,
        ]
    }

    #[test]
    fn wire_build_attaches_handles() {
        let built = Builder::new(tree().encode())
            .with_handles(handles())
            .with_dependency_indexes(vec![0])
            .build();

        assert_eq!(built.enums[0].type_handle(), Some("pkg::E"));
        assert_eq!(built.messages[0].type_handle(), Some("pkg::M"));
        assert_eq!(built.messages[1].type_handle(), None);
        assert!(!built.file.is_initialized());
        assert_eq!(built.messages[0].field(0).unwrap().enum_type(), Some(built.enums[0].clone()));
        assert!(built.file.is_initialized());
    }

    #[test]
    fn registration_does_not_run_the_full_pass() {
        let registries = Registries {
            files: Some(Arc::new(FileRegistry::new())),
            types: Some(Arc::new(TypeRegistry::new())),
            options: None,
        };
        let built = LiteralBuilder::new(tree()).with_registries(registries.clone()).build();
        assert!(built.errors.is_empty());
        assert!(!built.file.is_initialized());

        let types = registries.types.as_ref().unwrap();
        assert_eq!(types.len(), 3);
        assert_eq!(types.find_message("pkg.M.MapEntry"), Some(built.messages[1].clone()));

        let again = LiteralBuilder::new(tree()).with_registries(registries).build();
        assert_eq!(again.errors.len(), 4);
        assert_eq!(again.errors[0], DescriptorError::DuplicateFile { path: "builder.proto".into() });
    }

    #[test]
    #[should_panic(expected = "was given handle")]
    fn map_entries_take_vacant_handles() {
        let mut handles = handles();
        handles[2] = TypeHandle::declared("pkg::MapEntry");
        Builder::new(tree().encode()).with_handles(handles).build();
    }

    #[test]
    #[should_panic(expected = "type handles for 1 enums and 2 messages")]
    fn too_few_handles() {
        Builder::new(tree().encode()).with_handles(handles()[..2].to_vec()).build();
    }
}
