//! protodesc
//!
//! Runtime entry point for building and querying protocol buffer descriptors.
//!
//! - Builders and descriptor handles (re-exported from filedesc)
//! - Helpers for loading literal schema trees from JSON and publishing
//!   them into the process-wide registries

use thiserror::Error;

pub use protodesc_filedesc::{
    to_literal, to_wire, BuildOutput, Builder, Descriptor, DescriptorError, EnumDescriptor, EnumValueDescriptor,
    FieldDescriptor, FileDescriptor, FileLiteral, LiteralBuilder, MessageDescriptor, MethodDescriptor,
    OneofDescriptor, Registries, ServiceDescriptor, TypeDescriptor, TypeHandle, WireFile,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("invalid literal: {0}")]
    Literal(#[from] serde_json::Error),
}

/// Parse a literal schema tree from its JSON form.
pub fn load_literal_json(json: &str) -> Result<FileLiteral, Error> {
    Ok(serde_json::from_str(json)?)
}

/// Render a built file back into the JSON form of its literal tree.
pub fn describe_to_json(file: &FileDescriptor) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(&to_literal(file))?)
}

/// Build a literal tree against the global registries and publish it.
///
/// The file is built even when publishing fails; the first registration
/// error is returned in that case.
pub fn register_literal(tree: FileLiteral) -> Result<BuildOutput, Error> {
    let mut built = LiteralBuilder::new(tree).with_registries(Registries::global()).build();
    let first = built.errors.drain(..).next();
    match first {
        Some(err) => Err(err.into()),
        None => Ok(built),
    }
}

/// Build an encoded file descriptor against the global registries and
/// publish it.
pub fn register_wire(wire: WireFile) -> Result<BuildOutput, Error> {
    let mut built = Builder::new(wire.raw)
        .with_handles(wire.handles)
        .with_dependency_indexes(wire.dependency_indexes)
        .with_registries(Registries::global())
        .build();
    let first = built.errors.drain(..).next();
    match first {
        Some(err) => Err(err.into()),
        None => Ok(built),
    }
}

pub mod literal {
    pub use protodesc_filedesc::literal::*;
}

pub mod types {
    pub use protodesc_filedesc::types::{Cardinality, DeclKind, Kind, Syntax};
}

pub mod registry {
    pub use protodesc_filedesc::registry::{
        global_files, global_options, global_types, FileRegistry, Registries, TypeDescriptor, TypeRegistry,
    };
}

pub mod options {
    pub use protodesc_filedesc::options::{DecodedOptions, OptionsPrototype, OptionsRegistry, RawOptions};
}

pub mod wire {
    pub use protodesc_wire::*;
}
