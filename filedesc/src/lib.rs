//! protodesc-filedesc
//!
//! This crate implements:
//!  1) Seed construction of a file's declarations from an encoded file
//!     descriptor (`Builder`) or a literal tree (`LiteralBuilder`),
//!  2) A deferred full pass, run once per file on first access,
//!  3) Binding of field types, extendees and method types through a flat
//!     dependency index list or by scoped name resolution,
//!  4) Placeholders for references that cannot be bound,
//!  5) File and type registries, and on-demand options decoding,
//!  6) Re-encoding of built files (`to_literal`, `to_wire`).

pub mod error;
pub mod types;
pub mod utils;
pub mod literal;
pub mod options;
pub mod registry;
pub mod builder;
pub mod encode;
pub mod traits;

mod arena;
mod decode;
mod defval;
mod deps;
mod enums;
mod field;
mod fieldnum;
mod file;
mod full;
mod lookup;
mod message;
mod resolve;
mod seed;
mod service;
mod walk;


pub use builder::{BuildOutput, Builder, LiteralBuilder, TypeHandle};
pub use defval::{DefaultValue, SharedBytes};
pub use encode::{to_literal, to_wire, WireFile};
pub use enums::{EnumDescriptor, EnumValueDescriptor};
pub use error::DescriptorError;
pub use field::FieldDescriptor;
pub use file::{FileDescriptor, FileImport};
pub use literal::*;
pub use message::{MessageDescriptor, OneofDescriptor};
pub use options::{DecodedOptions, OptionsPrototype, OptionsRegistry, RawOptions};
pub use registry::{global_files, global_options, global_types, FileRegistry, Registries, TypeDescriptor, TypeRegistry};
pub use service::{MethodDescriptor, ServiceDescriptor};
pub use traits::Descriptor;
pub use types::{Cardinality, DeclKind, Kind, Syntax};
pub use utils::json_camel_case;
