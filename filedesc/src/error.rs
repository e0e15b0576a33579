use thiserror::Error;

/// Recoverable failures surfaced to callers.
///
/// Structural problems with the input (malformed wire data, arity
/// mismatches between the schema and the supplied handle or dependency
/// lists) are not represented here: they abort construction with a panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("file {path:?} is already registered")]
    DuplicateFile { path: String },

    #[error("{kind} {name:?} is already registered")]
    DuplicateType { kind: &'static str, name: String },
}
