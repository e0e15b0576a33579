//! Field numbers of the `google/protobuf/descriptor.proto` messages read
//! by the seed and full parsers and written by the literal encoder.

pub(crate) mod file {
    pub const NAME: u32 = 1;
    pub const PACKAGE: u32 = 2;
    pub const DEPENDENCY: u32 = 3;
    pub const MESSAGE_TYPE: u32 = 4;
    pub const ENUM_TYPE: u32 = 5;
    pub const SERVICE: u32 = 6;
    pub const EXTENSION: u32 = 7;
    pub const OPTIONS: u32 = 8;
    pub const PUBLIC_DEPENDENCY: u32 = 10;
    pub const WEAK_DEPENDENCY: u32 = 11;
    pub const SYNTAX: u32 = 12;
}

pub(crate) mod message {
    pub const NAME: u32 = 1;
    pub const FIELD: u32 = 2;
    pub const NESTED_TYPE: u32 = 3;
    pub const ENUM_TYPE: u32 = 4;
    pub const EXTENSION_RANGE: u32 = 5;
    pub const EXTENSION: u32 = 6;
    pub const OPTIONS: u32 = 7;
    pub const ONEOF_DECL: u32 = 8;
    pub const RESERVED_RANGE: u32 = 9;
    pub const RESERVED_NAME: u32 = 10;
}

pub(crate) mod message_options {
    pub const MESSAGE_SET_WIRE_FORMAT: u32 = 1;
    pub const MAP_ENTRY: u32 = 7;
}

/// Shared by `DescriptorProto.ExtensionRange`, `DescriptorProto.ReservedRange`
/// and `EnumDescriptorProto.EnumReservedRange`.
pub(crate) mod range {
    pub const START: u32 = 1;
    pub const END: u32 = 2;
    pub const OPTIONS: u32 = 3;
}

pub(crate) mod field {
    pub const NAME: u32 = 1;
    pub const EXTENDEE: u32 = 2;
    pub const NUMBER: u32 = 3;
    pub const LABEL: u32 = 4;
    pub const TYPE: u32 = 5;
    pub const TYPE_NAME: u32 = 6;
    pub const DEFAULT_VALUE: u32 = 7;
    pub const OPTIONS: u32 = 8;
    pub const ONEOF_INDEX: u32 = 9;
    pub const JSON_NAME: u32 = 10;
    pub const PROTO3_OPTIONAL: u32 = 17;
}

pub(crate) mod field_options {
    pub const PACKED: u32 = 2;
    pub const WEAK: u32 = 10;
}

pub(crate) mod oneof {
    pub const NAME: u32 = 1;
    pub const OPTIONS: u32 = 2;
}

pub(crate) mod enums {
    pub const NAME: u32 = 1;
    pub const VALUE: u32 = 2;
    pub const OPTIONS: u32 = 3;
    pub const RESERVED_RANGE: u32 = 4;
    pub const RESERVED_NAME: u32 = 5;
}

pub(crate) mod enum_value {
    pub const NAME: u32 = 1;
    pub const NUMBER: u32 = 2;
    pub const OPTIONS: u32 = 3;
}

pub(crate) mod service {
    pub const NAME: u32 = 1;
    pub const METHOD: u32 = 2;
    pub const OPTIONS: u32 = 3;
}

pub(crate) mod method {
    pub const NAME: u32 = 1;
    pub const INPUT_TYPE: u32 = 2;
    pub const OUTPUT_TYPE: u32 = 3;
    pub const OPTIONS: u32 = 4;
    pub const CLIENT_STREAMING: u32 = 5;
    pub const SERVER_STREAMING: u32 = 6;
}
