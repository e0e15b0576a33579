//! Helper routines for reading and writing the protocol buffer wire format,
//! scoped to what is needed to walk encoded file descriptors. See
//! [https://protobuf.dev/programming-guides/encoding/](https://protobuf.dev/programming-guides/encoding/)
//! for documentation about the format.
//!
//! ```
//! use protodesc_wire::*;
//!
//! // message Foo { string name = 1; int32 number = 3; }
//! let mut bb = ByteBufferMut::new();
//! bb.write_string_field(1, "foo");
//! bb.write_int32_field(3, 7);
//! let bytes = bb.data();
//!
//! let fields: Vec<_> = FieldIter::new(&bytes).map(Result::unwrap).collect();
//! assert_eq!(fields[0], (0, 1, FieldValue::Bytes(b"foo")));
//! assert_eq!(fields[1], (5, 3, FieldValue::Varint(7)));
//!
//! let message = RawMessage::decode(&bytes).unwrap();
//! assert_eq!(format!("{:?}", message), "{1: \"foo\", 3: 7}");
//! ```

pub mod bb;
pub mod value;

pub use bb::*;
pub use value::*;
