//! Protobuf wire-format codec and schema-driven structure conversion.
//!
//! [`wire`] implements just enough of the protobuf wire format (varint,
//! fixed32, fixed64, length-delimited) to parse and re-serialize a
//! [`wire::Message`] without a `.proto` file. [`structure`] layers a
//! caller-supplied [`structure::Schema`] on top, converting a `Message` to
//! and from a [`serde_json::Value`] tree for the fields the schema names,
//! while passing unrecognized fields through unchanged.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod structure;
pub mod wire;

pub use structure::{FieldKind, FieldSpec, Schema, apply_structure, remove_structure};
pub use wire::{Message, WireValue, read_protobuf, read_repeated_protobuf_value, write_protobuf,
    write_repeated_protobuf_value};

/// Commonly used items, for `use bl2save_protobuf::prelude::*;`.
pub mod prelude {
    pub use crate::structure::{FieldKind, FieldSpec, Schema, apply_structure, remove_structure};
    pub use crate::wire::{Message, WireValue, read_protobuf, write_protobuf};
}
