//! Error types for the Borderlands 2 save codec stack.

use std::io;
use thiserror::Error;

/// Which layer of the codec stack detected a truncated stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// The MSB-first bitstream reader.
    Bitstream,
    /// The Huffman decompressor.
    Huffman,
    /// The LZO1X decompressor.
    Lzo,
    /// The protobuf wire-format reader.
    Protobuf,
    /// The challenge block reader.
    Challenge,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Layer::Bitstream => "bitstream",
            Layer::Huffman => "huffman",
            Layer::Lzo => "lzo",
            Layer::Protobuf => "protobuf",
            Layer::Challenge => "challenge",
        };
        f.write_str(name)
    }
}

/// The single error type for every layer of the save codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Envelope SHA-1 prefix did not match the hash of the remaining bytes.
    #[error("save file failed SHA-1 integrity check")]
    BadSha1,

    /// Envelope header carried a version word outside `{2, 0x02000000}`.
    #[error("unknown save version {0:#010x}")]
    UnknownVersion(u32),

    /// CRC-32 of the Huffman-decoded player payload did not match the header.
    #[error("CRC-32 mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    BadCrc {
        /// CRC recorded in the envelope header.
        expected: u32,
        /// CRC recomputed over the decoded payload.
        computed: u32,
    },

    /// A reader ran past the end of its input.
    #[error("truncated {layer} stream")]
    TruncatedStream {
        /// The layer that detected the truncation.
        layer: Layer,
    },

    /// A protobuf field carried a wire-type tag this codec does not understand.
    #[error("invalid protobuf wire type {wire_type} on field {field}")]
    InvalidProtobufWireType {
        /// The unrecognized wire-type tag.
        wire_type: u64,
        /// The field number it was attached to.
        field: u32,
    },

    /// Unwrapping an item produced field widths that don't fit the title's tables.
    #[error("malformed item record: {0}")]
    InvalidItem(String),

    /// `apply_structure`/`remove_structure` found a field that didn't match the schema.
    #[error("schema mismatch on field {field}: expected {expected}, found {found}")]
    SchemaMismatch {
        /// Field number where the mismatch occurred.
        field: u32,
        /// What the schema expected at that field.
        expected: String,
        /// What was actually present.
        found: String,
    },

    /// I/O error surfaced by the demonstration CLI's file handling.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias used throughout the codec stack.
pub type Result<T> = std::result::Result<T, CodecError>;

impl CodecError {
    /// Build a [`CodecError::TruncatedStream`] for the given layer.
    pub fn truncated(layer: Layer) -> Self {
        Self::TruncatedStream { layer }
    }

    /// Build a [`CodecError::InvalidItem`] with a formatted message.
    pub fn invalid_item(message: impl Into<String>) -> Self {
        Self::InvalidItem(message.into())
    }

    /// Build a [`CodecError::SchemaMismatch`].
    pub fn schema_mismatch(
        field: u32,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::SchemaMismatch {
            field,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::BadCrc {
            expected: 0x1234,
            computed: 0x5678,
        };
        assert!(err.to_string().contains("CRC-32 mismatch"));

        let err = CodecError::truncated(Layer::Huffman);
        assert!(err.to_string().contains("huffman"));
    }

    #[test]
    fn test_unknown_version_display() {
        let err = CodecError::UnknownVersion(3);
        assert_eq!(err.to_string(), "unknown save version 0x00000003");
    }
}
