//! # bl2save-core
//!
//! Foundational primitives shared by every layer of the Borderlands 2 save codec:
//!
//! - [`bitstream`]: MSB-first bit-level I/O over owned buffers (Huffman tree
//!   serialization, LZO framing).
//! - [`crc`]: CRC-32, used by the envelope's integrity header.
//! - [`sha1`]: the envelope's outer SHA-1 prefix hash.
//! - [`endian`]: the single configurable byte-order flag shared by the envelope and
//!   challenge codecs.
//! - [`error`]: the crate-wide [`error::CodecError`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ bl2save-cli                                              │
//! │     decode / encode / get-rich / export-items / ...      │
//! ├─────────────────────────────────────────────────────────┤
//! │ bl2save-save                                              │
//! │     envelope, save pipeline                               │
//! ├─────────────────────────────────────────────────────────┤
//! │ bl2save-item          bl2save-protobuf                    │
//! │     item + challenge + TitleSpec   wire format, Message  │
//! ├─────────────────────────────────────────────────────────┤
//! │ bl2save-huffman       bl2save-lzo                          │
//! │     tree codec            LZO1X codec                     │
//! ├─────────────────────────────────────────────────────────┤
//! │ bl2save-core (this crate)                                 │
//! │     bitstream, crc, sha1, endian, error                   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use bl2save_core::bitstream::{ReadBitstream, WriteBitstream};
//! use bl2save_core::crc::Crc32;
//!
//! let mut writer = WriteBitstream::new();
//! writer.write_bits(0xAB, 8);
//! let bytes = writer.getvalue();
//! let mut reader = ReadBitstream::new(&bytes);
//! assert_eq!(reader.read_bits(8).unwrap(), 0xAB);
//!
//! assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitstream;
pub mod crc;
pub mod endian;
pub mod error;
pub mod sha1;

pub use bitstream::{ReadBitstream, WriteBitstream};
pub use crc::Crc32;
pub use endian::Endian;
pub use error::{CodecError, Layer, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{ReadBitstream, WriteBitstream};
    pub use crate::crc::Crc32;
    pub use crate::endian::Endian;
    pub use crate::error::{CodecError, Layer, Result};
}
