//! The save-file envelope and the decode/edit/encode pipeline built on it.
//!
//! [`envelope`] implements the SHA-1/LZO/WSG-header/Huffman/CRC-32 onion
//! described by the codec's component design; [`pipeline`] is the thin
//! orchestrator a caller actually drives: `decode`, `encode`, `export_items`,
//! `apply_edits`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod envelope;
pub mod pipeline;

pub use envelope::{decode_envelope, encode_envelope};
pub use pipeline::{DecodedSave, Edits, ExportedItem, ItemCategory, apply_edits, decode, encode,
    export_items, get_rich_edits};

/// Commonly used items, for `use bl2save_save::prelude::*;`.
pub mod prelude {
    pub use crate::envelope::{decode_envelope, encode_envelope};
    pub use crate::pipeline::{DecodedSave, Edits, apply_edits, decode, encode, export_items};
}
