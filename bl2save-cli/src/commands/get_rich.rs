//! `get-rich` command implementation.

use std::collections::HashMap;
use std::path::Path;

use bl2save_core::endian::Endian;
use bl2save_save::{apply_edits, get_rich_edits};

use crate::utils::prepare_output_file;

/// Reproduce `_get_rich`: set money/eridium/seraph/torgue to their max values.
///
/// The save's own header endianness is detected and preserved for the
/// re-encode unless `--big-endian` forces it, matching `--bigendian`'s role
/// in the original source (writing a save for the other platform family).
pub fn cmd_get_rich(
    input: &Path,
    output: &Path,
    big_endian: bool,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    prepare_output_file(input, output, force)?;

    let bytes = std::fs::read(input)?;
    let mut decoded = bl2save_save::decode(&bytes)?;
    let endian = if big_endian { Endian::Big } else { decoded.endian };

    let meta = HashMap::new();
    apply_edits(&mut decoded.message, &get_rich_edits(), &meta, endian)?;

    let encoded = bl2save_save::encode(&decoded.message, endian);
    std::fs::write(output, &encoded)?;

    println!("Set money/eridium/seraph crystals/torgue tokens to max -> {}", output.display());
    Ok(())
}
