//! Encode command implementation.

use std::path::Path;

use bl2save_core::endian::Endian;

use crate::utils::prepare_output_file;

/// Wrap raw protobuf bytes back into a full save file.
pub fn cmd_encode(
    input: &Path,
    output: &Path,
    big_endian: bool,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    prepare_output_file(input, output, force)?;

    let player = std::fs::read(input)?;
    let endian = if big_endian { Endian::Big } else { Endian::Little };
    let encoded = bl2save_save::encode_envelope(&player, endian);
    std::fs::write(output, &encoded)?;

    println!(
        "Encoded {} ({} bytes, {:?}-endian) -> {}",
        input.display(),
        encoded.len(),
        endian,
        output.display()
    );
    Ok(())
}
