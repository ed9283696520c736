//! Decode command implementation.

use std::path::Path;

use crate::utils::prepare_output_file;

/// Envelope-decode a save file and write the raw protobuf bytes.
pub fn cmd_decode(input: &Path, output: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    prepare_output_file(input, output, force)?;

    let bytes = std::fs::read(input)?;
    let (player, endian) = bl2save_save::decode_envelope(&bytes)?;
    std::fs::write(output, &player)?;

    println!(
        "Decoded {} ({} bytes of player data, {:?}-endian header) -> {}",
        input.display(),
        player.len(),
        endian,
        output.display()
    );
    Ok(())
}
