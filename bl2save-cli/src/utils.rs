//! Shared output-file handling, mirroring the original source's
//! `_prepare_output_file` / `Config.finish` checks.

use std::path::Path;

use dialoguer::Confirm;

/// Refuse to read and write the same file, and refuse to silently overwrite
/// an existing output file unless `force` is set or the user confirms.
pub fn prepare_output_file(
    input: &Path,
    output: &Path,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if let (Ok(a), Ok(b)) = (input.canonicalize(), output.canonicalize()) {
        if a == b {
            return Err("input and output cannot be the same file".into());
        }
    }

    if output.exists() && !force {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists, overwrite?", output.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            return Err("not overwriting existing output file".into());
        }
    }

    Ok(())
}
