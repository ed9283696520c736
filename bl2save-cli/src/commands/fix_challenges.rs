//! `fix-challenges` command implementation.

use std::collections::HashMap;
use std::path::Path;

use bl2save_item::challenge::{ChallengeMeta, OVERFLOW_THRESHOLD, fix_challenge_overflow, unwrap_challenges, wrap_challenges};
use bl2save_protobuf::wire::WireValue;

use crate::utils::prepare_output_file;

/// Field holding the challenge progress block.
const CHALLENGE_FIELD: u32 = 15;

/// Run the challenge-overflow repair pass alone, reproducing
/// `--fix-challenge-overflow` from the original source.
///
/// The real challenge id -> max-value dictionary is domain data this codec
/// does not carry (it is the "external collaborator" schema the core
/// component design leaves to a caller); with no metadata supplied, this
/// repairs nothing but still reports which ids look overflowed so the
/// operator knows what a metadata-aware caller would fix.
pub fn cmd_fix_challenges(input: &Path, output: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    prepare_output_file(input, output, force)?;

    let bytes = std::fs::read(input)?;
    let mut decoded = bl2save_save::decode(&bytes)?;

    let Some(challenge_bytes) = decoded.message.first(CHALLENGE_FIELD).and_then(WireValue::as_bytes) else {
        println!("No challenge block present in this save");
        std::fs::write(output, &bytes)?;
        return Ok(());
    };

    let meta: HashMap<u16, ChallengeMeta> = HashMap::new();
    let mut block = unwrap_challenges(challenge_bytes, &meta, decoded.endian)?;

    let overflowing: Vec<u16> = block
        .records
        .iter()
        .filter(|r| r.total_value >= OVERFLOW_THRESHOLD)
        .map(|r| r.id)
        .collect();
    if overflowing.is_empty() {
        println!("No overflowed challenge values found");
    } else {
        println!("Overflowed challenge ids: {overflowing:?} (no metadata supplied, left unrepaired)");
    }

    fix_challenge_overflow(&mut block.records, &meta);
    let rewritten = wrap_challenges(&block, decoded.endian);
    decoded.message.set_single(CHALLENGE_FIELD, WireValue::LengthDelimited(rewritten));

    let encoded = bl2save_save::encode(&decoded.message, decoded.endian);
    std::fs::write(output, &encoded)?;
    Ok(())
}
