//! `export-items` command implementation.

use std::path::Path;

use bl2save_item::title::TitleSpec;

/// Print each non-pseudo item/weapon in the save as `BL2(<base64>)`.
pub fn cmd_export_items(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(input)?;
    let decoded = bl2save_save::decode(&bytes)?;
    let title = TitleSpec::borderlands2();

    let (items, pseudo_count) = bl2save_save::export_items(&decoded.message, &title, "BL2")?;
    for item in &items {
        println!("{:?}: {}", item.category, item.code);
    }

    println!("{} items exported, {} pseudo-items skipped", items.len(), pseudo_count);
    Ok(())
}
