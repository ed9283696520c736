//! Command implementations for the bl2save CLI.

pub mod decode;
pub mod encode;
pub mod export_items;
pub mod fix_challenges;
pub mod get_rich;

pub use decode::cmd_decode;
pub use encode::cmd_encode;
pub use export_items::cmd_export_items;
pub use fix_challenges::cmd_fix_challenges;
pub use get_rich::cmd_get_rich;
