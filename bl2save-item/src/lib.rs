//! Item/weapon body cipher, bit-packed field list, black-market blob, and the
//! challenge-progress sub-codec, parameterized by a per-title [`title::TitleSpec`]
//! rather than subclassed per game.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod challenge;
pub mod item;
pub mod title;

pub use challenge::{ChallengeBlock, ChallengeMeta, ChallengeRecord, fix_challenge_overflow,
    unwrap_challenges, wrap_challenges};
pub use item::{ItemValues, PSEUDO_ITEM_SET, StructuredItem, pack_item_values, unpack_item_values,
    unwrap_black_market, unwrap_item, unwrap_item_info, wrap_black_market, wrap_item, wrap_item_info};
pub use title::TitleSpec;

/// Commonly used items, for `use bl2save_item::prelude::*;`.
pub mod prelude {
    pub use crate::challenge::{ChallengeBlock, ChallengeMeta, ChallengeRecord,
        fix_challenge_overflow, unwrap_challenges, wrap_challenges};
    pub use crate::item::{StructuredItem, unwrap_item, unwrap_item_info, wrap_item, wrap_item_info};
    pub use crate::title::TitleSpec;
}
