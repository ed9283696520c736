//! The linear decode → edit → encode orchestrator, plus the item-export and
//! edit-application passes built on top of it.

use base64::Engine as _;
use bl2save_core::endian::Endian;
use bl2save_core::error::{CodecError, Result};
use bl2save_item::challenge::{ChallengeMeta, fix_challenge_overflow, unwrap_challenges, wrap_challenges};
use bl2save_item::item::{unwrap_item, wrap_item};
use bl2save_item::title::TitleSpec;
use bl2save_protobuf::wire::{Message, WireValue, read_protobuf, read_repeated_protobuf_value,
    write_protobuf, write_repeated_protobuf_value};
use std::collections::HashMap;

use crate::envelope::{decode_envelope, encode_envelope};

/// Currency values (money, eridium, seraph crystals, torgue tokens, ...) live
/// as a packed-repeated varint field nested inside field 6's first occurrence.
const CURRENCY_FIELD: u32 = 6;
/// Index of money/eridium/seraph/torgue within the currency list.
const MONEY_INDEX: usize = 0;
const ERIDIUM_INDEX: usize = 1;
const SERAPH_INDEX: usize = 2;
const TORGUE_INDEX: usize = 4;

/// The challenge progress block.
const CHALLENGE_FIELD: u32 = 15;
/// Unlock-flag fields; each is a byte string containing `0x01` once unlocked.
const UNLOCK_FIELDS: [u32; 2] = [23, 24];

/// The three item-container fields the item codec operates on.
pub const ITEM_FIELDS: [(u32, ItemCategory); 3] = [
    (41, ItemCategory::Bank),
    (53, ItemCategory::Items),
    (54, ItemCategory::Weapons),
];

/// Which container an exported item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCategory {
    /// Field 41.
    Bank,
    /// Field 53.
    Items,
    /// Field 54.
    Weapons,
}

/// A decoded player message plus the envelope's header endianness, so a
/// re-encode can reproduce it without the caller having to track it separately.
#[derive(Debug, Clone)]
pub struct DecodedSave {
    /// The parsed player protobuf message.
    pub message: Message,
    /// Endianness declared by the envelope header this save was decoded with.
    pub endian: Endian,
}

/// Envelope-decode and protobuf-parse a full save file.
pub fn decode(bytes: &[u8]) -> Result<DecodedSave> {
    let (player, endian) = decode_envelope(bytes)?;
    let message = read_protobuf(&player)?;
    Ok(DecodedSave { message, endian })
}

/// Inverse of [`decode`]: protobuf-serialize and envelope-encode.
pub fn encode(message: &Message, endian: Endian) -> Vec<u8> {
    let player = write_protobuf(message);
    encode_envelope(&player, endian)
}

/// One item pulled out of an item-container field and re-wrapped for export.
#[derive(Debug, Clone)]
pub struct ExportedItem {
    /// Which container it came from.
    pub category: ItemCategory,
    /// `<PREFIX>(<base64>)`, with the item's key forced to zero.
    pub code: String,
}

fn container_bytes(message: &Message, field: u32) -> Vec<&[u8]> {
    message
        .get(field)
        .map(|occurrences| occurrences.iter().filter_map(WireValue::as_bytes).collect())
        .unwrap_or_default()
}

/// Walk fields 41/53/54, unwrap each raw item, re-pack it with `key = 0`, and
/// base64-encode it as `<prefix>(<base64>)`. Pseudo-items (`set == 255` and
/// every other field zero/absent) are skipped and counted rather than
/// exported.
pub fn export_items(message: &Message, title: &TitleSpec, prefix: &str) -> Result<(Vec<ExportedItem>, usize)> {
    let mut exported = Vec::new();
    let mut pseudo_count = 0usize;

    for (field, category) in ITEM_FIELDS {
        for raw in container_bytes(message, field) {
            let (is_weapon, values, _key) = unwrap_item(title, raw)?;
            let is_pseudo = values.first().copied().flatten() == Some(bl2save_item::item::PSEUDO_ITEM_SET)
                && values[1..].iter().all(|v| matches!(v, None | Some(0)));
            if is_pseudo {
                pseudo_count += 1;
                continue;
            }
            let rewrapped = wrap_item(title, is_weapon, &values, 0);
            let code = format!(
                "{prefix}({})",
                base64::engine::general_purpose::STANDARD.encode(&rewrapped)
            );
            exported.push(ExportedItem { category, code });
        }
    }

    Ok((exported, pseudo_count))
}

/// The edits `apply_edits` knows how to make; every field is additive — a
/// `None` (or `false`) leaves that piece of state untouched.
#[derive(Debug, Clone, Default)]
pub struct Edits {
    /// New money total.
    pub money: Option<u64>,
    /// New eridium total.
    pub eridium: Option<u64>,
    /// New seraph crystal total.
    pub seraph: Option<u64>,
    /// New torgue token total.
    pub torgue: Option<u64>,
    /// Unlock the named fields (23 and/or 24) by writing a `0x01` byte string.
    pub unlock: Vec<u32>,
    /// Run the challenge-overflow repair pass.
    pub fix_challenge_overflow: bool,
}

fn currency_list(message: &Message) -> Result<Vec<u64>> {
    let bytes = message
        .first(CURRENCY_FIELD)
        .and_then(WireValue::as_bytes)
        .ok_or_else(|| CodecError::invalid_item("missing currency field"))?;
    read_repeated_protobuf_value(bytes, 0)
}

fn set_currency_list(message: &mut Message, values: Vec<u64>) {
    let bytes = write_repeated_protobuf_value(&values, 0);
    message.set_single(CURRENCY_FIELD, WireValue::LengthDelimited(bytes));
}

/// Mutate `message` per `edits`: currency fields, unlock flags, and challenge
/// overflow repair. Applying the same `edits` twice is idempotent.
pub fn apply_edits(
    message: &mut Message,
    edits: &Edits,
    challenge_meta: &HashMap<u16, ChallengeMeta>,
    endian: Endian,
) -> Result<()> {
    if edits.money.is_some() || edits.eridium.is_some() || edits.seraph.is_some() || edits.torgue.is_some() {
        let mut values = currency_list(message)?;
        if let Some(v) = edits.money {
            values[MONEY_INDEX] = v;
        }
        if let Some(v) = edits.eridium {
            values[ERIDIUM_INDEX] = v;
        }
        if let Some(v) = edits.seraph {
            values[SERAPH_INDEX] = v;
        }
        if let Some(v) = edits.torgue {
            values[TORGUE_INDEX] = v;
        }
        set_currency_list(message, values);
    }

    for &field in &edits.unlock {
        if UNLOCK_FIELDS.contains(&field) {
            message.set_single(field, WireValue::LengthDelimited(vec![0x01]));
        }
    }

    if edits.fix_challenge_overflow {
        if let Some(bytes) = message.first(CHALLENGE_FIELD).and_then(WireValue::as_bytes) {
            let mut block = unwrap_challenges(bytes, challenge_meta, endian)?;
            fix_challenge_overflow(&mut block.records, challenge_meta);
            let rewritten = wrap_challenges(&block, endian);
            message.set_single(CHALLENGE_FIELD, WireValue::LengthDelimited(rewritten));
        }
    }

    Ok(())
}

/// `_get_rich`: set money to 99,999,999, eridium to 500, seraph crystals to
/// 999, torgue tokens to 999. A worked example of [`apply_edits`].
pub fn get_rich_edits() -> Edits {
    Edits {
        money: Some(99_999_999),
        eridium: Some(500),
        seraph: Some(999),
        torgue: Some(999),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl2save_item::title::TitleSpec;

    fn minimal_currency_message(values: &[u64]) -> Message {
        let mut message = Message::new();
        let bytes = write_repeated_protobuf_value(values, 0);
        message.push(CURRENCY_FIELD, WireValue::LengthDelimited(bytes));
        message
    }

    #[test]
    fn test_s1_currency_roundtrip_and_get_rich() {
        let mut message = minimal_currency_message(&[1000, 0, 0, 0, 0]);
        let before = currency_list(&message).unwrap();
        assert_eq!(before, vec![1000, 0, 0, 0, 0]);

        let meta = HashMap::new();
        apply_edits(&mut message, &get_rich_edits(), &meta, Endian::Big).unwrap();

        let after = currency_list(&message).unwrap();
        assert_eq!(after, vec![99_999_999, 500, 999, 0, 999]);
    }

    #[test]
    fn test_apply_edits_idempotent() {
        let mut message = minimal_currency_message(&[1000, 0, 0, 0, 0]);
        let meta = HashMap::new();
        let edits = get_rich_edits();

        apply_edits(&mut message, &edits, &meta, Endian::Big).unwrap();
        let once = write_protobuf(&message);
        apply_edits(&mut message, &edits, &meta, Endian::Big).unwrap();
        let twice = write_protobuf(&message);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unlock_flags() {
        let mut message = Message::new();
        let meta = HashMap::new();
        let edits = Edits {
            unlock: vec![23, 24],
            ..Default::default()
        };
        apply_edits(&mut message, &edits, &meta, Endian::Big).unwrap();
        assert_eq!(message.first(23).and_then(WireValue::as_bytes), Some(&[0x01][..]));
        assert_eq!(message.first(24).and_then(WireValue::as_bytes), Some(&[0x01][..]));
    }

    #[test]
    fn test_decode_encode_roundtrip() {
        let mut message = minimal_currency_message(&[42, 1, 2, 3, 4]);
        message.push(99, WireValue::Varint(7));
        let bytes = encode(&message, Endian::Little);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.endian, Endian::Little);
        assert_eq!(decoded.message, message);
    }

    #[test]
    fn test_s6_export_items_skips_pseudo_items() {
        let title = TitleSpec::borderlands2();
        let real_a = wrap_item(&title, 0, &[Some(1), Some(1), Some(1), Some(1), Some(1), Some(1)], 11);
        let real_b = wrap_item(&title, 1, &[Some(2), Some(1), Some(1), Some(1), Some(1), Some(1)], 22);
        let pseudo = wrap_item(&title, 0, &[Some(255), Some(0), Some(0), Some(0), Some(0), Some(0)], 0);

        let mut message = Message::new();
        message.push(53, WireValue::LengthDelimited(real_a.clone()));
        message.push(53, WireValue::LengthDelimited(pseudo));
        message.push(54, WireValue::LengthDelimited(real_b.clone()));

        let (exported, pseudo_count) = export_items(&message, &title, "BL2").unwrap();
        assert_eq!(exported.len(), 2);
        assert_eq!(pseudo_count, 1);

        for item in &exported {
            assert!(item.code.starts_with("BL2("));
            assert!(item.code.ends_with(')'));
            let b64 = &item.code[4..item.code.len() - 1];
            let decoded = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();
            let (_, fields, key) = unwrap_item(&title, &decoded).unwrap();
            assert_eq!(key, 0);
            assert!(fields[0].is_some());
        }
    }
}
