//! Integration coverage for the full decode → edit → encode pipeline, driven
//! through `bl2save_save`'s public API the way `bl2save-cli` will drive it.

use std::collections::HashMap;

use bl2save_core::endian::Endian;
use bl2save_item::challenge::{ChallengeBlock, ChallengeMeta, ChallengeRecord};
use bl2save_item::item::{PSEUDO_ITEM_SET, wrap_item};
use bl2save_item::title::TitleSpec;
use bl2save_protobuf::wire::{Message, WireValue, write_repeated_protobuf_value};
use bl2save_save::pipeline::ItemCategory;
use bl2save_save::{Edits, apply_edits, decode, encode, export_items, get_rich_edits};

/// Mirrors the private `CHALLENGE_FIELD` constant in `pipeline.rs`.
const CHALLENGE_FIELD: u32 = 15;

fn sample_message() -> Message {
    let mut message = Message::new();
    message.push(6, WireValue::LengthDelimited(write_repeated_protobuf_value(&[10, 0, 0, 0, 0], 0)));
    message.push(1, WireValue::Varint(42));
    message
}

#[test]
fn s2_full_pipeline_get_rich_roundtrip() {
    let message = sample_message();
    let bytes = encode(&message, Endian::Big);
    let mut decoded = decode(&bytes).unwrap();

    let meta = HashMap::new();
    apply_edits(&mut decoded.message, &get_rich_edits(), &meta, decoded.endian).unwrap();

    let reencoded = encode(&decoded.message, decoded.endian);
    let redecoded = decode(&reencoded).unwrap();

    let currency = redecoded
        .message
        .first(6)
        .and_then(WireValue::as_bytes)
        .unwrap();
    let values: Vec<u64> = bl2save_protobuf::wire::read_repeated_protobuf_value(currency, 0).unwrap();
    assert_eq!(values, vec![99_999_999, 500, 999, 0, 999]);
}

#[test]
fn s3_full_pipeline_fixes_challenge_overflow() {
    let mut meta = HashMap::new();
    meta.insert(1, ChallengeMeta { name: "a".into(), max: 1000 });
    meta.insert(2, ChallengeMeta { name: "b".into(), max: 2000 });
    meta.insert(3, ChallengeMeta { name: "c".into(), max: 2000 });

    let block = ChallengeBlock {
        dictionary_ids: vec![1, 2, 3],
        records: vec![
            ChallengeRecord { id: 1, total_value: 2_100_000_000, previous_value: 0, name: None },
            ChallengeRecord { id: 2, total_value: 5, previous_value: 0, name: None },
            ChallengeRecord { id: 3, total_value: 2_000_000_000, previous_value: 0, name: None },
        ],
    };
    let wrapped = bl2save_item::challenge::wrap_challenges(&block, Endian::Big);

    let mut message = sample_message();
    message.push(CHALLENGE_FIELD, WireValue::LengthDelimited(wrapped));

    let bytes = encode(&message, Endian::Big);
    let mut decoded = decode(&bytes).unwrap();

    let edits = Edits { fix_challenge_overflow: true, ..Default::default() };
    apply_edits(&mut decoded.message, &edits, &meta, decoded.endian).unwrap();

    let challenge_bytes = decoded.message.first(CHALLENGE_FIELD).and_then(WireValue::as_bytes).unwrap();
    let fixed = bl2save_item::challenge::unwrap_challenges(challenge_bytes, &meta, decoded.endian).unwrap();
    assert_eq!(fixed.records[0].total_value, 1001);
    assert_eq!(fixed.records[1].total_value, 5);
    assert_eq!(fixed.records[2].total_value, 2001);
}

#[test]
fn full_pipeline_export_items_from_decoded_save() {
    let title = TitleSpec::borderlands2();
    let real = wrap_item(&title, 0, &[Some(3), Some(1), Some(1), Some(1), Some(1), Some(1)], 99);
    let pseudo = wrap_item(&title, 1, &[Some(PSEUDO_ITEM_SET), Some(0), Some(0), Some(0), Some(0), Some(0)], 0);

    let mut message = sample_message();
    message.push(53, WireValue::LengthDelimited(real));
    message.push(54, WireValue::LengthDelimited(pseudo));

    let bytes = encode(&message, Endian::Little);
    let decoded = decode(&bytes).unwrap();

    let (exported, pseudo_count) = export_items(&decoded.message, &title, "BL2").unwrap();
    assert_eq!(exported.len(), 1);
    assert_eq!(pseudo_count, 1);
    assert_eq!(exported[0].category, ItemCategory::Items);
}
