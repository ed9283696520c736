//! Cross-module round-trip laws for the full envelope, driven only through
//! `bl2save_save`'s public API (mirrors how `bl2save-cli` will call it).

use bl2save_core::endian::Endian;
use bl2save_save::{decode_envelope, encode_envelope};

fn xorshift_next(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed.max(1);
    (0..len).map(|_| (xorshift_next(&mut state) & 0xFF) as u8).collect()
}

#[test]
fn law_envelope_roundtrip_over_random_sizes() {
    for &len in &[0usize, 1, 2, 17, 255, 256, 4096, 100_000] {
        for endian in [Endian::Little, Endian::Big] {
            let player = random_bytes(len as u64 + 1, len);
            let encoded = encode_envelope(&player, endian);
            let (decoded, decoded_endian) = decode_envelope(&encoded).unwrap();
            assert_eq!(decoded, player, "len={len} endian={endian:?}");
            assert_eq!(decoded_endian, endian);
        }
    }
}

#[test]
fn law_determinism_across_independent_runs() {
    let player = random_bytes(777, 8192);
    let a = encode_envelope(&player, Endian::Big);
    let b = encode_envelope(&player, Endian::Big);
    assert_eq!(a, b);
}

#[test]
fn s4_corrupted_sha1_prefix_is_rejected() {
    let player = b"a player worth corrupting";
    let mut encoded = encode_envelope(player, Endian::Little);
    encoded[3] ^= 0x01;
    assert!(decode_envelope(&encoded).is_err());
}
