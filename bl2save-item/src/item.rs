//! Item/weapon obfuscation: XOR+rotate body cipher, bit-packed field list,
//! header-field (library, asset) splitting, and the black-market SDU blob.

use bl2save_core::error::{CodecError, Result};
use bl2save_protobuf::wire::{read_repeated_protobuf_value, write_repeated_protobuf_value};

use crate::title::TitleSpec;

/// One item or weapon's decoded field list, before header-splitting.
///
/// Index 0 is `set`; 1..=3 are the packed header fields (type, balance,
/// manufacturer); 4 and 5 are `(grade_index, game_stage)`; the rest are parts.
/// A `None` entry means the field was absent from the packed data (the list
/// was shorter than the title's full field count).
pub type ItemValues = Vec<Option<u32>>;

/// `set == 255` marks a pseudo-item (currency/flag storage, not real gear).
pub const PSEUDO_ITEM_SET: u32 = 255;

fn xor_bytes(data: &[u8], key_byte: u8) -> Vec<u8> {
    data.iter().map(|b| b ^ key_byte).collect()
}

fn get_bit(data: &[u8], index: usize) -> u8 {
    (data[index / 8] >> (7 - (index % 8))) & 1
}

fn set_bit(data: &mut [u8], index: usize, bit: u8) {
    if bit != 0 {
        data[index / 8] |= 1 << (7 - (index % 8));
    }
}

/// Rotate `data`'s bits right by `amount`, treating the whole byte slice as
/// one big-endian bit string (bit 0 is the MSB of the first byte).
fn rotate_bits_right(data: &[u8], amount: u32) -> Vec<u8> {
    let total_bits = data.len() * 8;
    if total_bits == 0 {
        return Vec::new();
    }
    let amount = (amount as usize) % total_bits;
    if amount == 0 {
        return data.to_vec();
    }
    let mut out = vec![0u8; data.len()];
    for dst_bit in 0..total_bits {
        let src_bit = (dst_bit + total_bits - amount) % total_bits;
        set_bit(&mut out, dst_bit, get_bit(data, src_bit));
    }
    out
}

/// Inverse of [`rotate_bits_right`].
fn rotate_bits_left(data: &[u8], amount: u32) -> Vec<u8> {
    let total_bits = data.len() * 8;
    if total_bits == 0 {
        return Vec::new();
    }
    let amount = (amount as usize) % total_bits;
    rotate_bits_right(data, (total_bits - amount) as u32)
}

/// XOR fold of `data` into a 16-bit checksum, two bytes at a time, big-endian,
/// zero-padding a trailing odd byte.
fn fold16(data: &[u8]) -> u16 {
    let mut acc: u16 = 0;
    for chunk in data.chunks(2) {
        let word = if chunk.len() == 2 {
            u16::from_be_bytes([chunk[0], chunk[1]])
        } else {
            u16::from_be_bytes([chunk[0], 0])
        };
        acc ^= word;
    }
    acc
}

/// Pack `values` into the bit-packed field list per `sizes` (`title.item_sizes[is_weapon]`).
///
/// Stops at the first `None`. Little-endian-within-byte bit packing, starting
/// at bit 0; pads the final partial byte's high bits with ones.
pub fn pack_item_values(sizes: &[u32; 17], values: &[Option<u32>]) -> Vec<u8> {
    let mut item_bytes = [0u8; 32];
    let mut i: usize = 0;
    for (value, &size) in values.iter().zip(sizes.iter()) {
        let value = match value {
            Some(v) => *v,
            None => break,
        };
        let size = size as usize;
        let mut j = i >> 3;
        let mut shifted = (value as u64) << (i & 7);
        while shifted != 0 {
            item_bytes[j] |= (shifted & 0xFF) as u8;
            shifted >>= 8;
            j += 1;
        }
        i += size;
    }
    if i & 7 != 0 {
        let pad = (0xFFu32 << (i & 7)) & 0xFF;
        item_bytes[i >> 3] |= pad as u8;
    }
    item_bytes[..((i + 7) >> 3)].to_vec()
}

/// Inverse of [`pack_item_values`]: unpack as many fields as `data` has room for.
///
/// A field with fewer than `size` bits remaining, and every field after it,
/// decodes as `None`.
pub fn unpack_item_values(sizes: &[u32; 17], data: &[u8]) -> ItemValues {
    let mut padded = Vec::with_capacity(data.len() + 1);
    padded.push(b' ');
    padded.extend_from_slice(data);
    let end = padded.len() * 8;

    let mut i: usize = 8;
    let mut result = Vec::with_capacity(sizes.len());
    for &size in sizes.iter() {
        let size = size as usize;
        let j = i + size;
        if j > end {
            result.push(None);
            continue;
        }
        let mut value: u64 = 0;
        for k in (i >> 3..=j >> 3).rev() {
            value = (value << 8) | padded[k] as u64;
        }
        let shifted = value >> (i & 7);
        let mask = !(0xFFu64 << size);
        result.push(Some((shifted & mask) as u32));
        i = j;
    }
    result
}

/// Obfuscate a packed item body: prepend its fold16 checksum, rotate left by
/// `key & 31` bits, XOR with `(key >> 5) & 0xFF`. Inverse of the body half of
/// [`unwrap_item`].
fn create_body(item: &[u8], key: i32) -> Vec<u8> {
    let checksum = fold16(item);
    let mut payload = Vec::with_capacity(2 + item.len());
    payload.extend_from_slice(&checksum.to_be_bytes());
    payload.extend_from_slice(item);
    let rotated = rotate_bits_left(&payload, (key & 31) as u32);
    xor_bytes(&rotated, ((key >> 5) & 0xFF) as u8)
}

/// Pack `values` and wrap them into a wire-ready item blob under `key`.
pub fn wrap_item(title: &TitleSpec, is_weapon: u8, values: &[Option<u32>], key: i32) -> Vec<u8> {
    let item = pack_item_values(&title.item_sizes[is_weapon as usize], values);
    let mut out = Vec::with_capacity(5 + 2 + item.len());
    out.push((is_weapon << 7) | title.item_struct_version);
    out.extend_from_slice(&key.to_be_bytes());
    out.extend_from_slice(&create_body(&item, key));
    out
}

/// Inverse of [`wrap_item`]: recover `(is_weapon, values, key)` from a raw item blob.
pub fn unwrap_item(title: &TitleSpec, data: &[u8]) -> Result<(u8, ItemValues, i32)> {
    if data.len() < 5 {
        return Err(CodecError::invalid_item("item blob shorter than its 5-byte header"));
    }
    let version_type = data[0];
    let key = i32::from_be_bytes([data[1], data[2], data[3], data[4]]);
    let is_weapon = version_type >> 7;

    let xored = xor_bytes(&data[5..], ((key >> 5) & 0xFF) as u8);
    let raw = rotate_bits_right(&xored, (key & 31) as u32);
    if raw.len() < 2 {
        return Err(CodecError::invalid_item("item body shorter than its 2-byte checksum"));
    }
    let values = unpack_item_values(&title.item_sizes[is_weapon as usize], &raw[2..]);
    Ok((is_weapon, values, key))
}

/// A human-structured view of an item's header and part fields.
#[derive(Debug, Clone)]
pub struct StructuredItem {
    /// 0 for items, 1 for weapons.
    pub is_weapon: u8,
    /// The item's obfuscation key.
    pub key: i32,
    /// `255` marks a pseudo-item; see [`PSEUDO_ITEM_SET`].
    pub set: u32,
    /// `(library, asset)` for the item type.
    pub item_type: (u32, u32),
    /// `(library, asset)` for the balance.
    pub balance: (u32, u32),
    /// `(library, asset)` for the manufacturer.
    pub manufacturer: (u32, u32),
    /// `(grade_index, game_stage)`.
    pub level: (u32, u32),
    /// Part fields, `None` where absent.
    pub parts: Vec<Option<(u32, u32)>>,
}

impl StructuredItem {
    /// True if this is a pseudo-item: `set == 255` and every other field is
    /// zero (or absent, for parts). Preserved verbatim but excluded from
    /// item-export listings.
    pub fn is_pseudo(&self) -> bool {
        self.set == PSEUDO_ITEM_SET
            && self.item_type == (0, 0)
            && self.balance == (0, 0)
            && self.manufacturer == (0, 0)
            && self.level == (0, 0)
            && self.parts.iter().all(|p| matches!(p, None | Some((0, 0))))
    }
}

fn split_header(x: u32, bits: u32) -> (u32, u32) {
    let lib = x >> bits;
    (lib, x & !(lib << bits))
}

fn join_header((lib, asset): (u32, u32), bits: u32) -> u32 {
    (lib << bits) | asset
}

/// Decode a raw item blob into its structured header/level/parts view.
pub fn unwrap_item_info(title: &TitleSpec, data: &[u8]) -> Result<StructuredItem> {
    let (is_weapon, item, key) = unwrap_item(title, data)?;
    let missing = || CodecError::invalid_item("unwrap_item_info got a missing field it required");

    let set = item[0].ok_or_else(missing)?;
    let level = (item[4].ok_or_else(missing)?, item[5].ok_or_else(missing)?);

    let headers = &title.item_header_sizes[is_weapon as usize];
    let mut split_fields = [(0u32, 0u32); 3];
    for (i, &(_, bits)) in headers.iter().enumerate() {
        let x = item[1 + i].ok_or_else(missing)?;
        split_fields[i] = split_header(x, bits);
    }

    let bits = title.part_bits(is_weapon);
    let parts = item[6..]
        .iter()
        .map(|x| x.map(|v| split_header(v, bits)))
        .collect();

    Ok(StructuredItem {
        is_weapon,
        key,
        set,
        item_type: split_fields[0],
        balance: split_fields[1],
        manufacturer: split_fields[2],
        level,
        parts,
    })
}

/// Inverse of [`unwrap_item_info`].
pub fn wrap_item_info(title: &TitleSpec, value: &StructuredItem) -> Vec<u8> {
    let headers = &title.item_header_sizes[value.is_weapon as usize];
    let mut values = Vec::with_capacity(6 + value.parts.len());
    values.push(Some(value.set));
    values.push(Some(join_header(value.item_type, headers[0].1)));
    values.push(Some(join_header(value.balance, headers[1].1)));
    values.push(Some(join_header(value.manufacturer, headers[2].1)));
    values.push(Some(value.level.0));
    values.push(Some(value.level.1));

    let bits = title.part_bits(value.is_weapon);
    for part in &value.parts {
        values.push(part.map(|p| join_header(p, bits)));
    }

    wrap_item(title, value.is_weapon, &values, value.key)
}

/// Decode a black-market SDU blob (a packed-repeated varint field) into its
/// named map, per `title.black_market_keys`.
pub fn unwrap_black_market(title: &TitleSpec, value: &[u8]) -> Result<Vec<(String, u64)>> {
    let sdu_list = read_repeated_protobuf_value(value, 0)?;
    Ok(title
        .black_market_keys
        .iter()
        .zip(sdu_list)
        .map(|(k, v)| (k.to_string(), v))
        .collect())
}

/// Inverse of [`unwrap_black_market`].
pub fn wrap_black_market(title: &TitleSpec, value: &[(String, u64)]) -> Vec<u8> {
    let sdu_list: Vec<u64> = title
        .black_market_keys
        .iter()
        .take(value.len())
        .map(|k| value.iter().find(|(n, _)| n == k).map(|(_, v)| *v).unwrap_or(0))
        .collect();
    write_repeated_protobuf_value(&sdu_list, 0)
}
