//! The outer save-file envelope: SHA-1 integrity prefix, LZO1X framing, the
//! 15-byte `WSG` header, and the Huffman-coded player payload underneath it.
//!
//! The header's first three fields (`outer_size`, the `"WSG"` magic, and
//! `version`) are always parsed/written big-endian regardless of the
//! configured [`Endian`], matching a quirk in the original source's
//! `unwrap_player_data`/`wrap_player_data` (see Design Notes: "hardcoded
//! endian suspicion"). Only `crc` and `inner_size` follow the configured
//! endianness.

use bl2save_core::bitstream::{ReadBitstream, WriteBitstream};
use bl2save_core::crc::Crc32;
use bl2save_core::endian::Endian;
use bl2save_core::error::{CodecError, Layer, Result};
use bl2save_core::sha1;
use bl2save_huffman as huffman;
use bl2save_lzo as lzo;

const WSG_MAGIC: [u8; 3] = *b"WSG";
/// The on-disk version word is always `2` packed in the *configured* endian,
/// then always read back big-endian. So `config.endian = '<'` (the PC
/// default) writes bytes `02 00 00 00`, which read big-endian as `0x02000000`
/// — and `config.endian = '>'` writes `00 00 00 02`, read big-endian as `2`.
/// The version word and the crc/inner_size endianness are therefore inverted
/// from what they look like at first glance.
const VERSION_WORD_WHEN_LITTLE: u32 = 0x0200_0000;
const VERSION_WORD_WHEN_BIG: u32 = 2;

/// Header fields read from (and written into) a save's 15-byte WSG header.
#[derive(Debug, Clone, Copy)]
struct Header {
    endian: Endian,
    crc: u32,
    inner_size: u32,
}

fn version_for(endian: Endian) -> u32 {
    match endian {
        Endian::Little => VERSION_WORD_WHEN_LITTLE,
        Endian::Big => VERSION_WORD_WHEN_BIG,
    }
}

fn endian_for_version(version: u32) -> Result<Endian> {
    match version {
        VERSION_WORD_WHEN_LITTLE => Ok(Endian::Little),
        VERSION_WORD_WHEN_BIG => Ok(Endian::Big),
        other => Err(CodecError::UnknownVersion(other)),
    }
}

/// Decode a full save file into the raw player protobuf bytes.
///
/// 1. Split and verify the 20-byte SHA-1 prefix.
/// 2. LZO1X-decompress the remainder (with the `0xF0` literal-run marker
///    the compressor always emits prepended back on by the LZO layer itself).
/// 3. Parse the 15-byte WSG header and pick the configured endianness from
///    `version`.
/// 4. Huffman-decode exactly `inner_size` bytes from the rest of the header region.
/// 5. Verify the player payload's CRC-32 against the header's `crc`.
///
/// Returns the player bytes together with the endianness the header declared,
/// so a caller that re-encodes can reproduce it (`encode_envelope` takes it
/// back as an explicit argument rather than remembering it anywhere).
pub fn decode_envelope(data: &[u8]) -> Result<(Vec<u8>, Endian)> {
    if data.len() < 20 {
        return Err(CodecError::BadSha1);
    }
    let (prefix, rest) = data.split_at(20);
    if !sha1::verify(prefix, rest) {
        return Err(CodecError::BadSha1);
    }

    let mut framed = Vec::with_capacity(rest.len() + 1);
    framed.push(0xF0);
    framed.extend_from_slice(rest);
    let decompressed = lzo::decompress(&framed)?;
    if decompressed.len() < 15 {
        return Err(CodecError::truncated(Layer::Lzo));
    }

    let outer_size = u32::from_be_bytes(decompressed[0..4].try_into().unwrap());
    let magic: [u8; 3] = decompressed[4..7].try_into().unwrap();
    if magic != WSG_MAGIC {
        return Err(CodecError::truncated(Layer::Lzo));
    }
    let version = u32::from_be_bytes(decompressed[7..11].try_into().unwrap());
    let endian = endian_for_version(version)?;
    let _ = outer_size;

    let crc = endian.read_u32(decompressed[11..15].try_into().unwrap());
    let inner_size = endian.read_u32(decompressed[15..19].try_into().unwrap());
    let header = Header { endian, crc, inner_size };

    let mut reader = ReadBitstream::new(&decompressed[19..]);
    let tree = huffman::read_tree(&mut reader)?;
    let player = huffman::decompress(&tree, &mut reader, header.inner_size as usize)?;

    let computed = Crc32::compute(&player);
    if computed != header.crc {
        return Err(CodecError::BadCrc {
            expected: header.crc,
            computed,
        });
    }

    Ok((player, endian))
}

/// Inverse of [`decode_envelope`].
///
/// 1. Compute the player payload's CRC-32.
/// 2. Huffman-encode the payload behind its serialized tree; append four
///    trailing zero bytes (Design Note: "four zero bytes" trailer, preserved
///    verbatim though its in-game meaning is undocumented).
/// 3. Build the 15-byte WSG header around it, using the configured endianness
///    for the version/crc/inner_size fields.
/// 4. LZO1X-1 compress `header || huffman_bytes`, then drop its leading byte
///    (the literal-run marker the decoder re-adds on the read path).
/// 5. Prepend the SHA-1 of the LZO output.
pub fn encode_envelope(player: &[u8], endian: Endian) -> Vec<u8> {
    let crc = Crc32::compute(player);

    let mut writer = WriteBitstream::new();
    let tree = huffman::build_tree(player);
    huffman::write_tree(&tree, &mut writer);
    huffman::compress(&tree, player, &mut writer).expect("tree built from this exact payload covers every byte");
    let mut huffman_bytes = writer.getvalue();
    huffman_bytes.extend_from_slice(&[0, 0, 0, 0]);

    let mut header = Vec::with_capacity(15);
    header.extend_from_slice(&((huffman_bytes.len() + 15) as u32).to_be_bytes());
    header.extend_from_slice(&WSG_MAGIC);
    header.extend_from_slice(&version_for(endian).to_be_bytes());
    header.extend_from_slice(&endian.write_u32(crc));
    header.extend_from_slice(&endian.write_u32(player.len() as u32));

    let mut plain = header;
    plain.extend_from_slice(&huffman_bytes);

    let (_, compressed) = lzo::compress(&plain);
    let trimmed = &compressed[1..];

    let mut out = Vec::with_capacity(20 + trimmed.len());
    out.extend_from_slice(&sha1::digest(trimmed));
    out.extend_from_slice(trimmed);
    out
}
