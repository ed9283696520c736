//! Frequency-weighted Huffman codec used for the save envelope's player payload.
//!
//! Tree construction repeatedly combines the two lowest-frequency subtrees; ties
//! are broken by insertion order so that two runs over the same bytes build the
//! identical tree (a hard requirement — see the envelope's determinism rule).
//! The tree is serialized into the bitstream by a pre-order traversal: `1` before
//! each leaf followed by its byte, `0` before each internal node. Decompression
//! is length-bounded (the caller supplies the expected output length) rather than
//! terminator-based.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use bl2save_core::bitstream::{ReadBitstream, WriteBitstream};
use bl2save_core::error::{CodecError, Layer, Result};

/// A Huffman tree: leaves carry one byte, internal nodes carry two children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tree {
    /// A leaf node holding a single byte value.
    Leaf(u8),
    /// An internal node with a left and right child.
    Internal(Box<Tree>, Box<Tree>),
}

struct HeapEntry {
    freq: u64,
    order: u32,
    tree: Tree,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.freq == other.freq && self.order == other.order
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.freq, self.order).cmp(&(other.freq, other.order))
    }
}

/// Build a frequency-weighted Huffman tree over `data`.
///
/// Byte frequencies are counted in one pass; leaves are seeded into the
/// combining queue in ascending byte-value order so that ties are broken
/// deterministically, then combined two-at-a-time (lowest frequency first,
/// ties broken by insertion order) until one tree remains.
///
/// A single-byte alphabet is wrapped in a synthetic internal node (two leaves
/// of the same byte) so every byte still gets a non-empty code.
pub fn build_tree(data: &[u8]) -> Tree {
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }

    let mut heap: BinaryHeap<Reverse<HeapEntry>> = BinaryHeap::new();
    let mut order: u32 = 0;
    for (byte, &count) in counts.iter().enumerate() {
        if count > 0 {
            heap.push(Reverse(HeapEntry {
                freq: count,
                order,
                tree: Tree::Leaf(byte as u8),
            }));
            order += 1;
        }
    }

    if heap.is_empty() {
        // Defensive fallback for an empty payload; not exercised by the
        // round-trip law (which requires non-empty input) but keeps the
        // function total.
        return Tree::Internal(Box::new(Tree::Leaf(0)), Box::new(Tree::Leaf(0)));
    }

    if heap.len() == 1 {
        let Reverse(only) = heap.into_iter().next().unwrap();
        let byte = match only.tree {
            Tree::Leaf(b) => b,
            Tree::Internal(..) => unreachable!(),
        };
        return Tree::Internal(Box::new(Tree::Leaf(byte)), Box::new(Tree::Leaf(byte)));
    }

    while heap.len() > 1 {
        let Reverse(a) = heap.pop().unwrap();
        let Reverse(b) = heap.pop().unwrap();
        let combined = HeapEntry {
            freq: a.freq + b.freq,
            order,
            tree: Tree::Internal(Box::new(a.tree), Box::new(b.tree)),
        };
        order += 1;
        heap.push(Reverse(combined));
    }

    heap.pop().unwrap().0.tree
}

/// Serialize `tree` into `writer` via pre-order traversal.
pub fn write_tree(tree: &Tree, writer: &mut WriteBitstream) {
    match tree {
        Tree::Leaf(byte) => {
            writer.write_bit(1);
            writer.write_bits(*byte as u64, 8);
        }
        Tree::Internal(left, right) => {
            writer.write_bit(0);
            write_tree(left, writer);
            write_tree(right, writer);
        }
    }
}

/// Parse a tree previously written by [`write_tree`].
pub fn read_tree(reader: &mut ReadBitstream) -> Result<Tree> {
    let tag = reader.read_bit()?;
    if tag == 1 {
        let byte = reader.read_bits(8)? as u8;
        Ok(Tree::Leaf(byte))
    } else {
        let left = read_tree(reader)?;
        let right = read_tree(reader)?;
        Ok(Tree::Internal(Box::new(left), Box::new(right)))
    }
}

fn collect_codes(tree: &Tree, prefix: &mut Vec<u8>, table: &mut [Option<(u64, u32)>; 256]) {
    match tree {
        Tree::Leaf(byte) => {
            let mut code = 0u64;
            for &bit in prefix.iter() {
                code = (code << 1) | bit as u64;
            }
            table[*byte as usize] = Some((code, prefix.len() as u32));
        }
        Tree::Internal(left, right) => {
            prefix.push(0);
            collect_codes(left, prefix, table);
            prefix.pop();
            prefix.push(1);
            collect_codes(right, prefix, table);
            prefix.pop();
        }
    }
}

/// Encode `data` against `tree`, writing MSB-first codes into `writer`.
///
/// Fails if `data` contains a byte with no code in `tree` (the tree does not
/// cover the alphabet actually present).
pub fn compress(tree: &Tree, data: &[u8], writer: &mut WriteBitstream) -> Result<()> {
    let mut table: [Option<(u64, u32)>; 256] = [None; 256];
    let mut prefix = Vec::new();
    collect_codes(tree, &mut prefix, &mut table);

    for &byte in data {
        let (code, len) = table[byte as usize]
            .ok_or_else(|| CodecError::invalid_item("byte missing from huffman tree"))?;
        writer.write_bits(code, len);
    }
    Ok(())
}

/// Decode exactly `expected_len` bytes from `reader`, walking `tree` one bit at
/// a time from the root and restarting at each leaf.
pub fn decompress(tree: &Tree, reader: &mut ReadBitstream, expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);

    // Degenerate tree: single repeated leaf with no internal node at all — every
    // byte decodes to the same value with zero bits consumed.
    if let Tree::Leaf(byte) = tree {
        out.resize(expected_len, *byte);
        return Ok(out);
    }

    while out.len() < expected_len {
        let mut node = tree;
        loop {
            match node {
                Tree::Leaf(byte) => {
                    out.push(*byte);
                    break;
                }
                Tree::Internal(left, right) => {
                    let bit = reader.read_bit()?;
                    node = if bit == 0 { left } else { right };
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &[u8]) {
        let tree = build_tree(data);
        let mut writer = WriteBitstream::new();
        write_tree(&tree, &mut writer);
        compress(&tree, data, &mut writer).unwrap();
        let bytes = writer.getvalue();

        let mut reader = ReadBitstream::new(&bytes);
        let parsed_tree = read_tree(&mut reader).unwrap();
        assert_eq!(parsed_tree, tree);
        let decoded = decompress(&parsed_tree, &mut reader, data.len()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_roundtrip_mixed_alphabet() {
        roundtrip(b"the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn test_roundtrip_single_byte_alphabet() {
        roundtrip(&[0x42; 50]);
    }

    #[test]
    fn test_roundtrip_two_byte_alphabet() {
        let data: Vec<u8> = (0..200).map(|i| if i % 3 == 0 { 0xAA } else { 0x55 }).collect();
        roundtrip(&data);
    }

    #[test]
    fn test_roundtrip_skewed_distribution() {
        let mut data = vec![b'a'; 900];
        data.extend(vec![b'b'; 50]);
        data.extend(vec![b'c'; 10]);
        data.push(b'd');
        roundtrip(&data);
    }

    #[test]
    fn test_roundtrip_full_byte_range() {
        let data: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
        roundtrip(&data);
    }

    #[test]
    fn test_tree_construction_is_deterministic() {
        let data = b"abracadabra";
        let tree1 = build_tree(data);
        let tree2 = build_tree(data);
        assert_eq!(tree1, tree2);
    }

    #[test]
    fn test_decompress_fails_on_truncated_stream() {
        let data = b"abcabcabcabc";
        let tree = build_tree(data);
        let mut writer = WriteBitstream::new();
        write_tree(&tree, &mut writer);
        compress(&tree, data, &mut writer).unwrap();
        let mut bytes = writer.getvalue();
        bytes.truncate(bytes.len().saturating_sub(2));

        let mut reader = ReadBitstream::new(&bytes);
        let parsed_tree = read_tree(&mut reader).unwrap();
        assert!(decompress(&parsed_tree, &mut reader, data.len() + 500).is_err());
    }
}
