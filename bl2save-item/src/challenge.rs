//! The challenge block: a small self-delimited list of progress records,
//! endian-matched to the envelope, with overflow repair for the known
//! sign-flip save corruption.

use std::collections::HashMap;

use bl2save_core::endian::Endian;
use bl2save_core::error::{CodecError, Layer, Result};

/// A saved value near 2^31 is a sign-flip artifact, not a real progress total.
pub const OVERFLOW_THRESHOLD: u32 = 2_000_000_000;

/// One challenge's declared metadata (name and maximum legitimate value).
#[derive(Debug, Clone)]
pub struct ChallengeMeta {
    /// Human-readable challenge name.
    pub name: String,
    /// The maximum value this challenge can legitimately reach.
    pub max: u32,
}

/// One challenge progress record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRecord {
    /// Identifies the challenge; not positional.
    pub id: u16,
    /// Current progress value.
    pub total_value: u32,
    /// Progress value as of the last save.
    pub previous_value: u32,
    /// Looked up from caller-supplied metadata on decode; dropped on encode.
    pub name: Option<String>,
}

/// The full challenge block: a dictionary slice of known ids plus the record list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeBlock {
    /// The block's leading `u16`-counted id list.
    pub dictionary_ids: Vec<u16>,
    /// The challenge records, in on-disk order.
    pub records: Vec<ChallengeRecord>,
}

fn read_u16(data: &[u8], pos: &mut usize, endian: Endian) -> Result<u16> {
    let bytes = data
        .get(*pos..*pos + 2)
        .ok_or_else(|| CodecError::truncated(Layer::Challenge))?;
    *pos += 2;
    Ok(endian.read_u16([bytes[0], bytes[1]]))
}

fn read_u32(data: &[u8], pos: &mut usize, endian: Endian) -> Result<u32> {
    let bytes = data
        .get(*pos..*pos + 4)
        .ok_or_else(|| CodecError::truncated(Layer::Challenge))?;
    *pos += 4;
    Ok(endian.read_u32([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Parse a challenge block, augmenting each record with its name from `names`.
pub fn unwrap_challenges(
    data: &[u8],
    names: &HashMap<u16, ChallengeMeta>,
    endian: Endian,
) -> Result<ChallengeBlock> {
    let mut pos = 0usize;
    let dict_count = read_u16(data, &mut pos, endian)? as usize;
    let mut dictionary_ids = Vec::with_capacity(dict_count);
    for _ in 0..dict_count {
        dictionary_ids.push(read_u16(data, &mut pos, endian)?);
    }

    let record_count = read_u16(data, &mut pos, endian)? as usize;
    let mut records = Vec::with_capacity(record_count);
    for _ in 0..record_count {
        let id = read_u16(data, &mut pos, endian)?;
        let total_value = read_u32(data, &mut pos, endian)?;
        let previous_value = read_u32(data, &mut pos, endian)?;
        let name = names.get(&id).map(|m| m.name.clone());
        records.push(ChallengeRecord {
            id,
            total_value,
            previous_value,
            name,
        });
    }

    Ok(ChallengeBlock {
        dictionary_ids,
        records,
    })
}

/// Inverse of [`unwrap_challenges`]; drops each record's `name`.
pub fn wrap_challenges(block: &ChallengeBlock, endian: Endian) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&endian.write_u16(block.dictionary_ids.len() as u16));
    for &id in &block.dictionary_ids {
        out.extend_from_slice(&endian.write_u16(id));
    }

    out.extend_from_slice(&endian.write_u16(block.records.len() as u16));
    for record in &block.records {
        out.extend_from_slice(&endian.write_u16(record.id));
        out.extend_from_slice(&endian.write_u32(record.total_value));
        out.extend_from_slice(&endian.write_u32(record.previous_value));
    }
    out
}

/// Replace any record whose `total_value` looks like an overflow sign-flip
/// (`>= OVERFLOW_THRESHOLD`) with `challenge.max + 1`, per the caller-supplied
/// metadata. Records with no matching metadata, or below the threshold, are
/// left unchanged. Idempotent: running this twice is the same as running it once.
pub fn fix_challenge_overflow(records: &mut [ChallengeRecord], meta: &HashMap<u16, ChallengeMeta>) {
    for record in records.iter_mut() {
        if record.total_value >= OVERFLOW_THRESHOLD {
            if let Some(m) = meta.get(&record.id) {
                record.total_value = m.max + 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> ChallengeBlock {
        ChallengeBlock {
            dictionary_ids: vec![1, 2, 3],
            records: vec![
                ChallengeRecord {
                    id: 1,
                    total_value: 100,
                    previous_value: 90,
                    name: None,
                },
                ChallengeRecord {
                    id: 2,
                    total_value: 5,
                    previous_value: 5,
                    name: None,
                },
            ],
        }
    }

    #[test]
    fn test_wrap_unwrap_roundtrip_both_endians() {
        for endian in [Endian::Little, Endian::Big] {
            let block = sample_block();
            let bytes = wrap_challenges(&block, endian);
            let names = HashMap::new();
            let parsed = unwrap_challenges(&bytes, &names, endian).unwrap();
            assert_eq!(parsed.dictionary_ids, block.dictionary_ids);
            assert_eq!(parsed.records.len(), block.records.len());
            for (a, b) in parsed.records.iter().zip(block.records.iter()) {
                assert_eq!(a.id, b.id);
                assert_eq!(a.total_value, b.total_value);
                assert_eq!(a.previous_value, b.previous_value);
            }
        }
    }

    #[test]
    fn test_name_lookup_on_decode() {
        let block = sample_block();
        let bytes = wrap_challenges(&block, Endian::Big);
        let mut names = HashMap::new();
        names.insert(1, ChallengeMeta { name: "Kill stuff".to_string(), max: 1000 });
        let parsed = unwrap_challenges(&bytes, &names, Endian::Big).unwrap();
        assert_eq!(parsed.records[0].name.as_deref(), Some("Kill stuff"));
        assert_eq!(parsed.records[1].name, None);
    }

    #[test]
    fn test_s3_overflow_repair_scenario() {
        let mut records = vec![
            ChallengeRecord { id: 1, total_value: 2_100_000_000, previous_value: 0, name: None },
            ChallengeRecord { id: 2, total_value: 5, previous_value: 0, name: None },
            ChallengeRecord { id: 3, total_value: 2_000_000_000, previous_value: 0, name: None },
        ];
        let mut meta = HashMap::new();
        meta.insert(1, ChallengeMeta { name: "a".to_string(), max: 1000 });
        meta.insert(3, ChallengeMeta { name: "c".to_string(), max: 2000 });

        fix_challenge_overflow(&mut records, &meta);

        assert_eq!(records[0].total_value, 1001);
        assert_eq!(records[1].total_value, 5);
        assert_eq!(records[2].total_value, 2001);
    }

    #[test]
    fn test_overflow_repair_idempotent() {
        let mut records = vec![ChallengeRecord {
            id: 1,
            total_value: 2_500_000_000,
            previous_value: 0,
            name: None,
        }];
        let mut meta = HashMap::new();
        meta.insert(1, ChallengeMeta { name: "a".to_string(), max: 1000 });

        fix_challenge_overflow(&mut records, &meta);
        let once = records.clone();
        fix_challenge_overflow(&mut records, &meta);
        assert_eq!(records, once);
    }
}
