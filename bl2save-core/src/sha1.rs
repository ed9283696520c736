//! SHA-1 envelope hash: a thin wrapper over the `sha1` crate matching the save
//! envelope's prefix-hash convention (spec §4.G: the first 20 bytes of the file are
//! the SHA-1 digest of everything after them).

use sha1::{Digest, Sha1};

/// Compute the 20-byte SHA-1 digest of `data`.
pub fn digest(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Check whether `expected` matches the digest of `data`.
pub fn verify(expected: &[u8], data: &[u8]) -> bool {
    expected.len() == 20 && expected == digest(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_known_vector() {
        // SHA-1("abc")
        let d = digest(b"abc");
        assert_eq!(
            d,
            [
                0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78,
                0x50, 0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d,
            ]
        );
    }

    #[test]
    fn test_verify_roundtrip() {
        let data = b"borderlands 2 save payload";
        let d = digest(data);
        assert!(verify(&d, data));
        assert!(!verify(&d, b"tampered payload"));
    }

    #[test]
    fn test_verify_rejects_wrong_length() {
        assert!(!verify(&[0u8; 19], b"anything"));
    }
}
