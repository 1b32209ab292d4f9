use std::fmt;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::error::HashError;
use crate::uri::RefUri;

/// SHA-1 content hash used for content-addressed naming.
///
/// A `ContentHash` is the SHA-1 digest of a value's encoded bytes. Identical
/// encoded content always produces the same hash, which is what makes value
/// references deduplicatable and verifiable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash([u8; 20]);

impl ContentHash {
    /// Compute the hash of raw bytes.
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha1::digest(data);
        Self(digest.into())
    }

    /// Create a hash from a pre-computed digest.
    pub fn from_digest(digest: [u8; 20]) -> Self {
        Self(digest)
    }

    /// The raw 20-byte digest.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hex representation (40 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, HashError> {
        let bytes = hex::decode(s).map_err(|e| HashError::InvalidHex(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(HashError::InvalidLength {
                actual: bytes.len(),
            });
        }
        let mut digest = [0u8; 20];
        digest.copy_from_slice(&bytes);
        Ok(Self(digest))
    }

    /// Whether this digest appears in the URI's normalized text.
    ///
    /// Reference URIs are stored lowercase, so a substring check against the
    /// lowercase hex digest is case-insensitive by construction. Containment
    /// anywhere in the text is accepted, which tolerates placement of the
    /// hash at any position in the final path segment.
    pub fn matches_uri(&self, uri: &RefUri) -> bool {
        uri.as_str().contains(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 20]> for ContentHash {
    fn from(digest: [u8; 20]) -> Self {
        Self(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn of_is_deterministic() {
        let h1 = ContentHash::of(b"hello world");
        let h2 = ContentHash::of(b"hello world");
        assert_eq!(h1, h2);
    }

    #[test]
    fn different_data_produces_different_hashes() {
        assert_ne!(ContentHash::of(b"hello"), ContentHash::of(b"world"));
    }

    #[test]
    fn known_sha1_vector() {
        // sha1("abc") from FIPS 180-1.
        let h = ContentHash::of(b"abc");
        assert_eq!(h.to_hex(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn hex_roundtrip() {
        let h = ContentHash::of(b"roundtrip");
        let parsed = ContentHash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(matches!(
            ContentHash::from_hex("not hex"),
            Err(HashError::InvalidHex(_))
        ));
        assert!(matches!(
            ContentHash::from_hex("abcd"),
            Err(HashError::InvalidLength { actual: 2 })
        ));
    }

    #[test]
    fn short_hex_is_prefix() {
        let h = ContentHash::of(b"prefix");
        assert!(h.to_hex().starts_with(&h.short_hex()));
        assert_eq!(h.short_hex().len(), 8);
    }

    #[test]
    fn matches_uri_substring() {
        let h = ContentHash::of(b"payload");
        let uri = RefUri::parse(&format!("value:mem://bucket/{}.json", h.to_hex())).unwrap();
        assert!(h.matches_uri(&uri));
        assert!(!ContentHash::of(b"other").matches_uri(&uri));
    }
}
