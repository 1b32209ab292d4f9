//! Reference URI parsing, normalization and classification.
//!
//! A reference URI has the shape `<kind>:<inner-uri>` where `<kind>` is one
//! of `value`, `volatile`, `atomic`, or it is a bare `<inner-uri>` denoting a
//! read-only reference. The inner URI carries a scheme selecting a storage
//! backend and a path whose last segment ends in a dotted format suffix
//! selecting codecs.
//!
//! URIs are stored in lowercase normalized form. Re-parsing the string form
//! of a parsed URI always yields an equal URI.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{UriError, UriResult};

/// The kind of a durable reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefKind {
    /// Immutable, content-addressed, cached, interned.
    Value,
    /// Mutable without concurrency coordination.
    Volatile,
    /// Mutable with compare-and-swap support.
    Atomic,
    /// Bare inner URI with read-only semantics.
    ReadOnly,
}

impl RefKind {
    /// The kind prefix as it appears in a reference URI.
    ///
    /// `ReadOnly` has no prefix; its URI is the bare inner URI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Volatile => "volatile",
            Self::Atomic => "atomic",
            Self::ReadOnly => "read-only",
        }
    }

    /// Parse a kind prefix token. `ReadOnly` is never spelled out.
    fn from_prefix(s: &str) -> Option<Self> {
        match s {
            "value" => Some(Self::Value),
            "volatile" => Some(Self::Volatile),
            "atomic" => Some(Self::Atomic),
            _ => None,
        }
    }

    /// Returns `true` if references of this kind reject mutation.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Value | Self::ReadOnly)
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The inner URI of a reference: the transport-level address obtained by
/// stripping the kind prefix.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InnerUri {
    text: String,
    scheme: String,
}

impl InnerUri {
    /// Parse a normalized (lowercase) inner URI.
    fn parse(text: &str) -> UriResult<Self> {
        let (scheme, rest) = text.split_once(':').ok_or_else(|| UriError::Malformed {
            uri: text.to_string(),
            reason: "missing scheme".into(),
        })?;
        if !is_scheme(scheme) {
            return Err(UriError::Malformed {
                uri: text.to_string(),
                reason: format!("invalid scheme: {scheme:?}"),
            });
        }
        if rest.is_empty() {
            return Err(UriError::Malformed {
                uri: text.to_string(),
                reason: "empty scheme-specific part".into(),
            });
        }
        Ok(Self {
            text: text.to_string(),
            scheme: scheme.to_string(),
        })
    }

    /// The full normalized inner URI text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The scheme component (e.g. `mem`, `file`, `s3`).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The last path segment, with any query or fragment stripped.
    ///
    /// Returns `None` when the URI has no non-empty trailing segment.
    pub fn last_segment(&self) -> Option<&str> {
        let after_scheme = &self.text[self.scheme.len() + 1..];
        let path = after_scheme
            .split(['?', '#'])
            .next()
            .unwrap_or(after_scheme);
        let segment = path.rsplit('/').next().unwrap_or(path);
        if segment.is_empty() {
            None
        } else {
            Some(segment)
        }
    }

    /// Candidate format suffixes of the last path segment, longest first.
    ///
    /// For a segment `a.b.c` the candidates are `b.c` and `c`: every
    /// dot-separated tail except the leading name component. An empty list
    /// means the segment carries no format suffix.
    pub fn format_candidates(&self) -> Vec<&str> {
        let Some(segment) = self.last_segment() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut rest = segment;
        while let Some((_, tail)) = rest.split_once('.') {
            if !tail.is_empty() {
                out.push(tail);
            }
            rest = tail;
        }
        out
    }
}

impl fmt::Display for InnerUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A parsed, normalized reference URI.
///
/// Carries the full URI text, the classified kind, and the inner URI. Two
/// reference URIs are equal iff their normalized text is equal, which folds
/// in the kind.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RefUri {
    text: String,
    kind: RefKind,
    inner: InnerUri,
}

impl RefUri {
    /// Parse and normalize a reference URI.
    ///
    /// Input is lowercased; the original case is not preserved. A leading
    /// `value:`, `volatile:` or `atomic:` token selects the kind; any other
    /// token in kind position is rejected as [`UriError::UnknownKind`]. A
    /// bare inner URI classifies as [`RefKind::ReadOnly`].
    ///
    /// For `value:` URIs the first dotted component of the last path segment
    /// must be a 40-digit lowercase hex SHA-1 (content-addressed naming).
    pub fn parse(input: &str) -> UriResult<Self> {
        let text = input.trim().to_ascii_lowercase();
        if text.is_empty() {
            return Err(UriError::Empty);
        }

        let Some((head, rest)) = text.split_once(':') else {
            return Err(UriError::Malformed {
                uri: text.clone(),
                reason: "missing scheme".into(),
            });
        };

        if let Some(kind) = RefKind::from_prefix(head) {
            let inner = InnerUri::parse(rest)?;
            let uri = Self {
                text: text.clone(),
                kind,
                inner,
            };
            if kind == RefKind::Value {
                uri.require_content_hash()?;
            }
            return Ok(uri);
        }

        // Not a known kind. If what follows carries its own scheme, the head
        // token sits in kind position and is unknown; otherwise the whole
        // input is a bare inner URI.
        if has_scheme(rest) {
            return Err(UriError::UnknownKind {
                kind: head.to_string(),
            });
        }
        let inner = InnerUri::parse(&text)?;
        Ok(Self {
            text,
            kind: RefKind::ReadOnly,
            inner,
        })
    }

    fn require_content_hash(&self) -> UriResult<()> {
        let segment = self
            .inner
            .last_segment()
            .ok_or_else(|| UriError::MissingContentHash {
                uri: self.text.clone(),
            })?;
        let name = segment.split('.').next().unwrap_or(segment);
        let is_sha1 = name.len() == 40
            && name
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if is_sha1 {
            Ok(())
        } else {
            Err(UriError::MissingContentHash {
                uri: self.text.clone(),
            })
        }
    }

    /// The full normalized URI text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The classified reference kind.
    pub fn kind(&self) -> RefKind {
        self.kind
    }

    /// The inner URI, with the kind prefix stripped.
    ///
    /// For read-only references this is the whole URI.
    pub fn inner(&self) -> &InnerUri {
        &self.inner
    }
}

impl fmt::Display for RefUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl fmt::Debug for RefUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefUri({}, {:?})", self.text, self.kind)
    }
}

impl std::str::FromStr for RefUri {
    type Err = UriError;

    fn from_str(s: &str) -> UriResult<Self> {
        Self::parse(s)
    }
}

impl Serialize for RefUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for RefUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(D::Error::custom)
    }
}

/// Whether `s` starts with a `scheme:` production.
fn has_scheme(s: &str) -> bool {
    match s.split_once(':') {
        Some((scheme, _)) => is_scheme(scheme),
        None => false,
    }
}

/// RFC 3986 scheme: one ASCII letter followed by letters, digits, `+`, `-`,
/// `.`.
fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "a9993e364706816aba3e25717850c26c9cd0d89d";

    #[test]
    fn parse_volatile() {
        let uri = RefUri::parse("volatile:mem://bucket/doc.json").unwrap();
        assert_eq!(uri.kind(), RefKind::Volatile);
        assert_eq!(uri.inner().as_str(), "mem://bucket/doc.json");
        assert_eq!(uri.inner().scheme(), "mem");
        assert_eq!(uri.as_str(), "volatile:mem://bucket/doc.json");
    }

    #[test]
    fn parse_atomic() {
        let uri = RefUri::parse("atomic:mem://bucket/ctr.json").unwrap();
        assert_eq!(uri.kind(), RefKind::Atomic);
        assert!(!uri.kind().is_read_only());
    }

    #[test]
    fn parse_value_with_hash() {
        let uri = RefUri::parse(&format!("value:mem://bucket/{HEX}.json")).unwrap();
        assert_eq!(uri.kind(), RefKind::Value);
        assert!(uri.kind().is_read_only());
    }

    #[test]
    fn value_without_hash_is_rejected() {
        let err = RefUri::parse("value:mem://bucket/doc.json").unwrap_err();
        assert!(matches!(err, UriError::MissingContentHash { .. }));
    }

    #[test]
    fn value_with_short_hash_is_rejected() {
        let err = RefUri::parse("value:mem://bucket/abc123.json").unwrap_err();
        assert!(matches!(err, UriError::MissingContentHash { .. }));
    }

    #[test]
    fn bare_inner_uri_is_read_only() {
        let uri = RefUri::parse("mem://bucket/doc.json").unwrap();
        assert_eq!(uri.kind(), RefKind::ReadOnly);
        assert_eq!(uri.inner().as_str(), uri.as_str());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = RefUri::parse("bogus:mem://bucket/doc.json").unwrap_err();
        assert_eq!(
            err,
            UriError::UnknownKind {
                kind: "bogus".into()
            }
        );
    }

    #[test]
    fn kind_prefix_requires_inner_scheme() {
        let err = RefUri::parse("volatile:doc.json").unwrap_err();
        assert!(matches!(err, UriError::Malformed { .. }));
    }

    #[test]
    fn input_is_lowercased() {
        let uri = RefUri::parse("Volatile:MEM://Bucket/Doc.JSON").unwrap();
        assert_eq!(uri.as_str(), "volatile:mem://bucket/doc.json");
        assert_eq!(uri.kind(), RefKind::Volatile);
    }

    #[test]
    fn reparse_is_identity() {
        let value_uri = format!("value:mem://b/{HEX}.json");
        for text in [
            "volatile:mem://bucket/doc.json",
            "atomic:mem://b/x.json.gz",
            "mem://bucket/doc.json",
            value_uri.as_str(),
        ] {
            let uri = RefUri::parse(text).unwrap();
            let again = RefUri::parse(&uri.to_string()).unwrap();
            assert_eq!(uri, again);
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(RefUri::parse("   "), Err(UriError::Empty));
    }

    #[test]
    fn missing_scheme() {
        assert!(matches!(
            RefUri::parse("no-scheme-here"),
            Err(UriError::Malformed { .. })
        ));
    }

    #[test]
    fn last_segment_basics() {
        let uri = RefUri::parse("volatile:mem://bucket/dir/doc.json").unwrap();
        assert_eq!(uri.inner().last_segment(), Some("doc.json"));

        let uri = RefUri::parse("volatile:mem://bucket/doc.json?ttl=5").unwrap();
        assert_eq!(uri.inner().last_segment(), Some("doc.json"));
    }

    #[test]
    fn format_candidates_longest_first() {
        let uri = RefUri::parse("volatile:mem://b/data.json.gz").unwrap();
        assert_eq!(uri.inner().format_candidates(), vec!["json.gz", "gz"]);

        let uri = RefUri::parse("volatile:mem://b/data.json").unwrap();
        assert_eq!(uri.inner().format_candidates(), vec!["json"]);
    }

    #[test]
    fn format_candidates_without_suffix() {
        let uri = RefUri::parse("volatile:mem://b/data").unwrap();
        assert!(uri.inner().format_candidates().is_empty());
    }

    #[test]
    fn serde_roundtrip_as_string() {
        let uri = RefUri::parse("atomic:mem://b/ctr.json").unwrap();
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, "\"atomic:mem://b/ctr.json\"");
        let back: RefUri = serde_json::from_str(&json).unwrap();
        assert_eq!(uri, back);
    }

    #[test]
    fn kind_display() {
        assert_eq!(RefKind::Value.to_string(), "value");
        assert_eq!(RefKind::ReadOnly.to_string(), "read-only");
    }
}
