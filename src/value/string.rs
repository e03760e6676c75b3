//! Byte strings tagged as UTF-8 text or opaque binary.

use crate::codec::Payload;
use crate::core::error::{DattyError, DattyResult};
use std::borrow::Cow;

/// Encoding kind of a [`PackableString`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    /// Bytes are valid UTF-8 and encode as a MessagePack string.
    Utf8,
    /// Opaque bytes; encode as a MessagePack binary.
    Binary,
}

/// A string value. The bytes are canonical for both kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackableString {
    kind: StringKind,
    bytes: Payload,
}

impl PackableString {
    /// UTF-8 text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            kind: StringKind::Utf8,
            bytes: Payload::from(text.into().into_bytes()),
        }
    }

    /// Opaque binary.
    pub fn binary(bytes: impl Into<Payload>) -> Self {
        Self {
            kind: StringKind::Binary,
            bytes: bytes.into(),
        }
    }

    /// UTF-8 text from raw bytes, validating the encoding.
    pub fn from_utf8(bytes: Payload) -> DattyResult<Self> {
        std::str::from_utf8(bytes.as_bytes())
            .map_err(|e| DattyError::parse(format!("invalid UTF-8 string: {}", e)))?;
        Ok(Self {
            kind: StringKind::Utf8,
            bytes,
        })
    }

    pub fn kind(&self) -> StringKind {
        self.kind
    }

    pub fn is_utf8(&self) -> bool {
        self.kind == StringKind::Utf8
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_bytes()
    }

    pub fn payload(&self) -> &Payload {
        &self.bytes
    }

    /// Text form; binary content is projected lossily.
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.bytes.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&str> for PackableString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PackableString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for PackableString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_string() {
        let s = PackableString::new("John");
        assert!(s.is_utf8());
        assert_eq!(s.as_str(), "John");
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn test_binary_lossy_projection() {
        let s = PackableString::binary(vec![b'o', b'k', 0xff]);
        assert_eq!(s.kind(), StringKind::Binary);
        assert_eq!(s.as_str(), "ok\u{FFFD}");
    }

    #[test]
    fn test_kind_affects_equality() {
        assert_ne!(
            PackableString::new("abc"),
            PackableString::binary(b"abc".to_vec())
        );
    }

    #[test]
    fn test_from_utf8_validates() {
        assert!(PackableString::from_utf8(Payload::from(vec![0xc3, 0x28])).is_err());
        let s = PackableString::from_utf8(Payload::from("é")).unwrap();
        assert_eq!(s.as_str(), "é");
    }
}
