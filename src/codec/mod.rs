//! MessagePack buffer primitives.
//!
//! This module implements the scalar and header encodings of the wire format
//! over explicit read and write cursors:
//! - [`format`] - Format byte classification
//! - [`writer`] - [`PackWriter`], compact-width encoders and header backpatching
//! - [`reader`] - [`PackReader`], decoders, skipping and zero-copy slicing
//! - [`typed`] - Descriptor-driven typed reads
//!
//! # Payload ownership
//!
//! Binary payloads read off a transport buffer come back as a [`Payload`].
//! The [`ReadMode`] passed at the call site decides between an exclusively
//! owned copy and a zero-copy slice of the shared, reference-counted
//! transport buffer. A borrowed slice keeps the whole transport buffer alive
//! for as long as it is held, so long-lived values should be read with
//! [`ReadMode::Copy`] or detached with [`Payload::into_owned`].

pub mod format;
pub mod reader;
pub mod typed;
pub mod writer;

pub use format::Format;
pub use reader::{Dynamic, PackReader};
pub use typed::{SimpleType, TypeDescriptor, TypedValue};
pub use writer::{HeaderSlot, PackWriter};

use bytes::Bytes;
use std::hash::{Hash, Hasher};

/// Maximum nesting depth for arrays/maps.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum array/map elements.
pub const MAX_ELEMENTS: usize = 1_000_000;

/// How bytes are taken from a transport buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Copy into a fresh allocation owned by the result.
    #[default]
    Copy,
    /// Slice the transport buffer without copying.
    Slice,
}

impl ReadMode {
    /// Map the legacy `copy` flag.
    pub fn from_copy_flag(copy: bool) -> Self {
        if copy {
            Self::Copy
        } else {
            Self::Slice
        }
    }
}

/// Decode bounds applied by [`PackReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum container nesting depth.
    pub max_nesting_depth: usize,
    /// Maximum element count in a single array or map header.
    pub max_collection_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_nesting_depth: MAX_NESTING_DEPTH,
            max_collection_len: MAX_ELEMENTS,
        }
    }
}

/// Binary payload, either owned or a view into a shared transport buffer.
///
/// Equality and hashing compare content only; an owned copy equals the
/// borrowed slice it was copied from.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Exclusively owned bytes.
    Owned(Bytes),
    /// Zero-copy view; retains the backing transport buffer.
    Borrowed(Bytes),
}

impl Payload {
    /// Take bytes from `source` according to `mode`.
    pub fn read(source: &Bytes, mode: ReadMode) -> Self {
        match mode {
            ReadMode::Copy => Self::Owned(Bytes::copy_from_slice(source)),
            ReadMode::Slice => Self::Borrowed(source.clone()),
        }
    }

    /// Owned payload from a static slice.
    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self::Owned(Bytes::from_static(bytes))
    }

    /// Payload content.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Owned(b) | Self::Borrowed(b) => b,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Check if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Check if this payload still references a transport buffer.
    pub fn is_borrowed(&self) -> bool {
        matches!(self, Self::Borrowed(_))
    }

    /// Detach from any transport buffer.
    pub fn into_owned(self) -> Self {
        match self {
            Self::Owned(b) => Self::Owned(b),
            Self::Borrowed(b) => Self::Owned(Bytes::copy_from_slice(&b)),
        }
    }

    /// Underlying bytes handle.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Owned(b) | Self::Borrowed(b) => b,
        }
    }

    /// Lossy UTF-8 projection.
    pub fn to_utf8_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Payload {}

impl Hash for Payload {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Owned(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self::Owned(Bytes::copy_from_slice(bytes))
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::Owned(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Owned(bytes)
    }
}
