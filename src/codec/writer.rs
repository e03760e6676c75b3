//! Write cursor with compact-width encoders.
//!
//! Integers, string/binary lengths and container headers always use the
//! smallest MessagePack form that fits. Doubles are always written as
//! FLOAT64.
//!
//! Containers whose element count is not known up front use a two-phase
//! header: [`PackWriter::reserve_map_header`] writes a zeroed placeholder
//! sized for the declared maximum, the body follows, and
//! [`PackWriter::fill_header`] backpatches the real count in place.

use super::format::{self, FIXSTR_MAX, FIX_CONTAINER_MAX};
use crate::core::error::{DattyError, DattyResult};
use bytes::{BufMut, Bytes, BytesMut};

/// Container kind of a reserved header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderKind {
    Array,
    Map,
}

/// Reserved container header awaiting its final element count.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reserved header must be filled"]
pub struct HeaderSlot {
    kind: HeaderKind,
    pos: usize,
    width: usize,
    max: usize,
}

impl HeaderSlot {
    /// Largest count this slot can hold.
    pub fn max(&self) -> usize {
        self.max
    }
}

/// Growable MessagePack write buffer.
#[derive(Debug, Default)]
pub struct PackWriter {
    buf: BytesMut,
}

impl PackWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// View of the bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Freeze into an immutable, shareable buffer.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn write_nil(&mut self) {
        self.buf.put_u8(format::NIL);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf
            .put_u8(if value { format::TRUE } else { format::FALSE });
    }

    /// Write a signed integer in its most compact form.
    pub fn write_i64(&mut self, value: i64) {
        if value < -32 {
            if value >= i8::MIN as i64 {
                self.buf.put_u8(format::INT8);
                self.buf.put_i8(value as i8);
            } else if value >= i16::MIN as i64 {
                self.buf.put_u8(format::INT16);
                self.buf.put_i16(value as i16);
            } else if value >= i32::MIN as i64 {
                self.buf.put_u8(format::INT32);
                self.buf.put_i32(value as i32);
            } else {
                self.buf.put_u8(format::INT64);
                self.buf.put_i64(value);
            }
        } else if value < 128 {
            // positive or negative fixint
            self.buf.put_u8(value as u8);
        } else if value <= u8::MAX as i64 {
            self.buf.put_u8(format::UINT8);
            self.buf.put_u8(value as u8);
        } else if value <= u16::MAX as i64 {
            self.buf.put_u8(format::UINT16);
            self.buf.put_u16(value as u16);
        } else if value <= u32::MAX as i64 {
            self.buf.put_u8(format::UINT32);
            self.buf.put_u32(value as u32);
        } else {
            self.buf.put_u8(format::UINT64);
            self.buf.put_u64(value as u64);
        }
    }

    /// Write a double as FLOAT64.
    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_u8(format::FLOAT64);
        self.buf.put_f64(value);
    }

    /// Write a UTF-8 string with its length header.
    pub fn write_str(&mut self, value: &str) -> DattyResult<()> {
        self.write_str_bytes(value.as_bytes())
    }

    /// Write raw bytes under a string header.
    pub fn write_str_bytes(&mut self, bytes: &[u8]) -> DattyResult<()> {
        let len = bytes.len();
        if len <= FIXSTR_MAX {
            self.buf.put_u8(format::FIXSTR_PREFIX | len as u8);
        } else if len <= u8::MAX as usize {
            self.buf.put_u8(format::STR8);
            self.buf.put_u8(len as u8);
        } else if len <= u16::MAX as usize {
            self.buf.put_u8(format::STR16);
            self.buf.put_u16(len as u16);
        } else {
            self.buf.put_u8(format::STR32);
            self.buf.put_u32(checked_u32(len, "string")?);
        }
        self.buf.put_slice(bytes);
        Ok(())
    }

    /// Write a binary blob with its length header.
    pub fn write_bin(&mut self, bytes: &[u8]) -> DattyResult<()> {
        let len = bytes.len();
        if len <= u8::MAX as usize {
            self.buf.put_u8(format::BIN8);
            self.buf.put_u8(len as u8);
        } else if len <= u16::MAX as usize {
            self.buf.put_u8(format::BIN16);
            self.buf.put_u16(len as u16);
        } else {
            self.buf.put_u8(format::BIN32);
            self.buf.put_u32(checked_u32(len, "binary")?);
        }
        self.buf.put_slice(bytes);
        Ok(())
    }

    pub fn write_array_header(&mut self, size: usize) -> DattyResult<()> {
        self.write_container_header(HeaderKind::Array, size)
    }

    pub fn write_map_header(&mut self, size: usize) -> DattyResult<()> {
        self.write_container_header(HeaderKind::Map, size)
    }

    /// Append an already-encoded value verbatim.
    pub fn write_raw(&mut self, encoded: &[u8]) {
        self.buf.put_slice(encoded);
    }

    /// Reserve an array header able to hold up to `max` elements.
    pub fn reserve_array_header(&mut self, max: usize) -> DattyResult<HeaderSlot> {
        self.reserve(HeaderKind::Array, max)
    }

    /// Reserve a map header able to hold up to `max` entries.
    pub fn reserve_map_header(&mut self, max: usize) -> DattyResult<HeaderSlot> {
        self.reserve(HeaderKind::Map, max)
    }

    /// Backpatch a reserved header with the final count.
    pub fn fill_header(&mut self, slot: HeaderSlot, size: usize) -> DattyResult<()> {
        if size > slot.max {
            return Err(DattyError::usage(format!(
                "header reserved for {} elements, got {}",
                slot.max, size
            )));
        }
        let header = &mut self.buf[slot.pos..slot.pos + slot.width];
        match (slot.width, slot.kind) {
            (1, HeaderKind::Array) => header[0] = format::FIXARRAY_PREFIX | size as u8,
            (1, HeaderKind::Map) => header[0] = format::FIXMAP_PREFIX | size as u8,
            (3, kind) => {
                header[0] = if kind == HeaderKind::Array {
                    format::ARRAY16
                } else {
                    format::MAP16
                };
                header[1..3].copy_from_slice(&(size as u16).to_be_bytes());
            }
            (_, kind) => {
                header[0] = if kind == HeaderKind::Array {
                    format::ARRAY32
                } else {
                    format::MAP32
                };
                header[1..5].copy_from_slice(&(size as u32).to_be_bytes());
            }
        }
        Ok(())
    }

    fn reserve(&mut self, kind: HeaderKind, max: usize) -> DattyResult<HeaderSlot> {
        let width = header_width(max)?;
        let pos = self.buf.len();
        self.buf.put_bytes(0, width);
        Ok(HeaderSlot {
            kind,
            pos,
            width,
            max,
        })
    }

    fn write_container_header(&mut self, kind: HeaderKind, size: usize) -> DattyResult<()> {
        let (fix, h16, h32) = match kind {
            HeaderKind::Array => (format::FIXARRAY_PREFIX, format::ARRAY16, format::ARRAY32),
            HeaderKind::Map => (format::FIXMAP_PREFIX, format::MAP16, format::MAP32),
        };
        if size <= FIX_CONTAINER_MAX {
            self.buf.put_u8(fix | size as u8);
        } else if size <= u16::MAX as usize {
            self.buf.put_u8(h16);
            self.buf.put_u16(size as u16);
        } else {
            self.buf.put_u8(h32);
            self.buf.put_u32(checked_u32(size, "container")?);
        }
        Ok(())
    }
}

/// Header width in bytes for a container of up to `max` elements.
fn header_width(max: usize) -> DattyResult<usize> {
    if max <= FIX_CONTAINER_MAX {
        Ok(1)
    } else if max <= u16::MAX as usize {
        Ok(3)
    } else {
        checked_u32(max, "container")?;
        Ok(5)
    }
}

fn checked_u32(len: usize, what: &str) -> DattyResult<u32> {
    u32::try_from(len).map_err(|_| DattyError::usage(format!("{} length {} exceeds u32", what, len)))
}
