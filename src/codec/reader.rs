//! Read cursor over a shared transport buffer.
//!
//! [`PackReader`] owns a cheap clone of the transport [`Bytes`] handle and a
//! position. Every read either returns a decoded scalar or fails with a
//! parse error; a failed read leaves the cursor where the failing value
//! started so the caller can report the offset.

use super::format::{Format, ValueType};
use super::{Limits, Payload, ReadMode};
use crate::core::error::{DattyError, DattyResult};
use bytes::Bytes;

/// Result of a generic read where the caller does not know the shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Dynamic {
    Nil,
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
    Binary(Payload),
    /// Array header; the elements follow.
    Array(usize),
    /// Map header whose first key is an integer; the entries follow.
    IntMap(usize),
    /// Map header whose first key is not an integer (or that is empty).
    StringMap(usize),
}

/// MessagePack read cursor.
#[derive(Debug, Clone)]
pub struct PackReader {
    buf: Bytes,
    pos: usize,
    limits: Limits,
}

impl PackReader {
    /// Create a reader with default limits.
    pub fn new(buf: Bytes) -> Self {
        Self::with_limits(buf, Limits::default())
    }

    /// Create a reader with explicit limits.
    pub fn with_limits(buf: Bytes, limits: Limits) -> Self {
        Self { buf, pos: 0, limits }
    }

    /// Create a reader over a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Check if any bytes are left.
    pub fn has_next(&self) -> bool {
        self.pos < self.buf.len()
    }

    /// Format of the next value without consuming it.
    pub fn peek_format(&self) -> DattyResult<Format> {
        self.buf
            .get(self.pos)
            .map(|b| Format::from_byte(*b))
            .ok_or_else(insufficient)
    }

    /// Check if the next value is NIL.
    pub fn next_is_nil(&self) -> bool {
        matches!(self.peek_format(), Ok(Format::Nil))
    }

    pub fn read_nil(&mut self) -> DattyResult<()> {
        match self.peek_format()? {
            Format::Nil => {
                self.pos += 1;
                Ok(())
            }
            other => Err(unexpected("NIL", other)),
        }
    }

    /// Consume a NIL if one is next.
    pub fn try_read_nil(&mut self) -> DattyResult<bool> {
        if self.peek_format()?.is_nil() {
            self.pos += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn read_bool(&mut self) -> DattyResult<bool> {
        let value = match self.peek_format()? {
            Format::True => true,
            Format::False => false,
            other => return Err(unexpected("BOOLEAN", other)),
        };
        self.pos += 1;
        Ok(value)
    }

    /// Read any integer width as a signed 64-bit value.
    pub fn read_i64(&mut self) -> DattyResult<i64> {
        let start = self.pos;
        let result = self.read_i64_inner();
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    fn read_i64_inner(&mut self) -> DattyResult<i64> {
        let format = self.peek_format()?;
        self.pos += 1;
        match format {
            Format::PositiveFixInt(v) => Ok(v as i64),
            Format::NegativeFixInt(v) => Ok(v as i64),
            Format::Uint8 => Ok(self.take_array::<1>()?[0] as i64),
            Format::Uint16 => Ok(u16::from_be_bytes(self.take_array()?) as i64),
            Format::Uint32 => Ok(u32::from_be_bytes(self.take_array()?) as i64),
            Format::Uint64 => {
                let v = u64::from_be_bytes(self.take_array()?);
                i64::try_from(v)
                    .map_err(|_| DattyError::parse(format!("UINT64 value {} exceeds i64", v)))
            }
            Format::Int8 => Ok(self.take_array::<1>()?[0] as i8 as i64),
            Format::Int16 => Ok(i16::from_be_bytes(self.take_array()?) as i64),
            Format::Int32 => Ok(i32::from_be_bytes(self.take_array()?) as i64),
            Format::Int64 => Ok(i64::from_be_bytes(self.take_array()?)),
            other => Err(unexpected("INTEGER", other)),
        }
    }

    /// Read FLOAT32 or FLOAT64 as a double.
    pub fn read_f64(&mut self) -> DattyResult<f64> {
        let start = self.pos;
        let format = self.peek_format()?;
        self.pos += 1;
        let result = match format {
            Format::Float32 => self.take_array().map(|b| f32::from_be_bytes(b) as f64),
            Format::Float64 => self.take_array().map(f64::from_be_bytes),
            other => Err(unexpected("FLOAT", other)),
        };
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    /// Read a string header, returning the byte length.
    pub fn read_str_header(&mut self) -> DattyResult<usize> {
        let start = self.pos;
        let format = self.peek_format()?;
        self.pos += 1;
        let result = match format {
            Format::FixStr(len) => Ok(len as usize),
            Format::Str8 => self.take_array::<1>().map(|b| b[0] as usize),
            Format::Str16 => self.take_array().map(|b| u16::from_be_bytes(b) as usize),
            Format::Str32 => self.take_array().map(|b| u32::from_be_bytes(b) as usize),
            other => Err(unexpected("STRING", other)),
        };
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    /// Read string content as raw bytes.
    pub fn read_str_bytes(&mut self, mode: ReadMode) -> DattyResult<Payload> {
        let start = self.pos;
        let len = self.read_str_header()?;
        self.take_payload(len, mode).inspect_err(|_| self.pos = start)
    }

    /// Read a UTF-8 string.
    pub fn read_str(&mut self) -> DattyResult<String> {
        let start = self.pos;
        let len = self.read_str_header()?;
        let bytes = match self.take(len) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.pos = start;
                return Err(e);
            }
        };
        String::from_utf8(bytes.to_vec()).map_err(|_| {
            self.pos = start;
            DattyError::parse(format!("invalid UTF-8 in string at offset {}", start))
        })
    }

    /// Read a binary header, returning the byte length.
    pub fn read_bin_header(&mut self) -> DattyResult<usize> {
        let start = self.pos;
        let format = self.peek_format()?;
        self.pos += 1;
        let result = match format {
            Format::Bin8 => self.take_array::<1>().map(|b| b[0] as usize),
            Format::Bin16 => self.take_array().map(|b| u16::from_be_bytes(b) as usize),
            Format::Bin32 => self.take_array().map(|b| u32::from_be_bytes(b) as usize),
            other => Err(unexpected("BINARY", other)),
        };
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    /// Read a binary blob, copied or sliced per `mode`.
    pub fn read_bin(&mut self, mode: ReadMode) -> DattyResult<Payload> {
        let start = self.pos;
        let len = self.read_bin_header()?;
        self.take_payload(len, mode).inspect_err(|_| self.pos = start)
    }

    /// Read an array header, returning the element count.
    pub fn read_array_header(&mut self) -> DattyResult<usize> {
        let start = self.pos;
        let format = self.peek_format()?;
        self.pos += 1;
        let result = match format {
            Format::FixArray(len) => Ok(len as usize),
            Format::Array16 => self.take_array().map(|b| u16::from_be_bytes(b) as usize),
            Format::Array32 => self.take_array().map(|b| u32::from_be_bytes(b) as usize),
            other => Err(unexpected("ARRAY", other)),
        }
        .and_then(|len| self.check_len(len));
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    /// Read a map header, returning the entry count.
    pub fn read_map_header(&mut self) -> DattyResult<usize> {
        let start = self.pos;
        let format = self.peek_format()?;
        self.pos += 1;
        let result = match format {
            Format::FixMap(len) => Ok(len as usize),
            Format::Map16 => self.take_array().map(|b| u16::from_be_bytes(b) as usize),
            Format::Map32 => self.take_array().map(|b| u32::from_be_bytes(b) as usize),
            other => Err(unexpected("MAP", other)),
        }
        .and_then(|len| self.check_len(len));
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    /// Skip one complete value, including nested containers.
    pub fn skip_value(&mut self) -> DattyResult<()> {
        let start = self.pos;
        self.skip_at_depth(0).inspect_err(|_| self.pos = start)
    }

    /// Skip one complete value and return its encoded bytes.
    pub fn read_raw_value(&mut self, mode: ReadMode) -> DattyResult<Payload> {
        let start = self.pos;
        self.skip_value()?;
        Ok(Payload::read(&self.buf.slice(start..self.pos), mode))
    }

    /// Read the next value without knowing its shape up front.
    ///
    /// Containers return only their header; the caller reads the elements.
    /// For a map the first key is peeked, not consumed.
    pub fn read_dynamic(&mut self, mode: ReadMode) -> DattyResult<Dynamic> {
        let format = self.peek_format()?;
        match format.value_type() {
            ValueType::Nil => {
                self.pos += 1;
                Ok(Dynamic::Nil)
            }
            ValueType::Boolean => self.read_bool().map(Dynamic::Bool),
            ValueType::Integer => self.read_i64().map(Dynamic::Long),
            ValueType::Float => self.read_f64().map(Dynamic::Double),
            ValueType::String => self.read_str().map(Dynamic::String),
            ValueType::Binary => self.read_bin(mode).map(Dynamic::Binary),
            ValueType::Array => self.read_array_header().map(Dynamic::Array),
            ValueType::Map => {
                let size = self.read_map_header()?;
                if size > 0 && self.peek_format()?.is_integer() {
                    Ok(Dynamic::IntMap(size))
                } else {
                    Ok(Dynamic::StringMap(size))
                }
            }
            ValueType::Extension | ValueType::Invalid => Err(DattyError::parse(format!(
                "unsupported format {} at offset {}",
                format, self.pos
            ))),
        }
    }

    fn skip_at_depth(&mut self, depth: usize) -> DattyResult<()> {
        let format = self.peek_format()?;
        match format.value_type() {
            ValueType::Nil | ValueType::Boolean => {
                self.pos += 1;
                Ok(())
            }
            ValueType::Integer => self.read_i64().map(|_| ()),
            ValueType::Float => self.read_f64().map(|_| ()),
            ValueType::String => {
                let len = self.read_str_header()?;
                self.advance(len)
            }
            ValueType::Binary => {
                let len = self.read_bin_header()?;
                self.advance(len)
            }
            ValueType::Array => {
                self.check_depth(depth)?;
                let len = self.read_array_header()?;
                for _ in 0..len {
                    self.skip_at_depth(depth + 1)?;
                }
                Ok(())
            }
            ValueType::Map => {
                self.check_depth(depth)?;
                let len = self.read_map_header()?;
                for _ in 0..len {
                    self.skip_at_depth(depth + 1)?;
                    self.skip_at_depth(depth + 1)?;
                }
                Ok(())
            }
            ValueType::Extension => self.skip_extension(format),
            ValueType::Invalid => Err(DattyError::parse(format!(
                "invalid format byte 0xc1 at offset {}",
                self.pos
            ))),
        }
    }

    fn skip_extension(&mut self, format: Format) -> DattyResult<()> {
        self.pos += 1;
        // data length excludes the one-byte type tag
        let len = match format {
            Format::FixExt1 => 1,
            Format::FixExt2 => 2,
            Format::FixExt4 => 4,
            Format::FixExt8 => 8,
            Format::FixExt16 => 16,
            Format::Ext8 => self.take_array::<1>()?[0] as usize,
            Format::Ext16 => u16::from_be_bytes(self.take_array()?) as usize,
            Format::Ext32 => u32::from_be_bytes(self.take_array()?) as usize,
            other => return Err(unexpected("EXT", other)),
        };
        self.advance(len + 1)
    }

    /// Enforce the nesting bound before entering a container at `depth`.
    pub(crate) fn check_depth(&self, depth: usize) -> DattyResult<()> {
        if depth >= self.limits.max_nesting_depth {
            return Err(DattyError::parse(format!(
                "nesting depth exceeds {}",
                self.limits.max_nesting_depth
            )));
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> DattyResult<usize> {
        if len > self.limits.max_collection_len {
            return Err(DattyError::parse(format!(
                "collection length {} exceeds {}",
                len, self.limits.max_collection_len
            )));
        }
        // every element needs at least one byte
        if len > self.remaining() {
            return Err(insufficient());
        }
        Ok(len)
    }

    fn take(&mut self, len: usize) -> DattyResult<Bytes> {
        if len > self.remaining() {
            return Err(insufficient());
        }
        let bytes = self.buf.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(bytes)
    }

    fn take_payload(&mut self, len: usize, mode: ReadMode) -> DattyResult<Payload> {
        let bytes = self.take(len)?;
        Ok(Payload::read(&bytes, mode))
    }

    fn take_array<const N: usize>(&mut self) -> DattyResult<[u8; N]> {
        let slice = self
            .buf
            .get(self.pos..self.pos + N)
            .ok_or_else(insufficient)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos += N;
        Ok(out)
    }

    fn advance(&mut self, len: usize) -> DattyResult<()> {
        if len > self.remaining() {
            return Err(insufficient());
        }
        self.pos += len;
        Ok(())
    }
}

fn insufficient() -> DattyError {
    DattyError::parse("insufficient buffer length")
}

fn unexpected(expected: &str, found: Format) -> DattyError {
    DattyError::parse(format!("expected {}, found {}", expected, found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PackWriter;

    fn reader(bytes: &[i8]) -> PackReader {
        let data: Vec<u8> = bytes.iter().map(|b| *b as u8).collect();
        PackReader::new(Bytes::from(data))
    }

    #[test]
    fn test_read_int_keyed_map() {
        // {1: "123", 2: -9, 3: "Alex"}
        let mut r = reader(&[
            -125, 1, -93, 49, 50, 51, 2, -9, 3, -92, 65, 108, 101, 120,
        ]);
        assert_eq!(r.read_dynamic(ReadMode::Copy).unwrap(), Dynamic::IntMap(3));
        assert_eq!(r.read_i64().unwrap(), 1);
        assert_eq!(r.read_str().unwrap(), "123");
        assert_eq!(r.read_i64().unwrap(), 2);
        assert_eq!(r.read_i64().unwrap(), -9);
        assert_eq!(r.read_i64().unwrap(), 3);
        assert_eq!(r.read_str().unwrap(), "Alex");
        assert!(!r.has_next());
    }

    #[test]
    fn test_read_string_keyed_map() {
        let mut r = reader(&[
            -125, -93, 97, 99, 99, -93, 49, 50, 51, -90, 108, 111, 103, 105, 110, 115, -9, -92,
            110, 97, 109, 101, -92, 65, 108, 101, 120,
        ]);
        assert_eq!(
            r.read_dynamic(ReadMode::Copy).unwrap(),
            Dynamic::StringMap(3)
        );
        assert_eq!(r.read_str().unwrap(), "acc");
        assert_eq!(r.read_str().unwrap(), "123");
        assert_eq!(r.read_str().unwrap(), "logins");
        assert_eq!(r.read_i64().unwrap(), -9);
        assert_eq!(r.read_str().unwrap(), "name");
        assert_eq!(r.read_str().unwrap(), "Alex");
    }

    #[test]
    fn test_read_array() {
        let mut r = reader(&[-109, -93, 49, 50, 51, -9, -92, 65, 108, 101, 120]);
        assert_eq!(r.read_array_header().unwrap(), 3);
        assert_eq!(r.read_str().unwrap(), "123");
        assert_eq!(r.read_i64().unwrap(), -9);
        assert_eq!(r.read_str().unwrap(), "Alex");
    }

    #[test]
    fn test_int_widths_round_trip() {
        let values = [
            0i64,
            -1,
            -32,
            -33,
            127,
            128,
            255,
            256,
            -129,
            65_535,
            65_536,
            -32_769,
            u32::MAX as i64,
            u32::MAX as i64 + 1,
            i32::MIN as i64 - 1,
            i64::MAX,
            i64::MIN,
        ];
        let mut w = PackWriter::new();
        for v in values {
            w.write_i64(v);
        }
        let mut r = PackReader::new(w.finish());
        for v in values {
            assert_eq!(r.read_i64().unwrap(), v);
        }
    }

    #[test]
    fn test_uint64_overflow_is_parse_error() {
        let mut data = vec![0xcf];
        data.extend_from_slice(&u64::MAX.to_be_bytes());
        let mut r = PackReader::from_slice(&data);
        assert!(r.read_i64().unwrap_err().is_parse());
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_truncated_input() {
        let mut r = PackReader::from_slice(&[0xcd, 0x01]);
        let err = r.read_i64().unwrap_err();
        assert_eq!(err, DattyError::parse("insufficient buffer length"));

        let mut r = PackReader::from_slice(&[0xa5, b'a', b'b']);
        assert!(r.read_str().is_err());

        let mut r = PackReader::from_slice(&[]);
        assert!(r.read_nil().is_err());
    }

    #[test]
    fn test_unexpected_format() {
        let mut r = PackReader::from_slice(&[0xa1, b'x']);
        let err = r.read_i64().unwrap_err();
        assert_eq!(err.to_string(), "parse error: expected INTEGER, found FIXSTR");
    }

    #[test]
    fn test_invalid_utf8() {
        let mut r = PackReader::from_slice(&[0xa2, 0xff, 0xfe]);
        assert!(r.read_str().unwrap_err().is_parse());
        assert_eq!(r.position(), 0);
        let bytes = r.read_str_bytes(ReadMode::Copy).unwrap();
        assert_eq!(bytes.as_bytes(), &[0xff, 0xfe]);
    }

    #[test]
    fn test_read_bin_slice_shares_buffer() {
        let mut w = PackWriter::new();
        w.write_bin(b"payload").unwrap();
        let mut r = PackReader::new(w.finish());
        let sliced = r.clone().read_bin(ReadMode::Slice).unwrap();
        let copied = r.read_bin(ReadMode::Copy).unwrap();
        assert!(sliced.is_borrowed());
        assert!(!copied.is_borrowed());
        assert_eq!(sliced, copied);
    }

    #[test]
    fn test_float32_widens() {
        let mut data = vec![0xca];
        data.extend_from_slice(&2.5f32.to_be_bytes());
        let mut r = PackReader::from_slice(&data);
        assert_eq!(r.read_f64().unwrap(), 2.5);
    }

    #[test]
    fn test_skip_nested_and_raw_value() {
        let mut w = PackWriter::new();
        w.write_map_header(2).unwrap();
        w.write_str("a").unwrap();
        w.write_array_header(2).unwrap();
        w.write_i64(1000);
        w.write_f64(1.0);
        w.write_str("b").unwrap();
        w.write_bin(&[9, 9]).unwrap();
        let first_len = w.len();
        w.write_bool(true);

        let mut r = PackReader::new(w.finish());
        let raw = r.read_raw_value(ReadMode::Slice).unwrap();
        assert_eq!(raw.len(), first_len);
        assert!(r.read_bool().unwrap());
    }

    #[test]
    fn test_skip_extension() {
        // fixext4 + ext8, then a fixint
        let data = [0xd6, 0x01, 1, 2, 3, 4, 0xc7, 0x02, 0x05, 7, 8, 0x2a];
        let mut r = PackReader::from_slice(&data);
        r.skip_value().unwrap();
        r.skip_value().unwrap();
        assert_eq!(r.read_i64().unwrap(), 42);
    }

    #[test]
    fn test_depth_limit() {
        let limits = Limits {
            max_nesting_depth: 2,
            ..Limits::default()
        };
        let data = Bytes::from_static(&[0x91, 0x91, 0x91, 0xc0]);
        let mut r = PackReader::with_limits(data.clone(), limits);
        assert!(r.skip_value().unwrap_err().is_parse());

        let mut r = PackReader::new(data);
        r.skip_value().unwrap();
    }

    #[test]
    fn test_collection_len_limit() {
        let limits = Limits {
            max_collection_len: 2,
            ..Limits::default()
        };
        let mut r = PackReader::with_limits(Bytes::from_static(&[0x93, 1, 2, 3]), limits);
        assert!(r.read_array_header().is_err());
    }

    #[test]
    fn test_header_larger_than_buffer() {
        let mut r = PackReader::from_slice(&[0xdd, 0xff, 0xff, 0xff, 0xff]);
        assert!(r.read_array_header().unwrap_err().is_parse());
    }

    #[test]
    fn test_empty_map_is_string_map() {
        let mut r = PackReader::from_slice(&[0x80]);
        assert_eq!(
            r.read_dynamic(ReadMode::Copy).unwrap(),
            Dynamic::StringMap(0)
        );
    }
}
