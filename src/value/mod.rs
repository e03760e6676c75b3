//! Packable value model.
//!
//! A [`PackableValue`] is an immutable tree of booleans, numbers, strings and
//! tables. Values encode to and decode from the MessagePack wire format and
//! tables are navigable by [`PathExpression`].
//!
//! - [`number`] - Long/double numbers with promotion rules
//! - [`string`] - UTF-8 or binary strings
//! - [`table`] - Integer- or string-keyed tables
//! - [`expression`] - Path expressions (`a.b[2].c`)
//! - [`stringify`] - Numeric literal classification
//! - [`json`] - JSON projection
//! - [`message`] - Header and payload messages

pub mod expression;
pub mod json;
pub mod message;
pub mod number;
pub mod string;
pub mod stringify;
pub mod table;

pub use expression::PathExpression;
pub use message::{MessagePayload, PackableMessage};
pub use number::{NumberKind, PackableNumber};
pub use string::{PackableString, StringKind};
pub use table::{KeyRef, PackableTable, TableKey, TableKeying};

use crate::codec::format::ValueType;
use crate::codec::{PackReader, PackWriter, ReadMode};
use crate::core::error::{DattyError, DattyResult};
use bytes::Bytes;
use stringify::{detect_number, NumberType};

/// A node in a packable value tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PackableValue {
    Boolean(bool),
    Number(PackableNumber),
    String(PackableString),
    Table(PackableTable),
}

impl PackableValue {
    /// Variant name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Table(_) => "table",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&PackableNumber> {
        match self {
            Self::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_packable_string(&self) -> Option<&PackableString> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&PackableTable> {
        match self {
            Self::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Textual form of any value.
    pub fn as_string(&self) -> String {
        match self {
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => n.as_string(),
            Self::String(s) => s.as_str().into_owned(),
            Self::Table(_) => json::to_json(self).to_string(),
        }
    }

    /// Build a value from its stringified form.
    ///
    /// `true`/`false` in any case become booleans, numeric literals become
    /// numbers and everything else stays a string. A numeric literal that
    /// overflows its type is a number-format error.
    pub fn from_stringified(literal: &str) -> DattyResult<Self> {
        if literal.eq_ignore_ascii_case("true") {
            return Ok(Self::Boolean(true));
        }
        if literal.eq_ignore_ascii_case("false") {
            return Ok(Self::Boolean(false));
        }
        match detect_number(literal) {
            NumberType::Long | NumberType::Double => PackableNumber::parse(literal).map(Self::Number),
            NumberType::NaN => Ok(Self::String(PackableString::new(literal))),
        }
    }

    /// Append the encoding of this value.
    pub fn write(&self, writer: &mut PackWriter) -> DattyResult<()> {
        match self {
            Self::Boolean(b) => writer.write_bool(*b),
            Self::Number(PackableNumber::Long(v)) => writer.write_i64(*v),
            Self::Number(PackableNumber::Double(v)) => writer.write_f64(*v),
            Self::String(s) => match s.kind() {
                StringKind::Utf8 => writer.write_str_bytes(s.as_bytes())?,
                StringKind::Binary => writer.write_bin(s.as_bytes())?,
            },
            Self::Table(t) => {
                writer.write_map_header(t.len())?;
                for (key, value) in t.iter() {
                    match key {
                        KeyRef::Int(k) => writer.write_i64(k),
                        KeyRef::Str(k) => writer.write_str(k)?,
                    }
                    value.write(writer)?;
                }
            }
        }
        Ok(())
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self) -> DattyResult<Bytes> {
        let mut writer = PackWriter::new();
        self.write(&mut writer)?;
        Ok(writer.finish())
    }

    /// Decode one value from `bytes`. NIL and an empty buffer are absent.
    pub fn decode(bytes: Bytes, mode: ReadMode) -> DattyResult<Option<Self>> {
        let mut reader = PackReader::new(bytes);
        if !reader.has_next() {
            return Ok(None);
        }
        Self::read(&mut reader, mode)
    }

    /// Read one value. NIL is absent.
    pub fn read(reader: &mut PackReader, mode: ReadMode) -> DattyResult<Option<Self>> {
        read_at_depth(reader, mode, 0)
    }
}

fn read_at_depth(
    reader: &mut PackReader,
    mode: ReadMode,
    depth: usize,
) -> DattyResult<Option<PackableValue>> {
    let format = reader.peek_format()?;
    let value = match format.value_type() {
        ValueType::Nil => {
            reader.read_nil()?;
            return Ok(None);
        }
        ValueType::Boolean => PackableValue::Boolean(reader.read_bool()?),
        ValueType::Integer => PackableValue::Number(PackableNumber::Long(reader.read_i64()?)),
        ValueType::Float => PackableValue::Number(PackableNumber::Double(reader.read_f64()?)),
        ValueType::String => {
            PackableValue::String(PackableString::from_utf8(reader.read_str_bytes(mode)?)?)
        }
        ValueType::Binary => PackableValue::String(PackableString::binary(reader.read_bin(mode)?)),
        ValueType::Array => {
            reader.check_depth(depth)?;
            PackableValue::Table(read_array(reader, mode, depth)?)
        }
        ValueType::Map => {
            reader.check_depth(depth)?;
            PackableValue::Table(read_map(reader, mode, depth)?)
        }
        ValueType::Extension | ValueType::Invalid => {
            return Err(DattyError::parse(format!(
                "unsupported format {} at offset {}",
                format,
                reader.position()
            )));
        }
    };
    Ok(Some(value))
}

/// Arrays become integer-keyed tables indexed from 0; NIL slots are skipped.
fn read_array(reader: &mut PackReader, mode: ReadMode, depth: usize) -> DattyResult<PackableTable> {
    let size = reader.read_array_header()?;
    let mut table = PackableTable::new();
    for i in 0..size {
        if let Some(value) = read_at_depth(reader, mode, depth + 1)? {
            table.insert(TableKey::Int(i as i64), value)?;
        }
    }
    Ok(table)
}

/// The first key decides the keying. Numeric keys in a string-keyed table
/// are stored in their string form; entries with a NIL key or value are
/// skipped.
fn read_map(reader: &mut PackReader, mode: ReadMode, depth: usize) -> DattyResult<PackableTable> {
    let size = reader.read_map_header()?;
    let mut table = PackableTable::new();
    for _ in 0..size {
        let key = read_at_depth(reader, mode, depth + 1)?;
        let value = read_at_depth(reader, mode, depth + 1)?;
        let (Some(key), Some(value)) = (key, value) else {
            continue;
        };
        let key = match (table.keying(), key) {
            (None | Some(TableKeying::Int), PackableValue::Number(n)) => TableKey::Int(n.as_long()),
            (Some(TableKeying::Int), other) => {
                return Err(DattyError::parse(format!(
                    "{} key {:?} in integer-keyed map",
                    other.type_name(),
                    other.as_string()
                )));
            }
            (Some(TableKeying::Str), PackableValue::Number(n)) => {
                tracing::debug!(key = %n, "coercing numeric key in string-keyed map");
                TableKey::Str(n.as_string())
            }
            (_, other) => TableKey::Str(other.as_string()),
        };
        table.insert(key, value)?;
    }
    Ok(table)
}

impl std::fmt::Display for PackableValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<bool> for PackableValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for PackableValue {
    fn from(v: i64) -> Self {
        Self::Number(PackableNumber::Long(v))
    }
}

impl From<i32> for PackableValue {
    fn from(v: i32) -> Self {
        Self::Number(PackableNumber::Long(v as i64))
    }
}

impl From<f64> for PackableValue {
    fn from(v: f64) -> Self {
        Self::Number(PackableNumber::Double(v))
    }
}

impl From<PackableNumber> for PackableValue {
    fn from(v: PackableNumber) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for PackableValue {
    fn from(v: &str) -> Self {
        Self::String(PackableString::new(v))
    }
}

impl From<String> for PackableValue {
    fn from(v: String) -> Self {
        Self::String(PackableString::new(v))
    }
}

impl From<PackableString> for PackableValue {
    fn from(v: PackableString) -> Self {
        Self::String(v)
    }
}

impl From<PackableTable> for PackableValue {
    fn from(v: PackableTable) -> Self {
        Self::Table(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[i8]) -> PackableValue {
        let data: Vec<u8> = bytes.iter().map(|b| *b as u8).collect();
        PackableValue::decode(Bytes::from(data), ReadMode::Copy)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_decode_int_map() {
        let value = decode(&[-125, 1, -93, 49, 50, 51, 2, -9, 3, -92, 65, 108, 101, 120]);
        let table = value.as_table().unwrap();
        assert_eq!(table.keying(), Some(TableKeying::Int));
        assert_eq!(table.get_index(1), Some(&PackableValue::from("123")));
        assert_eq!(table.get_index(2), Some(&PackableValue::from(-9i64)));
        assert_eq!(table.get_index(3), Some(&PackableValue::from("Alex")));
    }

    #[test]
    fn test_decode_string_map() {
        let value = decode(&[
            -125, -93, 97, 99, 99, -93, 49, 50, 51, -90, 108, 111, 103, 105, 110, 115, -9, -92,
            110, 97, 109, 101, -92, 65, 108, 101, 120,
        ]);
        let table = value.as_table().unwrap();
        assert_eq!(table.keying(), Some(TableKeying::Str));
        assert_eq!(table.get_field("acc"), Some(&PackableValue::from("123")));
        assert_eq!(table.get_field("logins"), Some(&PackableValue::from(-9i64)));
        assert_eq!(table.get_field("name"), Some(&PackableValue::from("Alex")));
    }

    #[test]
    fn test_decode_array() {
        let value = decode(&[-109, -93, 49, 50, 51, -9, -92, 65, 108, 101, 120]);
        let table = value.as_table().unwrap();
        assert_eq!(table.get_index(0), Some(&PackableValue::from("123")));
        assert_eq!(table.get_index(1), Some(&PackableValue::from(-9i64)));
        assert_eq!(table.get_index(2), Some(&PackableValue::from("Alex")));
    }

    #[test]
    fn test_array_skips_nil() {
        let value = decode(&[-109, 1, -64, 3]);
        let table = value.as_table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get_index(1), None);
        assert_eq!(table.get_index(2), Some(&PackableValue::from(3i64)));
    }

    #[test]
    fn test_numeric_key_coerced_in_string_map() {
        // {"a": 1, 2: 3}
        let value = decode(&[-126, -95, 97, 1, 2, 3]);
        let table = value.as_table().unwrap();
        assert_eq!(table.get_field("2"), Some(&PackableValue::from(3i64)));
    }

    #[test]
    fn test_string_key_in_int_map_is_parse_error() {
        // {1: 1, "a": 2}
        let data: Vec<u8> = vec![0x82, 0x01, 0x01, 0xa1, b'a', 0x02];
        let err = PackableValue::decode(Bytes::from(data), ReadMode::Copy).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_nil_and_empty() {
        assert_eq!(
            PackableValue::decode(Bytes::from_static(&[0xc0]), ReadMode::Copy).unwrap(),
            None
        );
        assert_eq!(
            PackableValue::decode(Bytes::new(), ReadMode::Copy).unwrap(),
            None
        );
    }

    #[test]
    fn test_extension_is_parse_error() {
        let err = PackableValue::decode(Bytes::from_static(&[0xd4, 0x01, 0x00]), ReadMode::Copy)
            .unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_round_trip_tree() {
        let inner = PackableTable::new()
            .put_entry(0, "x")
            .unwrap()
            .put_entry(5, PackableValue::from(2.5))
            .unwrap();
        let table = PackableTable::new()
            .put_entry("flag", true)
            .unwrap()
            .put_entry("count", -300i64)
            .unwrap()
            .put_entry("blob", PackableString::binary(vec![0u8, 1, 2]))
            .unwrap()
            .put_entry("inner", inner)
            .unwrap()
            .put_entry("empty", PackableTable::new())
            .unwrap();
        let value = PackableValue::from(table);
        let bytes = value.to_bytes().unwrap();
        let decoded = PackableValue::decode(bytes, ReadMode::Copy).unwrap().unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_slice_mode_borrows_payloads() {
        let value = PackableValue::String(PackableString::binary(vec![7u8; 40]));
        let bytes = value.to_bytes().unwrap();
        let decoded = PackableValue::decode(bytes, ReadMode::Slice).unwrap().unwrap();
        let s = decoded.as_packable_string().unwrap();
        assert!(s.payload().is_borrowed());
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_from_stringified() {
        assert_eq!(
            PackableValue::from_stringified("TRUE").unwrap(),
            PackableValue::Boolean(true)
        );
        assert_eq!(
            PackableValue::from_stringified("false").unwrap(),
            PackableValue::Boolean(false)
        );
        assert_eq!(
            PackableValue::from_stringified("12").unwrap(),
            PackableValue::from(12i64)
        );
        assert_eq!(
            PackableValue::from_stringified("1.5").unwrap(),
            PackableValue::from(1.5)
        );
        assert_eq!(
            PackableValue::from_stringified("hello").unwrap(),
            PackableValue::from("hello")
        );
        assert!(matches!(
            PackableValue::from_stringified("99999999999999999999"),
            Err(DattyError::NumberFormat { .. })
        ));
    }

    #[test]
    fn test_depth_limit_on_decode() {
        let mut data = vec![0x91u8; 40];
        data.push(0x01);
        let err = PackableValue::decode(Bytes::from(data), ReadMode::Copy).unwrap_err();
        assert!(err.is_parse());
    }
}
