//! Field identifiers and tagged-map encoding.
//!
//! Every envelope is a MAP whose keys are field identifiers, written either
//! as the field's integer code or as its name. The mode is chosen by the
//! producer and is not announced on the wire; readers accept both.
//!
//! # Wire Layout
//!
//! ```text
//! fixmap(n) | key(field 1) value(field 1) | ... | key(field n) value(field n)
//!
//! key = posfixint(code)        numeric mode
//!     | fixstr(name)           named mode
//! ```
//!
//! Optional fields that are absent are omitted entirely. The header is
//! reserved before the fields are written and backpatched afterwards.

use crate::codec::{HeaderSlot, PackReader, PackWriter};
use crate::core::error::{DattyError, DattyResult};

/// Codes below this are shared by every envelope; codes at or above it are
/// envelope-specific.
pub const MAX_CORE_CODE: i64 = 20;

/// Upper bound on the number of fields in one envelope.
pub const MAX_ENVELOPE_FIELDS: usize = 15;

/// Semantic field identifiers, in canonical write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    OpCode,
    ResCode,
    SetName,
    SuperKey,
    MajorKey,
    MinorKey,
    TimeoutMls,
    Version,
    Record,
    TtlSec,
    UpdatePolicy,
    MinorKeys,
    AllMinorKeys,
    Updated,
    ErrCode,
    ErrMessage,
    VersionType,
    LongValue,
    StringValue,
    UseVersion,
    Count,
}

impl Field {
    /// Every field, in canonical order.
    pub const ALL: [Field; 21] = [
        Field::OpCode,
        Field::ResCode,
        Field::SetName,
        Field::SuperKey,
        Field::MajorKey,
        Field::MinorKey,
        Field::TimeoutMls,
        Field::Version,
        Field::Record,
        Field::TtlSec,
        Field::UpdatePolicy,
        Field::MinorKeys,
        Field::AllMinorKeys,
        Field::Updated,
        Field::ErrCode,
        Field::ErrMessage,
        Field::VersionType,
        Field::LongValue,
        Field::StringValue,
        Field::UseVersion,
        Field::Count,
    ];

    /// Integer wire tag.
    pub fn code(self) -> i64 {
        match self {
            Field::OpCode => 1,
            Field::ResCode => 2,
            Field::SetName => 10,
            Field::SuperKey => 11,
            Field::MajorKey => 12,
            Field::MinorKey => 13,
            Field::TimeoutMls => 14,
            Field::Version => 20,
            Field::Record => 21,
            Field::TtlSec => 22,
            Field::UpdatePolicy => 23,
            Field::MinorKeys => 24,
            Field::AllMinorKeys => 25,
            Field::Updated => 26,
            Field::ErrCode => 27,
            Field::ErrMessage => 28,
            Field::VersionType => 29,
            Field::LongValue => 30,
            Field::StringValue => 31,
            Field::UseVersion => 32,
            Field::Count => 33,
        }
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Field::OpCode => "opcode",
            Field::ResCode => "rescode",
            Field::SetName => "setName",
            Field::SuperKey => "superKey",
            Field::MajorKey => "majorKey",
            Field::MinorKey => "minorKey",
            Field::TimeoutMls => "timeoutMls",
            Field::Version => "version",
            Field::Record => "record",
            Field::TtlSec => "ttlSec",
            Field::UpdatePolicy => "updatePolicy",
            Field::MinorKeys => "minorKeys",
            Field::AllMinorKeys => "allMinorKeys",
            Field::Updated => "updated",
            Field::ErrCode => "errCode",
            Field::ErrMessage => "errMessage",
            Field::VersionType => "versionType",
            Field::LongValue => "longValue",
            Field::StringValue => "stringValue",
            Field::UseVersion => "useVersion",
            Field::Count => "count",
        }
    }

    pub fn from_code(code: i64) -> Option<Field> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Check if this field is shared by every envelope.
    pub fn is_core(self) -> bool {
        self.code() < MAX_CORE_CODE
    }

    /// Resolve a decoded key.
    pub fn resolve(key: &FieldKey) -> Option<Field> {
        match key {
            FieldKey::Code(code) => Self::from_code(*code),
            FieldKey::Name(name) => Self::from_name(name),
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A map key as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Code(i64),
    Name(String),
}

impl std::fmt::Display for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKey::Code(code) => write!(f, "{}", code),
            FieldKey::Name(name) => f.write_str(name),
        }
    }
}

/// Writes the fields of one envelope into a reserved map header.
#[must_use = "call finish() to backpatch the header"]
pub struct FieldWriter<'a> {
    writer: &'a mut PackWriter,
    numeric: bool,
    slot: HeaderSlot,
    count: usize,
}

impl<'a> FieldWriter<'a> {
    /// Reserve a header for up to [`MAX_ENVELOPE_FIELDS`] fields.
    pub fn begin(writer: &'a mut PackWriter, numeric: bool) -> DattyResult<Self> {
        let slot = writer.reserve_map_header(MAX_ENVELOPE_FIELDS)?;
        Ok(Self {
            writer,
            numeric,
            slot,
            count: 0,
        })
    }

    /// Write a field key, leaving the value to the caller.
    pub fn key(&mut self, field: Field) -> DattyResult<&mut PackWriter> {
        if self.numeric {
            self.writer.write_i64(field.code());
        } else {
            self.writer.write_str(field.name())?;
        }
        self.count += 1;
        Ok(&mut *self.writer)
    }

    pub fn write_i64(&mut self, field: Field, value: i64) -> DattyResult<()> {
        self.key(field)?.write_i64(value);
        Ok(())
    }

    pub fn write_bool(&mut self, field: Field, value: bool) -> DattyResult<()> {
        self.key(field)?.write_bool(value);
        Ok(())
    }

    pub fn write_str(&mut self, field: Field, value: &str) -> DattyResult<()> {
        self.key(field)?.write_str(value)
    }

    /// Write a string field only when present.
    pub fn write_opt_str(&mut self, field: Field, value: Option<&str>) -> DattyResult<()> {
        match value {
            Some(v) => self.write_str(field, v),
            None => Ok(()),
        }
    }

    pub fn write_str_array(&mut self, field: Field, values: &[String]) -> DattyResult<()> {
        let writer = self.key(field)?;
        writer.write_array_header(values.len())?;
        for value in values {
            writer.write_str(value)?;
        }
        Ok(())
    }

    /// Write a field whose value is encoded by `encode`.
    pub fn write_with<F>(&mut self, field: Field, encode: F) -> DattyResult<()>
    where
        F: FnOnce(&mut PackWriter, bool) -> DattyResult<()>,
    {
        let numeric = self.numeric;
        let writer = self.key(field)?;
        encode(writer, numeric)
    }

    /// Backpatch the header with the number of fields written.
    pub fn finish(self) -> DattyResult<()> {
        self.writer.fill_header(self.slot, self.count)
    }
}

/// Read a field key.
pub fn read_key(reader: &mut PackReader) -> DattyResult<FieldKey> {
    let format = reader.peek_format()?;
    if format.is_integer() {
        Ok(FieldKey::Code(reader.read_i64()?))
    } else if format.is_str() {
        Ok(FieldKey::Name(reader.read_str()?))
    } else {
        Err(DattyError::parse(format!(
            "field key must be an integer or string, found {}",
            format
        )))
    }
}

/// Iterate a tagged map, dispatching each known field to `handler`.
///
/// The handler returns `Ok(true)` after consuming the value, or `Ok(false)`
/// without touching the reader to have the value skipped. Unknown keys are
/// skipped. Returns the number of entries read; a NIL map reads as zero.
pub fn read_fields<F>(reader: &mut PackReader, mut handler: F) -> DattyResult<usize>
where
    F: FnMut(Field, &mut PackReader) -> DattyResult<bool>,
{
    if reader.try_read_nil()? {
        return Ok(0);
    }
    let size = reader.read_map_header()?;
    for _ in 0..size {
        let key = read_key(reader)?;
        match Field::resolve(&key) {
            Some(field) => {
                if !handler(field, reader)? {
                    tracing::trace!(field = %field, "skipping unhandled field");
                    reader.skip_value()?;
                }
            }
            None => {
                tracing::trace!(key = %key, "skipping unknown field");
                reader.skip_value()?;
            }
        }
    }
    Ok(size)
}

/// Read a string or NIL.
pub fn read_opt_str(reader: &mut PackReader) -> DattyResult<Option<String>> {
    if reader.try_read_nil()? {
        Ok(None)
    } else {
        reader.read_str().map(Some)
    }
}

/// Read an array of strings; NIL elements are dropped and a NIL array is
/// empty.
pub fn read_str_array(reader: &mut PackReader) -> DattyResult<Vec<String>> {
    if reader.try_read_nil()? {
        return Ok(Vec::new());
    }
    let size = reader.read_array_header()?;
    let mut values = Vec::with_capacity(size);
    for _ in 0..size {
        if let Some(value) = read_opt_str(reader)? {
            values.push(value);
        }
    }
    Ok(values)
}
