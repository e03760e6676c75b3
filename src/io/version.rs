//! Optimistic-concurrency version tokens.
//!
//! A version is written as a one- or two-entry tagged map: the
//! `versionType` discriminant, then `longValue` or `stringValue`. A string
//! version without a value omits `stringValue`.

use super::field::{read_fields, read_opt_str, Field, FieldWriter};
use crate::codec::{PackReader, PackWriter};
use crate::core::error::{DattyError, DattyResult};

/// Discriminant of a [`Version`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionType {
    Long = 1,
    String = 2,
}

impl VersionType {
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for VersionType {
    type Error = i64;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(VersionType::Long),
            2 => Ok(VersionType::String),
            other => Err(other),
        }
    }
}

/// Version token compared on conditional updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    Long(i64),
    String(Option<String>),
}

impl Version {
    pub fn version_type(&self) -> VersionType {
        match self {
            Version::Long(_) => VersionType::Long,
            Version::String(_) => VersionType::String,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Version::Long(v) => Some(*v),
            Version::String(_) => None,
        }
    }

    /// Append the encoding of this version.
    pub fn write(&self, writer: &mut PackWriter, numeric: bool) -> DattyResult<()> {
        let mut fields = FieldWriter::begin(writer, numeric)?;
        fields.write_i64(Field::VersionType, self.version_type().code())?;
        match self {
            Version::Long(v) => fields.write_i64(Field::LongValue, *v)?,
            Version::String(v) => fields.write_opt_str(Field::StringValue, v.as_deref())?,
        }
        fields.finish()
    }

    /// Read a version. NIL is absent; a missing or unknown discriminant is a
    /// parse error. Entries may come in any order.
    pub fn read(reader: &mut PackReader) -> DattyResult<Option<Version>> {
        if reader.try_read_nil()? {
            return Ok(None);
        }
        let mut version_type = None;
        let mut long_value = None;
        let mut string_value = None;
        read_fields(reader, |field, r| {
            match field {
                Field::VersionType => {
                    let code = r.read_i64()?;
                    let parsed = VersionType::try_from(code).map_err(|code| {
                        DattyError::parse(format!("invalid version type code {}", code))
                    })?;
                    version_type = Some(parsed);
                }
                Field::LongValue => long_value = Some(r.read_i64()?),
                Field::StringValue => string_value = read_opt_str(r)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        match version_type {
            Some(VersionType::Long) => Ok(Some(Version::Long(long_value.unwrap_or(0)))),
            Some(VersionType::String) => Ok(Some(Version::String(string_value))),
            None => Err(DattyError::parse("version without versionType")),
        }
    }
}

impl From<i64> for Version {
    fn from(v: i64) -> Self {
        Version::Long(v)
    }
}

impl From<&str> for Version {
    fn from(v: &str) -> Self {
        Version::String(Some(v.to_string()))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::Long(v) => write!(f, "{}", v),
            Version::String(Some(v)) => f.write_str(v),
            Version::String(None) => f.write_str("<none>"),
        }
    }
}
