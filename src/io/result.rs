//! Result envelopes.
//!
//! A result is written as `rescode` followed by the result's own fields in
//! canonical order. Absent optional fields are omitted.

use super::field::{read_fields, read_opt_str, read_str_array, Field, FieldWriter};
use super::record::Record;
use super::version::Version;
use crate::codec::{Limits, PackReader, PackWriter, ReadMode};
use crate::core::error::{DattyError, DattyResult, ErrCode};
use bytes::Bytes;

/// Result discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResCode {
    Fetch = 1,
    Head = 2,
    Put = 3,
    CompareAndSet = 4,
    Remove = 5,
    Error = 6,
    Size = 7,
}

impl ResCode {
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for ResCode {
    type Error = i64;

    fn try_from(code: i64) -> Result<Self, i64> {
        match code {
            1 => Ok(ResCode::Fetch),
            2 => Ok(ResCode::Head),
            3 => Ok(ResCode::Put),
            4 => Ok(ResCode::CompareAndSet),
            5 => Ok(ResCode::Remove),
            6 => Ok(ResCode::Error),
            7 => Ok(ResCode::Size),
            other => Err(other),
        }
    }
}

/// Outcome of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Version and minor-key names of an existing record; both absent when
    /// the record does not exist.
    Head {
        version: Option<Version>,
        minor_keys: Vec<String>,
    },
    /// Version and requested columns; both absent when the record does not
    /// exist.
    Fetch {
        version: Option<Version>,
        record: Option<Record>,
    },
    /// Version after the write; absent when the write removed the record.
    Put { version: Option<Version> },
    /// Whether the conditional write was applied, and the version after it.
    CompareAndSet {
        updated: bool,
        version: Option<Version>,
    },
    Remove,
    Error { code: ErrCode, message: String },
    /// Number of live records in the set.
    Size { count: u64 },
}

impl OperationResult {
    /// Error result for `error`.
    pub fn from_error(error: &DattyError) -> Self {
        OperationResult::Error {
            code: ErrCode::from(error),
            message: error.to_string(),
        }
    }

    pub fn rescode(&self) -> ResCode {
        match self {
            OperationResult::Head { .. } => ResCode::Head,
            OperationResult::Fetch { .. } => ResCode::Fetch,
            OperationResult::Put { .. } => ResCode::Put,
            OperationResult::CompareAndSet { .. } => ResCode::CompareAndSet,
            OperationResult::Remove => ResCode::Remove,
            OperationResult::Error { .. } => ResCode::Error,
            OperationResult::Size { .. } => ResCode::Size,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, OperationResult::Error { .. })
    }

    /// Version carried by the result, if any.
    pub fn version(&self) -> Option<&Version> {
        match self {
            OperationResult::Head { version, .. }
            | OperationResult::Fetch { version, .. }
            | OperationResult::Put { version }
            | OperationResult::CompareAndSet { version, .. } => version.as_ref(),
            OperationResult::Remove
            | OperationResult::Error { .. }
            | OperationResult::Size { .. } => None,
        }
    }

    /// Append the encoding of this result.
    pub fn write(&self, writer: &mut PackWriter, numeric: bool) -> DattyResult<()> {
        let mut fields = FieldWriter::begin(writer, numeric)?;
        fields.write_i64(Field::ResCode, self.rescode().code())?;
        if let Some(version) = self.version() {
            fields.write_with(Field::Version, |w, numeric| version.write(w, numeric))?;
        }
        match self {
            OperationResult::Head { minor_keys, .. } => {
                if !minor_keys.is_empty() {
                    fields.write_str_array(Field::MinorKeys, minor_keys)?;
                }
            }
            OperationResult::Fetch { record, .. } => {
                if let Some(record) = record {
                    fields.write_with(Field::Record, |w, _| record.write(w))?;
                }
            }
            OperationResult::CompareAndSet { updated, .. } => {
                fields.write_bool(Field::Updated, *updated)?;
            }
            OperationResult::Error { code, message } => {
                fields.write_i64(Field::ErrCode, code.code())?;
                fields.write_str(Field::ErrMessage, message)?;
            }
            OperationResult::Size { count } => {
                let count = i64::try_from(*count)
                    .map_err(|_| DattyError::usage(format!("count {} out of range", count)))?;
                fields.write_i64(Field::Count, count)?;
            }
            OperationResult::Put { .. } | OperationResult::Remove => {}
        }
        fields.finish()
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self, numeric: bool) -> DattyResult<Bytes> {
        let mut writer = PackWriter::new();
        self.write(&mut writer, numeric)?;
        Ok(writer.finish())
    }

    /// Read a result. Fields may come in any order.
    pub fn read(reader: &mut PackReader, mode: ReadMode) -> DattyResult<OperationResult> {
        let mut acc = ResultFields::default();
        read_fields(reader, |field, r| acc.read_field(field, r, mode))?;
        acc.build()
    }

    /// Decode one result from `bytes`.
    pub fn decode(bytes: Bytes, limits: Limits, mode: ReadMode) -> DattyResult<OperationResult> {
        let mut reader = PackReader::with_limits(bytes, limits);
        Self::read(&mut reader, mode)
    }
}

#[derive(Default)]
struct ResultFields {
    rescode: Option<ResCode>,
    version: Option<Version>,
    record: Option<Record>,
    minor_keys: Vec<String>,
    updated: bool,
    err_code: Option<i64>,
    err_message: Option<String>,
    count: u64,
}

impl ResultFields {
    fn read_field(&mut self, field: Field, r: &mut PackReader, mode: ReadMode) -> DattyResult<bool> {
        match field {
            Field::ResCode => {
                let code = r.read_i64()?;
                self.rescode = Some(ResCode::try_from(code).map_err(|code| {
                    DattyError::parse(format!("invalid rescode {}", code))
                })?);
            }
            Field::Version => self.version = Version::read(r)?,
            Field::Record => self.record = Record::read(r, mode)?,
            Field::MinorKeys => self.minor_keys.extend(read_str_array(r)?),
            Field::Updated => self.updated = r.read_bool()?,
            Field::ErrCode => self.err_code = Some(r.read_i64()?),
            Field::ErrMessage => self.err_message = read_opt_str(r)?,
            Field::Count => {
                let count = r.read_i64()?;
                self.count = u64::try_from(count)
                    .map_err(|_| DattyError::parse(format!("invalid count {}", count)))?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn build(self) -> DattyResult<OperationResult> {
        let rescode = self
            .rescode
            .ok_or_else(|| DattyError::parse("result without rescode"))?;
        let result = match rescode {
            ResCode::Head => OperationResult::Head {
                version: self.version,
                minor_keys: self.minor_keys,
            },
            ResCode::Fetch => OperationResult::Fetch {
                version: self.version,
                record: self.record,
            },
            ResCode::Put => OperationResult::Put {
                version: self.version,
            },
            ResCode::CompareAndSet => OperationResult::CompareAndSet {
                updated: self.updated,
                version: self.version,
            },
            ResCode::Remove => OperationResult::Remove,
            ResCode::Error => OperationResult::Error {
                // Codes from newer peers degrade to Unknown.
                code: self
                    .err_code
                    .and_then(ErrCode::from_code)
                    .unwrap_or(ErrCode::Unknown),
                message: self.err_message.unwrap_or_default(),
            },
            ResCode::Size => OperationResult::Size { count: self.count },
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(result: &OperationResult, numeric: bool) -> OperationResult {
        let bytes = result.to_bytes(numeric).unwrap();
        OperationResult::decode(bytes, Limits::default(), ReadMode::Copy).unwrap()
    }

    #[test]
    fn test_round_trip_all_kinds() {
        let results = vec![
            OperationResult::Head {
                version: Some(Version::Long(2)),
                minor_keys: vec!["a".into(), "b".into()],
            },
            OperationResult::Head {
                version: None,
                minor_keys: vec![],
            },
            OperationResult::Fetch {
                version: Some(Version::Long(1)),
                record: Some(Record::new().with("a", "1")),
            },
            OperationResult::Fetch {
                version: None,
                record: None,
            },
            OperationResult::Put {
                version: Some(Version::Long(3)),
            },
            OperationResult::CompareAndSet {
                updated: false,
                version: Some(Version::String(Some("etag".into()))),
            },
            OperationResult::Remove,
            OperationResult::Error {
                code: ErrCode::BadPayload,
                message: "parse error: truncated".into(),
            },
            OperationResult::Size { count: 0 },
            OperationResult::Size { count: 70_000 },
        ];
        for result in &results {
            assert_eq!(&round_trip(result, true), result);
            assert_eq!(&round_trip(result, false), result);
        }
    }

    #[test]
    fn test_fetch_layout() {
        let result = OperationResult::Fetch {
            version: Some(Version::Long(1)),
            record: Some(Record::new().with("a", vec![7u8])),
        };
        let bytes = result.to_bytes(true).unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[
                0x83, 2, 1, 20, 0x82, 29, 1, 30, 1, 21, 0x81, 0xa1, b'a', 0xc4, 1, 7
            ]
        );
    }

    #[test]
    fn test_remove_layout() {
        let bytes = OperationResult::Remove.to_bytes(true).unwrap();
        assert_eq!(bytes.as_ref(), &[0x81, 2, 5]);
    }

    #[test]
    fn test_size_layout() {
        let bytes = OperationResult::Size { count: 3 }.to_bytes(true).unwrap();
        assert_eq!(bytes.as_ref(), &[0x82, 2, 7, 33, 3]);
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut w = PackWriter::new();
        w.write_map_header(2).unwrap();
        w.write_i64(Field::ResCode.code());
        w.write_i64(ResCode::Size.code());
        w.write_i64(Field::Count.code());
        w.write_i64(-1);
        let err = OperationResult::decode(w.finish(), Limits::default(), ReadMode::Copy).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_from_error() {
        let result = OperationResult::from_error(&DattyError::usage("major key is required"));
        assert_eq!(
            result,
            OperationResult::Error {
                code: ErrCode::BadArguments,
                message: "usage error: major key is required".into(),
            }
        );
        assert!(result.is_error());
    }

    #[test]
    fn test_unknown_err_code_degrades() {
        let mut w = PackWriter::new();
        w.write_map_header(2).unwrap();
        w.write_i64(Field::ResCode.code());
        w.write_i64(ResCode::Error.code());
        w.write_i64(Field::ErrCode.code());
        w.write_i64(42);
        let result = OperationResult::decode(w.finish(), Limits::default(), ReadMode::Copy).unwrap();
        assert_eq!(
            result,
            OperationResult::Error {
                code: ErrCode::Unknown,
                message: String::new(),
            }
        );
    }

    #[test]
    fn test_missing_rescode() {
        let mut w = PackWriter::new();
        w.write_map_header(0).unwrap();
        let err = OperationResult::decode(w.finish(), Limits::default(), ReadMode::Copy).unwrap_err();
        assert!(err.is_parse());
    }
}
