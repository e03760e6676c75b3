//! Operation envelopes.
//!
//! Record operations carry the common query key (set name, optional super
//! key, major key, optional timeout) plus operation-specific fields. Set
//! operations such as [`SizeOperation`] address a whole set and carry no
//! major key. The opcode is written first; the rest follow in canonical
//! field order.

use super::field::{read_fields, read_opt_str, read_str_array, Field, FieldWriter};
use super::record::{Record, UpdatePolicy};
use super::version::Version;
use crate::codec::{Limits, PackReader, PackWriter, ReadMode};
use crate::core::error::{DattyError, DattyResult};
use bytes::Bytes;

/// Operation discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    Head = 1,
    Fetch = 2,
    Put = 3,
    CompareAndSet = 4,
    Remove = 5,
    Size = 6,
}

impl OpCode {
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for OpCode {
    type Error = i64;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(OpCode::Head),
            2 => Ok(OpCode::Fetch),
            3 => Ok(OpCode::Put),
            4 => Ok(OpCode::CompareAndSet),
            5 => Ok(OpCode::Remove),
            6 => Ok(OpCode::Size),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpCode::Head => write!(f, "HEAD"),
            OpCode::Fetch => write!(f, "FETCH"),
            OpCode::Put => write!(f, "PUT"),
            OpCode::CompareAndSet => write!(f, "COMPARE_AND_SET"),
            OpCode::Remove => write!(f, "REMOVE"),
            OpCode::Size => write!(f, "SIZE"),
        }
    }
}

/// Address of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub set_name: String,
    pub super_key: Option<String>,
    pub major_key: String,
    pub timeout_ms: Option<i64>,
}

impl QueryKey {
    pub fn new(set_name: impl Into<String>, major_key: impl Into<String>) -> Self {
        Self {
            set_name: set_name.into(),
            super_key: None,
            major_key: major_key.into(),
            timeout_ms: None,
        }
    }

    pub fn with_super_key(mut self, super_key: impl Into<String>) -> Self {
        self.super_key = Some(super_key.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Reject keys that cannot address a record.
    pub fn validate(&self) -> DattyResult<()> {
        if self.set_name.is_empty() {
            return Err(DattyError::usage("set name is required"));
        }
        if self.major_key.is_empty() {
            return Err(DattyError::usage("major key is required"));
        }
        Ok(())
    }

    fn write_fields(&self, fields: &mut FieldWriter<'_>) -> DattyResult<()> {
        fields.write_str(Field::SetName, &self.set_name)?;
        fields.write_opt_str(Field::SuperKey, self.super_key.as_deref())?;
        fields.write_str(Field::MajorKey, &self.major_key)?;
        if let Some(timeout) = self.timeout_ms {
            fields.write_i64(Field::TimeoutMls, timeout)?;
        }
        Ok(())
    }
}

/// Which minor keys an operation addresses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MinorKeys {
    #[default]
    All,
    Only(Vec<String>),
}

impl MinorKeys {
    fn write_fields(&self, fields: &mut FieldWriter<'_>) -> DattyResult<()> {
        match self {
            MinorKeys::All => fields.write_bool(Field::AllMinorKeys, true),
            MinorKeys::Only(keys) => fields.write_str_array(Field::MinorKeys, keys),
        }
    }
}

/// Existence check returning the version and minor-key names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadOperation {
    pub key: QueryKey,
}

/// Read of all or some columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOperation {
    pub key: QueryKey,
    pub minor_keys: MinorKeys,
}

/// Write, unconditional unless `use_version` is set.
///
/// With `use_version` the write only applies when the stored version equals
/// `version`, or when no record exists and `version` is absent. A mismatch
/// fails the operation with a version conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOperation {
    pub key: QueryKey,
    pub record: Record,
    pub ttl_seconds: Option<u32>,
    pub update_policy: UpdatePolicy,
    pub use_version: bool,
    pub version: Option<Version>,
}

/// Write conditional on the stored version.
///
/// With `expected_version` absent the write only succeeds if the record
/// does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareAndSetOperation {
    pub key: QueryKey,
    pub expected_version: Option<Version>,
    pub record: Record,
    pub ttl_seconds: Option<u32>,
    pub update_policy: UpdatePolicy,
}

/// Removal of the whole record or some columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOperation {
    pub key: QueryKey,
    pub minor_keys: MinorKeys,
}

/// Count of live records in a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeOperation {
    pub set_name: String,
    pub timeout_ms: Option<i64>,
}

impl SizeOperation {
    pub fn new(set_name: impl Into<String>) -> Self {
        Self {
            set_name: set_name.into(),
            timeout_ms: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// A single operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Head(HeadOperation),
    Fetch(FetchOperation),
    Put(PutOperation),
    CompareAndSet(CompareAndSetOperation),
    Remove(RemoveOperation),
    Size(SizeOperation),
}

impl Operation {
    pub fn head(key: QueryKey) -> Self {
        Operation::Head(HeadOperation { key })
    }

    pub fn fetch(key: QueryKey, minor_keys: MinorKeys) -> Self {
        Operation::Fetch(FetchOperation { key, minor_keys })
    }

    pub fn put(key: QueryKey, record: Record) -> Self {
        Operation::Put(PutOperation {
            key,
            record,
            ttl_seconds: None,
            update_policy: UpdatePolicy::default(),
            use_version: false,
            version: None,
        })
    }

    pub fn compare_and_set(key: QueryKey, expected_version: Option<Version>, record: Record) -> Self {
        Operation::CompareAndSet(CompareAndSetOperation {
            key,
            expected_version,
            record,
            ttl_seconds: None,
            update_policy: UpdatePolicy::default(),
        })
    }

    pub fn remove(key: QueryKey, minor_keys: MinorKeys) -> Self {
        Operation::Remove(RemoveOperation { key, minor_keys })
    }

    pub fn size(set_name: impl Into<String>) -> Self {
        Operation::Size(SizeOperation::new(set_name))
    }

    /// Make a put conditional on the stored version. `None` requires that
    /// no record exists.
    pub fn with_version(mut self, version: Option<Version>) -> Self {
        if let Operation::Put(op) = &mut self {
            op.use_version = true;
            op.version = version;
        }
        self
    }

    /// Set the update policy of a put or compare-and-set.
    pub fn with_update_policy(mut self, policy: UpdatePolicy) -> Self {
        match &mut self {
            Operation::Put(op) => op.update_policy = policy,
            Operation::CompareAndSet(op) => op.update_policy = policy,
            _ => {}
        }
        self
    }

    /// Set the TTL of a put or compare-and-set.
    pub fn with_ttl_seconds(mut self, ttl: u32) -> Self {
        match &mut self {
            Operation::Put(op) => op.ttl_seconds = Some(ttl),
            Operation::CompareAndSet(op) => op.ttl_seconds = Some(ttl),
            _ => {}
        }
        self
    }

    pub fn opcode(&self) -> OpCode {
        match self {
            Operation::Head(_) => OpCode::Head,
            Operation::Fetch(_) => OpCode::Fetch,
            Operation::Put(_) => OpCode::Put,
            Operation::CompareAndSet(_) => OpCode::CompareAndSet,
            Operation::Remove(_) => OpCode::Remove,
            Operation::Size(_) => OpCode::Size,
        }
    }

    /// Record address; `None` for set operations.
    pub fn key(&self) -> Option<&QueryKey> {
        match self {
            Operation::Head(op) => Some(&op.key),
            Operation::Fetch(op) => Some(&op.key),
            Operation::Put(op) => Some(&op.key),
            Operation::CompareAndSet(op) => Some(&op.key),
            Operation::Remove(op) => Some(&op.key),
            Operation::Size(_) => None,
        }
    }

    pub fn set_name(&self) -> &str {
        match self {
            Operation::Size(op) => &op.set_name,
            _ => self.key().map_or("", |key| key.set_name.as_str()),
        }
    }

    /// Reject operations that cannot address a record or set.
    pub fn validate(&self) -> DattyResult<()> {
        match self {
            Operation::Size(op) if op.set_name.is_empty() => {
                Err(DattyError::usage("set name is required"))
            }
            Operation::Size(_) => Ok(()),
            _ => self.key().map_or(Ok(()), QueryKey::validate),
        }
    }

    /// Append the encoding of this operation.
    pub fn write(&self, writer: &mut PackWriter, numeric: bool) -> DattyResult<()> {
        let mut fields = FieldWriter::begin(writer, numeric)?;
        fields.write_i64(Field::OpCode, self.opcode().code())?;
        if let Some(key) = self.key() {
            key.write_fields(&mut fields)?;
        }
        match self {
            Operation::Head(_) => {}
            Operation::Fetch(op) => op.minor_keys.write_fields(&mut fields)?,
            Operation::Put(op) => {
                if let Some(version) = op.version.as_ref().filter(|_| op.use_version) {
                    fields.write_with(Field::Version, |w, numeric| version.write(w, numeric))?;
                }
                fields.write_with(Field::Record, |w, _| op.record.write(w))?;
                write_ttl(&mut fields, op.ttl_seconds)?;
                fields.write_i64(Field::UpdatePolicy, op.update_policy.code())?;
                if op.use_version {
                    fields.write_bool(Field::UseVersion, true)?;
                }
            }
            Operation::CompareAndSet(op) => {
                if let Some(version) = &op.expected_version {
                    fields.write_with(Field::Version, |w, numeric| version.write(w, numeric))?;
                }
                fields.write_with(Field::Record, |w, _| op.record.write(w))?;
                write_ttl(&mut fields, op.ttl_seconds)?;
                fields.write_i64(Field::UpdatePolicy, op.update_policy.code())?;
            }
            Operation::Remove(op) => op.minor_keys.write_fields(&mut fields)?,
            Operation::Size(op) => {
                fields.write_str(Field::SetName, &op.set_name)?;
                if let Some(timeout) = op.timeout_ms {
                    fields.write_i64(Field::TimeoutMls, timeout)?;
                }
            }
        }
        fields.finish()
    }

    /// Encode into a fresh buffer.
    pub fn to_bytes(&self, numeric: bool) -> DattyResult<Bytes> {
        let mut writer = PackWriter::new();
        self.write(&mut writer, numeric)?;
        Ok(writer.finish())
    }

    /// Read an operation. Fields may come in any order.
    pub fn read(reader: &mut PackReader, mode: ReadMode) -> DattyResult<Operation> {
        let mut acc = OperationFields::default();
        read_fields(reader, |field, r| acc.read_field(field, r, mode))?;
        acc.build()
    }

    /// Decode one operation from `bytes`.
    pub fn decode(bytes: Bytes, limits: Limits, mode: ReadMode) -> DattyResult<Operation> {
        let mut reader = PackReader::with_limits(bytes, limits);
        Self::read(&mut reader, mode)
    }
}

fn write_ttl(fields: &mut FieldWriter<'_>, ttl: Option<u32>) -> DattyResult<()> {
    match ttl {
        Some(ttl) => fields.write_i64(Field::TtlSec, ttl as i64),
        None => Ok(()),
    }
}

/// Fields collected while reading, before the opcode is known.
#[derive(Default)]
struct OperationFields {
    opcode: Option<OpCode>,
    set_name: Option<String>,
    super_key: Option<String>,
    major_key: Option<String>,
    timeout_ms: Option<i64>,
    version: Option<Version>,
    record: Option<Record>,
    ttl_seconds: Option<u32>,
    update_policy: Option<UpdatePolicy>,
    minor_keys: Option<Vec<String>>,
    all_minor_keys: bool,
    use_version: bool,
}

impl OperationFields {
    fn read_field(&mut self, field: Field, r: &mut PackReader, mode: ReadMode) -> DattyResult<bool> {
        match field {
            Field::OpCode => {
                let code = r.read_i64()?;
                self.opcode = Some(OpCode::try_from(code).map_err(|code| {
                    DattyError::parse(format!("invalid opcode {}", code))
                })?);
            }
            Field::SetName => self.set_name = read_opt_str(r)?,
            Field::SuperKey => self.super_key = read_opt_str(r)?,
            Field::MajorKey => self.major_key = read_opt_str(r)?,
            Field::TimeoutMls => self.timeout_ms = Some(r.read_i64()?),
            Field::Version => self.version = Version::read(r)?,
            Field::Record => self.record = Record::read(r, mode)?,
            Field::TtlSec => {
                let ttl = r.read_i64()?;
                self.ttl_seconds = Some(
                    u32::try_from(ttl)
                        .map_err(|_| DattyError::parse(format!("invalid ttl {}", ttl)))?,
                );
            }
            Field::UpdatePolicy => {
                let code = r.read_i64()?;
                self.update_policy = Some(UpdatePolicy::try_from(code).map_err(|code| {
                    DattyError::parse(format!("invalid update policy {}", code))
                })?);
            }
            Field::MinorKeys => self.minor_keys = Some(read_str_array(r)?),
            Field::AllMinorKeys => self.all_minor_keys = r.read_bool()?,
            Field::UseVersion => self.use_version = r.read_bool()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn minor_keys(&mut self) -> MinorKeys {
        match self.minor_keys.take() {
            Some(keys) if !self.all_minor_keys => MinorKeys::Only(keys),
            _ => MinorKeys::All,
        }
    }

    fn query_key(&mut self, set_name: String) -> DattyResult<QueryKey> {
        Ok(QueryKey {
            set_name,
            super_key: self.super_key.take(),
            major_key: self
                .major_key
                .take()
                .ok_or_else(|| DattyError::parse("operation without majorKey"))?,
            timeout_ms: self.timeout_ms,
        })
    }

    fn build(mut self) -> DattyResult<Operation> {
        let opcode = self
            .opcode
            .ok_or_else(|| DattyError::parse("operation without opcode"))?;
        let set_name = self
            .set_name
            .take()
            .ok_or_else(|| DattyError::parse("operation without setName"))?;
        let operation = match opcode {
            OpCode::Size => Operation::Size(SizeOperation {
                set_name,
                timeout_ms: self.timeout_ms,
            }),
            OpCode::Head => Operation::Head(HeadOperation {
                key: self.query_key(set_name)?,
            }),
            OpCode::Fetch => Operation::Fetch(FetchOperation {
                key: self.query_key(set_name)?,
                minor_keys: self.minor_keys(),
            }),
            OpCode::Put => Operation::Put(PutOperation {
                key: self.query_key(set_name)?,
                record: self.record.unwrap_or_default(),
                ttl_seconds: self.ttl_seconds,
                update_policy: self.update_policy.unwrap_or_default(),
                // A version implies the check even without the flag.
                use_version: self.use_version || self.version.is_some(),
                version: self.version,
            }),
            OpCode::CompareAndSet => Operation::CompareAndSet(CompareAndSetOperation {
                key: self.query_key(set_name)?,
                expected_version: self.version,
                record: self.record.unwrap_or_default(),
                ttl_seconds: self.ttl_seconds,
                update_policy: self.update_policy.unwrap_or_default(),
            }),
            OpCode::Remove => Operation::Remove(RemoveOperation {
                key: self.query_key(set_name)?,
                minor_keys: self.minor_keys(),
            }),
        };
        Ok(operation)
    }
}
