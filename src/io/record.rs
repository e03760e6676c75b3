//! Records: minor-key columns with binary payloads.
//!
//! A [`Record`] maps minor keys to payloads. A column mapped to `None` is a
//! delete marker: it only has meaning in an update, where it removes that
//! column from the stored record. Records encode as a string-keyed MAP of
//! BIN values, with NIL for delete markers.

use crate::codec::{PackReader, PackWriter, Payload, ReadMode};
use crate::core::error::{DattyError, DattyResult};
use crate::io::version::Version;
use crate::value::PackableValue;
use std::collections::BTreeMap;

/// How an update combines with the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdatePolicy {
    /// Apply the given columns and keep the rest.
    #[default]
    Merge = 1,
    /// Store exactly the given columns.
    Replace = 2,
}

impl UpdatePolicy {
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for UpdatePolicy {
    type Error = i64;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(UpdatePolicy::Merge),
            2 => Ok(UpdatePolicy::Replace),
            other => Err(other),
        }
    }
}

/// Minor-key columns ordered by key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    columns: BTreeMap<String, Option<Payload>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column (builder style).
    pub fn with(mut self, minor_key: impl Into<String>, payload: impl Into<Payload>) -> Self {
        self.columns.insert(minor_key.into(), Some(payload.into()));
        self
    }

    /// Mark a column for deletion (builder style).
    pub fn without(mut self, minor_key: impl Into<String>) -> Self {
        self.columns.insert(minor_key.into(), None);
        self
    }

    /// Set a column to the encoding of `value`.
    pub fn with_value(self, minor_key: impl Into<String>, value: &PackableValue) -> DattyResult<Self> {
        Ok(self.with(minor_key, value.to_bytes()?))
    }

    pub fn put(&mut self, minor_key: impl Into<String>, payload: Option<Payload>) {
        self.columns.insert(minor_key.into(), payload);
    }

    /// Payload of a column; absent for missing columns and delete markers.
    pub fn get(&self, minor_key: &str) -> Option<&Payload> {
        self.columns.get(minor_key).and_then(Option::as_ref)
    }

    /// Decode a column as a value tree.
    pub fn get_value(&self, minor_key: &str) -> DattyResult<Option<PackableValue>> {
        match self.get(minor_key) {
            Some(payload) => PackableValue::decode(payload.clone().into_bytes(), ReadMode::Copy),
            None => Ok(None),
        }
    }

    pub fn contains(&self, minor_key: &str) -> bool {
        self.columns.contains_key(minor_key)
    }

    /// Check if `minor_key` is present as a delete marker.
    pub fn is_delete_marker(&self, minor_key: &str) -> bool {
        matches!(self.columns.get(minor_key), Some(None))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn minor_keys(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Payload>)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Check if any column is a delete marker.
    pub fn has_delete_markers(&self) -> bool {
        self.columns.values().any(Option::is_none)
    }

    /// Only the columns with payloads.
    pub fn values_only(&self) -> Record {
        Record {
            columns: self
                .columns
                .iter()
                .filter(|(_, v)| v.is_some())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Columns restricted to `minor_keys`.
    pub fn select(&self, minor_keys: &[String]) -> Record {
        Record {
            columns: minor_keys
                .iter()
                .filter_map(|k| self.columns.get_key_value(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Apply `update` to this record.
    ///
    /// `Replace` keeps exactly the update's payload columns. `Merge` drops
    /// every column the update names, delete markers included, then adds the
    /// update's payload columns.
    pub fn apply(&self, update: &Record, policy: UpdatePolicy) -> Record {
        match policy {
            UpdatePolicy::Replace => update.values_only(),
            UpdatePolicy::Merge => {
                let mut columns: BTreeMap<String, Option<Payload>> = self
                    .columns
                    .iter()
                    .filter(|(k, v)| v.is_some() && !update.columns.contains_key(*k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                for (k, v) in &update.columns {
                    if v.is_some() {
                        columns.insert(k.clone(), v.clone());
                    }
                }
                Record { columns }
            }
        }
    }

    /// Detach every payload from its transport buffer.
    pub fn into_owned(self) -> Record {
        Record {
            columns: self
                .columns
                .into_iter()
                .map(|(k, v)| (k, v.map(Payload::into_owned)))
                .collect(),
        }
    }

    /// Append the encoding of this record.
    pub fn write(&self, writer: &mut PackWriter) -> DattyResult<()> {
        writer.write_map_header(self.columns.len())?;
        for (minor_key, payload) in &self.columns {
            writer.write_str(minor_key)?;
            match payload {
                Some(payload) => writer.write_bin(payload.as_bytes())?,
                None => writer.write_nil(),
            }
        }
        Ok(())
    }

    /// Read a record. NIL is absent. Column values may be BIN, STR or NIL.
    pub fn read(reader: &mut PackReader, mode: ReadMode) -> DattyResult<Option<Record>> {
        if reader.try_read_nil()? {
            return Ok(None);
        }
        let size = reader.read_map_header()?;
        let mut record = Record::new();
        for _ in 0..size {
            let minor_key = reader.read_str()?;
            let format = reader.peek_format()?;
            let payload = if format.is_nil() {
                reader.read_nil()?;
                None
            } else if format.is_bin() {
                Some(reader.read_bin(mode)?)
            } else if format.is_str() {
                Some(reader.read_str_bytes(mode)?)
            } else {
                return Err(DattyError::parse(format!(
                    "column {:?} must be BIN or NIL, found {}",
                    minor_key, format
                )));
            };
            record.columns.insert(minor_key, payload);
        }
        Ok(Some(record))
    }
}

impl<K: Into<String>, P: Into<Payload>> FromIterator<(K, P)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, P)>>(iter: I) -> Self {
        Record {
            columns: iter
                .into_iter()
                .map(|(k, p)| (k.into(), Some(p.into())))
                .collect(),
        }
    }
}

/// A stored record with its owning major key and version counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedRecord {
    major_key: String,
    version: i64,
    record: Record,
}

impl VersionedRecord {
    /// First version of a record; delete markers in `values` are dropped.
    pub fn create(major_key: impl Into<String>, values: &Record) -> Self {
        Self {
            major_key: major_key.into(),
            version: 1,
            record: values.values_only(),
        }
    }

    pub fn major_key(&self) -> &str {
        &self.major_key
    }

    pub fn version(&self) -> Version {
        Version::Long(self.version)
    }

    pub fn version_number(&self) -> i64 {
        self.version
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Next version with `update` applied under `policy`.
    pub fn next(&self, update: &Record, policy: UpdatePolicy) -> Self {
        Self {
            major_key: self.major_key.clone(),
            version: self.version + 1,
            record: self.record.apply(update, policy),
        }
    }

    /// Next version with `minor_keys` removed.
    pub fn without(&self, minor_keys: &[String]) -> Self {
        let mut record = self.record.clone();
        for key in minor_keys {
            record.columns.remove(key);
        }
        Self {
            major_key: self.major_key.clone(),
            version: self.version + 1,
            record,
        }
    }

    /// Check if the given version matches this record's current one.
    pub fn matches(&self, version: &Version) -> bool {
        version.as_long() == Some(self.version)
    }
}
