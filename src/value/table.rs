//! Tables keyed by integers or strings.
//!
//! A table starts empty; the first inserted key fixes its keying for good.
//! String-keyed tables keep insertion order. Integer-keyed tables are sparse
//! and iterate in ascending key order.
//!
//! Updates are functional: [`PackableTable::put`] and
//! [`PackableTable::put_entry`] leave the receiver untouched and return the
//! updated table.

use super::expression::PathExpression;
use super::number::PackableNumber;
use super::stringify::is_index;
use super::string::PackableString;
use super::PackableValue;
use crate::core::error::{DattyError, DattyResult};
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

/// Keying mode of a non-empty table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKeying {
    Int,
    Str,
}

/// Owned table key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableKey {
    Int(i64),
    Str(String),
}

impl TableKey {
    fn keying(&self) -> TableKeying {
        match self {
            Self::Int(_) => TableKeying::Int,
            Self::Str(_) => TableKeying::Str,
        }
    }
}

impl From<i64> for TableKey {
    fn from(k: i64) -> Self {
        Self::Int(k)
    }
}

impl From<i32> for TableKey {
    fn from(k: i32) -> Self {
        Self::Int(k as i64)
    }
}

impl From<&str> for TableKey {
    fn from(k: &str) -> Self {
        Self::Str(k.to_string())
    }
}

impl From<String> for TableKey {
    fn from(k: String) -> Self {
        Self::Str(k)
    }
}

impl std::fmt::Display for TableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(k) => write!(f, "{}", k),
            Self::Str(k) => f.write_str(k),
        }
    }
}

/// Borrowed table key yielded by iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRef<'a> {
    Int(i64),
    Str(&'a str),
}

impl KeyRef<'_> {
    pub fn to_owned_key(self) -> TableKey {
        match self {
            Self::Int(k) => TableKey::Int(k),
            Self::Str(k) => TableKey::Str(k.to_string()),
        }
    }
}

/// Insertion-ordered string entries with a lookup index.
#[derive(Debug, Clone, Default)]
struct StrEntries {
    entries: Vec<(String, PackableValue)>,
    index: HashMap<String, usize>,
}

impl StrEntries {
    fn get(&self, key: &str) -> Option<&PackableValue> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut PackableValue> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    fn insert(&mut self, key: String, value: PackableValue) {
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
enum Entries {
    #[default]
    Empty,
    Int(BTreeMap<i64, PackableValue>),
    Str(StrEntries),
}

/// A table of packable values.
#[derive(Debug, Clone, Default)]
pub struct PackableTable {
    entries: Entries,
}

impl PackableTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keying mode, or `None` while the table is empty.
    pub fn keying(&self) -> Option<TableKeying> {
        match self.entries {
            Entries::Empty => None,
            Entries::Int(_) => Some(TableKeying::Int),
            Entries::Str(_) => Some(TableKeying::Str),
        }
    }

    pub fn len(&self) -> usize {
        match &self.entries {
            Entries::Empty => 0,
            Entries::Int(m) => m.len(),
            Entries::Str(s) => s.entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate entries: ascending for integer keys, insertion order for
    /// string keys.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (KeyRef<'_>, &PackableValue)> + '_> {
        match &self.entries {
            Entries::Empty => Box::new(std::iter::empty()),
            Entries::Int(m) => Box::new(m.iter().map(|(k, v)| (KeyRef::Int(*k), v))),
            Entries::Str(s) => Box::new(
                s.entries
                    .iter()
                    .map(|(k, v)| (KeyRef::Str(k.as_str()), v)),
            ),
        }
    }

    /// Value stored under `key`.
    pub fn get_entry(&self, key: &TableKey) -> Option<&PackableValue> {
        match (&self.entries, key) {
            (Entries::Int(m), TableKey::Int(k)) => m.get(k),
            (Entries::Str(s), TableKey::Str(k)) => s.get(k),
            _ => None,
        }
    }

    /// Value stored under integer key `index`.
    pub fn get_index(&self, index: i64) -> Option<&PackableValue> {
        match &self.entries {
            Entries::Int(m) => m.get(&index),
            _ => None,
        }
    }

    /// Value stored under string key `name`.
    pub fn get_field(&self, name: &str) -> Option<&PackableValue> {
        match &self.entries {
            Entries::Str(s) => s.get(name),
            _ => None,
        }
    }

    /// Return a copy of this table with `key` set to `value`.
    ///
    /// Fails with a usage error if the key kind conflicts with the table's
    /// keying.
    pub fn put_entry(
        &self,
        key: impl Into<TableKey>,
        value: impl Into<PackableValue>,
    ) -> DattyResult<Self> {
        let mut table = self.clone();
        table.insert(key.into(), value.into())?;
        Ok(table)
    }

    /// Navigate `path`; absent if any segment is missing or crosses a
    /// non-table value.
    pub fn get(&self, path: &PathExpression) -> Option<&PackableValue> {
        let (last, parents) = path.segments().split_last()?;
        let mut table = self;
        for segment in parents {
            match table.lookup(segment)? {
                PackableValue::Table(inner) => table = inner,
                _ => return None,
            }
        }
        table.lookup(last)
    }

    /// Return a copy of this table with `value` stored at `path`.
    ///
    /// Missing intermediate tables are created. Fails with a usage error for
    /// an empty path, a segment whose kind conflicts with an existing
    /// table's keying, or an intermediate segment holding a non-table value.
    /// On failure nothing is modified.
    pub fn put(&self, path: &PathExpression, value: impl Into<PackableValue>) -> DattyResult<Self> {
        if path.is_empty() {
            return Err(DattyError::usage("cannot put at an empty path"));
        }
        let mut table = self.clone();
        table.put_segments(path.segments(), value.into())?;
        Ok(table)
    }

    pub fn get_number(&self, path: &PathExpression) -> Option<PackableNumber> {
        match self.get(path)? {
            PackableValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_string(&self, path: &PathExpression) -> Option<&PackableString> {
        match self.get(path)? {
            PackableValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, path: &PathExpression) -> Option<bool> {
        match self.get(path)? {
            PackableValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_table(&self, path: &PathExpression) -> Option<&PackableTable> {
        match self.get(path)? {
            PackableValue::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Insert in place. The first key fixes the keying.
    pub(crate) fn insert(&mut self, key: TableKey, value: PackableValue) -> DattyResult<()> {
        if let Some(keying) = self.keying() {
            if keying != key.keying() {
                return Err(DattyError::usage(format!(
                    "{:?} key {} conflicts with {:?}-keyed table",
                    key.keying(),
                    key,
                    keying
                )));
            }
        }
        match key {
            TableKey::Int(k) => match &mut self.entries {
                Entries::Int(m) => {
                    m.insert(k, value);
                }
                _ => self.entries = Entries::Int(BTreeMap::from([(k, value)])),
            },
            TableKey::Str(k) => match &mut self.entries {
                Entries::Str(s) => s.insert(k, value),
                _ => {
                    let mut s = StrEntries::default();
                    s.insert(k, value);
                    self.entries = Entries::Str(s);
                }
            },
        }
        Ok(())
    }

    /// Resolve a path segment against this table's keying for reads.
    fn lookup(&self, segment: &str) -> Option<&PackableValue> {
        match &self.entries {
            Entries::Empty => None,
            Entries::Int(m) => segment_index(segment).and_then(|k| m.get(&k)),
            Entries::Str(s) => s.get(segment),
        }
    }

    /// Resolve a path segment against this table's keying for writes.
    fn key_for(&self, segment: &str) -> DattyResult<TableKey> {
        match self.keying() {
            Some(TableKeying::Str) => Ok(TableKey::Str(segment.to_string())),
            Some(TableKeying::Int) => segment_index(segment).map(TableKey::Int).ok_or_else(|| {
                DattyError::usage(format!(
                    "segment {:?} is not an index of an integer-keyed table",
                    segment
                ))
            }),
            None if is_index(segment) => segment_index(segment)
                .map(TableKey::Int)
                .ok_or_else(|| DattyError::usage(format!("index {:?} out of range", segment))),
            None => Ok(TableKey::Str(segment.to_string())),
        }
    }

    fn get_entry_mut(&mut self, key: &TableKey) -> Option<&mut PackableValue> {
        match (&mut self.entries, key) {
            (Entries::Int(m), TableKey::Int(k)) => m.get_mut(k),
            (Entries::Str(s), TableKey::Str(k)) => s.get_mut(k),
            _ => None,
        }
    }

    /// Errors surface before anything is attached, so a failed put leaves
    /// the table as it was.
    fn put_segments(&mut self, segments: &[String], value: PackableValue) -> DattyResult<()> {
        let Some((head, rest)) = segments.split_first() else {
            return Err(DattyError::usage("cannot put at an empty path"));
        };
        let key = self.key_for(head)?;
        if rest.is_empty() {
            return self.insert(key, value);
        }
        match self.get_entry_mut(&key) {
            Some(PackableValue::Table(child)) => child.put_segments(rest, value),
            Some(other) => Err(DattyError::usage(format!(
                "segment {:?} holds a {}, not a table",
                head,
                other.type_name()
            ))),
            None => {
                let mut child = PackableTable::new();
                child.put_segments(rest, value)?;
                self.insert(key, PackableValue::Table(child))
            }
        }
    }
}

fn segment_index(segment: &str) -> Option<i64> {
    if is_index(segment) {
        segment.parse().ok()
    } else {
        None
    }
}

impl PartialEq for PackableTable {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for PackableTable {}

impl Hash for PackableTable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for (key, value) in self.iter() {
            match key {
                KeyRef::Int(k) => k.hash(state),
                KeyRef::Str(k) => k.hash(state),
            }
            value.hash(state);
        }
    }
}

impl PackableTable {
    /// Build a table from entries. An integer key after a string key is
    /// stored in its string form; a string key in an integer-keyed table is
    /// a usage error.
    pub fn try_from_entries<I, K, V>(entries: I) -> DattyResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<TableKey>,
        V: Into<PackableValue>,
    {
        let mut table = PackableTable::new();
        for (k, v) in entries {
            let key = coerce_entry_key(table.keying(), k.into());
            table.insert(key, v.into())?;
        }
        Ok(table)
    }
}

fn coerce_entry_key(keying: Option<TableKeying>, key: TableKey) -> TableKey {
    match (keying, key) {
        (Some(TableKeying::Str), TableKey::Int(i)) => TableKey::Str(i.to_string()),
        (_, key) => key,
    }
}

/// Lossy collection: a string key arriving after integer keys cannot be
/// stored and the entry is dropped with a warning. Use
/// [`PackableTable::try_from_entries`] to have it reported instead.
impl<K: Into<TableKey>, V: Into<PackableValue>> FromIterator<(K, V)> for PackableTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = PackableTable::new();
        for (k, v) in iter {
            let key = coerce_entry_key(table.keying(), k.into());
            if let Err(e) = table.insert(key, v.into()) {
                tracing::warn!(error = %e, "dropping table entry");
            }
        }
        table
    }
}
