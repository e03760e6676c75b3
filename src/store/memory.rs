//! In-process reference backend.
//!
//! Records live in a per-set map keyed by (super key, major key). Each
//! write bumps the record's long version. Expired records are treated as
//! absent by reads and dropped by the next write that touches them, or by
//! [`MemoryStore::purge_expired`].

use super::{Driver, DriverFuture};
use crate::core::config::StoreConfig;
use crate::core::error::{DattyError, DattyResult};
use crate::io::{
    CompareAndSetOperation, FetchOperation, HeadOperation, MinorKeys, Operation,
    OperationResult, PutOperation, QueryKey, Record, RemoveOperation, SizeOperation,
    UpdatePolicy, Version, VersionedRecord,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

type StorageKey = (Option<String>, String);

#[derive(Debug, Clone)]
struct Entry {
    record: VersionedRecord,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Reference [`Driver`] holding every record in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sets: RwLock<HashMap<String, HashMap<StorageKey, Entry>>>,
    default_ttl: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store applying `default_ttl` to records created without a TTL.
    pub fn with_default_ttl(default_ttl: Option<Duration>) -> Self {
        Self {
            sets: RwLock::default(),
            default_ttl,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::with_default_ttl(config.default_ttl())
    }

    fn storage_key(key: &QueryKey) -> StorageKey {
        (key.super_key.clone(), key.major_key.clone())
    }

    /// Number of live records in `set_name`.
    pub fn size(&self, set_name: &str) -> usize {
        let now = Instant::now();
        self.sets
            .read()
            .get(set_name)
            .map(|records| records.values().filter(|e| !e.is_expired(now)).count())
            .unwrap_or(0)
    }

    /// Drop every expired record. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sets = self.sets.write();
        let mut purged = 0;
        for (set_name, records) in sets.iter_mut() {
            let before = records.len();
            records.retain(|_, e| !e.is_expired(now));
            let dropped = before - records.len();
            if dropped > 0 {
                tracing::trace!(set = %set_name, dropped, "purged expired records");
            }
            purged += dropped;
        }
        purged
    }

    /// Live record at `key`, if any.
    fn live(&self, key: &QueryKey) -> Option<VersionedRecord> {
        let now = Instant::now();
        let sets = self.sets.read();
        sets.get(&key.set_name)?
            .get(&Self::storage_key(key))
            .filter(|e| !e.is_expired(now))
            .map(|e| e.record.clone())
    }

    /// Expiry for a write. An explicit TTL of zero clears expiry; no TTL
    /// keeps the current expiry of an existing record. A deadline past what
    /// `Instant` can represent never expires.
    fn expiry(&self, ttl_seconds: Option<u32>, current: Option<Option<Instant>>, now: Instant) -> Option<Instant> {
        match (ttl_seconds, current) {
            (Some(0), _) => None,
            (Some(ttl), _) => now.checked_add(Duration::from_secs(u64::from(ttl))),
            (None, Some(existing)) => existing,
            (None, None) => self.default_ttl.and_then(|ttl| now.checked_add(ttl)),
        }
    }

    /// Take the live entry at `storage_key` out of `records`, dropping it if
    /// expired.
    fn take_live(records: &mut HashMap<StorageKey, Entry>, storage_key: &StorageKey, now: Instant) -> Option<Entry> {
        let entry = records.remove(storage_key)?;
        if entry.is_expired(now) {
            tracing::trace!(major_key = %storage_key.1, "dropping expired record");
            return None;
        }
        Some(entry)
    }

    /// Apply `update` at `storage_key` and return the resulting version, or
    /// `None` when no record remains.
    fn write_locked(
        &self,
        records: &mut HashMap<StorageKey, Entry>,
        storage_key: StorageKey,
        update: &Record,
        policy: UpdatePolicy,
        ttl_seconds: Option<u32>,
        now: Instant,
    ) -> Option<Version> {
        let (next, expires_at) = match Self::take_live(records, &storage_key, now) {
            None => (
                VersionedRecord::create(storage_key.1.clone(), update),
                self.expiry(ttl_seconds, None, now),
            ),
            Some(entry) if update.is_empty() && policy == UpdatePolicy::Merge => {
                let version = entry.record.version();
                records.insert(storage_key, entry);
                return Some(version);
            }
            Some(entry) => (
                entry.record.next(update, policy),
                self.expiry(ttl_seconds, Some(entry.expires_at), now),
            ),
        };
        if next.record().is_empty() {
            tracing::debug!(major_key = %storage_key.1, "no columns left, record removed");
            return None;
        }
        let version = next.version();
        records.insert(
            storage_key,
            Entry {
                record: next,
                expires_at,
            },
        );
        Some(version)
    }

    fn head(&self, op: HeadOperation) -> OperationResult {
        match self.live(&op.key) {
            Some(record) => OperationResult::Head {
                version: Some(record.version()),
                minor_keys: record.record().minor_keys().map(String::from).collect(),
            },
            None => OperationResult::Head {
                version: None,
                minor_keys: Vec::new(),
            },
        }
    }

    fn fetch(&self, op: FetchOperation) -> OperationResult {
        match self.live(&op.key) {
            Some(record) => {
                let columns = match &op.minor_keys {
                    MinorKeys::All => record.record().clone(),
                    MinorKeys::Only(keys) => record.record().select(keys),
                };
                OperationResult::Fetch {
                    version: Some(record.version()),
                    record: Some(columns),
                }
            }
            None => OperationResult::Fetch {
                version: None,
                record: None,
            },
        }
    }

    fn put(&self, op: PutOperation) -> DattyResult<OperationResult> {
        let now = Instant::now();
        let update = op.record.into_owned();
        let storage_key = Self::storage_key(&op.key);
        let mut sets = self.sets.write();
        let records = sets.entry(op.key.set_name.clone()).or_default();
        if op.use_version {
            let current = records
                .get(&storage_key)
                .filter(|e| !e.is_expired(now))
                .map(|e| &e.record);
            check_version(op.version.as_ref(), current).inspect_err(|err| {
                tracing::debug!(
                    set = %op.key.set_name,
                    major_key = %op.key.major_key,
                    error = %err,
                    "versioned put rejected"
                );
            })?;
        }
        let version = self.write_locked(
            records,
            storage_key,
            &update,
            op.update_policy,
            op.ttl_seconds,
            now,
        );
        tracing::debug!(
            set = %op.key.set_name,
            major_key = %op.key.major_key,
            policy = ?op.update_policy,
            version = ?version,
            "put"
        );
        Ok(OperationResult::Put { version })
    }

    fn compare_and_set(&self, op: CompareAndSetOperation) -> OperationResult {
        let now = Instant::now();
        let update = op.record.into_owned();
        let storage_key = Self::storage_key(&op.key);
        let mut sets = self.sets.write();
        let records = sets.entry(op.key.set_name.clone()).or_default();
        let current = records
            .get(&storage_key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.record.clone());

        if let Err(err) = check_version(op.expected_version.as_ref(), current.as_ref()) {
            tracing::debug!(
                set = %op.key.set_name,
                major_key = %op.key.major_key,
                error = %err,
                "compare-and-set rejected"
            );
            return OperationResult::CompareAndSet {
                updated: false,
                version: current.map(|r| r.version()),
            };
        }

        let version = self.write_locked(
            records,
            storage_key,
            &update,
            op.update_policy,
            op.ttl_seconds,
            now,
        );
        tracing::debug!(
            set = %op.key.set_name,
            major_key = %op.key.major_key,
            version = ?version,
            "compare-and-set applied"
        );
        OperationResult::CompareAndSet {
            updated: true,
            version,
        }
    }

    fn remove(&self, op: RemoveOperation) -> OperationResult {
        let now = Instant::now();
        let storage_key = Self::storage_key(&op.key);
        let mut sets = self.sets.write();
        let Some(records) = sets.get_mut(&op.key.set_name) else {
            return OperationResult::Remove;
        };
        let Some(entry) = Self::take_live(records, &storage_key, now) else {
            return OperationResult::Remove;
        };
        if let MinorKeys::Only(keys) = &op.minor_keys {
            let next = entry.record.without(keys);
            if !next.record().is_empty() {
                records.insert(
                    storage_key,
                    Entry {
                        record: next,
                        expires_at: entry.expires_at,
                    },
                );
            }
        }
        tracing::debug!(
            set = %op.key.set_name,
            major_key = %op.key.major_key,
            minor_keys = ?op.minor_keys,
            "remove"
        );
        OperationResult::Remove
    }

    fn set_size(&self, op: SizeOperation) -> OperationResult {
        OperationResult::Size {
            count: self.size(&op.set_name) as u64,
        }
    }

    fn apply(&self, operation: Operation) -> DattyResult<OperationResult> {
        operation.validate()?;
        let result = match operation {
            Operation::Head(op) => self.head(op),
            Operation::Fetch(op) => self.fetch(op),
            Operation::Put(op) => self.put(op)?,
            Operation::CompareAndSet(op) => self.compare_and_set(op),
            Operation::Remove(op) => self.remove(op),
            Operation::Size(op) => self.set_size(op),
        };
        Ok(result)
    }
}

/// Check an expected version against the current record. No expected
/// version means the record must not exist.
fn check_version(expected: Option<&Version>, current: Option<&VersionedRecord>) -> DattyResult<()> {
    match (expected, current) {
        (None, None) => Ok(()),
        (Some(version), Some(record)) if record.matches(version) => Ok(()),
        _ => Err(DattyError::version_conflict(
            expected.map_or_else(|| "none".to_string(), Version::to_string),
            current.map_or_else(|| "none".to_string(), |r| r.version().to_string()),
        )),
    }
}

impl Driver for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn execute(&self, operation: Operation) -> DriverFuture<'_, DattyResult<OperationResult>> {
        let result = self.apply(operation);
        Box::pin(async move { result })
    }
}
