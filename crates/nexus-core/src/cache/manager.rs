use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::keys::{collection_key, tombstone_key};
use super::snapshot::{SnapshotAge, SnapshotRef, StoredCollection};
use super::{KeyValueStore, StorageError};
use crate::models::{Category, EntityKind, Lead, Record};
use crate::utils::time::parse_timestamp;

/// Reconciles a durable local snapshot of each collection with records
/// fetched from the remote backend.
///
/// Every public operation is infallible from the caller's point of view:
/// unreadable storage reads as empty and failed writes are logged and
/// dropped, leaving the previous state in place.
///
/// Local records always win over remote records with the same id. This
/// assumes a single writer per device; there are no per-field clocks.
pub struct CacheManager<S> {
    store: S,
}

impl<S: KeyValueStore> CacheManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ===== Storage primitives =====

    /// Stored elements that carry a non-empty id, still as raw JSON.
    ///
    /// Write paths work on this list so that elements the current model
    /// cannot decode are carried through untouched.
    fn load_raw(&self, kind: EntityKind) -> Result<(Option<DateTime<Utc>>, Vec<Value>), StorageError> {
        let key = collection_key(kind);
        let Some(raw) = self.store.get(key)? else {
            return Ok((None, Vec::new()));
        };

        let stored: StoredCollection =
            serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            })?;
        let (written_at, mut values) = stored.into_parts();

        let before = values.len();
        values.retain(|value| value_id(value).is_some());
        if values.len() != before {
            debug!(key, skipped = before - values.len(), "Skipping stored elements without an id");
        }
        Ok((written_at, values))
    }

    fn write_raw(&self, kind: EntityKind, values: &[Value]) -> Result<(), StorageError> {
        let key = collection_key(kind);
        let snapshot = SnapshotRef::new(values);
        let contents = serde_json::to_string(&snapshot).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &contents)?;
        debug!(key, count = values.len(), "Persisted snapshot");
        Ok(())
    }

    fn write_collection<T: Record>(&self, records: &[T]) -> Result<(), StorageError> {
        let values = encode_all(records).map_err(|source| StorageError::Encode {
            key: collection_key(T::KIND).to_string(),
            source,
        })?;
        self.write_raw(T::KIND, &values)
    }

    /// Decoded records; elements that do not decode are left out.
    fn load_collection<T: Record>(&self) -> Result<(Option<DateTime<Utc>>, Vec<T>), StorageError> {
        let (written_at, values) = self.load_raw(T::KIND)?;
        let (records, _) = decode_all::<T>(values);
        Ok((written_at, records))
    }

    fn load_tombstones(&self, kind: EntityKind) -> Result<Vec<String>, StorageError> {
        let Some(key) = tombstone_key(kind) else {
            return Ok(Vec::new());
        };
        match self.store.get(key)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write_tombstones(&self, kind: EntityKind, ids: &[String]) -> Result<(), StorageError> {
        let Some(key) = tombstone_key(kind) else {
            return Ok(());
        };
        let contents = serde_json::to_string(ids).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &contents)
    }

    /// Raw stored elements, or empty with a warning when storage is
    /// unreadable.
    fn raw_or_empty(&self, kind: EntityKind) -> Vec<Value> {
        self.load_raw(kind)
            .map(|(_, values)| values)
            .unwrap_or_else(|e| {
                warn!(%kind, error = %e, "Local snapshot unreadable, using empty collection");
                Vec::new()
            })
    }

    fn tombstone_set(&self, kind: EntityKind) -> HashSet<String> {
        self.load_tombstones(kind)
            .unwrap_or_else(|e| {
                warn!(%kind, error = %e, "Tombstone set unreadable, treating as empty");
                Vec::new()
            })
            .into_iter()
            .collect()
    }

    /// Live local records without seeding defaults, plus the raw elements
    /// that did not decode.
    fn live_parts<T: Record>(&self) -> (Vec<T>, Vec<Value>) {
        let tombstones = self.tombstone_set(T::KIND);
        let mut values = self.raw_or_empty(T::KIND);
        values.retain(|v| value_id(v).is_some_and(|id| !tombstones.contains(id)));
        decode_all(values)
    }

    // ===== Public operations =====

    /// All live records of a collection, newest first.
    ///
    /// A collection with seed data (categories) that holds nothing is
    /// seeded and persisted first.
    pub fn read<T: Record>(&self) -> Vec<T> {
        let (mut records, opaque) = self.live_parts::<T>();
        if records.is_empty() && opaque.is_empty() {
            let defaults = T::defaults();
            if !defaults.is_empty() {
                debug!(kind = %T::KIND, count = defaults.len(), "Seeding default records");
                if let Err(e) = self.write_collection(&defaults) {
                    warn!(kind = %T::KIND, error = %e, "Failed to persist default records");
                }
                records = defaults;
            }
        }
        sort_newest_first(&mut records);
        records
    }

    /// Combine remote records with the local snapshot without persisting.
    ///
    /// Local records win on id collisions; remote records are admitted only
    /// for ids absent locally. Tombstoned ids are dropped whatever their
    /// source.
    pub fn merge<T: Record>(&self, remote: Vec<T>) -> Vec<T> {
        let tombstones = self.tombstone_set(T::KIND);
        let (local, _) = self.live_parts::<T>();

        let mut seen: HashSet<String> = HashSet::with_capacity(local.len() + remote.len());
        let mut merged: Vec<T> = Vec::with_capacity(local.len() + remote.len());

        // Local first, so the first occurrence of an id is the one kept
        for record in local.into_iter().chain(remote) {
            if record.id().is_empty() || tombstones.contains(record.id()) {
                continue;
            }
            if !seen.insert(record.id().to_string()) {
                continue;
            }
            merged.push(record);
        }

        sort_newest_first(&mut merged);
        merged
    }

    /// Merge remote records and persist the result as the new snapshot.
    ///
    /// Live stored elements that do not decode are kept in the snapshot
    /// unless a remote record with the same id replaced them.
    pub fn sync<T: Record>(&self, remote: Vec<T>) -> Vec<T> {
        let kind = T::KIND;
        let remote_count = remote.len();
        let merged = self.merge(remote);
        let (_, opaque) = self.live_parts::<T>();

        let mut values = match encode_all(&merged) {
            Ok(values) => values,
            Err(e) => {
                warn!(%kind, error = %e, "Failed to encode synced collection");
                return merged;
            }
        };
        let merged_ids: HashSet<&str> = merged.iter().map(|r| r.id()).collect();
        values.extend(
            opaque
                .into_iter()
                .filter(|v| value_id(v).is_some_and(|id| !merged_ids.contains(id))),
        );

        match self.write_raw(kind, &values) {
            Ok(()) => debug!(%kind, remote = remote_count, merged = merged.len(), "Synced collection"),
            Err(e) => warn!(%kind, error = %e, "Failed to persist synced collection"),
        }
        merged
    }

    /// Insert or replace a record, placing it first, and lift any tombstone
    /// for its id.
    ///
    /// The snapshot is written before the tombstone is lifted. If lifting
    /// fails the previous snapshot is put back, so the save is dropped as a
    /// whole instead of leaving a stored record hidden by its tombstone.
    pub fn save<T: Record>(&self, record: T) {
        let kind = T::KIND;
        let key = collection_key(kind);
        let id = record.id().to_string();

        // Seed first so an early save does not stand in for the defaults
        if !T::defaults().is_empty() {
            self.read::<T>();
        }

        let encoded = match serde_json::to_value(&record) {
            Ok(value) => value,
            Err(e) => {
                warn!(%kind, id = %id, error = %e, "Failed to encode record");
                return;
            }
        };

        let previous = match self.store.get(key) {
            Ok(previous) => previous,
            Err(e) => {
                warn!(%kind, error = %e, "Local snapshot unreadable, saving into an empty collection");
                None
            }
        };
        let mut values = self.raw_or_empty(kind);
        values.retain(|v| value_id(v) != Some(id.as_str()));
        values.insert(0, encoded);

        if let Err(e) = self.write_raw(kind, &values) {
            warn!(%kind, id = %id, error = %e, "Failed to save record");
            return;
        }

        if !kind.supports_tombstones() {
            return;
        }
        let mut tombstones = self.tombstones::<T>();
        if !tombstones.iter().any(|t| *t == id) {
            return;
        }
        tombstones.retain(|t| *t != id);
        if let Err(e) = self.write_tombstones(kind, &tombstones) {
            warn!(%kind, id = %id, error = %e, "Failed to lift tombstone, rolling back save");
            let restored = match previous {
                Some(raw) => self.store.set(key, &raw),
                None => self.write_raw(kind, &[]),
            };
            if let Err(e) = restored {
                warn!(%kind, id = %id, error = %e, "Rollback failed; saved record stays hidden until saved again");
            }
        }
    }

    /// Shallow-merge `fields` into the stored record with `id`.
    ///
    /// Returns the updated record, or `None` if no record has that id or the
    /// patched record could not be stored. The id itself is never changed.
    pub fn update<T: Record>(&self, id: &str, fields: &Map<String, Value>) -> Option<T> {
        let kind = T::KIND;
        let mut values = self.raw_or_empty(kind);
        let index = values.iter().position(|v| value_id(v) == Some(id))?;

        let mut patched = values[index].clone();
        if let Value::Object(ref mut object) = patched {
            for (field, new_value) in fields {
                if field != "id" {
                    object.insert(field.clone(), new_value.clone());
                }
            }
        }
        let record = match serde_json::from_value::<T>(patched.clone()) {
            Ok(record) => record,
            Err(e) => {
                warn!(%kind, id, error = %e, "Rejected update that does not fit the record");
                return None;
            }
        };
        values[index] = patched;

        if let Err(e) = self.write_raw(kind, &values) {
            warn!(%kind, id, error = %e, "Failed to update record");
            return None;
        }
        Some(record)
    }

    /// Remove a record and remember the deletion so a later sync cannot
    /// bring it back.
    pub fn delete<T: Record>(&self, id: &str) {
        let kind = T::KIND;

        // Tombstone first: if the snapshot write then fails the record is
        // still hidden.
        if kind.supports_tombstones() {
            let mut tombstones = self.load_tombstones(kind).unwrap_or_else(|e| {
                warn!(%kind, error = %e, "Tombstone set unreadable, starting a new one");
                Vec::new()
            });
            if !tombstones.iter().any(|t| t == id) {
                tombstones.push(id.to_string());
                if let Err(e) = self.write_tombstones(kind, &tombstones) {
                    warn!(%kind, id, error = %e, "Failed to record tombstone");
                    return;
                }
            }
        }

        let mut values = self.raw_or_empty(kind);
        let before = values.len();
        values.retain(|v| value_id(v) != Some(id));
        if values.len() == before {
            return;
        }
        if let Err(e) = self.write_raw(kind, &values) {
            warn!(%kind, id, error = %e, "Failed to remove record");
        }
    }

    /// Ids deleted locally, in deletion order.
    pub fn tombstones<T: Record>(&self) -> Vec<String> {
        self.load_tombstones(T::KIND).unwrap_or_else(|e| {
            warn!(kind = %T::KIND, error = %e, "Tombstone set unreadable");
            Vec::new()
        })
    }

    // ===== Leads =====

    pub fn leads(&self) -> Vec<Lead> {
        self.read()
    }

    pub fn save_lead(&self, lead: Lead) {
        self.save(lead)
    }

    pub fn update_lead(&self, id: &str, fields: &Map<String, Value>) -> Option<Lead> {
        self.update(id, fields)
    }

    pub fn delete_lead(&self, id: &str) {
        self.delete::<Lead>(id)
    }

    // ===== Categories =====

    pub fn categories(&self) -> Vec<Category> {
        self.read()
    }

    pub fn save_category(&self, category: Category) {
        self.save(category)
    }

    pub fn delete_category(&self, id: &str) {
        self.delete::<Category>(id)
    }

    // ===== Snapshot Age Information =====

    fn written_at(&self, kind: EntityKind) -> Option<SnapshotAge> {
        match self.load_raw(kind) {
            Ok((at, _)) => at.map(|written_at| SnapshotAge { written_at }),
            Err(e) => {
                debug!(%kind, error = %e, "Failed to load snapshot for age display");
                None
            }
        }
    }

    pub fn snapshot_age(&self, kind: EntityKind) -> Option<String> {
        self.written_at(kind).map(|age| age.age_display())
    }

    /// Missing, unreadable, undated or older than an hour.
    pub fn is_stale(&self, kind: EntityKind) -> bool {
        self.written_at(kind).map_or(true, |age| age.is_stale())
    }

    pub fn any_stale(&self) -> bool {
        EntityKind::ALL.iter().any(|kind| self.is_stale(*kind))
    }

    pub fn cache_ages(&self) -> CacheAges {
        CacheAges {
            leads: self.snapshot_age(EntityKind::Leads),
            categories: self.snapshot_age(EntityKind::Categories),
            companies: self.snapshot_age(EntityKind::Companies),
            tasks: self.snapshot_age(EntityKind::Tasks),
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheAges {
    pub leads: Option<String>,
    pub categories: Option<String>,
    pub companies: Option<String>,
    pub tasks: Option<String>,
}

impl CacheAges {
    /// Age of the first collection that has been written, leads first.
    pub fn last_updated(&self) -> String {
        [&self.leads, &self.companies, &self.tasks, &self.categories]
            .into_iter()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| "never".to_string())
    }
}

/// Stable newest-first sort; records without a parseable timestamp go last.
fn sort_newest_first<T: Record>(records: &mut [T]) {
    records.sort_by_cached_key(|r| {
        let ts = r.created_at().and_then(parse_timestamp);
        (ts.is_none(), std::cmp::Reverse(ts))
    });
}

fn value_id(value: &Value) -> Option<&str> {
    value
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

fn encode_all<T: Record>(records: &[T]) -> Result<Vec<Value>, serde_json::Error> {
    records.iter().map(serde_json::to_value).collect()
}

/// Split raw elements into decoded records and those that do not decode.
fn decode_all<T: Record>(values: Vec<Value>) -> (Vec<T>, Vec<Value>) {
    let mut records = Vec::with_capacity(values.len());
    let mut opaque = Vec::new();
    for value in values {
        match serde_json::from_value::<T>(value.clone()) {
            Ok(record) => records.push(record),
            Err(e) => {
                debug!(kind = %T::KIND, error = %e, "Stored element does not decode, keeping it as is");
                opaque.push(value);
            }
        }
    }
    (records, opaque)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys;
    use crate::cache::MemoryStore;
    use crate::models::{LeadStatus, Task};
    use serde_json::json;

    fn lead(id: &str, name: &str, created_at: &str) -> Lead {
        Lead::new(id, name, created_at)
    }

    fn ids<T: Record>(records: &[T]) -> Vec<&str> {
        records.iter().map(|r| r.id()).collect()
    }

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    /// Store whose writes always fail, for exercising the drop-on-failure path.
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                needed: 1,
                available: 0,
            })
        }
    }

    /// Store whose writes to one key fail; every other key works.
    struct FailingKeyStore<'a> {
        inner: &'a MemoryStore,
        key: &'static str,
    }

    impl KeyValueStore for FailingKeyStore<'_> {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == self.key {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed: value.len(),
                    available: 0,
                });
            }
            self.inner.set(key, value)
        }
    }

    /// Ids of the raw elements in the stored leads snapshot.
    fn stored_lead_ids(store: &MemoryStore) -> Vec<String> {
        let raw = store.get(keys::LEADS).unwrap().unwrap();
        let snapshot: Value = serde_json::from_str(&raw).unwrap();
        snapshot["records"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_read_empty_store() {
        let cache = CacheManager::new(MemoryStore::new());
        assert!(cache.leads().is_empty());
        assert!(cache.read::<Task>().is_empty());
    }

    #[test]
    fn test_merge_orders_newest_first() {
        let cache = CacheManager::new(MemoryStore::new());
        let merged = cache.merge(vec![
            lead("x", "X", "2024-01-01"),
            lead("y", "Y", "2024-02-01"),
        ]);
        assert_eq!(ids(&merged), vec!["y", "x"]);
    }

    #[test]
    fn test_merge_ties_keep_input_order() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.save(lead("local", "L", "2024-01-01T00:00:00.000Z"));
        let merged = cache.merge(vec![
            lead("r1", "R1", "2024-01-01T00:00:00.000Z"),
            lead("r2", "R2", "2024-01-01T00:00:00.000Z"),
            lead("undated", "U", ""),
        ]);
        assert_eq!(ids(&merged), vec!["local", "r1", "r2", "undated"]);
    }

    #[test]
    fn test_delete_then_merge_excludes_record() {
        let cache = CacheManager::new(MemoryStore::new());
        let acme = lead("L1", "Acme", "2024-01-01");
        cache.save(acme.clone());
        cache.delete_lead("L1");

        let merged = cache.merge(vec![acme.clone()]);
        assert!(merged.is_empty());
        let synced = cache.sync(vec![acme]);
        assert!(synced.is_empty());
        assert!(cache.leads().is_empty());
    }

    #[test]
    fn test_tombstone_beats_remote_even_without_local_copy() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.delete_lead("ghost");
        let merged = cache.merge(vec![
            lead("ghost", "Ghost", "2024-01-01"),
            lead("other", "Other", "2024-01-02"),
        ]);
        assert_eq!(ids(&merged), vec!["other"]);
    }

    #[test]
    fn test_local_wins_over_remote() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.save(lead("id", "A", "2024-01-01"));
        let merged = cache.merge(vec![lead("id", "B", "2024-01-01")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "A");
    }

    #[test]
    fn test_new_remote_records_are_admitted() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.save(lead("local", "Local", "2024-01-01"));
        let merged = cache.merge(vec![lead("remote", "Remote", "2024-03-01")]);
        assert_eq!(ids(&merged), vec!["remote", "local"]);
    }

    #[test]
    fn test_duplicate_remote_ids_collapse_to_first() {
        let cache = CacheManager::new(MemoryStore::new());
        let merged = cache.merge(vec![
            lead("dup", "First", "2024-01-01"),
            lead("dup", "Second", "2024-01-01"),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "First");
    }

    #[test]
    fn test_merge_does_not_persist() {
        let cache = CacheManager::new(MemoryStore::new());
        let merged = cache.merge(vec![lead("x", "X", "2024-01-01")]);
        assert_eq!(merged.len(), 1);
        assert!(cache.leads().is_empty());
        assert!(cache.store().get(keys::LEADS).unwrap().is_none());
    }

    #[test]
    fn test_sync_persists_and_is_idempotent() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.save(lead("a", "A", "2024-01-03"));
        cache.delete_lead("d");
        let remote = vec![
            lead("b", "B", "2024-01-02"),
            lead("d", "D", "2024-01-04"),
            lead("a", "Remote A", "2024-01-03"),
        ];

        let first = cache.sync(remote.clone());
        let second = cache.sync(remote);
        assert_eq!(first, second);
        assert_eq!(ids(&first), vec!["a", "b"]);
        assert_eq!(first[0].name, "A");
        assert_eq!(cache.leads(), first);
    }

    #[test]
    fn test_save_delete_save_revives_record() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.save(lead("z", "old", "2024-01-01"));
        cache.delete_lead("z");
        assert_eq!(cache.tombstones::<Lead>(), vec!["z".to_string()]);

        cache.save(lead("z", "new", "2024-01-01"));
        let leads = cache.leads();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].name, "new");
        assert!(cache.tombstones::<Lead>().is_empty());

        // A revived id is again admitted from remote
        cache.delete_lead("z");
        cache.save(lead("z", "again", "2024-01-01"));
        let merged = cache.merge(vec![lead("z", "remote", "2024-01-01")]);
        assert_eq!(merged[0].name, "again");
    }

    #[test]
    fn test_save_prepends_and_replaces() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.save(lead("a", "A", "2024-01-01"));
        cache.save(lead("b", "B", "2024-01-01"));
        cache.save(lead("a", "A2", "2024-01-01"));

        let (_, stored) = cache.load_collection::<Lead>().unwrap();
        assert_eq!(ids(&stored), vec!["a", "b"]);
        assert_eq!(stored[0].name, "A2");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.save(lead("a", "A", "2024-01-01"));
        cache.delete_lead("a");
        cache.delete_lead("a");
        assert_eq!(cache.tombstones::<Lead>(), vec!["a".to_string()]);
    }

    #[test]
    fn test_update_merges_fields() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.save(lead("a", "A", "2024-01-01"));
        cache.save(lead("b", "B", "2024-01-01"));

        let updated = cache
            .update_lead("a", &fields(json!({"status": "won", "notes": "signed", "id": "hijack"})))
            .unwrap();
        assert_eq!(updated.id, "a");
        assert_eq!(updated.status, LeadStatus::Won);

        let leads = cache.leads();
        let a = leads.iter().find(|l| l.id == "a").unwrap();
        assert_eq!(a.status, LeadStatus::Won);
        assert_eq!(a.extra.get("notes").unwrap(), "signed");
        let b = leads.iter().find(|l| l.id == "b").unwrap();
        assert_eq!(b.status, LeadStatus::New);
    }

    #[test]
    fn test_update_missing_id_is_noop() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.save(lead("a", "A", "2024-01-01"));
        let before = cache.store().get(keys::LEADS).unwrap();
        assert!(cache.update_lead("missing", &fields(json!({"name": "X"}))).is_none());
        assert_eq!(cache.store().get(keys::LEADS).unwrap(), before);
    }

    #[test]
    fn test_update_rejects_ill_typed_patch() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.save(lead("a", "A", "2024-01-01"));
        assert!(cache.update_lead("a", &fields(json!({"status": "bogus"}))).is_none());
        assert_eq!(cache.leads()[0].status, LeadStatus::New);
    }

    #[test]
    fn test_categories_seeded_on_first_read() {
        let cache = CacheManager::new(MemoryStore::new());
        let categories = cache.categories();
        let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["VIP", "Recorrente", "Projeto"]);

        let (_, stored) = cache.load_collection::<Category>().unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[test]
    fn test_category_save_and_delete() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.categories();
        cache.save_category(Category::new("4", "Parceiro", "#000000"));
        assert_eq!(cache.categories()[0].id, "4");

        cache.delete_category("1");
        let ids: Vec<_> = cache.categories().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec!["4", "2", "3"]);
        assert!(cache.store().get(keys::DELETED_LEADS).unwrap().is_none());
    }

    #[test]
    fn test_save_category_on_fresh_store_keeps_defaults() {
        let cache = CacheManager::new(MemoryStore::new());
        cache.save_category(Category::new("4", "Parceiro", "#000000"));

        let ids: Vec<_> = cache.categories().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[0], "4");
        for seeded in ["1", "2", "3"] {
            assert!(ids.iter().any(|id| id == seeded));
        }
    }

    #[test]
    fn test_undecodable_elements_survive_writes() {
        let store = MemoryStore::new();
        store.insert_raw(
            keys::LEADS,
            r#"{"written_at":"2024-01-01T00:00:00Z","records":[
                {"id":"a","name":"A","created_at":"2024-01-01"},
                {"id":"odd","name":"Odd","status":"archived","created_at":"2024-01-02","owner":"x"}
            ]}"#,
        );
        let cache = CacheManager::new(&store);
        assert_eq!(ids(&cache.leads()), vec!["a"]);

        cache.save(lead("b", "B", "2024-01-03"));
        assert_eq!(stored_lead_ids(&store), vec!["b", "a", "odd"]);

        assert!(cache.update_lead("a", &fields(json!({"name": "A2"}))).is_some());
        cache.delete_lead("b");
        cache.sync(vec![lead("c", "C", "2024-01-04")]);
        assert_eq!(stored_lead_ids(&store), vec!["c", "a", "odd"]);

        let raw = store.get(keys::LEADS).unwrap().unwrap();
        let snapshot: Value = serde_json::from_str(&raw).unwrap();
        let odd = &snapshot["records"][2];
        assert_eq!(odd["status"], "archived");
        assert_eq!(odd["owner"], "x");
    }

    #[test]
    fn test_failed_tombstone_lift_rolls_back_save() {
        let inner = MemoryStore::new();
        let cache = CacheManager::new(&inner);
        cache.save(lead("keep", "Keep", "2024-01-01"));
        cache.save(lead("z", "old", "2024-01-01"));
        cache.delete_lead("z");
        let before = inner.get(keys::LEADS).unwrap();

        let cache = CacheManager::new(FailingKeyStore {
            inner: &inner,
            key: keys::DELETED_LEADS,
        });
        cache.save(lead("z", "new", "2024-01-01"));

        assert_eq!(inner.get(keys::LEADS).unwrap(), before);
        assert_eq!(cache.tombstones::<Lead>(), vec!["z".to_string()]);
        assert_eq!(ids(&cache.leads()), vec!["keep"]);
    }

    #[test]
    fn test_corrupt_snapshot_reads_empty_and_recovers() {
        let store = MemoryStore::new();
        store.insert_raw(keys::LEADS, "{not json");
        let cache = CacheManager::new(&store);

        assert!(cache.leads().is_empty());
        assert!(matches!(
            cache.load_collection::<Lead>(),
            Err(StorageError::Corrupt { .. })
        ));

        cache.sync(vec![lead("a", "A", "2024-01-01")]);
        assert_eq!(ids(&cache.leads()), vec!["a"]);
    }

    #[test]
    fn test_corrupt_tombstones_read_as_empty() {
        let store = MemoryStore::new();
        store.insert_raw(keys::DELETED_LEADS, "nope");
        let cache = CacheManager::new(&store);
        let merged = cache.merge(vec![lead("a", "A", "2024-01-01")]);
        assert_eq!(merged.len(), 1);

        cache.delete_lead("a");
        assert_eq!(cache.tombstones::<Lead>(), vec!["a".to_string()]);
    }

    #[test]
    fn test_legacy_bare_array_is_readable() {
        let store = MemoryStore::new();
        store.insert_raw(
            keys::LEADS,
            r#"[{"id":"a","name":"A","created_at":"2024-01-01"},null,{"name":"no id"},{"id":"b","name":"B","created_at":"2024-02-01"}]"#,
        );
        store.insert_raw(keys::DELETED_LEADS, r#"["b"]"#);
        let cache = CacheManager::new(&store);

        assert_eq!(ids(&cache.leads()), vec!["a"]);
        assert!(cache.snapshot_age(EntityKind::Leads).is_none());
        assert!(cache.is_stale(EntityKind::Leads));
    }

    #[test]
    fn test_quota_failure_keeps_previous_snapshot() {
        let cache = CacheManager::new(MemoryStore::with_quota(600));
        cache.save(lead("a", "A", "2024-01-01"));
        assert_eq!(cache.leads().len(), 1);

        let big = lead("b", &"x".repeat(1_000), "2024-01-02");
        cache.save(big.clone());
        assert_eq!(ids(&cache.leads()), vec!["a"]);

        let synced = cache.sync(vec![big]);
        assert_eq!(ids(&synced), vec!["b", "a"]);
        assert_eq!(ids(&cache.leads()), vec!["a"]);
    }

    #[test]
    fn test_failed_tombstone_write_aborts_delete() {
        let inner = MemoryStore::new();
        CacheManager::new(&inner).save(lead("a", "A", "2024-01-01"));

        let cache = CacheManager::new(ReadOnlyStore(inner));
        cache.delete_lead("a");
        assert_eq!(ids(&cache.leads()), vec!["a"]);
        assert!(cache.tombstones::<Lead>().is_empty());
    }

    #[test]
    fn test_seed_survives_failed_write() {
        let cache = CacheManager::new(ReadOnlyStore(MemoryStore::new()));
        assert_eq!(cache.categories().len(), 3);
    }

    #[test]
    fn test_file_store_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = CacheManager::new(crate::cache::FileStore::new(dir.path().to_path_buf()).unwrap());
            cache.sync(vec![lead("a", "A", "2024-01-01"), lead("b", "B", "2024-01-02")]);
            cache.delete_lead("a");
        }

        let cache = CacheManager::new(crate::cache::FileStore::new(dir.path().to_path_buf()).unwrap());
        let merged = cache.sync(vec![lead("a", "A", "2024-01-01"), lead("c", "C", "2024-01-03")]);
        assert_eq!(ids(&merged), vec!["c", "b"]);
        assert_eq!(cache.tombstones::<Lead>(), vec!["a".to_string()]);
    }

    #[test]
    fn test_cache_ages() {
        let cache = CacheManager::new(MemoryStore::new());
        assert_eq!(cache.cache_ages().last_updated(), "never");
        assert!(cache.any_stale());

        cache.sync(vec![lead("a", "A", "2024-01-01")]);
        assert_eq!(cache.snapshot_age(EntityKind::Leads).as_deref(), Some("just now"));
        assert!(!cache.is_stale(EntityKind::Leads));
        assert_eq!(cache.cache_ages().last_updated(), "just now");
    }
}
