//! EntityStore trait with RocksDB and in-memory implementations
//!
//! The store is a keyed blob store: one namespace per entity kind, plus a
//! processing cursor. All writes go through [`EntityStore::commit`], which
//! applies a whole [`ChangeSet`] or nothing.

use crate::entity::{Entity, EntityKind};
use crate::keys::{decode_position, encode_entity_key, encode_meta_key, encode_position, META_CURSOR};
use crate::types::EventPosition;
use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

/// Trait defining the interface for entity persistence.
pub trait EntityStore {
    /// Get the encoded record of an entity.
    ///
    /// Returns `None` if the entity doesn't exist (no error).
    fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Vec<u8>>>;

    /// List every (id, record) of one kind, ordered by id.
    fn list(&self, kind: EntityKind) -> Result<Vec<(String, Vec<u8>)>>;

    /// Position of the last committed event.
    fn get_cursor(&self) -> Result<Option<EventPosition>>;

    /// Atomically apply a change set.
    fn commit(&self, changes: ChangeSet) -> Result<()>;
}

/// Load and decode one entity straight from a store.
pub fn load_entity<E: Entity>(store: &dyn EntityStore, id: &str) -> Result<Option<E>> {
    match store.get(E::KIND, id)? {
        Some(bytes) => {
            let entity = postcard::from_bytes(&bytes)
                .with_context(|| format!("Failed to deserialize {} '{}'", E::KIND, id))?;
            Ok(Some(entity))
        }
        None => Ok(None),
    }
}

/// Buffered writes of one unit of work.
///
/// `None` values are deletes. Later writes to the same key replace earlier
/// ones.
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    writes: BTreeMap<(EntityKind, String), Option<Vec<u8>>>,
    cursor: Option<EventPosition>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an upsert.
    pub fn put(&mut self, kind: EntityKind, id: &str, bytes: Vec<u8>) {
        self.writes.insert((kind, id.to_string()), Some(bytes));
    }

    /// Stage a delete.
    pub fn delete(&mut self, kind: EntityKind, id: &str) {
        self.writes.insert((kind, id.to_string()), None);
    }

    /// Staged state of a key.
    ///
    /// - `None` if the key is untouched
    /// - `Some(None)` if it is staged for deletion
    /// - `Some(Some(bytes))` if it is staged for upsert
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<Option<&[u8]>> {
        self.writes
            .get(&(kind, id.to_string()))
            .map(|value| value.as_deref())
    }

    /// Advance the processing cursor with this change set.
    pub fn set_cursor(&mut self, position: EventPosition) {
        self.cursor = Some(position);
    }

    pub fn cursor(&self) -> Option<EventPosition> {
        self.cursor
    }

    /// Number of staged entity writes.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.cursor.is_none()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(EntityKind, String), &Option<Vec<u8>>)> {
        self.writes.iter()
    }
}

/// RocksDB-backed implementation of EntityStore.
///
/// Uses one column family per entity kind (named after
/// [`EntityKind::name`]) and a `meta` column family for the cursor.
pub struct RocksEntityStore {
    db: DB,
}

impl RocksEntityStore {
    /// Open or create a RocksDB database at the given path.
    ///
    /// Creates all required column families if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let mut column_families: Vec<ColumnFamilyDescriptor> = EntityKind::ALL
            .iter()
            .map(|kind| ColumnFamilyDescriptor::new(kind.name(), Options::default()))
            .collect();
        column_families.push(ColumnFamilyDescriptor::new("meta", Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, column_families)
            .context("Failed to open RocksDB database")?;

        Ok(Self { db })
    }

    /// Get a column family handle by name.
    fn get_cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .with_context(|| format!("Column family '{}' not found", name))
    }
}

impl EntityStore for RocksEntityStore {
    fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Vec<u8>>> {
        let cf = self.get_cf(kind.name())?;
        let key = encode_entity_key(id);
        self.db
            .get_cf(cf, &key)
            .with_context(|| format!("Failed to get {} '{}'", kind, id))
    }

    fn list(&self, kind: EntityKind) -> Result<Vec<(String, Vec<u8>)>> {
        let cf = self.get_cf(kind.name())?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item.context("Failed to read iterator")?;
            let id = String::from_utf8(key.to_vec()).context("Entity key is not UTF-8")?;
            records.push((id, value.to_vec()));
        }
        Ok(records)
    }

    fn get_cursor(&self) -> Result<Option<EventPosition>> {
        let cf = self.get_cf("meta")?;
        let key = encode_meta_key(META_CURSOR);
        match self.db.get_cf(cf, &key).context("Failed to get cursor")? {
            Some(bytes) => Ok(Some(decode_position(&bytes)?)),
            None => Ok(None),
        }
    }

    fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut batch = WriteBatch::default();
        for ((kind, id), value) in changes.iter() {
            let cf = self.get_cf(kind.name())?;
            let key = encode_entity_key(id);
            match value {
                Some(bytes) => batch.put_cf(cf, &key, bytes),
                None => batch.delete_cf(cf, &key),
            }
        }
        if let Some(position) = changes.cursor() {
            let cf = self.get_cf("meta")?;
            batch.put_cf(cf, encode_meta_key(META_CURSOR), encode_position(position));
        }
        self.db.write(batch).context("Failed to commit change set")?;
        Ok(())
    }
}

/// In-memory implementation of EntityStore.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct MemoryEntityStore {
    records: Mutex<BTreeMap<(EntityKind, String), Vec<u8>>>,
    cursor: Mutex<Option<EventPosition>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored records across all kinds.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock_records()?.len())
    }

    /// Copy of every stored record, for state comparisons.
    pub fn snapshot(&self) -> Result<BTreeMap<(EntityKind, String), Vec<u8>>> {
        Ok(self.lock_records()?.clone())
    }

    fn lock_records(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<(EntityKind, String), Vec<u8>>>> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory store lock poisoned"))
    }
}

impl EntityStore for MemoryEntityStore {
    fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock_records()?.get(&(kind, id.to_string())).cloned())
    }

    fn list(&self, kind: EntityKind) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self
            .lock_records()?
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, id), bytes)| (id.clone(), bytes.clone()))
            .collect())
    }

    fn get_cursor(&self) -> Result<Option<EventPosition>> {
        let cursor = self
            .cursor
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory store lock poisoned"))?;
        Ok(*cursor)
    }

    fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut records = self.lock_records()?;
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| anyhow::anyhow!("Memory store lock poisoned"))?;
        for ((kind, id), value) in changes.iter() {
            match value {
                Some(bytes) => {
                    records.insert((*kind, id.clone()), bytes.clone());
                }
                None => {
                    records.remove(&(*kind, id.clone()));
                }
            }
        }
        if let Some(position) = changes.cursor() {
            *cursor = Some(position);
        }
        Ok(())
    }
}
