//! Local-tier key-value stores.
//!
//! The local tier is a synchronous embedded store shared behind an `Arc`;
//! the tiering policy treats it as always available and cheap to probe.

use dashmap::DashMap;
use redb::{Database, ReadableTable, TableDefinition};

/// Local-tier store contract consumed by the tiering policy.
///
/// Operations are atomic per key at the store layer; the policy never needs
/// cross-key locking.
pub trait LocalStore: Send + Sync + 'static {
    /// Insert or replace the record bytes for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be persisted.
    fn put(&self, key: &str, bytes: &[u8]) -> anyhow::Result<()>;

    /// Retrieve the record bytes for `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Remove `key`, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal cannot be persisted.
    fn remove(&self, key: &str) -> anyhow::Result<bool>;

    /// All keys currently present in the local tier.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn keys(&self) -> anyhow::Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Persistent embedded [`LocalStore`] backed by a single-file `redb` database.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Opens (or creates) the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database file cannot be created or opened.
    pub fn open(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let db = Database::create(path)?;
        // Create the table up front so first reads see an empty table
        // instead of a missing one.
        let txn = db.begin_write()?;
        txn.open_table(RECORDS)?;
        txn.commit()?;
        Ok(Self { db })
    }
}

impl LocalStore for RedbStore {
    fn put(&self, key: &str, bytes: &[u8]) -> anyhow::Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(RECORDS)?;
            table.insert(key, bytes)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(RECORDS)?;
        Ok(table.get(key)?.map(|guard| guard.value().to_vec()))
    }

    fn remove(&self, key: &str) -> anyhow::Result<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(RECORDS)?;
            let existed = table.remove(key)?.is_some();
            existed
        };
        txn.commit()?;
        Ok(removed)
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(RECORDS)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (key, _value) = entry?;
            out.push(key.value().to_string());
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory [`LocalStore`] backed by [`DashMap`], for tests and ephemeral
/// clients that do not need persistence across restarts.
pub struct MemoryStore {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Creates a new, empty `MemoryStore`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore for MemoryStore {
    fn put(&self, key: &str, bytes: &[u8]) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn remove(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.entries.iter().map(|entry| entry.key().clone()).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
