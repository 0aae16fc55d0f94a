//! redb-backed game registry.
//!
//! One table, keyed by the lowercase diamond address, holding
//! postcard-encoded [`GameRecord`] values. Lifecycle state is not stored;
//! it is derived from the record's facet map on every read.

use crate::address::Address;
use crate::error::{CoreError, Result};
use crate::game::GameRecord;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

const GAMES: TableDefinition<&str, &[u8]> = TableDefinition::new("games");

/// Persistent store of [`GameRecord`]s.
pub struct GameStore {
    db: Database,
}

impl std::fmt::Debug for GameStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameStore").finish_non_exhaustive()
    }
}

impl GameStore {
    /// Create a new store, or open the existing one at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(CoreError::storage)?;
        Self::init(db)
    }

    /// Open an existing store. Fails if `path` does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::open(path).map_err(CoreError::storage)?;
        Self::init(db)
    }

    /// Ensure the games table exists so readers never see it missing.
    fn init(db: Database) -> Result<Self> {
        let txn = db.begin_write().map_err(CoreError::storage)?;
        {
            txn.open_table(GAMES).map_err(CoreError::storage)?;
        }
        txn.commit().map_err(CoreError::storage)?;
        Ok(Self { db })
    }

    fn key(address: &Address) -> String {
        address.to_string()
    }

    /// Register a new game. Fails if the address is already known.
    pub fn insert(&self, record: &GameRecord) -> Result<()> {
        let key = Self::key(&record.address);
        let bytes = postcard::to_allocvec(record)?;

        let txn = self.db.begin_write().map_err(CoreError::storage)?;
        {
            let mut table = txn.open_table(GAMES).map_err(CoreError::storage)?;
            let exists = table
                .get(key.as_str())
                .map_err(CoreError::storage)?
                .is_some();
            if exists {
                return Err(CoreError::GameExists(record.address));
            }
            table
                .insert(key.as_str(), bytes.as_slice())
                .map_err(CoreError::storage)?;
        }
        txn.commit().map_err(CoreError::storage)?;
        Ok(())
    }

    /// Fetch a game by diamond address.
    pub fn get(&self, address: &Address) -> Result<Option<GameRecord>> {
        let txn = self.db.begin_read().map_err(CoreError::storage)?;
        let table = txn.open_table(GAMES).map_err(CoreError::storage)?;
        let guard = table
            .get(Self::key(address).as_str())
            .map_err(CoreError::storage)?;
        match guard {
            Some(bytes) => Ok(Some(postcard::from_bytes(bytes.value())?)),
            None => Ok(None),
        }
    }

    /// Fetch a game, treating absence as an error.
    pub fn require(&self, address: &Address) -> Result<GameRecord> {
        self.get(address)?.ok_or(CoreError::GameNotFound(*address))
    }

    /// Read-modify-write a game inside one write transaction.
    ///
    /// Nothing is written if `f` fails.
    pub fn update<F>(&self, address: &Address, f: F) -> Result<GameRecord>
    where
        F: FnOnce(&mut GameRecord) -> Result<()>,
    {
        let key = Self::key(address);
        let txn = self.db.begin_write().map_err(CoreError::storage)?;
        let record = {
            let mut table = txn.open_table(GAMES).map_err(CoreError::storage)?;
            let current = table
                .get(key.as_str())
                .map_err(CoreError::storage)?
                .map(|guard| guard.value().to_vec())
                .ok_or(CoreError::GameNotFound(*address))?;

            let mut record: GameRecord = postcard::from_bytes(&current)?;
            f(&mut record)?;

            let bytes = postcard::to_allocvec(&record)?;
            table
                .insert(key.as_str(), bytes.as_slice())
                .map_err(CoreError::storage)?;
            record
        };
        txn.commit().map_err(CoreError::storage)?;
        Ok(record)
    }

    /// All games, ordered by address.
    pub fn list(&self) -> Result<Vec<GameRecord>> {
        let txn = self.db.begin_read().map_err(CoreError::storage)?;
        let table = txn.open_table(GAMES).map_err(CoreError::storage)?;
        let mut games = Vec::new();
        for entry in table.iter().map_err(CoreError::storage)? {
            let (_, value) = entry.map_err(CoreError::storage)?;
            games.push(postcard::from_bytes(value.value())?);
        }
        Ok(games)
    }

    /// Games created by one developer, ordered by creation time.
    pub fn list_by_developer(&self, developer: &Address) -> Result<Vec<GameRecord>> {
        let mut games: Vec<GameRecord> = self
            .list()?
            .into_iter()
            .filter(|g| g.developer == *developer)
            .collect();
        games.sort_by_key(|g| (g.created_at, g.address));
        Ok(games)
    }

    /// Number of registered games.
    pub fn len(&self) -> Result<u64> {
        let txn = self.db.begin_read().map_err(CoreError::storage)?;
        let table = txn.open_table(GAMES).map_err(CoreError::storage)?;
        table.len().map_err(CoreError::storage)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

// =============================================================================
// TESTS
// =============================================================================
