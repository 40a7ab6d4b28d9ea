//! Relational store backing the band core.
//!
//! One `SQLite` database holds the four entities of the data model: users,
//! provisioned bands, claimed bands, and profiles (plus server-side
//! sessions). The uniqueness constraints on `users.email`,
//! `provisioned_bands.band_id` and `bands.band_id` are load-bearing for
//! correctness: the claim protocol relies on the `bands.band_id` constraint
//! as the authoritative race tiebreak.
//!
//! The store handle is created explicitly at process start and injected into
//! every component; there is no lazy first-use initialization.

mod error;
mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, Transaction, TransactionBehavior};

pub use error::{StorageError, StorageResult};
pub(crate) use error::{map_db_err, to_i64, to_u64};

/// Handle to the relational store.
///
/// All access goes through a single guarded connection; operations that must
/// be atomic (claim, unlink) run inside an immediate transaction obtained
/// from [`Store::with_tx`]. Closed when dropped.
#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (or creates) the store at `path` and runs schema migration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be ensured.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path).map_err(|err| map_db_err(&err))?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory store, mainly for tests and tooling.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().map_err(|err| map_db_err(&err))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|err| map_db_err(&err))?;
        schema::ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_: PoisonError<_>| StorageError::Poisoned)
    }

    /// Runs `f` with the connection locked.
    pub(crate) fn with<T, E>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let guard = self.lock()?;
        f(&guard)
    }

    /// Runs `f` inside an immediate transaction, committing on success.
    ///
    /// An error from `f` rolls the transaction back, so multi-row writes
    /// (band + profile, profile + band deletion) are all-or-nothing.
    pub(crate) fn with_tx<T, E>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut guard = self.lock()?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| E::from(map_db_err(&err)))?;
        let out = f(&tx)?;
        tx.commit().map_err(|err| E::from(map_db_err(&err)))?;
        Ok(out)
    }
}
