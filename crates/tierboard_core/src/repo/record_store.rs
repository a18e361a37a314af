//! Namespaced transactional record store.
//!
//! # Responsibility
//! - Offer `get/get_all/put/delete/clear` over the `config` and `blobs`
//!   namespaces, each as one atomic unit.
//! - Offer batch writes and an ordered clear-then-repopulate sequence.
//!
//! # Invariants
//! - `get_all` is deterministic: `record_key ASC`.
//! - `repopulate` can only run after `clear_all` completed, enforced by the
//!   [`ClearedStore`] token.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use log::debug;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Record namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Layout records (tiers, sidebar).
    Config,
    /// Raw item payloads keyed by item id.
    Blobs,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Config, Namespace::Blobs];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Blobs => "blobs",
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One keyed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub key: String,
    pub payload: Vec<u8>,
}

impl StoredRecord {
    pub fn new(key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
        }
    }
}

/// Errors from record store operations. Any of them means the write was
/// rejected as a whole.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Backing storage ran out of space.
    QuotaExceeded,
    /// Connection schema is not at the expected migrated version.
    SchemaConflict {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Backend cannot serve requests at all.
    Unavailable(String),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::QuotaExceeded => write!(f, "storage quota exceeded"),
            Self::SchemaConflict {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "record store requires table `{table}`")
            }
            Self::Unavailable(message) => write!(f, "record store unavailable: {message}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if value.sqlite_error_code() == Some(ErrorCode::DiskFull) {
            return Self::QuotaExceeded;
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Completion token proving that both namespaces were cleared.
///
/// Only the provided [`RecordStore::clear_all`] constructs it, after
/// [`RecordStore::clear_namespaces`] returned `Ok`. Store implementations
/// outside this crate cannot mint one.
#[derive(Debug)]
pub struct ClearedStore {
    _private: (),
}

/// Store interface consumed by the board.
pub trait RecordStore {
    /// Loads one record.
    fn get(&self, namespace: Namespace, key: &str) -> StoreResult<Option<StoredRecord>>;
    /// Loads every record of one namespace.
    fn get_all(&self, namespace: Namespace) -> StoreResult<Vec<StoredRecord>>;
    /// Inserts or replaces one record.
    fn put(&self, namespace: Namespace, record: &StoredRecord) -> StoreResult<()>;
    /// Inserts or replaces many records as one write.
    fn put_all(&self, namespace: Namespace, records: &[StoredRecord]) -> StoreResult<()>;
    /// Deletes one record. Deleting a missing key is a no-op.
    fn delete(&self, namespace: Namespace, key: &str) -> StoreResult<()>;
    /// Deletes every record of one namespace.
    fn clear(&self, namespace: Namespace) -> StoreResult<()>;
    /// Deletes every record of both namespaces in one write.
    fn clear_namespaces(&self) -> StoreResult<()>;
    /// Clears both namespaces and returns the completion token.
    fn clear_all(&self) -> StoreResult<ClearedStore> {
        self.clear_namespaces()?;
        Ok(ClearedStore { _private: () })
    }
    /// Writes a full record set after a completed clear.
    fn repopulate(
        &self,
        cleared: ClearedStore,
        config: &[StoredRecord],
        blobs: &[StoredRecord],
    ) -> StoreResult<()>;
}

/// SQLite-backed record store.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    /// Creates a store over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn get(&self, namespace: Namespace, key: &str) -> StoreResult<Option<StoredRecord>> {
        let payload: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT payload
                 FROM records
                 WHERE namespace = ?1
                   AND record_key = ?2;",
                params![namespace.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload.map(|payload| StoredRecord::new(key, payload)))
    }

    fn get_all(&self, namespace: Namespace) -> StoreResult<Vec<StoredRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT record_key, payload
             FROM records
             WHERE namespace = ?1
             ORDER BY record_key ASC;",
        )?;
        let mut rows = stmt.query([namespace.as_str()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(StoredRecord {
                key: row.get(0)?,
                payload: row.get(1)?,
            });
        }
        Ok(records)
    }

    fn put(&self, namespace: Namespace, record: &StoredRecord) -> StoreResult<()> {
        upsert_record(self.conn, namespace, record)
    }

    fn put_all(&self, namespace: Namespace, records: &[StoredRecord]) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for record in records {
            upsert_record(&tx, namespace, record)?;
        }
        tx.commit()?;
        debug!(
            "event=store_put_all module=repo status=ok namespace={} count={}",
            namespace,
            records.len()
        );
        Ok(())
    }

    fn delete(&self, namespace: Namespace, key: &str) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM records
             WHERE namespace = ?1
               AND record_key = ?2;",
            params![namespace.as_str(), key],
        )?;
        Ok(())
    }

    fn clear(&self, namespace: Namespace) -> StoreResult<()> {
        self.conn.execute(
            "DELETE FROM records WHERE namespace = ?1;",
            [namespace.as_str()],
        )?;
        Ok(())
    }

    fn clear_namespaces(&self) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for namespace in Namespace::ALL {
            tx.execute(
                "DELETE FROM records WHERE namespace = ?1;",
                [namespace.as_str()],
            )?;
        }
        tx.commit()?;
        debug!("event=store_clear_all module=repo status=ok");
        Ok(())
    }

    fn repopulate(
        &self,
        _cleared: ClearedStore,
        config: &[StoredRecord],
        blobs: &[StoredRecord],
    ) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for record in config {
            upsert_record(&tx, Namespace::Config, record)?;
        }
        for record in blobs {
            upsert_record(&tx, Namespace::Blobs, record)?;
        }
        tx.commit()?;
        debug!(
            "event=store_repopulate module=repo status=ok config_count={} blob_count={}",
            config.len(),
            blobs.len()
        );
        Ok(())
    }
}

fn upsert_record(conn: &Connection, namespace: Namespace, record: &StoredRecord) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO records (namespace, record_key, payload)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (namespace, record_key) DO UPDATE
         SET payload = excluded.payload,
             updated_at = (strftime('%s', 'now') * 1000);",
        params![namespace.as_str(), record.key, record.payload],
    )?;
    Ok(())
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::SchemaConflict {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'records'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(StoreError::MissingRequiredTable("records"));
    }
    Ok(())
}
