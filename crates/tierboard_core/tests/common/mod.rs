#![allow(dead_code)]

use rusqlite::Connection;
use std::cell::Cell;
use std::collections::HashMap;
use tierboard_core::{
    BoardOptions, BoardService, ClearedStore, DisplayHandle, HandleProvider, HandleReleaseError,
    ItemId, Namespace, RecordStore, SqliteRecordStore, StoreError, StoreResult, StoredRecord,
};

/// SQLite store whose writes can be switched to fail.
pub struct FlakyStore<'conn> {
    inner: SqliteRecordStore<'conn>,
    pub fail_writes: Cell<bool>,
    pub fail_repopulate: Cell<bool>,
}

impl<'conn> FlakyStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            inner: SqliteRecordStore::try_new(conn).unwrap(),
            fail_writes: Cell::new(false),
            fail_repopulate: Cell::new(false),
        }
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.fail_writes.get() {
            return Err(StoreError::QuotaExceeded);
        }
        Ok(())
    }
}

impl RecordStore for FlakyStore<'_> {
    fn get(&self, namespace: Namespace, key: &str) -> StoreResult<Option<StoredRecord>> {
        self.inner.get(namespace, key)
    }

    fn get_all(&self, namespace: Namespace) -> StoreResult<Vec<StoredRecord>> {
        self.inner.get_all(namespace)
    }

    fn put(&self, namespace: Namespace, record: &StoredRecord) -> StoreResult<()> {
        self.check_write()?;
        self.inner.put(namespace, record)
    }

    fn put_all(&self, namespace: Namespace, records: &[StoredRecord]) -> StoreResult<()> {
        self.check_write()?;
        self.inner.put_all(namespace, records)
    }

    fn delete(&self, namespace: Namespace, key: &str) -> StoreResult<()> {
        self.check_write()?;
        self.inner.delete(namespace, key)
    }

    fn clear(&self, namespace: Namespace) -> StoreResult<()> {
        self.check_write()?;
        self.inner.clear(namespace)
    }

    fn clear_namespaces(&self) -> StoreResult<()> {
        self.check_write()?;
        self.inner.clear_namespaces()
    }

    fn repopulate(
        &self,
        cleared: ClearedStore,
        config: &[StoredRecord],
        blobs: &[StoredRecord],
    ) -> StoreResult<()> {
        self.check_write()?;
        if self.fail_repopulate.get() {
            return Err(StoreError::QuotaExceeded);
        }
        self.inner.repopulate(cleared, config, blobs)
    }
}

/// Provider counting how often each handle was released.
#[derive(Debug, Default)]
pub struct CountingHandles {
    pub acquired: usize,
    pub releases: HashMap<DisplayHandle, usize>,
}

impl CountingHandles {
    pub fn released_total(&self) -> usize {
        self.releases.values().sum()
    }

    pub fn max_releases_per_handle(&self) -> usize {
        self.releases.values().copied().max().unwrap_or(0)
    }
}

impl HandleProvider for CountingHandles {
    fn acquire(&mut self, item_id: &ItemId, _payload: &[u8]) -> DisplayHandle {
        self.acquired += 1;
        DisplayHandle::new(format!("test:{item_id}#{}", self.acquired))
    }

    fn release(&mut self, handle: &DisplayHandle) -> Result<(), HandleReleaseError> {
        *self.releases.entry(handle.clone()).or_insert(0) += 1;
        Ok(())
    }
}

pub type FlakyBoard<'conn> = BoardService<FlakyStore<'conn>, CountingHandles>;

pub fn open_flaky(conn: &Connection, seed_default_tiers: bool) -> FlakyBoard<'_> {
    BoardService::open(
        FlakyStore::new(conn),
        CountingHandles::default(),
        BoardOptions { seed_default_tiers },
    )
    .unwrap()
}
