//! A borrowed view of one table within a [`StateStorage`], scoped to a
//! single block number. Cheap to construct and to clone; it owns nothing
//! beyond the schema handle and a reference to the storage it delegates to.

use std::sync::Arc;

use crate::condition::Condition;
use crate::entry::{Entry, Status};
use crate::error::CResult;
use crate::state_storage::StateStorage;
use crate::table_info::TableInfo;

#[derive(Clone)]
pub struct Table<'s> {
    storage: &'s StateStorage,
    info: Arc<TableInfo>,
    block_num: u64,
}

impl<'s> Table<'s> {
    pub(crate) fn new(storage: &'s StateStorage, info: Arc<TableInfo>, block_num: u64) -> Self {
        Self {
            storage,
            info,
            block_num,
        }
    }

    pub fn table_info(&self) -> &Arc<TableInfo> {
        &self.info
    }

    /// A blank `NORMAL` row bound to this table's schema and block number.
    pub fn new_entry(&self) -> Entry {
        Entry::new(self.info.clone(), self.block_num)
    }

    /// A blank row already marked `DELETED`, for tombstoning a key.
    pub fn new_deleted_entry(&self) -> Entry {
        let mut entry = self.new_entry();
        entry.set_status(Status::Deleted);
        entry
    }

    pub fn get_row(&self, key: impl AsRef<[u8]>) -> CResult<Option<Entry>> {
        self.storage.get_row(self.info.name(), key.as_ref())
    }

    pub fn get_rows(&self, keys: &[impl AsRef<[u8]>]) -> CResult<Vec<Option<Entry>>> {
        self.storage.get_rows(self.info.name(), keys)
    }

    pub fn get_primary_keys(&self, condition: &Condition) -> CResult<Vec<Vec<u8>>> {
        self.storage.get_primary_keys(self.info.name(), condition)
    }

    pub fn set_row(&self, key: impl Into<Vec<u8>>, entry: Entry) -> CResult<()> {
        self.storage.set_row(self.info.name(), key, entry)
    }

    pub async fn async_get_row(&self, key: impl AsRef<[u8]>) -> CResult<Option<Entry>> {
        self.storage.async_get_row(self.info.name(), key.as_ref()).await
    }

    pub async fn async_get_rows(&self, keys: &[impl AsRef<[u8]>]) -> CResult<Vec<Option<Entry>>> {
        self.storage.async_get_rows(self.info.name(), keys).await
    }

    pub async fn async_get_primary_keys(&self, condition: &Condition) -> CResult<Vec<Vec<u8>>> {
        self.storage
            .async_get_primary_keys(self.info.name(), condition)
            .await
    }

    pub async fn async_set_row(&self, key: impl Into<Vec<u8>>, entry: Entry) -> CResult<()> {
        self.storage.async_set_row(self.info.name(), key, entry).await
    }
}
