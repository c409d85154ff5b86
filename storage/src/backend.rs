//! The leaf collaborator a [`crate::state_storage::StateStorage`] chain
//! bottoms out on: a durable backend this crate never implements itself
//! (see this crate's Non-goals -- durability and crash recovery live
//! outside this core).
//!
//! `StorageInterface` is intentionally narrow: whatever sits behind it only
//! needs to answer row/key lookups and accept writes for a checkpointed
//! block. Everything about layering, savepoints, and hashing happens above
//! this seam.

use async_trait::async_trait;

use crate::condition::Condition;
use crate::entry::Entry;
use crate::error::CResult;
use crate::table_info::TableInfo;

#[async_trait]
pub trait StorageInterface: Send + Sync {
    async fn async_get_row(&self, table: &str, key: &[u8]) -> CResult<Option<Entry>>;

    async fn async_get_rows(
        &self,
        table: &str,
        keys: &[Vec<u8>],
    ) -> CResult<Vec<Option<Entry>>>;

    async fn async_get_primary_keys(
        &self,
        table: &str,
        condition: &Condition,
    ) -> CResult<Vec<Vec<u8>>>;

    async fn async_set_row(&self, table: &str, key: &[u8], entry: Entry) -> CResult<()>;

    async fn async_create_table(&self, info: &TableInfo) -> CResult<()>;

    /// Visits every `(table, key, entry)` triple this backend holds,
    /// optionally restricted to dirty rows, for callers that need to fold
    /// over everything (e.g. rebuilding a hash) without materializing it all
    /// at once first.
    async fn parallel_traverse(
        &self,
        dirty_only: bool,
        visitor: &(dyn Fn(&str, &[u8], &Entry) -> bool + Send + Sync),
    ) -> CResult<()>;
}

/// A backend with nothing behind it: every lookup misses, every write is
/// accepted and discarded. Used as the terminal link of a storage chain in
/// tests, and as the default when no real backend is configured.
#[derive(Debug, Default)]
pub struct NullBackend;

#[async_trait]
impl StorageInterface for NullBackend {
    async fn async_get_row(&self, _table: &str, _key: &[u8]) -> CResult<Option<Entry>> {
        Ok(None)
    }

    async fn async_get_rows(
        &self,
        _table: &str,
        keys: &[Vec<u8>],
    ) -> CResult<Vec<Option<Entry>>> {
        Ok(vec![None; keys.len()])
    }

    async fn async_get_primary_keys(
        &self,
        _table: &str,
        _condition: &Condition,
    ) -> CResult<Vec<Vec<u8>>> {
        Ok(Vec::new())
    }

    async fn async_set_row(&self, _table: &str, _key: &[u8], _entry: Entry) -> CResult<()> {
        Ok(())
    }

    async fn async_create_table(&self, _info: &TableInfo) -> CResult<()> {
        Ok(())
    }

    async fn parallel_traverse(
        &self,
        _dirty_only: bool,
        _visitor: &(dyn Fn(&str, &[u8], &Entry) -> bool + Send + Sync),
    ) -> CResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn null_backend_misses_every_read() {
        let backend = NullBackend;
        assert!(backend.async_get_row("t_test", b"k").await.unwrap().is_none());
        let rows = backend
            .async_get_rows("t_test", &[b"a".to_vec(), b"b".to_vec()])
            .await
            .unwrap();
        assert_eq!(rows, vec![None, None]);
    }

    #[tokio::test]
    async fn null_backend_accepts_and_drops_writes() {
        let backend = NullBackend;
        let info = TableInfo::new("t_test", vec!["key".into()]).unwrap();
        backend.async_create_table(&info).await.unwrap();

        let entry = crate::entry::Entry::new(info, 0);
        backend.async_set_row("t_test", b"k", entry).await.unwrap();
        assert!(backend.async_get_row("t_test", b"k").await.unwrap().is_none());
    }
}
