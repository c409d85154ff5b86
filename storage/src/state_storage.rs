//! The layered, transactional core: one `StateStorage` per block, chained
//! onto its parent block's storage so a read that misses locally falls
//! through the whole ancestry before finally reaching the external
//! [`StorageInterface`] leaf. Writes are copy-on-write with respect to the
//! parent -- nothing here ever mutates an ancestor.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use crate::backend::StorageInterface;
use crate::condition::Condition;
use crate::entry::{Entry, Status};
use crate::error::{CResult, Error};
use crate::hash::{hash_table, Sha256Hash};
use crate::table::Table;
use crate::table_info::TableInfo;
use crate::system_table;

struct TableState {
    info: Arc<TableInfo>,
    /// Rows written at this layer. Only these ever enter a table's hash.
    rows: HashMap<Vec<u8>, Entry>,
    /// Unmodified copies pulled up from an ancestor on a prior read. Never
    /// journalled and never hashed -- rolling this layer back or dropping
    /// it changes nothing these rows say about the data.
    cache: HashMap<Vec<u8>, Entry>,
}

impl TableState {
    fn new(info: Arc<TableInfo>) -> Self {
        Self {
            info,
            rows: HashMap::new(),
            cache: HashMap::new(),
        }
    }
}

enum Change {
    TableCreated {
        name: String,
    },
    Row {
        table: String,
        key: Vec<u8>,
        before: Option<Entry>,
    },
}

/// One layer of state. `parent` chains to the storage this layer was forked
/// from; `backend` is only ever consulted once the whole parent chain has
/// been exhausted, and only from the `async_*` entry points.
pub struct StateStorage {
    parent: Option<Arc<StateStorage>>,
    backend: Option<Arc<dyn StorageInterface>>,
    block_num: u64,
    tables: RwLock<HashMap<String, TableState>>,
    journal: Mutex<Vec<Change>>,
}

impl StateStorage {
    pub fn new(
        parent: Option<Arc<StateStorage>>,
        backend: Option<Arc<dyn StorageInterface>>,
        block_num: u64,
    ) -> Self {
        Self {
            parent,
            backend,
            block_num,
            tables: RwLock::new(HashMap::new()),
            journal: Mutex::new(Vec::new()),
        }
    }

    pub fn block_num(&self) -> u64 {
        self.block_num
    }

    fn resolve_table_info(&self, name: &str) -> Option<Arc<TableInfo>> {
        if name == system_table::NAME {
            return Some(system_table::schema());
        }
        let mut node = self;
        loop {
            if let Some(state) = node.tables.read().unwrap().get(name) {
                return Some(state.info.clone());
            }
            match &node.parent {
                Some(p) => node = p.as_ref(),
                None => return None,
            }
        }
    }

    fn local_lookup(&self, table: &str, key: &[u8]) -> Option<Entry> {
        let tables = self.tables.read().unwrap();
        let state = tables.get(table)?;
        state
            .rows
            .get(key)
            .or_else(|| state.cache.get(key))
            .cloned()
    }

    fn cache_insert(&self, table: &str, key: &[u8], entry: Entry) {
        let Some(info) = self.resolve_table_info(table) else {
            return;
        };
        let mut tables = self.tables.write().unwrap();
        let state = tables
            .entry(table.to_string())
            .or_insert_with(|| TableState::new(info));
        state.cache.entry(key.to_vec()).or_insert(entry);
    }

    fn ensure_local_table(&self, name: &str, info: &Arc<TableInfo>) {
        self.tables
            .write()
            .unwrap()
            .entry(name.to_string())
            .or_insert_with(|| TableState::new(info.clone()));
    }

    // ---- schema -----------------------------------------------------

    pub fn create_table(&self, name: &str, fields: Vec<String>) -> CResult<Arc<TableInfo>> {
        if self.resolve_table_info(name).is_some() {
            return Err(Error::TableExists(name.to_string()));
        }
        let info = TableInfo::new(name, fields)?;
        self.tables
            .write()
            .unwrap()
            .insert(name.to_string(), TableState::new(info.clone()));
        self.journal.lock().unwrap().push(Change::TableCreated {
            name: name.to_string(),
        });

        if name != system_table::NAME {
            self.record_in_system_table(name, &info)?;
        }

        Ok(info)
    }

    /// Writes `name`'s schema into the local `s_tables` bucket as an
    /// ordinary dirty row, so the catalog itself is a real table that
    /// hashes and traverses like any other -- not a side record kept only
    /// in the `tables` map.
    fn record_in_system_table(&self, name: &str, info: &Arc<TableInfo>) -> CResult<()> {
        let mut row = Entry::new(system_table::schema(), self.block_num);
        row.set_field(system_table::KEY_FIELD, name)?;
        row.set_field(system_table::VALUE_FIELD, info.to_value_fields())?;
        self.set_row(system_table::NAME, name.as_bytes().to_vec(), row)
    }

    /// `s_tables` is always resolvable, even before anything has been
    /// written into it locally -- it is the catalog every other table is
    /// discovered through, not a table a caller creates for itself.
    pub fn open_table<'s>(&'s self, name: &str) -> Option<Table<'s>> {
        self.resolve_table_info(name)
            .map(|info| Table::new(self, info, self.block_num))
    }

    pub async fn async_create_table(
        &self,
        name: &str,
        fields: Vec<String>,
    ) -> CResult<Arc<TableInfo>> {
        self.create_table(name, fields)
    }

    /// Like [`Self::open_table`], but when the schema isn't anywhere in the
    /// in-memory chain, checks whether the backend's `s_tables` catalog
    /// knows it before giving up.
    pub async fn async_open_table<'s>(&'s self, name: &str) -> CResult<Option<Table<'s>>> {
        if let Some(info) = self.resolve_table_info(name) {
            return Ok(Some(Table::new(self, info, self.block_num)));
        }
        let Some(backend) = self.root_backend() else {
            return Ok(None);
        };
        let row = backend.async_get_row(system_table::NAME, name.as_bytes()).await?;
        let Some(row) = row else { return Ok(None) };
        let Ok(value) = row.get_field(system_table::VALUE_FIELD) else {
            return Ok(None);
        };
        let info = TableInfo::from_value_fields(name, value)?;
        self.ensure_local_table(name, &info);
        Ok(Some(Table::new(self, info, self.block_num)))
    }

    fn root_backend(&self) -> Option<&Arc<dyn StorageInterface>> {
        let mut node = self;
        loop {
            match &node.parent {
                Some(p) => node = p.as_ref(),
                None => return node.backend.as_ref(),
            }
        }
    }

    // ---- reads --------------------------------------------------------

    pub fn get_row(&self, table: &str, key: &[u8]) -> CResult<Option<Entry>> {
        if self.resolve_table_info(table).is_none() {
            return Err(Error::TableNotFound(table.to_string()));
        }
        let mut node = self;
        loop {
            if let Some(entry) = node.local_lookup(table, key) {
                // A tombstone masks whatever the parent holds; it is never
                // handed back to the caller and the walk stops right here.
                if entry.status() == Status::Deleted {
                    return Ok(None);
                }
                if !std::ptr::eq(node, self) {
                    self.cache_insert(table, key, entry.clone());
                }
                return Ok(Some(entry));
            }
            match &node.parent {
                Some(p) => node = p.as_ref(),
                None => return Ok(None),
            }
        }
    }

    pub fn get_rows(&self, table: &str, keys: &[impl AsRef<[u8]>]) -> CResult<Vec<Option<Entry>>> {
        keys.iter().map(|k| self.get_row(table, k.as_ref())).collect()
    }

    fn collect_visible(&self, table: &str) -> BTreeMap<Vec<u8>, Entry> {
        let mut chain = Vec::new();
        let mut node = self;
        loop {
            chain.push(node);
            match &node.parent {
                Some(p) => node = p.as_ref(),
                None => break,
            }
        }
        let mut merged = BTreeMap::new();
        for layer in chain.into_iter().rev() {
            if let Some(state) = layer.tables.read().unwrap().get(table) {
                for (k, v) in state.rows.iter() {
                    merged.insert(k.clone(), v.clone());
                }
            }
        }
        merged
    }

    pub fn get_primary_keys(&self, table: &str, condition: &Condition) -> CResult<Vec<Vec<u8>>> {
        if self.resolve_table_info(table).is_none() {
            return Err(Error::TableNotFound(table.to_string()));
        }
        let merged = self.collect_visible(table);
        let (offset, count) = condition.window();
        let matched = merged
            .into_iter()
            .filter(|(_, entry)| entry.valid() && condition.matches(entry))
            .map(|(k, _)| k);
        let windowed: Vec<Vec<u8>> = match count {
            Some(count) => matched.skip(offset).take(count).collect(),
            None => matched.skip(offset).collect(),
        };
        Ok(windowed)
    }

    pub async fn async_get_row(&self, table: &str, key: &[u8]) -> CResult<Option<Entry>> {
        if self.resolve_table_info(table).is_none() {
            return Err(Error::TableNotFound(table.to_string()));
        }
        let mut node = self;
        loop {
            if let Some(entry) = node.local_lookup(table, key) {
                if entry.status() == Status::Deleted {
                    return Ok(None);
                }
                if !std::ptr::eq(node, self) {
                    self.cache_insert(table, key, entry.clone());
                }
                return Ok(Some(entry));
            }
            match &node.parent {
                Some(p) => node = p.as_ref(),
                None => {
                    let Some(backend) = &node.backend else {
                        return Ok(None);
                    };
                    let found = backend.async_get_row(table, key).await?;
                    if let Some(entry) = &found {
                        self.cache_insert(table, key, entry.clone());
                    }
                    return Ok(found);
                }
            }
        }
    }

    pub async fn async_get_rows(
        &self,
        table: &str,
        keys: &[impl AsRef<[u8]>],
    ) -> CResult<Vec<Option<Entry>>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.async_get_row(table, key.as_ref()).await?);
        }
        Ok(out)
    }

    pub async fn async_get_primary_keys(
        &self,
        table: &str,
        condition: &Condition,
    ) -> CResult<Vec<Vec<u8>>> {
        if self.resolve_table_info(table).is_none() {
            return Err(Error::TableNotFound(table.to_string()));
        }
        let mut merged = self.collect_visible(table);
        if let Some(backend) = self.root_backend() {
            for key in backend.async_get_primary_keys(table, condition).await? {
                merged.entry(key.clone()).or_insert_with(|| {
                    // The backend answered affirmatively for this key under
                    // the same condition, so a placeholder marker row is
                    // never actually read back by a caller that only wants
                    // primary keys; callers needing the fields use `get_row`.
                    Entry::new(self.resolve_table_info(table).unwrap(), self.block_num)
                });
            }
        }
        let (offset, count) = condition.window();
        let matched = merged
            .into_iter()
            .filter(|(_, entry)| entry.valid() && condition.matches(entry))
            .map(|(k, _)| k);
        let windowed: Vec<Vec<u8>> = match count {
            Some(count) => matched.skip(offset).take(count).collect(),
            None => matched.skip(offset).collect(),
        };
        Ok(windowed)
    }

    // ---- writes ---------------------------------------------------------

    pub fn set_row(&self, table: &str, key: impl Into<Vec<u8>>, entry: Entry) -> CResult<()> {
        let key = key.into();
        let info = self
            .resolve_table_info(table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;

        if let Some(predecessor) = self.get_row(table, &key)? {
            let expected = predecessor.version() + 1;
            if entry.version() != expected {
                return Err(Error::VersionCheckFail {
                    expected,
                    found: entry.version(),
                });
            }
        }

        let mut entry = entry;
        entry.set_dirty(true);
        self.ensure_local_table(table, &info);

        let before = {
            let mut tables = self.tables.write().unwrap();
            let state = tables.get_mut(table).expect("just ensured");
            let before = state.rows.get(&key).cloned();
            state.rows.insert(key.clone(), entry);
            before
        };
        self.journal.lock().unwrap().push(Change::Row {
            table: table.to_string(),
            key,
            before,
        });
        Ok(())
    }

    pub async fn async_set_row(
        &self,
        table: &str,
        key: impl Into<Vec<u8>>,
        entry: Entry,
    ) -> CResult<()> {
        self.set_row(table, key, entry)
    }

    // ---- savepoints -------------------------------------------------------

    pub fn savepoint(&self) -> usize {
        self.journal.lock().unwrap().len()
    }

    pub fn rollback(&self, savepoint: usize) -> CResult<()> {
        let mut journal = self.journal.lock().unwrap();
        if savepoint > journal.len() {
            return Err(Error::Internal(format!(
                "savepoint {savepoint} is ahead of the current journal ({})",
                journal.len()
            )));
        }
        while journal.len() > savepoint {
            match journal.pop().expect("len > savepoint") {
                Change::Row { table, key, before } => {
                    let mut tables = self.tables.write().unwrap();
                    if let Some(state) = tables.get_mut(&table) {
                        match before {
                            Some(prev) => {
                                state.rows.insert(key, prev);
                            }
                            None => {
                                state.rows.remove(&key);
                            }
                        }
                    }
                }
                Change::TableCreated { name } => {
                    self.tables.write().unwrap().remove(&name);
                }
            }
        }
        Ok(())
    }

    pub async fn async_savepoint(&self) -> usize {
        self.savepoint()
    }

    pub async fn async_rollback(&self, savepoint: usize) -> CResult<()> {
        self.rollback(savepoint)
    }

    // ---- hashing ------------------------------------------------------

    /// One digest per table touched at this layer, over its dirty rows only
    /// -- a fresh layer built atop the same parent and fed the same writes
    /// always hashes identically, regardless of `HashMap` iteration order.
    pub fn table_hashes(&self) -> HashMap<String, Vec<u8>> {
        let tables = self.tables.read().unwrap();
        tables
            .iter()
            .map(|(name, state)| {
                let mut rows: Vec<(Vec<u8>, Entry)> = state
                    .rows
                    .iter()
                    .filter(|(_, entry)| entry.dirty())
                    .map(|(k, e)| (k.clone(), e.clone()))
                    .collect();
                rows.sort_by(|a, b| a.0.cmp(&b.0));
                (name.clone(), hash_table::<Sha256Hash>(&rows))
            })
            .collect()
    }

    /// Folds `visitor(table_name, key, entry)` over every row of every local
    /// table, using a worker pool rather than a single-threaded scan -- this
    /// is read-only fan-out, so it never touches the journal. Ordering
    /// across and within tables is unspecified. `visitor` returns `false` to
    /// request an early stop; with multiple tables racing across threads,
    /// that stop is best-effort rather than an exact cutoff.
    pub fn parallel_traverse(
        &self,
        dirty_only: bool,
        visitor: impl Fn(&str, &[u8], &Entry) -> bool + Send + Sync,
    ) {
        use rayon::prelude::*;
        use std::sync::atomic::{AtomicBool, Ordering};

        let tables = self.tables.read().unwrap();
        let rows: Vec<(&str, &Vec<u8>, &Entry)> = tables
            .iter()
            .flat_map(|(name, state)| {
                let local = state.rows.iter().filter(move |(_, e)| !dirty_only || e.dirty());
                local.map(move |(k, e)| (name.as_str(), k, e))
            })
            .collect();

        let stop = AtomicBool::new(false);
        rows.into_par_iter().for_each(|(table, key, entry)| {
            if stop.load(Ordering::Relaxed) {
                return;
            }
            if !visitor(table, key, entry) {
                stop.store(true, Ordering::Relaxed);
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::NullBackend;
    use crate::condition::Condition;

    fn leaf() -> Arc<StateStorage> {
        Arc::new(StateStorage::new(None, Some(Arc::new(NullBackend)), 0))
    }

    #[test]
    fn create_then_open_round_trips_schema() {
        let storage = leaf();
        assert!(storage.open_table("t_test").is_none());

        let info = storage.create_table("t_test", vec!["value".into()]).unwrap();
        assert_eq!(info.name(), "t_test");

        let table = storage.open_table("t_test").unwrap();
        assert_eq!(table.table_info().name(), "t_test");
    }

    #[test]
    fn create_table_twice_fails() {
        let storage = leaf();
        storage.create_table("t_test", vec!["value".into()]).unwrap();
        let err = storage.create_table("t_test", vec!["value".into()]).unwrap_err();
        assert!(matches!(err, Error::TableExists(_)));
    }

    #[test]
    fn set_row_then_get_row_round_trips() {
        let storage = leaf();
        storage.create_table("t_test", vec!["value".into()]).unwrap();
        let table = storage.open_table("t_test").unwrap();

        let mut entry = table.new_entry();
        entry.set_field("value", "Lili").unwrap();
        table.set_row("name", entry).unwrap();

        let fetched = table.get_row("name").unwrap().unwrap();
        assert_eq!(fetched.get_field("value").unwrap(), "Lili");
    }

    #[test]
    fn version_check_rejects_stale_write() {
        let storage = leaf();
        storage.create_table("t_test", vec!["value".into()]).unwrap();
        let table = storage.open_table("t_test").unwrap();

        let mut entry = table.new_entry();
        entry.set_field("value", "first").unwrap();
        table.set_row("k", entry).unwrap();

        let mut stale = table.new_entry();
        stale.set_field("value", "second").unwrap();
        // version defaults to 0, same as the first write -- must be rejected.
        let err = table.set_row("k", stale).unwrap_err();
        assert!(matches!(err, Error::VersionCheckFail { .. }));

        let mut correct = table.new_entry();
        correct.set_field("value", "second").unwrap();
        correct.set_version(1);
        table.set_row("k", correct).unwrap();
    }

    #[test]
    fn rollback_undoes_writes_past_the_savepoint() {
        let storage = leaf();
        storage.create_table("t_test", vec!["value".into()]).unwrap();
        let table = storage.open_table("t_test").unwrap();

        let mut entry = table.new_entry();
        entry.set_field("value", "a").unwrap();
        table.set_row("name", entry).unwrap();

        let savepoint = storage.savepoint();

        let mut entry = table.new_entry();
        entry.set_field("value", "12345").unwrap();
        table.set_row("id", entry).unwrap();
        assert!(table.get_row("id").unwrap().is_some());

        storage.rollback(savepoint).unwrap();
        assert!(table.get_row("id").unwrap().is_none());
        assert_eq!(table.get_row("name").unwrap().unwrap().get_field("value").unwrap(), "a");
    }

    #[test]
    fn rollback_past_table_creation_makes_open_table_return_none_again() {
        let storage = leaf();
        let savepoint = storage.savepoint();
        storage.create_table("t_test", vec!["value".into()]).unwrap();
        assert!(storage.open_table("t_test").is_some());

        storage.rollback(savepoint).unwrap();
        assert!(storage.open_table("t_test").is_none());
    }

    #[test]
    fn nested_savepoints_roll_back_independently() {
        let storage = leaf();
        storage.create_table("t_test", vec!["value".into()]).unwrap();
        let table = storage.open_table("t_test").unwrap();

        let mut entry = table.new_entry();
        entry.set_field("value", "1").unwrap();
        table.set_row("k", entry).unwrap();

        let outer = storage.savepoint();
        let mut entry = table.new_entry();
        entry.set_field("value", "2").unwrap();
        entry.set_version(1);
        table.set_row("k", entry).unwrap();

        let inner = storage.savepoint();
        let mut entry = table.new_entry();
        entry.set_field("value", "3").unwrap();
        entry.set_version(2);
        table.set_row("k", entry).unwrap();

        storage.rollback(inner).unwrap();
        assert_eq!(table.get_row("k").unwrap().unwrap().get_field("value").unwrap(), "2");

        storage.rollback(outer).unwrap();
        assert_eq!(table.get_row("k").unwrap().unwrap().get_field("value").unwrap(), "1");
    }

    #[test]
    fn read_falls_through_to_parent_layer() {
        let parent = leaf();
        parent.create_table("t_test", vec!["value".into()]).unwrap();
        let parent_table = parent.open_table("t_test").unwrap();
        let mut entry = parent_table.new_entry();
        entry.set_field("value", "from-parent").unwrap();
        parent_table.set_row("k", entry).unwrap();

        let child = Arc::new(StateStorage::new(Some(parent.clone()), None, 1));
        let child_table = child.open_table("t_test").unwrap();
        let fetched = child_table.get_row("k").unwrap().unwrap();
        assert_eq!(fetched.get_field("value").unwrap(), "from-parent");
    }

    #[test]
    fn child_write_masks_parent_without_mutating_it() {
        let parent = leaf();
        parent.create_table("t_test", vec!["value".into()]).unwrap();
        let parent_table = parent.open_table("t_test").unwrap();
        let mut entry = parent_table.new_entry();
        entry.set_field("value", "from-parent").unwrap();
        parent_table.set_row("k", entry).unwrap();

        let child = Arc::new(StateStorage::new(Some(parent.clone()), None, 1));
        let child_table = child.open_table("t_test").unwrap();
        let mut overwrite = child_table.new_entry();
        overwrite.set_field("value", "from-child").unwrap();
        overwrite.set_version(1);
        child_table.set_row("k", overwrite).unwrap();

        assert_eq!(
            child_table.get_row("k").unwrap().unwrap().get_field("value").unwrap(),
            "from-child"
        );
        assert_eq!(
            parent_table.get_row("k").unwrap().unwrap().get_field("value").unwrap(),
            "from-parent"
        );
    }

    #[test]
    fn deep_chain_of_layers_falls_through_to_the_root() {
        let mut current = leaf();
        current.create_table("t_test", vec!["value".into()]).unwrap();
        {
            let table = current.open_table("t_test").unwrap();
            let mut entry = table.new_entry();
            entry.set_field("value", "root").unwrap();
            table.set_row("k", entry).unwrap();
        }

        for i in 1..20u64 {
            current = Arc::new(StateStorage::new(Some(current.clone()), None, i));
        }

        let table = current.open_table("t_test").unwrap();
        assert_eq!(table.get_row("k").unwrap().unwrap().get_field("value").unwrap(), "root");
    }

    #[test]
    fn table_hashes_ignore_non_dirty_cached_rows() {
        let parent = leaf();
        parent.create_table("t_test", vec!["value".into()]).unwrap();
        let parent_table = parent.open_table("t_test").unwrap();
        let mut entry = parent_table.new_entry();
        entry.set_field("value", "v").unwrap();
        parent_table.set_row("k", entry).unwrap();

        let child = Arc::new(StateStorage::new(Some(parent.clone()), None, 1));
        let child_table = child.open_table("t_test").unwrap();
        // Pulls the row into the child's cache without writing anything.
        child_table.get_row("k").unwrap();

        assert!(child.table_hashes().get("t_test").is_none());
    }

    #[test]
    fn identical_writes_on_fresh_layers_hash_identically() {
        let base = leaf();
        base.create_table("t_test", vec!["value".into()]).unwrap();

        let build = || {
            let storage = Arc::new(StateStorage::new(Some(base.clone()), None, 1));
            let table = storage.open_table("t_test").unwrap();
            let mut entry = table.new_entry();
            entry.set_field("value", "x").unwrap();
            table.set_row("k", entry).unwrap();
            storage
        };

        let a = build();
        let b = build();
        assert_eq!(a.table_hashes(), b.table_hashes());
    }

    #[test]
    fn get_primary_keys_applies_condition_and_masks_deleted_rows() {
        let storage = leaf();
        storage.create_table("t_test", vec!["value".into()]).unwrap();
        let table = storage.open_table("t_test").unwrap();

        for (key, value) in [("a", "apple"), ("b", "banana"), ("c", "cherry")] {
            let mut entry = table.new_entry();
            entry.set_field("value", value).unwrap();
            table.set_row(key, entry).unwrap();
        }

        let mut deleted = table.new_deleted_entry();
        deleted.set_version(1);
        table.set_row("b", deleted).unwrap();

        let keys = table
            .get_primary_keys(&Condition::new().ge("value", "a"))
            .unwrap();
        assert_eq!(keys, vec![b"a".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn create_table_writes_a_dirty_row_into_the_system_catalog() {
        let storage = leaf();
        assert!(storage.open_table("s_tables").is_some());

        storage.create_table("t_test", vec!["value".into()]).unwrap();

        let catalog = storage.open_table("s_tables").unwrap();
        let row = catalog.get_row("t_test").unwrap().unwrap();
        assert_eq!(row.get_field("value").unwrap(), "value");
    }

    #[test]
    fn parallel_traverse_visits_every_local_table_dirty_row() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let layer = leaf();
        for t in 0..10 {
            let name = format!("t_{t}");
            layer.create_table(&name, vec!["value".to_string()]).unwrap();
            let table = layer.open_table(&name).unwrap();
            for r in 0..100 {
                let key = format!("row-{r}");
                let mut entry = table.new_entry();
                entry.set_field("value", format!("{t}-{r}")).unwrap();
                table.set_row(key, entry).unwrap();
            }
        }

        let visited = AtomicUsize::new(0);
        layer.parallel_traverse(true, |_table, _key, _entry| {
            visited.fetch_add(1, Ordering::Relaxed);
            true
        });

        // 10 tables of 100 rows each, plus one dirty catalog row per table
        // created at this layer.
        assert_eq!(visited.load(Ordering::Relaxed), 10 * 100 + 10);
    }

    #[tokio::test]
    async fn async_get_row_falls_through_to_backend() {
        struct OneRowBackend;

        #[async_trait::async_trait]
        impl StorageInterface for OneRowBackend {
            async fn async_get_row(&self, table: &str, key: &[u8]) -> CResult<Option<Entry>> {
                if key == b"k" {
                    let info = TableInfo::new(table, vec!["value".into()]).unwrap();
                    let mut e = Entry::new(info, 0);
                    e.set_field_at(0, "from-backend").unwrap();
                    Ok(Some(e))
                } else {
                    Ok(None)
                }
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

        let storage = Arc::new(StateStorage::new(None, Some(Arc::new(OneRowBackend)), 0));
        storage.create_table("t_test", vec!["value".into()]).unwrap();

        let entry = storage.async_get_row("t_test", b"k").await.unwrap().unwrap();
        assert_eq!(entry.get_field_at(0).unwrap(), "from-backend");
        assert!(storage.async_get_row("t_test", b"missing").await.unwrap().is_none());
    }
}
