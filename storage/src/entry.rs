//! A row: status, version, dirty flag, block number, and a COW-shared
//! field vector. [Author fengyang]

use std::sync::Arc;

use crate::cow::CowCell;
use crate::error::{CResult, Error};
use crate::table_info::TableInfo;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Normal,
    Deleted,
}

/// The field vector plus its running byte-capacity counter, kept together
/// inside the COW payload so that two clones of an `Entry` never disagree
/// about `capacity_of_hash_field` after one of them mutates (see
/// SPEC_FULL.md's note on the two historical `Entry` shapes).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Payload {
    fields: Vec<String>,
    capacity_of_hash_field: usize,
}

impl Payload {
    fn new(arity: usize) -> Self {
        Self {
            fields: vec![String::new(); arity],
            capacity_of_hash_field: 0,
        }
    }

    fn recompute_capacity(&mut self) {
        self.capacity_of_hash_field = self.fields.iter().map(|f| f.len()).sum();
    }
}

#[derive(Clone, Debug)]
pub struct Entry {
    status: Status,
    num: u64,
    version: u64,
    dirty: bool,
    rollbacked: bool,
    table_info: Option<Arc<TableInfo>>,
    data: CowCell<Payload>,
}

impl Entry {
    /// Creates a fresh `NORMAL` entry bound to `table_info`, with an
    /// all-empty field vector sized to the schema's arity. Used by
    /// `Table::new_entry`; not `dirty` until a field is set or it is
    /// installed with `set_row`.
    pub fn new(table_info: Arc<TableInfo>, num: u64) -> Self {
        let arity = table_info.arity();
        Self {
            status: Status::Normal,
            num,
            version: 0,
            dirty: false,
            rollbacked: false,
            table_info: Some(table_info),
            data: CowCell::new(Payload::new(arity)),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn set_status(&mut self, status: Status) {
        // Touching the payload keeps the "mutation requires uniqueness"
        // contract consistent even when only `status` changes.
        let _ = self.data.mutable_get();
        self.status = status;
        self.dirty = true;
    }

    /// `NORMAL` and not invalidated by a rollback.
    pub fn valid(&self) -> bool {
        self.status == Status::Normal && !self.rollbacked
    }

    pub fn num(&self) -> u64 {
        self.num
    }

    pub fn set_num(&mut self, num: u64) {
        self.num = num;
        self.dirty = true;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn rollbacked(&self) -> bool {
        self.rollbacked
    }

    pub fn set_rollbacked(&mut self, rollbacked: bool) {
        self.rollbacked = rollbacked;
    }

    pub fn table_info(&self) -> CResult<&Arc<TableInfo>> {
        self.table_info.as_ref().ok_or(Error::SchemaMissing)
    }

    /// Current sharers of the COW field-vector payload. Exposed for tests
    /// and debugging, mirroring the original `Entry::refCount`.
    pub fn ref_count(&self) -> usize {
        self.data.ref_count()
    }

    pub fn capacity_of_hash_field(&self) -> usize {
        self.data.get().capacity_of_hash_field
    }

    pub fn fields(&self) -> &[String] {
        &self.data.get().fields
    }

    fn index_of(&self, name: &str) -> CResult<usize> {
        self.table_info()?
            .index_of(name)
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))
    }

    pub fn get_field_at(&self, index: usize) -> CResult<&str> {
        self.data
            .get()
            .fields
            .get(index)
            .map(|s| s.as_str())
            .ok_or(Error::FieldIndexOutOfRange(index))
    }

    pub fn get_field(&self, name: &str) -> CResult<&str> {
        let index = self.index_of(name)?;
        self.get_field_at(index)
    }

    pub fn set_field_at(&mut self, index: usize, value: impl Into<String>) -> CResult<()> {
        let value = value.into();
        let payload = self.data.mutable_get();
        let slot = payload
            .fields
            .get_mut(index)
            .ok_or(Error::FieldIndexOutOfRange(index))?;
        let delta = value.len() as isize - slot.len() as isize;
        *slot = value;
        payload.capacity_of_hash_field = (payload.capacity_of_hash_field as isize + delta) as usize;
        self.dirty = true;
        Ok(())
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> CResult<()> {
        let index = self.index_of(name)?;
        self.set_field_at(index, value)
    }

    /// Replaces the whole field vector, recomputing the capacity counter
    /// from scratch and marking the entry dirty.
    pub fn import_fields(&mut self, fields: Vec<String>) {
        let payload = self.data.mutable_get();
        payload.fields = fields;
        payload.recompute_capacity();
        self.dirty = true;
    }

    /// Moves the field vector out, leaving the cell's payload empty and its
    /// capacity counter reset to zero.
    pub fn export_fields(&mut self) -> Vec<String> {
        let payload = self.data.mutable_get();
        payload.capacity_of_hash_field = 0;
        std::mem::take(&mut payload.fields)
    }
}
