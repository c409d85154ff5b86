//! `s_tables`: the in-band catalog a [`crate::state_storage::StateStorage`]
//! consults when a table's schema isn't already known anywhere in its
//! in-memory chain, but might be recorded in the backing
//! [`crate::backend::StorageInterface`].
//!
//! Each row's key is the table's name; its sole value field is that table's
//! field list, encoded the same way [`TableInfo::to_value_fields`] encodes
//! it. There is nothing magic about `s_tables` itself -- it is just another
//! table, bootstrapped once per chain so the catalog can be looked up with
//! the same row-oriented machinery as everything else.

use std::sync::Arc;

use crate::table_info::TableInfo;

pub const NAME: &str = "s_tables";
pub const KEY_FIELD: &str = "table_name";
pub const VALUE_FIELD: &str = "value";

/// The fixed schema of `s_tables` itself.
pub fn schema() -> Arc<TableInfo> {
    TableInfo::new(NAME, vec![KEY_FIELD.to_string(), VALUE_FIELD.to_string()])
        .expect("s_tables schema has no duplicate fields")
}
