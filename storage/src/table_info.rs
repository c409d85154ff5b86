//! Immutable schema descriptor for a table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CResult, Error};

/// Field list separator used by the `s_tables` value column, matching the
/// conventional "key field first, then comma-separated value fields" layout.
pub const FIELD_SEPARATOR: char = ',';

/// `name`, ordered `fields`, and a `field -> index` map. Never mutated after
/// construction; shared via `Arc` by every `Entry`/`Table` that references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    name: String,
    fields: Vec<String>,
    field_index: HashMap<String, usize>,
}

impl TableInfo {
    /// Builds a schema from a table name and its ordered field list.
    ///
    /// Fails with [`Error::Internal`] if field names are duplicated -- the
    /// schema would no longer have a well-defined `field -> index` mapping.
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> CResult<Arc<Self>> {
        let mut field_index = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if field_index.insert(field.clone(), i).is_some() {
                return Err(Error::Internal(format!("duplicate field name: {field}")));
            }
        }
        Ok(Arc::new(Self {
            name: name.into(),
            fields,
            field_index,
        }))
    }

    /// Parses the `s_tables` value column: a comma-separated field list with
    /// the key field first (e.g. `"key,value"`).
    pub fn from_value_fields(name: impl Into<String>, value: &str) -> CResult<Arc<Self>> {
        let fields: Vec<String> = value
            .split(FIELD_SEPARATOR)
            .map(|s| s.to_string())
            .collect();
        Self::new(name, fields)
    }

    /// Serializes the field list back into the `s_tables` value column format.
    pub fn to_value_fields(&self) -> String {
        self.fields.join(&FIELD_SEPARATOR.to_string())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.field_index.get(field).copied()
    }
}
