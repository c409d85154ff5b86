//! Error taxonomy for the state storage core. [Author fengyang]
//!
//! Schema/index errors are programmer errors surfaced synchronously; a
//! parent-backend failure is wrapped in [`Error::Backend`] and propagated
//! unchanged. Nothing is swallowed: every failure path returns a value of
//! this type, sync or async.

use std::fmt;

/// The crate-wide result alias, used the same way `kv-rs` uses `CResult`.
pub type CResult<T> = Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// `create_table` found the name already registered somewhere in the chain.
    TableExists(String),

    /// `open_table` could not resolve the name in this storage or any ancestor.
    TableNotFound(String),

    /// A field name isn't present in the table's schema.
    FieldNotFound(String),

    /// A numeric field index fell outside `0..fields.len()`.
    FieldIndexOutOfRange(usize),

    /// An `Entry` was addressed by field name/index but carries no `TableInfo`.
    SchemaMissing,

    /// `set_row` found a predecessor whose version didn't satisfy
    /// `new.version == predecessor.version + 1`.
    VersionCheckFail { expected: u64, found: u64 },

    /// A failure surfaced by the parent `StorageInterface`.
    Backend(Box<dyn std::error::Error + Send + Sync>),

    /// Anything else that should never happen given the invariants in this crate.
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TableExists(name) => write!(f, "table already exists: {name}"),
            Error::TableNotFound(name) => write!(f, "table not found: {name}"),
            Error::FieldNotFound(name) => write!(f, "field not found: {name}"),
            Error::FieldIndexOutOfRange(i) => write!(f, "field index out of range: {i}"),
            Error::SchemaMissing => write!(f, "entry has no attached schema"),
            Error::VersionCheckFail { expected, found } => write!(
                f,
                "version check failed: expected {expected}, found {found}"
            ),
            Error::Backend(inner) => write!(f, "backend error: {inner}"),
            Error::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Backend(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

impl Error {
    pub fn backend<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Error::Backend(Box::new(err))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        let err = Error::VersionCheckFail {
            expected: 2,
            found: 5,
        };
        assert_eq!(
            err.to_string(),
            "version check failed: expected 2, found 5"
        );
    }
}
