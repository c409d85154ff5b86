//! `state-storage` is an in-memory, transactional key/value store for a
//! blockchain framework's state layer. Rows live in named tables of fixed
//! schema; every write is copy-on-write with respect to the storage it was
//! forked from, so a whole tree of in-flight blocks can share unmodified
//! state for free. [Author fengyang]
//!
//! A [`state_storage::StateStorage`] is one block's worth of state. It
//! chains onto its parent block's storage, and a read that misses locally
//! falls through that chain until it either finds the row or exhausts the
//! chain and asks the external [`backend::StorageInterface`] this crate
//! never implements itself. Writes only ever touch the layer they were made
//! on: nothing here mutates an ancestor.
//!
//! ## Getting started
//!
//! ```rust
//! use std::sync::Arc;
//! use state_storage::state_storage::StateStorage;
//!
//! fn run() -> state_storage::error::CResult<()> {
//!     let storage = Arc::new(StateStorage::new(None, None, 0));
//!     storage.create_table("t_test", vec!["value".to_string()])?;
//!     let table = storage.open_table("t_test").unwrap();
//!
//!     let mut entry = table.new_entry();
//!     entry.set_field("value", "Lili")?;
//!     table.set_row("name", entry)?;
//!
//!     let fetched = table.get_row("name")?.unwrap();
//!     assert_eq!(fetched.get_field("value")?, "Lili");
//!     Ok(())
//! }
//!
//! run().unwrap();
//! ```

pub mod backend;
pub mod condition;
pub mod cow;
pub mod entry;
pub mod error;
pub mod hash;
pub mod state_storage;
pub mod system_table;
pub mod table;
pub mod table_info;
