//! Deterministic per-table hashing used for state-root computation.
//!
//! The hash primitive itself is out of scope here (see this crate's
//! Non-goals) -- [`HashImpl`] is the seam a caller plugs a real digest
//! algorithm into. [`Sha256Hash`] is the default collaborator, grounded in
//! how `nearcore` reaches for `sha2` rather than rolling its own digest.
//!
//! The wire format a table's dirty rows are folded into is fixed so that
//! two processes computing the same table's hash from the same rows always
//! agree, independent of HashMap iteration order:
//!
//! ```text
//! for each dirty row, sorted by primary key bytes ascending:
//!     key_bytes
//!     status_byte            (0 = NORMAL, 1 = DELETED)
//!     block_num (8 bytes LE)
//!     for each field, in schema order:
//!         field_len (4 bytes LE)
//!         field_bytes
//! ```

use sha2::{Digest, Sha256};

use crate::entry::{Entry, Status};

/// A pluggable digest collaborator. Implementors need not be SHA-256;
/// anything that folds bytes into a running state and yields a fixed digest
/// at the end satisfies this.
pub trait HashImpl: Default {
    fn update(&mut self, bytes: &[u8]);
    fn finalize(self) -> Vec<u8>;
}

#[derive(Default)]
pub struct Sha256Hash {
    inner: Sha256,
}

impl HashImpl for Sha256Hash {
    fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    fn finalize(self) -> Vec<u8> {
        self.inner.finalize().to_vec()
    }
}

fn status_byte(status: Status) -> u8 {
    match status {
        Status::Normal => 0,
        Status::Deleted => 1,
    }
}

/// Folds one row into `hasher` per the wire format documented above. The
/// caller is responsible for key ordering and for only passing dirty rows.
pub fn hash_row<H: HashImpl>(hasher: &mut H, key: &[u8], entry: &Entry) {
    hasher.update(key);
    hasher.update(&[status_byte(entry.status())]);
    hasher.update(&entry.num().to_le_bytes());
    for field in entry.fields() {
        let bytes = field.as_bytes();
        hasher.update(&(bytes.len() as u32).to_le_bytes());
        hasher.update(bytes);
    }
}

/// Hashes a table's dirty rows, given as `(key_bytes, entry)` pairs already
/// sorted by key. Returns the default hasher's digest bytes.
pub fn hash_table<H: HashImpl>(rows: &[(Vec<u8>, Entry)]) -> Vec<u8> {
    let mut hasher = H::default();
    for (key, entry) in rows {
        hash_row(&mut hasher, key, entry);
    }
    hasher.finalize()
}
