//! A REPL and one-shot CLI front end for the state-storage engine.
//!
//! ## Getting started
//!
//! ```doc
//! ❯ ./storage-cli
//!
//! storage-cli -- a REPL for the state-storage engine
//!
//! storage > create t_order id,amount
//! table t_order created
//!
//! storage > set t_order o1 id=o1,amount=10 0
//! ok, o1 set in t_order
//!
//! storage > get t_order o1
//! status=Normal version=0 id=o1 amount=10
//!
//! storage > savepoint
//! 1
//!
//! storage > rollback 0
//! ok, rolled back
//!
//! storage > get t_order o1
//! (not found)
//! ```

pub mod config;
pub mod rusty;
pub mod session;
pub mod trace;
