//! Ledger connection boundary for Dropzone.
//!
//! This crate provides:
//! - The [`LedgerConnection`] trait: address derivation and validation,
//!   transaction creation and lookup, and filtered queries returned newest
//!   first by ledger position
//! - [`QueryOptions`] / [`TxFilter`] narrowing those queries
//! - [`InMemoryLedger`], a reference driver for tests, demos, and snapshots

pub mod config;
pub mod error;
pub mod memory;
pub mod query;
pub mod traits;

pub use config::MemoryLedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use memory::{InMemoryLedger, LedgerSnapshot};
pub use query::{QueryOptions, TxFilter};
pub use traits::LedgerConnection;
