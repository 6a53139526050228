//! Foundation types for Dropzone.
//!
//! Every other Dropzone crate depends on `dz-types`.
//!
//! # Key Types
//!
//! - [`Network`] — Ledger network an address is scoped to
//! - [`Address`] — Base58check identity derived from a public key hash
//! - [`TransferTarget`] — Outbound disposition of a profile (address or the `0` sentinel)
//! - [`TxId`] — Transaction identifier
//! - [`LedgerPosition`] — Total replay order (block height, creation index)

pub mod address;
pub mod error;
pub mod network;
pub mod position;
pub mod transfer;

pub use address::{Address, HASH160_LEN};
pub use error::TypeError;
pub use network::Network;
pub use position::{LedgerPosition, TxId};
pub use transfer::TransferTarget;
