use dz_types::Network;
use serde::{Deserialize, Serialize};

/// Configuration for the [`crate::InMemoryLedger`] reference driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryLedgerConfig {
    /// Network every address on this ledger is scoped to.
    pub network: Network,
    /// Height new ledgers start at, and the height `clear_transactions`
    /// rewinds to.
    pub starting_block_height: u64,
}

impl Default for MemoryLedgerConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            starting_block_height: 0,
        }
    }
}
