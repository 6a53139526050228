use serde::{Deserialize, Serialize};

/// Sizing for a tracker's bloom filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Number of addresses the filter is sized for.
    pub expected_addresses: usize,
    /// Target false-positive rate once `expected_addresses` are tracked.
    pub false_positive_rate: f64,
    /// Seed offset, rotated to keep filters from identifying a client.
    pub tweak: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            expected_addresses: 100,
            false_positive_rate: 0.0001,
            tweak: 0,
        }
    }
}
