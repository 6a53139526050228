use std::collections::BTreeSet;

use dz_protocol::TransactionRecord;
use dz_types::Address;
use tracing::trace;

use crate::bloom::BloomFilter;
use crate::config::FilterConfig;

/// Addresses of interest, held both exactly and as a bloom filter.
///
/// The exact set answers [`RelevanceTracker::is_relevant`] locally. The
/// filter holds each address's hash160, the form a remote peer sees in
/// transaction outputs, and is what gets shipped over the wire.
#[derive(Clone, Debug)]
pub struct RelevanceTracker {
    filter: BloomFilter,
    addresses: BTreeSet<Address>,
}

impl RelevanceTracker {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            filter: BloomFilter::with_rate(
                config.expected_addresses,
                config.false_positive_rate,
                config.tweak,
            ),
            addresses: BTreeSet::new(),
        }
    }

    /// Start tracking `addr`. Returns `false` if it was already tracked.
    pub fn track(&mut self, addr: Address) -> bool {
        if !self.addresses.insert(addr) {
            return false;
        }
        self.filter.insert(addr.hash160());
        trace!(addr = %addr, tracked = self.addresses.len(), "tracking address");
        true
    }

    /// Exact membership.
    pub fn is_relevant(&self, addr: &Address) -> bool {
        self.addresses.contains(addr)
    }

    /// Filter membership, as a peer holding [`RelevanceTracker::filter`]
    /// would answer it. May be `true` for untracked addresses.
    pub fn might_be_relevant(&self, addr: &Address) -> bool {
        self.filter.contains(addr.hash160())
    }

    /// `true` if either end of `record` is tracked.
    pub fn is_record_relevant(&self, record: &TransactionRecord) -> bool {
        self.is_relevant(&record.sender_addr) || self.is_relevant(&record.receiver_addr)
    }

    /// Tracked addresses in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.addresses.iter()
    }

    pub fn filter(&self) -> &BloomFilter {
        &self.filter
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

impl Default for RelevanceTracker {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

impl Extend<Address> for RelevanceTracker {
    fn extend<I: IntoIterator<Item = Address>>(&mut self, iter: I) {
        for addr in iter {
            self.track(addr);
        }
    }
}
