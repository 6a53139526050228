use dz_protocol::{MessageKind, TransactionRecord};
use dz_types::Address;
use serde::{Deserialize, Serialize};

/// Options narrowing an address or block message lookup.
///
/// Each set option adds a constraint; omitted options impose none. When
/// `block_height` is set it takes precedence over the start/end range.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    pub block_height: Option<u64>,
    /// Only transactions between these two addresses, in either direction.
    pub between: Option<(Address, Address)>,
    /// Applied after decoding, since the type lives in the payload.
    pub message_type: Option<MessageKind>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_block(mut self, height: u64) -> Self {
        self.start_block = Some(height);
        self
    }

    pub fn end_block(mut self, height: u64) -> Self {
        self.end_block = Some(height);
        self
    }

    pub fn block_height(mut self, height: u64) -> Self {
        self.block_height = Some(height);
        self
    }

    pub fn between(mut self, a: Address, b: Address) -> Self {
        self.between = Some((a, b));
        self
    }

    pub fn message_type(mut self, kind: MessageKind) -> Self {
        self.message_type = Some(kind);
        self
    }

    /// Addresses these options reference, for validation.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.between.iter().flat_map(|(a, b)| [a, b])
    }

    /// Record-level constraints (everything except `message_type`).
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        let height = record.block_height();
        if let Some(exact) = self.block_height {
            if height != exact {
                return false;
            }
        } else {
            if self.start_block.is_some_and(|start| height < start) {
                return false;
            }
            if self.end_block.is_some_and(|end| height > end) {
                return false;
            }
        }

        if let Some((a, b)) = &self.between {
            let forward = record.sender_addr == *a && record.receiver_addr == *b;
            let backward = record.sender_addr == *b && record.receiver_addr == *a;
            if !(forward || backward) {
                return false;
            }
        }
        true
    }
}

/// Predicate over transaction records, passed to
/// [`crate::LedgerConnection::find_transactions`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TxFilter {
    /// If set, only records sent or received by this address.
    pub for_address: Option<Address>,
    pub options: QueryOptions,
}

impl TxFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_address(addr: Address, options: QueryOptions) -> Self {
        Self {
            for_address: Some(addr),
            options,
        }
    }

    pub fn in_block(height: u64, options: QueryOptions) -> Self {
        Self {
            for_address: None,
            options: options.block_height(height),
        }
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        if let Some(addr) = &self.for_address {
            if !record.involves(addr) {
                return false;
            }
        }
        self.options.matches(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dz_crypto::SigningKey;
    use dz_protocol::TransactionDraft;
    use dz_types::{LedgerPosition, Network};

    fn record(sender: &SigningKey, receiver: Address, height: u64) -> TransactionRecord {
        let sender_addr = sender.address(Network::Testnet);
        let draft = TransactionDraft::new(Some(receiver), vec![]);
        let position = LedgerPosition::new(height, 0);
        TransactionRecord {
            txid: TransactionRecord::compute_txid(position, &sender_addr, &receiver, &[]),
            position,
            sender_addr,
            receiver_addr: receiver,
            signer: sender.verifying_key(),
            signature: draft.sign(&receiver, sender),
            payload: vec![],
        }
    }

    #[test]
    fn empty_options_match_everything() {
        let key = SigningKey::generate();
        let rec = record(&key, key.address(Network::Testnet), 5);
        assert!(QueryOptions::new().matches(&rec));
        assert!(TxFilter::all().matches(&rec));
    }

    #[test]
    fn block_range_is_inclusive() {
        let key = SigningKey::generate();
        let me = key.address(Network::Testnet);
        let options = QueryOptions::new().start_block(2).end_block(4);
        assert!(!options.matches(&record(&key, me, 1)));
        assert!(options.matches(&record(&key, me, 2)));
        assert!(options.matches(&record(&key, me, 4)));
        assert!(!options.matches(&record(&key, me, 5)));
    }

    #[test]
    fn exact_height_overrides_range() {
        let key = SigningKey::generate();
        let me = key.address(Network::Testnet);
        let options = QueryOptions::new().start_block(10).block_height(3);
        assert!(options.matches(&record(&key, me, 3)));
        assert!(!options.matches(&record(&key, me, 10)));
    }

    #[test]
    fn between_matches_both_directions() {
        let a = SigningKey::generate();
        let b = SigningKey::generate();
        let c = SigningKey::generate().address(Network::Testnet);
        let a_addr = a.address(Network::Testnet);
        let b_addr = b.address(Network::Testnet);
        let options = QueryOptions::new().between(a_addr, b_addr);

        assert!(options.matches(&record(&a, b_addr, 1)));
        assert!(options.matches(&record(&b, a_addr, 1)));
        assert!(!options.matches(&record(&a, c, 1)));
        assert_eq!(options.addresses().count(), 2);
    }

    #[test]
    fn address_filter_checks_sender_or_receiver() {
        let a = SigningKey::generate();
        let b = SigningKey::generate().address(Network::Testnet);
        let rec = record(&a, b, 1);
        assert!(TxFilter::for_address(b, QueryOptions::new()).matches(&rec));
        assert!(TxFilter::for_address(a.address(Network::Testnet), QueryOptions::new()).matches(&rec));
        let stranger = SigningKey::generate().address(Network::Testnet);
        assert!(!TxFilter::for_address(stranger, QueryOptions::new()).matches(&rec));
    }
}
