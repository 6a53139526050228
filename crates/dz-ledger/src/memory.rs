use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use dz_crypto::SigningKey;
use dz_protocol::{TransactionDraft, TransactionRecord};
use dz_types::{LedgerPosition, Network, TxId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MemoryLedgerConfig;
use crate::error::LedgerError;
use crate::query::TxFilter;
use crate::traits::LedgerConnection;

/// In-memory ledger driver for tests, local demos, and snapshot files.
///
/// A single `RwLock` guards the append log. Block height only moves when
/// [`InMemoryLedger::increment_block_height`] is called, so every
/// transaction created in between lands in the same block, ordered by its
/// creation index.
pub struct InMemoryLedger {
    config: MemoryLedgerConfig,
    reachable: AtomicBool,
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    height: u64,
    next_index: u64,
    transactions: Vec<TransactionRecord>,
    by_id: HashMap<TxId, usize>,
}

/// Serialisable image of an [`InMemoryLedger`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub network: Network,
    pub block_height: u64,
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
}

impl InMemoryLedger {
    pub fn new(config: MemoryLedgerConfig) -> Self {
        let state = LedgerState {
            height: config.starting_block_height,
            ..Default::default()
        };
        Self {
            config,
            reachable: AtomicBool::new(true),
            inner: RwLock::new(state),
        }
    }

    /// Rebuild a ledger from a snapshot.
    ///
    /// Records are taken as-is; authenticity is checked when they are
    /// decoded, not here.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        let ledger = Self::new(MemoryLedgerConfig {
            network: snapshot.network,
            starting_block_height: 0,
        });
        ledger.import(snapshot.transactions)?;
        {
            let mut state = ledger.write()?;
            state.height = state.height.max(snapshot.block_height);
        }
        Ok(ledger)
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let state = self.read()?;
        Ok(LedgerSnapshot {
            network: self.config.network,
            block_height: state.height,
            transactions: state.transactions.clone(),
        })
    }

    /// Append raw records, as a networked driver would on receiving them.
    /// Returns the number of records added; already-known ids are skipped.
    pub fn import(&self, records: Vec<TransactionRecord>) -> Result<usize, LedgerError> {
        let mut state = self.write()?;
        let mut added = 0;
        for record in records {
            if state.by_id.contains_key(&record.txid) {
                continue;
            }
            state.height = state.height.max(record.position.block_height);
            state.next_index = state.next_index.max(record.position.index + 1);
            let slot = state.transactions.len();
            state.by_id.insert(record.txid, slot);
            state.transactions.push(record);
            added += 1;
        }
        debug!(added, total = state.transactions.len(), "imported transactions");
        Ok(added)
    }

    /// Advance to the next block. Returns the new height.
    pub fn increment_block_height(&self) -> Result<u64, LedgerError> {
        let mut state = self.write()?;
        state.height += 1;
        Ok(state.height)
    }

    /// Drop every transaction and rewind to the starting height.
    pub fn clear_transactions(&self) -> Result<(), LedgerError> {
        let mut state = self.write()?;
        *state = LedgerState {
            height: self.config.starting_block_height,
            ..Default::default()
        };
        debug!("ledger cleared");
        Ok(())
    }

    /// Simulate the backing store going away (or coming back).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.read()?.transactions.len())
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }

    fn ensure_reachable(&self) -> Result<(), LedgerError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Connection("ledger store unreachable".into()))
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.inner
            .read()
            .map_err(|_| LedgerError::Connection("ledger read lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.inner
            .write()
            .map_err(|_| LedgerError::Connection("ledger write lock poisoned".into()))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(MemoryLedgerConfig::default())
    }
}

#[async_trait]
impl LedgerConnection for InMemoryLedger {
    fn network(&self) -> Network {
        self.config.network
    }

    async fn block_height(&self) -> Result<u64, LedgerError> {
        self.ensure_reachable()?;
        Ok(self.read()?.height)
    }

    async fn create_transaction(
        &self,
        draft: TransactionDraft,
        key: &SigningKey,
    ) -> Result<TransactionRecord, LedgerError> {
        let sender = self.derive_address(key);
        let receiver = draft.receiver_addr.unwrap_or(sender);
        self.check_address(&receiver)?;
        for addr in &draft.payload_addrs {
            self.check_address(addr)?;
        }
        self.ensure_reachable()?;
        let signature = draft.sign(&receiver, key);

        let mut state = self.write()?;
        let position = LedgerPosition::new(state.height, state.next_index);
        let record = TransactionRecord {
            txid: TransactionRecord::compute_txid(position, &sender, &receiver, &draft.payload),
            position,
            sender_addr: sender,
            receiver_addr: receiver,
            signer: key.verifying_key(),
            signature,
            payload: draft.payload,
        };

        let slot = state.transactions.len();
        state.by_id.insert(record.txid, slot);
        state.transactions.push(record.clone());
        state.next_index += 1;

        debug!(
            txid = %record.txid.short_id(),
            position = %record.position,
            sender = %record.sender_addr,
            receiver = %record.receiver_addr,
            "transaction appended"
        );
        Ok(record)
    }

    async fn get_transaction(&self, id: &TxId) -> Result<Option<TransactionRecord>, LedgerError> {
        self.ensure_reachable()?;
        let state = self.read()?;
        Ok(state
            .by_id
            .get(id)
            .and_then(|slot| state.transactions.get(*slot))
            .cloned())
    }

    async fn find_transactions(
        &self,
        filter: &TxFilter,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        self.ensure_reachable()?;
        let state = self.read()?;
        // Storage slot breaks position ties so later imports come first.
        let mut found: Vec<_> = state
            .transactions
            .iter()
            .enumerate()
            .filter(|(_, record)| filter.matches(record))
            .collect();
        found.sort_by(|(sa, a), (sb, b)| b.position.cmp(&a.position).then(sb.cmp(sa)));
        Ok(found.into_iter().map(|(_, record)| record.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dz_protocol::{DzCodec, MessageKind, Payload, SellerFields};
    use dz_types::TransferTarget;

    use crate::query::QueryOptions;

    fn seller(description: &str) -> Vec<u8> {
        DzCodec::encode(&Payload::Seller(SellerFields {
            description: Some(description.into()),
            ..Default::default()
        }))
        .unwrap()
    }

    fn buyer() -> Vec<u8> {
        DzCodec::encode(&Payload::Buyer(Default::default())).unwrap()
    }

    #[tokio::test]
    async fn create_stamps_sender_and_position() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();

        let first = ledger
            .create_transaction(TransactionDraft::new(None, seller("a")), &key)
            .await
            .unwrap();
        ledger.increment_block_height().unwrap();
        let second = ledger
            .create_transaction(TransactionDraft::new(None, seller("b")), &key)
            .await
            .unwrap();

        assert_eq!(first.sender_addr, key.address(Network::Testnet));
        assert_eq!(first.receiver_addr, first.sender_addr);
        assert_eq!(first.position, LedgerPosition::new(0, 0));
        assert_eq!(second.position, LedgerPosition::new(1, 1));
        assert!(first.is_authentic());
    }

    #[tokio::test]
    async fn get_transaction_by_id() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        let rec = ledger
            .create_transaction(TransactionDraft::new(None, seller("a")), &key)
            .await
            .unwrap();

        assert_eq!(ledger.get_transaction(&rec.txid).await.unwrap(), Some(rec));
        assert_eq!(
            ledger.get_transaction(&TxId::from_bytes([9; 32])).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn find_returns_newest_first_within_and_across_blocks() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        let mut created = Vec::new();
        for block in 0..2 {
            for n in 0..2 {
                let rec = ledger
                    .create_transaction(
                        TransactionDraft::new(None, seller(&format!("{block}-{n}"))),
                        &key,
                    )
                    .await
                    .unwrap();
                created.push(rec.txid);
            }
            ledger.increment_block_height().unwrap();
        }

        let found: Vec<_> = ledger
            .find_transactions(&TxFilter::all())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.txid)
            .collect();
        created.reverse();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn messages_for_address_filters_type_and_noise() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        let addr = key.address(Network::Testnet);

        ledger
            .create_transaction(TransactionDraft::new(None, seller("a")), &key)
            .await
            .unwrap();
        ledger
            .create_transaction(TransactionDraft::new(None, buyer()), &key)
            .await
            .unwrap();
        ledger
            .create_transaction(TransactionDraft::new(None, b"not a message".to_vec()), &key)
            .await
            .unwrap();

        let all = ledger
            .messages_for_address(&addr, &QueryOptions::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind(), MessageKind::Buyer);

        let sellers = ledger
            .messages_for_address(&addr, &QueryOptions::new().message_type(MessageKind::Seller))
            .await
            .unwrap();
        assert_eq!(sellers.len(), 1);
        assert_eq!(sellers[0].payload.description(), Some("a"));
    }

    #[tokio::test]
    async fn messages_in_block_only_returns_that_block() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        ledger
            .create_transaction(TransactionDraft::new(None, seller("zero")), &key)
            .await
            .unwrap();
        ledger.increment_block_height().unwrap();
        ledger
            .create_transaction(TransactionDraft::new(None, seller("one")), &key)
            .await
            .unwrap();

        let block_one = ledger
            .messages_in_block(1, &QueryOptions::new())
            .await
            .unwrap();
        assert_eq!(block_one.len(), 1);
        assert_eq!(block_one[0].payload.description(), Some("one"));
    }

    #[tokio::test]
    async fn forged_import_is_excluded_from_messages() {
        let ledger = InMemoryLedger::default();
        let forger = SigningKey::generate();
        let victim = SigningKey::generate().address(Network::Testnet);

        let mut forged = ledger
            .create_transaction(TransactionDraft::new(Some(victim), seller("fake")), &forger)
            .await
            .unwrap();
        ledger.clear_transactions().unwrap();
        forged.sender_addr = victim;
        ledger.import(vec![forged]).unwrap();

        assert_eq!(ledger.len().unwrap(), 1);
        let messages = ledger
            .messages_for_address(&victim, &QueryOptions::new())
            .await
            .unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn wrong_network_address_rejected_before_access() {
        let ledger = InMemoryLedger::default();
        ledger.set_reachable(false);
        let mainnet = SigningKey::generate().address(Network::Mainnet);

        let err = ledger
            .messages_for_address(&mainnet, &QueryOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn payload_addresses_must_match_network() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        let mainnet = SigningKey::generate().address(Network::Mainnet);
        let payload = Payload::Seller(SellerFields {
            communications_addr: Some(mainnet),
            transfer_addr: Some(TransferTarget::Address(mainnet)),
            ..Default::default()
        });

        let draft = TransactionDraft::message(None, &payload).unwrap();
        let err = ledger.create_transaction(draft, &key).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAddress(_)));
        assert!(ledger.is_empty().unwrap());

        let local = ledger.address_from_hash(*mainnet.hash160(), None);
        let payload = Payload::Seller(SellerFields {
            communications_addr: Some(local),
            transfer_addr: Some(TransferTarget::Address(local)),
            ..Default::default()
        });
        let draft = TransactionDraft::message(None, &payload).unwrap();
        ledger.create_transaction(draft, &key).await.unwrap();
        let messages = ledger
            .messages_for_address(&key.address(Network::Testnet), &QueryOptions::new())
            .await
            .unwrap();
        assert_eq!(messages[0].payload, payload);
    }

    #[tokio::test]
    async fn position_ties_return_latest_import_first() {
        let key = SigningKey::generate();
        let mut records = Vec::new();
        for description in ["first", "second"] {
            let source = InMemoryLedger::default();
            let rec = source
                .create_transaction(TransactionDraft::new(None, seller(description)), &key)
                .await
                .unwrap();
            records.push(rec);
        }
        assert_eq!(records[0].position, records[1].position);

        let ledger = InMemoryLedger::default();
        ledger.import(records.clone()).unwrap();
        let found: Vec<_> = ledger
            .find_transactions(&TxFilter::all())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.txid)
            .collect();
        assert_eq!(found, vec![records[1].txid, records[0].txid]);
    }

    #[tokio::test]
    async fn unreachable_store_fails_with_connection_error() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        ledger.set_reachable(false);

        let err = ledger
            .create_transaction(TransactionDraft::new(None, seller("a")), &key)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Connection(_)));
        assert!(ledger.find_transactions(&TxFilter::all()).await.is_err());
    }

    #[tokio::test]
    async fn clear_resets_height_and_log() {
        let ledger = InMemoryLedger::new(MemoryLedgerConfig {
            network: Network::Testnet,
            starting_block_height: 10,
        });
        let key = SigningKey::generate();
        ledger.increment_block_height().unwrap();
        ledger
            .create_transaction(TransactionDraft::new(None, seller("a")), &key)
            .await
            .unwrap();

        ledger.clear_transactions().unwrap();
        assert!(ledger.is_empty().unwrap());
        assert_eq!(ledger.block_height().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn snapshot_roundtrip_preserves_queries() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        ledger
            .create_transaction(TransactionDraft::new(None, seller("a")), &key)
            .await
            .unwrap();
        ledger.increment_block_height().unwrap();

        let json = serde_json::to_string(&ledger.snapshot().unwrap()).unwrap();
        let restored = InMemoryLedger::from_snapshot(serde_json::from_str(&json).unwrap()).unwrap();

        assert_eq!(restored.block_height().await.unwrap(), 1);
        let messages = restored
            .messages_for_address(&key.address(Network::Testnet), &QueryOptions::new())
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);

        let next = restored
            .create_transaction(TransactionDraft::new(None, seller("b")), &key)
            .await
            .unwrap();
        assert_eq!(next.position, LedgerPosition::new(1, 1));
    }

    #[test]
    fn validate_address_is_network_scoped() {
        let ledger = InMemoryLedger::default();
        let key = SigningKey::generate();
        let test = key.address(Network::Testnet).to_string();
        let main = key.address(Network::Mainnet).to_string();

        assert!(ledger.validate_address(&test, None));
        assert!(!ledger.validate_address(&main, None));
        assert!(ledger.validate_address(&main, Some(Network::Mainnet)));
        assert!(matches!(
            ledger.parse_address(&main).unwrap_err(),
            LedgerError::InvalidAddress(_)
        ));
    }

    #[test]
    fn address_hash_inverts() {
        let ledger = InMemoryLedger::default();
        let addr = ledger.derive_address(&SigningKey::generate());
        let hash = ledger.address_hash(&addr).unwrap();
        assert_eq!(ledger.address_from_hash(hash, None), addr);
    }
}
