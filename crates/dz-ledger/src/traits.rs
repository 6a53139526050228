use async_trait::async_trait;
use dz_crypto::SigningKey;
use dz_protocol::{DzCodec, Message, TransactionDraft, TransactionRecord};
use dz_types::{Address, Network, TxId, HASH160_LEN};

use crate::error::LedgerError;
use crate::query::{QueryOptions, TxFilter};

/// Boundary between Dropzone and a transaction ledger.
///
/// Implementations may block on the network; callers treat every async
/// method as slow and retryable, and may drop the returned future to abandon
/// a long scan. Writes are append-only and serialised by the implementation.
///
/// Query results are ordered by descending [`dz_types::LedgerPosition`]:
/// most recent block first, and within a block most recently created first.
#[async_trait]
pub trait LedgerConnection: Send + Sync {
    /// Network every address on this connection is scoped to.
    fn network(&self) -> Network;

    /// Height stamped on transactions created now.
    async fn block_height(&self) -> Result<u64, LedgerError>;

    /// Append a transaction signed by `key`. The sender address is derived
    /// from the key; a missing receiver defaults to the sender.
    async fn create_transaction(
        &self,
        draft: TransactionDraft,
        key: &SigningKey,
    ) -> Result<TransactionRecord, LedgerError>;

    async fn get_transaction(&self, id: &TxId) -> Result<Option<TransactionRecord>, LedgerError>;

    /// All records matching `filter`, newest first.
    async fn find_transactions(
        &self,
        filter: &TxFilter,
    ) -> Result<Vec<TransactionRecord>, LedgerError>;

    fn derive_address(&self, key: &SigningKey) -> Address {
        key.address(self.network())
    }

    /// `true` if `addr` is a well-formed address on `network` (defaulting to
    /// this connection's network).
    fn validate_address(&self, addr: &str, network: Option<Network>) -> bool {
        Address::is_valid(addr, Some(network.unwrap_or_else(|| self.network())))
    }

    fn parse_address(&self, addr: &str) -> Result<Address, LedgerError> {
        Ok(Address::parse(addr, Some(self.network()))?)
    }

    /// Reject addresses scoped to another network.
    fn check_address(&self, addr: &Address) -> Result<(), LedgerError> {
        if addr.network() == self.network() {
            Ok(())
        } else {
            Err(LedgerError::InvalidAddress(format!(
                "{addr} is a {} address, connection is on {}",
                addr.network(),
                self.network()
            )))
        }
    }

    /// 160-bit hash form of `addr`, as carried in payloads.
    fn address_hash(&self, addr: &Address) -> Result<[u8; HASH160_LEN], LedgerError> {
        self.check_address(addr)?;
        Ok(*addr.hash160())
    }

    /// Inverse of [`LedgerConnection::address_hash`].
    fn address_from_hash(&self, hash: [u8; HASH160_LEN], network: Option<Network>) -> Address {
        Address::from_hash(network.unwrap_or_else(|| self.network()), hash)
    }

    /// Verified messages sent or received by `addr`, newest first.
    async fn messages_for_address(
        &self,
        addr: &Address,
        options: &QueryOptions,
    ) -> Result<Vec<Message>, LedgerError> {
        self.check_address(addr)?;
        for other in options.addresses() {
            self.check_address(other)?;
        }
        let records = self
            .find_transactions(&TxFilter::for_address(*addr, options.clone()))
            .await?;
        Ok(decode_messages(&records, options))
    }

    /// Verified messages confirmed in block `height`, newest first.
    async fn messages_in_block(
        &self,
        height: u64,
        options: &QueryOptions,
    ) -> Result<Vec<Message>, LedgerError> {
        for other in options.addresses() {
            self.check_address(other)?;
        }
        let records = self
            .find_transactions(&TxFilter::in_block(height, options.clone()))
            .await?;
        Ok(decode_messages(&records, options))
    }
}

/// Decode, verify, and type-filter records, keeping their order.
pub fn decode_messages(records: &[TransactionRecord], options: &QueryOptions) -> Vec<Message> {
    records
        .iter()
        .filter_map(DzCodec::decode_verified)
        .filter(|m| options.message_type.map_or(true, |kind| m.kind() == kind))
        .collect()
}
