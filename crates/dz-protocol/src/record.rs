use dz_crypto::{ContentHasher, Signature, SigningKey, VerifyingKey};
use dz_types::{Address, LedgerPosition, TxId};
use serde::{Deserialize, Serialize};

use crate::codec::DzCodec;
use crate::error::CodecResult;
use crate::message::Payload;

/// Fields a publisher supplies when creating a transaction.
///
/// A missing `receiver_addr` means the transaction is addressed to its own
/// sender, which is how profile declarations and updates are published.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionDraft {
    pub receiver_addr: Option<Address>,
    pub payload: Vec<u8>,
    /// Addresses named inside `payload`. A ledger refuses the draft unless
    /// they all belong to its network.
    pub payload_addrs: Vec<Address>,
}

impl TransactionDraft {
    pub fn new(receiver_addr: Option<Address>, payload: Vec<u8>) -> Self {
        Self {
            receiver_addr,
            payload,
            payload_addrs: Vec::new(),
        }
    }

    /// Draft carrying `payload` in the Dropzone wire format.
    pub fn message(receiver_addr: Option<Address>, payload: &Payload) -> CodecResult<Self> {
        Ok(Self {
            payload_addrs: payload.addresses().copied().collect(),
            ..Self::new(receiver_addr, DzCodec::encode(payload)?)
        })
    }

    /// Sign the draft for `receiver` (the resolved receiver address).
    pub fn sign(&self, receiver: &Address, key: &SigningKey) -> Signature {
        key.sign(&signing_digest(receiver, &self.payload))
    }
}

/// An immutable ledger transaction carrying an application payload.
///
/// `sender_addr` is the address of `signer`; the ledger stamps it from the
/// signing key on creation. Records read back from an untrusted source may
/// claim any sender, so consumers check them with
/// [`crate::DzCodec::verify`] before use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub txid: TxId,
    pub position: LedgerPosition,
    pub sender_addr: Address,
    pub receiver_addr: Address,
    pub signer: VerifyingKey,
    pub signature: Signature,
    #[serde(with = "payload_hex")]
    pub payload: Vec<u8>,
}

impl TransactionRecord {
    pub fn block_height(&self) -> u64 {
        self.position.block_height
    }

    /// `true` if `addr` is the sender or the receiver.
    pub fn involves(&self, addr: &Address) -> bool {
        self.sender_addr == *addr || self.receiver_addr == *addr
    }

    /// Signature and key-to-address consistency of this record.
    pub fn is_authentic(&self) -> bool {
        self.signer.to_address(self.sender_addr.network()) == self.sender_addr
            && self
                .signer
                .verify(
                    &signing_digest(&self.receiver_addr, &self.payload),
                    &self.signature,
                )
                .is_ok()
    }

    /// Identifier for a record at `position` with the given contents.
    pub fn compute_txid(
        position: LedgerPosition,
        sender: &Address,
        receiver: &Address,
        payload: &[u8],
    ) -> TxId {
        ContentHasher::TRANSACTION.tx_id(&[
            &position.block_height.to_be_bytes(),
            &position.index.to_be_bytes(),
            sender.to_string().as_bytes(),
            receiver.to_string().as_bytes(),
            payload,
        ])
    }
}

/// Digest a transaction signer authorises: the receiver and the payload.
pub fn signing_digest(receiver: &Address, payload: &[u8]) -> [u8; 32] {
    ContentHasher::SIGNING.hash_parts(&[receiver.to_string().as_bytes(), payload])
}

mod payload_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(payload))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dz_types::Network;

    fn record(key: &SigningKey, receiver: Address, payload: &[u8]) -> TransactionRecord {
        let sender = key.address(Network::Testnet);
        let position = LedgerPosition::new(1, 0);
        let draft = TransactionDraft::new(Some(receiver), payload.to_vec());
        TransactionRecord {
            txid: TransactionRecord::compute_txid(position, &sender, &receiver, payload),
            position,
            sender_addr: sender,
            receiver_addr: receiver,
            signer: key.verifying_key(),
            signature: draft.sign(&receiver, key),
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn signed_record_is_authentic() {
        let key = SigningKey::generate();
        let receiver = key.address(Network::Testnet);
        assert!(record(&key, receiver, b"data").is_authentic());
    }

    #[test]
    fn forged_sender_is_not_authentic() {
        let key = SigningKey::generate();
        let other = SigningKey::generate().address(Network::Testnet);
        let mut rec = record(&key, other, b"data");
        rec.sender_addr = other;
        assert!(!rec.is_authentic());
    }

    #[test]
    fn tampered_payload_is_not_authentic() {
        let key = SigningKey::generate();
        let receiver = key.address(Network::Testnet);
        let mut rec = record(&key, receiver, b"data");
        rec.payload = b"DATA".to_vec();
        assert!(!rec.is_authentic());
    }

    #[test]
    fn json_roundtrip_keeps_authenticity() {
        let key = SigningKey::generate();
        let receiver = key.address(Network::Testnet);
        let rec = record(&key, receiver, &[0, 1, 2, 255]);
        let json = serde_json::to_string(&rec).unwrap();
        let parsed: TransactionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rec);
        assert!(parsed.is_authentic());
    }

    #[test]
    fn message_draft_lists_payload_addresses() {
        use crate::message::SellerFields;
        use dz_types::TransferTarget;

        let comms = SigningKey::generate().address(Network::Mainnet);
        let next = SigningKey::generate().address(Network::Testnet);
        let payload = Payload::Seller(SellerFields {
            communications_addr: Some(comms),
            transfer_addr: Some(TransferTarget::Address(next)),
            ..Default::default()
        });
        let draft = TransactionDraft::message(None, &payload).unwrap();
        assert_eq!(draft.payload_addrs, vec![comms, next]);

        let closing = Payload::Seller(SellerFields {
            transfer_addr: Some(TransferTarget::Closed),
            ..Default::default()
        });
        assert!(TransactionDraft::message(None, &closing).unwrap().payload_addrs.is_empty());
    }

    #[test]
    fn involves_sender_and_receiver() {
        let key = SigningKey::generate();
        let receiver = SigningKey::generate().address(Network::Testnet);
        let rec = record(&key, receiver, b"x");
        assert!(rec.involves(&receiver));
        assert!(rec.involves(&key.address(Network::Testnet)));
        assert!(!rec.involves(&SigningKey::generate().address(Network::Testnet)));
    }
}
