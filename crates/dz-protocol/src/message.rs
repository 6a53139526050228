use std::fmt;

use dz_types::{Address, LedgerPosition, TransferTarget, TxId};
use serde::{Deserialize, Serialize};

/// Kind of application record carried in a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Seller,
    Buyer,
}

impl MessageKind {
    /// Six-byte ASCII tag identifying the kind on the wire.
    pub const fn type_tag(self) -> [u8; 6] {
        match self {
            Self::Seller => *b"SLUPDT",
            Self::Buyer => *b"BYUPDT",
        }
    }

    pub fn from_type_tag(tag: &[u8; 6]) -> Option<Self> {
        match tag {
            b"SLUPDT" => Some(Self::Seller),
            b"BYUPDT" => Some(Self::Buyer),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Seller => "seller",
            Self::Buyer => "buyer",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attributes a seller update may set. Unset fields leave the profile's
/// prior value untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communications_addr: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_addr: Option<TransferTarget>,
}

/// Attributes a buyer update may set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_addr: Option<TransferTarget>,
}

/// Kind-specific body of a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Payload {
    Seller(SellerFields),
    Buyer(BuyerFields),
}

impl Payload {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Seller(_) => MessageKind::Seller,
            Self::Buyer(_) => MessageKind::Buyer,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Seller(f) => f.description.as_deref(),
            Self::Buyer(f) => f.description.as_deref(),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Seller(f) => f.alias.as_deref(),
            Self::Buyer(f) => f.alias.as_deref(),
        }
    }

    pub fn communications_addr(&self) -> Option<&Address> {
        match self {
            Self::Seller(f) => f.communications_addr.as_ref(),
            Self::Buyer(_) => None,
        }
    }

    pub fn transfer_addr(&self) -> Option<&TransferTarget> {
        match self {
            Self::Seller(f) => f.transfer_addr.as_ref(),
            Self::Buyer(f) => f.transfer_addr.as_ref(),
        }
    }

    /// Every address the payload names. The wire form keeps only their
    /// hashes, so the network is lost once encoded.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.communications_addr()
            .into_iter()
            .chain(self.transfer_addr().and_then(TransferTarget::address))
    }
}

impl From<SellerFields> for Payload {
    fn from(fields: SellerFields) -> Self {
        Self::Seller(fields)
    }
}

impl From<BuyerFields> for Payload {
    fn from(fields: BuyerFields) -> Self {
        Self::Buyer(fields)
    }
}

/// A decoded, typed view of a transaction's payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub txid: TxId,
    pub position: LedgerPosition,
    pub sender_addr: Address,
    pub receiver_addr: Address,
    pub payload: Payload,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    pub fn block_height(&self) -> u64 {
        self.position.block_height
    }

    pub fn transfer_addr(&self) -> Option<&TransferTarget> {
        self.payload.transfer_addr()
    }

    /// Sent by `addr` to itself.
    pub fn is_self_addressed(&self) -> bool {
        self.sender_addr == self.receiver_addr
    }

    /// `true` if this message ends its sender's authority: a cancellation,
    /// or a transfer to some other address.
    pub fn is_terminal(&self) -> bool {
        match self.transfer_addr() {
            Some(TransferTarget::Closed) => true,
            Some(TransferTarget::Address(to)) => *to != self.sender_addr,
            None => false,
        }
    }

    /// `true` if this message hands the sender's profile to `addr`.
    pub fn transfers_to(&self, addr: &Address) -> bool {
        self.sender_addr != *addr
            && self.receiver_addr == *addr
            && self.transfer_addr() == Some(&TransferTarget::Address(*addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dz_types::Network;

    fn addr(seed: u8) -> Address {
        Address::from_hash(Network::Testnet, [seed; 20])
    }

    fn message(sender: Address, receiver: Address, transfer: Option<TransferTarget>) -> Message {
        Message {
            txid: TxId::from_bytes([0; 32]),
            position: LedgerPosition::default(),
            sender_addr: sender,
            receiver_addr: receiver,
            payload: Payload::Seller(SellerFields {
                transfer_addr: transfer,
                ..Default::default()
            }),
        }
    }

    #[test]
    fn type_tags_roundtrip() {
        for kind in [MessageKind::Seller, MessageKind::Buyer] {
            assert_eq!(MessageKind::from_type_tag(&kind.type_tag()), Some(kind));
        }
        assert_eq!(MessageKind::from_type_tag(b"ITCRTE"), None);
    }

    #[test]
    fn buyer_has_no_communications_addr() {
        let payload = Payload::Buyer(BuyerFields {
            alias: Some("b".into()),
            ..Default::default()
        });
        assert_eq!(payload.kind(), MessageKind::Buyer);
        assert_eq!(payload.alias(), Some("b"));
        assert!(payload.communications_addr().is_none());
    }

    #[test]
    fn cancellation_is_terminal() {
        let m = message(addr(1), addr(1), Some(TransferTarget::Closed));
        assert!(m.is_terminal());
        assert!(!m.transfers_to(&addr(1)));
    }

    #[test]
    fn transfer_out_is_terminal_and_targets_receiver() {
        let m = message(addr(1), addr(2), Some(TransferTarget::Address(addr(2))));
        assert!(m.is_terminal());
        assert!(m.transfers_to(&addr(2)));
        assert!(!m.transfers_to(&addr(3)));
    }

    #[test]
    fn self_transfer_is_not_terminal() {
        let m = message(addr(1), addr(1), Some(TransferTarget::Address(addr(1))));
        assert!(!m.is_terminal());
        assert!(!m.transfers_to(&addr(1)));
    }

    #[test]
    fn transfer_needs_matching_receiver() {
        let m = message(addr(1), addr(3), Some(TransferTarget::Address(addr(2))));
        assert!(m.is_terminal());
        assert!(!m.transfers_to(&addr(2)));
    }
}
