use dz_protocol::{MessageKind, Payload};
use dz_types::{Address, TransferTarget, TxId};
use serde::{Deserialize, Serialize};

/// Soundness failures reported by [`crate::ProfileEngine::validated_profile`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum ProfileViolation {
    /// No genesis message and no transfer-in was ever attempted.
    #[error("profile not found")]
    NotFound,

    /// Transfers into the address exist, but none came from a source whose
    /// authority was still open (it had already transferred out, closed, or
    /// was never established).
    #[error("invalid transfer or closed: {txid} from {from}")]
    InvalidPriorProfile { from: Address, txid: TxId },
}

/// Current state of a seller or buyer identity at one address.
///
/// `established_by` is the genesis or transfer-in message that gave the
/// address ownership; when it is `None` the profile was not found and every
/// attribute is empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub addr: Address,
    pub kind: MessageKind,
    pub description: Option<String>,
    pub alias: Option<String>,
    pub communications_addr: Option<Address>,
    /// Set only by the message that closed this address's authority.
    pub transfer_addr: Option<TransferTarget>,
    pub is_active: bool,
    pub is_closed: bool,
    pub established_by: Option<TxId>,
    /// `None` unless a soundness check was requested.
    pub validation: Option<Result<(), ProfileViolation>>,
}

impl Profile {
    pub(crate) fn not_found(addr: Address, kind: MessageKind) -> Self {
        Self {
            addr,
            kind,
            description: None,
            alias: None,
            communications_addr: None,
            transfer_addr: None,
            is_active: false,
            is_closed: false,
            established_by: None,
            validation: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.established_by.is_some()
    }

    /// `true` if validation ran and found no violation.
    pub fn is_valid(&self) -> bool {
        matches!(self.validation, Some(Ok(())))
    }

    /// Owner transferred the profile to another address.
    pub fn transferred_to(&self) -> Option<&Address> {
        self.transfer_addr.as_ref().and_then(TransferTarget::address)
    }
}

/// Attribute set accumulated while replaying an authority window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Attributes {
    pub description: Option<String>,
    pub alias: Option<String>,
    pub communications_addr: Option<Address>,
}

impl Attributes {
    /// Overwrite each field `payload` sets; leave the rest alone.
    pub fn apply(&mut self, payload: &Payload) {
        if let Some(description) = payload.description() {
            self.description = Some(description.to_owned());
        }
        if let Some(alias) = payload.alias() {
            self.alias = Some(alias.to_owned());
        }
        if let Some(addr) = payload.communications_addr() {
            self.communications_addr = Some(*addr);
        }
    }
}
