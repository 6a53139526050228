//! Message protocol for Dropzone.
//!
//! Application records ("messages") ride inside ledger transactions as a
//! tagged byte payload. This crate defines the immutable
//! [`TransactionRecord`], the typed [`Message`] view decoded from it, and the
//! [`DzCodec`] that converts between the two and checks that the declared
//! sender actually signed the carrying transaction.

pub mod codec;
pub mod error;
pub mod message;
pub mod record;

pub use codec::{DzCodec, MAGIC, PROTOCOL_VERSION};
pub use error::{CodecError, CodecResult};
pub use message::{BuyerFields, Message, MessageKind, Payload, SellerFields};
pub use record::{signing_digest, TransactionDraft, TransactionRecord};
