use bytes::{Buf, BufMut};
use dz_types::{Address, Network, TransferTarget, HASH160_LEN};
use tracing::trace;

use crate::error::{CodecError, CodecResult};
use crate::message::{BuyerFields, Message, MessageKind, Payload, SellerFields};
use crate::record::TransactionRecord;

/// Protocol marker at the start of every payload.
pub const MAGIC: &[u8; 2] = b"DZ";
pub const PROTOCOL_VERSION: u8 = 1;

const MAX_TEXT_LEN: usize = u16::MAX as usize;

const TAG_DESCRIPTION: u8 = b'd';
const TAG_ALIAS: u8 = b'a';
const TAG_COMMUNICATIONS: u8 = b'p';
const TAG_TRANSFER: u8 = b't';

/// Codec between message payloads and transaction records.
///
/// Layout: `"DZ" || version:u8 || type_tag:[u8; 6] || field*`, where each
/// field is `tag:u8` followed by either a `u16` BE length-prefixed UTF-8
/// string (description, alias) or a `u8` length-prefixed 160-bit address
/// hash (communications, transfer). A zero-length transfer field is the
/// account-closure sentinel.
pub struct DzCodec;

impl DzCodec {
    /// Serialize a payload, fields in canonical order.
    pub fn encode(payload: &Payload) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(64);
        buf.put_slice(MAGIC);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_slice(&payload.kind().type_tag());

        if let Some(text) = payload.description() {
            put_text(&mut buf, TAG_DESCRIPTION, text)?;
        }
        if let Some(text) = payload.alias() {
            put_text(&mut buf, TAG_ALIAS, text)?;
        }
        if let Some(addr) = payload.communications_addr() {
            put_address(&mut buf, TAG_COMMUNICATIONS, Some(addr));
        }
        if let Some(target) = payload.transfer_addr() {
            put_address(&mut buf, TAG_TRANSFER, target.address());
        }
        Ok(buf)
    }

    /// Parse a payload. Addresses are rendered on `network`.
    pub fn decode_payload(data: &[u8], network: Network) -> CodecResult<Payload> {
        let mut buf = data;
        if buf.remaining() < MAGIC.len() + 1 + 6 {
            return Err(CodecError::Truncated("header"));
        }
        let mut magic = [0u8; 2];
        buf.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(CodecError::BadMagic);
        }
        let version = buf.get_u8();
        if version != PROTOCOL_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let mut type_tag = [0u8; 6];
        buf.copy_to_slice(&mut type_tag);
        let kind =
            MessageKind::from_type_tag(&type_tag).ok_or(CodecError::UnknownMessageType(type_tag))?;

        let mut fields = RawFields::default();
        while buf.has_remaining() {
            let tag = buf.get_u8();
            match tag {
                TAG_DESCRIPTION => set_once(&mut fields.description, tag, get_text(&mut buf)?)?,
                TAG_ALIAS => set_once(&mut fields.alias, tag, get_text(&mut buf)?)?,
                TAG_COMMUNICATIONS if kind == MessageKind::Seller => {
                    let addr = get_address(&mut buf, network)?
                        .ok_or(CodecError::InvalidAddressLength(0))?;
                    set_once(&mut fields.communications_addr, tag, addr)?
                }
                TAG_TRANSFER => {
                    let target = match get_address(&mut buf, network)? {
                        Some(addr) => TransferTarget::Address(addr),
                        None => TransferTarget::Closed,
                    };
                    set_once(&mut fields.transfer_addr, tag, target)?
                }
                other => {
                    return Err(CodecError::UnknownField {
                        tag: other,
                        kind: kind.name(),
                    })
                }
            }
        }

        Ok(match kind {
            MessageKind::Seller => Payload::Seller(SellerFields {
                description: fields.description,
                alias: fields.alias,
                communications_addr: fields.communications_addr,
                transfer_addr: fields.transfer_addr,
            }),
            MessageKind::Buyer => Payload::Buyer(BuyerFields {
                description: fields.description,
                alias: fields.alias,
                transfer_addr: fields.transfer_addr,
            }),
        })
    }

    /// Decode a record's payload into a message.
    ///
    /// Returns `None` if the payload is not a recognised protocol message;
    /// such transactions are simply not part of this protocol's data.
    pub fn decode(record: &TransactionRecord) -> Option<Message> {
        match Self::decode_payload(&record.payload, record.sender_addr.network()) {
            Ok(payload) => Some(Message {
                txid: record.txid,
                position: record.position,
                sender_addr: record.sender_addr,
                receiver_addr: record.receiver_addr,
                payload,
            }),
            Err(e) => {
                trace!(txid = %record.txid.short_id(), error = %e, "skipping non-protocol payload");
                None
            }
        }
    }

    /// `true` if the message's declared sender actually signed `record`.
    pub fn verify(message: &Message, record: &TransactionRecord) -> bool {
        message.txid == record.txid
            && message.sender_addr == record.sender_addr
            && record.is_authentic()
    }

    /// Decode and verify in one step. A forged record is indistinguishable
    /// from a non-protocol payload.
    pub fn decode_verified(record: &TransactionRecord) -> Option<Message> {
        let message = Self::decode(record)?;
        if Self::verify(&message, record) {
            Some(message)
        } else {
            trace!(txid = %record.txid.short_id(), "skipping record with mismatched signer");
            None
        }
    }
}

#[derive(Default)]
struct RawFields {
    description: Option<String>,
    alias: Option<String>,
    communications_addr: Option<Address>,
    transfer_addr: Option<TransferTarget>,
}

fn set_once<T>(slot: &mut Option<T>, tag: u8, value: T) -> CodecResult<()> {
    if slot.is_some() {
        return Err(CodecError::DuplicateField(tag));
    }
    *slot = Some(value);
    Ok(())
}

fn put_text(buf: &mut Vec<u8>, tag: u8, text: &str) -> CodecResult<()> {
    if text.len() > MAX_TEXT_LEN {
        return Err(CodecError::FieldTooLong {
            len: text.len(),
            max: MAX_TEXT_LEN,
        });
    }
    buf.put_u8(tag);
    buf.put_u16(text.len() as u16);
    buf.put_slice(text.as_bytes());
    Ok(())
}

fn put_address(buf: &mut Vec<u8>, tag: u8, addr: Option<&Address>) {
    buf.put_u8(tag);
    match addr {
        Some(addr) => {
            buf.put_u8(HASH160_LEN as u8);
            buf.put_slice(addr.hash160());
        }
        None => buf.put_u8(0),
    }
}

fn get_text(buf: &mut &[u8]) -> CodecResult<String> {
    if buf.remaining() < 2 {
        return Err(CodecError::Truncated("text length"));
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(CodecError::Truncated("text body"));
    }
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    String::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8)
}

fn get_address(buf: &mut &[u8], network: Network) -> CodecResult<Option<Address>> {
    if !buf.has_remaining() {
        return Err(CodecError::Truncated("address length"));
    }
    let len = buf.get_u8();
    match len as usize {
        0 => Ok(None),
        HASH160_LEN => {
            if buf.remaining() < HASH160_LEN {
                return Err(CodecError::Truncated("address body"));
            }
            let mut hash = [0u8; HASH160_LEN];
            buf.copy_to_slice(&mut hash);
            Ok(Some(Address::from_hash(network, hash)))
        }
        _ => Err(CodecError::InvalidAddressLength(len)),
    }
}
