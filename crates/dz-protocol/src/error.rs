use thiserror::Error;

/// Reasons a payload fails to encode or parse.
///
/// Decoding never surfaces these to callers of [`crate::DzCodec::decode`];
/// an unparseable payload is simply not a protocol message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("missing protocol marker")]
    BadMagic,

    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown message type: {0:?}")]
    UnknownMessageType([u8; 6]),

    #[error("unknown field tag {tag:#04x} for {kind}")]
    UnknownField { tag: u8, kind: &'static str },

    #[error("duplicate field tag {0:#04x}")]
    DuplicateField(u8),

    #[error("truncated payload: {0}")]
    Truncated(&'static str),

    #[error("invalid utf-8 in text field")]
    InvalidUtf8,

    #[error("invalid address length: {0}")]
    InvalidAddressLength(u8),

    #[error("text field too long: {len} bytes (max {max})")]
    FieldTooLong { len: usize, max: usize },
}

pub type CodecResult<T> = Result<T, CodecError>;
