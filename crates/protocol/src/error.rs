use std::io;
use thiserror::Error;

/// Errors raised while encoding or decoding lock payloads
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Malformed, short or oversized buffer
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A TLV value does not fit the 16-bit length field
    #[error("value for tag {tag:#04x} is too long: {length} bytes")]
    ValueTooLong { tag: u8, length: usize },

    /// The transport cannot carry a chunk header plus payload
    #[error("chunk size {0} leaves no room for payload")]
    InvalidChunkSize(usize),

    /// A message is larger than a chunk header can describe
    #[error("message of {0} bytes is too large to chunk")]
    MessageTooLarge(usize),

    /// A chunk disagrees with the length announced by the transfer's first chunk
    #[error("chunk length mismatch: expected total {expected}, got {got}")]
    ChunkMismatch { expected: u32, got: u32 },

    /// A continuation chunk arrived with no transfer in progress
    #[error("unexpected continuation chunk")]
    UnexpectedChunk,

    /// Received payload bytes exceed the announced total
    #[error("chunk overflow: {received} bytes received for a {total} byte message")]
    ChunkOverflow { total: u32, received: usize },
}

impl From<io::Error> for ProtocolError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            return ProtocolError::InvalidData("unexpected end of data".to_string());
        }
        let message = e.to_string();
        match e.into_inner().map(|inner| inner.downcast::<ProtocolError>()) {
            Some(Ok(inner)) => *inner,
            _ => ProtocolError::InvalidData(message),
        }
    }
}

impl From<ProtocolError> for io::Error {
    fn from(e: ProtocolError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, e)
    }
}
