use crate::hmac::HmacError;
use crate::types::KeyError;
use smartlock_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The authentication tag does not verify under the supplied key
    #[error("Invalid authentication")]
    InvalidAuthentication,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Hmac(#[from] HmacError),
}

impl From<ProtocolError> for CryptoError {
    fn from(e: ProtocolError) -> Self {
        CryptoError::InvalidData(e.to_string())
    }
}
