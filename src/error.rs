//! Unified error type for the smart lock public API
//!
//! The protocol and crypto crates keep their domain-specific errors. This
//! type folds them into the result codes a lock reports back to a client.
//!
//! # Example
//!
//! ```no_run
//! use smartlock::LockError;
//!
//! fn handle_write() -> Result<(), LockError> {
//!     // All lock operations return LockError
//!     // Codec and crypto errors are converted automatically
//!     Ok(())
//! }
//! ```

use crate::store::StoreError;
use smartlock_crypto::{CryptoError, HmacError, KeyError};
use smartlock_protocol::ProtocolError;
use thiserror::Error;
use uuid::Uuid;

/// Unified error type for all lock operations
///
/// # Error Categories
///
/// - **Malformed**: the request could not be decoded; drop it
/// - **Authentication**: the tag did not verify, or the message is stale or replayed
/// - **Authorization**: the key exists but may not perform the operation
/// - **State**: the lock is not in a state where the request makes sense
#[derive(Debug, Error)]
pub enum LockError {
    /// Malformed, short or oversized buffer
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// HMAC mismatch, stale timestamp or replayed nonce
    #[error("Invalid authentication")]
    InvalidAuthentication,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// A state precondition does not hold
    #[error("Could not complete request: {0}")]
    CouldNotComplete(String),

    /// The authenticated key may not perform this operation
    #[error("Key {key} is not authorized to {action}")]
    NotAuthorized { key: Uuid, action: &'static str },

    #[error("Unknown key {0}")]
    UnknownKey(Uuid),

    /// The invitation or schedule is past its expiration
    #[error("Key {0} has expired")]
    Expired(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invitation error: {0}")]
    Invitation(#[from] serde_json::Error),
}

impl LockError {
    /// Returns true if the error is potentially retryable
    ///
    /// Protocol failures are terminal for the request that caused them; a
    /// client must compose a new request with a fresh nonce instead.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Poisoned))
    }

    /// Returns a suggestion for resolving this error
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::InvalidAuthentication => {
                Some("Check that the key secret matches and the device clock is correct")
            }
            Self::NotAuthorized { .. } => {
                Some("Ask an owner or administrator for a key with the required permission")
            }
            Self::UnknownKey(_) => Some("The key may have been removed; request a new invitation"),
            Self::Expired(_) => Some("Request a new invitation from the lock administrator"),
            Self::CouldNotComplete(_) => Some("Read the lock information to check its status"),
            _ => None,
        }
    }

    /// Returns an error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidData(_) | Self::Invitation(_) => "INVALID_DATA",
            Self::InvalidAuthentication => "INVALID_AUTHENTICATION",
            Self::Encryption(_) => "ENCRYPTION_ERROR",
            Self::Decryption(_) => "DECRYPTION_ERROR",
            Self::CouldNotComplete(_) => "COULD_NOT_COMPLETE",
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::UnknownKey(_) => "UNKNOWN_KEY",
            Self::Expired(_) => "EXPIRED",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns true if the request was well formed but not allowed
    pub fn is_authorization_error(&self) -> bool {
        matches!(
            self,
            Self::NotAuthorized { .. } | Self::UnknownKey(_) | Self::Expired(_)
        )
    }

    /// Returns true if the request could not be decoded
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::InvalidData(_) | Self::Invitation(_))
    }
}

impl From<ProtocolError> for LockError {
    fn from(e: ProtocolError) -> Self {
        LockError::InvalidData(e.to_string())
    }
}

impl From<CryptoError> for LockError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidAuthentication => LockError::InvalidAuthentication,
            CryptoError::Encryption(message) => LockError::Encryption(message),
            CryptoError::Decryption(message) => LockError::Decryption(message),
            CryptoError::InvalidData(message) => LockError::InvalidData(message),
            CryptoError::Key(e) => e.into(),
            CryptoError::Hmac(e) => e.into(),
        }
    }
}

impl From<KeyError> for LockError {
    fn from(e: KeyError) -> Self {
        LockError::InvalidData(e.to_string())
    }
}

impl From<HmacError> for LockError {
    fn from(e: HmacError) -> Self {
        LockError::Encryption(e.to_string())
    }
}
