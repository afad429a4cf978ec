//! Authentication envelope
//!
//! ```text
//! AuthenticationMessage: date (f64 LE) ‖ nonce (16)            = 24 bytes
//! Authentication:        message (24) ‖ HMAC-SHA512(message) (64) = 88 bytes
//! ```

use crate::error::CryptoError;
use crate::hmac::{calculate_hmac, verify_hmac, HMAC_LENGTH};
use crate::types::{KeyData, Nonce};
use chrono::{DateTime, Utc};
use smartlock_protocol::binary::{
    read_array, read_date, write_bytes, write_date, BinaryRead, BinaryWrite,
};
use smartlock_protocol::wire_date;
use std::io::{self, Read, Write};

/// Timestamp and nonce signed by the sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationMessage {
    date: DateTime<Utc>,
    nonce: Nonce,
}

impl AuthenticationMessage {
    pub const LENGTH: usize = 8 + Nonce::LENGTH;

    /// A message for the current instant with a fresh nonce
    pub fn new() -> Self {
        Self::with_date(Utc::now())
    }

    /// A message for `date` with a fresh nonce
    ///
    /// The date is truncated to the precision carried on the wire so the
    /// decoded message re-encodes to the signed bytes.
    pub fn with_date(date: DateTime<Utc>) -> Self {
        AuthenticationMessage {
            date: wire_date(date),
            nonce: Nonce::generate(),
        }
    }

    pub fn from_parts(date: DateTime<Utc>, nonce: Nonce) -> Self {
        AuthenticationMessage {
            date: wire_date(date),
            nonce,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }
}

impl Default for AuthenticationMessage {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryRead for AuthenticationMessage {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let date = read_date(reader)?;
        let nonce = Nonce::read_from(reader)?;
        Ok(AuthenticationMessage { date, nonce })
    }
}

impl BinaryWrite for AuthenticationMessage {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_date(writer, &self.date)?;
        self.nonce.write_to(writer)
    }

    fn serialized_size(&self) -> usize {
        Self::LENGTH
    }
}

/// Signed authentication message
#[derive(Clone, PartialEq, Eq)]
pub struct Authentication {
    message: AuthenticationMessage,
    signed_data: [u8; HMAC_LENGTH],
}

impl Authentication {
    pub const LENGTH: usize = AuthenticationMessage::LENGTH + HMAC_LENGTH;

    /// Sign a fresh message with `key`
    pub fn new(key: &KeyData) -> Result<Self, CryptoError> {
        Self::with_message(key, AuthenticationMessage::new())
    }

    pub fn with_message(
        key: &KeyData,
        message: AuthenticationMessage,
    ) -> Result<Self, CryptoError> {
        let signed_data = calculate_hmac(key, &message.to_bytes()?)?;
        Ok(Authentication {
            message,
            signed_data,
        })
    }

    pub fn message(&self) -> &AuthenticationMessage {
        &self.message
    }

    pub fn signed_data(&self) -> &[u8; HMAC_LENGTH] {
        &self.signed_data
    }

    /// Whether the tag was produced by `key` over this message
    pub fn is_authenticated(&self, key: &KeyData) -> bool {
        match self.message.to_bytes() {
            Ok(encoded) => verify_hmac(key, &encoded, &self.signed_data),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for Authentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authentication")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl BinaryRead for Authentication {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let message = AuthenticationMessage::read_from(reader)?;
        let signed_data = read_array(reader)?;
        Ok(Authentication {
            message,
            signed_data,
        })
    }
}

impl BinaryWrite for Authentication {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.message.write_to(writer)?;
        write_bytes(writer, &self.signed_data)
    }

    fn serialized_size(&self) -> usize {
        Self::LENGTH
    }
}
