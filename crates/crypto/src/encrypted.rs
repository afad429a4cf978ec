//! Encrypted envelope
//!
//! ```text
//! authentication (88) ‖ initialization vector (16) ‖ ciphertext (n × 16, n ≥ 1)
//! ```
//!
//! The authentication tag covers only the timestamp and nonce; the ciphertext
//! itself is not MACed.

use crate::authentication::{Authentication, AuthenticationMessage};
use crate::cipher::{self, BLOCK_LENGTH};
use crate::error::CryptoError;
use crate::types::{InitializationVector, KeyData};
use smartlock_protocol::binary::{invalid_data, write_bytes, BinaryRead, BinaryWrite};
use std::io::{self, Read, Write};
use tracing::debug;

/// Authenticated AES-256-CBC payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    pub authentication: Authentication,
    pub initialization_vector: InitializationVector,
    pub encrypted_data: Vec<u8>,
}

impl EncryptedData {
    /// Smallest valid encoding: one ciphertext block
    pub const MIN_LENGTH: usize =
        Authentication::LENGTH + InitializationVector::LENGTH + BLOCK_LENGTH;

    /// Sign a fresh authentication with `key` and encrypt `plaintext` under it
    pub fn encrypt(plaintext: &[u8], key: &KeyData) -> Result<Self, CryptoError> {
        Self::encrypt_with_message(plaintext, key, AuthenticationMessage::new())
    }

    /// Like [`EncryptedData::encrypt`], signing a caller-supplied message
    pub fn encrypt_with_message(
        plaintext: &[u8],
        key: &KeyData,
        message: AuthenticationMessage,
    ) -> Result<Self, CryptoError> {
        let authentication = Authentication::with_message(key, message)?;
        let (encrypted_data, initialization_vector) = cipher::encrypt(key, plaintext)?;
        Ok(EncryptedData {
            authentication,
            initialization_vector,
            encrypted_data,
        })
    }

    /// Verify the authentication with `key`, then decrypt
    ///
    /// No plaintext is returned unless the tag verifies.
    pub fn decrypt(&self, key: &KeyData) -> Result<Vec<u8>, CryptoError> {
        if !self.authentication.is_authenticated(key) {
            debug!("encrypted payload failed authentication");
            return Err(CryptoError::InvalidAuthentication);
        }
        cipher::decrypt(key, &self.initialization_vector, &self.encrypted_data)
    }

    /// Decrypt and decode the plaintext as `T`
    pub fn decrypt_value<T: BinaryRead>(&self, key: &KeyData) -> Result<T, CryptoError> {
        let plaintext = self.decrypt(key)?;
        Ok(T::from_bytes(&plaintext)?)
    }

    /// Encode `value` and encrypt it
    pub fn encrypt_value<T: BinaryWrite>(value: &T, key: &KeyData) -> Result<Self, CryptoError> {
        Self::encrypt(&value.to_bytes()?, key)
    }

    pub fn encrypt_value_with_message<T: BinaryWrite>(
        value: &T,
        key: &KeyData,
        message: AuthenticationMessage,
    ) -> Result<Self, CryptoError> {
        Self::encrypt_with_message(&value.to_bytes()?, key, message)
    }
}

impl BinaryRead for EncryptedData {
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let authentication = Authentication::read_from(reader)?;
        let initialization_vector = InitializationVector::read_from(reader)?;
        let mut encrypted_data = Vec::new();
        reader.read_to_end(&mut encrypted_data)?;
        if encrypted_data.is_empty() || encrypted_data.len() % BLOCK_LENGTH != 0 {
            return Err(invalid_data(format!(
                "ciphertext length {} is not a positive multiple of {}",
                encrypted_data.len(),
                BLOCK_LENGTH
            )));
        }
        Ok(EncryptedData {
            authentication,
            initialization_vector,
            encrypted_data,
        })
    }
}

impl BinaryWrite for EncryptedData {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.authentication.write_to(writer)?;
        self.initialization_vector.write_to(writer)?;
        write_bytes(writer, &self.encrypted_data)
    }

    fn serialized_size(&self) -> usize {
        Authentication::LENGTH + InitializationVector::LENGTH + self.encrypted_data.len()
    }
}
