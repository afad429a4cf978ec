//! Smart Lock Cryptographic Operations
//!
//! This crate provides the cryptographic envelopes of the lock protocol:
//! - Zeroizing fixed-length key, nonce and IV types
//! - HMAC-SHA512 with constant-time verification
//! - AES-256-CBC with PKCS#7 padding
//! - `Authentication` (timestamp + nonce + tag) and `EncryptedData`
//!
//! # Security Features
//!
//! - **Zeroization**: key material uses `zeroize` to clear memory on drop
//! - **Constant-time comparison**: tag verification uses `subtle::ConstantTimeEq`
//! - **Fresh randomness**: every message gets a new nonce and every encryption a new IV
//!
//! # Example
//!
//! ```
//! use smartlock_crypto::{EncryptedData, KeyData};
//!
//! # fn example() -> Result<(), smartlock_crypto::CryptoError> {
//! let key = KeyData::generate();
//! let encrypted = EncryptedData::encrypt(b"unlock", &key)?;
//! assert_eq!(encrypted.decrypt(&key)?, b"unlock");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod authentication;
pub mod cipher;
pub mod encrypted;
pub mod error;
pub mod hmac;
pub mod types;

// Re-export commonly used types
pub use authentication::{Authentication, AuthenticationMessage};
pub use encrypted::EncryptedData;
pub use error::CryptoError;
pub use hmac::{calculate_hmac, verify_hmac, HmacError, HMAC_LENGTH};
pub use types::{InitializationVector, KeyData, KeyError, Nonce};
