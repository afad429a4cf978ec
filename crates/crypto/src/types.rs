//! Fixed-length byte containers
//!
//! Every container rejects input of the wrong length at construction and is
//! immutable afterwards. Key material is cleared from memory on drop and
//! never printed by `Debug`. Equality is evaluated in constant time.

use rand::{rngs::OsRng, RngCore};
use smartlock_protocol::binary::{read_array, write_bytes, BinaryRead, BinaryWrite};
use std::fmt;
use std::io::{self, Read, Write};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr, $redact:expr) => {
        $(#[$meta])*
        #[derive(Clone, Zeroize, ZeroizeOnDrop)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const LENGTH: usize = $len;

            /// Create from a slice of exactly [`Self::LENGTH`] bytes
            pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
                if bytes.len() != $len {
                    return Err(KeyError::InvalidLength {
                        expected: $len,
                        got: bytes.len(),
                    });
                }
                let mut value = [0u8; $len];
                value.copy_from_slice(bytes);
                Ok($name(value))
            }

            /// Fill from the operating system's random source
            pub fn generate() -> Self {
                let mut value = [0u8; $len];
                OsRng.fill_bytes(&mut value);
                $name(value)
            }

            pub fn as_slice(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0[..].ct_eq(&other.0[..]).into()
            }
        }

        impl Eq for $name {}

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if $redact {
                    write!(f, "{}(..)", stringify!($name))
                } else {
                    write!(f, "{}(", stringify!($name))?;
                    for byte in &self.0 {
                        write!(f, "{:02x}", byte)?;
                    }
                    write!(f, ")")
                }
            }
        }

        impl BinaryRead for $name {
            fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
                Ok($name(read_array(reader)?))
            }
        }

        impl BinaryWrite for $name {
            fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
                write_bytes(writer, &self.0)
            }

            fn serialized_size(&self) -> usize {
                $len
            }
        }
    };
}

fixed_bytes!(
    /// 256-bit shared secret used for both HMAC and AES
    KeyData,
    32,
    true
);

fixed_bytes!(
    /// Single-use 128-bit value carried in every authenticated message
    Nonce,
    16,
    false
);

fixed_bytes!(
    /// 128-bit CBC initialization vector, regenerated for every encryption
    InitializationVector,
    16,
    false
);

/// Key-related errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid key length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_lengths() {
        assert!(KeyData::from_slice(&[0u8; 32]).is_ok());
        assert_eq!(
            KeyData::from_slice(&[0u8; 31]).unwrap_err(),
            KeyError::InvalidLength {
                expected: 32,
                got: 31
            }
        );
        assert!(KeyData::from_slice(&[0u8; 33]).is_err());
        assert!(Nonce::from_slice(&[0u8; 16]).is_ok());
        assert!(Nonce::from_slice(&[]).is_err());
        assert!(InitializationVector::from_slice(&[0u8; 15]).is_err());
    }

    #[test]
    fn test_generate_distinct() {
        assert_ne!(KeyData::generate(), KeyData::generate());
        assert_ne!(Nonce::generate(), Nonce::generate());
        assert_ne!(
            InitializationVector::generate(),
            InitializationVector::generate()
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = KeyData::from([0xAB; 32]);
        let debug = format!("{:?}", key);
        assert!(!debug.contains("ab"));
        assert_eq!(debug, "KeyData(..)");

        let nonce = Nonce::from([0x01; 16]);
        assert!(format!("{:?}", nonce).contains("0101"));
    }

    #[test]
    fn test_binary_roundtrip() {
        let key = KeyData::generate();
        let bytes = key.to_bytes().unwrap();
        assert_eq!(bytes.len(), KeyData::LENGTH);
        assert_eq!(KeyData::from_bytes(&bytes).unwrap(), key);
        assert!(KeyData::from_bytes(&bytes[..20]).is_err());
    }
}
