//! HMAC operations with constant-time verification
//!
//! Authentication tags are HMAC-SHA512 over the encoded authentication
//! message. Verification compares tags in constant time.

use crate::types::KeyData;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha512 = Hmac<Sha512>;

/// Length of an HMAC-SHA512 tag
pub const HMAC_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HmacError {
    #[error("HMAC initialization failed")]
    InitFailed,
}

/// Calculate HMAC-SHA512 over data
pub fn calculate_hmac(key: &KeyData, data: &[u8]) -> Result<[u8; HMAC_LENGTH], HmacError> {
    let mut mac = HmacSha512::new_from_slice(key.as_slice()).map_err(|_| HmacError::InitFailed)?;
    mac.update(data);
    let mut tag = [0u8; HMAC_LENGTH];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

/// Check a tag against data using constant-time comparison
pub fn verify_hmac(key: &KeyData, data: &[u8], tag: &[u8]) -> bool {
    match calculate_hmac(key, data) {
        Ok(calculated) => calculated[..].ct_eq(tag).into(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_known_vector() {
        // RFC 4231 test case 2; zero padding does not change the HMAC key block
        let mut key = [0u8; 32];
        key[..4].copy_from_slice(b"Jefe");
        let key = KeyData::from(key);
        let tag = calculate_hmac(&key, b"what do ya want for nothing?").unwrap();
        assert_eq!(
            &tag[..8],
            &[0x16, 0x4b, 0x7a, 0x7b, 0xfc, 0xf8, 0x19, 0xe2]
        );
    }

    #[test]
    fn test_verify_hmac() {
        let key = KeyData::generate();
        let data = b"message";
        let tag = calculate_hmac(&key, data).unwrap();
        assert!(verify_hmac(&key, data, &tag));
        assert!(!verify_hmac(&key, b"massage", &tag));
        assert!(!verify_hmac(&KeyData::generate(), data, &tag));
        assert!(!verify_hmac(&key, data, &tag[..32]));

        let mut tampered = tag;
        tampered[63] ^= 0x01;
        assert!(!verify_hmac(&key, data, &tampered));
    }
}
