//! AES-256-CBC with PKCS#7 padding

use crate::error::CryptoError;
use crate::types::{InitializationVector, KeyData};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block length
pub const BLOCK_LENGTH: usize = 16;

/// Encrypt with a freshly generated initialization vector
pub fn encrypt(
    key: &KeyData,
    plaintext: &[u8],
) -> Result<(Vec<u8>, InitializationVector), CryptoError> {
    let iv = InitializationVector::generate();
    let ciphertext = encrypt_with_iv(key, &iv, plaintext)?;
    Ok((ciphertext, iv))
}

/// Encrypt with a caller-supplied initialization vector
///
/// Reusing an IV with the same key leaks plaintext equality; only tests and
/// interoperability vectors should call this directly.
pub fn encrypt_with_iv(
    key: &KeyData,
    iv: &InitializationVector,
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256CbcEnc::new_from_slices(key.as_slice(), iv.as_slice())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

pub fn decrypt(
    key: &KeyData,
    iv: &InitializationVector,
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LENGTH != 0 {
        return Err(CryptoError::Decryption(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_LENGTH
        )));
    }
    let cipher = Aes256CbcDec::new_from_slices(key.as_slice(), iv.as_slice())
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Decryption("invalid padding".to_string()))
}

/// Length of the ciphertext produced for a plaintext of `len` bytes
pub fn padded_length(len: usize) -> usize {
    (len / BLOCK_LENGTH + 1) * BLOCK_LENGTH
}
