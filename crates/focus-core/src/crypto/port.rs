//! String-oriented credential encryption port.
//!
//! Auth configs and other sensitive fields are stored as plain strings at
//! rest (JSON columns, config files). This module wraps the byte-oriented
//! [`super::cipher`] functions behind an API that operates on those strings
//! directly, and that can tell ciphertext apart from plaintext so that
//! decrypting an already-plaintext value is a no-op rather than an error.
//!
//! # Wire format
//!
//! Encrypted strings are `ENC_PREFIX` followed by base64 (standard, padded)
//! of the `nonce || ciphertext || tag` bytes produced by [`super::cipher::encrypt`].
//! Any string that does not start with the prefix is treated as plaintext.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::cipher::{decrypt, encrypt};
use super::error::{CryptoError, CryptoResult};
use super::key::EncryptionKey;

/// Prefix marking a string as ciphertext produced by [`encrypt_str`].
pub const ENC_PREFIX: &str = "enc:v1:";

/// Encrypts a plaintext string, returning a value tagged with [`ENC_PREFIX`].
pub fn encrypt_str(key: &EncryptionKey, plaintext: &str) -> CryptoResult<String> {
    let ciphertext = encrypt(key, plaintext.as_bytes())?;
    Ok(format!("{ENC_PREFIX}{}", BASE64.encode(ciphertext)))
}

/// Decrypts a string produced by [`encrypt_str`].
///
/// For backward compatibility with values written before encryption was
/// enabled, a string lacking [`ENC_PREFIX`] is returned unchanged rather
/// than treated as an error.
pub fn decrypt_str(key: &EncryptionKey, value: &str) -> CryptoResult<String> {
    let Some(encoded) = value.strip_prefix(ENC_PREFIX) else {
        return Ok(value.to_string());
    };

    let ciphertext = BASE64
        .decode(encoded)
        .map_err(|_| CryptoError::DecryptionFailed)?;
    let plaintext = decrypt(key, &ciphertext)?;
    String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed)
}

/// Returns true if `value` is ciphertext produced by [`encrypt_str`].
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENC_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let key = EncryptionKey::generate();
        let plain = "sk-test-api-key-value";

        let encrypted = encrypt_str(&key, plain).unwrap();
        assert!(is_encrypted(&encrypted));
        assert!(!is_encrypted(plain));

        let decrypted = decrypt_str(&key, &encrypted).unwrap();
        assert_eq!(decrypted, plain);
    }

    #[test]
    fn test_decrypt_plaintext_passthrough() {
        let key = EncryptionKey::generate();
        let plain = "already-plaintext-value";

        let decrypted = decrypt_str(&key, plain).unwrap();
        assert_eq!(decrypted, plain);
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let key1 = EncryptionKey::generate();
        let key2 = EncryptionKey::generate();

        let encrypted = encrypt_str(&key1, "secret").unwrap();
        let result = decrypt_str(&key2, &encrypted);

        assert!(result.is_err());
    }
}
