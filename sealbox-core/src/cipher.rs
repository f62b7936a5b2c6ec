//! Symmetric encryption of single credential values.
//!
//! Values are encrypted with AES-256-CBC (PKCS#7 padding) under a key derived
//! from the master password by [`crate::kdf::derive_key`]. Every call draws a
//! fresh random salt and IV, so encrypting the same value twice yields
//! unrelated records.
//!
//! # Record Format
//!
//! ```text
//! {salt_hex}:{iv_hex}:{ciphertext_hex}
//! ```
//!
//! All three tokens are lowercase hex. The salt fed to PBKDF2 is the salt's hex
//! *text*, not its raw bytes; existing records depend on this.
//!
//! # Example
//!
//! ```
//! use sealbox_core::cipher;
//!
//! let record = cipher::encrypt("sk-live-123", "master-password").unwrap();
//! assert!(cipher::is_encrypted(&record));
//! assert_eq!(cipher::decrypt(&record, "master-password").unwrap(), "sk-live-123");
//! ```

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::Zeroize;

use crate::kdf::derive_key;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Random salt length in bytes (before hex encoding).
pub const SALT_LEN: usize = 16;

/// AES block / IV length in bytes.
pub const IV_LEN: usize = 16;

/// Characters left visible at each end by [`mask_default`].
pub const DEFAULT_VISIBLE_CHARS: usize = 4;

/// Minimum length of the masked run.
pub const MIN_MASK_RUN: usize = 8;

const MASK_CHAR: char = '*';

/// Error type for cipher operations.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The encrypted value is not a `salt:iv:ciphertext` triple.
    #[error("invalid encrypted value format: {message}")]
    Format { message: String },

    /// Key, IV, padding, or encoding mismatch; usually a wrong master password.
    #[error("decryption failed: {message}")]
    Crypto { message: String },
}

impl CipherError {
    fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }
}

/// A parsed `salt:iv:ciphertext` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    /// Salt hex text, kept verbatim because it is the PBKDF2 salt input.
    salt: String,
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
}

impl EncryptedValue {
    /// Parse a record.
    ///
    /// Wrong part count or an empty part is a [`CipherError::Format`];
    /// undecodable hex or a bad IV length is a [`CipherError::Crypto`].
    pub fn parse(record: &str) -> Result<Self, CipherError> {
        let parts: Vec<&str> = record.split(':').collect();
        if parts.len() != 3 {
            return Err(CipherError::format(format!(
                "expected 3 colon-separated parts, found {}",
                parts.len()
            )));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CipherError::format("empty salt, iv, or ciphertext"));
        }

        let iv_bytes =
            hex::decode(parts[1]).map_err(|e| CipherError::crypto(format!("invalid iv: {}", e)))?;
        let iv: [u8; IV_LEN] = iv_bytes.try_into().map_err(|bytes: Vec<u8>| {
            CipherError::crypto(format!("iv must be {} bytes, got {}", IV_LEN, bytes.len()))
        })?;

        let ciphertext = hex::decode(parts[2])
            .map_err(|e| CipherError::crypto(format!("invalid ciphertext: {}", e)))?;

        Ok(Self {
            salt: parts[0].to_string(),
            iv,
            ciphertext,
        })
    }

    /// The salt token as stored.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Decrypt this record with `password`.
    pub fn decrypt(&self, password: &str) -> Result<String, CipherError> {
        let key = derive_key(password.as_bytes(), self.salt.as_bytes());
        let decryptor = Aes256CbcDec::new_from_slices(&key[..], &self.iv)
            .map_err(|e| CipherError::crypto(e.to_string()))?;

        let plaintext = decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(&self.ciphertext)
            .map_err(|_| CipherError::crypto("bad padding (wrong master password?)"))?;

        String::from_utf8(plaintext).map_err(|e| {
            let mut bytes = e.into_bytes();
            bytes.zeroize();
            CipherError::crypto("plaintext is not valid UTF-8 (wrong master password?)")
        })
    }
}

impl fmt::Display for EncryptedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.salt,
            hex::encode(self.iv),
            hex::encode(&self.ciphertext)
        )
    }
}

impl FromStr for EncryptedValue {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Encrypt `plaintext` under `password`, returning a `salt:iv:ciphertext` record.
pub fn encrypt(plaintext: &str, password: &str) -> Result<String, CipherError> {
    let mut rng = rand::thread_rng();

    let mut salt_bytes = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);

    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);

    let key = derive_key(password.as_bytes(), salt.as_bytes());
    let encryptor = Aes256CbcEnc::new_from_slices(&key[..], &iv)
        .map_err(|e| CipherError::crypto(format!("encryption failed: {}", e)))?;
    let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    Ok(EncryptedValue {
        salt,
        iv,
        ciphertext,
    }
    .to_string())
}

/// Decrypt a `salt:iv:ciphertext` record with `password`.
pub fn decrypt(record: &str, password: &str) -> Result<String, CipherError> {
    EncryptedValue::parse(record)?.decrypt(password)
}

/// Whether `value` looks like an encrypted record.
///
/// True iff it has exactly three colon-separated, non-empty, all-hex parts
/// (case-insensitive). This is a format sniff only: a plaintext value that
/// happens to be three hex runs joined by colons is misclassified.
pub fn is_encrypted(value: &str) -> bool {
    let parts: Vec<&str> = value.split(':').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Mask `value` for display, keeping `visible_chars` at each end.
///
/// Values of `2 * visible_chars` characters or fewer are fully replaced by
/// eight mask characters. Otherwise the middle becomes a run of at least
/// eight mask characters.
pub fn mask(value: &str, visible_chars: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= visible_chars * 2 {
        return MASK_CHAR.to_string().repeat(MIN_MASK_RUN);
    }

    let run = MIN_MASK_RUN.max(chars.len() - visible_chars * 2);
    let start: String = chars[..visible_chars].iter().collect();
    let end: String = chars[chars.len() - visible_chars..].iter().collect();

    format!("{}{}{}", start, MASK_CHAR.to_string().repeat(run), end)
}

/// [`mask`] with [`DEFAULT_VISIBLE_CHARS`].
pub fn mask_default(value: &str) -> String {
    mask(value, DEFAULT_VISIBLE_CHARS)
}

/// Generate a random master password: 32 bytes as 64 lowercase hex characters.
pub fn generate_master_password() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let password = hex::encode(bytes);
    bytes.zeroize();
    password
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "test-master-password-0123456789abcdef0123456789abcdef0123456789ab";

    #[test]
    fn test_round_trip_encrypt_decrypt() {
        let record = encrypt("sk-live-1234567890", MASTER).unwrap();
        assert_eq!(decrypt(&record, MASTER).unwrap(), "sk-live-1234567890");
    }

    #[test]
    fn test_round_trip_unicode_and_empty() {
        for plaintext in ["", "ключ-🔑-値", "with:colons:inside"] {
            let record = encrypt(plaintext, MASTER).unwrap();
            assert_eq!(decrypt(&record, MASTER).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_encrypt_is_not_deterministic() {
        let a = encrypt("same-secret", MASTER).unwrap();
        let b = encrypt("same-secret", MASTER).unwrap();
        assert_ne!(a, b);

        let a = EncryptedValue::parse(&a).unwrap();
        let b = EncryptedValue::parse(&b).unwrap();
        assert_ne!(a.salt(), b.salt());
    }

    #[test]
    fn test_wrong_password_fails() {
        let record = encrypt("sensitive", MASTER).unwrap();
        let result = decrypt(&record, "a-different-master-password");
        assert!(matches!(result, Err(CipherError::Crypto { .. })));
    }

    #[test]
    fn test_record_shape() {
        let record = encrypt("x", MASTER).unwrap();
        let parts: Vec<&str> = record.split(':').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), SALT_LEN * 2);
        assert_eq!(parts[1].len(), IV_LEN * 2);
        assert_eq!(parts[2].len(), 32, "one padded block, hex encoded");
        assert!(record.chars().all(|c| c == ':' || c.is_ascii_hexdigit()));
        assert_eq!(record, record.to_lowercase());
    }

    #[test]
    fn test_decrypts_record_from_existing_deployment() {
        let record = "000102030405060708090a0b0c0d0e0f:\
                      0f0e0d0c0b0a09080706050403020100:\
                      e17f777e1bfb16cd28a8bbcb984aca4aa4dc5e66a6baba01110def275a5dba61";
        assert_eq!(decrypt(record, MASTER).unwrap(), "sk-live-1234567890abcdef");
    }

    #[test]
    fn test_format_errors() {
        for bad in ["", "onlyone", "two:parts", "a:b:c:d", "::", "aa::bb"] {
            let result = decrypt(bad, MASTER);
            assert!(
                matches!(result, Err(CipherError::Format { .. })),
                "expected format error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_crypto_errors_on_bad_components() {
        // iv too short
        assert!(matches!(
            decrypt("abcd:0011:00112233445566778899aabbccddeeff", MASTER),
            Err(CipherError::Crypto { .. })
        ));
        // non-hex ciphertext
        assert!(matches!(
            decrypt("abcd:000102030405060708090a0b0c0d0e0f:zz", MASTER),
            Err(CipherError::Crypto { .. })
        ));
        // ciphertext not a whole block
        assert!(matches!(
            decrypt("abcd:000102030405060708090a0b0c0d0e0f:0011", MASTER),
            Err(CipherError::Crypto { .. })
        ));
    }

    #[test]
    fn test_is_encrypted() {
        let record = encrypt("anything", MASTER).unwrap();
        assert!(is_encrypted(&record));
        assert!(is_encrypted(&record.to_uppercase()));

        assert!(!is_encrypted("sk-proj-abcdef123456"));
        assert!(!is_encrypted("plainalphanumeric42"));
        assert!(!is_encrypted("abc:def"));
        assert!(!is_encrypted("abc::def"));
        assert!(!is_encrypted("abc:xyz:def"));
    }

    #[test]
    fn test_is_encrypted_misclassifies_hex_triples() {
        // Known limitation of the format sniff.
        assert!(is_encrypted("dead:beef:cafe"));
    }

    #[test]
    fn test_mask_short_values() {
        assert_eq!(mask_default(""), "********");
        assert_eq!(mask_default("abc"), "********");
        assert_eq!(mask_default("12345678"), "********");
    }

    #[test]
    fn test_mask_long_values() {
        assert_eq!(mask_default("123456789"), "1234********6789");
        assert_eq!(
            mask_default("sk-abcdefghijklmnopqrstuvwxyz"),
            "sk-a*********************wxyz"
        );
        assert_eq!(mask("abcdefgh", 2), "ab********gh");
    }

    #[test]
    fn test_mask_never_reveals_more_than_visible_chars() {
        let values = [
            "sk-live-0123456789abcdefghij",
            "hf_ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            "ключ-секретный-очень-длинный",
        ];
        for value in values {
            let masked = mask_default(value);
            let value_len = value.chars().count();
            assert!(masked.chars().count() >= MIN_MASK_RUN + 2 * DEFAULT_VISIBLE_CHARS);

            let masked_chars: Vec<char> = masked.chars().collect();
            let visible = masked_chars.iter().filter(|c| **c != MASK_CHAR).count();
            assert_eq!(visible, 2 * DEFAULT_VISIBLE_CHARS);

            let middle: String = value
                .chars()
                .skip(DEFAULT_VISIBLE_CHARS)
                .take(value_len - 2 * DEFAULT_VISIBLE_CHARS)
                .collect();
            assert!(!masked.contains(&middle));
        }
    }

    #[test]
    fn test_generate_master_password() {
        let a = generate_master_password();
        let b = generate_master_password();

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
