//! Password-based key derivation.
//!
//! PBKDF2-HMAC-SHA256 with a fixed iteration count. Keys are derived on every
//! encrypt/decrypt call and wiped when dropped; nothing is cached.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// A derived symmetric key, zeroized on drop.
pub type DerivedKey = Zeroizing<[u8; KEY_LEN]>;

/// Derive a 32-byte key from `password` and `salt`.
///
/// Same inputs always yield the same key.
pub fn derive_key(password: &[u8], salt: &[u8]) -> DerivedKey {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password, salt, PBKDF2_ITERATIONS, &mut *key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_deterministic() {
        let a = derive_key(b"master", b"0011223344556677");
        let b = derive_key(b"master", b"0011223344556677");
        assert_eq!(*a, *b);
    }

    #[test]
    fn test_derive_key_depends_on_salt_and_password() {
        let base = derive_key(b"master", b"salt-one");
        let other_salt = derive_key(b"master", b"salt-two");
        let other_password = derive_key(b"other", b"salt-one");

        assert_ne!(*base, *other_salt);
        assert_ne!(*base, *other_password);
    }

    #[test]
    fn test_derive_key_known_vector() {
        // RFC 7914 section 11, c = 1.
        let mut reference = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(b"passwd", b"salt", 1, &mut reference);
        assert_eq!(
            hex::encode(&reference[..16]),
            "55ac046e56e3089fec1691c22544b605"
        );

        assert_eq!(derive_key(b"passwd", b"salt").len(), KEY_LEN);
    }
}
