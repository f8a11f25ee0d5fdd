//! PAN data protection for the loan prequalification pipeline.
//!
//! Implements AES-256-GCM authenticated encryption for PAN numbers at rest
//! and in transit. Provides:
//! - Encrypting PAN for database storage (binary: nonce + ciphertext + tag)
//! - Decrypting stored PAN (authentication tag verified)
//! - Hashing PAN for duplicate detection without decryption
//! - Base64 transcoding for Kafka message transport
//!
//! A random 96-bit nonce per encryption ensures the same plaintext never
//! produces the same ciphertext twice. The nonce is prepended to the
//! ciphertext so decryption needs no external state.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Nonce length for AES-GCM (96 bits).
const NONCE_LEN: usize = 12;

/// PAN numbers are exactly 10 characters: AAAAA9999A.
pub const PAN_LENGTH: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The configured key is not base64 of exactly 32 bytes.
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("encryption failed")]
    Encryption,

    /// Ciphertext too short, tampered, or encrypted under a different key.
    #[error("decryption failed")]
    Decryption,

    #[error("invalid base64 payload: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("decrypted PAN is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid PAN length")]
    InvalidPanLength,
}

/// A validated 256-bit encryption key.
///
/// Constructed from the base64-encoded `ENCRYPTION_KEY` configuration
/// value; anything that does not decode to exactly 32 bytes is rejected.
#[derive(Clone)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("not valid base64: {e}")))?;

        let key: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::InvalidKey(format!("must be 32 bytes (256 bits), got {}", b.len()))
        })?;

        Ok(Self(key))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.write_str("EncryptionKey(..)")
    }
}

/// AES-256-GCM cipher for PAN encryption and decryption.
///
/// Constructed once at process start and passed to the components that
/// need it; cloning shares the underlying key schedule.
#[derive(Clone)]
pub struct PanCipher {
    cipher: Aes256Gcm,
}

impl PanCipher {
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0)),
        }
    }

    /// Encrypt a PAN for database storage.
    ///
    /// Output layout: `nonce (12 bytes) || ciphertext || auth tag`.
    pub fn encrypt_pan(&self, pan: &str) -> Result<Vec<u8>, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), pan.as_bytes())
            .map_err(|_| CryptoError::Encryption)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a stored PAN. The authentication tag is verified; tampered
    /// data or a wrong key yields [`CryptoError::Decryption`].
    pub fn decrypt_pan(&self, encrypted: &[u8]) -> Result<String, CryptoError> {
        if encrypted.len() < NONCE_LEN {
            return Err(CryptoError::Decryption);
        }
        let (nonce, ciphertext) = encrypted.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decryption)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }

    /// Encrypt a PAN and base64-encode it for Kafka transport.
    pub fn encrypt_pan_for_wire(&self, pan: &str) -> Result<String, CryptoError> {
        Ok(BASE64.encode(self.encrypt_pan(pan)?))
    }

    /// Decrypt a base64-encoded PAN from a Kafka message.
    pub fn decrypt_pan_from_wire(&self, encoded: &str) -> Result<String, CryptoError> {
        self.decrypt_pan(&BASE64.decode(encoded)?)
    }
}

/// SHA-256 hex fingerprint of a plaintext PAN (64 lowercase hex chars).
///
/// Deterministic and one-way; allows duplicate detection without
/// decrypting stored PANs.
pub fn pan_fingerprint(pan: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pan.as_bytes());
    hex::encode(hasher.finalize())
}

/// Mask a PAN for display, keeping the last 5 characters: `XXXXX1234F`.
pub fn mask_pan(pan: &str) -> Result<String, CryptoError> {
    if pan.chars().count() != PAN_LENGTH {
        return Err(CryptoError::InvalidPanLength);
    }
    let tail: String = pan.chars().skip(PAN_LENGTH / 2).collect();
    Ok(format!("XXXXX{tail}"))
}

/// Validate PAN format: 5 uppercase letters, 4 digits, 1 uppercase letter.
pub fn is_valid_pan(pan: &str) -> bool {
    let chars: Vec<char> = pan.chars().collect();
    if chars.len() != PAN_LENGTH {
        return false;
    }
    chars[..5].iter().all(|c| c.is_ascii_uppercase())
        && chars[5..9].iter().all(|c| c.is_ascii_digit())
        && chars[9].is_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY="; // 32 bytes

    fn cipher() -> PanCipher {
        PanCipher::new(&EncryptionKey::from_base64(TEST_KEY).unwrap())
    }

    #[test]
    fn test_key_rejects_bad_base64() {
        let err = EncryptionKey::from_base64("not base64!!").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey(_)));
    }

    #[test]
    fn test_key_rejects_wrong_length() {
        let short = BASE64.encode([0u8; 16]);
        let err = EncryptionKey::from_base64(&short).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey(_)));
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let c = cipher();
        for pan in ["ABCDE1234F", "", "पैन-नंबर", "a b c"] {
            let encrypted = c.encrypt_pan(pan).unwrap();
            assert_eq!(c.decrypt_pan(&encrypted).unwrap(), pan);
        }
    }

    #[test]
    fn test_wire_round_trip() {
        let c = cipher();
        let wire = c.encrypt_pan_for_wire("FGHIJ5678K").unwrap();
        assert_eq!(c.decrypt_pan_from_wire(&wire).unwrap(), "FGHIJ5678K");
    }

    #[test]
    fn test_nonce_freshness() {
        let c = cipher();
        let first = c.encrypt_pan("ABCDE1234F").unwrap();
        let second = c.encrypt_pan("ABCDE1234F").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let c = cipher();
        let mut encrypted = c.encrypt_pan("ABCDE1234F").unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;
        assert!(matches!(
            c.decrypt_pan(&encrypted),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn test_truncated_ciphertext_rejected() {
        let c = cipher();
        assert!(matches!(
            c.decrypt_pan(&[0u8; 4]),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let a = pan_fingerprint("ABCDE1234F");
        let b = pan_fingerprint("ABCDE1234F");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, pan_fingerprint("FGHIJ5678K"));
    }

    #[test]
    fn test_mask_pan() {
        assert_eq!(mask_pan("ABCDE1234F").unwrap(), "XXXXX1234F");
        assert!(mask_pan("SHORT").is_err());
    }

    #[test]
    fn test_pan_format_validation() {
        assert!(is_valid_pan("ABCDE1234F"));
        assert!(!is_valid_pan("abcde1234f"));
        assert!(!is_valid_pan("ABCD1234FX"));
        assert!(!is_valid_pan("ABCDE12345"));
        assert!(!is_valid_pan("ABCDE1234"));
        assert!(!is_valid_pan("ABCDE1234FX"));
    }
}
