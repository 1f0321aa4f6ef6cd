//! String protection
//!
//! Protects short secrets (passwords in config files, tokens) under a master
//! [`ProtectionKey`]. Every [`Crypto`] carries a purpose chain; data
//! protected for one chain cannot be unprotected under another.
//!
//! Payload layout before base64 (URL-safe, unpadded):
//!
//! ```text
//! [version: u8][nonce: 12 bytes][ciphertext][tag: 16 bytes]
//! ```

mod error;
mod key;

pub use error::CryptoError;
pub use key::{ProtectionKey, KEY_LEN};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, KeyInit, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

pub const DEFAULT_PURPOSE: &str = "ferrykit";

const PAYLOAD_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct Crypto {
    key: ProtectionKey,
    purposes: Vec<String>,
}

impl Crypto {
    pub fn new(key: ProtectionKey) -> Self {
        Self {
            key,
            purposes: vec![DEFAULT_PURPOSE.to_string()],
        }
    }

    /// Narrow the protector to a sub-purpose
    pub fn change_purpose(&mut self, purpose: impl Into<String>) -> &mut Self {
        self.purposes.push(purpose.into());
        self
    }

    pub fn purposes(&self) -> &[String] {
        &self.purposes
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let subkey = self.subkey();
        let cipher =
            ChaCha20Poly1305::new_from_slice(&*subkey).map_err(|_| CryptoError::EncryptionFailed)?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut payload = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        payload.push(PAYLOAD_VERSION);
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(payload))
    }

    pub fn decrypt(&self, protected: &str) -> Result<String, CryptoError> {
        let payload = URL_SAFE_NO_PAD
            .decode(protected.trim())
            .map_err(|e| CryptoError::InvalidFormat(e.to_string()))?;

        if payload.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(CryptoError::InvalidFormat(format!(
                "payload too short ({} bytes)",
                payload.len()
            )));
        }
        if payload[0] != PAYLOAD_VERSION {
            return Err(CryptoError::UnsupportedVersion(payload[0]));
        }

        let (nonce, ciphertext) = payload[1..].split_at(NONCE_LEN);

        let subkey = self.subkey();
        let cipher =
            ChaCha20Poly1305::new_from_slice(&*subkey).map_err(|_| CryptoError::DecryptionFailed)?;
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| CryptoError::DecryptionFailed)?,
        );

        String::from_utf8(plaintext.to_vec()).map_err(|_| CryptoError::DecryptionFailed)
    }

    /// SHA-256 over the master key and the length-prefixed purpose chain
    fn subkey(&self) -> Zeroizing<[u8; KEY_LEN]> {
        let mut hasher = Sha256::new();
        hasher.update(self.key.as_bytes());
        for purpose in &self.purposes {
            hasher.update((purpose.len() as u32).to_be_bytes());
            hasher.update(purpose.as_bytes());
        }
        let mut subkey = Zeroizing::new([0u8; KEY_LEN]);
        subkey.copy_from_slice(&hasher.finalize());
        subkey
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crypto() -> Crypto {
        Crypto::new(ProtectionKey::from_bytes([7u8; KEY_LEN]))
    }

    #[test]
    fn test_roundtrip() {
        let c = crypto();
        let protected = c.encrypt("s3cret-password").unwrap();

        assert!(!protected.contains('+') && !protected.contains('/') && !protected.contains('='));
        assert_eq!(c.decrypt(&protected).unwrap(), "s3cret-password");
    }

    #[test]
    fn test_nonce_makes_output_differ() {
        let c = crypto();
        assert_ne!(c.encrypt("same").unwrap(), c.encrypt("same").unwrap());
    }

    #[test]
    fn test_wrong_purpose_fails() {
        let c = crypto();
        let protected = c.encrypt("value").unwrap();

        let mut other = crypto();
        other.change_purpose("smtp");
        assert_eq!(other.purposes(), &["ferrykit", "smtp"]);
        assert!(matches!(
            other.decrypt(&protected),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_purpose_chain_is_unambiguous() {
        let mut a = crypto();
        a.change_purpose("ab").change_purpose("c");
        let mut b = crypto();
        b.change_purpose("a").change_purpose("bc");

        let protected = a.encrypt("value").unwrap();
        assert!(b.decrypt(&protected).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let protected = crypto().encrypt("value").unwrap();
        let other = Crypto::new(ProtectionKey::generate());
        assert!(matches!(
            other.decrypt(&protected),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let c = crypto();
        let protected = c.encrypt("value").unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(&protected).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;

        assert!(matches!(
            c.decrypt(&URL_SAFE_NO_PAD.encode(raw)),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_malformed_input() {
        let c = crypto();
        assert!(matches!(c.decrypt("not base64!"), Err(CryptoError::InvalidFormat(_))));
        assert!(matches!(c.decrypt("AAAA"), Err(CryptoError::InvalidFormat(_))));

        let mut raw = URL_SAFE_NO_PAD.decode(c.encrypt("x").unwrap()).unwrap();
        raw[0] = 9;
        assert!(matches!(
            c.decrypt(&URL_SAFE_NO_PAD.encode(raw)),
            Err(CryptoError::UnsupportedVersion(9))
        ));
    }
}
