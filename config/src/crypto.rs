//! At-rest encryption for cached OAuth tokens.
//!
//! AES-256-GCM with a key derived from the hostname and username, so a token
//! file copied to another machine or account is useless.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::Rng;
use sha2::{Digest, Sha256};

const NONCE_SIZE: usize = 12;
const KEY_SALT: &[u8] = b"photos-upload-token-encryption-v1";

/// Seals and opens secrets with a machine-bound key.
pub struct TokenCipher {
    key: [u8; 32],
}

impl TokenCipher {
    /// Cipher bound to the current machine and user
    pub fn for_this_machine() -> Self {
        let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string());
        let username = whoami::username();
        Self::from_identity(&hostname, &username)
    }

    /// Cipher bound to an explicit host/user pair
    pub fn from_identity(hostname: &str, username: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(KEY_SALT);
        hasher.update(hostname.as_bytes());
        hasher.update(b":");
        hasher.update(username.as_bytes());

        let mut key = [0u8; 32];
        key.copy_from_slice(&hasher.finalize());
        Self { key }
    }

    /// Encrypt `plaintext`; output is base64(nonce || ciphertext).
    pub fn seal(&self, plaintext: &str) -> Result<String, String> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| format!("Encryption failed: {}", e))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&combined))
    }

    /// Decrypt a value produced by [`TokenCipher::seal`].
    pub fn open(&self, sealed: &str) -> Result<String, String> {
        let cipher = self.cipher()?;

        let combined = BASE64
            .decode(sealed)
            .map_err(|e| format!("Failed to decode base64: {}", e))?;

        if combined.len() < NONCE_SIZE {
            return Err("Encrypted data too short".to_string());
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| format!("Decryption failed: {}", e))?;

        String::from_utf8(plaintext).map_err(|e| format!("Invalid UTF-8 in decrypted data: {}", e))
    }

    fn cipher(&self) -> Result<Aes256Gcm, String> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|e| format!("Failed to create cipher: {}", e))
    }
}
