//! Symmetric authenticated encryption for token material at rest.
//!
//! One process-wide key, derived from configuration (`token_encryption_key`,
//! hex- or base64-encoded, 32 bytes). Each call to [`TokenEncryptor::encrypt`]
//! draws a fresh random 96-bit nonce and prepends it to the ciphertext;
//! [`TokenEncryptor::decrypt`] splits it back off. Key rotation is out of
//! scope — rotating requires re-encrypting all stored rows with a new
//! encryptor out of band.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{AeadCore, ChaCha20Poly1305, Key, Nonce};
use common::Secret;
use zeroize::Zeroize;

use crate::error::{Error, Result};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Clone)]
struct KeyBytes([u8; KEY_LEN]);

impl Zeroize for KeyBytes {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

pub struct TokenEncryptor {
    key: Secret<KeyBytes>,
}

impl TokenEncryptor {
    /// Build an encryptor from a raw 32-byte key.
    pub fn from_key_bytes(key: [u8; KEY_LEN]) -> Self {
        Self {
            key: Secret::new(KeyBytes(key)),
        }
    }

    /// Parse `token_encryption_key` from configuration: hex (64 chars) or
    /// standard base64, either decoding to exactly 32 bytes.
    pub fn from_config_str(raw: &str) -> Result<Self> {
        let bytes = decode_key(raw)?;
        Ok(Self::from_key_bytes(bytes))
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.key.expose().0))
    }

    /// Encrypt `plaintext`, returning base64 of `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = self.cipher();
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| Error::TamperedOrWrongKey)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    /// Decrypt a value produced by [`Self::encrypt`]. Fails closed on any
    /// tampering or key mismatch.
    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let raw = BASE64
            .decode(encoded)
            .map_err(|_| Error::MalformedCiphertext)?;
        if raw.len() < NONCE_LEN {
            return Err(Error::MalformedCiphertext);
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let cipher = self.cipher();
        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| Error::TamperedOrWrongKey)?;

        String::from_utf8(plaintext).map_err(|_| Error::TamperedOrWrongKey)
    }
}

fn decode_key(raw: &str) -> Result<[u8; KEY_LEN]> {
    let bytes = if raw.len() == KEY_LEN * 2 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        hex_decode(raw)?
    } else {
        BASE64
            .decode(raw)
            .map_err(|e| Error::InvalidKey(format!("not valid base64: {e}")))?
    };

    if bytes.len() != KEY_LEN {
        return Err(Error::InvalidKey(format!(
            "expected {KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&bytes);
    Ok(key)
}

fn hex_decode(raw: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len() / 2);
    let chars: Vec<char> = raw.chars().collect();
    for pair in chars.chunks(2) {
        let byte = u8::from_str_radix(&pair.iter().collect::<String>(), 16)
            .map_err(|e| Error::InvalidKey(format!("invalid hex: {e}")))?;
        out.push(byte);
    }
    Ok(out)
}
