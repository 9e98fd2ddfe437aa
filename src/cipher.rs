//! Name hashing and the keyed reversible transform used by the rename ledger.
//!
//! A previous name is stored encrypted under a key derived from the name it
//! was renamed *to*, so only someone presenting the current name can recover
//! the previous one. This is obfuscation at rest, not a security boundary:
//! the key material is a filename and the nonce is derived from it.
//!
//! # Examples
//!
//! ```
//! use fdn::cipher::{decrypt_name, encrypt_name, name_hash};
//!
//! let sealed = encrypt_name("new.txt", "old name.txt").unwrap();
//! assert_eq!(decrypt_name("new.txt", &sealed).unwrap(), "old name.txt");
//! assert_eq!(name_hash("new.txt").len(), 64);
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use sha2::{Digest, Sha256};

const KEY_DOMAIN: &[u8] = b"fdn/name-key\0";
const NONCE_DOMAIN: &[u8] = b"fdn/name-nonce\0";
const NONCE_LEN: usize = 12;

/// Errors from sealing or opening a stored name.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("stored name is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    /// Wrong key or tampered ciphertext.
    #[error("stored name could not be opened with the given key")]
    Authentication,
    #[error("stored name is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Lowercase hex SHA-256 of a name.
pub fn name_hash(name: &str) -> String {
    hex::encode(Sha256::digest(name.as_bytes()))
}

fn derive(domain: &[u8], key: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}

fn cipher_for(key: &str) -> Result<(ChaCha20Poly1305, [u8; NONCE_LEN]), CipherError> {
    let cipher = ChaCha20Poly1305::new_from_slice(&derive(KEY_DOMAIN, key))
        .map_err(|_| CipherError::Authentication)?;
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&derive(NONCE_DOMAIN, key)[..NONCE_LEN]);
    Ok((cipher, nonce))
}

/// Seals `text` under `key`.
///
/// The output is deterministic for a given `(key, text)` pair, which is what
/// lets the ledger deduplicate repeated transitions.
pub fn encrypt_name(key: &str, text: &str) -> Result<String, CipherError> {
    let (cipher, nonce) = cipher_for(key)?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), text.as_bytes())
        .map_err(|_| CipherError::Authentication)?;
    Ok(STANDARD.encode(sealed))
}

/// Opens a value produced by [`encrypt_name`] with the same `key`.
pub fn decrypt_name(key: &str, sealed: &str) -> Result<String, CipherError> {
    let bytes = STANDARD.decode(sealed)?;
    let (cipher, nonce) = cipher_for(key)?;
    let plain = cipher
        .decrypt(Nonce::from_slice(&nonce), bytes.as_slice())
        .map_err(|_| CipherError::Authentication)?;
    Ok(String::from_utf8(plain)?)
}
