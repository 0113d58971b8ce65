//! Key derivation: username + password → vault key and login hash

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::encoding::encode_hex;
use crate::KEY_SIZE;

/// The 256-bit symmetric key every record field is encrypted under.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct VaultKey {
    bytes: [u8; KEY_SIZE],
}

impl VaultKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for VaultKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the vault key.
///
/// One iteration means a single SHA-256 over `username || password`; any other
/// count runs PBKDF2-HMAC-SHA256 with the username as salt. Callers must reject
/// a zero count before getting here.
pub fn derive_key(username: &str, password: &SecretString, iterations: u32) -> VaultKey {
    let password = password.expose_secret().as_bytes();
    let mut bytes = [0u8; KEY_SIZE];

    if iterations == 1 {
        let mut hasher = Sha256::new();
        hasher.update(username.as_bytes());
        hasher.update(password);
        bytes.copy_from_slice(&hasher.finalize());
    } else {
        pbkdf2_hmac::<Sha256>(password, username.as_bytes(), iterations, &mut bytes);
    }

    VaultKey::from_bytes(bytes)
}

/// Compute the login hash from an already-derived key.
///
/// The single-iteration path hashes the lowercase hex text of the key, not
/// its raw bytes. The server checks exactly this form.
pub fn login_hash_from_key(key: &VaultKey, password: &SecretString, iterations: u32) -> String {
    let password = password.expose_secret().as_bytes();

    if iterations == 1 {
        let mut key_hex = encode_hex(key.as_bytes());
        let mut hasher = Sha256::new();
        hasher.update(key_hex.as_bytes());
        hasher.update(password);
        key_hex.zeroize();
        encode_hex(&hasher.finalize())
    } else {
        let mut hash = [0u8; KEY_SIZE];
        pbkdf2_hmac::<Sha256>(key.as_bytes(), password, 1, &mut hash);
        encode_hex(&hash)
    }
}

/// Derive the login hash sent to the authentication endpoint.
pub fn derive_login_hash(username: &str, password: &SecretString, iterations: u32) -> String {
    let key = derive_key(username, password, iterations);
    login_hash_from_key(&key, password, iterations)
}
