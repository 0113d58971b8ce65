//! lastvault-crypto: the vault field codec
//!
//! Every encrypted record field arrives in one of four shapes, and nothing in
//! the wire format says which. The shape is inferred from the byte length:
//!
//! ```text
//! ECB-plain        aes-256-ecb(pkcs7(plaintext))
//! ECB-base64       b64(aes-256-ecb(pkcs7(plaintext)))
//! CBC-plain        "!" || iv(16) || aes-256-cbc(pkcs7(plaintext))
//! CBC-base64       "!" || b64(iv) || "|" || b64(aes-256-cbc(pkcs7(plaintext)))
//! ```
//!
//! Writes always use CBC-base64 with a fresh random IV.
//!
//! Key derivation:
//! ```text
//! iterations == 1:  key = sha256(username || password)
//!                   login_hash = hex(sha256(hex(key) || password))
//! otherwise:        key = pbkdf2-hmac-sha256(password, salt=username, iterations)
//!                   login_hash = hex(pbkdf2-hmac-sha256(key, salt=password, 1))
//! ```

pub mod cipher;
pub mod encoding;
pub mod field;
pub mod kdf;

pub use cipher::{
    decrypt_cbc_base64, decrypt_cbc_plain, decrypt_ecb_base64, decrypt_ecb_plain,
    encrypt_cbc_base64, encrypt_cbc_base64_with_iv, encrypt_cbc_plain,
};
pub use encoding::{
    decode_base64, decode_hex, encode_base64, encode_hex, encode_intermediate, pkcs7_pad,
    pkcs7_unpad,
};
pub use field::{decrypt_field, encrypt_field, FieldEncoding};
pub use kdf::{derive_key, derive_login_hash, login_hash_from_key, VaultKey};

/// Size of an AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Size of a CBC initialization vector
pub const IV_SIZE: usize = 16;

/// Leading byte marking an IV-prefixed CBC buffer
pub const CBC_SENTINEL: u8 = b'!';
