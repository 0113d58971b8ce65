//! Length-driven field decryption.
//!
//! Branch order matters: some residues are shared across moduli and the first
//! match wins. Changing the order changes which ciphertexts are accepted.

use lastvault_core::{VaultError, VaultResult};

use crate::cipher::{
    decrypt_cbc_base64, decrypt_cbc_plain, decrypt_ecb_base64, decrypt_ecb_plain,
    encrypt_cbc_base64,
};
use crate::kdf::VaultKey;
use crate::BLOCK_SIZE;

/// The wire shape of an encrypted field, inferred from its byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    Empty,
    EcbPlain,
    EcbBase64,
    /// `"!" || iv || ciphertext`
    CbcPlain,
    /// `"!" || b64(iv) || "|" || b64(ciphertext)`
    CbcBase64,
}

impl FieldEncoding {
    /// Pick an encoding for a field of `len` bytes, or `None` if no branch matches.
    pub fn detect(len: usize) -> Option<Self> {
        if len == 0 {
            Some(FieldEncoding::Empty)
        } else if len % BLOCK_SIZE == 0 {
            Some(FieldEncoding::EcbPlain)
        } else if matches!(len % 64, 0 | 24 | 44) {
            Some(FieldEncoding::EcbBase64)
        } else if len % BLOCK_SIZE == 1 {
            Some(FieldEncoding::CbcPlain)
        } else if matches!(len % 64, 6 | 26 | 50) {
            Some(FieldEncoding::CbcBase64)
        } else {
            None
        }
    }

    /// Decrypt `data` assuming this encoding.
    pub fn decrypt(self, data: &[u8], key: &VaultKey) -> VaultResult<Vec<u8>> {
        let key = key.as_bytes();
        match self {
            FieldEncoding::Empty => Ok(Vec::new()),
            FieldEncoding::EcbPlain => decrypt_ecb_plain(data, key),
            FieldEncoding::EcbBase64 => decrypt_ecb_base64(data, key),
            // the leading sentinel is dropped, not checked
            FieldEncoding::CbcPlain => {
                let framed = data.get(1..).ok_or_else(|| {
                    VaultError::invalid_encoding("CBC-plain field is missing its sentinel byte")
                })?;
                decrypt_cbc_plain(framed, key)
            }
            FieldEncoding::CbcBase64 => decrypt_cbc_base64(data, key),
        }
    }
}

/// Decrypt one record field to text.
///
/// Invalid UTF-8 in the plaintext is replaced rather than rejected.
pub fn decrypt_field(data: &[u8], key: &VaultKey) -> VaultResult<String> {
    let encoding = FieldEncoding::detect(data.len()).ok_or(VaultError::UnrecognizedFieldEncoding {
        len: data.len(),
        field: None,
    })?;
    tracing::trace!(len = data.len(), ?encoding, "decrypting field");

    if encoding == FieldEncoding::Empty {
        return Ok(String::new());
    }
    let plaintext = encoding.decrypt(data, key)?;
    Ok(String::from_utf8_lossy(&plaintext).into_owned())
}

/// Encrypt one record field for a write request (CBC, intermediate base64).
pub fn encrypt_field(plaintext: &str, key: &VaultKey) -> VaultResult<String> {
    encrypt_cbc_base64(plaintext.as_bytes(), key.as_bytes())
}
