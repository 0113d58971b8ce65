//! Byte-level wire encodings: PKCS#7 padding, hex, base64, and the
//! intermediate base64 form that keeps a CBC IV apart from its ciphertext.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lastvault_core::{VaultError, VaultResult};

use crate::{CBC_SENTINEL, IV_SIZE};

/// Append PKCS#7 padding.
///
/// A buffer that is already block-aligned still gets a full block of padding.
/// `block_size` must be in `1..=255`; anything else is `InvalidEncoding`.
pub fn pkcs7_pad(data: &[u8], block_size: usize) -> VaultResult<Vec<u8>> {
    if !(1..=255).contains(&block_size) {
        return Err(VaultError::invalid_encoding(format!(
            "PKCS#7 block size must be 1..=255, got {block_size}"
        )));
    }
    let padding = block_size - data.len() % block_size;
    let mut out = Vec::with_capacity(data.len() + padding);
    out.extend_from_slice(data);
    out.resize(data.len() + padding, padding as u8);
    Ok(out)
}

/// Strip PKCS#7 padding by trusting the last byte as the pad length.
///
/// The pad bytes themselves are not checked. The service still emits blobs
/// that a strict unpad would reject, so this is unauthenticated input: treat
/// the output of a CBC decrypt + unpad as untrusted. A pad length longer than
/// the buffer yields an empty slice.
pub fn pkcs7_unpad(data: &[u8]) -> &[u8] {
    match data.last() {
        Some(&pad) => &data[..data.len().saturating_sub(pad as usize)],
        None => data,
    }
}

/// Lowercase hex.
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

pub fn decode_hex(data: impl AsRef<[u8]>) -> VaultResult<Vec<u8>> {
    hex::decode(data).map_err(|e| VaultError::invalid_encoding(format!("hex decode: {e}")))
}

/// Standard base64 with padding.
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn decode_base64(data: impl AsRef<[u8]>) -> VaultResult<Vec<u8>> {
    STANDARD
        .decode(data)
        .map_err(|e| VaultError::invalid_encoding(format!("base64 decode: {e}")))
}

/// Intermediate base64 encoding.
///
/// A buffer shaped like `"!" || iv(16) || ciphertext` with at least one
/// ciphertext block becomes `"!" + b64(iv) + "|" + b64(ciphertext)`; anything
/// else is encoded as one opaque base64 string. The shape test is purely
/// `len % 16 == 1 && len >= 33` plus the leading sentinel.
pub fn encode_intermediate(data: &[u8]) -> String {
    let len = data.len();
    if len >= 1 + IV_SIZE * 2 && len % 16 == 1 && data[0] == CBC_SENTINEL {
        let (iv, rest) = data[1..].split_at(IV_SIZE);
        format!("!{}|{}", encode_base64(iv), encode_base64(rest))
    } else {
        encode_base64(data)
    }
}
