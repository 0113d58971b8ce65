//! AES-256 field ciphers: CBC and ECB, each in plain-byte and base64 form.
//!
//! Padding is handled here rather than by the block-mode crates so that the
//! unvalidated unpad in [`pkcs7_unpad`] applies to every decrypt path.

use aes::Aes256;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use lastvault_core::{VaultError, VaultResult};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

use crate::encoding::{decode_base64, encode_intermediate, pkcs7_pad, pkcs7_unpad};
use crate::{BLOCK_SIZE, CBC_SENTINEL, IV_SIZE, KEY_SIZE};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256EcbDec = ecb::Decryptor<Aes256>;

/// Length of `b64(iv)` in the intermediate form: 16 bytes → 24 chars.
const IV_BASE64_LEN: usize = 24;

/// Offset of `b64(ciphertext)`: after `"!"`, `b64(iv)` and `"|"`.
const CIPHERTEXT_BASE64_OFFSET: usize = 1 + IV_BASE64_LEN + 1;

fn check_key(key: &[u8]) -> VaultResult<()> {
    if key.len() != KEY_SIZE {
        return Err(VaultError::InvalidKeySize {
            size: key.len(),
            field: None,
        });
    }
    Ok(())
}

fn check_blocks(ciphertext: &[u8]) -> VaultResult<()> {
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(VaultError::invalid_encoding(format!(
            "ciphertext length {} is not a multiple of {BLOCK_SIZE}",
            ciphertext.len()
        )));
    }
    Ok(())
}

fn cbc_decrypt(iv: &[u8], ciphertext: &[u8], key: &[u8]) -> VaultResult<Vec<u8>> {
    check_blocks(ciphertext)?;
    let decryptor = Aes256CbcDec::new_from_slices(key, iv).map_err(|_| {
        VaultError::invalid_encoding(format!("IV must be {IV_SIZE} bytes, got {}", iv.len()))
    })?;
    if ciphertext.is_empty() {
        return Ok(Vec::new());
    }

    let mut buffer = ciphertext.to_vec();
    let plaintext = decryptor
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|_| VaultError::invalid_encoding("AES-CBC decrypt failed"))?;
    let plaintext = pkcs7_unpad(plaintext).to_vec();
    buffer.zeroize();
    Ok(plaintext)
}

fn ecb_decrypt(ciphertext: &[u8], key: &[u8]) -> VaultResult<Vec<u8>> {
    check_blocks(ciphertext)?;
    let decryptor = Aes256EcbDec::new_from_slice(key).map_err(|_| VaultError::InvalidKeySize {
        size: key.len(),
        field: None,
    })?;

    let mut buffer = ciphertext.to_vec();
    let plaintext = decryptor
        .decrypt_padded_mut::<NoPadding>(&mut buffer)
        .map_err(|_| VaultError::invalid_encoding("AES-ECB decrypt failed"))?;
    let plaintext = pkcs7_unpad(plaintext).to_vec();
    buffer.zeroize();
    Ok(plaintext)
}

/// Decrypt `iv(16) || ciphertext`.
pub fn decrypt_cbc_plain(data: &[u8], key: &[u8]) -> VaultResult<Vec<u8>> {
    check_key(key)?;
    if data.len() < IV_SIZE {
        return Err(VaultError::invalid_encoding(format!(
            "CBC input is {} bytes, shorter than the {IV_SIZE}-byte IV",
            data.len()
        )));
    }
    let (iv, ciphertext) = data.split_at(IV_SIZE);
    cbc_decrypt(iv, ciphertext, key)
}

/// Decrypt `"!" || b64(iv) || "|" || b64(ciphertext)`.
///
/// The halves are located by fixed offset: `b64(iv)` is always 24 characters.
pub fn decrypt_cbc_base64(data: &[u8], key: &[u8]) -> VaultResult<Vec<u8>> {
    check_key(key)?;
    if data.len() < CIPHERTEXT_BASE64_OFFSET {
        return Err(VaultError::invalid_encoding(format!(
            "CBC base64 input is {} bytes, shorter than its {CIPHERTEXT_BASE64_OFFSET}-byte header",
            data.len()
        )));
    }
    let iv = decode_base64(&data[1..1 + IV_BASE64_LEN])?;
    let ciphertext = decode_base64(&data[CIPHERTEXT_BASE64_OFFSET..])?;
    cbc_decrypt(&iv, &ciphertext, key)
}

/// Decrypt raw ECB blocks.
pub fn decrypt_ecb_plain(data: &[u8], key: &[u8]) -> VaultResult<Vec<u8>> {
    check_key(key)?;
    ecb_decrypt(data, key)
}

/// Decrypt base64-wrapped ECB blocks.
pub fn decrypt_ecb_base64(data: &[u8], key: &[u8]) -> VaultResult<Vec<u8>> {
    check_key(key)?;
    let ciphertext = decode_base64(data)?;
    ecb_decrypt(&ciphertext, key)
}

/// PKCS#7-pad and CBC-encrypt under an explicit IV. Returns the bare ciphertext.
pub fn encrypt_cbc_plain(plaintext: &[u8], iv: &[u8; IV_SIZE], key: &[u8]) -> VaultResult<Vec<u8>> {
    check_key(key)?;
    let encryptor = Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| {
        VaultError::InvalidKeySize {
            size: key.len(),
            field: None,
        }
    })?;

    let mut buffer = pkcs7_pad(plaintext, BLOCK_SIZE)?;
    let len = buffer.len();
    encryptor
        .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
        .map_err(|_| VaultError::invalid_encoding("AES-CBC encrypt failed"))?;
    Ok(buffer)
}

/// Encrypt for the wire with a fresh random IV: `"!" + b64(iv) + "|" + b64(ct)`.
pub fn encrypt_cbc_base64(plaintext: &[u8], key: &[u8]) -> VaultResult<String> {
    check_key(key)?;
    let iv = random_iv()?;
    encrypt_cbc_base64_with_iv(plaintext, &iv, key)
}

/// [`encrypt_cbc_base64`] with a caller-chosen IV.
pub fn encrypt_cbc_base64_with_iv(
    plaintext: &[u8],
    iv: &[u8; IV_SIZE],
    key: &[u8],
) -> VaultResult<String> {
    let ciphertext = encrypt_cbc_plain(plaintext, iv, key)?;

    let mut framed = Vec::with_capacity(1 + IV_SIZE + ciphertext.len());
    framed.push(CBC_SENTINEL);
    framed.extend_from_slice(iv);
    framed.extend_from_slice(&ciphertext);
    Ok(encode_intermediate(&framed))
}

/// 16 bytes from the OS CSPRNG. A short read is fatal.
fn random_iv() -> VaultResult<[u8; IV_SIZE]> {
    let mut iv = [0u8; IV_SIZE];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| VaultError::Randomness(format!("failed to generate IV: {e}")))?;
    Ok(iv)
}
