//! ACCT payload decoding
//!
//! An account payload is a run of length-prefixed items in fixed order:
//! id, name, group, url (hex), notes, favorite, shared, username, password.
//! Anything after the password is ignored.

use lastvault_core::{Account, VaultError, VaultResult};
use lastvault_crypto::{decode_hex, decrypt_field, VaultKey};

use crate::reader::ByteReader;

struct ItemReader<'a> {
    inner: ByteReader<'a>,
}

impl<'a> ItemReader<'a> {
    fn new(payload: &'a [u8], base: usize) -> Self {
        Self {
            inner: ByteReader::with_base(payload, base),
        }
    }

    fn plain(&mut self, name: &str) -> VaultResult<String> {
        let item = self.inner.read_prefixed(name)?;
        Ok(String::from_utf8_lossy(item).into_owned())
    }

    fn encrypted(&mut self, name: &str, key: &VaultKey) -> VaultResult<String> {
        let item = self.inner.read_prefixed(name)?;
        decrypt_field(item, key).map_err(|e| e.for_field(name))
    }

    fn hex(&mut self, name: &str) -> VaultResult<String> {
        let item = self.inner.read_prefixed(name)?;
        let bytes = decode_hex(item).map_err(|e| e.for_field(name))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn skip(&mut self, name: &str) -> VaultResult<()> {
        self.inner.skip_prefixed(name)
    }
}

/// Decode one account record. The first failing item aborts the record.
pub fn parse_account(payload: &[u8], key: &VaultKey) -> VaultResult<Account> {
    parse_account_at(payload, 0, key)
}

/// [`parse_account`] for a payload found at `offset` within a blob, so
/// truncation errors report blob positions.
pub fn parse_account_at(payload: &[u8], offset: usize, key: &VaultKey) -> VaultResult<Account> {
    let mut items = ItemReader::new(payload, offset);

    let id = items.plain("id")?;
    let name = items.encrypted("name", key)?;
    let group = items.encrypted("group", key)?;
    let url = items.hex("url")?;
    let notes = items.encrypted("notes", key)?;
    items.skip("favorite")?;
    items.skip("shared")?;
    let username = items.encrypted("username", key)?;
    let password = items.encrypted("password", key)?;

    tracing::trace!(%id, "decoded account");
    Ok(Account {
        id,
        name,
        username,
        password,
        url,
        group,
        notes,
    })
}

/// Encode an account payload in the layout [`parse_account`] reads, with
/// every encrypted item in CBC intermediate base64.
pub fn encode_account(account: &Account, key: &VaultKey) -> VaultResult<Vec<u8>> {
    fn push(out: &mut Vec<u8>, item: &[u8]) -> VaultResult<()> {
        let len = u32::try_from(item.len())
            .map_err(|_| VaultError::invalid_encoding("item longer than 4 GiB"))?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(item);
        Ok(())
    }
    fn encrypt(plaintext: &str, name: &str, key: &VaultKey) -> VaultResult<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }
        lastvault_crypto::encrypt_field(plaintext, key).map_err(|e| e.for_field(name))
    }

    let mut out = Vec::new();
    push(&mut out, account.id.as_bytes())?;
    push(&mut out, encrypt(&account.name, "name", key)?.as_bytes())?;
    push(&mut out, encrypt(&account.group, "group", key)?.as_bytes())?;
    push(&mut out, lastvault_crypto::encode_hex(account.url.as_bytes()).as_bytes())?;
    push(&mut out, encrypt(&account.notes, "notes", key)?.as_bytes())?;
    push(&mut out, b"0")?;
    push(&mut out, b"0")?;
    push(&mut out, encrypt(&account.username, "username", key)?.as_bytes())?;
    push(&mut out, encrypt(&account.password, "password", key)?.as_bytes())?;
    Ok(out)
}
