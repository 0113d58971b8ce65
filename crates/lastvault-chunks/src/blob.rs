//! Fetched vault blob

use std::collections::HashMap;

use lastvault_core::{Account, VaultError, VaultResult};
use lastvault_crypto::{decode_base64, decrypt_field, VaultKey};
use rayon::prelude::*;

use crate::account::parse_account_at;
use crate::chunk::{extract_chunks, ChunkReader, ChunkTag};

/// The decoded chunk container from one fetch, tagged with the iteration
/// count whose key it was fetched under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultBlob {
    bytes: Vec<u8>,
    key_iterations: u32,
}

impl VaultBlob {
    pub fn new(bytes: Vec<u8>, key_iterations: u32) -> Self {
        Self {
            bytes,
            key_iterations,
        }
    }

    /// Decode the base64 document the service returns. Surrounding
    /// whitespace is ignored.
    pub fn from_base64(text: &str, key_iterations: u32) -> VaultResult<Self> {
        let bytes = decode_base64(text.trim())
            .map_err(|e| VaultError::TransportFailure(format!("blob is not base64: {e}")))?;
        Ok(Self::new(bytes, key_iterations))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn key_iterations(&self) -> u32 {
        self.key_iterations
    }

    pub fn chunks(
        &self,
        filter: Option<&[ChunkTag]>,
    ) -> VaultResult<HashMap<ChunkTag, Vec<&[u8]>>> {
        extract_chunks(&self.bytes, filter)
    }

    /// Blob format version from the LPAV chunk, if present.
    pub fn version(&self) -> VaultResult<Option<String>> {
        for chunk in ChunkReader::new(&self.bytes) {
            let chunk = chunk?;
            if chunk.tag == ChunkTag::LPAV {
                return Ok(Some(String::from_utf8_lossy(chunk.payload).into_owned()));
            }
        }
        Ok(None)
    }

    /// The account name the blob was encrypted for, from the ENCU chunk.
    pub fn encrypted_username(&self, key: &VaultKey) -> VaultResult<Option<String>> {
        for chunk in ChunkReader::new(&self.bytes) {
            let chunk = chunk?;
            if chunk.tag == ChunkTag::ENCU {
                return decrypt_field(chunk.payload, key)
                    .map(Some)
                    .map_err(|e| e.for_field("ENCU"));
            }
        }
        Ok(None)
    }

    /// Decode every account record, in blob order.
    ///
    /// Records decode in parallel; any failing record fails the whole call.
    pub fn accounts(&self, key: &VaultKey) -> VaultResult<Vec<Account>> {
        let records: Vec<(usize, &[u8])> = ChunkReader::new(&self.bytes)
            .filter_map(|chunk| match chunk {
                Ok(chunk) if chunk.tag == ChunkTag::ACCT => Some(Ok((chunk.offset, chunk.payload))),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
            .collect::<VaultResult<_>>()?;

        let accounts = records
            .par_iter()
            .map(|&(offset, payload)| parse_account_at(payload, offset, key))
            .collect::<VaultResult<Vec<_>>>()?;

        tracing::debug!(count = accounts.len(), "decoded accounts");
        Ok(accounts)
    }
}
