//! Cursor over a byte buffer with big-endian length-prefixed reads.
//!
//! Offsets in errors are absolute within the buffer the reader was built on
//! plus `base`, so a reader over one chunk payload still reports positions in
//! the whole blob.

use lastvault_core::{VaultError, VaultResult};

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// A reader whose reported offsets start at `base`.
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Absolute offset of the cursor.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Take exactly `len` bytes.
    pub fn take(&mut self, len: usize, what: &str) -> VaultResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(VaultError::malformed(
                self.offset(),
                format!(
                    "{what} needs {len} bytes but only {} remain",
                    self.remaining()
                ),
            ));
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self, what: &str) -> VaultResult<[u8; N]> {
        let bytes = self.take(N, what)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u32_be(&mut self, what: &str) -> VaultResult<u32> {
        Ok(u32::from_be_bytes(self.read_array(what)?))
    }

    /// Read a 4-byte big-endian length followed by that many bytes.
    pub fn read_prefixed(&mut self, what: &str) -> VaultResult<&'a [u8]> {
        let len = self.read_u32_be(what)? as usize;
        self.take(len, what)
    }

    /// Advance past a length-prefixed item without returning it.
    pub fn skip_prefixed(&mut self, what: &str) -> VaultResult<()> {
        self.read_prefixed(what).map(|_| ())
    }
}
