//! Tagged chunk stream
//!
//! A blob is a flat sequence of `tag(4) || len(4, big-endian) || payload(len)`.
//! End of buffer ends the stream; a length running past the buffer is fatal.

use std::collections::HashMap;

use lastvault_core::VaultResult;

use crate::reader::ByteReader;

/// A chunk tag: four ASCII characters packed big-endian into a `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkTag(pub u32);

impl ChunkTag {
    /// Account record
    pub const ACCT: ChunkTag = ChunkTag::from_mnemonic(b"ACCT");
    /// Blob format version
    pub const LPAV: ChunkTag = ChunkTag::from_mnemonic(b"LPAV");
    /// Encrypted username
    pub const ENCU: ChunkTag = ChunkTag::from_mnemonic(b"ENCU");
    /// End marker
    pub const ENDM: ChunkTag = ChunkTag::from_mnemonic(b"ENDM");

    pub const fn from_mnemonic(mnemonic: &[u8; 4]) -> Self {
        ChunkTag(u32::from_be_bytes(*mnemonic))
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl std::fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self.to_bytes();
        if bytes.iter().all(u8::is_ascii_graphic) {
            bytes.iter().try_for_each(|&b| write!(f, "{}", b as char))
        } else {
            write!(f, "{:#010x}", self.0)
        }
    }
}

/// One chunk borrowed from the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub tag: ChunkTag,
    /// Absolute offset of the payload within the blob
    pub offset: usize,
    pub payload: &'a [u8],
}

/// Sequential reader over a chunk stream.
///
/// Once the stream has ended or failed, every later read returns `Ok(None)`.
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    inner: ByteReader<'a>,
    done: bool,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: ByteReader::new(data),
            done: false,
        }
    }

    /// Read the next chunk, or `None` at end of buffer.
    pub fn next_chunk(&mut self) -> VaultResult<Option<Chunk<'a>>> {
        if self.done {
            return Ok(None);
        }
        let next = self.read_chunk();
        if !matches!(next, Ok(Some(_))) {
            self.done = true;
        }
        next
    }

    fn read_chunk(&mut self) -> VaultResult<Option<Chunk<'a>>> {
        if self.inner.is_empty() {
            return Ok(None);
        }
        let tag = ChunkTag(self.inner.read_u32_be("chunk tag")?);
        let len = self.inner.read_u32_be("chunk length")? as usize;
        let offset = self.inner.offset();
        let payload = self.inner.take(len, &format!("{tag} chunk payload"))?;
        Ok(Some(Chunk {
            tag,
            offset,
            payload,
        }))
    }

    /// Advance past the next chunk, returning its tag. Consumes exactly the
    /// bytes [`next_chunk`](Self::next_chunk) would.
    pub fn skip_chunk(&mut self) -> VaultResult<Option<ChunkTag>> {
        Ok(self.next_chunk()?.map(|chunk| chunk.tag))
    }

    /// Peek at the tag of the next chunk without consuming it.
    pub fn peek_tag(&self) -> Option<ChunkTag> {
        if self.done {
            return None;
        }
        let mut probe = self.inner.clone();
        probe.read_u32_be("chunk tag").ok().map(ChunkTag)
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = VaultResult<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

impl std::iter::FusedIterator for ChunkReader<'_> {}

/// Group chunk payloads by tag, preserving order of appearance per tag.
///
/// With a filter, only the listed tags are kept; every other chunk is still
/// consumed so the cursor stays aligned.
pub fn extract_chunks<'a>(
    data: &'a [u8],
    filter: Option<&[ChunkTag]>,
) -> VaultResult<HashMap<ChunkTag, Vec<&'a [u8]>>> {
    let mut reader = ChunkReader::new(data);
    let mut chunks: HashMap<ChunkTag, Vec<&'a [u8]>> = HashMap::new();

    while let Some(tag) = reader.peek_tag() {
        let wanted = filter.map_or(true, |tags| tags.contains(&tag));
        if !wanted {
            reader.skip_chunk()?;
            continue;
        }
        if let Some(chunk) = reader.next_chunk()? {
            chunks.entry(chunk.tag).or_default().push(chunk.payload);
        }
    }

    // a trailing fragment shorter than a tag is still a truncated chunk
    reader.next_chunk()?;

    tracing::debug!(
        tags = chunks.len(),
        total = chunks.values().map(Vec::len).sum::<usize>(),
        "extracted chunks"
    );
    Ok(chunks)
}
