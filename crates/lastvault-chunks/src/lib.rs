//! lastvault-chunks: the vault blob container
//!
//! # Overview
//! - `chunk`: tagged, length-prefixed chunk stream (`tag || len || payload`)
//! - `account`: ACCT payload items → [`Account`](lastvault_core::Account)
//! - `blob`: a fetched blob plus the iteration count its key came from

pub mod account;
pub mod blob;
pub mod chunk;
mod reader;

// Convenience re-exports for the most common operations
pub use account::{encode_account, parse_account, parse_account_at};
pub use blob::VaultBlob;
pub use chunk::{extract_chunks, Chunk, ChunkReader, ChunkTag};
