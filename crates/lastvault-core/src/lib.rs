//! lastvault-core: types shared by every lastvault crate
//!
//! - `error`: the closed [`VaultError`] taxonomy every fallible operation returns
//! - `config`: TOML configuration schema (`lastvault.toml`)
//! - `types`: decoded credential records

pub mod config;
pub mod error;
pub mod types;

pub use config::LastvaultConfig;
pub use error::{VaultError, VaultResult};
pub use types::Account;
