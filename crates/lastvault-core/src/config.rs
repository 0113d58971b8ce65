use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// Top-level client configuration (loaded from lastvault.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LastvaultConfig {
    pub server: ServerConfig,
    pub account: AccountConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Vault service base URL (default: https://lastpass.com)
    pub base_url: String,
    /// Per-request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Permit a plaintext http:// base URL (local test servers only)
    pub allow_insecure: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Username used when none is given on the command line
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://lastpass.com".into(),
            timeout_secs: 30,
            user_agent: concat!("lastvault/", env!("CARGO_PKG_VERSION")).into(),
            allow_insecure: false,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Reject plaintext base URLs unless `allow_insecure` is set.
    ///
    /// Login hashes and session cookies travel over this connection, so an
    /// http:// endpoint is only tolerated for local test servers.
    pub fn validate(&self) -> VaultResult<()> {
        if self.base_url.starts_with("http://") {
            if !self.allow_insecure {
                return Err(VaultError::Config(format!(
                    "server base_url uses plaintext HTTP ({}), but allow_insecure is disabled. \
                     Use an HTTPS endpoint or set server.allow_insecure = true for local testing.",
                    self.base_url
                )));
            }
            tracing::warn!(
                base_url = %self.base_url,
                "server base_url uses plaintext HTTP; login hashes are transmitted unencrypted"
            );
        } else if !self.base_url.starts_with("https://") {
            return Err(VaultError::Config(format!(
                "server base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(VaultError::Config("server timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

impl LastvaultConfig {
    /// Parse a TOML document, filling every missing key with its default.
    pub fn from_toml(content: &str) -> VaultResult<Self> {
        toml::from_str(content).map_err(|e| VaultError::Config(format!("parsing config: {e}")))
    }

    /// Read and parse a config file from disk.
    pub fn load(path: &std::path::Path) -> VaultResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| VaultError::Config(format!("{}: {e}", path.display())))
    }
}
