use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

/// Every failure a vault operation can surface.
///
/// Authentication failures stay distinct so callers can prompt for a second
/// factor instead of rejecting outright. Codec failures carry the field or
/// byte offset that broke.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("second factor required: {0}")]
    SecondFactorRequired(String),

    #[error("second factor rejected: {0}")]
    SecondFactorRejected(String),

    #[error("hardware key restricted: {0}")]
    HardwareKeyRestricted(String),

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    /// Login failed with a cause outside the known set.
    #[error("login rejected ({cause}): {message}")]
    Rejected { cause: String, message: String },

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("malformed blob at offset {offset}: {reason}")]
    MalformedBlob { offset: usize, reason: String },

    #[error("unrecognized field encoding ({len} bytes){}", field_suffix(.field))]
    UnrecognizedFieldEncoding { len: usize, field: Option<String> },

    #[error("invalid key size {size}{}", field_suffix(.field))]
    InvalidKeySize { size: usize, field: Option<String> },

    #[error("invalid encoding: {reason}{}", field_suffix(.field))]
    InvalidEncoding { reason: String, field: Option<String> },

    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// The server answered a write without confirming it.
    #[error("write rejected: {0}")]
    WriteRejected(String),

    #[error("secure random source failed: {0}")]
    Randomness(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(name) => format!(" in field '{name}'"),
        None => String::new(),
    }
}

impl VaultError {
    pub fn invalid_encoding(reason: impl Into<String>) -> Self {
        VaultError::InvalidEncoding {
            reason: reason.into(),
            field: None,
        }
    }

    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        VaultError::MalformedBlob {
            offset,
            reason: reason.into(),
        }
    }

    /// Attach the name of the record field being processed.
    ///
    /// Only field-level codec errors carry a name; an existing name is kept so
    /// the innermost context wins.
    pub fn for_field(self, name: &str) -> Self {
        match self {
            VaultError::InvalidKeySize { size, field: None } => VaultError::InvalidKeySize {
                size,
                field: Some(name.to_string()),
            },
            VaultError::InvalidEncoding {
                reason,
                field: None,
            } => VaultError::InvalidEncoding {
                reason,
                field: Some(name.to_string()),
            },
            VaultError::UnrecognizedFieldEncoding { len, field: None } => {
                VaultError::UnrecognizedFieldEncoding {
                    len,
                    field: Some(name.to_string()),
                }
            }
            other => other,
        }
    }

    /// True for the login failures that a second-factor code can resolve.
    pub fn needs_second_factor(&self) -> bool {
        matches!(
            self,
            VaultError::SecondFactorRequired(_) | VaultError::SecondFactorRejected(_)
        )
    }
}
