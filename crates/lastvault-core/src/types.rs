use serde::{Deserialize, Serialize};

/// Identifier sent when creating a record; the server answers with the real one.
pub const NEW_ACCOUNT_ID: &str = "0";

/// A decoded credential record.
///
/// Plain values only: records keep no reference to the session that decoded
/// them. The URL is hex on the wire and plaintext here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub username: String,
    pub password: String,
    pub url: String,
    pub group: String,
    pub notes: String,
}

impl Account {
    /// True until the server has assigned an identifier.
    pub fn is_new(&self) -> bool {
        self.id.is_empty() || self.id == NEW_ACCOUNT_ID
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Id: {}, Name: {}, Username: {}",
            self.id, self.name, self.username
        )
    }
}
