//! Vault: an authenticated session plus record operations.

use lastvault_core::types::NEW_ACCOUNT_ID;
use lastvault_core::{Account, VaultError, VaultResult};
use lastvault_crypto::{encode_hex, encrypt_field, VaultKey};
use tokio_util::sync::CancellationToken;

use crate::response::parse_ack;
use crate::search::{Field, Query, SearchMethod};
use crate::session::{LoginRequest, Session};
use crate::transport::Transport;

/// Acknowledgement message for a successful delete.
const DELETED_MSG: &str = "accountdeleted";

/// Build the form for a create or update. Every text field but the id and
/// URL goes out CBC-encrypted in intermediate base64.
pub fn write_form(account: &Account, key: &VaultKey) -> VaultResult<Vec<(&'static str, String)>> {
    let encrypt =
        |value: &str, name: &str| encrypt_field(value, key).map_err(|e| e.for_field(name));

    Ok(vec![
        ("aid", account.id.clone()),
        ("url", encode_hex(account.url.as_bytes())),
        ("username", encrypt(&account.username, "username")?),
        ("password", encrypt(&account.password, "password")?),
        ("extra", encrypt(&account.notes, "notes")?),
        ("name", encrypt(&account.name, "name")?),
        ("grouping", encrypt(&account.group, "group")?),
        ("pwprotect", "off".into()),
        ("extjs", "1".into()),
        ("method", "cli".into()),
    ])
}

#[derive(Debug)]
pub struct Vault<T> {
    session: Session<T>,
    username: String,
}

impl<T: Transport> Vault<T> {
    /// Log in and confirm the credentials with one blob fetch.
    pub async fn open(
        transport: T,
        request: &LoginRequest,
        cancel: &CancellationToken,
    ) -> VaultResult<Self> {
        let session = Session::login(transport, request, cancel).await?;
        session.fetch_blob(cancel).await?;
        tracing::info!(username = %request.username, "vault opened");
        Ok(Self {
            session,
            username: request.username.clone(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    /// Fetch and decode every account.
    pub async fn accounts(&self, cancel: &CancellationToken) -> VaultResult<Vec<Account>> {
        let blob = self.session.fetch_blob(cancel).await?;
        blob.accounts(self.session.key())
    }

    /// Look up one account by id (case-insensitive).
    pub async fn account(&self, id: &str, cancel: &CancellationToken) -> VaultResult<Account> {
        self.search(id, Field::Id, SearchMethod::CaseInsensitive, cancel)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VaultError::RecordNotFound(id.to_string()))
    }

    pub async fn search(
        &self,
        value: &str,
        field: Field,
        method: SearchMethod,
        cancel: &CancellationToken,
    ) -> VaultResult<Vec<Account>> {
        let query = Query::new(value, field, method)?;
        let matches = query.filter(self.accounts(cancel).await?);
        tracing::debug!(?field, ?method, count = matches.len(), "search");
        Ok(matches)
    }

    /// Create an account. The returned copy carries the server-assigned id.
    pub async fn create(
        &self,
        mut account: Account,
        cancel: &CancellationToken,
    ) -> VaultResult<Account> {
        account.id = NEW_ACCOUNT_ID.to_string();
        let form = write_form(&account, self.session.key())?;
        let body = self.session.post_write(form, cancel).await?;

        let ack = parse_ack(&body)?;
        let aid = ack.aid.filter(|aid| aid != NEW_ACCOUNT_ID).ok_or_else(|| {
            VaultError::WriteRejected(format!(
                "create not acknowledged: {}",
                ack.msg.as_deref().unwrap_or("no account id returned")
            ))
        })?;
        tracing::info!(id = %aid, "account created");
        account.id = aid;
        Ok(account)
    }

    /// Overwrite an existing account in place.
    pub async fn update(&self, account: &Account, cancel: &CancellationToken) -> VaultResult<()> {
        if account.is_new() {
            return Err(VaultError::WriteRejected(
                "account has no server id; create it instead".into(),
            ));
        }
        let form = write_form(account, self.session.key())?;
        let body = self.session.post_write(form, cancel).await?;
        match parse_ack(&body) {
            Ok(ack) => tracing::debug!(
                id = %account.id,
                action = ?ack.action,
                msg = ?ack.msg,
                "update acknowledged"
            ),
            Err(e) => tracing::debug!(
                id = %account.id,
                error = %e,
                "update acknowledgement unreadable"
            ),
        }
        Ok(())
    }

    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> VaultResult<()> {
        let form = vec![
            ("extjs", "1".to_string()),
            ("delete", "1".to_string()),
            ("aid", id.to_string()),
        ];
        let body = self.session.post_write(form, cancel).await?;

        let ack = parse_ack(&body)?;
        if ack.msg.as_deref() != Some(DELETED_MSG) {
            return Err(VaultError::WriteRejected(format!(
                "delete of {id} not acknowledged: {}",
                ack.msg.as_deref().unwrap_or("no message")
            )));
        }
        tracing::info!(id, "account deleted");
        Ok(())
    }
}
