//! Login and the authenticated session.
//!
//! ```text
//! NotStarted → IterationsRequested → KeyDerived → LoginSubmitted → Authenticated
//!                                                               ↘ Rejected
//! ```
//!
//! Linear, no retries. The session owns its transport so cookie state from the
//! login is replayed on every later request.

use lastvault_chunks::VaultBlob;
use lastvault_core::{VaultError, VaultResult};
use lastvault_crypto::{derive_key, login_hash_from_key, VaultKey};
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;

use crate::response::{login_error, parse_login, LoginOutcome};
use crate::transport::{with_cancel, Transport, TransportResponse};

pub const ITERATIONS_PATH: &str = "iterations.php";
pub const LOGIN_PATH: &str = "login.php";
pub const FETCH_PATH: &str = "getaccts.php";
pub const WRITE_PATH: &str = "show_website.php";

/// Credentials for one login attempt.
pub struct LoginRequest {
    pub username: String,
    pub password: SecretString,
    /// One-time code for accounts with a second factor
    pub second_factor: Option<String>,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            second_factor: None,
        }
    }

    pub fn with_second_factor(mut self, code: impl Into<String>) -> Self {
        self.second_factor = Some(code.into());
        self
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("second_factor", &self.second_factor.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    NotStarted,
    IterationsRequested,
    KeyDerived,
    LoginSubmitted,
    Authenticated,
    Rejected,
}

fn enter(state: LoginState, username: &str) {
    tracing::debug!(?state, username, "login state");
}

fn require_success(response: &TransportResponse, what: &str) -> VaultResult<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(VaultError::TransportFailure(format!(
            "{what} returned HTTP {}",
            response.status
        )))
    }
}

/// Ask the service how many PBKDF2 rounds this account uses.
pub async fn request_iterations<T: Transport + ?Sized>(
    transport: &T,
    username: &str,
    cancel: &CancellationToken,
) -> VaultResult<u32> {
    let response = with_cancel(
        cancel,
        transport.post_form(ITERATIONS_PATH, &[("email", username.to_string())]),
    )
    .await?;
    require_success(&response, "iteration request")?;

    let text = response.text();
    match text.trim().parse::<u32>() {
        Ok(0) => Err(VaultError::TransportFailure(
            "server returned an iteration count of 0".into(),
        )),
        Ok(count) => Ok(count),
        Err(_) => Err(VaultError::TransportFailure(format!(
            "iteration count is not a number: '{}'",
            text.trim()
        ))),
    }
}

/// An authenticated session. Immutable once created.
pub struct Session<T> {
    id: String,
    token: SecretString,
    iterations: u32,
    key: VaultKey,
    transport: T,
}

impl<T> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &"[REDACTED]")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Session<T> {
    /// Run the login state machine to completion.
    pub async fn login(
        transport: T,
        request: &LoginRequest,
        cancel: &CancellationToken,
    ) -> VaultResult<Self> {
        let username = request.username.as_str();
        enter(LoginState::NotStarted, username);

        let iterations = request_iterations(&transport, username, cancel).await?;
        enter(LoginState::IterationsRequested, username);

        let key = derive_key(username, &request.password, iterations);
        let hash = login_hash_from_key(&key, &request.password, iterations);
        enter(LoginState::KeyDerived, username);

        let mut form = vec![
            ("method", "mobile".to_string()),
            ("web", "1".to_string()),
            ("xml", "1".to_string()),
            ("username", username.to_string()),
            ("hash", hash),
            ("iterations", iterations.to_string()),
        ];
        if let Some(code) = &request.second_factor {
            form.push(("otp", code.clone()));
        }

        let response = with_cancel(cancel, transport.post_form(LOGIN_PATH, &form)).await?;
        enter(LoginState::LoginSubmitted, username);
        require_success(&response, "login")?;

        match parse_login(&response.text())? {
            LoginOutcome::Authenticated { session_id, token } => {
                enter(LoginState::Authenticated, username);
                tracing::info!(username, iterations, "logged in");
                Ok(Self {
                    id: session_id,
                    token: SecretString::from(token),
                    iterations,
                    key,
                    transport,
                })
            }
            LoginOutcome::Failed { cause, message } => {
                enter(LoginState::Rejected, username);
                Err(login_error(&cause, &message))
            }
        }
    }

    /// Fetch the encrypted vault blob.
    ///
    /// HTTP 403 here is the authoritative invalid-credentials signal: the
    /// login endpoint can hand out a session for a wrong password.
    pub async fn fetch_blob(&self, cancel: &CancellationToken) -> VaultResult<VaultBlob> {
        let query = [
            ("mobile", "1".to_string()),
            ("b64", "1".to_string()),
            ("hash", "0.0".to_string()),
            ("PHPSESSID", self.id.clone()),
        ];
        let response = with_cancel(cancel, self.transport.get(FETCH_PATH, &query)).await?;
        if response.status == 403 {
            return Err(VaultError::InvalidCredentials);
        }
        require_success(&response, "blob fetch")?;

        let blob = VaultBlob::from_base64(&response.text(), self.iterations)?;
        tracing::info!(bytes = blob.bytes().len(), "fetched vault blob");
        Ok(blob)
    }

    /// POST a write form with the session token appended. Returns the body.
    pub async fn post_write(
        &self,
        mut form: Vec<(&'static str, String)>,
        cancel: &CancellationToken,
    ) -> VaultResult<String> {
        form.push(("token", self.token.expose_secret().to_string()));
        let response = with_cancel(cancel, self.transport.post_form(WRITE_PATH, &form)).await?;
        require_success(&response, "write")?;
        Ok(response.text().into_owned())
    }
}

impl<T> Session<T> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn key(&self) -> &VaultKey {
        &self.key
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::scripted::{PendingTransport, ScriptedTransport};
    use lastvault_crypto::{derive_login_hash, encode_hex};

    fn request() -> LoginRequest {
        LoginRequest::new("username", SecretString::from("password"))
    }

    const OK_LOGIN: &str = r#"<ok sessionid="sess-1" token="tok-1"/>"#;

    #[tokio::test]
    async fn iterations_parse_trims() {
        let transport = ScriptedTransport::new().respond(200, "100100\n");
        let count = request_iterations(&transport, "alice", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(count, 100100);

        let sent = &transport.requests()[0];
        assert_eq!(sent.path, ITERATIONS_PATH);
        assert_eq!(sent.param("email"), Some("alice"));
    }

    #[tokio::test]
    async fn iterations_reject_zero_and_garbage() {
        for body in ["0", "lots", ""] {
            let transport = ScriptedTransport::new().respond(200, body);
            let err = request_iterations(&transport, "alice", &CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, VaultError::TransportFailure(_)), "{body:?}");
        }
    }

    #[tokio::test]
    async fn iterations_transport_error_surfaces_as_is() {
        let transport =
            ScriptedTransport::new().fail(VaultError::TransportFailure("connection reset".into()));
        let err = request_iterations(&transport, "alice", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "transport failure: connection reset");
    }

    #[tokio::test]
    async fn login_sends_hash_and_keeps_session() {
        let transport = ScriptedTransport::new()
            .respond(200, "1")
            .respond(200, OK_LOGIN);

        let session = Session::login(transport, &request(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(session.id(), "sess-1");
        assert_eq!(session.iterations(), 1);
        assert_eq!(
            encode_hex(session.key().as_bytes()),
            "bed92542da740cbe587ac45b7901207a17a2563680b2ceda304195a2733f14be"
        );

        let requests = session.transport().requests();
        assert_eq!(requests.len(), 2);
        let login = &requests[1];
        assert_eq!(login.path, LOGIN_PATH);
        assert_eq!(login.param("method"), Some("mobile"));
        assert_eq!(login.param("web"), Some("1"));
        assert_eq!(login.param("xml"), Some("1"));
        assert_eq!(login.param("iterations"), Some("1"));
        assert_eq!(
            login.param("hash"),
            Some("e379d972c3eb59579abe3864d850b5f54911544adfa2daf9fb53c05d30cdc985")
        );
        assert_eq!(login.param("otp"), None);
    }

    #[tokio::test]
    async fn login_forwards_second_factor() {
        let transport = ScriptedTransport::new()
            .respond(200, "2")
            .respond(200, OK_LOGIN);

        let session = Session::login(
            transport,
            &request().with_second_factor("123456"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let login = &session.transport().requests()[1];
        assert_eq!(login.param("otp"), Some("123456"));
        assert_eq!(
            login.param("hash").map(str::to_string),
            Some(derive_login_hash("username", &SecretString::from("password"), 2))
        );
    }

    #[tokio::test]
    async fn login_maps_failure_cause() {
        let transport = ScriptedTransport::new().respond(200, "5000").respond(
            200,
            r#"<response><error message="Multifactor authentication required" cause="otprequired"/></response>"#,
        );
        let err = Session::login(transport, &request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.needs_second_factor());
        assert!(matches!(err, VaultError::SecondFactorRequired(_)));
    }

    #[tokio::test]
    async fn login_http_error_is_transport_failure() {
        let transport = ScriptedTransport::new().respond(200, "1").respond(502, "bad gateway");
        let err = Session::login(transport, &request(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::TransportFailure(_)));
    }

    #[tokio::test]
    async fn login_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = Session::login(PendingTransport, &request(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Cancelled));
    }

    async fn logged_in(transport: ScriptedTransport) -> Session<ScriptedTransport> {
        Session::login(transport, &request(), &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn fetch_forbidden_is_invalid_credentials() {
        let session = logged_in(
            ScriptedTransport::new()
                .respond(200, "1")
                .respond(200, OK_LOGIN)
                .respond(403, ""),
        )
        .await;
        let err = session.fetch_blob(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidCredentials));
    }

    #[tokio::test]
    async fn fetch_sends_session_id_and_tags_iterations() {
        let session = logged_in(
            ScriptedTransport::new()
                .respond(200, "1")
                .respond(200, OK_LOGIN)
                .respond(200, "TFBBVgAAAAMxMzg=\n"),
        )
        .await;
        let blob = session.fetch_blob(&CancellationToken::new()).await.unwrap();
        assert_eq!(blob.key_iterations(), 1);
        assert_eq!(blob.version().unwrap().as_deref(), Some("138"));

        let fetch = &session.transport().requests()[2];
        assert_eq!(fetch.method, "GET");
        assert_eq!(fetch.path, FETCH_PATH);
        assert_eq!(fetch.param("PHPSESSID"), Some("sess-1"));
        assert_eq!(fetch.param("b64"), Some("1"));
        assert_eq!(fetch.param("hash"), Some("0.0"));
    }

    #[tokio::test]
    async fn write_appends_token() {
        let session = logged_in(
            ScriptedTransport::new()
                .respond(200, "1")
                .respond(200, OK_LOGIN)
                .respond(200, "<xmlresponse/>"),
        )
        .await;
        let body = session
            .post_write(vec![("aid", "7".into())], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, "<xmlresponse/>");

        let write = &session.transport().requests()[2];
        assert_eq!(write.path, WRITE_PATH);
        assert_eq!(write.param("token"), Some("tok-1"));
    }

    #[test]
    fn debug_hides_secrets() {
        let request = LoginRequest::new("alice", SecretString::from("hunter2"))
            .with_second_factor("999999");
        let shown = format!("{request:?}");
        assert!(shown.contains("alice"));
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("999999"));
    }
}
