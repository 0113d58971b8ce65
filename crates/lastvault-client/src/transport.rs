//! Transport seam: form POST and query GET against the vault service.
//!
//! Cookie state lives inside the transport value. A [`Session`](crate::Session)
//! takes ownership of its transport once login succeeds, so cookies set during
//! login are replayed on every later call.

use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use lastvault_core::config::ServerConfig;
use lastvault_core::{VaultError, VaultResult};
use tokio_util::sync::CancellationToken;

/// Form fields or query parameters, in send order.
pub type Params = [(&'static str, String)];

/// Status code and raw body of one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `params` form-encoded to `path` (relative to the service base URL).
    async fn post_form(&self, path: &str, params: &Params) -> VaultResult<TransportResponse>;

    /// GET `path` with `params` as the query string.
    async fn get(&self, path: &str, params: &Params) -> VaultResult<TransportResponse>;
}

/// Run a transport call, aborting with [`VaultError::Cancelled`] if `cancel` fires first.
pub async fn with_cancel<T, F>(cancel: &CancellationToken, call: F) -> VaultResult<T>
where
    F: Future<Output = VaultResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(VaultError::Cancelled),
        result = call => result,
    }
}

/// HTTPS transport over a cookie-keeping `reqwest` client. No retries.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ServerConfig) -> VaultResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                VaultError::TransportFailure(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn finish(response: reqwest::Response) -> VaultResult<TransportResponse> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| VaultError::TransportFailure(format!("reading response body: {e}")))?;
        tracing::debug!(status, len = body.len(), "response received");
        Ok(TransportResponse::new(status, body.to_vec()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_form(&self, path: &str, params: &Params) -> VaultResult<TransportResponse> {
        tracing::debug!(path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .form(params)
            .send()
            .await
            .map_err(|e| VaultError::TransportFailure(format!("POST {path}: {e}")))?;
        Self::finish(response).await
    }

    async fn get(&self, path: &str, params: &Params) -> VaultResult<TransportResponse> {
        tracing::debug!(path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .query(params)
            .send()
            .await
            .map_err(|e| VaultError::TransportFailure(format!("GET {path}: {e}")))?;
        Self::finish(response).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> HttpTransport {
        HttpTransport::new(&ServerConfig {
            base_url: server.uri(),
            allow_insecure: true,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_plain_http_without_opt_in() {
        let err = HttpTransport::new(&ServerConfig {
            base_url: "http://127.0.0.1:1".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, VaultError::Config(_)));
    }

    #[test]
    fn url_joins_without_double_slash() {
        let transport = HttpTransport::new(&ServerConfig {
            base_url: "https://vault.example.com/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(transport.url("login.php"), "https://vault.example.com/login.php");
        assert_eq!(transport.url("/login.php"), "https://vault.example.com/login.php");
    }

    #[tokio::test]
    async fn post_form_sends_urlencoded_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/iterations.php"))
            .and(body_string_contains("email=alice%40example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_string("5000"))
            .expect(1)
            .mount(&server)
            .await;

        let response = transport_for(&server)
            .post_form("iterations.php", &[("email", "alice@example.com".into())])
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.text(), "5000");
    }

    #[tokio::test]
    async fn get_sends_query_and_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getaccts.php"))
            .and(query_param("b64", "1"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let response = transport_for(&server)
            .get("getaccts.php", &[("b64", "1".into())])
            .await
            .unwrap();
        assert_eq!(response.status, 403);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn cookies_persist_across_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login.php"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("set-cookie", "PHPSESSID=abc123; Path=/"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/getaccts.php"))
            .and(wiremock::matchers::header("cookie", "PHPSESSID=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        transport.post_form("login.php", &[]).await.unwrap();
        let response = transport.get("getaccts.php", &[]).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn connection_failure_is_transport_failure() {
        let transport = HttpTransport::new(&ServerConfig {
            base_url: "http://127.0.0.1:9".into(),
            allow_insecure: true,
            timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();
        let err = transport.get("getaccts.php", &[]).await.unwrap_err();
        assert!(matches!(err, VaultError::TransportFailure(_)));
    }

    #[test]
    fn cancel_wins_over_pending_call() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let transport = scripted::PendingTransport;
        let err = tokio_test::block_on(with_cancel(&cancel, transport.get("getaccts.php", &[])))
            .unwrap_err();
        assert!(matches!(err, VaultError::Cancelled));
    }

    #[test]
    fn completed_call_passes_through() {
        let transport = scripted::ScriptedTransport::new().respond(200, "1");
        let response = tokio_test::block_on(with_cancel(
            &CancellationToken::new(),
            transport.post_form("iterations.php", &[]),
        ))
        .unwrap();
        assert_eq!(response, TransportResponse::new(200, "1"));
    }
}
