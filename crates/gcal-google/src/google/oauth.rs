//! OAuth 2.0 PKCE flow for Google APIs.
//!
//! Implements the authorization-code flow with PKCE (RFC 7636) and a
//! loopback redirect, as Google recommends for desktop applications.
//!
//! # Flow Overview
//!
//! 1. Generate a code verifier, its SHA-256 challenge and a random state
//! 2. Bind a [`LoopbackListener`] on `127.0.0.1`
//! 3. Open the user's browser to Google's consent page
//! 4. Google redirects to the listener with the authorization code
//! 5. Check the state and exchange the code (with verifier) for tokens
//!
//! The listener is consumed by [`LoopbackListener::wait_for_callback`], so
//! the port is released however the wait ends: callback, timeout, Ctrl-C or
//! error.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

use super::config::GoogleConfig;
use super::tokens::TokenInfo;

/// The PKCE code verifier length (in bytes, before base64 encoding).
const CODE_VERIFIER_LENGTH: usize = 32;

/// Path Google redirects to on the loopback listener.
const CALLBACK_PATH: &str = "/callback";

/// How long one loopback connection may take to send its request.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on header lines read from a browser request.
const MAX_HEADER_LINES: usize = 100;

const SUCCESS_PAGE: &str = "<html><body><h1>Authorization successful</h1>\
    <p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "<html><body><h1>Authorization failed</h1>\
    <p>You can close this window and check the terminal.</p></body></html>";

/// Response from Google's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Space-separated granted scopes.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Returns the granted scopes, falling back to `requested` when the
    /// endpoint does not report them.
    pub fn granted_scopes(&self, requested: &[String]) -> Vec<String> {
        match self.scope.as_deref() {
            Some(scope) if !scope.trim().is_empty() => {
                scope.split_whitespace().map(str::to_string).collect()
            }
            _ => requested.to_vec(),
        }
    }
}

/// Error body returned by the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Result of a refresh attempt that reached the token endpoint.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// A new access token was issued.
    Refreshed(TokenResponse),
    /// Google rejected the refresh token (`invalid_grant`): it was revoked
    /// or expired, and only a new consent can fix it.
    Revoked(String),
}

/// OAuth client for Google APIs.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: GoogleConfig,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a new OAuth client from the provider configuration.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        let http_client = config.http_client()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Returns the scopes this client requests.
    pub fn scopes(&self) -> &[String] {
        &self.config.scopes
    }

    /// Runs the interactive consent flow and returns the obtained tokens.
    ///
    /// # Errors
    ///
    /// - configuration error if no loopback port can be bound
    /// - authentication error if the user denies access, the state does not
    ///   match, the wait times out or is cancelled, or the code exchange is
    ///   rejected
    pub async fn authorize(&self) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();
        let listener = LoopbackListener::bind(self.config.loopback_port_range).await?;
        let redirect_uri = listener.redirect_uri();

        let auth_url = pkce.build_auth_url(
            &self.config.auth_url,
            &self.config.credentials.client_id,
            &redirect_uri,
            &self.config.scopes,
        )?;

        info!("starting OAuth flow, opening browser");
        debug!("authorization URL: {}", auth_url);

        if let Err(e) = open::that(auth_url.as_str()) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n\n{}\n", auth_url);
        } else {
            eprintln!("Waiting for authorization in your browser...");
        }

        let callback = listener.wait_for_callback(self.config.auth_timeout).await?;

        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch; the redirect did not come from this login attempt",
            ));
        }

        info!("received authorization code, exchanging for tokens");
        self.exchange_code(&callback.code, &pkce.verifier, &redirect_uri)
            .await
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> ProviderResult<TokenInfo> {
        let params = [
            ("client_id", self.config.credentials.client_id.as_str()),
            ("client_secret", self.config.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let (status, body) = self.post_token(&params).await?;
        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "token exchange failed ({}): {}",
                status,
                describe_token_error(&body)
            ))
            .with_status(status.as_u16()));
        }

        let response = parse_token_response(&body)?;
        if response.refresh_token.is_none() {
            warn!("token endpoint did not return a refresh token");
        }

        info!("successfully obtained tokens");
        let scopes = response.granted_scopes(&self.config.scopes);
        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes,
        ))
    }

    /// Asks the token endpoint for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<RefreshOutcome> {
        let params = [
            ("client_id", self.config.credentials.client_id.as_str()),
            ("client_secret", self.config.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let (status, body) = self.post_token(&params).await?;
        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(&body)
                && err.error == "invalid_grant"
            {
                warn!("refresh token rejected: {:?}", err.error_description);
                return Ok(RefreshOutcome::Revoked(
                    err.error_description.unwrap_or(err.error),
                ));
            }
            return Err(ProviderError::authentication(format!(
                "token refresh failed ({}): {}",
                status,
                describe_token_error(&body)
            ))
            .with_status(status.as_u16()));
        }

        info!("successfully refreshed access token");
        parse_token_response(&body).map(RefreshOutcome::Refreshed)
    }

    async fn post_token(
        &self,
        params: &[(&str, &str)],
    ) -> ProviderResult<(reqwest::StatusCode, String)> {
        debug!("POST {}", self.config.token_url);
        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

fn parse_token_response(body: &str) -> ProviderResult<TokenResponse> {
    serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("invalid token response: {}", e)).with_source(e)
    })
}

fn describe_token_error(body: &str) -> String {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(err) => match err.error_description {
            Some(description) => format!("{}: {}", err.error, description),
            None => err.error,
        },
        Err(_) => body.trim().to_string(),
    }
}

/// Parameters Google appends to the redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

/// Loopback HTTP listener that receives the OAuth redirect.
#[derive(Debug)]
pub struct LoopbackListener {
    listener: TcpListener,
    port: u16,
}

impl LoopbackListener {
    /// Binds on `127.0.0.1`, trying each port of the range in order.
    ///
    /// Port `0` asks the OS for any free port.
    pub async fn bind(port_range: (u16, u16)) -> ProviderResult<Self> {
        for port in port_range.0..=port_range.1 {
            match TcpListener::bind(("127.0.0.1", port)).await {
                Ok(listener) => {
                    let port = listener.local_addr().map(|a| a.port()).map_err(|e| {
                        ProviderError::configuration(format!(
                            "failed to read loopback address: {}",
                            e
                        ))
                        .with_source(e)
                    })?;
                    debug!("bound loopback server on port {}", port);
                    return Ok(Self { listener, port });
                }
                Err(e) => debug!("port {} unavailable: {}", port, e),
            }
        }
        Err(ProviderError::configuration(format!(
            "no available loopback port in range {}-{}",
            port_range.0, port_range.1
        )))
    }

    /// Returns the bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the redirect URI registered with the authorization request.
    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, CALLBACK_PATH)
    }

    /// Serves requests until the OAuth redirect arrives.
    ///
    /// Each connection is served on its own task and dropped if it sends
    /// nothing within a few seconds. Requests for any other path get a 404 and
    /// are ignored. Gives up after `timeout` or when the user presses Ctrl-C.
    pub async fn wait_for_callback(self, timeout: Duration) -> ProviderResult<CallbackParams> {
        let (tx, mut rx) = mpsc::channel(1);
        let accept_loop = async {
            loop {
                tokio::select! {
                    accepted = self.listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!("loopback connection from {}", peer);
                            let tx = tx.clone();
                            tokio::spawn(async move {
                                let request = handle_connection(stream);
                                match tokio::time::timeout(CONNECTION_TIMEOUT, request).await {
                                    Ok(Some(result)) => {
                                        let _ = tx.send(result).await;
                                    }
                                    Ok(None) => {}
                                    Err(_) => debug!("dropping idle connection from {}", peer),
                                }
                            });
                        }
                        Err(e) => warn!("failed to accept connection: {}", e),
                    },
                    Some(result) = rx.recv() => return result,
                }
            }
        };

        tokio::select! {
            result = accept_loop => result,
            _ = tokio::time::sleep(timeout) => Err(ProviderError::authentication(format!(
                "timed out after {}s waiting for browser authorization",
                timeout.as_secs()
            ))),
            _ = tokio::signal::ctrl_c() => {
                Err(ProviderError::authentication("authorization cancelled"))
            }
        }
    }
}

/// Handles one HTTP request. Returns `None` for requests that are not the
/// OAuth redirect.
async fn handle_connection(mut stream: TcpStream) -> Option<ProviderResult<CallbackParams>> {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await.is_err() {
        return None;
    }
    for _ in 0..MAX_HEADER_LINES {
        let mut header = String::new();
        match reader.read_line(&mut header).await {
            Ok(0) | Err(_) => break,
            Ok(_) if header.trim().is_empty() => break,
            Ok(_) => {}
        }
    }

    let result = parse_callback(&request_line);
    let response = match &result {
        None => http_response("404 Not Found", "Not Found"),
        Some(Ok(_)) => http_response("200 OK", SUCCESS_PAGE),
        Some(Err(_)) => http_response("400 Bad Request", FAILURE_PAGE),
    };
    if let Err(e) = writer.write_all(response.as_bytes()).await {
        debug!("failed to answer browser: {}", e);
    }
    let _ = writer.flush().await;

    result
}

fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

/// Parses `GET /callback?code=...&state=... HTTP/1.1`.
fn parse_callback(request_line: &str) -> Option<ProviderResult<CallbackParams>> {
    let mut parts = request_line.split_whitespace();
    let (Some("GET"), Some(target)) = (parts.next(), parts.next()) else {
        return None;
    };

    let url = Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;
    if url.path() != CALLBACK_PATH {
        debug!("ignoring request for {}", url.path());
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(ProviderError::authentication(format!(
            "authorization denied: {}",
            error
        ))));
    }

    Some(match code {
        Some(code) => Ok(CallbackParams {
            code,
            state: state.unwrap_or_default(),
        }),
        None => Err(ProviderError::authentication(
            "missing authorization code in callback",
        )),
    })
}

/// PKCE flow state and utilities.
///
/// Implements RFC 7636 (Proof Key for Code Exchange).
#[derive(Debug)]
pub struct PkceFlow {
    /// The code verifier (high-entropy random string).
    pub verifier: String,
    /// The code challenge (SHA-256 hash of verifier, base64url encoded).
    pub challenge: String,
    /// Random state for CSRF protection.
    pub state: String,
}

impl PkceFlow {
    /// Creates a new PKCE flow with random verifier and state.
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        let state = random_token(16);

        Self {
            verifier,
            challenge,
            state,
        }
    }

    /// Computes the SHA-256 challenge for a code verifier.
    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Builds the authorization URL opened in the browser.
    pub fn build_auth_url(
        &self,
        auth_endpoint: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<Url> {
        let scope = scopes.join(" ");
        Url::parse_with_params(
            auth_endpoint,
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("code_challenge", self.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", self.state.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| {
            ProviderError::configuration(format!(
                "invalid authorization endpoint '{}': {}",
                auth_endpoint, e
            ))
            .with_source(e)
        })
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::google::config::{AUTH_URL, OAuthCredentials};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> GoogleConfig {
        GoogleConfig::new(OAuthCredentials::new(
            "test-client.apps.googleusercontent.com",
            "test-secret",
        ))
        .with_token_url(format!("{}/token", server.uri()))
    }

    mod pkce {
        use super::*;

        #[test]
        fn verifier_length() {
            // Base64 encoding of 32 bytes = 43 characters (no padding)
            assert_eq!(PkceFlow::new().verifier.len(), 43);
        }

        #[test]
        fn challenge_matches_rfc7636_example() {
            let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
            assert_eq!(
                PkceFlow::compute_challenge(verifier),
                "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
            );
        }

        #[test]
        fn state_is_random() {
            assert_ne!(PkceFlow::new().state, PkceFlow::new().state);
        }

        #[test]
        fn auth_url_parameters() {
            let flow = PkceFlow::new();
            let url = flow
                .build_auth_url(
                    AUTH_URL,
                    "test-client.apps.googleusercontent.com",
                    "http://127.0.0.1:8080/callback",
                    &GoogleConfig::default_scopes(),
                )
                .unwrap();

            assert!(url.as_str().starts_with(AUTH_URL));
            let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
            assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:8080/callback");
            assert_eq!(pairs["code_challenge"], flow.challenge);
            assert_eq!(pairs["code_challenge_method"], "S256");
            assert_eq!(pairs["state"], flow.state);
            assert_eq!(pairs["access_type"], "offline");
            assert_eq!(pairs["prompt"], "consent");
            assert!(pairs["scope"].contains("calendar.events"));
            assert!(pairs["scope"].contains("calendar.readonly"));
        }
    }

    mod callback_parsing {
        use super::*;

        #[test]
        fn code_and_state() {
            let parsed = parse_callback("GET /callback?code=4%2Fabc&state=xyz HTTP/1.1\r\n")
                .unwrap()
                .unwrap();
            assert_eq!(parsed.code, "4/abc");
            assert_eq!(parsed.state, "xyz");
        }

        #[test]
        fn other_paths_are_ignored() {
            assert!(parse_callback("GET /favicon.ico HTTP/1.1").is_none());
            assert!(parse_callback("POST /callback HTTP/1.1").is_none());
            assert!(parse_callback("").is_none());
        }

        #[test]
        fn denied() {
            let err = parse_callback("GET /callback?error=access_denied&state=s HTTP/1.1")
                .unwrap()
                .unwrap_err();
            assert!(err.message().contains("access_denied"));
        }

        #[test]
        fn missing_code() {
            let err = parse_callback("GET /callback?state=s HTTP/1.1")
                .unwrap()
                .unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        }
    }

    mod loopback {
        use super::*;

        #[tokio::test]
        async fn ignores_noise_then_returns_callback() {
            let listener = LoopbackListener::bind((0, 0)).await.unwrap();
            let port = listener.port();
            assert_ne!(port, 0);
            assert_eq!(listener.redirect_uri(), format!("http://127.0.0.1:{}/callback", port));

            let waiter = tokio::spawn(listener.wait_for_callback(Duration::from_secs(10)));

            let http = reqwest::Client::new();
            let favicon = http
                .get(format!("http://127.0.0.1:{}/favicon.ico", port))
                .send()
                .await
                .unwrap();
            assert_eq!(favicon.status(), 404);

            let callback = http
                .get(format!("http://127.0.0.1:{}/callback?code=abc&state=s1", port))
                .send()
                .await
                .unwrap();
            assert_eq!(callback.status(), 200);

            let params = waiter.await.unwrap().unwrap();
            assert_eq!(
                params,
                CallbackParams {
                    code: "abc".into(),
                    state: "s1".into()
                }
            );

            // the port is released once the wait returns
            assert!(TcpListener::bind(("127.0.0.1", port)).await.is_ok());
        }

        #[tokio::test]
        async fn idle_connection_does_not_block_callback() {
            let listener = LoopbackListener::bind((0, 0)).await.unwrap();
            let port = listener.port();
            let waiter = tokio::spawn(listener.wait_for_callback(Duration::from_secs(3)));

            // a browser preconnect: connects and never sends a request
            let _idle = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

            let callback = reqwest::Client::new()
                .get(format!("http://127.0.0.1:{}/callback?code=abc&state=s", port))
                .send()
                .await
                .unwrap();
            assert_eq!(callback.status(), 200);

            let params = waiter.await.unwrap().unwrap();
            assert_eq!(params.code, "abc");
            assert_eq!(params.state, "s");
        }

        #[tokio::test]
        async fn times_out() {
            let listener = LoopbackListener::bind((0, 0)).await.unwrap();
            let err = listener
                .wait_for_callback(Duration::from_millis(50))
                .await
                .unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
            assert!(err.message().contains("timed out"));
        }

        #[tokio::test]
        async fn busy_port_range_is_config_error() {
            let taken = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
            let port = taken.local_addr().unwrap().port();
            let err = LoopbackListener::bind((port, port)).await.unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        }
    }

    mod token_endpoint {
        use super::*;

        #[tokio::test]
        async fn exchange_code_stores_granted_scopes() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .and(body_string_contains("grant_type=authorization_code"))
                .and(body_string_contains("code_verifier=verifier"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "ya29.new",
                    "refresh_token": "1//refresh",
                    "expires_in": 3599,
                    "scope": "https://www.googleapis.com/auth/calendar.events https://www.googleapis.com/auth/calendar.readonly",
                    "token_type": "Bearer"
                })))
                .expect(1)
                .mount(&server)
                .await;

            let client = OAuthClient::new(test_config(&server)).unwrap();
            let tokens = client
                .exchange_code("code", "verifier", "http://127.0.0.1:1/callback")
                .await
                .unwrap();

            assert_eq!(tokens.access_token, "ya29.new");
            assert_eq!(tokens.refresh_token.as_deref(), Some("1//refresh"));
            assert!(tokens.has_scopes(&GoogleConfig::default_scopes()));
            assert!(!tokens.is_expired());
        }

        #[tokio::test]
        async fn exchange_rejected() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                    "error": "invalid_request",
                    "error_description": "Missing code verifier."
                })))
                .mount(&server)
                .await;

            let client = OAuthClient::new(test_config(&server)).unwrap();
            let err = client.exchange_code("c", "v", "r").await.unwrap_err();
            assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
            assert!(err.message().contains("Missing code verifier"));
        }

        #[tokio::test]
        async fn refresh_success() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .and(body_string_contains("grant_type=refresh_token"))
                .and(body_string_contains("refresh_token=1%2F%2Frefresh"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "ya29.refreshed",
                    "expires_in": 3599
                })))
                .expect(1)
                .mount(&server)
                .await;

            let client = OAuthClient::new(test_config(&server)).unwrap();
            match client.refresh("1//refresh").await.unwrap() {
                RefreshOutcome::Refreshed(response) => {
                    assert_eq!(response.access_token, "ya29.refreshed");
                    assert!(response.refresh_token.is_none());
                }
                other => panic!("unexpected outcome: {:?}", other),
            }
        }

        #[tokio::test]
        async fn refresh_invalid_grant_is_revoked() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                    "error": "invalid_grant",
                    "error_description": "Token has been expired or revoked."
                })))
                .mount(&server)
                .await;

            let client = OAuthClient::new(test_config(&server)).unwrap();
            match client.refresh("stale").await.unwrap() {
                RefreshOutcome::Revoked(reason) => assert!(reason.contains("revoked")),
                other => panic!("unexpected outcome: {:?}", other),
            }
        }

        #[tokio::test]
        async fn refresh_other_failure_is_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                    "error": "invalid_client"
                })))
                .mount(&server)
                .await;

            let client = OAuthClient::new(test_config(&server)).unwrap();
            let err = client.refresh("x").await.unwrap_err();
            assert_eq!(err.status(), Some(401));
            assert!(err.message().contains("invalid_client"));
        }
    }

    #[test]
    fn granted_scopes_fallback() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "a", "expires_in": 10}"#).unwrap();
        let requested = GoogleConfig::default_scopes();
        assert_eq!(response.granted_scopes(&requested), requested);
    }
}
