use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use url::Url;

type Result<T> = std::result::Result<T, AuthError>;

pub const AUTHORIZATION_BASE_URL: &str = "https://accounts.spotify.com/authorize";
pub const ACCESS_TOKEN_BASE_URL: &str = "https://accounts.spotify.com/api/token";
pub const SCOPE: &str = "playlist-modify-public playlist-modify-private";

const CLOSE_WINDOW_PAGE: &str = "<html><body><script>window.close();</script></body></html>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    pub authorize: String,
    pub token: String,
}

impl Default for AuthEndpoints {
    fn default() -> AuthEndpoints {
        AuthEndpoints {
            authorize: AUTHORIZATION_BASE_URL.to_string(),
            token: ACCESS_TOKEN_BASE_URL.to_string(),
        }
    }
}

/// Runs the whole authorization-code flow: browser prompt, callback capture
/// and code exchange.
pub async fn authenticate(
    http: &reqwest::Client,
    endpoints: &AuthEndpoints,
    creds: Credentials<AuthCodeNotPresent>,
) -> Result<AccessToken> {
    let authorize = endpoints.clone();
    let creds = tokio::task::spawn_blocking(move || creds.get_auth_code(&authorize)).await??;
    creds.get_access_token(http, endpoints).await
}

/// Obtains a brand new token, normally by sending the user through the
/// browser flow.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(
        &self,
        http: &reqwest::Client,
        endpoints: &AuthEndpoints,
        creds: Credentials<AuthCodeNotPresent>,
    ) -> Result<AccessToken>;
}

pub struct BrowserLogin;

#[async_trait]
impl Authenticator for BrowserLogin {
    async fn authenticate(
        &self,
        http: &reqwest::Client,
        endpoints: &AuthEndpoints,
        creds: Credentials<AuthCodeNotPresent>,
    ) -> Result<AccessToken> {
        authenticate(http, endpoints, creds).await
    }
}

pub async fn refresh_access_token(
    http: &reqwest::Client,
    endpoints: &AuthEndpoints,
    client_id: &str,
    client_secret: &str,
    token: &AccessToken,
) -> Result<AccessToken> {
    let refresh_token = token
        .refresh_token
        .as_deref()
        .ok_or(AuthError::MissingRefreshToken)?;

    let response = http
        .post(&endpoints.token)
        .basic_auth(client_id, Some(client_secret))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await?;

    let mut refreshed = token_from_response(response).await?;
    if refreshed.refresh_token.is_none() {
        refreshed.refresh_token = token.refresh_token.clone();
    }
    Ok(refreshed)
}

pub struct AuthCodeNotPresent;
pub struct AuthCodePresent(String);

pub trait AuthCodeStates: private::Sealed {}
impl AuthCodeStates for AuthCodeNotPresent {}
impl AuthCodeStates for AuthCodePresent {}

pub struct Credentials<AuthCodeState>
where
    AuthCodeState: AuthCodeStates,
{
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    authorization_code: AuthCodeState,
    state: String,
}

impl<S: AuthCodeStates> fmt::Debug for Credentials<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

impl Credentials<AuthCodeNotPresent> {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Credentials<AuthCodeNotPresent> {
        Credentials {
            client_id: String::from(client_id),
            client_secret: String::from(client_secret),
            redirect_uri: String::from(redirect_uri),
            authorization_code: AuthCodeNotPresent,
            state: rand::rng()
                .sample_iter(&Alphanumeric)
                .take(64)
                .map(char::from)
                .collect(),
        }
    }

    pub fn authorize_url(&self, endpoints: &AuthEndpoints) -> Result<Url> {
        let params = serde_urlencoded::to_string(AuthCodeRequest::new(self))?;
        Ok(Url::parse(&format!("{}?{}", endpoints.authorize, params))?)
    }

    /// Blocks until the browser hits the redirect URI.
    pub fn get_auth_code(self, endpoints: &AuthEndpoints) -> Result<Credentials<AuthCodePresent>> {
        let auth_code = CallbackCaptureServer::new(&self, endpoints)?.capture()?;
        Ok(self.add_auth_code(auth_code))
    }

    fn add_auth_code(self, auth_code: String) -> Credentials<AuthCodePresent> {
        Credentials {
            client_id: self.client_id,
            client_secret: self.client_secret,
            redirect_uri: self.redirect_uri,
            authorization_code: AuthCodePresent(auth_code),
            state: self.state,
        }
    }
}

impl Credentials<AuthCodePresent> {
    pub async fn get_access_token(
        self,
        http: &reqwest::Client,
        endpoints: &AuthEndpoints,
    ) -> Result<AccessToken> {
        let response = http
            .post(&endpoints.token)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("code", self.authorization_code.0.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        token_from_response(response).await
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: u64,
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.expires_at
    }

    fn stamp(mut self, now: u64) -> AccessToken {
        self.expires_at = now.saturating_add(self.expires_in);
        self
    }
}

async fn token_from_response(response: reqwest::Response) -> Result<AccessToken> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = match serde_json::from_str::<TokenErrorBody>(&body) {
            Ok(err) => err.error_description.unwrap_or(err.error),
            Err(_) => body,
        };
        return Err(AuthError::TokenRequest {
            status: status.as_u16(),
            message,
        });
    }

    let token: AccessToken = serde_json::from_str(&body).map_err(AuthError::Decode)?;
    Ok(token.stamp(unix_now()))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Deserialize)]
struct TokenErrorBody {
    error: String,
    error_description: Option<String>,
}

#[derive(Serialize)]
struct AuthCodeRequest {
    client_id: String,
    response_type: String,
    redirect_uri: String,
    state: String,
    scope: String,
}

impl AuthCodeRequest {
    fn new(creds: &Credentials<AuthCodeNotPresent>) -> AuthCodeRequest {
        AuthCodeRequest {
            client_id: creds.client_id.clone(),
            response_type: "code".to_string(),
            redirect_uri: creds.redirect_uri.clone(),
            state: creds.state.clone(),
            scope: SCOPE.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct AuthCodeCallback {
    code: Option<String>,
    error: Option<String>,
    state: Option<String>,
}

impl AuthCodeCallback {
    fn parse_for_code(self, state: &str) -> Result<String> {
        if let Some(error) = self.error {
            return Err(AuthError::Denied(error));
        }
        if self.state.as_deref() != Some(state) {
            return Err(AuthError::StateMismatch);
        }
        self.code.ok_or(AuthError::MissingCode)
    }
}

/// Splits a request target such as `/callback?code=..` and checks it against
/// the redirect path.
fn callback_query<'a>(target: &'a str, expected_path: &str) -> Result<&'a str> {
    match target.split_once('?') {
        Some((path, query)) if path == expected_path => Ok(query),
        _ => Err(AuthError::MalformedCallback(target.to_string())),
    }
}

struct CallbackCaptureServer {
    server: tiny_http::Server,
    prompt_url: Url,
    callback_path: String,
    state: String,
}

impl CallbackCaptureServer {
    fn new(
        creds: &Credentials<AuthCodeNotPresent>,
        endpoints: &AuthEndpoints,
    ) -> Result<CallbackCaptureServer> {
        let redirect = Url::parse(&creds.redirect_uri)?;
        let host = redirect.host_str().unwrap_or("localhost");
        let port = redirect.port_or_known_default().unwrap_or(80);

        let server = tiny_http::Server::http(format!("{host}:{port}"))
            .map_err(|e| AuthError::Server(e.to_string()))?;

        Ok(CallbackCaptureServer {
            server,
            prompt_url: creds.authorize_url(endpoints)?,
            callback_path: redirect.path().to_string(),
            state: creds.state.clone(),
        })
    }

    fn capture(self) -> Result<String> {
        log::info!("Opening Spotify authorization page: {}", self.prompt_url);
        if let Err(e) = webbrowser::open(self.prompt_url.as_str()) {
            log::warn!("Could not open a browser ({e}), open the URL above manually");
        }

        let request = self.server.recv()?;
        let target = request.url().to_string();

        let code = callback_query(&target, &self.callback_path).and_then(|query| {
            serde_urlencoded::from_str::<AuthCodeCallback>(query)
                .map_err(|_| AuthError::MalformedCallback(target.clone()))?
                .parse_for_code(&self.state)
        })?;

        let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"text/html"[..])
            .map_err(|_| AuthError::Server("invalid response header".to_string()))?;
        request.respond(tiny_http::Response::from_string(CLOSE_WINDOW_PAGE).with_header(header))?;

        Ok(code)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Unable to start the callback server: {0}")]
    Server(String),
    #[error("Auth code callback url was malformed: {0}")]
    MalformedCallback(String),
    #[error("Authorization callback returned an error: {0}")]
    Denied(String),
    #[error("State sent to Spotify does not match the one returned")]
    StateMismatch,
    #[error("Auth code not present in callback")]
    MissingCode,
    #[error("Token has no refresh token")]
    MissingRefreshToken,
    #[error("Token request failed with {status}: {message}")]
    TokenRequest { status: u16, message: String },
    #[error("Unable to parse access token response: {0}")]
    Decode(serde_json::Error),
    #[error("Error url-encoding authorization query: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::AuthCodeNotPresent {}
    impl Sealed for super::AuthCodePresent {}
}
