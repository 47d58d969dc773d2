use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use playlist_bridge::spotify::auth::{
    AccessToken, AuthCodeNotPresent, AuthEndpoints, AuthError, Authenticator, Credentials,
};
use playlist_bridge::spotify::token_cache::TokenCache;
use playlist_bridge::spotify::Authorization;
use playlist_bridge::{Config, SpotifyClient};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> Config {
    Config {
        client_id: Some("client".into()),
        client_secret: Some("secret".into()),
        redirect_uri: Some("http://localhost:8888/callback".into()),
    }
}

fn token(access_token: &str, expires_at: u64) -> AccessToken {
    AccessToken {
        access_token: access_token.into(),
        token_type: "Bearer".into(),
        scope: "playlist-modify-public playlist-modify-private".into(),
        expires_in: 3600,
        refresh_token: Some("refresh-me".into()),
        expires_at,
    }
}

#[derive(Default)]
struct CountingLogin {
    calls: AtomicUsize,
}

#[async_trait]
impl Authenticator for CountingLogin {
    async fn authenticate(
        &self,
        _http: &reqwest::Client,
        _endpoints: &AuthEndpoints,
        creds: Credentials<AuthCodeNotPresent>,
    ) -> Result<AccessToken, AuthError> {
        assert_eq!(creds.client_id, "client");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(token("login-token", u64::MAX))
    }
}

fn client(server: &MockServer) -> SpotifyClient {
    SpotifyClient::new(config()).with_auth_endpoints(AuthEndpoints {
        authorize: format!("{}/authorize", server.uri()),
        token: format!("{}/api/token", server.uri()),
    })
}

async fn token_endpoint(server: &MockServer, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn fresh_cached_token_is_used_as_is() {
    let server = MockServer::start().await;
    token_endpoint(&server, ResponseTemplate::new(200), 0).await;
    let dir = tempfile::tempdir().unwrap();
    let cache = TokenCache::new(dir.path().join("token.json"));
    cache.save(&token("cached", u64::MAX)).await.unwrap();
    let login = CountingLogin::default();

    let mut spotify = client(&server);
    let outcome = spotify.authorize(&cache, &login).await.unwrap();

    assert_eq!(outcome, Authorization::Cached);
    assert_eq!(spotify.token().unwrap().access_token, "cached");
    assert_eq!(login.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn expired_token_is_refreshed_and_cache_rewritten() {
    let server = MockServer::start().await;
    token_endpoint(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "refreshed",
            "token_type": "Bearer",
            "scope": "playlist-modify-public playlist-modify-private",
            "expires_in": 3600
        })),
        1,
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let cache = TokenCache::new(dir.path().join("token.json"));
    cache.save(&token("stale", 0)).await.unwrap();
    let login = CountingLogin::default();

    let mut spotify = client(&server);
    let outcome = spotify.authorize(&cache, &login).await.unwrap();

    assert_eq!(outcome, Authorization::Refreshed);
    assert_eq!(login.calls.load(Ordering::SeqCst), 0);
    let saved = cache.load().await.unwrap().unwrap();
    assert_eq!(saved.access_token, "refreshed");
    assert_eq!(saved.refresh_token.as_deref(), Some("refresh-me"));
    assert_eq!(spotify.token(), Some(&saved));
}

#[tokio::test]
async fn refused_refresh_runs_login_again() {
    let server = MockServer::start().await;
    token_endpoint(
        &server,
        ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Refresh token revoked"
        })),
        1,
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let cache = TokenCache::new(dir.path().join("token.json"));
    cache.save(&token("stale", 0)).await.unwrap();
    let login = CountingLogin::default();

    let mut spotify = client(&server);
    let outcome = spotify.authorize(&cache, &login).await.unwrap();

    assert_eq!(outcome, Authorization::LoggedIn);
    assert_eq!(login.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.load().await.unwrap().unwrap().access_token, "login-token");
    assert_eq!(spotify.token().unwrap().access_token, "login-token");
}

#[tokio::test]
async fn empty_cache_runs_login() {
    let server = MockServer::start().await;
    token_endpoint(&server, ResponseTemplate::new(200), 0).await;
    let dir = tempfile::tempdir().unwrap();
    let cache = TokenCache::new(dir.path().join("token.json"));
    let login = CountingLogin::default();

    let mut spotify = client(&server);
    let outcome = spotify.authorize(&cache, &login).await.unwrap();

    assert_eq!(outcome, Authorization::LoggedIn);
    assert_eq!(login.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.load().await.unwrap().unwrap().access_token, "login-token");
}

#[tokio::test]
async fn login_needs_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let cache = TokenCache::new(dir.path().join("token.json"));
    let login = CountingLogin::default();

    let mut spotify = SpotifyClient::new(Config::default());
    let err = spotify.authorize(&cache, &login).await.unwrap_err();

    assert!(matches!(err, playlist_bridge::Error::MissingCredentials(_)));
    assert_eq!(login.calls.load(Ordering::SeqCst), 0);
    assert!(cache.load().await.unwrap().is_none());
}
