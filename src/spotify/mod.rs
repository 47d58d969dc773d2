use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::error::{Error, Result};
use auth::{AccessToken, AuthEndpoints, Authenticator};
use id::{PlaylistID, TrackID};
use token_cache::TokenCache;

pub mod auth;
pub mod id;
mod request;
pub mod token_cache;

pub const API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const MAX_TRACKS_PER_REQUEST: usize = 100;

/// Handle on the Spotify Web API.
///
/// Building one never touches the network; a token is only needed once an
/// API method is called.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    config: Config,
    api_base: String,
    endpoints: AuthEndpoints,
    token: Option<AccessToken>,
}

/// How [`SpotifyClient::authorize`] came by its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Cached,
    Refreshed,
    LoggedIn,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMatch {
    pub id: TrackID,
    pub name: String,
    pub uri: String,
    pub artists: Vec<String>,
    pub url: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: SearchPage,
}

#[derive(Deserialize)]
struct SearchPage {
    items: Vec<SearchTrack>,
}

#[derive(Deserialize)]
struct SearchTrack {
    id: String,
    name: String,
    uri: String,
    #[serde(default)]
    artists: Vec<SearchArtist>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Deserialize)]
struct SearchArtist {
    name: String,
}

#[derive(Deserialize, Default)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Deserialize)]
struct SnapshotResponse {
    snapshot_id: String,
}

impl SpotifyClient {
    pub fn new(config: Config) -> SpotifyClient {
        SpotifyClient {
            http: reqwest::Client::new(),
            config,
            api_base: API_BASE_URL.to_string(),
            endpoints: AuthEndpoints::default(),
            token: None,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> SpotifyClient {
        self.api_base = api_base.into();
        self
    }

    pub fn with_auth_endpoints(mut self, endpoints: AuthEndpoints) -> SpotifyClient {
        self.endpoints = endpoints;
        self
    }

    pub fn with_token(mut self, token: AccessToken) -> SpotifyClient {
        self.token = Some(token);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Gets a new token from `login`, keeps it and writes it to `cache`.
    pub async fn log_in<A: Authenticator>(
        &mut self,
        cache: &TokenCache,
        login: &A,
    ) -> Result<&AccessToken> {
        let creds = self.config.credentials()?;
        let token = login.authenticate(&self.http, &self.endpoints, creds).await?;
        cache.save(&token).await?;
        Ok(&*self.token.insert(token))
    }

    /// Picks up the cached token, refreshing it when expired. Falls back to
    /// `login` when there is no cached token or the refresh is refused.
    pub async fn authorize<A: Authenticator>(
        &mut self,
        cache: &TokenCache,
        login: &A,
    ) -> Result<Authorization> {
        let Some(token) = cache.load().await? else {
            log::info!("Please authenticate with Spotify to proceed.");
            self.log_in(cache, login).await?;
            return Ok(Authorization::LoggedIn);
        };

        self.token = Some(token);
        match self.ensure_fresh_token().await {
            Ok(false) => Ok(Authorization::Cached),
            Ok(true) => {
                if let Some(token) = &self.token {
                    cache.save(token).await?;
                }
                log::info!("Spotify token refreshed.");
                Ok(Authorization::Refreshed)
            }
            Err(e) => {
                log::warn!("Spotify token refresh failed: {e}. Please re-authenticate.");
                self.token = None;
                self.log_in(cache, login).await?;
                Ok(Authorization::LoggedIn)
            }
        }
    }

    /// Refreshes the held token if it has expired. Returns whether a refresh
    /// happened.
    pub async fn ensure_fresh_token(&mut self) -> Result<bool> {
        let token = self.token.as_ref().ok_or(Error::NotAuthenticated)?;
        if !token.is_expired() {
            return Ok(false);
        }

        let creds = self.config.credentials()?;
        log::info!("Spotify token expired, refreshing");
        let refreshed = auth::refresh_access_token(
            &self.http,
            &self.endpoints,
            &creds.client_id,
            &creds.client_secret,
            token,
        )
        .await?;
        self.token = Some(refreshed);
        Ok(true)
    }

    fn access_token(&self) -> Result<&str> {
        self.token
            .as_ref()
            .map(|t| t.access_token.as_str())
            .ok_or(Error::NotAuthenticated)
    }

    pub async fn current_user(&self) -> Result<CurrentUser> {
        let request = self.http.get(format!("{}/me", self.api_base));
        request::send_json(request::bearer(request, self.access_token()?)?).await
    }

    /// Returns the top track hit for `query`, if any.
    pub async fn search_track(&self, query: &str) -> Result<Option<TrackMatch>> {
        let request = self
            .http
            .get(format!("{}/search", self.api_base))
            .query(&[("q", query), ("type", "track"), ("limit", "1")]);
        let response: SearchResponse =
            request::send_json(request::bearer(request, self.access_token()?)?).await?;

        response
            .tracks
            .items
            .into_iter()
            .next()
            .map(|track| -> Result<TrackMatch> {
                Ok(TrackMatch {
                    id: TrackID::new(&track.id)?,
                    name: track.name,
                    uri: track.uri,
                    artists: track.artists.into_iter().map(|a| a.name).collect(),
                    url: track.external_urls.spotify,
                })
            })
            .transpose()
    }

    /// Appends tracks to a playlist, one request per
    /// [`MAX_TRACKS_PER_REQUEST`] tracks.
    pub async fn add_tracks(&self, playlist: &PlaylistID, tracks: &[TrackID]) -> Result<()> {
        let url = format!("{}/playlists/{}/tracks", self.api_base, playlist.id());
        for batch in tracks.chunks(MAX_TRACKS_PER_REQUEST) {
            let uris: Vec<String> = batch.iter().map(TrackID::uri).collect();
            let request = self.http.post(&url).json(&json!({ "uris": uris }));
            let response: SnapshotResponse =
                request::send_json(request::bearer(request, self.access_token()?)?).await?;
            log::debug!(
                "Added {} tracks to playlist {}, snapshot {}",
                batch.len(),
                playlist.id(),
                response.snapshot_id
            );
        }
        Ok(())
    }
}
