use reqwest::header::{HeaderValue, ORIGIN, REFERER, USER_AGENT};
use serde_json::{json, Value};

use crate::error::{Error, Result};

pub const YTMUSIC_BASE_URL: &str = "https://music.youtube.com";
pub const DEFAULT_PLAYLIST_LIMIT: usize = 100;

const CLIENT_NAME: &str = "WEB_REMIX";
const CLIENT_VERSION: &str = "1.20240101.01.00";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

const ITEM_RENDERER: &str = "musicResponsiveListItemRenderer";
const HEADER_RENDERERS: [&str; 3] = [
    "musicResponsiveHeaderRenderer",
    "musicDetailHeaderRenderer",
    "musicEditablePlaylistDetailHeaderRenderer",
];
const ARTIST_SEPARATORS: [&str; 3] = [" • ", " & ", ", "];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistId(String);

impl PlaylistId {
    /// Pulls the `list=` parameter out of a YouTube Music playlist link.
    pub fn from_url(url: &str) -> Result<PlaylistId> {
        let (_, rest) = url.split_once("list=").ok_or(Error::InvalidPlaylistUrl(
            "Invalid YouTube Music playlist URL. It should contain 'list='.",
        ))?;
        let id = rest.split('&').next().unwrap_or_default();
        if id.is_empty() {
            return Err(Error::InvalidPlaylistUrl(
                "Invalid YouTube Music playlist URL. The 'list=' parameter is empty.",
            ));
        }
        Ok(PlaylistId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn browse_id(&self) -> String {
        if self.0.starts_with("VL") {
            self.0.clone()
        } else {
            format!("VL{}", self.0)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlist {
    pub title: Option<String>,
    pub tracks: Vec<PlaylistTrack>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistTrack {
    pub title: Option<String>,
    pub artists: Vec<String>,
    pub video_id: Option<String>,
}

/// Read-only client for the YouTube Music browse endpoint. No login is
/// needed for public playlists.
#[derive(Debug, Clone)]
pub struct YtMusic {
    http: reqwest::Client,
    base_url: String,
}

impl Default for YtMusic {
    fn default() -> YtMusic {
        YtMusic::new()
    }
}

impl YtMusic {
    pub fn new() -> YtMusic {
        YtMusic::with_base_url(YTMUSIC_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> YtMusic {
        YtMusic {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetches the first page of a playlist, keeping at most `limit` tracks.
    pub async fn get_playlist(&self, id: &PlaylistId, limit: usize) -> Result<Playlist> {
        let body = json!({
            "context": {
                "client": {
                    "clientName": CLIENT_NAME,
                    "clientVersion": CLIENT_VERSION,
                    "hl": "en",
                },
                "user": {},
            },
            "browseId": id.browse_id(),
        });

        let response: Value = self
            .http
            .post(format!("{}/youtubei/v1/browse", self.base_url))
            .query(&[("alt", "json"), ("prettyPrint", "false")])
            .header(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT))
            .header(ORIGIN, HeaderValue::from_static(YTMUSIC_BASE_URL))
            .header(REFERER, HeaderValue::from_static(YTMUSIC_BASE_URL))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let playlist = parse_playlist(&response, limit)?;
        log::debug!(
            "Fetched {} tracks from YouTube Music playlist {}",
            playlist.tracks.len(),
            id.as_str()
        );
        Ok(playlist)
    }
}

pub(crate) fn parse_playlist(response: &Value, limit: usize) -> Result<Playlist> {
    let title = HEADER_RENDERERS.iter().find_map(|key| {
        find_first(response, key)
            .and_then(|header| header.pointer("/title/runs/0/text"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    let mut items = Vec::new();
    collect(response, ITEM_RENDERER, &mut items);

    if title.is_none() && items.is_empty() {
        return Err(Error::UnexpectedResponse("playlist header and contents"));
    }

    Ok(Playlist {
        title,
        tracks: items.into_iter().take(limit).map(parse_track).collect(),
    })
}

fn parse_track(item: &Value) -> PlaylistTrack {
    let column_runs = |index: usize| {
        item.pointer(&format!(
            "/flexColumns/{index}/musicResponsiveListItemFlexColumnRenderer/text/runs"
        ))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
    };

    let title = column_runs(0)
        .first()
        .and_then(|run| run.get("text"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let artist_runs = column_runs(1);
    let linked: Vec<&Value> = artist_runs
        .iter()
        .filter(|run| run.get("navigationEndpoint").is_some())
        .collect();
    let runs = if linked.is_empty() {
        artist_runs.iter().collect()
    } else {
        linked
    };
    let artists = runs
        .into_iter()
        .filter_map(|run| run.get("text").and_then(Value::as_str))
        .filter(|text| !ARTIST_SEPARATORS.contains(text))
        .map(str::to_string)
        .collect();

    let video_id = item
        .pointer("/playlistItemData/videoId")
        .and_then(Value::as_str)
        .map(str::to_string);

    PlaylistTrack {
        title,
        artists,
        video_id,
    }
}

fn find_first<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|v| find_first(v, key))),
        Value::Array(values) => values.iter().find_map(|v| find_first(v, key)),
        _ => None,
    }
}

/// Collects every value stored under `key`, in document order. Matches are
/// not searched further.
fn collect<'a>(value: &'a Value, key: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    out.push(v);
                } else {
                    collect(v, key, out);
                }
            }
        }
        Value::Array(values) => values.iter().for_each(|v| collect(v, key, out)),
        _ => {}
    }
}
