use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::Result;
use crate::spotify::id::{PlaylistID, TrackID};
use crate::spotify::{SpotifyClient, TrackMatch, MAX_TRACKS_PER_REQUEST};
use crate::ytmusic::{self, Playlist, YtMusic};

/// Where tracks are read from.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    async fn fetch_playlist(&self, id: &ytmusic::PlaylistId, limit: usize) -> Result<Playlist>;
}

/// Where tracks are matched and written to.
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    async fn search_track(&self, query: &str) -> Result<Option<TrackMatch>>;
    async fn add_tracks(&self, playlist: &PlaylistID, tracks: &[TrackID]) -> Result<()>;
}

#[async_trait]
impl PlaylistSource for YtMusic {
    async fn fetch_playlist(&self, id: &ytmusic::PlaylistId, limit: usize) -> Result<Playlist> {
        self.get_playlist(id, limit).await
    }
}

#[async_trait]
impl TrackCatalog for SpotifyClient {
    async fn search_track(&self, query: &str) -> Result<Option<TrackMatch>> {
        SpotifyClient::search_track(self, query).await
    }

    async fn add_tracks(&self, playlist: &PlaylistID, tracks: &[TrackID]) -> Result<()> {
        SpotifyClient::add_tracks(self, playlist, tracks).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Info(String),
    Warning(String),
    Success(String),
    Error(String),
    Complete(String),
}

impl Progress {
    pub fn level(&self) -> &'static str {
        match self {
            Progress::Info(_) => "info",
            Progress::Warning(_) => "warning",
            Progress::Success(_) => "success",
            Progress::Error(_) => "error",
            Progress::Complete(_) => "complete",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Progress::Info(m)
            | Progress::Warning(m)
            | Progress::Success(m)
            | Progress::Error(m)
            | Progress::Complete(m) => m,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.level(), self.message())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferSummary {
    pub matched: usize,
    pub added: usize,
    pub skipped: usize,
    pub failed: bool,
}

struct Reporter {
    tx: UnboundedSender<Progress>,
    failed: bool,
}

impl Reporter {
    fn send(&mut self, event: Progress) {
        if matches!(event, Progress::Error(_)) {
            self.failed = true;
        }
        // A closed receiver only means nobody is watching.
        let _ = self.tx.send(event);
    }

    fn info(&mut self, msg: impl Into<String>) {
        self.send(Progress::Info(msg.into()));
    }

    fn warning(&mut self, msg: impl Into<String>) {
        self.send(Progress::Warning(msg.into()));
    }

    fn success(&mut self, msg: impl Into<String>) {
        self.send(Progress::Success(msg.into()));
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.send(Progress::Error(msg.into()));
    }

    fn complete(&mut self, msg: impl Into<String>) {
        self.send(Progress::Complete(msg.into()));
    }
}

/// Copies a YouTube Music playlist into a Spotify playlist, one title search
/// per track.
pub struct Transfer<'a, S, C> {
    source: &'a S,
    catalog: &'a C,
    limit: usize,
}

impl<'a, S: PlaylistSource, C: TrackCatalog> Transfer<'a, S, C> {
    pub fn new(source: &'a S, catalog: &'a C) -> Transfer<'a, S, C> {
        Transfer {
            source,
            catalog,
            limit: ytmusic::DEFAULT_PLAYLIST_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Transfer<'a, S, C> {
        self.limit = limit;
        self
    }

    /// Runs the transfer, streaming events into `tx`. Failures are reported
    /// as [`Progress::Error`] events and flagged in the summary rather than
    /// returned.
    pub async fn run(
        &self,
        ytmusic_url: &str,
        spotify_url: &str,
        tx: UnboundedSender<Progress>,
    ) -> TransferSummary {
        let mut reporter = Reporter { tx, failed: false };
        let mut summary = self.transfer(ytmusic_url, spotify_url, &mut reporter).await;
        summary.failed = reporter.failed;
        summary
    }

    async fn transfer(
        &self,
        ytmusic_url: &str,
        spotify_url: &str,
        reporter: &mut Reporter,
    ) -> TransferSummary {
        let mut summary = TransferSummary::default();
        reporter.info("Connecting to YouTube Music API...");

        let ids = ytmusic::PlaylistId::from_url(ytmusic_url)
            .and_then(|yt| Ok((yt, PlaylistID::new(spotify_url)?)));
        let (yt_playlist, spotify_playlist) = match ids {
            Ok(ids) => ids,
            Err(e) => {
                reporter.error(format!("Error extracting playlist ID: {e}"));
                return summary;
            }
        };

        reporter.info("Fetching YouTube Music playlist data...");
        let playlist = match self.source.fetch_playlist(&yt_playlist, self.limit).await {
            Ok(playlist) => playlist,
            Err(e) => {
                reporter.error(format!("Error fetching playlist data: {e}"));
                return summary;
            }
        };

        if playlist.tracks.is_empty() {
            reporter.info("No tracks found in the YouTube Music playlist or playlist is empty.");
            reporter.complete("No tracks to transfer.");
            return summary;
        }

        let total = playlist.tracks.len();
        reporter.info(format!(
            "Attempting to transfer {total} tracks from YouTube Music to Spotify..."
        ));

        let mut to_add = Vec::new();
        for (i, track) in playlist.tracks.iter().enumerate() {
            let Some(title) = track.title.as_deref() else {
                reporter.warning(format!(
                    "❌ Skipped track {}/{total}: No title found for an entry.",
                    i + 1
                ));
                summary.skipped += 1;
                continue;
            };

            reporter.info(format!("Searching Spotify for '{title}'..."));
            match self.catalog.search_track(title).await {
                Ok(Some(found)) => {
                    reporter.success(format!(
                        "✅ Found match: '{}' (YouTube: '{title}')",
                        found.name
                    ));
                    to_add.push(found.id);
                }
                Ok(None) => {
                    reporter.warning(format!(
                        "❌ Skipped: '{title}' (No matching track found on Spotify.)"
                    ));
                    summary.skipped += 1;
                }
                Err(e) => {
                    reporter.warning(format!("❌ Skipped: '{title}' ({e})"));
                    summary.skipped += 1;
                }
            }
        }
        summary.matched = to_add.len();

        if to_add.is_empty() {
            reporter.info("No tracks were found or matched for transfer.");
        } else {
            reporter.info(format!(
                "Adding {} matched tracks to Spotify playlist in batches...",
                to_add.len()
            ));
            let mut failed = false;
            for batch in to_add.chunks(MAX_TRACKS_PER_REQUEST) {
                if let Err(e) = self.catalog.add_tracks(&spotify_playlist, batch).await {
                    reporter.error(format!(
                        "Error adding tracks to Spotify playlist: {e}. Check playlist ID and permissions."
                    ));
                    failed = true;
                    break;
                }
                summary.added += batch.len();
                reporter.info(format!("Added batch of {} tracks.", batch.len()));
            }
            if !failed {
                reporter.success(format!(
                    "Successfully added {} tracks to Spotify playlist.",
                    summary.added
                ));
            }
        }

        reporter.info(format!(
            "Transfer process concluded. Added: {}, Skipped: {}.",
            summary.added, summary.skipped
        ));
        reporter.complete("");
        summary
    }
}
