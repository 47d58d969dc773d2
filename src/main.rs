use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use playlist_bridge::spotify::auth::BrowserLogin;
use playlist_bridge::spotify::token_cache::{TokenCache, DEFAULT_TOKEN_CACHE};
use playlist_bridge::transfer::{Progress, Transfer};
use playlist_bridge::ytmusic::{YtMusic, DEFAULT_PLAYLIST_LIMIT};
use playlist_bridge::{bootstrap, Config, SpotifyClient, SETUP_COMPLETE};

#[derive(Parser)]
#[command(version, about = "Move YouTube Music playlists to Spotify")]
struct Cli {
    /// File the Spotify token is kept in between runs
    #[arg(long, env = "SPOTIFY_TOKEN_CACHE", default_value = DEFAULT_TOKEN_CACHE, global = true)]
    token_cache: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Log in to Spotify and cache the token
    Auth,
    /// Copy the tracks of a YouTube Music playlist into a Spotify playlist
    Transfer {
        ytmusic_url: String,
        spotify_url: String,
        /// Maximum number of YouTube Music tracks to read
        #[arg(long, default_value_t = DEFAULT_PLAYLIST_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let cache = TokenCache::new(cli.token_cache);

    match cli.command {
        None => {
            let _spotify = bootstrap(Config::from_env());
            println!("{SETUP_COMPLETE}");
        }
        Some(Command::Auth) => {
            let mut spotify = bootstrap(Config::from_env());
            login(&mut spotify, &cache).await?;
        }
        Some(Command::Transfer {
            ytmusic_url,
            spotify_url,
            limit,
        }) => {
            let mut spotify = bootstrap(Config::from_env());
            spotify
                .authorize(&cache, &BrowserLogin)
                .await
                .context("Unable to authorize with Spotify")?;
            transfer(&spotify, &ytmusic_url, &spotify_url, limit).await?;
        }
    }

    Ok(())
}

async fn login(spotify: &mut SpotifyClient, cache: &TokenCache) -> Result<()> {
    spotify
        .log_in(cache, &BrowserLogin)
        .await
        .context("Spotify authentication failed, check that the redirect URI matches the one in the Spotify Developer Dashboard")?;

    let user = spotify.current_user().await?;
    log::info!(
        "Authenticated with Spotify as {}",
        user.display_name.as_deref().unwrap_or(&user.id)
    );
    Ok(())
}

async fn transfer(
    spotify: &SpotifyClient,
    ytmusic_url: &str,
    spotify_url: &str,
    limit: usize,
) -> Result<()> {
    let ytmusic = YtMusic::new();
    let transfer = Transfer::new(&ytmusic, spotify).with_limit(limit);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = async {
        while let Some(event) = rx.recv().await {
            match &event {
                Progress::Error(m) => log::error!("{m}"),
                Progress::Warning(m) => log::warn!("{m}"),
                _ => log::debug!("{event}"),
            }
            println!("{event}");
        }
    };
    let (summary, ()) = tokio::join!(transfer.run(ytmusic_url, spotify_url, tx), printer);

    if summary.failed {
        bail!(
            "Transfer failed after adding {} of {} matched tracks",
            summary.added,
            summary.matched
        );
    }
    Ok(())
}
