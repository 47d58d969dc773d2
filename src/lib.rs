pub mod config;
pub mod error;
pub mod spotify;
pub mod transfer;
pub mod ytmusic;

pub use config::Config;
pub use error::{Error, Result};
pub use spotify::SpotifyClient;

pub const SETUP_COMPLETE: &str = "Project setup complete ✅";

/// Builds the Spotify client from whatever configuration is present.
///
/// Missing credentials are not an error here; they only matter once an API
/// call needs a token.
pub fn bootstrap(config: Config) -> SpotifyClient {
    let missing = config.missing();
    if !missing.is_empty() {
        log::debug!("Spotify credentials not set: {}", missing.join(", "));
    }
    SpotifyClient::new(config)
}
