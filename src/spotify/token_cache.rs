use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::spotify::auth::AccessToken;

pub const DEFAULT_TOKEN_CACHE: &str = ".spotify_token.json";

/// JSON file holding the last Spotify token between runs.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> TokenCache {
        TokenCache { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<AccessToken>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, token: &AccessToken) -> Result<()> {
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(token)?).await?;
        log::debug!("Saved Spotify token to {}", self.path.display());
        Ok(())
    }
}

impl Default for TokenCache {
    fn default() -> TokenCache {
        TokenCache::new(DEFAULT_TOKEN_CACHE)
    }
}
