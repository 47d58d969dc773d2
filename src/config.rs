use std::env;

use crate::error::{Error, Result};
use crate::spotify::auth::{AuthCodeNotPresent, Credentials};

pub const CLIENT_ID_VAR: &str = "SPOTIFY_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "SPOTIFY_CLIENT_SECRET";
pub const REDIRECT_URI_VAR: &str = "SPOTIFY_REDIRECT_URI";

/// Spotify credentials as read from the environment.
///
/// Loading never fails: absent values stay `None` until something asks for
/// [`Config::credentials`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

impl Config {
    pub fn from_env() -> Config {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("Loaded environment from {}", path.display()),
            Err(e) => log::debug!("No .env file loaded: {e}"),
        }
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        Config {
            client_id: lookup(CLIENT_ID_VAR),
            client_secret: lookup(CLIENT_SECRET_VAR),
            redirect_uri: lookup(REDIRECT_URI_VAR),
        }
    }

    /// Names of the variables that are unset or empty.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (CLIENT_ID_VAR, &self.client_id),
            (CLIENT_SECRET_VAR, &self.client_secret),
            (REDIRECT_URI_VAR, &self.redirect_uri),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
        .map(|(name, _)| name)
        .collect()
    }

    pub fn credentials(&self) -> Result<Credentials<AuthCodeNotPresent>> {
        match (&self.client_id, &self.client_secret, &self.redirect_uri) {
            (Some(id), Some(secret), Some(redirect_uri)) if self.missing().is_empty() => {
                Ok(Credentials::new(id, secret, redirect_uri))
            }
            _ => Err(Error::MissingCredentials(self.missing())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn reads_all_three_values() {
        let config = Config::from_lookup(lookup_from(&[
            (CLIENT_ID_VAR, "id"),
            (CLIENT_SECRET_VAR, "secret"),
            (REDIRECT_URI_VAR, "http://localhost:8888/callback"),
        ]));

        assert_eq!(config.client_id.as_deref(), Some("id"));
        assert_eq!(config.client_secret.as_deref(), Some("secret"));
        assert_eq!(
            config.redirect_uri.as_deref(),
            Some("http://localhost:8888/callback")
        );
        assert!(config.missing().is_empty());
        assert!(config.credentials().is_ok());
    }

    #[test]
    fn absent_values_do_not_fail_loading() {
        let config = Config::from_lookup(lookup_from(&[(CLIENT_ID_VAR, "id")]));

        assert_eq!(config.client_secret, None);
        assert_eq!(config.missing(), vec![CLIENT_SECRET_VAR, REDIRECT_URI_VAR]);
    }

    #[test]
    fn credentials_name_every_missing_variable() {
        let config = Config::from_lookup(lookup_from(&[(CLIENT_SECRET_VAR, "")]));

        match config.credentials() {
            Err(Error::MissingCredentials(missing)) => assert_eq!(
                missing,
                vec![CLIENT_ID_VAR, CLIENT_SECRET_VAR, REDIRECT_URI_VAR]
            ),
            other => panic!("expected missing credentials, got {other:?}"),
        }
    }
}
