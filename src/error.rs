use crate::spotify::auth::AuthError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(
        "Spotify API credentials are not set in environment variables (missing: {})",
        .0.join(", ")
    )]
    MissingCredentials(Vec<&'static str>),

    #[error("{0}")]
    InvalidPlaylistUrl(&'static str),

    #[error("Invalid Spotify {kind} URL. Make sure it's a {kind} link.")]
    InvalidIdentifier { kind: &'static str, input: String },

    #[error("Not authenticated with Spotify, run the `auth` command first")]
    NotAuthenticated,

    #[error("Spotify API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: missing {0}")]
    UnexpectedResponse(&'static str),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}
