use std::marker::PhantomData;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

pub type PlaylistID = GenericResourceIdentifier<Playlist>;
pub type TrackID = GenericResourceIdentifier<Track>;

const ID_PATTERN: &str = r"^[0-9A-Za-z]{22,28}$";
const URI_PATTERN: &str = r"^spotify:(track|playlist):([0-9A-Za-z]{22,28})$";
const URL_HOST: &str = "open.spotify.com";

static ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(ID_PATTERN).unwrap());
static URI_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(URI_PATTERN).unwrap());

pub trait ResourceTypes {
    const NAME: &'static str;
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Track;
impl ResourceTypes for Track {
    const NAME: &'static str = "track";
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playlist;
impl ResourceTypes for Playlist {
    const NAME: &'static str = "playlist";
}

/// A Spotify ID tagged with the kind of resource it names.
///
/// Accepts a bare ID, a `spotify:<kind>:<id>` URI or an
/// `https://open.spotify.com/<kind>/<id>` link. Links may carry a locale
/// segment (`/intl-de/`) and any query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericResourceIdentifier<R>
where
    R: ResourceTypes,
{
    id: String,
    resource_type: PhantomData<R>,
}

impl<R: ResourceTypes> GenericResourceIdentifier<R> {
    pub fn new(identifier: &str) -> Result<GenericResourceIdentifier<R>> {
        let identifier = identifier.trim();

        let id = if ID_REGEX.is_match(identifier) {
            Some(identifier.to_string())
        } else if let Some(captures) = URI_REGEX.captures(identifier) {
            (&captures[1] == R::NAME).then(|| captures[2].to_string())
        } else {
            id_from_url::<R>(identifier)
        };

        match id {
            Some(id) => Ok(GenericResourceIdentifier {
                id,
                resource_type: PhantomData,
            }),
            None => Err(Error::InvalidIdentifier {
                kind: R::NAME,
                input: identifier.to_string(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn uri(&self) -> String {
        format!("spotify:{}:{}", R::NAME, self.id)
    }

    pub fn url(&self) -> String {
        format!("https://{URL_HOST}/{}/{}", R::NAME, self.id)
    }
}

fn id_from_url<R: ResourceTypes>(identifier: &str) -> Option<String> {
    let url = Url::parse(identifier).ok()?;
    if url.host_str() != Some(URL_HOST) {
        return None;
    }
    let mut segments = url.path_segments()?.skip_while(|s| *s != R::NAME);
    segments.next()?;
    segments
        .next()
        .filter(|id| ID_REGEX.is_match(id))
        .map(str::to_string)
}
