use playlist_bridge::ytmusic::{PlaylistId, YtMusic};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn list_item(title: &str, artist: &str, video_id: &str) -> serde_json::Value {
    json!({
        "musicResponsiveListItemRenderer": {
            "flexColumns": [
                { "musicResponsiveListItemFlexColumnRenderer": { "text": { "runs": [{ "text": title }] } } },
                { "musicResponsiveListItemFlexColumnRenderer": { "text": { "runs": [
                    { "text": artist, "navigationEndpoint": {} }
                ] } } }
            ],
            "playlistItemData": { "videoId": video_id }
        }
    })
}

#[tokio::test]
async fn fetches_playlist_through_browse() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/youtubei/v1/browse"))
        .and(body_partial_json(json!({
            "browseId": "VLPLroadtrip",
            "context": { "client": { "clientName": "WEB_REMIX" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "header": { "musicDetailHeaderRenderer": { "title": { "runs": [{ "text": "Road Trip" }] } } },
            "contents": { "singleColumnBrowseResultsRenderer": { "tabs": [{ "tabRenderer": { "content": {
                "sectionListRenderer": { "contents": [{ "musicPlaylistShelfRenderer": { "contents": [
                    list_item("Africa", "Toto", "v1"),
                    list_item("Holding Out for a Hero", "Bonnie Tyler", "v2")
                ] } }] }
            } } }] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = PlaylistId::from_url("https://music.youtube.com/playlist?list=PLroadtrip").unwrap();
    let playlist = YtMusic::with_base_url(server.uri())
        .get_playlist(&id, 100)
        .await
        .unwrap();

    assert_eq!(playlist.title.as_deref(), Some("Road Trip"));
    let titles: Vec<_> = playlist
        .tracks
        .iter()
        .map(|t| t.title.as_deref().unwrap())
        .collect();
    assert_eq!(titles, ["Africa", "Holding Out for a Hero"]);
    assert_eq!(playlist.tracks[1].artists, vec!["Bonnie Tyler".to_string()]);
    assert_eq!(playlist.tracks[0].video_id.as_deref(), Some("v1"));
}

#[tokio::test]
async fn http_errors_are_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let id = PlaylistId::from_url("https://music.youtube.com/playlist?list=PLgone").unwrap();
    let result = YtMusic::with_base_url(server.uri()).get_playlist(&id, 100).await;
    assert!(matches!(result, Err(playlist_bridge::Error::Http(_))));
}
