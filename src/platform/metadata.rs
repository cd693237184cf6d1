//! Embedded-JSON extraction and stream-record assembly
//!
//! Watch pages carry their data as JSON blobs assigned to well-known names
//! inside inline scripts. The blobs are located with the same balanced-brace
//! scanner the cipher core uses, then parsed with serde into the handful of
//! fields this crate cares about.

use super::cipher::scan::{balanced_region, skip_ws};
use super::cipher::{decipher_url, CompiledProcedure, Decipherer};
use super::client::PageClient;
use super::initial_data::{
    assemble_playlist, assemble_search_results, scrape_initial_data, PlaylistInitialData,
    PlaylistMetadata, RelatedVideo, SearchInitialData, SearchResult, TextRuns, Thumbnail,
    ThumbnailHolder, VideoInitialData,
};
use super::locator::{player_js_url, PLATFORM_ORIGIN};
use crate::error::PlayersigError;
use crate::utils::url::extract_video_id;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};
use url::form_urlencoded;

const BLOCK_MARKERS: [&str; 2] = [
    "To continue with your YouTube experience, please fill out the form below.",
    "https://www.google.com/sorry/index",
];

/// Rejects interstitial pages served instead of actual content
pub fn check_blocked(body: &str) -> crate::Result<()> {
    if BLOCK_MARKERS.iter().any(|marker| body.contains(marker)) {
        return Err(PlayersigError::Blocked);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct PlayerConfig {
    pub args: Option<PlayerArgs>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerArgs {
    pub player_response: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub playability_status: Option<PlayabilityStatus>,
    pub video_details: Option<VideoDetails>,
    pub streaming_data: Option<StreamingData>,
    pub microformat: Option<Microformat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Microformat {
    pub player_microformat_renderer: Option<PlayerMicroformatRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMicroformatRenderer {
    pub description: Option<TextRuns>,
    pub publish_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayabilityStatus {
    pub status: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetails {
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub channel_id: Option<String>,
    pub length_seconds: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub short_description: Option<String>,
    pub view_count: Option<String>,
    pub thumbnail: Option<ThumbnailHolder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingData {
    pub adaptive_formats: Option<Vec<AdaptiveFormat>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveFormat {
    pub itag: Option<u32>,
    pub url: Option<String>,
    pub signature_cipher: Option<String>,
    pub cipher: Option<String>,
    pub mime_type: Option<String>,
    pub bitrate: Option<u64>,
    pub fps: Option<u32>,
    pub quality_label: Option<String>,
}

/// Locates and parses the player-response blob from a watch-page body.
///
/// Newer pages assign it bare (`ytInitialPlayerResponse = {...}`); older ones
/// nest it as a JSON string inside `ytplayer.config`. A non-OK playability
/// status is surfaced with the platform's reason.
pub fn scrape_player_response(body: &str) -> crate::Result<PlayerResponse> {
    let response: PlayerResponse = if let Some(json) = embedded_object(body, "ytInitialPlayerResponse")
    {
        serde_json::from_str(json)?
    } else if let Some(json) = embedded_object(body, "ytplayer.config") {
        let config: PlayerConfig = serde_json::from_str(json)?;
        let raw = config
            .args
            .and_then(|args| args.player_response)
            .ok_or_else(|| {
                PlayersigError::VideoUnavailable("player response missing from config".to_string())
            })?;
        serde_json::from_str(&raw)?
    } else {
        return Err(PlayersigError::VideoUnavailable(
            "player response not found in page".to_string(),
        ));
    };

    check_playability(&response)?;
    Ok(response)
}

fn check_playability(response: &PlayerResponse) -> crate::Result<()> {
    let status = response.playability_status.as_ref();
    match status.and_then(|s| s.status.as_deref()) {
        Some("OK") => Ok(()),
        other => {
            let reason = status
                .and_then(|s| s.reason.clone())
                .or_else(|| other.map(str::to_string))
                .unwrap_or_else(|| "unknown playability status".to_string());
            Err(PlayersigError::VideoUnavailable(reason))
        }
    }
}

/// Finds `<marker> = {...}` in the body and returns the balanced JSON object
/// including its braces.
pub(crate) fn embedded_object<'a>(body: &'a str, marker: &str) -> Option<&'a str> {
    let bytes = body.as_bytes();
    let mut from = 0usize;
    while let Some(found) = body[from..].find(marker) {
        let mut i = from + found + marker.len();
        from = i;
        i = skip_ws(bytes, i);
        if bytes.get(i) != Some(&b'=') {
            continue;
        }
        i = skip_ws(bytes, i + 1);
        if bytes.get(i) != Some(&b'{') {
            continue;
        }
        if let Some(region) = balanced_region(body, i) {
            return Some(region);
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

/// One playable stream with its ready-to-use URL
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub url: String,
    pub kind: StreamKind,
    pub mime_type: Option<String>,
    pub bitrate: Option<u64>,
    pub fps: Option<u32>,
    pub quality_label: Option<String>,
}

/// Resolves every adaptive format into a stream record, deciphering signed
/// formats through the compiled procedure. A failing decipher fails the whole
/// item; callers that prefer partial results can drop the streams themselves.
pub fn assemble_streams(
    streaming_data: Option<&StreamingData>,
    procedure: &CompiledProcedure,
) -> crate::Result<Vec<StreamInfo>> {
    let mut streams = Vec::new();
    let Some(formats) = streaming_data.and_then(|data| data.adaptive_formats.as_deref()) else {
        return Ok(streams);
    };
    for format in formats {
        let descriptor = format
            .signature_cipher
            .as_deref()
            .or(format.cipher.as_deref());
        let url = match (&format.url, descriptor) {
            (_, Some(descriptor)) => decipher_url(descriptor, procedure)?,
            (Some(url), None) => url.clone(),
            (None, None) => {
                warn!(itag = format.itag, "format carries neither url nor cipher");
                continue;
            }
        };
        let kind = match format.mime_type.as_deref() {
            Some(mime) if mime.starts_with("audio/") => StreamKind::Audio,
            _ => StreamKind::Video,
        };
        streams.push(StreamInfo {
            url,
            kind,
            mime_type: format.mime_type.clone(),
            bitrate: format.bitrate,
            fps: format.fps,
            quality_label: format.quality_label.clone(),
        });
    }
    Ok(streams)
}

/// Scraped metadata for one video, streams already deciphered
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub channel_id: Option<String>,
    pub duration_seconds: Option<u64>,
    pub keywords: Vec<String>,
    pub description: Option<String>,
    pub view_count: Option<u64>,
    pub thumbnails: Vec<Thumbnail>,
    pub author_thumbnails: Vec<Thumbnail>,
    pub likes: Option<u64>,
    pub dislikes: Option<u64>,
    pub publish_date: Option<NaiveDate>,
    pub related: Vec<RelatedVideo>,
    pub streams: Vec<StreamInfo>,
}

/// High-level scraper: fetches the watch page and the player script, then
/// assembles metadata with playable stream URLs.
pub struct Scraper {
    client: PageClient,
    decipherer: Decipherer,
    origin: String,
}

impl Scraper {
    pub fn new() -> crate::Result<Self> {
        Self::with_origin(PLATFORM_ORIGIN)
    }

    fn with_origin(origin: &str) -> crate::Result<Self> {
        let client = PageClient::new()?;
        Ok(Self {
            decipherer: Decipherer::with_client(client.clone()),
            client,
            origin: origin.to_string(),
        })
    }

    /// Scrape metadata and streams for a video ID
    pub async fn video(&self, video_id: &str) -> crate::Result<VideoMetadata> {
        let page = self.client.fetch_text(&self.watch_url(video_id)).await?;
        check_blocked(&page)?;

        let response = scrape_player_response(&page)?;
        let details = response.video_details.as_ref();
        if let Some(actual) = details.and_then(|d| d.video_id.as_deref()) {
            if actual != video_id {
                return Err(PlayersigError::VideoUnavailable(format!(
                    "page returned video {actual}"
                )));
            }
        }

        let script_url = player_js_url(&page)?;
        debug!(script_url, "resolving decipher procedure");
        let procedure = self.decipherer.procedure_for(&script_url).await?;
        let streams = assemble_streams(response.streaming_data.as_ref(), &procedure)?;

        let microformat = response
            .microformat
            .as_ref()
            .and_then(|m| m.player_microformat_renderer.as_ref());
        let mut video = VideoMetadata {
            id: video_id.to_string(),
            title: details
                .and_then(|d| d.title.clone())
                .unwrap_or_default(),
            author: details.and_then(|d| d.author.clone()),
            channel_id: details.and_then(|d| d.channel_id.clone()),
            duration_seconds: details
                .and_then(|d| d.length_seconds.as_deref())
                .and_then(|s| s.parse().ok()),
            keywords: details.and_then(|d| d.keywords.clone()).unwrap_or_default(),
            description: microformat
                .and_then(|m| m.description.as_ref())
                .and_then(TextRuns::text)
                .or_else(|| details.and_then(|d| d.short_description.clone())),
            view_count: details
                .and_then(|d| d.view_count.as_deref())
                .and_then(|s| s.parse().ok()),
            thumbnails: details
                .and_then(|d| d.thumbnail.as_ref())
                .and_then(|holder| holder.thumbnails.clone())
                .unwrap_or_default(),
            author_thumbnails: Vec::new(),
            likes: None,
            dislikes: None,
            publish_date: microformat.and_then(|m| m.publish_date),
            related: Vec::new(),
            streams,
        };

        match scrape_initial_data::<VideoInitialData>(&page)? {
            Some(initial) => {
                if let Some((likes, dislikes)) = initial.sentiment_counts() {
                    video.likes = Some(likes);
                    video.dislikes = Some(dislikes);
                }
                video.author_thumbnails = initial.owner_thumbnails();
                video.related = initial.related_videos();
            }
            None => debug!(video_id, "initial data not present, skipping enrichment"),
        }

        Ok(video)
    }

    /// Scrape metadata and streams for a full watch URL
    pub async fn video_from_url(&self, url: &str) -> crate::Result<VideoMetadata> {
        let video_id = extract_video_id(url)?;
        self.video(&video_id).await
    }

    /// Scrape a playlist listing: title, owner and entries
    pub async fn playlist(&self, playlist_id: &str) -> crate::Result<PlaylistMetadata> {
        let page = self.client.fetch_text(&self.playlist_url(playlist_id)).await?;
        check_blocked(&page)?;

        let data: PlaylistInitialData = scrape_initial_data(&page)?.ok_or_else(|| {
            PlayersigError::PlaylistUnavailable("listing data not found in page".to_string())
        })?;
        assemble_playlist(playlist_id, &data)
    }

    /// Run a video search and scrape the first page of results
    pub async fn search(&self, query: &str) -> crate::Result<Vec<SearchResult>> {
        let page = self.client.fetch_text(&self.search_url(query)).await?;
        check_blocked(&page)?;

        let data: SearchInitialData =
            scrape_initial_data(&page)?.ok_or(PlayersigError::SearchUnavailable)?;
        assemble_search_results(&data)
    }

    fn watch_url(&self, video_id: &str) -> String {
        format!(
            "{}/watch?v={video_id}&gl=US&hl=en&has_verified=1&bpctr=9999999999",
            self.origin
        )
    }

    fn playlist_url(&self, playlist_id: &str) -> String {
        format!(
            "{}/playlist?list={playlist_id}&gl=US&hl=en&has_verified=1&bpctr=9999999999",
            self.origin
        )
    }

    fn search_url(&self, query: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
        // sp=EgIQAQ%3D%3D filters results down to videos
        format!(
            "{}/results?search_query={encoded}&sp=EgIQAQ%253D%253D&gl=US&hl=en",
            self.origin
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::cipher::fixtures::{SAMPLE_DECIPHERED, SAMPLE_SCRIPT};

    fn ok_player_response(video_id: &str) -> serde_json::Value {
        serde_json::json!({
            "playabilityStatus": {"status": "OK"},
            "videoDetails": {
                "videoId": video_id,
                "title": "Me at the zoo",
                "author": "jawed",
                "lengthSeconds": "19",
                "keywords": ["zoo"],
                "viewCount": "100000001",
                "thumbnail": {"thumbnails": [
                    {"url": "https://i.ytimg.com/vi/default.jpg", "width": 120, "height": 90}
                ]}
            },
            "microformat": {"playerMicroformatRenderer": {
                "description": {"simpleText": "The first video on the site"},
                "publishDate": "2005-04-23"
            }},
            "streamingData": {"adaptiveFormats": [
                {
                    "itag": 140,
                    "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"",
                    "bitrate": 130_000,
                    "signatureCipher":
                        "s=abcdefghij&sp=sig&url=https%3A%2F%2Fmedia.example%2Faudio"
                },
                {
                    "itag": 137,
                    "mimeType": "video/mp4; codecs=\"avc1\"",
                    "bitrate": 2_000_000,
                    "fps": 30,
                    "qualityLabel": "1080p",
                    "url": "https://media.example/direct"
                }
            ]}
        })
    }

    #[test]
    fn detects_block_pages() {
        assert!(check_blocked("<html>https://www.google.com/sorry/index</html>").is_err());
        assert!(check_blocked("<html>fine</html>").is_ok());
    }

    #[test]
    fn scrapes_bare_player_response() {
        let page = format!(
            "<html><script>var ytInitialPlayerResponse = {};</script></html>",
            ok_player_response("abc123")
        );
        let response = scrape_player_response(&page).unwrap();
        let details = response.video_details.unwrap();
        assert_eq!(details.video_id.as_deref(), Some("abc123"));
        assert_eq!(details.title.as_deref(), Some("Me at the zoo"));
    }

    #[test]
    fn scrapes_config_nested_player_response() {
        let inner = ok_player_response("abc123").to_string();
        let config = serde_json::json!({"args": {"player_response": inner}});
        let page = format!("<html><script>ytplayer.config = {config};</script></html>");
        let response = scrape_player_response(&page).unwrap();
        assert_eq!(
            response
                .video_details
                .and_then(|d| d.video_id)
                .as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn non_ok_playability_surfaces_reason() {
        let page = r#"<script>var ytInitialPlayerResponse = {"playabilityStatus":
            {"status":"LOGIN_REQUIRED","reason":"Sign in to confirm your age"}};</script>"#;
        let err = scrape_player_response(page).unwrap_err();
        match err {
            PlayersigError::VideoUnavailable(reason) => {
                assert_eq!(reason, "Sign in to confirm your age")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_player_response_is_unavailable() {
        let err = scrape_player_response("<html>nothing embedded</html>").unwrap_err();
        assert!(matches!(err, PlayersigError::VideoUnavailable(_)));
    }

    #[test]
    fn assembles_direct_and_ciphered_streams() {
        let response: PlayerResponse =
            serde_json::from_value(ok_player_response("abc123")).unwrap();
        let procedure = CompiledProcedure::compile(SAMPLE_SCRIPT).unwrap();
        let streams = assemble_streams(response.streaming_data.as_ref(), &procedure).unwrap();

        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].kind, StreamKind::Audio);
        assert_eq!(
            streams[0].url,
            format!("https://media.example/audio&sig={SAMPLE_DECIPHERED}")
        );
        assert_eq!(streams[1].kind, StreamKind::Video);
        assert_eq!(streams[1].url, "https://media.example/direct");
        assert_eq!(streams[1].quality_label.as_deref(), Some("1080p"));
    }

    fn sample_initial_data() -> serde_json::Value {
        serde_json::json!({
            "contents": {"twoColumnWatchNextResults": {
                "results": {"results": {"contents": [
                    {"videoPrimaryInfoRenderer": {"sentimentBar": {"sentimentBarRenderer":
                        {"tooltip": "3,897,807 / 119,319"}}}},
                    {"videoSecondaryInfoRenderer": {"owner": {"videoOwnerRenderer": {
                        "thumbnail": {"thumbnails": [{"url": "https://yt3.ggpht.com/a.jpg"}]}
                    }}}}
                ]}},
                "secondaryResults": {"secondaryResults": {"results": [
                    {"compactVideoRenderer": {
                        "videoId": "rel456",
                        "title": {"simpleText": "Related clip"},
                        "longBylineText": {"runs": [{"text": "Channel",
                            "navigationEndpoint": {"browseEndpoint": {"browseId": "UC123"}}}]}
                    }}
                ]}}
            }}
        })
    }

    #[tokio::test]
    async fn scrapes_video_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/base.js")
            .with_body(SAMPLE_SCRIPT)
            .create_async()
            .await;
        let page = format!(
            "<html><script>var ytInitialPlayerResponse = {};</script>\
             <script>window[\"ytInitialData\"] = {};</script>\
             <script>\"jsUrl\":\"{}/base.js\"</script></html>",
            ok_player_response("test123"),
            sample_initial_data(),
            server.url()
        );
        server
            .mock("GET", mockito::Matcher::Regex("^/watch.*".to_string()))
            .with_body(page)
            .create_async()
            .await;

        let scraper = Scraper::with_origin(&server.url()).unwrap();
        let video = scraper.video("test123").await.unwrap();

        assert_eq!(video.title, "Me at the zoo");
        assert_eq!(video.duration_seconds, Some(19));
        assert_eq!(video.view_count, Some(100_000_001));
        assert_eq!(
            video.description.as_deref(),
            Some("The first video on the site")
        );
        assert_eq!(
            video.publish_date,
            NaiveDate::from_ymd_opt(2005, 4, 23)
        );
        assert_eq!(video.thumbnails[0].url, "https://i.ytimg.com/vi/default.jpg");
        assert_eq!(video.likes, Some(3_897_807));
        assert_eq!(video.dislikes, Some(119_319));
        assert_eq!(video.author_thumbnails[0].url, "https://yt3.ggpht.com/a.jpg");
        assert_eq!(video.related.len(), 1);
        assert_eq!(video.related[0].id, "rel456");
        assert_eq!(video.streams.len(), 2);
        assert_eq!(
            video.streams[0].url,
            format!("https://media.example/audio&sig={SAMPLE_DECIPHERED}")
        );
    }

    #[tokio::test]
    async fn video_without_initial_data_still_scrapes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/base.js")
            .with_body(SAMPLE_SCRIPT)
            .create_async()
            .await;
        let page = format!(
            "<html><script>var ytInitialPlayerResponse = {};</script>\
             <script>\"jsUrl\":\"{}/base.js\"</script></html>",
            ok_player_response("test123"),
            server.url()
        );
        server
            .mock("GET", mockito::Matcher::Regex("^/watch.*".to_string()))
            .with_body(page)
            .create_async()
            .await;

        let scraper = Scraper::with_origin(&server.url()).unwrap();
        let video = scraper.video("test123").await.unwrap();

        assert_eq!(video.title, "Me at the zoo");
        assert_eq!(video.likes, None);
        assert!(video.related.is_empty());
    }

    #[tokio::test]
    async fn scrapes_playlist_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let listing = serde_json::json!({
            "microformat": {"microformatDataRenderer": {"title": "4k Resolution"}},
            "sidebar": {"playlistSidebarRenderer": {"items": [
                {},
                {"playlistSidebarSecondaryInfoRenderer": {"videoOwner": {"videoOwnerRenderer": {
                    "title": {"runs": [{"text": "YouTube",
                        "navigationEndpoint": {"browseEndpoint": {"browseId": "UCBR8"}}}]}
                }}}}
            ]}},
            "contents": {"twoColumnBrowseResultsRenderer": {"tabs": [{"tabRenderer":
                {"content": {"sectionListRenderer": {"contents": [{"itemSectionRenderer":
                    {"contents": [{"playlistVideoListRenderer": {"contents": [
                        {"playlistVideoRenderer": {
                            "videoId": "N0m1XmvBey8",
                            "title": {"runs": [{"text": "Life in the Garden"}]},
                            "lengthSeconds": "114"
                        }}
                    ]}}]}}]}}}}]}}
        });
        let page = format!("<html><script>var ytInitialData = {listing};</script></html>");
        server
            .mock("GET", mockito::Matcher::Regex("^/playlist.*".to_string()))
            .with_body(page)
            .create_async()
            .await;

        let scraper = Scraper::with_origin(&server.url()).unwrap();
        let playlist = scraper.playlist("PL5BF9").await.unwrap();

        assert_eq!(playlist.title, "4k Resolution");
        assert_eq!(playlist.author_name.as_deref(), Some("YouTube"));
        assert_eq!(playlist.entries.len(), 1);
        assert_eq!(playlist.entries[0].id, "N0m1XmvBey8");
    }

    #[tokio::test]
    async fn scrapes_search_results_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let results = serde_json::json!({
            "contents": {"twoColumnSearchResultsRenderer": {"primaryContents":
                {"sectionListRenderer": {"contents": [{"itemSectionRenderer": {"contents": [
                    {"videoRenderer": {
                        "videoId": "abc111",
                        "title": {"runs": [{"text": "First hit"}]}
                    }}
                ]}}]}}}}
        });
        let page = format!("<html><script>var ytInitialData = {results};</script></html>");
        server
            .mock("GET", mockito::Matcher::Regex("^/results.*".to_string()))
            .with_body(page)
            .create_async()
            .await;

        let scraper = Scraper::with_origin(&server.url()).unwrap();
        let found = scraper.search("first hit").await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "abc111");
        assert_eq!(found[0].title, "First hit");
    }

    #[tokio::test]
    async fn mismatched_video_id_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let page = format!(
            "<html><script>var ytInitialPlayerResponse = {}</script></html>",
            ok_player_response("other99")
        );
        server
            .mock("GET", mockito::Matcher::Regex("^/watch.*".to_string()))
            .with_body(page)
            .create_async()
            .await;

        let scraper = Scraper::with_origin(&server.url()).unwrap();
        let err = scraper.video("test123").await.unwrap_err();
        assert!(matches!(err, PlayersigError::VideoUnavailable(_)));
    }
}
