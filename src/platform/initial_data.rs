//! Initial-data blob mining: watch-page enrichment, playlists and search
//!
//! Next to the player response, pages embed a second JSON blob
//! (`ytInitialData`) feeding the page UI. It carries what the player response
//! does not: sentiment statistics, related videos, owner thumbnails, playlist
//! listings and search results. Only the renderer paths this crate consumes
//! are typed out; everything else is left to serde to skip.

use super::metadata::embedded_object;
use crate::error::PlayersigError;
use serde::de::DeserializeOwned;
use serde::Deserialize;

const INITIAL_DATA_MARKERS: [&str; 2] = [r#"window["ytInitialData"]"#, "ytInitialData"];

/// Locates the initial-data blob and parses it into the requested view.
/// Returns `Ok(None)` when the page carries no such blob.
pub fn scrape_initial_data<T: DeserializeOwned>(body: &str) -> crate::Result<Option<T>> {
    for marker in INITIAL_DATA_MARKERS {
        if let Some(json) = embedded_object(body, marker) {
            return Ok(Some(serde_json::from_str(json)?));
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailHolder {
    pub thumbnails: Option<Vec<Thumbnail>>,
}

/// Text as the page renderers carry it: either a plain `simpleText` or a
/// list of runs, the first of which may link to a channel.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRuns {
    pub simple_text: Option<String>,
    pub runs: Option<Vec<TextRun>>,
}

impl TextRuns {
    pub(crate) fn text(&self) -> Option<String> {
        self.simple_text
            .clone()
            .or_else(|| self.runs.as_ref()?.first()?.text.clone())
    }

    fn first_run(&self) -> Option<&TextRun> {
        self.runs.as_ref()?.first()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub text: Option<String>,
    pub navigation_endpoint: Option<NavigationEndpoint>,
}

impl TextRun {
    fn browse_id(&self) -> Option<String> {
        self.navigation_endpoint
            .as_ref()?
            .browse_endpoint
            .as_ref()?
            .browse_id
            .clone()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEndpoint {
    pub browse_endpoint: Option<BrowseEndpoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseEndpoint {
    pub browse_id: Option<String>,
}

// --- watch-page view -------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInitialData {
    pub contents: Option<VideoContents>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoContents {
    pub two_column_watch_next_results: Option<TwoColumnWatchNextResults>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoColumnWatchNextResults {
    pub results: Option<WatchNextResults>,
    pub secondary_results: Option<SecondaryResultsOuter>,
}

#[derive(Debug, Deserialize)]
pub struct WatchNextResults {
    pub results: Option<WatchNextResultsInner>,
}

#[derive(Debug, Deserialize)]
pub struct WatchNextResultsInner {
    pub contents: Option<Vec<WatchNextItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchNextItem {
    pub video_primary_info_renderer: Option<VideoPrimaryInfoRenderer>,
    pub video_secondary_info_renderer: Option<VideoSecondaryInfoRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPrimaryInfoRenderer {
    pub sentiment_bar: Option<SentimentBar>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentBar {
    pub sentiment_bar_renderer: Option<SentimentBarRenderer>,
}

#[derive(Debug, Deserialize)]
pub struct SentimentBarRenderer {
    pub tooltip: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSecondaryInfoRenderer {
    pub owner: Option<VideoOwner>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwner {
    pub video_owner_renderer: Option<VideoOwnerRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoOwnerRenderer {
    pub title: Option<TextRuns>,
    pub thumbnail: Option<ThumbnailHolder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryResultsOuter {
    pub secondary_results: Option<SecondaryResults>,
}

#[derive(Debug, Deserialize)]
pub struct SecondaryResults {
    pub results: Option<Vec<SecondaryResultItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryResultItem {
    pub compact_autoplay_renderer: Option<CompactAutoplayRenderer>,
    pub compact_video_renderer: Option<CompactVideoRenderer>,
}

#[derive(Debug, Deserialize)]
pub struct CompactAutoplayRenderer {
    pub contents: Option<Vec<SecondaryResultItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactVideoRenderer {
    pub video_id: Option<String>,
    pub title: Option<TextRuns>,
    pub long_byline_text: Option<TextRuns>,
    pub badges: Option<Vec<serde_json::Value>>,
    pub thumbnail: Option<ThumbnailHolder>,
}

impl VideoInitialData {
    fn watch_next(&self) -> Option<&TwoColumnWatchNextResults> {
        self.contents
            .as_ref()?
            .two_column_watch_next_results
            .as_ref()
    }

    fn watch_next_items(&self) -> Option<&Vec<WatchNextItem>> {
        self.watch_next()?
            .results
            .as_ref()?
            .results
            .as_ref()?
            .contents
            .as_ref()
    }

    /// Like/dislike counts from the sentiment bar tooltip (`"123 / 45"`)
    pub fn sentiment_counts(&self) -> Option<(u64, u64)> {
        let tooltip = self.watch_next_items()?.iter().find_map(|item| {
            item.video_primary_info_renderer
                .as_ref()?
                .sentiment_bar
                .as_ref()?
                .sentiment_bar_renderer
                .as_ref()?
                .tooltip
                .as_deref()
        })?;
        parse_sentiment_tooltip(tooltip)
    }

    /// Channel avatar thumbnails from the owner renderer
    pub fn owner_thumbnails(&self) -> Vec<Thumbnail> {
        self.watch_next_items()
            .and_then(|items| {
                items.iter().find_map(|item| {
                    item.video_secondary_info_renderer
                        .as_ref()?
                        .owner
                        .as_ref()?
                        .video_owner_renderer
                        .as_ref()?
                        .thumbnail
                        .as_ref()?
                        .thumbnails
                        .clone()
                })
            })
            .unwrap_or_default()
    }

    /// Related videos from the secondary-results column, including the
    /// autoplay slot
    pub fn related_videos(&self) -> Vec<RelatedVideo> {
        let mut related = Vec::new();
        let Some(items) = self
            .watch_next()
            .and_then(|watch| watch.secondary_results.as_ref())
            .and_then(|outer| outer.secondary_results.as_ref())
            .and_then(|inner| inner.results.as_ref())
        else {
            return related;
        };
        for item in items {
            if let Some(renderer) = &item.compact_video_renderer {
                related.extend(RelatedVideo::from_renderer(renderer));
            }
            if let Some(autoplay) = &item.compact_autoplay_renderer {
                for inner in autoplay.contents.iter().flatten() {
                    if let Some(renderer) = &inner.compact_video_renderer {
                        related.extend(RelatedVideo::from_renderer(renderer));
                    }
                }
            }
        }
        related
    }
}

fn parse_sentiment_tooltip(tooltip: &str) -> Option<(u64, u64)> {
    let mut counts = tooltip.split(" / ").map(|part| {
        part.chars()
            .filter(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse::<u64>()
            .ok()
    });
    Some((counts.next()??, counts.next()??))
}

/// A related video surfaced next to the watch page
#[derive(Debug, Clone)]
pub struct RelatedVideo {
    pub id: String,
    pub title: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub thumbnails: Vec<Thumbnail>,
    pub live: bool,
}

impl RelatedVideo {
    fn from_renderer(renderer: &CompactVideoRenderer) -> Option<Self> {
        let byline = renderer.long_byline_text.as_ref().and_then(TextRuns::first_run);
        Some(Self {
            id: renderer.video_id.clone()?,
            title: renderer.title.as_ref().and_then(TextRuns::text),
            author_id: byline.and_then(TextRun::browse_id),
            author_name: byline.and_then(|run| run.text.clone()),
            thumbnails: renderer
                .thumbnail
                .as_ref()
                .and_then(|holder| holder.thumbnails.clone())
                .unwrap_or_default(),
            live: renderer.badges.is_some(),
        })
    }
}

// --- playlist view ---------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInitialData {
    pub microformat: Option<PlaylistMicroformat>,
    pub sidebar: Option<PlaylistSidebar>,
    pub contents: Option<BrowseContents>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistMicroformat {
    pub microformat_data_renderer: Option<MicroformatDataRenderer>,
}

#[derive(Debug, Deserialize)]
pub struct MicroformatDataRenderer {
    pub title: Option<String>,
    pub thumbnail: Option<ThumbnailHolder>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSidebar {
    pub playlist_sidebar_renderer: Option<PlaylistSidebarRenderer>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistSidebarRenderer {
    pub items: Option<Vec<PlaylistSidebarItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSidebarItem {
    pub playlist_sidebar_secondary_info_renderer: Option<PlaylistSidebarSecondaryInfoRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSidebarSecondaryInfoRenderer {
    pub video_owner: Option<VideoOwner>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseContents {
    pub two_column_browse_results_renderer: Option<TwoColumnBrowseResultsRenderer>,
}

#[derive(Debug, Deserialize)]
pub struct TwoColumnBrowseResultsRenderer {
    pub tabs: Option<Vec<BrowseTab>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseTab {
    pub tab_renderer: Option<TabRenderer>,
}

#[derive(Debug, Deserialize)]
pub struct TabRenderer {
    pub content: Option<TabContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabContent {
    pub section_list_renderer: Option<SectionListRenderer>,
}

#[derive(Debug, Deserialize)]
pub struct SectionListRenderer {
    pub contents: Option<Vec<SectionItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionItem {
    pub item_section_renderer: Option<ItemSectionRenderer>,
}

#[derive(Debug, Deserialize)]
pub struct ItemSectionRenderer {
    pub contents: Option<Vec<ItemSectionContent>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSectionContent {
    pub playlist_video_list_renderer: Option<PlaylistVideoListRenderer>,
    pub video_renderer: Option<VideoRenderer>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistVideoListRenderer {
    pub contents: Option<Vec<PlaylistVideoItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistVideoItem {
    pub playlist_video_renderer: Option<PlaylistVideoRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistVideoRenderer {
    pub video_id: Option<String>,
    pub title: Option<TextRuns>,
    pub short_byline_text: Option<TextRuns>,
    pub thumbnail: Option<ThumbnailHolder>,
    pub length_seconds: Option<String>,
}

/// Scraped playlist listing
#[derive(Debug, Clone)]
pub struct PlaylistMetadata {
    pub id: String,
    pub title: String,
    pub thumbnails: Vec<Thumbnail>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub author_thumbnails: Vec<Thumbnail>,
    pub entries: Vec<PlaylistEntry>,
}

#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    pub id: String,
    pub title: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub thumbnails: Vec<Thumbnail>,
    pub duration_seconds: Option<u64>,
}

/// Builds the playlist record out of the initial-data view. Title and owner
/// are required; a listing without them is a removed or private playlist.
pub(crate) fn assemble_playlist(
    playlist_id: &str,
    data: &PlaylistInitialData,
) -> crate::Result<PlaylistMetadata> {
    let microformat = data
        .microformat
        .as_ref()
        .and_then(|m| m.microformat_data_renderer.as_ref());
    let title = microformat.and_then(|m| m.title.clone()).ok_or_else(|| {
        PlayersigError::PlaylistUnavailable("title missing from listing".to_string())
    })?;

    let owner = data
        .sidebar
        .as_ref()
        .and_then(|sidebar| sidebar.playlist_sidebar_renderer.as_ref())
        .and_then(|renderer| renderer.items.as_ref())
        .and_then(|items| items.get(1))
        .and_then(|item| item.playlist_sidebar_secondary_info_renderer.as_ref())
        .and_then(|info| info.video_owner.as_ref())
        .and_then(|owner| owner.video_owner_renderer.as_ref());
    let owner_run = owner
        .and_then(|renderer| renderer.title.as_ref())
        .and_then(TextRuns::first_run)
        .ok_or_else(|| {
            PlayersigError::PlaylistUnavailable("owner missing from listing".to_string())
        })?;

    let entries = data
        .contents
        .as_ref()
        .and_then(|contents| contents.two_column_browse_results_renderer.as_ref())
        .and_then(|browse| browse.tabs.as_ref())
        .and_then(|tabs| tabs.first())
        .and_then(|tab| tab.tab_renderer.as_ref())
        .and_then(|tab| tab.content.as_ref())
        .and_then(|content| content.section_list_renderer.as_ref())
        .and_then(|list| list.contents.as_ref())
        .and_then(|sections| sections.first())
        .and_then(|section| section.item_section_renderer.as_ref())
        .and_then(|section| section.contents.as_ref())
        .and_then(|items| items.first())
        .and_then(|item| item.playlist_video_list_renderer.as_ref())
        .and_then(|list| list.contents.as_ref())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.playlist_video_renderer.as_ref())
                .filter_map(playlist_entry)
                .collect()
        })
        .unwrap_or_default();

    Ok(PlaylistMetadata {
        id: playlist_id.to_string(),
        title,
        thumbnails: microformat
            .and_then(|m| m.thumbnail.as_ref())
            .and_then(|holder| holder.thumbnails.clone())
            .unwrap_or_default(),
        author_id: owner_run.browse_id(),
        author_name: owner_run.text.clone(),
        author_thumbnails: owner
            .and_then(|renderer| renderer.thumbnail.as_ref())
            .and_then(|holder| holder.thumbnails.clone())
            .unwrap_or_default(),
        entries,
    })
}

fn playlist_entry(renderer: &PlaylistVideoRenderer) -> Option<PlaylistEntry> {
    let byline = renderer.short_byline_text.as_ref().and_then(TextRuns::first_run);
    Some(PlaylistEntry {
        id: renderer.video_id.clone()?,
        title: renderer.title.as_ref().and_then(TextRuns::text),
        author_id: byline.and_then(TextRun::browse_id),
        author_name: byline.and_then(|run| run.text.clone()),
        thumbnails: renderer
            .thumbnail
            .as_ref()
            .and_then(|holder| holder.thumbnails.clone())
            .unwrap_or_default(),
        duration_seconds: renderer.length_seconds.as_deref().and_then(|s| s.parse().ok()),
    })
}

// --- search view -----------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInitialData {
    pub contents: Option<SearchContents>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchContents {
    pub two_column_search_results_renderer: Option<TwoColumnSearchResultsRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoColumnSearchResultsRenderer {
    pub primary_contents: Option<PrimaryContents>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryContents {
    pub section_list_renderer: Option<SectionListRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRenderer {
    pub video_id: Option<String>,
    pub title: Option<TextRuns>,
    pub long_byline_text: Option<TextRuns>,
    pub thumbnail: Option<ThumbnailHolder>,
}

/// One search result row
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub thumbnails: Vec<Thumbnail>,
}

pub(crate) fn assemble_search_results(
    data: &SearchInitialData,
) -> crate::Result<Vec<SearchResult>> {
    let items = data
        .contents
        .as_ref()
        .and_then(|contents| contents.two_column_search_results_renderer.as_ref())
        .and_then(|renderer| renderer.primary_contents.as_ref())
        .and_then(|primary| primary.section_list_renderer.as_ref())
        .and_then(|list| list.contents.as_ref())
        .and_then(|sections| sections.first())
        .and_then(|section| section.item_section_renderer.as_ref())
        .and_then(|section| section.contents.as_ref())
        .ok_or(PlayersigError::SearchUnavailable)?;

    Ok(items
        .iter()
        .filter_map(|item| item.video_renderer.as_ref())
        .filter_map(search_result)
        .collect())
}

fn search_result(renderer: &VideoRenderer) -> Option<SearchResult> {
    let byline = renderer.long_byline_text.as_ref().and_then(TextRuns::first_run);
    Some(SearchResult {
        id: renderer.video_id.clone()?,
        title: renderer.title.as_ref().and_then(TextRuns::text).unwrap_or_default(),
        author_id: byline.and_then(TextRun::browse_id),
        author_name: byline.and_then(|run| run.text.clone()),
        thumbnails: renderer
            .thumbnail
            .as_ref()
            .and_then(|holder| holder.thumbnails.clone())
            .unwrap_or_default(),
    })
}
