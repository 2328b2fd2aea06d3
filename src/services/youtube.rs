use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::config;
use crate::error::{IngestError, Result};
use crate::models::{ChannelInfo, UploadEntry};
use crate::utils::{decode_entities, parse_duration_seconds, parse_timestamp};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_MAX_PAGES: u32 = 200;

/// Bounds for one upload enumeration.
#[derive(Debug, Clone, Default)]
pub struct UploadQuery {
    /// Exclude uploads published strictly before this instant.
    pub since: Option<DateTime<Utc>>,
    /// Items per page, 1..=50. Defaults to 50.
    pub page_size: Option<u32>,
    /// Safety ceiling on pages fetched. Defaults to 200.
    pub max_pages: Option<u32>,
}

/// The upstream video platform as seen by the orchestrator. Implemented
/// by [`YouTubeClient`] in production and by stubs in tests.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Normalize any accepted channel input (canonical ID, @handle,
    /// profile URL, free text) to the canonical channel ID. `Ok(None)`
    /// means the channel genuinely does not exist; lookup-service
    /// failures surface as `Err(Service)` instead.
    async fn resolve_channel_id(&self, input: &str) -> Result<Option<String>>;

    async fn fetch_channel_info(&self, channel_id: &str) -> Result<ChannelInfo>;

    async fn fetch_uploads(&self, channel_id: &str, query: &UploadQuery)
        -> Result<Vec<UploadEntry>>;
}

/// Client for the YouTube Data API v3.
pub struct YouTubeClient {
    http: Client,
}

/// Where a raw channel input leads, decided without touching the network.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ResolveTarget {
    /// Input carries the canonical ID itself.
    Direct(String),
    /// Resolve via the handle-lookup endpoint.
    Handle(String),
    /// Resolve via free-text channel search, first match wins.
    Search(String),
    /// A well-formed URL we do not recognize as a channel reference.
    Unresolvable,
}

fn is_canonical_id(input: &str) -> bool {
    input.len() == 24
        && input.starts_with("UC")
        && input
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn classify_channel_input(input: &str) -> ResolveTarget {
    let input = input.trim();

    if is_canonical_id(input) {
        return ResolveTarget::Direct(input.to_string());
    }

    if let Some(handle) = input.strip_prefix('@') {
        return ResolveTarget::Handle(handle.to_string());
    }

    let url = match Url::parse(input) {
        Ok(url) => url,
        // Not a URL at all: treat the raw input as a search term.
        Err(_) => return ResolveTarget::Search(input.to_string()),
    };

    let platform_host = matches!(
        url.host_str(),
        Some("youtube.com") | Some("www.youtube.com") | Some("m.youtube.com")
    );
    if !platform_host {
        return ResolveTarget::Unresolvable;
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        // https://www.youtube.com/channel/UCTeLqJq1mXUX5WWoNXLmOIA
        ["channel", id, ..] => ResolveTarget::Direct((*id).to_string()),
        // https://youtube.com/@RobertsSpaceInd
        [handle, ..] if handle.starts_with('@') => {
            ResolveTarget::Handle(handle[1..].to_string())
        }
        // https://www.youtube.com/c/RobertsSpaceInd, /user/RobertsSpaceInd
        ["c", name, ..] | ["user", name, ..] => ResolveTarget::Search((*name).to_string()),
        _ => ResolveTarget::Unresolvable,
    }
}

impl YouTubeClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder().timeout(config::http_timeout()).build()?;
        Ok(YouTubeClient { http })
    }

    async fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value> {
        let api_key = config::youtube_api_key()?;
        let response = self
            .http
            .get(format!("{API_BASE}/{endpoint}"))
            .query(params)
            .query(&[("key", api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Service(format!(
                "YouTube API returned {status} for {endpoint}"
            )));
        }
        Ok(response.json::<Value>().await?)
    }

    /// Look up the canonical ID for a handle, without the @ sigil.
    async fn lookup_handle(&self, handle: &str) -> Result<Option<String>> {
        let body = self
            .get_json("channels", &[("part", "id"), ("forHandle", handle)])
            .await?;
        Ok(body["items"][0]["id"].as_str().map(String::from))
    }

    /// Free-text channel search, taking the first match.
    async fn search_channel(&self, query: &str) -> Result<Option<String>> {
        let body = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "channel"),
                    ("maxResults", "1"),
                    ("q", query),
                ],
            )
            .await?;
        Ok(body["items"][0]["id"]["channelId"].as_str().map(String::from))
    }

    /// One batch contentDetails call for all of a page's videos, so a page
    /// costs two requests instead of one per item. A failure here degrades
    /// every duration on the page to zero instead of failing the page.
    async fn attach_durations(&self, entries: &mut [UploadEntry]) {
        if entries.is_empty() {
            return;
        }
        let ids: Vec<&str> = entries.iter().map(|e| e.video_id.as_str()).collect();
        let durations = match self.fetch_duration_map(&ids.join(",")).await {
            Ok(durations) => durations,
            Err(e) => {
                error!("Failed to fetch durations for {} videos: {e}", entries.len());
                return;
            }
        };
        for entry in entries.iter_mut() {
            if let Some(seconds) = durations.get(&entry.video_id) {
                entry.duration_seconds = *seconds;
            }
        }
    }

    async fn fetch_duration_map(&self, joined_ids: &str) -> Result<HashMap<String, u32>> {
        let body = self
            .get_json("videos", &[("part", "contentDetails"), ("id", joined_ids)])
            .await?;

        let mut durations = HashMap::new();
        if let Some(items) = body["items"].as_array() {
            for item in items {
                if let Some(id) = item["id"].as_str() {
                    let raw = item["contentDetails"]["duration"].as_str().unwrap_or("");
                    durations.insert(id.to_string(), parse_duration_seconds(raw));
                }
            }
        }
        Ok(durations)
    }
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn resolve_channel_id(&self, input: &str) -> Result<Option<String>> {
        match classify_channel_input(input) {
            ResolveTarget::Direct(id) => Ok(Some(id)),
            ResolveTarget::Handle(handle) => self.lookup_handle(&handle).await,
            ResolveTarget::Search(query) => self.search_channel(&query).await,
            ResolveTarget::Unresolvable => Ok(None),
        }
    }

    async fn fetch_channel_info(&self, channel_id: &str) -> Result<ChannelInfo> {
        let body = self
            .get_json(
                "channels",
                &[("part", "snippet,statistics"), ("id", channel_id)],
            )
            .await?;

        let Some(item) = body["items"].get(0) else {
            return Err(IngestError::NotFound(format!("channel {channel_id}")));
        };

        Ok(ChannelInfo {
            name: decode_entities(item["snippet"]["title"].as_str().unwrap_or("")),
            description: decode_entities(item["snippet"]["description"].as_str().unwrap_or("")),
            thumbnail_url: best_thumbnail(&item["snippet"]["thumbnails"]),
            subscriber_count: item["statistics"]["subscriberCount"]
                .as_str()
                .unwrap_or("0")
                .parse()
                .unwrap_or(0),
        })
    }

    async fn fetch_uploads(
        &self,
        channel_id: &str,
        query: &UploadQuery,
    ) -> Result<Vec<UploadEntry>> {
        let playlist_id = uploads_playlist_id(channel_id)?;
        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 50);
        let max_pages = query.max_pages.unwrap_or(DEFAULT_MAX_PAGES);

        let mut pager = UploadPager::new(self, playlist_id, page_size);
        let mut uploads = Vec::new();
        let mut pages = 0;

        while pages < max_pages {
            let Some(mut page) = pager.next_page().await? else {
                break;
            };
            pages += 1;

            self.attach_durations(&mut page).await;

            let (mut kept, reached_cutoff) = apply_cutoff(page, query.since);
            uploads.append(&mut kept);
            if reached_cutoff {
                break;
            }
        }

        info!(
            "Fetched {} uploads for channel {} across {} page(s)",
            uploads.len(),
            channel_id,
            pages
        );
        Ok(uploads)
    }
}

/// The uploads playlist shares the channel ID with its two-letter prefix
/// swapped from UC to UU.
fn uploads_playlist_id(channel_id: &str) -> Result<String> {
    if !is_canonical_id(channel_id) {
        return Err(IngestError::Validation(format!(
            "not a canonical channel ID: {channel_id}"
        )));
    }
    Ok(format!("UU{}", &channel_id[2..]))
}

/// Drop entries strictly older than `since` and report whether any were
/// seen. The check runs over the page's items, not just its boundary, so a
/// page that straddles the cutoff still contributes its newer entries.
/// Assumes pages arrive in roughly descending publish order; an
/// out-of-order item inside a stopped page stays dropped.
fn apply_cutoff(
    page: Vec<UploadEntry>,
    since: Option<DateTime<Utc>>,
) -> (Vec<UploadEntry>, bool) {
    let Some(cutoff) = since else {
        return (page, false);
    };
    let reached = page.iter().any(|entry| entry.published_at < cutoff);
    let kept = page
        .into_iter()
        .filter(|entry| entry.published_at >= cutoff)
        .collect();
    (kept, reached)
}

fn best_thumbnail(thumbnails: &Value) -> String {
    for quality in ["high", "medium", "default"] {
        if let Some(url) = thumbnails[quality]["url"].as_str() {
            return url.to_string();
        }
    }
    String::new()
}

fn parse_upload_item(item: &Value) -> Option<UploadEntry> {
    let snippet = &item["snippet"];
    let video_id = snippet["resourceId"]["videoId"].as_str()?;

    // For uploads playlists the item publish time tracks the video's; the
    // contentDetails field is the authoritative one when present.
    let published_raw = item["contentDetails"]["videoPublishedAt"]
        .as_str()
        .or_else(|| snippet["publishedAt"].as_str())?;
    let published_at = parse_timestamp(published_raw)?;

    Some(UploadEntry {
        video_id: video_id.to_string(),
        title: decode_entities(snippet["title"].as_str().unwrap_or("")),
        description: decode_entities(snippet["description"].as_str().unwrap_or("")),
        channel_name: decode_entities(snippet["channelTitle"].as_str().unwrap_or("")),
        thumbnail_url: best_thumbnail(&snippet["thumbnails"]),
        published_at,
        duration_seconds: 0,
    })
}

/// Sequential page producer over an uploads playlist.
///
/// Each page's request depends on the continuation token from the previous
/// response, so pages cannot be fetched in parallel. `next_page` returns
/// `Ok(None)` once the playlist is exhausted.
struct UploadPager<'a> {
    client: &'a YouTubeClient,
    playlist_id: String,
    page_size: String,
    next_token: Option<String>,
    exhausted: bool,
}

impl<'a> UploadPager<'a> {
    fn new(client: &'a YouTubeClient, playlist_id: String, page_size: u32) -> Self {
        UploadPager {
            client,
            playlist_id,
            page_size: page_size.to_string(),
            next_token: None,
            exhausted: false,
        }
    }

    async fn next_page(&mut self) -> Result<Option<Vec<UploadEntry>>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut params = vec![
            ("part", "snippet,contentDetails"),
            ("playlistId", self.playlist_id.as_str()),
            ("maxResults", self.page_size.as_str()),
        ];
        if let Some(token) = &self.next_token {
            params.push(("pageToken", token.as_str()));
        }

        let body = self.client.get_json("playlistItems", &params).await?;

        match body["nextPageToken"].as_str() {
            Some(token) => self.next_token = Some(token.to_string()),
            None => self.exhausted = true,
        }

        let items = match body["items"].as_array() {
            Some(items) if !items.is_empty() => items,
            _ => {
                self.exhausted = true;
                return Ok(None);
            }
        };

        let mut page = Vec::with_capacity(items.len());
        for item in items {
            match parse_upload_item(item) {
                Some(entry) => page.push(entry),
                None => warn!("Skipping playlist item without video ID or publish time"),
            }
        }
        Ok(Some(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const CHANNEL: &str = "UCTeLqJq1mXUX5WWoNXLmOIA";

    fn entry(id: &str, published_at: DateTime<Utc>) -> UploadEntry {
        UploadEntry {
            video_id: id.to_string(),
            title: String::new(),
            description: String::new(),
            channel_name: String::new(),
            thumbnail_url: String::new(),
            published_at,
            duration_seconds: 0,
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn canonical_id_shape() {
        assert!(is_canonical_id(CHANNEL));
        assert!(!is_canonical_id("UCshort"));
        assert!(!is_canonical_id("UUTeLqJq1mXUX5WWoNXLmOIA"));
        assert!(!is_canonical_id("UCTeLqJq1mXUX5WWoNXLmOI!"));
    }

    #[test]
    fn canonical_input_is_returned_directly() {
        // No lookup needed when the input already is the canonical ID.
        assert_eq!(
            classify_channel_input(CHANNEL),
            ResolveTarget::Direct(CHANNEL.to_string())
        );
        assert_eq!(
            classify_channel_input(&format!("  {CHANNEL}  ")),
            ResolveTarget::Direct(CHANNEL.to_string())
        );
    }

    #[test]
    fn handle_input_strips_sigil() {
        assert_eq!(
            classify_channel_input("@RobertsSpaceInd"),
            ResolveTarget::Handle("RobertsSpaceInd".to_string())
        );
    }

    #[test]
    fn channel_url_yields_id_directly() {
        assert_eq!(
            classify_channel_input(&format!("https://www.youtube.com/channel/{CHANNEL}")),
            ResolveTarget::Direct(CHANNEL.to_string())
        );
    }

    #[test]
    fn handle_url_resolves_via_handle_lookup() {
        assert_eq!(
            classify_channel_input("https://youtube.com/@RobertsSpaceInd"),
            ResolveTarget::Handle("RobertsSpaceInd".to_string())
        );
        assert_eq!(
            classify_channel_input("https://m.youtube.com/@clips/videos"),
            ResolveTarget::Handle("clips".to_string())
        );
    }

    #[test]
    fn custom_and_user_urls_fall_back_to_search() {
        assert_eq!(
            classify_channel_input("https://www.youtube.com/c/RobertsSpaceInd"),
            ResolveTarget::Search("RobertsSpaceInd".to_string())
        );
        assert_eq!(
            classify_channel_input("https://www.youtube.com/user/olddays"),
            ResolveTarget::Search("olddays".to_string())
        );
    }

    #[test]
    fn bare_text_falls_back_to_search() {
        assert_eq!(
            classify_channel_input("roberts space industries"),
            ResolveTarget::Search("roberts space industries".to_string())
        );
    }

    #[test]
    fn foreign_or_unknown_urls_do_not_resolve() {
        assert_eq!(
            classify_channel_input("https://vimeo.com/channels/staffpicks"),
            ResolveTarget::Unresolvable
        );
        assert_eq!(
            classify_channel_input("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            ResolveTarget::Unresolvable
        );
    }

    #[test]
    fn uploads_playlist_swaps_prefix() {
        assert_eq!(
            uploads_playlist_id(CHANNEL).unwrap(),
            "UUTeLqJq1mXUX5WWoNXLmOIA"
        );
    }

    #[test]
    fn uploads_playlist_rejects_bad_shape() {
        let err = uploads_playlist_id("not-a-channel").unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[test]
    fn cutoff_keeps_newer_items_and_signals_stop() {
        let page = vec![entry("a", at(300)), entry("b", at(200)), entry("c", at(100))];
        let (kept, reached) = apply_cutoff(page, Some(at(200)));
        // Item at exactly the cutoff stays; only strictly older drop out.
        let ids: Vec<&str> = kept.iter().map(|e| e.video_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(reached);
    }

    #[test]
    fn cutoff_absent_passes_page_through() {
        let page = vec![entry("a", at(300)), entry("b", at(100))];
        let (kept, reached) = apply_cutoff(page, None);
        assert_eq!(kept.len(), 2);
        assert!(!reached);
    }

    #[test]
    fn cutoff_drops_out_of_order_stragglers() {
        // An old item in the middle of a page both triggers the stop and is
        // excluded, even though newer items follow it in the response.
        let page = vec![entry("a", at(300)), entry("old", at(50)), entry("b", at(250))];
        let (kept, reached) = apply_cutoff(page, Some(at(100)));
        let ids: Vec<&str> = kept.iter().map(|e| e.video_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(reached);
    }

    #[test]
    fn upload_item_parsing() {
        let item = json!({
            "snippet": {
                "title": "Fish &amp; Chips",
                "description": "don&#39;t miss it",
                "channelTitle": "Test Channel",
                "publishedAt": "2024-03-01T12:30:00Z",
                "resourceId": { "videoId": "dQw4w9WgXcQ" },
                "thumbnails": {
                    "medium": { "url": "https://img.example/m.jpg" },
                    "high": { "url": "https://img.example/h.jpg" }
                }
            },
            "contentDetails": { "videoPublishedAt": "2024-03-01T12:00:00Z" }
        });
        let entry = parse_upload_item(&item).unwrap();
        assert_eq!(entry.video_id, "dQw4w9WgXcQ");
        assert_eq!(entry.title, "Fish & Chips");
        assert_eq!(entry.description, "don't miss it");
        assert_eq!(entry.thumbnail_url, "https://img.example/h.jpg");
        assert_eq!(entry.published_at, at(1709294400));
        assert_eq!(entry.duration_seconds, 0);
    }

    #[test]
    fn upload_item_without_video_id_is_skipped() {
        let item = json!({
            "snippet": { "title": "private video", "publishedAt": "2024-03-01T12:30:00Z" }
        });
        assert!(parse_upload_item(&item).is_none());
    }

    #[test]
    fn thumbnail_quality_fallback() {
        let only_default = json!({ "default": { "url": "https://img.example/d.jpg" } });
        assert_eq!(best_thumbnail(&only_default), "https://img.example/d.jpg");
        assert_eq!(best_thumbnail(&json!({})), "");
    }
}
