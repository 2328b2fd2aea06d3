use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How often a channel is picked up by the scheduled scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeCadence {
    Daily,
    Manual,
}

impl std::fmt::Display for ScrapeCadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeCadence::Daily => write!(f, "daily"),
            ScrapeCadence::Manual => write!(f, "manual"),
        }
    }
}

/// A tracked channel. `channel_id` is the platform's canonical `UC…` ID
/// and never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: String,
    pub name: String,
    pub description: String,
    pub thumbnail_url: String,
    pub active: bool,
    pub cadence: ScrapeCadence,
    /// None means the channel has never been scraped.
    pub last_scraped_at: Option<DateTime<Utc>>,
}

/// A video row as written by the ingestion pipeline. Rows are only ever
/// inserted; re-scraping a known `video_id` leaves the existing row alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestedVideo {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_name: String,
    pub thumbnail_url: String,
    pub published_at: DateTime<Utc>,
    pub duration_seconds: u32,
    pub status: String,
    pub category: String,
    pub scraped_at: DateTime<Utc>,
}

/// Channel metadata as returned by the platform, entity-decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub name: String,
    pub description: String,
    pub thumbnail_url: String,
    pub subscriber_count: u64,
}

/// One upload as produced by the enumerator, before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEntry {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_name: String,
    pub thumbnail_url: String,
    pub published_at: DateTime<Utc>,
    pub duration_seconds: u32,
}

/// Summary of one scrape run. Returned to the caller, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    pub fetched: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub watermark: DateTime<Utc>,
}
