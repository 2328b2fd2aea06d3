use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{IngestError, Result};
use crate::models::{Channel, IngestedVideo};

/// Persistence boundary for the ingestion pipeline.
///
/// The pipeline never touches storage directly; the host application
/// provides an implementation (a database in production, [`MemoryStore`]
/// in tests). Video uniqueness is keyed on the platform's video ID and
/// must be enforced atomically per row by the implementation, not by
/// callers taking locks.
#[async_trait]
pub trait IngestStore: Send + Sync {
    async fn find_channel(&self, channel_id: &str) -> Result<Option<Channel>>;

    /// Insert a new channel. Fails with `Conflict` if the canonical ID is
    /// already present.
    async fn insert_channel(&self, channel: Channel) -> Result<()>;

    async fn update_watermark(&self, channel_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Insert the video if its ID is unknown, leave the existing row
    /// untouched otherwise. Returns whether a row was inserted.
    async fn upsert_video_if_absent(&self, video: IngestedVideo) -> Result<bool>;

    async fn list_channels(&self) -> Result<Vec<Channel>>;
}

/// In-memory store used by tests and the smoke binary.
#[derive(Default)]
pub struct MemoryStore {
    channels: RwLock<HashMap<String, Channel>>,
    videos: RwLock<HashMap<String, IngestedVideo>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn video_count(&self) -> usize {
        self.videos.read().await.len()
    }
}

#[async_trait]
impl IngestStore for MemoryStore {
    async fn find_channel(&self, channel_id: &str) -> Result<Option<Channel>> {
        Ok(self.channels.read().await.get(channel_id).cloned())
    }

    async fn insert_channel(&self, channel: Channel) -> Result<()> {
        let mut channels = self.channels.write().await;
        if channels.contains_key(&channel.channel_id) {
            return Err(IngestError::Conflict(channel.channel_id));
        }
        channels.insert(channel.channel_id.clone(), channel);
        Ok(())
    }

    async fn update_watermark(&self, channel_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut channels = self.channels.write().await;
        match channels.get_mut(channel_id) {
            Some(channel) => {
                channel.last_scraped_at = Some(at);
                Ok(())
            }
            None => Err(IngestError::NotFound(format!("channel {channel_id}"))),
        }
    }

    async fn upsert_video_if_absent(&self, video: IngestedVideo) -> Result<bool> {
        let mut videos = self.videos.write().await;
        if videos.contains_key(&video.video_id) {
            return Ok(false);
        }
        videos.insert(video.video_id.clone(), video);
        Ok(true)
    }

    async fn list_channels(&self) -> Result<Vec<Channel>> {
        Ok(self.channels.read().await.values().cloned().collect())
    }
}
