use chrono::{DateTime, Utc};
use log::info;

use crate::error::{IngestError, Result};
use crate::models::{Channel, ChannelInfo, IngestedVideo, ScrapeCadence, ScrapeOutcome};
use crate::services::youtube::{UploadQuery, VideoSource};
use crate::store::IngestStore;

/// Resolve `raw_input`, fetch the channel's metadata and persist it as a
/// new tracked channel with an empty watermark. Fails with `Conflict` if
/// the canonical ID is already tracked.
pub async fn add_channel(
    source: &dyn VideoSource,
    store: &dyn IngestStore,
    raw_input: &str,
    cadence: ScrapeCadence,
) -> Result<Channel> {
    let channel_id = source
        .resolve_channel_id(raw_input)
        .await?
        .ok_or_else(|| IngestError::NotFound(format!("no channel matches '{raw_input}'")))?;

    if store.find_channel(&channel_id).await?.is_some() {
        return Err(IngestError::Conflict(channel_id));
    }

    let channel_info = source
        .fetch_channel_info(&channel_id)
        .await
        .map_err(|e| match e {
            // A broken lookup service stays a service error; everything
            // else means the resolved ID has no usable channel behind it.
            IngestError::Service(_) | IngestError::Config(_) => e,
            other => IngestError::NotFound(format!("channel {channel_id}: {other}")),
        })?;

    let channel = Channel {
        channel_id,
        name: channel_info.name,
        description: channel_info.description,
        thumbnail_url: channel_info.thumbnail_url,
        active: true,
        cadence,
        last_scraped_at: None,
    };
    store.insert_channel(channel.clone()).await?;

    info!("Added channel {} ({})", channel.name, channel.channel_id);
    Ok(channel)
}

/// Resolve and fetch channel metadata without persisting anything, so an
/// admin can confirm a match before tracking it.
pub async fn preview_channel(
    source: &dyn VideoSource,
    raw_input: &str,
) -> Result<(String, ChannelInfo)> {
    let channel_id = source
        .resolve_channel_id(raw_input)
        .await?
        .ok_or_else(|| IngestError::NotFound(format!("no channel matches '{raw_input}'")))?;
    let channel_info = source.fetch_channel_info(&channel_id).await?;
    Ok((channel_id, channel_info))
}

/// Ingest the channel's entire upload history, up to the page ceiling.
pub async fn scrape_all(
    source: &dyn VideoSource,
    store: &dyn IngestStore,
    channel_id: &str,
) -> Result<ScrapeOutcome> {
    let channel = require_channel(store, channel_id).await?;
    run_scrape(source, store, &channel, None).await
}

/// Ingest uploads newer than the channel's watermark, or everything if it
/// has never been scraped. The watermark advances even when nothing new
/// was found, so "last checked" stays honest.
pub async fn scrape_new(
    source: &dyn VideoSource,
    store: &dyn IngestStore,
    channel_id: &str,
) -> Result<ScrapeOutcome> {
    let channel = require_channel(store, channel_id).await?;
    let since = channel.last_scraped_at;
    run_scrape(source, store, &channel, since).await
}

async fn require_channel(store: &dyn IngestStore, channel_id: &str) -> Result<Channel> {
    store
        .find_channel(channel_id)
        .await?
        .ok_or_else(|| IngestError::NotFound(format!("channel {channel_id}")))
}

async fn run_scrape(
    source: &dyn VideoSource,
    store: &dyn IngestStore,
    channel: &Channel,
    since: Option<DateTime<Utc>>,
) -> Result<ScrapeOutcome> {
    let query = UploadQuery {
        since,
        ..Default::default()
    };
    // An enumeration failure propagates here, before any watermark write:
    // a failed scrape must not record success.
    let uploads = source.fetch_uploads(&channel.channel_id, &query).await?;

    let now = Utc::now();
    let fetched = uploads.len();
    let mut inserted = 0;
    let mut skipped = 0;

    for upload in uploads {
        let video = IngestedVideo {
            video_id: upload.video_id,
            title: upload.title,
            description: upload.description,
            channel_name: upload.channel_name,
            thumbnail_url: upload.thumbnail_url,
            published_at: upload.published_at,
            duration_seconds: upload.duration_seconds,
            status: "pending".to_string(),
            category: "uncategorized".to_string(),
            scraped_at: now,
        };
        if store.upsert_video_if_absent(video).await? {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }

    store.update_watermark(&channel.channel_id, now).await?;

    info!(
        "Scraped channel {}: {} fetched, {} inserted, {} duplicate(s) skipped",
        channel.channel_id, fetched, inserted, skipped
    );
    Ok(ScrapeOutcome {
        fetched,
        inserted,
        skipped,
        watermark: now,
    })
}
