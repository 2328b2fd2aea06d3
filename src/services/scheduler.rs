use std::sync::Arc;

use log::{error, info};
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config;
use crate::error::{IngestError, Result};
use crate::models::ScrapeCadence;
use crate::services::scrape::scrape_new;
use crate::services::youtube::VideoSource;
use crate::store::IngestStore;

/// Start the cron job that runs an incremental scrape for every active
/// daily-cadence channel. The schedule comes from `SCRAPE_SCHEDULE`
/// (default 04:00 UTC).
pub async fn start_daily_scrape(
    source: Arc<dyn VideoSource>,
    store: Arc<dyn IngestStore>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;
    let schedule = config::scrape_schedule();

    let job = Job::new_async(schedule.as_str(), move |_uuid, _l| {
        let source = source.clone();
        let store = store.clone();
        Box::pin(async move {
            scrape_due_channels(source.as_ref(), store.as_ref()).await;
        })
    })
    .map_err(scheduler_error)?;

    scheduler.add(job).await.map_err(scheduler_error)?;
    scheduler.start().await.map_err(scheduler_error)?;

    info!("Daily scrape scheduler started ({schedule})");
    Ok(scheduler)
}

/// One scheduler tick: incremental scrape of every channel that is due.
/// A failure on one channel is logged and does not stop the rest.
pub async fn scrape_due_channels(source: &dyn VideoSource, store: &dyn IngestStore) {
    let channels = match store.list_channels().await {
        Ok(channels) => channels,
        Err(e) => {
            error!("Could not list channels for scheduled scrape: {e}");
            return;
        }
    };

    for channel in channels {
        if !channel.active || channel.cadence != ScrapeCadence::Daily {
            continue;
        }
        match scrape_new(source, store, &channel.channel_id).await {
            Ok(outcome) => info!(
                "Scheduled scrape of {}: {} new video(s), {} skipped",
                channel.channel_id, outcome.inserted, outcome.skipped
            ),
            Err(e) => error!("Scheduled scrape of {} failed: {e}", channel.channel_id),
        }
    }
}

fn scheduler_error(e: tokio_cron_scheduler::JobSchedulerError) -> IngestError {
    IngestError::Service(format!("scrape scheduler error: {e}"))
}
