use std::env;
use std::time::Duration;

use env_logger::Builder;
use log::{info, LevelFilter};

use crate::error::{IngestError, Result};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SCRAPE_SCHEDULE: &str = "0 0 4 * * *";

pub fn init_logger() {
    Builder::new().filter_level(LevelFilter::Info).init();
    info!("Starting vodsync ingestion...");
}

pub fn load_environment() {
    dotenv::dotenv().ok();
}

/// The YouTube Data API credential. Looked up at call time so that a
/// missing key fails the request that needed it instead of the process
/// at startup.
pub fn youtube_api_key() -> Result<String> {
    env::var("YOUTUBE_API_KEY")
        .map_err(|_| IngestError::Config("YOUTUBE_API_KEY environment variable must be set".into()))
}

/// Per-request timeout applied to every outbound API call. Expiry is
/// reported as a service error, not a not-found.
pub fn http_timeout() -> Duration {
    let secs = env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Cron expression for the daily incremental scrape job.
pub fn scrape_schedule() -> String {
    env::var("SCRAPE_SCHEDULE").unwrap_or_else(|_| DEFAULT_SCRAPE_SCHEDULE.to_string())
}
