use std::env;
use std::process::ExitCode;

use log::error;

use vodsync::services::{add_channel, scrape_all, YouTubeClient};
use vodsync::{config, MemoryStore, ScrapeCadence};

/// Smoke runner: resolve a channel, track it in an in-memory store and
/// scrape its full history once. The real host application wires the same
/// services against its own store.
#[tokio::main]
async fn main() -> ExitCode {
    config::load_environment();
    config::init_logger();

    let Some(input) = env::args().nth(1) else {
        eprintln!("usage: vodsync <channel id | @handle | channel url>");
        return ExitCode::FAILURE;
    };

    let client = match YouTubeClient::new() {
        Ok(client) => client,
        Err(e) => {
            error!("Could not build API client: {e}");
            return ExitCode::FAILURE;
        }
    };
    let store = MemoryStore::new();

    let channel = match add_channel(&client, &store, &input, ScrapeCadence::Manual).await {
        Ok(channel) => channel,
        Err(e) => {
            error!("Could not add channel '{input}': {e}");
            return ExitCode::FAILURE;
        }
    };
    println!("Tracking {} ({})", channel.name, channel.channel_id);

    match scrape_all(&client, &store, &channel.channel_id).await {
        Ok(outcome) => {
            println!(
                "Scraped {} video(s): {} inserted, {} skipped (watermark {})",
                outcome.fetched, outcome.inserted, outcome.skipped, outcome.watermark
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Scrape failed: {e}");
            ExitCode::FAILURE
        }
    }
}
