pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use error::{IngestError, Result};
pub use models::{Channel, ChannelInfo, IngestedVideo, ScrapeCadence, ScrapeOutcome, UploadEntry};
pub use store::{IngestStore, MemoryStore};
