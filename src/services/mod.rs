pub mod scheduler;
pub mod scrape;
pub mod submission;
pub mod youtube;

pub use scrape::{add_channel, preview_channel, scrape_all, scrape_new};
pub use submission::{SlidingWindowThrottle, SubmissionGate};
pub use youtube::{UploadQuery, VideoSource, YouTubeClient};
