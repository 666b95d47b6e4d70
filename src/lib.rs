pub mod config;
pub mod cover;
pub mod episode;
pub mod error;
pub mod feed;
pub mod http;
pub mod progress;
pub mod store;
pub mod sync;
pub mod tags;

// Re-export main types for convenience
pub use config::{Config, ConfigFile, Overrides};
pub use episode::{DownloadTarget, display_title, sanitize};
pub use error::{
    ConfigError, CoverError, DownloadError, EpisodeError, FeedError, StoreError, SyncError,
    TagError,
};
pub use feed::{Enclosure, Episode, Feed, is_url, load_feed, parse_feed};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use progress::{
    EpisodeListReporter, NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter,
};
pub use store::GuidStore;
pub use sync::{RunReport, SyncOptions, SyncResult, run, sync_feed};
