pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod registry;
pub mod scheduler;
pub mod tracker;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use config::AppConfig;
pub use extractor::{PageExtractor, SelectorExtractor};
pub use fetcher::{ChromeFetcher, PageFetcher, RenderedPage};
pub use models::{CoarseStatus, MatchData, MatchId, MatchPhase, MatchRecord, MatchSnapshot};
pub use registry::MatchRegistry;
pub use scheduler::{MatchScheduler, SchedulerStats};
pub use tracker::{MatchTracker, Registration, TickReport};
pub use utils::error::{AppError, FetchError};

pub type Result<T> = std::result::Result<T, AppError>;
