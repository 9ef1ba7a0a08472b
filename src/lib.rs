pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod server;

pub use config::AppConfig;
pub use error::ServiceError;
pub use extract::{ArticleExtractor, HttpFetcher, PageFetcher};
pub use model::{ModelRegistry, Summarizer, SummaryMode, ZeroShotClassifier};
pub use server::build_router;
