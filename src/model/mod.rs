mod classifier;
mod codec;
mod generation;
mod registry;
pub mod sampling;
mod summarizer;
mod types;

#[cfg(feature = "tch-backend")]
pub mod tch_backend;

pub use classifier::{ClassificationResult, ClassifierSettings, NliModel, ZeroShotClassifier};
pub use codec::TokenCodec;
pub use generation::{GenerationConfig, Seq2SeqModel, SpecialTokens, generate};
pub use registry::{ModelRegistry, classifier_settings, summarizer_settings};
pub use summarizer::{Summarizer, SummarizerSettings, SummaryMode};
pub use types::{AnalyzeRequest, AnalyzeResponse, SimplifyRequest, SimplifyResponse};
