use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::model::codec::TokenCodec;
use crate::model::generation::{self, GenerationConfig, Seq2SeqModel};
use crate::model::sampling::SamplingParams;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryMode {
    /// Short and simple summary.
    #[default]
    Simplify,
    /// Longer, more informative summary.
    DetailedSummary,
    /// Story-style explanation aimed at a student.
    TeachingMode,
}

impl SummaryMode {
    /// Unknown names fall back to `Simplify`.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "detailed_summary" => SummaryMode::DetailedSummary,
            "teaching_mode" => SummaryMode::TeachingMode,
            _ => SummaryMode::Simplify,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMode::Simplify => "simplify",
            SummaryMode::DetailedSummary => "detailed_summary",
            SummaryMode::TeachingMode => "teaching_mode",
        }
    }

    /// Minimum and maximum output length in decoder tokens.
    pub fn length_bounds(&self) -> (usize, usize) {
        match self {
            SummaryMode::Simplify => (60, 150),
            SummaryMode::DetailedSummary => (150, 400),
            SummaryMode::TeachingMode => (200, 500),
        }
    }

    /// Text handed to the model for this mode.
    pub fn prompt(&self, text: &str) -> String {
        match self {
            SummaryMode::Simplify | SummaryMode::DetailedSummary => text.to_string(),
            SummaryMode::TeachingMode => format!(
                "You are a friendly and engaging teacher. Explain the main idea of the following text \
                 to a student. Use a simple story, an analogy, or a real-world example \
                 to make the core concepts easy to understand.\n\n\
                 Original Text:\n\"{text}\"\n\n\
                 Easy Explanation:\n"
            ),
        }
    }
}

impl fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummarizerSettings {
    pub max_input_tokens: usize,
    pub no_repeat_ngram_size: usize,
    pub sampling: SamplingParams,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            max_input_tokens: 1024,
            no_repeat_ngram_size: 3,
            sampling: SamplingParams::default(),
        }
    }
}

pub struct Summarizer {
    model: Arc<dyn Seq2SeqModel>,
    codec: Arc<dyn TokenCodec>,
    settings: SummarizerSettings,
    rng: Mutex<StdRng>,
}

impl Summarizer {
    pub fn new(
        model: Arc<dyn Seq2SeqModel>,
        codec: Arc<dyn TokenCodec>,
        settings: SummarizerSettings,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            model,
            codec,
            settings,
            rng: Mutex::new(rng),
        }
    }

    pub fn summarize(&self, text: &str, mode: SummaryMode) -> Result<String, ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::BadRequest("Text is required.".into()));
        }

        let prompt = mode.prompt(text);
        let input_ids = self.codec.encode(&prompt, self.settings.max_input_tokens)?;

        let (min_length, max_length) = mode.length_bounds();
        let mut config = GenerationConfig::new(min_length, max_length, self.settings.sampling);
        config.no_repeat_ngram_size = self.settings.no_repeat_ngram_size;

        tracing::debug!(
            %mode,
            input_tokens = input_ids.len(),
            min_length,
            max_length,
            "generating summary"
        );

        let output = {
            let mut rng = self.rng.lock();
            generation::generate(self.model.as_ref(), &input_ids, &config, &mut *rng)?
        };

        let text = self.codec.decode(&output)?;
        Ok(text.trim().to_string())
    }
}
