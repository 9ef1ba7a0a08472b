use std::sync::Arc;

use serde::Serialize;

use crate::error::ServiceError;
use crate::model::codec::TokenCodec;
use crate::model::sampling::softmax;

/// A natural language inference network scoring a premise/hypothesis pair.
pub trait NliModel: Send + Sync {
    /// Returns one logit per NLI class for an encoded pair.
    fn logits(&self, input_ids: &[u32]) -> Result<Vec<f32>, ServiceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSettings {
    pub max_input_tokens: usize,
    pub hypothesis_template: String,
    pub entailment_index: usize,
    pub contradiction_index: usize,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            max_input_tokens: 1024,
            hypothesis_template: crate::config::DEFAULT_HYPOTHESIS_TEMPLATE.to_string(),
            entailment_index: 2,
            contradiction_index: 0,
        }
    }
}

/// Labels and scores, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub labels: Vec<String>,
    pub scores: Vec<f32>,
}

impl ClassificationResult {
    pub fn top(&self) -> Option<(&str, f32)> {
        self.labels
            .first()
            .zip(self.scores.first())
            .map(|(label, score)| (label.as_str(), *score))
    }
}

pub struct ZeroShotClassifier {
    model: Arc<dyn NliModel>,
    codec: Arc<dyn TokenCodec>,
    settings: ClassifierSettings,
}

impl ZeroShotClassifier {
    pub fn new(
        model: Arc<dyn NliModel>,
        codec: Arc<dyn TokenCodec>,
        settings: ClassifierSettings,
    ) -> Self {
        Self {
            model,
            codec,
            settings,
        }
    }

    pub fn hypothesis(&self, label: &str) -> String {
        self.settings.hypothesis_template.replacen("{}", label, 1)
    }

    /// Scores `text` against every label by asking whether the text entails
    /// the label's hypothesis.
    ///
    /// In single-label mode the entailment logits are normalized across the
    /// labels so the scores sum to one. In multi-label mode every label is
    /// scored on its own from its entailment versus contradiction logits.
    pub fn classify(
        &self,
        text: &str,
        labels: &[String],
        multi_label: bool,
    ) -> Result<ClassificationResult, ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::BadRequest("Text is required.".into()));
        }
        if labels.is_empty() {
            return Err(ServiceError::BadRequest(
                "at least one candidate label is required".into(),
            ));
        }

        let entail = self.settings.entailment_index;
        let contra = self.settings.contradiction_index;

        let mut pair_logits = Vec::with_capacity(labels.len());
        for label in labels {
            let ids = self.codec.encode_pair(
                text,
                &self.hypothesis(label),
                self.settings.max_input_tokens,
            )?;
            let logits = self.model.logits(&ids)?;
            if logits.len() <= entail.max(contra) {
                return Err(ServiceError::Inference(format!(
                    "classifier returned {} logits, expected more than {}",
                    logits.len(),
                    entail.max(contra)
                )));
            }
            pair_logits.push(logits);
        }

        let scores: Vec<f32> = if multi_label {
            pair_logits
                .iter()
                .map(|logits| softmax(&[logits[contra], logits[entail]])[1])
                .collect()
        } else {
            let entailment: Vec<f32> = pair_logits.iter().map(|logits| logits[entail]).collect();
            softmax(&entailment)
        };

        let mut ranked: Vec<(String, f32)> = labels.iter().cloned().zip(scores).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        tracing::debug!(
            labels = ranked.len(),
            top = %ranked[0].0,
            score = ranked[0].1,
            "zero-shot classification done"
        );

        let (labels, scores) = ranked.into_iter().unzip();
        Ok(ClassificationResult { labels, scores })
    }
}
