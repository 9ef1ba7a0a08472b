use std::sync::Arc;

use tokio::task;

use crate::{
    config::AppConfig,
    error::ServiceError,
    model::{
        ClassificationResult, ClassifierSettings, SummarizerSettings, SummaryMode, Summarizer,
        ZeroShotClassifier, sampling::SamplingParams,
    },
};

/// Models loaded at startup and held for the lifetime of the process.
pub struct ModelRegistry {
    summarizer: Option<Arc<Summarizer>>,
    classifier: Option<Arc<ZeroShotClassifier>>,
    emotion_labels: Vec<String>,
}

impl ModelRegistry {
    #[cfg(feature = "tch-backend")]
    pub fn initialize(config: &AppConfig) -> Result<Self, ServiceError> {
        use crate::model::tch_backend;

        let summarizer_codec = Arc::new(tch_backend::load_tokenizer(
            &config.summarizer_tokenizer_path,
        )?);
        let summarizer_model = Arc::new(tch_backend::TorchSeq2Seq::load(
            &config.summarizer_module_path,
            config.device,
        )?);
        tracing::info!(path = %config.summarizer_module_path.display(), "summarizer loaded");

        let classifier_codec = Arc::new(tch_backend::load_tokenizer(
            &config.classifier_tokenizer_path,
        )?);
        let classifier_model = Arc::new(tch_backend::TorchNli::load(
            &config.classifier_module_path,
            config.device,
        )?);
        tracing::info!(path = %config.classifier_module_path.display(), "classifier loaded");

        let summarizer = Summarizer::new(
            summarizer_model,
            summarizer_codec,
            summarizer_settings(config),
            config.sampling_seed,
        );
        let classifier = ZeroShotClassifier::new(
            classifier_model,
            classifier_codec,
            classifier_settings(config),
        );

        Ok(Self::from_parts(
            Some(summarizer),
            Some(classifier),
            config.emotion_labels.clone(),
        ))
    }

    /// Without an inference backend only extraction is served.
    #[cfg(not(feature = "tch-backend"))]
    pub fn initialize(config: &AppConfig) -> Result<Self, ServiceError> {
        tracing::warn!("built without an inference backend, /simplify and /analyze are disabled");
        Ok(Self::from_parts(None, None, config.emotion_labels.clone()))
    }

    pub fn from_parts(
        summarizer: Option<Summarizer>,
        classifier: Option<ZeroShotClassifier>,
        emotion_labels: Vec<String>,
    ) -> Self {
        Self {
            summarizer: summarizer.map(Arc::new),
            classifier: classifier.map(Arc::new),
            emotion_labels,
        }
    }

    pub fn has_summarizer(&self) -> bool {
        self.summarizer.is_some()
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    pub async fn simplify(&self, text: String, mode: SummaryMode) -> Result<String, ServiceError> {
        let summarizer = self
            .summarizer
            .clone()
            .ok_or(ServiceError::ModelLoading("summarization"))?;

        task::spawn_blocking(move || summarizer.summarize(&text, mode))
            .await
            .map_err(|err| ServiceError::Inference(format!("inference task failed: {err}")))?
    }

    /// Classifies against `labels`, or the configured emotion labels when
    /// none are given.
    pub async fn analyze(
        &self,
        text: String,
        labels: Option<Vec<String>>,
        multi_label: bool,
    ) -> Result<ClassificationResult, ServiceError> {
        let classifier = self
            .classifier
            .clone()
            .ok_or(ServiceError::ModelLoading("classification"))?;
        let labels = labels.unwrap_or_else(|| self.emotion_labels.clone());

        task::spawn_blocking(move || classifier.classify(&text, &labels, multi_label))
            .await
            .map_err(|err| ServiceError::Inference(format!("inference task failed: {err}")))?
    }
}

pub fn summarizer_settings(config: &AppConfig) -> SummarizerSettings {
    SummarizerSettings {
        max_input_tokens: config.max_input_tokens,
        no_repeat_ngram_size: config.no_repeat_ngram_size,
        sampling: SamplingParams {
            do_sample: config.do_sample,
            temperature: config.temperature,
            top_k: config.top_k,
            top_p: config.top_p,
        },
    }
}

pub fn classifier_settings(config: &AppConfig) -> ClassifierSettings {
    ClassifierSettings {
        max_input_tokens: config.max_input_tokens,
        hypothesis_template: config.hypothesis_template.clone(),
        entailment_index: config.entailment_index,
        contradiction_index: config.contradiction_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig::from_lookup(|key| match key {
            "TOP_K" => Some("7".to_string()),
            "DO_SAMPLE" => Some("off".to_string()),
            "HYPOTHESIS_TEMPLATE" => Some("The mood is {}.".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn settings_follow_configuration() {
        let config = config();
        let summarizer = summarizer_settings(&config);
        assert_eq!(summarizer.sampling.top_k, 7);
        assert!(!summarizer.sampling.do_sample);
        assert_eq!(summarizer.max_input_tokens, 1024);

        let classifier = classifier_settings(&config);
        assert_eq!(classifier.hypothesis_template, "The mood is {}.");
        assert_eq!(classifier.entailment_index, 2);
    }

    #[tokio::test]
    async fn missing_models_report_unavailable() {
        let registry = ModelRegistry::from_parts(None, None, vec!["sad".into()]);
        assert!(!registry.has_summarizer());
        assert!(!registry.has_classifier());
        assert!(matches!(
            registry.simplify("text".into(), SummaryMode::Simplify).await,
            Err(ServiceError::ModelLoading("summarization"))
        ));
        assert!(matches!(
            registry.analyze("text".into(), None, false).await,
            Err(ServiceError::ModelLoading("classification"))
        ));
    }

    #[cfg(feature = "tch-backend")]
    #[test]
    fn initialize_fails_without_model_artifacts() {
        let config = AppConfig::from_lookup(|key| {
            (key == "SUMMARIZER_TOKENIZER_PATH").then(|| "/nonexistent/tokenizer.json".to_string())
        })
        .unwrap();
        assert!(matches!(
            ModelRegistry::initialize(&config),
            Err(ServiceError::Other(msg)) if msg.contains("tokenizer missing")
        ));
    }
}
