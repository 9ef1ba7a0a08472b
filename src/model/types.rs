use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::model::{ClassificationResult, SummaryMode};

#[derive(Debug, Deserialize)]
pub struct SimplifyRequest {
    pub text: Option<String>,
    /// Free-form so unknown names can fall back to the default mode.
    pub mode: Option<String>,
}

impl SimplifyRequest {
    pub fn mode(&self) -> SummaryMode {
        self.mode
            .as_deref()
            .map(SummaryMode::from_name)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimplifyResponse {
    pub simplified_text: String,
    pub mode: SummaryMode,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: Option<String>,
    /// Overrides the configured emotion labels.
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub multi_label: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub primary_emotion: String,
    pub confidence_score: f32,
    #[serde(serialize_with = "scores_in_rank_order")]
    pub all_scores: Vec<(String, f32)>,
}

impl AnalyzeResponse {
    pub fn from_result(result: ClassificationResult) -> Option<Self> {
        let (primary_emotion, confidence_score) = result
            .top()
            .map(|(label, score)| (label.to_string(), score))?;
        let all_scores = result
            .labels
            .into_iter()
            .zip(result.scores)
            .collect();
        Some(Self {
            primary_emotion,
            confidence_score,
            all_scores,
        })
    }
}

fn scores_in_rank_order<S>(scores: &[(String, f32)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(scores.iter().map(|(label, score)| (label, score)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplify_mode_defaults_and_falls_back() {
        let request: SimplifyRequest = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(request.mode(), SummaryMode::Simplify);

        let request: SimplifyRequest =
            serde_json::from_str(r#"{"text":"hi","mode":"teaching_mode"}"#).unwrap();
        assert_eq!(request.mode(), SummaryMode::TeachingMode);

        let request: SimplifyRequest =
            serde_json::from_str(r#"{"text":"hi","mode":"haiku"}"#).unwrap();
        assert_eq!(request.mode(), SummaryMode::Simplify);
    }

    #[test]
    fn analyze_response_keeps_rank_order() {
        let result = ClassificationResult {
            labels: vec!["surprise".into(), "angry".into(), "neutral".into()],
            scores: vec![0.7, 0.2, 0.1],
        };
        let response = AnalyzeResponse::from_result(result).unwrap();
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.starts_with(r#"{"primary_emotion":"surprise","confidence_score":0.7"#));
        let surprise = json.find(r#""surprise":0.7"#).unwrap();
        let angry = json.find(r#""angry":0.2"#).unwrap();
        let neutral = json.find(r#""neutral":0.1"#).unwrap();
        assert!(surprise < angry && angry < neutral);
    }

    #[test]
    fn empty_result_has_no_response() {
        let result = ClassificationResult {
            labels: vec![],
            scores: vec![],
        };
        assert!(AnalyzeResponse::from_result(result).is_none());
    }
}
