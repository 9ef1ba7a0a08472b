use tokenizers::{Encoding, PostProcessor, Tokenizer, TruncationDirection};

use crate::error::ServiceError;

/// Text <-> token id conversion used by the inference pipelines.
pub trait TokenCodec: Send + Sync {
    /// Encodes a single sequence with special tokens, keeping at most
    /// `max_len` ids in total.
    fn encode(&self, text: &str, max_len: usize) -> Result<Vec<u32>, ServiceError>;

    /// Encodes a premise/hypothesis pair. Only the premise is truncated.
    fn encode_pair(
        &self,
        premise: &str,
        hypothesis: &str,
        max_len: usize,
    ) -> Result<Vec<u32>, ServiceError>;

    /// Decodes ids, dropping special tokens.
    fn decode(&self, ids: &[u32]) -> Result<String, ServiceError>;
}

impl TokenCodec for Tokenizer {
    fn encode(&self, text: &str, max_len: usize) -> Result<Vec<u32>, ServiceError> {
        let mut encoding = raw_encode(self, text)?;
        let budget = max_len.saturating_sub(added_tokens(self, false));
        truncate(&mut encoding, budget);
        let encoding = (**self)
            .post_process(encoding, None, true)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn encode_pair(
        &self,
        premise: &str,
        hypothesis: &str,
        max_len: usize,
    ) -> Result<Vec<u32>, ServiceError> {
        let mut first = raw_encode(self, premise)?;
        let second = raw_encode(self, hypothesis)?;
        let budget = max_len
            .saturating_sub(added_tokens(self, true))
            .saturating_sub(second.len());
        if budget == 0 {
            return Err(ServiceError::BadRequest(
                "hypothesis does not fit in the model input".into(),
            ));
        }
        truncate(&mut first, budget);
        let encoding = (**self)
            .post_process(first, Some(second), true)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String, ServiceError> {
        (**self)
            .decode(ids, true)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))
    }
}

fn raw_encode(tokenizer: &Tokenizer, text: &str) -> Result<Encoding, ServiceError> {
    (**tokenizer)
        .encode(text, false)
        .map_err(|e| ServiceError::Tokenizer(e.to_string()))
}

fn added_tokens(tokenizer: &Tokenizer, is_pair: bool) -> usize {
    (**tokenizer)
        .get_post_processor()
        .map(|processor| processor.added_tokens(is_pair))
        .unwrap_or(0)
}

fn truncate(encoding: &mut Encoding, max_len: usize) {
    if encoding.len() > max_len {
        encoding.truncate(max_len, 0, TruncationDirection::Right);
    }
}
