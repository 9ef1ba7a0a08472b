use rand::Rng;

use crate::error::ServiceError;
use crate::model::sampling::{self, SamplingParams};

/// An encoder-decoder network that scores the next decoder token.
pub trait Seq2SeqModel: Send + Sync {
    /// Returns vocabulary logits for the position after `decoder_ids`.
    fn next_token_logits(
        &self,
        input_ids: &[u32],
        decoder_ids: &[u32],
    ) -> Result<Vec<f32>, ServiceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub bos: u32,
    pub pad: u32,
    pub eos: u32,
    pub decoder_start: u32,
}

impl SpecialTokens {
    /// Ids used by the BART family.
    pub const fn bart() -> Self {
        Self {
            bos: 0,
            pad: 1,
            eos: 2,
            decoder_start: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    /// Lengths count decoder tokens, including the start token.
    pub min_length: usize,
    pub max_length: usize,
    pub no_repeat_ngram_size: usize,
    pub forced_bos: bool,
    pub forced_eos: bool,
    pub special: SpecialTokens,
    pub sampling: SamplingParams,
}

impl GenerationConfig {
    pub fn new(min_length: usize, max_length: usize, sampling: SamplingParams) -> Self {
        Self {
            min_length,
            max_length,
            no_repeat_ngram_size: 3,
            forced_bos: true,
            forced_eos: true,
            special: SpecialTokens::bart(),
            sampling,
        }
    }
}

/// Autoregressive decoding. Returns the full decoder sequence, start token
/// included.
pub fn generate<M, R>(
    model: &M,
    input_ids: &[u32],
    config: &GenerationConfig,
    rng: &mut R,
) -> Result<Vec<u32>, ServiceError>
where
    M: Seq2SeqModel + ?Sized,
    R: Rng + ?Sized,
{
    if input_ids.is_empty() {
        return Err(ServiceError::BadRequest("input must not be empty".into()));
    }
    if config.max_length < 2 || config.min_length > config.max_length {
        return Err(ServiceError::Other(format!(
            "invalid length bounds {}..{}",
            config.min_length, config.max_length
        )));
    }

    let special = config.special;
    let mut decoder_ids = vec![special.decoder_start];

    while decoder_ids.len() < config.max_length {
        let mut logits = model.next_token_logits(input_ids, &decoder_ids)?;
        if logits.is_empty() {
            return Err(ServiceError::Inference("model returned no logits".into()));
        }

        let len = decoder_ids.len();
        let forcing_eos = config.forced_eos && len + 1 == config.max_length;
        if len < config.min_length && !forcing_eos {
            sampling::ban_token(&mut logits, special.eos);
        }
        for banned in sampling::repeated_ngram_bans(&decoder_ids, config.no_repeat_ngram_size) {
            sampling::ban_token(&mut logits, banned);
        }
        if config.forced_bos && len == 1 {
            sampling::force_token(&mut logits, special.bos);
        } else if forcing_eos {
            sampling::force_token(&mut logits, special.eos);
        }

        let next = sampling::select_token(&mut logits, &config.sampling, rng).ok_or_else(|| {
            ServiceError::Inference("every candidate token was filtered out".into())
        })?;
        decoder_ids.push(next);

        if next == special.eos {
            break;
        }
    }

    Ok(decoder_ids)
}
