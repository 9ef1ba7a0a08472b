use std::collections::HashMap;

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub do_sample: bool,
    pub temperature: f64,
    pub top_k: usize,
    pub top_p: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            do_sample: true,
            temperature: 0.8,
            top_k: 50,
            top_p: 0.95,
        }
    }
}

/// Bans every token id except `keep`, which gets a neutral logit.
pub fn force_token(logits: &mut [f32], keep: u32) {
    for (id, logit) in logits.iter_mut().enumerate() {
        *logit = if id == keep as usize {
            0.0
        } else {
            f32::NEG_INFINITY
        };
    }
}

pub fn ban_token(logits: &mut [f32], id: u32) {
    if let Some(logit) = logits.get_mut(id as usize) {
        *logit = f32::NEG_INFINITY;
    }
}

/// Token ids that would complete an n-gram already present in `sequence`.
pub fn repeated_ngram_bans(sequence: &[u32], ngram_size: usize) -> Vec<u32> {
    if ngram_size == 0 || sequence.len() + 1 < ngram_size {
        return Vec::new();
    }

    let mut seen: HashMap<&[u32], Vec<u32>> = HashMap::new();
    for window in sequence.windows(ngram_size) {
        let (prefix, last) = window.split_at(ngram_size - 1);
        seen.entry(prefix).or_default().push(last[0]);
    }

    let current = &sequence[sequence.len() + 1 - ngram_size..];
    seen.remove(current).unwrap_or_default()
}

/// Applies temperature, top-k and top-p in place. Filtered entries become
/// negative infinity.
pub fn warp(logits: &mut [f32], params: &SamplingParams) {
    if params.temperature > 0.0 && (params.temperature - 1.0).abs() > f64::EPSILON {
        let temperature = params.temperature as f32;
        for logit in logits.iter_mut() {
            *logit /= temperature;
        }
    }

    if params.top_k > 0 && params.top_k < logits.len() {
        let mut sorted: Vec<f32> = logits.to_vec();
        sorted.sort_unstable_by(|a, b| b.total_cmp(a));
        let threshold = sorted[params.top_k - 1];
        for logit in logits.iter_mut() {
            if *logit < threshold {
                *logit = f32::NEG_INFINITY;
            }
        }
    }

    if params.top_p < 1.0 {
        let probs = softmax(logits);
        let mut order: Vec<usize> = (0..logits.len()).collect();
        order.sort_unstable_by(|&a, &b| probs[b].total_cmp(&probs[a]));

        // The most likely token always survives.
        let mut cumulative = 0.0f64;
        let mut cut = order.len();
        for (rank, &id) in order.iter().enumerate() {
            cumulative += f64::from(probs[id]);
            if cumulative > params.top_p {
                cut = rank + 1;
                break;
            }
        }
        for &id in &order[cut..] {
            logits[id] = f32::NEG_INFINITY;
        }
    }
}

/// Numerically stable softmax. An all-masked input yields all zeros.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![0.0; logits.len()];
    }
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

pub fn argmax(logits: &[f32]) -> Option<u32> {
    logits
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.is_nan())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(id, _)| id as u32)
}

/// Picks the next token from already processed logits.
pub fn select_token<R: Rng + ?Sized>(
    logits: &mut [f32],
    params: &SamplingParams,
    rng: &mut R,
) -> Option<u32> {
    if !params.do_sample {
        return argmax(logits);
    }
    warp(logits, params);
    let probs = softmax(logits);
    let dist = WeightedIndex::new(&probs).ok()?;
    Some(dist.sample(rng) as u32)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn finite_ids(logits: &[f32]) -> Vec<usize> {
        logits
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_finite())
            .map(|(id, _)| id)
            .collect()
    }

    #[test]
    fn softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn softmax_of_masked_row_is_zero() {
        let probs = softmax(&[f32::NEG_INFINITY, f32::NEG_INFINITY]);
        assert_eq!(probs, vec![0.0, 0.0]);
    }

    #[test]
    fn top_k_keeps_the_k_best() {
        let mut logits = vec![0.1, 5.0, 3.0, -1.0, 4.0];
        let params = SamplingParams {
            do_sample: true,
            temperature: 1.0,
            top_k: 2,
            top_p: 1.0,
        };
        warp(&mut logits, &params);
        assert_eq!(finite_ids(&logits), vec![1, 4]);
    }

    #[test]
    fn top_p_keeps_the_smallest_covering_set() {
        // probabilities roughly 0.84, 0.11, 0.04, 0.01
        let mut logits = vec![4.0, 2.0, 1.0, -0.5];
        let params = SamplingParams {
            do_sample: true,
            temperature: 1.0,
            top_k: 0,
            top_p: 0.9,
        };
        warp(&mut logits, &params);
        assert_eq!(finite_ids(&logits), vec![0, 1]);
    }

    #[test]
    fn top_p_never_empties_the_distribution() {
        let mut logits = vec![10.0, 0.0, 0.0];
        let params = SamplingParams {
            do_sample: true,
            temperature: 1.0,
            top_k: 0,
            top_p: 0.01,
        };
        warp(&mut logits, &params);
        assert_eq!(finite_ids(&logits), vec![0]);
    }

    #[test]
    fn temperature_sharpens_distribution() {
        let mut logits = vec![1.0, 2.0];
        let params = SamplingParams {
            do_sample: true,
            temperature: 0.5,
            top_k: 0,
            top_p: 1.0,
        };
        warp(&mut logits, &params);
        assert_eq!(logits, vec![2.0, 4.0]);
    }

    #[test]
    fn repeated_trigram_completion_is_banned() {
        // "a b c a b" -> next "c" would repeat "a b c"
        let sequence = [1, 2, 3, 1, 2];
        assert_eq!(repeated_ngram_bans(&sequence, 3), vec![3]);
        assert!(repeated_ngram_bans(&sequence, 0).is_empty());
        assert!(repeated_ngram_bans(&[1], 3).is_empty());
    }

    #[test]
    fn bigram_bans_collect_every_follower() {
        let sequence = [7, 1, 7, 2, 7];
        let mut bans = repeated_ngram_bans(&sequence, 2);
        bans.sort_unstable();
        assert_eq!(bans, vec![1, 2]);
    }

    #[test]
    fn force_token_masks_everything_else() {
        let mut logits = vec![0.5; 4];
        force_token(&mut logits, 2);
        assert_eq!(finite_ids(&logits), vec![2]);
        ban_token(&mut logits, 2);
        ban_token(&mut logits, 99);
        assert!(finite_ids(&logits).is_empty());
    }

    #[test]
    fn greedy_selection_ignores_rng() {
        let mut rng = StdRng::seed_from_u64(7);
        let params = SamplingParams {
            do_sample: false,
            ..SamplingParams::default()
        };
        let mut logits = vec![0.0, 3.0, 1.0];
        assert_eq!(select_token(&mut logits, &params, &mut rng), Some(1));
    }

    #[test]
    fn sampling_only_returns_surviving_tokens() {
        let mut rng = StdRng::seed_from_u64(11);
        let params = SamplingParams {
            do_sample: true,
            temperature: 1.0,
            top_k: 2,
            top_p: 1.0,
        };
        for _ in 0..50 {
            let mut logits = vec![0.0, 2.0, 2.0, -5.0];
            let token = select_token(&mut logits, &params, &mut rng).unwrap();
            assert!(token == 1 || token == 2);
        }
    }

    #[test]
    fn sampling_fails_when_everything_is_masked() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut logits = vec![f32::NEG_INFINITY; 3];
        assert_eq!(
            select_token(&mut logits, &SamplingParams::default(), &mut rng),
            None
        );
    }
}
