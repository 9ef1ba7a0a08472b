use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

#[cfg(feature = "tch-backend")]
use tch::Device;

pub const DEFAULT_EMOTION_LABELS: [&str; 9] = [
    "sad",
    "joyful",
    "love",
    "angry",
    "fearful",
    "surprise",
    "neutral",
    "formal",
    "inspirational",
];

pub const DEFAULT_HYPOTHESIS_TEMPLATE: &str = "This example is {}.";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    /// TorchScript export of the seq2seq summarizer, called as
    /// `forward(input_ids, attention_mask, decoder_input_ids) -> logits`.
    pub summarizer_module_path: PathBuf,
    pub summarizer_tokenizer_path: PathBuf,
    /// TorchScript export of the NLI classifier, called as
    /// `forward(input_ids, attention_mask) -> logits`.
    pub classifier_module_path: PathBuf,
    pub classifier_tokenizer_path: PathBuf,
    pub max_input_tokens: usize,
    pub temperature: f64,
    pub top_k: usize,
    pub top_p: f64,
    pub do_sample: bool,
    pub no_repeat_ngram_size: usize,
    pub sampling_seed: Option<u64>,
    pub emotion_labels: Vec<String>,
    pub hypothesis_template: String,
    pub entailment_index: usize,
    pub contradiction_index: usize,
    pub fetch_timeout: Duration,
    pub fetch_user_agent: String,
    #[cfg(feature = "tch-backend")]
    pub device: Device,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("SERVER_ADDR")
            .unwrap_or_else(|| "127.0.0.1:5000".into())
            .parse()
            .unwrap_or_else(|_| SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000));

        let summarizer_module_path = PathBuf::from(
            lookup("SUMMARIZER_MODULE_PATH")
                .unwrap_or_else(|| "models/bart_large_cnn.ts".to_string()),
        );
        let summarizer_tokenizer_path = PathBuf::from(
            lookup("SUMMARIZER_TOKENIZER_PATH")
                .unwrap_or_else(|| "models/bart_large_cnn_tokenizer.json".to_string()),
        );
        let classifier_module_path = PathBuf::from(
            lookup("CLASSIFIER_MODULE_PATH")
                .unwrap_or_else(|| "models/bart_large_mnli.ts".to_string()),
        );
        let classifier_tokenizer_path = PathBuf::from(
            lookup("CLASSIFIER_TOKENIZER_PATH")
                .unwrap_or_else(|| "models/bart_large_mnli_tokenizer.json".to_string()),
        );

        let max_input_tokens = parse_var(&lookup, "MAX_INPUT_TOKENS").unwrap_or(1024);
        let temperature = parse_var(&lookup, "TEMPERATURE").unwrap_or(0.8);
        let top_k = parse_var(&lookup, "TOP_K").unwrap_or(50);
        let top_p = parse_var(&lookup, "TOP_P").unwrap_or(0.95);
        let do_sample = lookup("DO_SAMPLE")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);
        if do_sample && temperature <= 0.0 {
            anyhow::bail!("TEMPERATURE must be positive when sampling, got {temperature}");
        }
        let no_repeat_ngram_size = parse_var(&lookup, "NO_REPEAT_NGRAM_SIZE").unwrap_or(3);
        let sampling_seed = parse_var(&lookup, "SAMPLING_SEED");

        let emotion_labels = lookup("EMOTION_LABELS")
            .map(|raw| parse_labels(&raw))
            .filter(|labels| !labels.is_empty())
            .unwrap_or_else(|| {
                DEFAULT_EMOTION_LABELS
                    .iter()
                    .map(|label| label.to_string())
                    .collect()
            });
        let hypothesis_template = lookup("HYPOTHESIS_TEMPLATE")
            .unwrap_or_else(|| DEFAULT_HYPOTHESIS_TEMPLATE.to_string());
        if !hypothesis_template.contains("{}") {
            anyhow::bail!("HYPOTHESIS_TEMPLATE must contain a '{{}}' placeholder");
        }
        let entailment_index = parse_var(&lookup, "ENTAILMENT_INDEX").unwrap_or(2);
        let contradiction_index = parse_var(&lookup, "CONTRADICTION_INDEX").unwrap_or(0);
        if entailment_index == contradiction_index {
            anyhow::bail!("ENTAILMENT_INDEX and CONTRADICTION_INDEX must differ");
        }

        let fetch_timeout = parse_var(&lookup, "FETCH_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));
        let fetch_user_agent =
            lookup("FETCH_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        #[cfg(feature = "tch-backend")]
        let device = {
            let raw = lookup("DEVICE").unwrap_or_else(|| "cpu".into());
            parse_device(&raw)
        };

        Ok(Self {
            listen_addr,
            summarizer_module_path,
            summarizer_tokenizer_path,
            classifier_module_path,
            classifier_tokenizer_path,
            max_input_tokens,
            temperature,
            top_k,
            top_p,
            do_sample,
            no_repeat_ngram_size,
            sampling_seed,
            emotion_labels,
            hypothesis_template,
            entailment_index,
            contradiction_index,
            fetch_timeout,
            fetch_user_agent,
            #[cfg(feature = "tch-backend")]
            device,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn parse_flag(raw: &str) -> bool {
    !matches!(
        raw.trim().to_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

fn parse_labels(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(feature = "tch-backend")]
fn parse_device(raw: &str) -> Device {
    let lower = raw.to_lowercase();
    if lower == "cpu" {
        Device::Cpu
    } else if lower.starts_with("cuda") {
        let idx = lower
            .split(':')
            .nth(1)
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);
        if tch::Cuda::is_available() {
            Device::Cuda(idx)
        } else {
            Device::Cpu
        }
    } else {
        Device::Cpu
    }
}
