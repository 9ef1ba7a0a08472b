use std::path::Path;

use parking_lot::Mutex;
use tch::{CModule, Device, IValue, Kind, Tensor, no_grad};
use tokenizers::Tokenizer;

use crate::{
    error::ServiceError,
    model::{classifier::NliModel, generation::Seq2SeqModel},
};

pub fn load_tokenizer(path: &Path) -> Result<Tokenizer, ServiceError> {
    if !path.exists() {
        return Err(ServiceError::Other(format!(
            "tokenizer missing: {}",
            path.display()
        )));
    }
    Tokenizer::from_file(path).map_err(|e| ServiceError::Tokenizer(e.to_string()))
}

fn load_module(path: &Path, device: Device) -> Result<CModule, ServiceError> {
    if !path.exists() {
        return Err(ServiceError::Other(format!(
            "model artifact missing: {}",
            path.display()
        )));
    }
    let mut module =
        CModule::load_on_device(path, device).map_err(|e| ServiceError::Inference(e.to_string()))?;
    module.set_eval();
    Ok(module)
}

fn id_tensor(ids: &[u32], device: Device) -> Tensor {
    let ids: Vec<i64> = ids.iter().map(|&id| i64::from(id)).collect();
    Tensor::from_slice(&ids)
        .reshape([1, ids.len() as i64])
        .to(device)
}

/// Pulls the logits tensor out of a module output, which is either a bare
/// tensor or a tuple whose first element is the logits.
fn logits_of(output: IValue) -> Result<Tensor, ServiceError> {
    match output {
        IValue::Tensor(t) => Ok(t),
        IValue::Tuple(tuple) => match tuple.into_iter().next() {
            Some(IValue::Tensor(t)) => Ok(t),
            _ => Err(ServiceError::Inference(
                "expected tensor as first tuple element".into(),
            )),
        },
        _ => Err(ServiceError::Inference(
            "unexpected model output format".into(),
        )),
    }
}

fn to_vec(t: &Tensor) -> Result<Vec<f32>, ServiceError> {
    let flat = t
        .to_kind(Kind::Float)
        .to_device(Device::Cpu)
        .reshape([-1]);
    Vec::<f32>::try_from(&flat).map_err(|e| ServiceError::Inference(e.to_string()))
}

/// Traced encoder-decoder: `forward(input_ids, attention_mask, decoder_input_ids)`.
pub struct TorchSeq2Seq {
    device: Device,
    module: Mutex<CModule>,
}

impl TorchSeq2Seq {
    pub fn load(path: &Path, device: Device) -> Result<Self, ServiceError> {
        Ok(Self {
            device,
            module: Mutex::new(load_module(path, device)?),
        })
    }
}

impl Seq2SeqModel for TorchSeq2Seq {
    fn next_token_logits(
        &self,
        input_ids: &[u32],
        decoder_ids: &[u32],
    ) -> Result<Vec<f32>, ServiceError> {
        no_grad(|| {
            let input = id_tensor(input_ids, self.device);
            let mask = input.ones_like();
            let decoder = id_tensor(decoder_ids, self.device);

            let output = self
                .module
                .lock()
                .forward_is(&[
                    IValue::Tensor(input),
                    IValue::Tensor(mask),
                    IValue::Tensor(decoder),
                ])
                .map_err(|e| ServiceError::Inference(e.to_string()))?;

            // [1, dec_len, vocab] -> logits of the last decoder position
            let logits = logits_of(output)?;
            to_vec(&logits.select(1, -1).squeeze())
        })
    }
}

/// Traced sequence classifier: `forward(input_ids, attention_mask)`.
pub struct TorchNli {
    device: Device,
    module: Mutex<CModule>,
}

impl TorchNli {
    pub fn load(path: &Path, device: Device) -> Result<Self, ServiceError> {
        Ok(Self {
            device,
            module: Mutex::new(load_module(path, device)?),
        })
    }
}

impl NliModel for TorchNli {
    fn logits(&self, input_ids: &[u32]) -> Result<Vec<f32>, ServiceError> {
        no_grad(|| {
            let input = id_tensor(input_ids, self.device);
            let mask = input.ones_like();

            let output = self
                .module
                .lock()
                .forward_is(&[IValue::Tensor(input), IValue::Tensor(mask)])
                .map_err(|e| ServiceError::Inference(e.to_string()))?;

            to_vec(&logits_of(output)?)
        })
    }
}
