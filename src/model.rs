use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::t5;
use log::{debug, info};
use std::sync::Mutex;
use tokenizers::Tokenizer;

use crate::error::SummarizeError;
use crate::hub::{Hub, ModelFiles};
use crate::summarize::LengthBounds;

/// Anything that can turn a passage into generated text within the given
/// length bounds. Implementations must decode deterministically.
pub trait SummarizationModel {
    fn generate(&self, text: &str, bounds: LengthBounds) -> Result<String, SummarizeError>;
}

// T5 was trained on inputs of this width; anything longer is cut.
const MAX_INPUT_TOKENS: usize = 512;
const TASK_PREFIX: &str = "summarize: ";

pub struct T5Summarizer {
    model: Mutex<t5::T5ForConditionalGeneration>,
    tokenizer: Tokenizer,
    config: t5::Config,
    device: Device,
}

impl T5Summarizer {
    /// Loads `model_id`, fetching it into the local cache on first use.
    pub fn load(model_id: &str) -> Result<Self, SummarizeError> {
        let hub = Hub::new().map_err(|e| SummarizeError::unavailable(model_id, format!("{:#}", e)))?;
        let files = hub
            .fetch_model(model_id)
            .map_err(|e| SummarizeError::unavailable(model_id, format!("{:#}", e)))?;
        Self::from_files(model_id, &files)
    }

    pub fn from_files(model_id: &str, files: &ModelFiles) -> Result<Self, SummarizeError> {
        let unavailable = |reason: String| SummarizeError::unavailable(model_id, reason);

        let raw = std::fs::read_to_string(&files.config)
            .map_err(|e| unavailable(format!("reading {:?}: {}", files.config, e)))?;
        let mut config: t5::Config =
            serde_json::from_str(&raw).map_err(|e| unavailable(format!("bad config: {}", e)))?;
        config.use_cache = true;

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| unavailable(format!("loading tokenizer: {}", e)))?;

        let device = Device::Cpu;
        // Safety: the cached weights file is not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&files.weights], DType::F32, &device)
                .map_err(|e| unavailable(format!("mapping weights: {}", e)))?
        };
        let model = t5::T5ForConditionalGeneration::load(vb, &config)
            .map_err(|e| unavailable(format!("building model: {}", e)))?;
        info!("Loaded model {}", model_id);

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            config,
            device,
        })
    }

    fn encode_input(&self, text: &str) -> Result<Vec<u32>, SummarizeError> {
        let prompt = format!("{}{}", TASK_PREFIX, collapse_whitespace(text));
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| SummarizeError::Inference(e.to_string()))?;
        Ok(truncate_input(
            encoding.get_ids().to_vec(),
            self.config.eos_token_id as u32,
        ))
    }

    /// Argmax decoding from the start token. Returns generated ids without
    /// the start or end token.
    fn greedy_decode(
        &self,
        model: &mut t5::T5ForConditionalGeneration,
        encoder_output: &Tensor,
        bounds: LengthBounds,
    ) -> Result<Vec<u32>, SummarizeError> {
        let start = self
            .config
            .decoder_start_token_id
            .unwrap_or(self.config.pad_token_id) as u32;
        decode_greedy(start, self.config.eos_token_id, bounds, |tokens| {
            // With the KV cache on, only the newest token is fed back.
            let fed = if tokens.len() == 1 {
                tokens
            } else {
                &tokens[tokens.len() - 1..]
            };
            let decoder_input = Tensor::new(fed, &self.device)?.unsqueeze(0)?;
            let logits = model
                .decode(&decoder_input, encoder_output)?
                .squeeze(0)?
                .to_dtype(DType::F32)?
                .to_vec1::<f32>()?;
            Ok(logits)
        })
    }
}

/// Cuts `ids` to the encoder width, keeping `eos` as the final token.
fn truncate_input(mut ids: Vec<u32>, eos: u32) -> Vec<u32> {
    if ids.len() > MAX_INPUT_TOKENS {
        debug!("Truncating input from {} to {} tokens", ids.len(), MAX_INPUT_TOKENS);
        ids.truncate(MAX_INPUT_TOKENS - 1);
        ids.push(eos);
    }
    ids
}

/// Greedy generation loop. `next_logits` sees every token so far, starting
/// with `start`, and returns scores for the next one. At least `min_len` and
/// at most `max_len` tokens are produced; the result excludes `start` and
/// the end token.
fn decode_greedy<F>(
    start: u32,
    eos: usize,
    bounds: LengthBounds,
    mut next_logits: F,
) -> Result<Vec<u32>, SummarizeError>
where
    F: FnMut(&[u32]) -> Result<Vec<f32>, SummarizeError>,
{
    let mut tokens = vec![start];
    for step in 0..bounds.max_len {
        let logits = next_logits(&tokens)?;
        let allow_eos = step >= bounds.min_len;
        let next = pick_next_token(&logits, eos, allow_eos)
            .ok_or_else(|| SummarizeError::Inference("model produced no logits".to_string()))?;
        if next == eos {
            break;
        }
        tokens.push(next as u32);
    }
    Ok(tokens.split_off(1))
}

impl SummarizationModel for T5Summarizer {
    fn generate(&self, text: &str, bounds: LengthBounds) -> Result<String, SummarizeError> {
        let input_ids = self.encode_input(text)?;
        debug!("Input: {} tokens, bounds {:?}", input_ids.len(), bounds);

        let mut model = self
            .model
            .lock()
            .map_err(|_| SummarizeError::Inference("model lock poisoned".to_string()))?;

        let input = Tensor::new(input_ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let encoder_output = model.encode(&input)?;

        let decoded = self.greedy_decode(&mut model, &encoder_output, bounds);
        model.clear_kv_cache();
        let tokens = decoded?;

        debug!("Generated {} tokens", tokens.len());
        self.tokenizer
            .decode(&tokens, true)
            .map_err(|e| SummarizeError::Inference(e.to_string()))
    }
}

/// Greedy choice over one step's logits. While `allow_eos` is false the end
/// token is never picked, which is how the minimum length is enforced.
pub fn pick_next_token(logits: &[f32], eos: usize, allow_eos: bool) -> Option<usize> {
    logits
        .iter()
        .enumerate()
        .filter(|(i, v)| (allow_eos || *i != eos) && !v.is_nan())
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
