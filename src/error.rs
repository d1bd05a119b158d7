use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Weights, tokenizer or config could not be fetched or loaded.
    #[error("model '{model_id}' is unavailable: {reason}")]
    ModelUnavailable { model_id: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model returned an empty summary")]
    EmptyOutput,
}

impl SummarizeError {
    pub fn unavailable(model_id: &str, reason: impl std::fmt::Display) -> Self {
        Self::ModelUnavailable {
            model_id: model_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<candle_core::Error> for SummarizeError {
    fn from(e: candle_core::Error) -> Self {
        Self::Inference(e.to_string())
    }
}
