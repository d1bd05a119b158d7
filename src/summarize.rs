use crate::error::SummarizeError;
use crate::model::SummarizationModel;

/// Output length limits, counted in generated tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBounds {
    pub max_len: usize,
    pub min_len: usize,
}

impl LengthBounds {
    pub fn new(max_len: usize, min_len: usize) -> Result<Self, SummarizeError> {
        if max_len == 0 {
            return Err(SummarizeError::InvalidInput(
                "max_len must be at least 1".to_string(),
            ));
        }
        if min_len > max_len {
            return Err(SummarizeError::InvalidInput(format!(
                "min_len ({min_len}) exceeds max_len ({max_len})"
            )));
        }
        Ok(Self { max_len, min_len })
    }

    /// For compile-time presets; callers own the invariant.
    pub(crate) const fn new_unchecked(max_len: usize, min_len: usize) -> Self {
        Self { max_len, min_len }
    }
}

/// Runs one summarization pass and returns the trimmed text.
///
/// Input is checked before the model is touched, so a bad request never
/// costs an inference call.
pub fn summarize(
    model: &dyn SummarizationModel,
    text: &str,
    max_len: usize,
    min_len: usize,
) -> Result<String, SummarizeError> {
    if text.trim().is_empty() {
        return Err(SummarizeError::InvalidInput("text is empty".to_string()));
    }
    let bounds = LengthBounds::new(max_len, min_len)?;

    let generated = model.generate(text, bounds)?;
    let trimmed = generated.trim();
    if trimmed.is_empty() {
        return Err(SummarizeError::EmptyOutput);
    }
    Ok(trimmed.to_string())
}
