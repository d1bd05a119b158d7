use crate::summarize::LengthBounds;

/// Hub checkpoint used for both passes. Any T5-family repo that publishes
/// `config.json`, `tokenizer.json` and `model.safetensors` works here.
pub const MODEL_ID: &str = "google-t5/t5-base";

// Lengths are in generated tokens, not characters.
pub const TITLE: LengthBounds = LengthBounds::new_unchecked(20, 5);
pub const SUMMARY: LengthBounds = LengthBounds::new_unchecked(110, 60);

pub const SAMPLE_TEXT: &str = "
    Artificial intelligence research has accelerated rapidly over the past decade.
    New architectures, massive datasets, and faster hardware have enabled models
    that can perform language translation, generate images, summarize research,
    and even write software. While these tools offer enormous potential, they also
    raise questions about privacy, labor, and long-term societal impact. As AI
    systems become more capable, researchers emphasize the importance of careful
    evaluation, transparency, and responsible deployment. Understanding both the
    benefits and limitations will shape how we integrate AI into daily life.
    ";
