use std::path::Path;

use anyhow::{Context, Result, ensure};
use whisper_rs::{WhisperContext, WhisperContextParameters};

use super::logging::init_whisper_logging;

/// Load a GGML whisper model and return an initialized `WhisperContext`.
pub fn load_context(model_path: &Path) -> Result<WhisperContext> {
    init_whisper_logging();

    ensure!(
        model_path.is_file(),
        "whisper model not found at '{}'",
        model_path.display()
    );

    let path = model_path
        .to_str()
        .with_context(|| format!("model path is not valid UTF-8: {}", model_path.display()))?;

    WhisperContext::new_with_params(path, WhisperContextParameters::default())
        .with_context(|| format!("failed to load model from path: {path}"))
}
