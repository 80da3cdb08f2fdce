use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};
use whisper_rs::WhisperContext;

use crate::backend::Backend;
use crate::decoder::decode_file;
use crate::opts::Opts;
use crate::segments::join_segments;
use crate::{Error, Result};

mod ctx;
mod logging;
mod segments;

use segments::transcribe_segments;

/// Built-in backend powered by `whisper-rs` / `whisper.cpp`.
///
/// The model can be loaded up front ([`WhisperBackend::new`]) or on first use
/// ([`WhisperBackend::lazy`]); a batch run whose lessons are all covered by captions never
/// pays for loading it.
pub struct WhisperBackend {
    model_path: PathBuf,
    ctx: Option<WhisperContext>,
}

impl WhisperBackend {
    /// Load a whisper.cpp model from disk now.
    pub fn new(model_path: impl Into<PathBuf>) -> Result<Self> {
        let mut backend = Self::lazy(model_path);
        backend.context()?;
        Ok(backend)
    }

    /// Defer model loading until the first transcription.
    pub fn lazy(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ctx: None,
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn is_loaded(&self) -> bool {
        self.ctx.is_some()
    }

    fn context(&mut self) -> Result<&WhisperContext> {
        if self.ctx.is_none() {
            info!(model = %self.model_path.display(), "loading whisper model");
            let ctx = ctx::load_context(&self.model_path)
                .map_err(|e| Error::TranscriptionFailed(format!("{e:#}")))?;
            self.ctx = Some(ctx);
        }

        self.ctx
            .as_ref()
            .ok_or_else(|| Error::msg("whisper context missing after load"))
    }
}

impl Backend for WhisperBackend {
    fn transcribe_file(&mut self, opts: &Opts, path: &Path) -> Result<String> {
        let samples =
            decode_file(path).map_err(|e| Error::TranscriptionFailed(format!("{e:#}")))?;

        if samples.is_empty() {
            debug!(path = %path.display(), "decoded no samples");
            return Ok(String::new());
        }

        let ctx = self.context()?;
        let segments = transcribe_segments(ctx, opts, &samples)
            .with_context(|| format!("whisper failed on {}", path.display()))
            .map_err(|e| Error::TranscriptionFailed(format!("{e:#}")))?;

        debug!(
            path = %path.display(),
            segments = segments.len(),
            "whisper pass finished"
        );

        Ok(join_segments(&segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_backend_does_not_touch_the_model() {
        let backend = WhisperBackend::lazy("/nonexistent/ggml-small.bin");
        assert!(!backend.is_loaded());
        assert_eq!(backend.model_path(), Path::new("/nonexistent/ggml-small.bin"));
    }

    #[test]
    fn missing_model_is_a_transcription_failure() {
        let err = WhisperBackend::new("/nonexistent/ggml-small.bin")
            .err()
            .expect("expected load failure");
        assert!(matches!(err, Error::TranscriptionFailed(ref msg) if msg.contains("not found")));
    }

    #[test]
    fn undecodable_audio_fails_before_model_load() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let audio = dir.path().join("lesson.mp3");
        std::fs::write(&audio, b"not audio")?;

        let mut backend = WhisperBackend::lazy("/nonexistent/ggml-small.bin");
        let err = backend
            .transcribe_file(&Opts::default(), &audio)
            .unwrap_err();

        assert!(matches!(err, Error::TranscriptionFailed(_)));
        assert!(!backend.is_loaded());
        Ok(())
    }
}
