use std::path::Path;

use crate::Result;
use crate::opts::Opts;

/// Pluggable local speech-to-text backend (resolution tier three).
///
/// A backend turns an audio file on disk into transcript text. Implementations decide how
/// the file is decoded and whether model loading is deferred until the first call.
pub trait Backend {
    /// Transcribe the audio at `path`.
    ///
    /// Failures should surface as [`crate::Error::TranscriptionFailed`]. Silence may produce an
    /// empty string; callers treat blank text as "no transcript".
    fn transcribe_file(&mut self, opts: &Opts, path: &Path) -> Result<String>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn transcribe_file(&mut self, opts: &Opts, path: &Path) -> Result<String> {
        (**self).transcribe_file(opts, path)
    }
}
