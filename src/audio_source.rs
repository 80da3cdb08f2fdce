//! Downloading lesson audio for local transcription (resolution tier three).

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::debug;

use crate::course::youtube_url;
use crate::{Error, Result};

/// An audio file on disk that is removed when dropped.
#[derive(Debug)]
pub struct DownloadedAudio {
    path: PathBuf,
    _dir: Option<TempDir>,
}

impl DownloadedAudio {
    /// Wrap a file that lives inside `dir`; both go away on drop.
    pub fn in_temp_dir(dir: TempDir, path: PathBuf) -> Self {
        Self {
            path,
            _dir: Some(dir),
        }
    }

    /// Wrap a file owned by someone else; dropping leaves it alone.
    pub fn borrowed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _dir: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Something that can fetch the audio track of a video.
pub trait AudioSource {
    fn download(&self, video_id: &str) -> Result<DownloadedAudio>;
}

/// Audio download through the `yt-dlp` command line tool.
///
/// Audio is extracted to MP3 (`yt-dlp` needs `ffmpeg` for that) so the symphonia decoder can
/// read it regardless of the source codec.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    audio_quality: String,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            audio_quality: "128K".to_owned(),
        }
    }

    pub fn with_audio_quality(mut self, quality: impl Into<String>) -> Self {
        self.audio_quality = quality.into();
        self
    }

    fn command(&self, video_id: &str, dir: &Path) -> Command {
        let template = dir.join(format!("{video_id}.%(ext)s"));

        let mut cmd = Command::new(&self.program);
        cmd.args(["-f", "bestaudio/best", "-x", "--audio-format", "mp3"])
            .arg("--audio-quality")
            .arg(&self.audio_quality)
            .args(["--quiet", "--no-warnings", "--no-progress"])
            .arg("-o")
            .arg(template)
            .arg(youtube_url(video_id));
        cmd
    }
}

impl AudioSource for YtDlp {
    fn download(&self, video_id: &str) -> Result<DownloadedAudio> {
        let dir = tempfile::Builder::new()
            .prefix("coursescribe-audio-")
            .tempdir()?;

        debug!(video_id, dir = %dir.path().display(), "downloading audio with yt-dlp");

        let output = self.command(video_id, dir.path()).output().map_err(|e| {
            Error::download_failed(
                video_id,
                format!("failed to run '{}': {e}", self.program.display()),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::download_failed(
                video_id,
                format!("yt-dlp exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        let path = dir.path().join(format!("{video_id}.mp3"));
        if !path.is_file() {
            return Err(Error::download_failed(
                video_id,
                format!("expected output file missing: {}", path.display()),
            ));
        }

        Ok(DownloadedAudio::in_temp_dir(dir, path))
    }
}
