use std::error::Error as StdError;

use thiserror::Error;

/// Coursescribe's crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Coursescribe's crate-wide error type.
///
/// The first three variants are the per-lesson failures a batch run expects and
/// recovers from. Everything else is plumbing.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no captions available for video '{video_id}'")]
    NoCaptions { video_id: String },

    #[error("audio download failed for video '{video_id}': {reason}")]
    DownloadFailed { video_id: String, reason: String },

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub(crate) fn no_captions(video_id: impl Into<String>) -> Self {
        Self::NoCaptions {
            video_id: video_id.into(),
        }
    }

    pub(crate) fn download_failed(video_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            video_id: video_id.into(),
            reason: reason.into(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Message(format!("{err:#}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(Box::new(err))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Self::Other(Box::new(err))
    }
}
