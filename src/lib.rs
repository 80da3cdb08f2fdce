//! `coursescribe` turns a catalog of course videos into transcripts and branded booklets.
//!
//! This crate provides:
//! - A course document model with JSON checkpoints and Markdown rendering
//! - A three-tier transcript resolver (preferred captions, any captions, local whisper)
//! - Audio decoding and resampling for local transcription
//! - A chapter-aware HTML booklet generator
//!
//! Everything is blocking and sequential. The `coursescribe` binary is the primary consumer.

mod error;
pub use error::{Error, Result};

// Course data and its renderings.
pub mod catalog;
pub mod course;
pub mod markdown;

// Transcript resolution and the run loops that drive it.
pub mod batch;
pub mod opts;
pub mod resolve;

// Resolution tiers.
pub mod audio_source;
pub mod backend;
pub mod backends;
pub mod captions;

// Audio preprocessing and decoding.
pub mod audio_pipeline;
pub mod decoder;
pub(crate) mod decode;
pub(crate) mod demux;

// Joining speech backend output.
pub mod segments;

// Booklet generation.
pub mod booklet;

// Model management and file helpers.
pub mod atomic_write;
pub mod models;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;
