// src/decoder.rs

//! Decode a media file into one contiguous buffer of mono 16 kHz `f32` samples.
//!
//! - `demux` handles probing + packet iteration
//! - `decode` handles codec decoding
//! - `audio_pipeline` handles downmix + resample
//!
//! Lesson audio is transcribed in one whisper pass, so nothing here streams.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use symphonia::core::io::MediaSource;

use crate::audio_pipeline::Normalizer;
use crate::decode::{decode_packet_and_then, make_decoder_for_track};
use crate::demux::{next_packet, probe_default_track};

/// Decode the audio track of the file at `path`.
///
/// The file extension is passed to the prober as a hint.
pub fn decode_file(path: &Path) -> Result<Vec<f32>> {
    let file =
        File::open(path).with_context(|| format!("failed to open audio: {}", path.display()))?;
    let hint = path.extension().and_then(|ext| ext.to_str());

    decode_source(Box::new(file), hint)
        .with_context(|| format!("failed to decode audio: {}", path.display()))
}

/// Decode any seekable Symphonia source.
pub fn decode_source(
    source: Box<dyn MediaSource>,
    hint_extension: Option<&str>,
) -> Result<Vec<f32>> {
    let (mut format, track) = probe_default_track(source, hint_extension)?;
    let mut decoder = make_decoder_for_track(&track)?;
    let mut normalizer = Normalizer::new();
    let mut samples = Vec::new();

    while let Some(packet) = next_packet(&mut format)? {
        if packet.track_id() != track.id {
            continue;
        }

        decode_packet_and_then(&mut decoder, &packet, |decoded| {
            normalizer
                .push(&decoded, &mut samples)
                .context("audio pipeline failed while processing decoded samples")
        })?;
    }

    normalizer
        .finish(&mut samples)
        .context("audio pipeline failed during finish")?;

    Ok(samples)
}
