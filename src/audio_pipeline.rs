//! PCM normalization for local transcription.
//!
//! Responsibilities:
//! - Convert Symphonia-decoded PCM into interleaved `f32`
//! - Downmix to mono
//! - Resample to whisper's 16 kHz (when needed)
//!
//! `finish()` must be called at end-of-stream to flush the resampler's partial block.

use anyhow::{Context, Result, anyhow, bail};
use rubato::{Resampler, SincFixedIn, WindowFunction};
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};

/// Sample rate whisper expects (Hz).
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

// Source frames per rubato `process()` call.
const RESAMPLE_BLOCK_FRAMES: usize = 2048;

/// Stateful converter from decoded packets to mono 16 kHz `f32` samples.
#[derive(Default)]
pub struct Normalizer {
    sample_buf: Option<SampleBuffer<f32>>,

    // Only created when the source rate differs from the target rate.
    resampler: Option<SincFixedIn<f32>>,

    // Mono source samples waiting for a full resampler block.
    pending: Vec<f32>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize one decoded buffer, appending the result to `out`.
    pub fn push(&mut self, decoded: &AudioBufferRef<'_>, out: &mut Vec<f32>) -> Result<()> {
        let (interleaved, src_rate, channels) =
            decoded_to_interleaved_f32(decoded, &mut self.sample_buf)?;
        let mono = downmix_to_mono(&interleaved, channels);

        if src_rate == TARGET_SAMPLE_RATE {
            out.extend_from_slice(&mono);
            return Ok(());
        }

        self.ensure_resampler(src_rate)?;
        self.pending.extend_from_slice(&mono);

        while self.pending.len() >= RESAMPLE_BLOCK_FRAMES {
            let block: Vec<f32> = self.pending.drain(..RESAMPLE_BLOCK_FRAMES).collect();
            self.resample_block(&block, out)?;
        }

        Ok(())
    }

    /// Flush the buffered tail, zero-padded to a full block.
    ///
    /// A no-op when no resampling happened.
    pub fn finish(&mut self, out: &mut Vec<f32>) -> Result<()> {
        if self.resampler.is_none() || self.pending.is_empty() {
            return Ok(());
        }

        let mut block = std::mem::take(&mut self.pending);
        block.resize(RESAMPLE_BLOCK_FRAMES, 0.0);
        self.resample_block(&block, out)
    }

    fn ensure_resampler(&mut self, src_rate: u32) -> Result<()> {
        if self.resampler.is_some() {
            return Ok(());
        }

        let rs = SincFixedIn::<f32>::new(
            TARGET_SAMPLE_RATE as f64 / src_rate as f64,
            2.0,
            rubato::SincInterpolationParameters {
                sinc_len: 256,
                f_cutoff: 0.95,
                interpolation: rubato::SincInterpolationType::Linear,
                oversampling_factor: 256,
                window: WindowFunction::BlackmanHarris2,
            },
            RESAMPLE_BLOCK_FRAMES,
            1,
        )
        .map_err(|e| anyhow!(e))
        .with_context(|| format!("failed to init resampler for {src_rate} Hz input"))?;

        self.resampler = Some(rs);
        Ok(())
    }

    fn resample_block(&mut self, block: &[f32], out: &mut Vec<f32>) -> Result<()> {
        let rs = self
            .resampler
            .as_mut()
            .ok_or_else(|| anyhow!("resampler not initialized"))?;

        let resampled = rs
            .process(&[block], None)
            .map_err(|e| anyhow!(e))
            .context("resampler process failed")?;

        let [mono] = resampled.as_slice() else {
            bail!("expected mono output from resampler");
        };
        out.extend_from_slice(mono);
        Ok(())
    }
}

fn decoded_to_interleaved_f32(
    decoded: &AudioBufferRef<'_>,
    sample_buf: &mut Option<SampleBuffer<f32>>,
) -> Result<(Vec<f32>, u32, usize)> {
    let spec = *decoded.spec();
    let channels = spec.channels.count();
    if channels == 0 {
        bail!("decoded audio had zero channels");
    }

    // VBR streams can grow the packet size mid-file.
    let needed = decoded.capacity() * channels;
    if sample_buf.as_ref().is_none_or(|buf| buf.capacity() < needed) {
        *sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
    }
    let buf = sample_buf
        .as_mut()
        .ok_or_else(|| anyhow!("sample buffer missing"))?;
    buf.copy_interleaved_ref(decoded.clone());

    Ok((buf.samples().to_vec(), spec.rate, channels))
}

/// Equal-weight average across channels.
fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_is_noop_without_resampler() -> anyhow::Result<()> {
        let mut normalizer = Normalizer::new();
        let mut out = Vec::new();
        normalizer.finish(&mut out)?;
        assert!(out.is_empty());
        Ok(())
    }

    #[test]
    fn downmix_single_channel_is_identity() {
        let input = vec![0.0, 1.0, -1.0];
        assert_eq!(downmix_to_mono(&input, 1), input);
    }

    #[test]
    fn downmix_averages_channels() {
        // (L=1, R=3), (L=-1, R=1) => 2, 0
        let interleaved = vec![1.0, 3.0, -1.0, 1.0];
        assert_eq!(downmix_to_mono(&interleaved, 2), vec![2.0, 0.0]);
    }

    #[test]
    fn resample_block_errors_when_resampler_is_missing() {
        let mut normalizer = Normalizer::new();
        let err = normalizer
            .resample_block(&[0.0; 16], &mut Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("resampler not initialized"));
    }

    #[test]
    fn resampled_tail_is_flushed_by_finish() -> anyhow::Result<()> {
        let mut normalizer = Normalizer::new();
        normalizer.ensure_resampler(8_000)?;
        normalizer.ensure_resampler(8_000)?; // idempotent

        normalizer.pending = vec![0.0; 7];
        let mut out = Vec::new();
        normalizer.finish(&mut out)?;

        // One padded 2048-frame block at roughly 2x upsampling.
        let expected = RESAMPLE_BLOCK_FRAMES * 2;
        assert!(out.len().abs_diff(expected) <= 16, "got {} samples", out.len());
        assert!(normalizer.pending.is_empty());
        Ok(())
    }
}
