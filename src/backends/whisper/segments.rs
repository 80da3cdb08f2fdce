use anyhow::{Context, Result};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperSegment};

use crate::opts::Opts;

/// Run one full whisper pass over `samples` and collect the text of each segment.
pub(super) fn transcribe_segments(
    ctx: &WhisperContext,
    opts: &Opts,
    samples: &[f32],
) -> Result<Vec<String>> {
    let params = build_full_params(opts);

    let mut state = ctx
        .create_state()
        .context("failed to create whisper state")?;

    state
        .full(params, samples)
        .context("failed to run whisper full()")?;

    state.as_iter().map(segment_text).collect()
}

fn segment_text(segment: WhisperSegment) -> Result<String> {
    let text = segment.to_str().context("failed to get segment text")?;
    Ok(text.to_owned())
}

fn build_full_params(opts: &Opts) -> FullParams<'_, '_> {
    let mut params = FullParams::new(SamplingStrategy::BeamSearch {
        beam_size: 5,
        patience: 1.0,
    });

    params.set_n_threads(opts.effective_threads() as i32);
    params.set_translate(false);
    params.set_language(opts.language.as_deref());
    params.set_no_context(true);
    params.set_single_segment(false);

    params.set_print_progress(false);
    params.set_print_special(false);
    params.set_print_realtime(false);
    params.set_print_timestamps(false);

    params
}
