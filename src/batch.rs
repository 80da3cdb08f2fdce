//! Run loops that fill missing transcripts and checkpoint after every success.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use regex::Regex;
use tracing::{info, warn};

use crate::Result;
use crate::backend::Backend;
use crate::course::{Course, LessonPos};
use crate::opts::Opts;
use crate::resolve::{Failure, Resolution, Resolver, Tier};

/// Audio extensions picked up by [`transcribe_directory`].
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac", "ogg"];

/// Per-run accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Lessons handed to a resolver or backend.
    pub examined: usize,
    pub preferred_captions: usize,
    pub any_captions: usize,
    pub local: usize,
    pub unavailable: usize,
}

impl RunSummary {
    /// Lessons that received a transcript during this run.
    pub fn filled(&self) -> usize {
        self.preferred_captions + self.any_captions + self.local
    }

    fn record(&mut self, tier: Option<Tier>) {
        self.examined += 1;
        match tier {
            Some(Tier::PreferredCaptions) => self.preferred_captions += 1,
            Some(Tier::AnyCaptions) => self.any_captions += 1,
            Some(Tier::LocalTranscription) => self.local += 1,
            None => self.unavailable += 1,
        }
    }
}

/// One finished lesson, reported to the progress observer.
#[derive(Debug, Clone, Copy)]
pub struct LessonOutcome<'a> {
    pub pos: LessonPos,
    pub label: &'a str,
    pub video_id: &'a str,
    pub title: &'a str,
    pub tier: Option<Tier>,
    pub chars: usize,
    /// Why the lesson stayed empty, when a tier was attempted and failed.
    pub failure: Option<&'a Failure>,
}

/// Resolve every lesson without a transcript, in course order.
///
/// `checkpoint` runs immediately after each lesson that gets filled; an error from it aborts
/// the run since the output can no longer be trusted. Lessons that already carry text are
/// never passed to the resolver.
pub fn fill_missing<C, O>(
    course: &mut Course,
    resolver: &mut Resolver<'_>,
    mut checkpoint: C,
    mut observer: O,
) -> Result<RunSummary>
where
    C: FnMut(&Course) -> Result<()>,
    O: FnMut(&LessonOutcome<'_>),
{
    let mut summary = RunSummary::default();

    for pos in course.missing() {
        let label = course.label(pos);
        let Some(lesson) = course.lesson(pos) else {
            continue;
        };
        let video_id = lesson.id.clone();

        let resolution = resolver.resolve_transcript(&video_id);
        let tier = resolution.tier();
        let chars = resolution.text().map_or(0, |t| t.chars().count());

        let (filled, failure) = match resolution {
            Resolution::Resolved { text, .. } => (
                course
                    .lesson_mut(pos)
                    .is_some_and(|lesson| lesson.fill_transcript(text)),
                None,
            ),
            Resolution::Unavailable { last_failure } => (false, last_failure),
        };

        summary.record(tier.filter(|_| filled));

        if let Some(lesson) = course.lesson(pos) {
            observer(&LessonOutcome {
                pos,
                label: &label,
                video_id: &video_id,
                title: &lesson.title,
                tier: tier.filter(|_| filled),
                chars: if filled { chars } else { 0 },
                failure: failure.as_ref(),
            });
        }

        if filled {
            info!(lesson = %label, video_id, ?tier, chars, "transcript filled");
            checkpoint(course)?;
        }
    }

    Ok(summary)
}

fn numbered_file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+)_(\d+)_.*\.(?i:mp3|wav|m4a|flac|ogg)$").expect("static regex is valid")
    })
}

/// Map an audio file name onto a lesson.
///
/// `<module id>_<lesson number>_<anything>.<ext>` addresses a lesson by position and
/// `<video id>.<ext>` by video id.
pub fn match_audio_file(course: &Course, file_name: &str) -> Option<LessonPos> {
    if let Some(caps) = numbered_file_re().captures(file_name) {
        let module_id = caps[1].parse().ok()?;
        let lesson_number = caps[2].parse().ok()?;
        return course.find_lesson(module_id, lesson_number);
    }

    let (stem, ext) = file_name.rsplit_once('.')?;
    let known = AUDIO_EXTENSIONS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(ext));
    if !known {
        return None;
    }
    course.find_video(stem)
}

/// Audio files in `dir` matched to lessons, sorted by lesson position.
pub fn scan_audio_dir(course: &Course, dir: &Path) -> Result<Vec<(LessonPos, PathBuf)>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read audio directory: {}", dir.display()))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        match match_audio_file(course, name) {
            Some(pos) => found.push((pos, entry.path())),
            None => warn!(file = name, "audio file does not match any lesson"),
        }
    }

    found.sort();
    Ok(found)
}

/// Transcribe pre-downloaded audio in `dir` for lessons that have no transcript yet.
///
/// Transcription failures are logged and leave the lesson unfilled. The first file matched
/// to a lesson wins.
pub fn transcribe_directory<B, C, O>(
    course: &mut Course,
    dir: &Path,
    backend: &mut B,
    opts: &Opts,
    mut checkpoint: C,
    mut observer: O,
) -> Result<RunSummary>
where
    B: Backend + ?Sized,
    C: FnMut(&Course) -> Result<()>,
    O: FnMut(&LessonOutcome<'_>),
{
    let mut summary = RunSummary::default();

    for (pos, path) in scan_audio_dir(course, dir)? {
        let Some(lesson) = course.lesson(pos) else {
            continue;
        };
        if lesson.has_transcript() {
            continue;
        }
        let label = course.label(pos);
        let video_id = lesson.id.clone();

        let (text, mut failure) = match backend.transcribe_file(opts, &path) {
            Ok(text) => (text, None),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "transcription failed");
                (String::new(), Some(Failure::transcription(err)))
            }
        };
        let chars = text.trim().chars().count();

        let filled = course
            .lesson_mut(pos)
            .is_some_and(|lesson| lesson.fill_transcript(text));
        if !filled && failure.is_none() {
            failure = Some(Failure::no_speech());
        }
        let tier = filled.then_some(Tier::LocalTranscription);
        summary.record(tier);

        if let Some(lesson) = course.lesson(pos) {
            observer(&LessonOutcome {
                pos,
                label: &label,
                video_id: &video_id,
                title: &lesson.title,
                tier,
                chars: if filled { chars } else { 0 },
                failure: failure.as_ref(),
            });
        }

        if filled {
            checkpoint(course)?;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{Lesson, Module};

    fn course() -> Course {
        Course::new(vec![
            Module {
                id: 1,
                title: "יסודות".into(),
                lessons: vec![
                    Lesson::new("aaaaaaaaaaa", "one", "10:00"),
                    Lesson::new("bbbbbbbbbbb", "two", "11:00"),
                ],
            },
            Module {
                id: 2,
                title: "מתקדם".into(),
                lessons: vec![Lesson::new("ccccccccccc", "three", "12:00")],
            },
        ])
    }

    #[test]
    fn summary_counts_filled_tiers() {
        let mut summary = RunSummary::default();
        summary.record(Some(Tier::PreferredCaptions));
        summary.record(Some(Tier::LocalTranscription));
        summary.record(None);

        assert_eq!(summary.examined, 3);
        assert_eq!(summary.filled(), 2);
        assert_eq!(summary.unavailable, 1);
    }

    #[test]
    fn numbered_files_map_by_module_and_position() {
        let course = course();
        assert_eq!(
            match_audio_file(&course, "1_2_two.mp3"),
            Some(LessonPos {
                module: 0,
                lesson: 1
            })
        );
        assert_eq!(
            match_audio_file(&course, "2_1_x.WAV"),
            Some(LessonPos {
                module: 1,
                lesson: 0
            })
        );
        assert_eq!(match_audio_file(&course, "3_1_x.mp3"), None);
        assert_eq!(match_audio_file(&course, "1_2_two.txt"), None);
    }

    #[test]
    fn video_id_files_map_by_id() {
        let course = course();
        assert_eq!(
            match_audio_file(&course, "ccccccccccc.m4a"),
            Some(LessonPos {
                module: 1,
                lesson: 0
            })
        );
        assert_eq!(match_audio_file(&course, "zzzzzzzzzzz.mp3"), None);
        assert_eq!(match_audio_file(&course, "ccccccccccc"), None);
    }

    #[test]
    fn scan_skips_unmatched_and_sorts() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["2_1_c.mp3", "1_1_a.mp3", "notes.txt", "random.mp3"] {
            fs::write(dir.path().join(name), b"")?;
        }
        fs::create_dir(dir.path().join("1_2_dir.mp3"))?;

        let found = scan_audio_dir(&course(), dir.path())?;
        let names: Vec<_> = found
            .iter()
            .filter_map(|(_, p)| p.file_name()?.to_str().map(str::to_owned))
            .collect();
        assert_eq!(names, vec!["1_1_a.mp3", "2_1_c.mp3"]);
        Ok(())
    }
}
