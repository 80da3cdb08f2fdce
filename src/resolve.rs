//! The three-tier transcript fallback chain.
//!
//! 1. platform captions in a preferred language
//! 2. platform captions in any language
//! 3. download the audio and transcribe it locally
//!
//! The first tier that yields non-blank text wins; later tiers are never invoked. Every
//! failure is logged and swallowed, so resolution itself never fails. The last failure is
//! kept on [`Resolution::Unavailable`] so callers can report why a lesson stayed empty.

use std::fmt;

use tracing::{debug, warn};

use crate::Error;
use crate::audio_source::AudioSource;
use crate::backend::Backend;
use crate::captions::CaptionSource;
use crate::opts::Opts;

/// Which tier produced a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    PreferredCaptions,
    AnyCaptions,
    LocalTranscription,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::PreferredCaptions => "captions",
            Tier::AnyCaptions => "captions (any language)",
            Tier::LocalTranscription => "local transcription",
        })
    }
}

/// Why a tier produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    NoCaptions,
    DownloadFailed(String),
    TranscriptionFailed(String),
}

impl Failure {
    fn download(err: Error) -> Self {
        match err {
            Error::DownloadFailed { reason, .. } => Failure::DownloadFailed(reason),
            other => Failure::DownloadFailed(other.to_string()),
        }
    }

    pub(crate) fn no_speech() -> Self {
        Failure::TranscriptionFailed("no speech recognized".to_owned())
    }

    pub(crate) fn transcription(err: Error) -> Self {
        match err {
            Error::TranscriptionFailed(reason) => Failure::TranscriptionFailed(reason),
            other => Failure::TranscriptionFailed(other.to_string()),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::NoCaptions => f.write_str("no captions available"),
            Failure::DownloadFailed(reason) => write!(f, "download failed: {reason}"),
            Failure::TranscriptionFailed(reason) => write!(f, "transcription failed: {reason}"),
        }
    }
}

/// Outcome of [`Resolver::resolve_transcript`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved { tier: Tier, text: String },
    /// `last_failure` is `None` when no tier was enabled at all.
    Unavailable { last_failure: Option<Failure> },
}

impl Resolution {
    pub fn text(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { text, .. } => Some(text),
            Resolution::Unavailable { .. } => None,
        }
    }

    pub fn tier(&self) -> Option<Tier> {
        match self {
            Resolution::Resolved { tier, .. } => Some(*tier),
            Resolution::Unavailable { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Resolution::Resolved { .. } => None,
            Resolution::Unavailable { last_failure } => last_failure.as_ref(),
        }
    }
}

// `None` when the tier is not enabled.
type TierResult = Option<std::result::Result<String, Failure>>;

/// Audio download plus speech backend, the expensive third tier.
pub struct LocalTranscription<'a> {
    pub audio: Box<dyn AudioSource + 'a>,
    pub backend: Box<dyn Backend + 'a>,
}

/// Runs the fallback chain for one video at a time.
pub struct Resolver<'a> {
    opts: Opts,
    captions: Option<Box<dyn CaptionSource + 'a>>,
    local: Option<LocalTranscription<'a>>,
}

impl<'a> Resolver<'a> {
    pub fn new(opts: Opts) -> Self {
        Self {
            opts,
            captions: None,
            local: None,
        }
    }

    pub fn with_captions(mut self, captions: impl CaptionSource + 'a) -> Self {
        self.captions = Some(Box::new(captions));
        self
    }

    pub fn with_local_transcription(
        mut self,
        audio: impl AudioSource + 'a,
        backend: impl Backend + 'a,
    ) -> Self {
        self.local = Some(LocalTranscription {
            audio: Box::new(audio),
            backend: Box::new(backend),
        });
        self
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    pub fn has_local_transcription(&self) -> bool {
        self.local.is_some()
    }

    /// Resolve a transcript for `video_id`, or report it unavailable.
    pub fn resolve_transcript(&mut self, video_id: &str) -> Resolution {
        let mut last_failure = None;

        for tier in [
            Tier::PreferredCaptions,
            Tier::AnyCaptions,
            Tier::LocalTranscription,
        ] {
            let attempt = match tier {
                Tier::PreferredCaptions => self.preferred_captions(video_id),
                Tier::AnyCaptions => self.any_captions(video_id),
                Tier::LocalTranscription => self.local_transcription(video_id),
            };
            match attempt {
                Some(Ok(text)) => return Resolution::Resolved { tier, text },
                Some(Err(failure)) => last_failure = Some(failure),
                None => {}
            }
        }

        Resolution::Unavailable { last_failure }
    }

    fn preferred_captions(&self, video_id: &str) -> TierResult {
        if !self.opts.enable_captions {
            return None;
        }
        let captions = self.captions.as_ref()?;

        let mut groups = self
            .opts
            .caption_language_groups
            .iter()
            .filter(|group| !group.is_empty())
            .peekable();
        groups.peek()?;

        Some(
            groups
                .find_map(|group| fetch_captions(captions.as_ref(), video_id, group))
                .ok_or(Failure::NoCaptions),
        )
    }

    fn any_captions(&self, video_id: &str) -> TierResult {
        if !self.opts.enable_captions || !self.opts.enable_any_language_captions {
            return None;
        }
        let captions = self.captions.as_ref()?;
        Some(fetch_captions(captions.as_ref(), video_id, &[]).ok_or(Failure::NoCaptions))
    }

    fn local_transcription(&mut self, video_id: &str) -> TierResult {
        let local = self.local.as_mut()?;

        let audio = match local.audio.download(video_id) {
            Ok(audio) => audio,
            Err(err) => {
                warn!(video_id, error = %err, "audio download failed");
                return Some(Err(Failure::download(err)));
            }
        };

        Some(match local.backend.transcribe_file(&self.opts, audio.path()) {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) => {
                warn!(video_id, "local transcription produced no text");
                Err(Failure::no_speech())
            }
            Err(err) => {
                warn!(video_id, error = %err, "local transcription failed");
                Err(Failure::transcription(err))
            }
        })
    }
}

fn fetch_captions(source: &dyn CaptionSource, video_id: &str, languages: &[String]) -> Option<String> {
    match source.fetch(video_id, languages) {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => {
            debug!(video_id, ?languages, "captions were empty");
            None
        }
        Err(err) => {
            debug!(video_id, ?languages, error = %err, "captions unavailable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::Path;

    use super::*;
    use crate::audio_source::DownloadedAudio;
    use crate::{Error, Result};

    /// Captions keyed by the first requested language ("" for any language).
    struct ScriptedCaptions {
        answers: Vec<(&'static str, Result<String>)>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl ScriptedCaptions {
        fn new(answers: Vec<(&'static str, Result<String>)>) -> Self {
            Self {
                answers,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl CaptionSource for &ScriptedCaptions {
        fn fetch(&self, video_id: &str, languages: &[String]) -> Result<String> {
            self.calls.borrow_mut().push(languages.to_vec());
            let key = languages.first().map(String::as_str).unwrap_or("");
            for (lang, answer) in &self.answers {
                if *lang == key {
                    return match answer {
                        Ok(text) => Ok(text.clone()),
                        Err(_) => Err(Error::no_captions(video_id)),
                    };
                }
            }
            Err(Error::no_captions(video_id))
        }
    }

    struct CountingAudio<'c> {
        calls: &'c RefCell<usize>,
        fail: bool,
    }

    impl AudioSource for CountingAudio<'_> {
        fn download(&self, video_id: &str) -> Result<DownloadedAudio> {
            *self.calls.borrow_mut() += 1;
            if self.fail {
                return Err(Error::download_failed(video_id, "offline"));
            }
            Ok(DownloadedAudio::borrowed(format!("/tmp/{video_id}.mp3")))
        }
    }

    struct FixedBackend<'c> {
        text: &'static str,
        seen: &'c RefCell<Vec<String>>,
    }

    impl Backend for FixedBackend<'_> {
        fn transcribe_file(&mut self, opts: &Opts, path: &Path) -> Result<String> {
            assert_eq!(opts.language.as_deref(), Some("he"));
            self.seen.borrow_mut().push(path.display().to_string());
            Ok(self.text.to_owned())
        }
    }

    #[test]
    fn preferred_language_success_skips_later_tiers() {
        let captions = ScriptedCaptions::new(vec![("iw", Ok("שלום".to_owned()))]);
        let downloads = RefCell::new(0);
        let seen = RefCell::new(Vec::new());

        let mut resolver = Resolver::new(Opts::default())
            .with_captions(&captions)
            .with_local_transcription(
                CountingAudio {
                    calls: &downloads,
                    fail: false,
                },
                FixedBackend {
                    text: "local",
                    seen: &seen,
                },
            );

        let resolution = resolver.resolve_transcript("vid");
        assert_eq!(
            resolution,
            Resolution::Resolved {
                tier: Tier::PreferredCaptions,
                text: "שלום".to_owned()
            }
        );
        assert_eq!(captions.calls.borrow().len(), 1);
        assert_eq!(*downloads.borrow(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn language_groups_are_tried_in_order_before_any_language() {
        let captions = ScriptedCaptions::new(vec![
            ("iw", Ok("   ".to_owned())),
            ("he", Ok("עברית".to_owned())),
            ("", Ok("english".to_owned())),
        ]);

        let mut resolver = Resolver::new(Opts::default()).with_captions(&captions);
        let resolution = resolver.resolve_transcript("vid");

        assert_eq!(resolution.tier(), Some(Tier::PreferredCaptions));
        assert_eq!(resolution.text(), Some("עברית"));
        assert_eq!(
            *captions.calls.borrow(),
            vec![
                vec!["iw".to_owned(), "he".to_owned()],
                vec!["iw".to_owned()],
                vec!["he".to_owned()],
            ]
        );
    }

    #[test]
    fn any_language_is_the_second_tier() {
        let captions = ScriptedCaptions::new(vec![("", Ok("english".to_owned()))]);
        let mut resolver = Resolver::new(Opts::default()).with_captions(&captions);

        let resolution = resolver.resolve_transcript("vid");
        assert_eq!(resolution.tier(), Some(Tier::AnyCaptions));
        assert_eq!(captions.calls.borrow().last(), Some(&Vec::new()));
    }

    #[test]
    fn local_transcription_runs_when_captions_fail() {
        let captions = ScriptedCaptions::new(vec![]);
        let downloads = RefCell::new(0);
        let seen = RefCell::new(Vec::new());

        let mut resolver = Resolver::new(Opts::default())
            .with_captions(&captions)
            .with_local_transcription(
                CountingAudio {
                    calls: &downloads,
                    fail: false,
                },
                FixedBackend {
                    text: " תמלול מקומי ",
                    seen: &seen,
                },
            );

        let resolution = resolver.resolve_transcript("vid");
        assert_eq!(resolution.tier(), Some(Tier::LocalTranscription));
        assert_eq!(*downloads.borrow(), 1);
        assert_eq!(*seen.borrow(), vec!["/tmp/vid.mp3".to_owned()]);
    }

    #[test]
    fn download_failure_means_unavailable() {
        let downloads = RefCell::new(0);
        let seen = RefCell::new(Vec::new());

        let mut resolver = Resolver::new(Opts::default()).with_local_transcription(
            CountingAudio {
                calls: &downloads,
                fail: true,
            },
            FixedBackend {
                text: "never",
                seen: &seen,
            },
        );

        let resolution = resolver.resolve_transcript("vid");
        assert_eq!(
            resolution.failure(),
            Some(&Failure::DownloadFailed("offline".to_owned()))
        );
        assert_eq!(
            resolution.failure().map(ToString::to_string).as_deref(),
            Some("download failed: offline")
        );
        assert_eq!(*downloads.borrow(), 1);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn blank_local_text_means_unavailable() {
        let downloads = RefCell::new(0);
        let seen = RefCell::new(Vec::new());

        let mut resolver = Resolver::new(Opts::default()).with_local_transcription(
            CountingAudio {
                calls: &downloads,
                fail: false,
            },
            FixedBackend {
                text: "\n",
                seen: &seen,
            },
        );

        let resolution = resolver.resolve_transcript("vid");
        assert!(matches!(
            resolution.failure(),
            Some(Failure::TranscriptionFailed(_))
        ));
    }

    #[test]
    fn caption_miss_is_reported_as_no_captions() {
        let captions = ScriptedCaptions::new(vec![("iw", Ok(" ".to_owned()))]);
        let mut resolver = Resolver::new(Opts::default()).with_captions(&captions);

        let resolution = resolver.resolve_transcript("vid");
        assert_eq!(
            resolution,
            Resolution::Unavailable {
                last_failure: Some(Failure::NoCaptions)
            }
        );
        assert_eq!(
            resolution.failure().map(ToString::to_string).as_deref(),
            Some("no captions available")
        );
    }

    #[test]
    fn backend_error_is_reported_as_transcription_failure() {
        assert_eq!(
            Failure::transcription(Error::TranscriptionFailed("bad audio".into())).to_string(),
            "transcription failed: bad audio"
        );
        assert_eq!(
            Failure::transcription(Error::msg("model missing")),
            Failure::TranscriptionFailed("model missing".to_owned())
        );
    }

    #[test]
    fn disabled_captions_are_never_queried() {
        let captions = ScriptedCaptions::new(vec![("iw", Ok("text".to_owned()))]);
        let opts = Opts {
            enable_captions: false,
            ..Opts::default()
        };

        let mut resolver = Resolver::new(opts).with_captions(&captions);
        assert_eq!(
            resolver.resolve_transcript("vid"),
            Resolution::Unavailable { last_failure: None }
        );
        assert!(captions.calls.borrow().is_empty());
    }

    #[test]
    fn no_sources_configured_is_unavailable() {
        let mut resolver = Resolver::new(Opts::default());
        assert!(!resolver.has_local_transcription());
        assert_eq!(
            resolver.resolve_transcript("vid"),
            Resolution::Unavailable { last_failure: None }
        );
    }
}
