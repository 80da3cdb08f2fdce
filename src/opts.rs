/// Options that control how missing transcripts are resolved.
///
/// This struct represents *library-level configuration*, not CLI flags directly. The CLI maps
/// user input into it, and tests or other batch jobs build it programmatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    /// Caption language groups tried in order by the preferred-language tier.
    ///
    /// Each group is a preference-ordered list of language codes. YouTube still labels Hebrew
    /// tracks `iw`, so the defaults cover both codes.
    pub caption_language_groups: Vec<Vec<String>>,

    /// Whether to query platform captions at all (tiers one and two).
    pub enable_captions: bool,

    /// Whether to accept captions in any language when the preferred groups fail.
    pub enable_any_language_captions: bool,

    /// Language hint passed to local transcription (e.g. `"he"`).
    ///
    /// `None` lets whisper auto-detect.
    pub language: Option<String>,

    /// Whisper inference threads; `None` uses every available CPU.
    pub threads: Option<usize>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            caption_language_groups: default_caption_language_groups(),
            enable_captions: true,
            enable_any_language_captions: true,
            language: Some("he".to_owned()),
            threads: None,
        }
    }
}

impl Opts {
    /// Thread count to hand to whisper.
    pub fn effective_threads(&self) -> usize {
        self.threads.filter(|n| *n > 0).unwrap_or_else(num_cpus::get)
    }
}

/// `["iw", "he"]`, then `["iw"]`, then `["he"]`.
pub fn default_caption_language_groups() -> Vec<Vec<String>> {
    [&["iw", "he"][..], &["iw"], &["he"]]
        .iter()
        .map(|group| group.iter().map(|code| code.to_string()).collect())
        .collect()
}

/// Parse a comma-separated language group such as `"iw,he"`.
pub fn parse_language_group(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_owned)
        .collect()
}
