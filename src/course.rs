//! The transcript document: modules, lessons, and their (optional) transcripts.
//!
//! On disk this is a bare JSON array of modules. A lesson without a transcript carries
//! `"transcript": null`, which is the explicit "unavailable" marker downstream tools rely on.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::atomic_write::write_bytes_atomically;

/// Base URL used to build a lesson's `youtube_url`.
pub const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Build the watch URL for a video id.
pub fn youtube_url(video_id: &str) -> String {
    format!("{YOUTUBE_WATCH_URL}{video_id}")
}

/// A single video lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Source video id.
    pub id: String,
    pub title: String,
    /// Display duration, e.g. `"12:30"`.
    pub duration: String,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub youtube_url: String,
}

impl Lesson {
    pub fn new(id: impl Into<String>, title: impl Into<String>, duration: impl Into<String>) -> Self {
        let id = id.into();
        let youtube_url = youtube_url(&id);
        Self {
            id,
            title: title.into(),
            duration: duration.into(),
            transcript: None,
            youtube_url,
        }
    }

    /// Whether this lesson already holds non-blank transcript text.
    pub fn has_transcript(&self) -> bool {
        self.transcript
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }

    /// Store `text` as the transcript unless the lesson is already filled.
    ///
    /// Returns `true` when the transcript was written. Blank text is never stored and an
    /// existing transcript is never overwritten.
    pub fn fill_transcript(&mut self, text: impl Into<String>) -> bool {
        if self.has_transcript() {
            return false;
        }

        let text = text.into();
        if text.trim().is_empty() {
            return false;
        }

        self.transcript = Some(text);
        true
    }
}

/// A top-level grouping of lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: u32,
    pub title: String,
    pub lessons: Vec<Lesson>,
}

/// Index of a lesson inside a [`Course`] (zero-based module and lesson indices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LessonPos {
    pub module: usize,
    pub lesson: usize,
}

/// The whole transcript document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Course {
    pub modules: Vec<Module>,
}

impl Course {
    pub fn new(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    /// Load a transcript document from JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read transcripts: {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut course: Course = serde_json::from_str(raw)?;
        course.fill_missing_urls();
        Ok(course)
    }

    /// Pretty-printed JSON, two-space indent, non-ASCII kept verbatim.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Atomically write the document to `path`.
    ///
    /// This is the checkpoint primitive: a crash during the write leaves the previous file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        write_bytes_atomically(path, json.as_bytes())?;
        Ok(())
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    pub fn filled_count(&self) -> usize {
        self.lessons().filter(|(_, l)| l.has_transcript()).count()
    }

    /// Iterate every lesson with its position, in module/lesson order.
    pub fn lessons(&self) -> impl Iterator<Item = (LessonPos, &Lesson)> {
        self.modules.iter().enumerate().flat_map(|(mi, module)| {
            module.lessons.iter().enumerate().map(move |(li, lesson)| {
                (
                    LessonPos {
                        module: mi,
                        lesson: li,
                    },
                    lesson,
                )
            })
        })
    }

    /// Positions of every lesson without a transcript.
    pub fn missing(&self) -> Vec<LessonPos> {
        self.lessons()
            .filter(|(_, lesson)| !lesson.has_transcript())
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn lesson(&self, pos: LessonPos) -> Option<&Lesson> {
        self.modules.get(pos.module)?.lessons.get(pos.lesson)
    }

    pub fn lesson_mut(&mut self, pos: LessonPos) -> Option<&mut Lesson> {
        self.modules.get_mut(pos.module)?.lessons.get_mut(pos.lesson)
    }

    /// Find a lesson by module id and one-based lesson number.
    pub fn find_lesson(&self, module_id: u32, lesson_number: usize) -> Option<LessonPos> {
        let module = self.modules.iter().position(|m| m.id == module_id)?;
        let lesson = lesson_number.checked_sub(1)?;
        (lesson < self.modules[module].lessons.len()).then_some(LessonPos { module, lesson })
    }

    /// Find a lesson by its video id.
    pub fn find_video(&self, video_id: &str) -> Option<LessonPos> {
        self.lessons()
            .find(|(_, lesson)| lesson.id == video_id)
            .map(|(pos, _)| pos)
    }

    /// Human label `"<module id>.<lesson number>"` for a position.
    pub fn label(&self, pos: LessonPos) -> String {
        match self.modules.get(pos.module) {
            Some(module) => format!("{}.{}", module.id, pos.lesson + 1),
            None => format!("?.{}", pos.lesson + 1),
        }
    }

    fn fill_missing_urls(&mut self) {
        for module in &mut self.modules {
            for lesson in &mut module.lessons {
                if lesson.youtube_url.is_empty() {
                    lesson.youtube_url = youtube_url(&lesson.id);
                }
            }
        }
    }
}
