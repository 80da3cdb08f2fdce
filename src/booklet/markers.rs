use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A phrase that, found on a short line, opens a chapter with `title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterMarker {
    pub pattern: String,
    pub title: String,
}

impl ChapterMarker {
    pub fn new(pattern: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            title: title.into(),
        }
    }

    /// Case-insensitive containment check against an already-lowercased line.
    pub(crate) fn matches_lowercase(&self, line_lower: &str) -> bool {
        !self.pattern.is_empty() && line_lower.contains(&self.pattern.to_lowercase())
    }
}

const NLP_PRACTITIONER: &[(&str, &str)] = &[
    ("מה זה NLP", "מה זה NLP?"),
    ("3 הרמות בNLP", "3 הרמות ב-NLP"),
    ("מודל התקשורת של ה NLP", "מודל התקשורת של ה-NLP"),
    ("תקשורת לא מילולית", "תקשורת לא מילולית"),
    ("ראפור", "ראפור"),
    ("הנחות היסוד של ה nlp", "הנחות היסוד של ה-NLP"),
    ("ויזואליזציה ודמיון", "ויזואליזציה ודמיון"),
    ("עמדות תפיסה", "עמדות תפיסה"),
    ("מסע בין יועצים", "מסע בין יועצים"),
    ("מטה מודל", "מטה מודל"),
    ("דיוק OUTCOME", "דיוק OUTCOME (מטרות)"),
    ("סדר פעולות לכל תהליך", "סדר פעולות לכל תהליך"),
    ("מערכות ייצוג", "מערכות ייצוג"),
    ("תתי חושים", "תתי חושים (Sub-Modalities)"),
    ("אקולוגיה", "אקולוגיה"),
    ("מסגור וריפריים", "מסגור ורי-פריים"),
    ("מודל הצרכים של טוני רובינס", "מודל הצרכים של טוני רובינס"),
    ("עוגנים", "עוגנים"),
    ("סטייט", "סטייט"),
    ("הרגלים", "הרגלים"),
    ("אמונות", "אמונות"),
    ("מודל רמות לוגיות", "מודל רמות לוגיות"),
];

/// Chapter markers of the NLP Practitioner course booklet, in course order.
pub fn default_markers() -> Vec<ChapterMarker> {
    NLP_PRACTITIONER
        .iter()
        .map(|(pattern, title)| ChapterMarker::new(*pattern, *title))
        .collect()
}

/// Load a marker table from a JSON array of `{ "pattern": ..., "title": ... }` objects.
pub fn load_markers(path: &Path) -> Result<Vec<ChapterMarker>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read chapter markers: {}", path.display()))?;
    Ok(serde_json::from_str(&raw)?)
}
