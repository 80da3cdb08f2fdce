use std::sync::OnceLock;

use regex::Regex;

use super::markers::ChapterMarker;

/// Title of the chapter that collects lines before the first recognized heading.
pub const INTRODUCTION_TITLE: &str = "הקדמה";

/// Lines at least this long (in characters) are never chapter headings.
pub const MAX_HEADING_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub lines: Vec<String>,
}

fn leading_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\A\d+\s*").expect("valid leading number regex"))
}

fn brand_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"ה-?20 החדש|העשרים החדש").expect("valid brand regex"))
}

/// Strip the page number the export leaves at the very start and the old brand name.
pub fn clean_raw_text(raw: &str) -> String {
    let without_brand = brand_re().replace_all(raw, "");
    leading_number_re().replace(&without_brand, "").into_owned()
}

/// Split cleaned text into chapters.
///
/// Each marker opens at most one chapter. The introduction is only returned when it has
/// lines; recognized chapters are always returned, even when empty.
pub fn split_chapters(text: &str, markers: &[ChapterMarker]) -> Vec<Chapter> {
    let mut used = vec![false; markers.len()];
    let mut chapters = Vec::new();
    let mut current = Chapter {
        title: INTRODUCTION_TITLE.to_owned(),
        lines: Vec::new(),
    };
    let mut in_intro = true;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(idx) = heading_marker(line, markers, &used) {
            used[idx] = true;
            let next = Chapter {
                title: markers[idx].title.clone(),
                lines: Vec::new(),
            };
            let finished = std::mem::replace(&mut current, next);
            if !in_intro || !finished.lines.is_empty() {
                chapters.push(finished);
            }
            in_intro = false;
            continue;
        }
        current.lines.push(line.to_owned());
    }

    if !in_intro || !current.lines.is_empty() {
        chapters.push(current);
    }
    chapters
}

fn heading_marker(line: &str, markers: &[ChapterMarker], used: &[bool]) -> Option<usize> {
    if line.chars().count() >= MAX_HEADING_CHARS {
        return None;
    }
    let lower = line.to_lowercase();
    markers
        .iter()
        .enumerate()
        .find(|(idx, marker)| !used[*idx] && marker.matches_lowercase(&lower))
        .map(|(idx, _)| idx)
}
