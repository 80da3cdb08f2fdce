//! Branded HTML course booklet.
//!
//! Raw booklet text is cleaned, split into chapters on known heading phrases, rendered to
//! HTML and substituted into a fixed right-to-left A4 template.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::{Captures, Regex};

mod chapters;
mod markers;

pub use chapters::{
    Chapter, INTRODUCTION_TITLE, MAX_HEADING_CHARS, clean_raw_text, split_chapters,
};
pub use markers::{ChapterMarker, default_markers, load_markers};

/// The booklet page template. Placeholders are `{TITLE}`, `{SUBTITLE}`, `{INSTRUCTOR}`,
/// `{SLOGAN}`, `{TOC}` and `{CONTENT}`.
pub const TEMPLATE: &str = include_str!("template.html");

/// Lines shorter than this ending in `:` or `?` render as subheadings.
pub const MAX_SUBHEADING_CHARS: usize = 60;

const EXERCISE_WORD: &str = "תרגיל";

/// Cover-page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookletMeta {
    pub title: String,
    pub subtitle: String,
    pub instructor: String,
    pub slogan: String,
}

impl Default for BookletMeta {
    fn default() -> Self {
        Self {
            title: "NLP Practitioner".to_owned(),
            subtitle: "חוברת הקורס המלאה".to_owned(),
            instructor: "מרצה: רם אלוס".to_owned(),
            slogan: "ריפוי הנפש לכל אדם | מטפל לכל אחד".to_owned(),
        }
    }
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}

#[derive(Debug, PartialEq, Eq)]
enum Block<'a> {
    Subheading(&'a str),
    Exercise(&'a str),
    Bullet(&'a str),
    Paragraph(&'a str),
}

fn classify(line: &str) -> Block<'_> {
    if line.chars().count() < MAX_SUBHEADING_CHARS && (line.ends_with(':') || line.ends_with('?'))
    {
        Block::Subheading(line)
    } else if line.contains(EXERCISE_WORD) {
        Block::Exercise(line)
    } else if let Some(rest) = line.strip_prefix('-').or_else(|| line.strip_prefix('•')) {
        Block::Bullet(rest.trim())
    } else {
        Block::Paragraph(line)
    }
}

/// Render one chapter's `<div class="chapter">` block. `number` is one-based.
pub fn render_chapter(number: usize, chapter: &Chapter) -> String {
    let mut body = String::new();
    let mut in_list = false;

    for line in &chapter.lines {
        let block = classify(line);

        let is_bullet = matches!(block, Block::Bullet(_));
        if in_list && !is_bullet {
            body.push_str("</ul>\n");
        } else if !in_list && is_bullet {
            body.push_str("<ul>\n");
        }
        in_list = is_bullet;

        let _ = match block {
            Block::Subheading(text) => writeln!(body, "<h2>{}</h2>", escape_html(text)),
            Block::Exercise(text) => writeln!(
                body,
                r#"<div class="exercise-box"><h4>{}</h4></div>"#,
                escape_html(text)
            ),
            Block::Bullet(text) => writeln!(body, "<li>{}</li>", escape_html(text)),
            Block::Paragraph(text) => writeln!(body, "<p>{}</p>", escape_html(text)),
        };
    }
    if in_list {
        body.push_str("</ul>\n");
    }

    format!(
        r#"<div class="chapter">
    <div class="chapter-header">
        <div class="chapter-number">פרק {number}</div>
        <h1 class="chapter-title">{title}</h1>
    </div>
    <div class="chapter-content">
{body}    </div>
</div>
"#,
        title = escape_html(&chapter.title),
    )
}

/// Table of contents entries, one per chapter, numbered like the chapter headers.
pub fn render_toc(chapters: &[Chapter]) -> String {
    chapters
        .iter()
        .enumerate()
        .map(|(idx, chapter)| {
            format!(
                r#"<li class="toc-item"><span class="toc-item-title">{}</span><span class="toc-item-page">{}</span></li>"#,
                escape_html(&chapter.title),
                idx + 1
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Z]+)\}").expect("valid placeholder regex"))
}

/// Substitute `{NAME}` placeholders in one pass. Unknown names are left untouched and
/// substituted values are never rescanned.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    placeholder_re()
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map_or_else(|| caps[0].to_owned(), |(_, value)| (*value).to_owned())
        })
        .into_owned()
}

/// Build the complete booklet HTML from raw booklet text.
pub fn render_booklet(raw: &str, meta: &BookletMeta, markers: &[ChapterMarker]) -> String {
    let cleaned = clean_raw_text(raw);
    let chapters = split_chapters(&cleaned, markers);

    let toc = render_toc(&chapters);
    let content = chapters
        .iter()
        .enumerate()
        .map(|(idx, chapter)| render_chapter(idx + 1, chapter))
        .collect::<Vec<_>>()
        .join("\n");

    let title = escape_html(&meta.title);
    let subtitle = escape_html(&meta.subtitle);
    let instructor = escape_html(&meta.instructor);
    let slogan = escape_html(&meta.slogan);

    fill_template(
        TEMPLATE,
        &[
            ("TITLE", &*title),
            ("SUBTITLE", &*subtitle),
            ("INSTRUCTOR", &*instructor),
            ("SLOGAN", &*slogan),
            ("TOC", toc.as_str()),
            ("CONTENT", content.as_str()),
        ],
    )
}
