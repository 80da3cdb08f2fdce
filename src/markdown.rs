//! Markdown rendering of a transcript document.

use std::fmt::Write as _;

use crate::course::Course;

/// Shown in place of a transcript that could not be obtained.
pub const UNAVAILABLE_PLACEHOLDER: &str = "*תמלול אינו זמין לסרטון זה*";

const LESSONS_LABEL: &str = "שיעורים";
const MODULES_LABEL: &str = "מודולים";
const MODULE_LABEL: &str = "מודול";
const LESSON_LABEL: &str = "שיעור";
const DURATION_LABEL: &str = "משך";
const LINK_LABEL: &str = "קישור";
const WATCH_LABEL: &str = "צפה ביוטיוב";
const TRANSCRIPT_LABEL: &str = "תמלול";

/// Render the whole course: a header, one heading per module, and per lesson its metadata
/// and transcript (or [`UNAVAILABLE_PLACEHOLDER`]).
pub fn render_markdown(course: &Course, title: &str) -> String {
    let mut md = String::new();

    // Writing into a `String` cannot fail.
    let _ = writeln!(md, "# {title}");
    let _ = writeln!(
        md,
        "## {} {LESSONS_LABEL} | {} {MODULES_LABEL}\n",
        course.lesson_count(),
        course.module_count()
    );
    md.push_str("---\n\n");

    for module in &course.modules {
        let _ = writeln!(md, "# {MODULE_LABEL} {}: {}\n", module.id, module.title);

        for (i, lesson) in module.lessons.iter().enumerate() {
            let _ = writeln!(md, "## {LESSON_LABEL} {}.{}: {}", module.id, i + 1, lesson.title);
            let _ = writeln!(
                md,
                "**{DURATION_LABEL}:** {} | **{LINK_LABEL}:** [{WATCH_LABEL}]({})\n",
                lesson.duration, lesson.youtube_url
            );

            let _ = writeln!(md, "### {TRANSCRIPT_LABEL}:");
            match lesson.transcript.as_deref() {
                Some(text) if lesson.has_transcript() => {
                    let _ = writeln!(md, "{}\n", text.trim());
                }
                _ => {
                    let _ = writeln!(md, "{UNAVAILABLE_PLACEHOLDER}\n");
                }
            }

            md.push_str("---\n\n");
        }
    }

    md
}
