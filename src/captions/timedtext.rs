//! Parse YouTube's timedtext XML into plain text.
//!
//! The format is a flat list of `<text start=".." dur="..">snippet</text>` elements. Snippet
//! bodies are escaped twice (`&amp;#39;`) and may carry inline `<font>` markup once unescaped.

use std::borrow::Cow;
use std::sync::OnceLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;

use crate::Result;

fn markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid markup regex"))
}

/// Extract the snippets of a timedtext document, in document order.
pub fn parse_snippets(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);

    let mut snippets = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"text" => {
                current = Some(String::new());
            }
            Event::Text(t) => {
                if let Some(buf) = current.as_mut() {
                    let once = t.unescape()?;
                    buf.push_str(&unescape_again(&once));
                }
            }
            Event::CData(c) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) if e.name().as_ref() == b"text" => {
                if let Some(raw) = current.take() {
                    let cleaned = clean_snippet(&raw);
                    if !cleaned.is_empty() {
                        snippets.push(cleaned);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(snippets)
}

/// Parse a timedtext document and join its snippets with single spaces.
pub fn parse_text(xml: &str) -> Result<String> {
    Ok(parse_snippets(xml)?.join(" "))
}

// The second escaping layer is best-effort: a stray `&` is kept verbatim.
fn unescape_again(text: &str) -> Cow<'_, str> {
    match quick_xml::escape::unescape(text) {
        Ok(unescaped) => unescaped,
        Err(_) => Cow::Borrowed(text),
    }
}

fn clean_snippet(raw: &str) -> String {
    let stripped = markup_re().replace_all(raw, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_snippets_in_order() -> anyhow::Result<()> {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
            <text start="0.0" dur="1.5">שלום</text>
            <text start="1.5" dur="2.0">לכולם</text>
        </transcript>"#;
        assert_eq!(parse_text(xml)?, "שלום לכולם");
        Ok(())
    }

    #[test]
    fn double_escaped_entities_are_decoded() -> anyhow::Result<()> {
        let xml = r#"<transcript><text start="0" dur="1">it&amp;#39;s &amp;quot;fine&amp;quot; &amp;amp; good</text></transcript>"#;
        assert_eq!(parse_text(xml)?, r#"it's "fine" & good"#);
        Ok(())
    }

    #[test]
    fn inline_markup_and_line_breaks_are_flattened() -> anyhow::Result<()> {
        let xml = r#"<transcript><text start="0" dur="1">&lt;font color=&quot;#E5E5E5&quot;&gt;first
line&lt;/font&gt;</text></transcript>"#;
        assert_eq!(parse_text(xml)?, "first line");
        Ok(())
    }

    #[test]
    fn empty_snippets_are_dropped() -> anyhow::Result<()> {
        let xml = r#"<transcript><text start="0" dur="1"></text><text start="1" dur="1">  </text><text start="2" dur="1">a</text></transcript>"#;
        assert_eq!(parse_snippets(xml)?, vec!["a".to_owned()]);
        Ok(())
    }

    #[test]
    fn document_without_text_elements_is_empty() -> anyhow::Result<()> {
        assert_eq!(parse_text("<transcript></transcript>")?, "");
        Ok(())
    }
}
