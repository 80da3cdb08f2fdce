/// Join per-segment texts from a speech backend into one transcript.
///
/// Whisper segments usually carry their own leading space; whitespace runs are collapsed so
/// segments without one still come out separated.
pub fn join_segments<I>(texts: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut joined = String::new();
    for text in texts {
        for word in text.as_ref().split_whitespace() {
            if !joined.is_empty() {
                joined.push(' ');
            }
            joined.push_str(word);
        }
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_collapses_whitespace_between_segments() {
        let joined = join_segments([" שלום", " לכולם\n", "ועוד"]);
        assert_eq!(joined, "שלום לכולם ועוד");
    }

    #[test]
    fn join_of_nothing_is_empty() {
        assert_eq!(join_segments(Vec::<String>::new()), "");
        assert_eq!(join_segments(["  ", "\n"]), "");
    }
}
