//! Derives a short human-readable conversation title from the first user
//! message. Pure and deterministic; no I/O.

/// Title used when the input carries no usable text.
pub const FALLBACK_TITLE: &str = "New Conversation";

/// Leading filler words stripped from the front of a candidate title.
/// Multi-word entries must come after their single-word prefixes so the
/// longest sensible match wins.
const FILLER_WORDS: &[&str] = &[
    "hey", "hi", "hello", "um", "so", "basically", "just", "i was", "i am", "i'm",
];

const MAX_ANALYZED_CHARS: usize = 100;
const MAX_TITLE_CHARS: usize = 60;

/// Derive a conversation title from the given message text.
///
/// Prefers the first sentence when it is a reasonable length, otherwise the
/// first few words. Strips conversational filler, capitalizes, and caps the
/// result at 60 characters.
pub fn title_for(text: &str) -> String {
    if text.trim().is_empty() {
        return FALLBACK_TITLE.to_string();
    }

    let truncated = truncate_chars(text, MAX_ANALYZED_CHARS);

    let first_sentence = truncated
        .split(['.', '!', '?'])
        .next()
        .unwrap_or("")
        .trim()
        .to_string();

    let mut title = if (10..=50).contains(&first_sentence.chars().count()) {
        first_sentence
    } else {
        let words: Vec<&str> = truncated.split_whitespace().collect();
        let mut joined = words.iter().take(6).copied().collect::<Vec<_>>().join(" ");
        if words.len() > 6 {
            joined.push_str("...");
        }
        joined
    };

    title = strip_fillers(&title);
    if title.is_empty() {
        return FALLBACK_TITLE.to_string();
    }

    let mut chars = title.chars();
    let title: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => title,
    };

    truncate_chars(&title, MAX_TITLE_CHARS)
}

/// Truncate to at most `limit` characters, appending an ellipsis if anything
/// was cut.
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let mut out: String = text.chars().take(limit).collect();
        out.push_str("...");
        out
    } else {
        text.to_string()
    }
}

/// Remove leading filler words until none remain. A filler only matches at a
/// word boundary (followed by whitespace or end of input), case-insensitively.
fn strip_fillers(title: &str) -> String {
    let mut rest = title.trim_start();
    'outer: loop {
        for filler in FILLER_WORDS {
            let n = filler.len();
            if rest.len() < n || !rest.is_char_boundary(n) {
                continue;
            }
            if !rest[..n].eq_ignore_ascii_case(filler) {
                continue;
            }
            let after = &rest[n..];
            if after.is_empty() {
                rest = "";
                break 'outer;
            }
            if after.starts_with(char::is_whitespace) {
                rest = after.trim_start();
                continue 'outer;
            }
        }
        break;
    }
    rest.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_fall_back() {
        assert_eq!(title_for(""), FALLBACK_TITLE);
        assert_eq!(title_for("   "), FALLBACK_TITLE);
        assert_eq!(title_for("\n\t"), FALLBACK_TITLE);
    }

    #[test]
    fn uses_first_sentence_when_reasonable() {
        assert_eq!(
            title_for("How do I sort a vector? I tried a few things."),
            "How do I sort a vector"
        );
    }

    #[test]
    fn falls_back_to_first_words_for_short_sentences() {
        // First sentence is under 10 chars, so the word path kicks in.
        assert_eq!(
            title_for("Help. My build keeps failing with a linker error."),
            "Help. My build keeps failing with..."
        );
    }

    #[test]
    fn long_input_takes_six_words_with_ellipsis() {
        let text = "please could you walk me through setting up a database connection pool";
        let title = title_for(text);
        assert_eq!(title, "Please could you walk me through...");
    }

    #[test]
    fn strips_leading_fillers() {
        assert_eq!(
            title_for("hey can you help me debug this straight away"),
            "Can you help me debug this straight away"
        );
        assert_eq!(
            title_for("i'm trying to learn lifetimes today ok"),
            "Trying to learn lifetimes today ok"
        );
    }

    #[test]
    fn filler_needs_a_word_boundary() {
        // "so" is filler but "sorting" must survive intact.
        let title = title_for("sorting strings quickly in rust please help");
        assert!(title.starts_with("Sorting"));
    }

    #[test]
    fn all_filler_input_falls_back() {
        assert_eq!(title_for("hey hi um so"), FALLBACK_TITLE);
    }

    #[test]
    fn output_is_capped_at_sixty_chars() {
        let text = "a".repeat(40) + " " + &"b".repeat(40) + " trailing words here to pad";
        let title = title_for(&text);
        assert!(title.chars().count() <= MAX_TITLE_CHARS + 3);
    }

    #[test]
    fn never_starts_with_filler_and_never_empty() {
        let inputs = [
            "hello there, what is a trait object exactly",
            "um basically I want streaming JSON parsing",
            "i was wondering about async closures in detail",
            "Write me a haiku",
            "x",
        ];
        for input in inputs {
            let title = title_for(input);
            assert!(!title.is_empty(), "empty title for {input:?}");
            let lower = title.to_lowercase();
            for filler in FILLER_WORDS {
                let starts = lower
                    .strip_prefix(filler)
                    .is_some_and(|after| after.is_empty() || after.starts_with(char::is_whitespace));
                assert!(!starts, "title {title:?} starts with filler {filler:?}");
            }
        }
    }

    #[test]
    fn deterministic() {
        let text = "explain borrow checking to me like I'm five";
        assert_eq!(title_for(text), title_for(text));
    }
}
