//! Text → narration-ready text.
//!
//! [`normalize`] runs four passes in a fixed order:
//!
//! ```text
//! 1. abbreviations   1 John → First John, NIV → New International Version.
//! 2. references      3:16 → 3. verse 16,   ,-18 → " through 18."
//!                    [12] → ""             bare ":" → ", "
//! 3. termination     every non-blank line ends in . ! or ?
//! 4. cleanup         drop "." and blank lines, trim,
//!                    remaining [ ] → ,
//! ```
//!
//! [`split_paragraphs`] then cuts the result on newlines.  Both functions are
//! pure.
//!
//! Running the pipeline twice is safe: text without abbreviations or bare
//! colons comes back unchanged.  Text that contained abbreviations does not
//! round-trip byte for byte, because the second pass no longer sees the
//! original tokens; that is expected.

use once_cell::sync::Lazy;
use regex::Regex;

use super::abbreviations;

#[allow(clippy::expect_used)]
static VERSE_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+):(\d+)").expect("verse pair pattern"));

#[allow(clippy::expect_used)]
static VERSE_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,.]-(\d+)").expect("verse range pattern"));

#[allow(clippy::expect_used)]
static BRACKETED_NUMERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("bracketed numeral pattern"));

/// Characters that may trail a sentence terminator (`"Amen."`, `(see above.)`).
const CLOSERS: &[char] = &['"', '\'', ')', '\u{201D}', '\u{2019}', '\u{00BB}'];

/// Sentence terminators.
const TERMINATORS: &[char] = &['.', '!', '?', '\u{2026}'];

/// Soft punctuation replaced by a period when it ends a line.
const SOFT_ENDINGS: &[char] = &[',', ';', ':'];

/// Normalize raw input into narration-ready text.
///
/// # Example
///
/// ```
/// use narration_studio::text::normalize;
///
/// let out = normalize("Love your neighbor\nJohn 3:16 says this");
/// assert_eq!(out, "Love your neighbor.\nJohn 3. verse 16, says this.");
/// ```
pub fn normalize(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = abbreviations::expand(&text);
    let text = format_references(&text);
    let text = terminate_lines(&text);
    cleanup(&text)
}

/// Split normalized text into ordered, non-empty paragraphs.
pub fn split_paragraphs(normalized: &str) -> Vec<String> {
    normalized
        .split('\n')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// [`normalize`] followed by [`split_paragraphs`].
pub fn prepare(raw: &str) -> Vec<String> {
    split_paragraphs(&normalize(raw))
}

// ---------------------------------------------------------------------------
// Pass 2: references
// ---------------------------------------------------------------------------

fn format_references(text: &str) -> String {
    let text = VERSE_PAIR.replace_all(text, "${1}. verse ${2},");
    let text = VERSE_RANGE.replace_all(&text, " through ${1}.");
    let text = BRACKETED_NUMERAL.replace_all(&text, "");
    replace_bare_colons(&text)
}

/// A colon with no digit on either side becomes a spoken pause.  Spaces or
/// tabs right after it are absorbed so `Note: this` reads `Note, this`.
fn replace_bare_colons(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == ':' {
            let digit_before = i > 0 && chars[i - 1].is_ascii_digit();
            let digit_after = chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            if !digit_before && !digit_after {
                out.push_str(", ");
                i += 1;
                while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
                    i += 1;
                }
                continue;
            }
        }
        out.push(c);
        i += 1;
    }

    out
}

// ---------------------------------------------------------------------------
// Pass 3: termination
// ---------------------------------------------------------------------------

fn terminate_lines(text: &str) -> String {
    text.split('\n')
        .map(terminate_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn terminate_line(line: &str) -> String {
    let trimmed = line.trim_end();
    if trimmed.trim_start().is_empty() {
        return line.to_string();
    }
    if ends_with_terminator(trimmed) {
        return trimmed.to_string();
    }
    let base = trimmed.trim_end_matches(SOFT_ENDINGS).trim_end();
    if ends_with_terminator(base) {
        return base.to_string();
    }
    format!("{base}.")
}

/// `true` when the line already ends a sentence, ignoring trailing quotes
/// and closing parentheses.
pub(crate) fn ends_with_terminator(line: &str) -> bool {
    line.trim_end()
        .trim_end_matches(CLOSERS)
        .ends_with(TERMINATORS)
}

// ---------------------------------------------------------------------------
// Pass 4: cleanup
// ---------------------------------------------------------------------------

fn cleanup(text: &str) -> String {
    let lines: Vec<&str> = text
        .split('\n')
        .filter(|line| {
            let t = line.trim();
            !t.is_empty() && t != "."
        })
        .collect();

    lines
        .join("\n")
        .trim()
        .replace(['[', ']'], ",")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_two_paragraphs() {
        let paras = prepare("Love your neighbor\nJohn 3:16 says this");
        assert_eq!(
            paras,
            vec!["Love your neighbor.", "John 3. verse 16, says this."]
        );
    }

    #[test]
    fn verse_range_is_spoken() {
        assert_eq!(normalize("John 3:16-18"), "John 3. verse 16 through 18.");
    }

    #[test]
    fn bracketed_numerals_are_removed() {
        assert_eq!(normalize("In the beginning[1] God"), "In the beginning God.");
    }

    #[test]
    fn bare_colon_becomes_pause() {
        assert_eq!(normalize("Note: read slowly"), "Note, read slowly.");
    }

    #[test]
    fn colon_next_to_digit_is_kept() {
        assert_eq!(normalize("Chapter 3:"), "Chapter 3.");
        assert_eq!(normalize("at :30 past"), "at :30 past.");
    }

    #[test]
    fn existing_terminators_are_kept() {
        assert_eq!(normalize("Really?"), "Really?");
        assert_eq!(normalize("Amen!"), "Amen!");
        assert_eq!(normalize("He said \"go.\""), "He said \"go.\"");
    }

    #[test]
    fn trailing_comma_becomes_period() {
        assert_eq!(normalize("and then,"), "and then.");
        assert_eq!(normalize("John 3:16"), "John 3. verse 16.");
    }

    #[test]
    fn period_only_lines_and_blank_runs_are_removed() {
        let out = normalize("First\n\n\n.\n  \nSecond");
        assert_eq!(split_paragraphs(&out), vec!["First.", "Second."]);
        assert!(!out.contains("\n\n"));
    }

    #[test]
    fn residual_brackets_become_commas() {
        assert_eq!(normalize("the Word [Logos] was"), "the Word ,Logos, was.");
    }

    #[test]
    fn soft_ending_after_terminator_is_not_doubled() {
        assert_eq!(
            normalize("Romans 8:28 ESV:"),
            "Romans 8. verse 28, English Standard Version."
        );
    }

    #[test]
    fn abbreviations_expand_before_references() {
        assert_eq!(
            normalize("1 John 4:8 NIV"),
            "First John 4. verse 8, New International Version."
        );
    }

    #[test]
    fn crlf_input_is_handled() {
        assert_eq!(prepare("one\r\ntwo"), vec!["one.", "two."]);
    }

    #[test]
    fn every_surviving_line_is_terminated() {
        let inputs = [
            "Psalm 23:1-4\nThe Lord is my shepherd\n\n[Selah]\nRomans 8:28 ESV:",
            "a: b: c\n\n\n,\n;\nwhat?\n(quoted)",
            "  leading space\ttab\n]\n[\n3 Kings 2:1,-5",
        ];
        for input in inputs {
            for line in normalize(input).lines() {
                assert!(
                    ends_with_terminator(line),
                    "line {line:?} from {input:?} is not terminated"
                );
            }
        }
    }

    #[test]
    fn normalized_text_is_a_fixed_point() {
        let inputs = [
            "Love your neighbor\nJohn 3:16 says this",
            "Psalm 23:1-4\n\nThe Lord is my shepherd!",
            "Genesis 1:1[2] In the beginning",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn empty_input_yields_no_paragraphs() {
        assert!(prepare("").is_empty());
        assert!(prepare(" \n\t\n ").is_empty());
    }

    #[test]
    fn paragraphs_keep_textual_order() {
        let paras = prepare("c\nb\na");
        assert_eq!(paras, vec!["c.", "b.", "a."]);
    }
}
