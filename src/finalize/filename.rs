//! Output filename derivation.

use once_cell::sync::Lazy;
use regex::Regex;

/// Extension of every exported narration.
pub const AUDIO_EXTENSION: &str = "wav";

#[allow(clippy::expect_used)]
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9 _-]").expect("static regex"));

#[allow(clippy::expect_used)]
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Keep ASCII letters, digits, space, `-` and `_`, then turn each run of
/// spaces into a single `_`.  May return an empty string.
pub fn sanitize_title(title: &str) -> String {
    let kept = DISALLOWED.replace_all(title, "");
    WHITESPACE_RUN.replace_all(kept.trim(), "_").into_owned()
}

/// `title` sanitized, or `fallback` sanitized when `title` is blank or has
/// nothing usable left, plus [`AUDIO_EXTENSION`].
///
/// ```
/// use narration_studio::finalize::export_file_name;
///
/// assert_eq!(export_file_name("My Psalm!! Reading", "Narration"), "My_Psalm_Reading.wav");
/// assert_eq!(export_file_name("   ", "Narration"), "Narration.wav");
/// ```
pub fn export_file_name(title: &str, fallback: &str) -> String {
    let mut stem = sanitize_title(title);
    if stem.is_empty() {
        stem = sanitize_title(fallback);
    }
    if stem.is_empty() {
        stem = "narration".to_string();
    }
    format!("{stem}.{AUDIO_EXTENSION}")
}
