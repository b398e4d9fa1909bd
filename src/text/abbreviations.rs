//! Spoken expansions for scripture references.
//!
//! Two tables drive the first normalization pass:
//!
//! * [`NUMBERED_BOOKS`]: books whose name is prefixed with a volume number
//!   (`1 Kings`, `2 Timothy`, `3 John`).  The digit is spoken as an ordinal.
//! * [`TRANSLATIONS`]: Bible translation abbreviations, expanded to their
//!   full name followed by a period so the narration pauses after them.
//!
//! All matches are whole-word and case-sensitive: `NIV` expands but `niv`
//! does not, which keeps ordinary lowercase words safe.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// Books that appear with a volume prefix.  `3` is only valid for John.
pub const NUMBERED_BOOKS: &[&str] = &[
    "Corinthians",
    "Chronicles",
    "Kings",
    "Samuel",
    "Thessalonians",
    "Timothy",
    "Peter",
    "John",
];

/// Translation abbreviation → spoken form.
pub const TRANSLATIONS: &[(&str, &str)] = &[
    ("AMPC", "Amplified Bible Classic."),
    ("AMP", "Amplified Bible."),
    ("ASV", "American Standard Version."),
    ("CEB", "Common English Bible."),
    ("CEV", "Contemporary English Version."),
    ("CSB", "Christian Standard Bible."),
    ("ESV", "English Standard Version."),
    ("GNT", "Good News Translation."),
    ("HCSB", "Holman Christian Standard Bible."),
    ("KJV", "King James Version."),
    ("TLB", "The Living Bible."),
    ("MSG", "The Message."),
    ("NABRE", "New American Bible Revised Edition."),
    ("NAB", "New American Bible."),
    ("NASB", "New American Standard Bible."),
    ("NCV", "New Century Version."),
    ("NIRV", "New International Reader's Version."),
    ("NIV", "New International Version."),
    ("NJB", "New Jerusalem Bible."),
    ("NKJV", "New King James Version."),
    ("NLT", "New Living Translation."),
    ("NRSV", "New Revised Standard Version."),
    ("RSV", "Revised Standard Version."),
    ("TPT", "The Passion Translation."),
    ("WEB", "World English Bible."),
    ("YLT", "Young's Literal Translation."),
    ("ERV", "Easy to Read Version."),
    ("NIrV", "New International Reader's Version."),
];

static TRANSLATION_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| TRANSLATIONS.iter().copied().collect());

// Patterns are built from constant tables; a failure here is a programming
// error caught by the unit tests below.
#[allow(clippy::expect_used)]
static BOOK_PREFIX: Lazy<Regex> = Lazy::new(|| {
    let books = NUMBERED_BOOKS.join("|");
    Regex::new(&format!(r"\b([123]) ({books})\b")).expect("book prefix pattern")
});

#[allow(clippy::expect_used)]
static TRANSLATION_TOKEN: Lazy<Regex> = Lazy::new(|| {
    let tokens: Vec<String> = TRANSLATIONS
        .iter()
        .map(|(abbr, _)| regex::escape(abbr))
        .collect();
    Regex::new(&format!(r"\b({})\b", tokens.join("|"))).expect("translation pattern")
});

/// Rewrite `1 Kings` → `First Kings`, `2 Peter` → `Second Peter`,
/// `3 John` → `Third John`.  `3 Kings` is left untouched.
pub fn expand_numbered_books(text: &str) -> String {
    BOOK_PREFIX
        .replace_all(text, |caps: &Captures| {
            let book = &caps[2];
            match (&caps[1], book) {
                ("1", _) => format!("First {book}"),
                ("2", _) => format!("Second {book}"),
                ("3", "John") => format!("Third {book}"),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Replace every whole-word translation abbreviation with its spoken name.
pub fn expand_translations(text: &str) -> String {
    TRANSLATION_TOKEN
        .replace_all(text, |caps: &Captures| {
            let token = &caps[1];
            TRANSLATION_MAP
                .get(token)
                .map(|s| s.to_string())
                .unwrap_or_else(|| token.to_string())
        })
        .into_owned()
}

/// Apply both expansion passes in order.
pub fn expand(text: &str) -> String {
    expand_translations(&expand_numbered_books(text))
}
