// src/name_key.rs
use once_cell::sync::Lazy;
use regex::Regex;

// Parenthesized annotations such as "(Contractor)", with any whitespace before them.
static PAREN_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(.*?\)").expect("static regex is valid"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("static regex is valid"));

/// Canonicalizes a display name into the key used to join schedule rows
/// against punch records.
///
/// Parenthesized annotations are removed, whitespace runs collapse to a single
/// space, the ends are trimmed and the result is lower-cased. Never fails.
pub fn normalize(raw: &str) -> String {
    let without_annotations = PAREN_SUFFIX.replace_all(raw, "");
    let collapsed = WHITESPACE_RUN.replace_all(&without_annotations, " ");
    collapsed.trim().to_lowercase()
}

/// Title-cases a display name: the first letter of every alphabetic run is
/// upper-cased and the rest lower-cased ("o'neil" -> "O'Neil").
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_word = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
