//! Identifier hygiene: sanitizing schema keys, case conversion, and
//! collision resolution against the declaration table.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::table::DeclarationTable;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{Alphabetic}_][\p{Alphabetic}\p{N}_]*$").expect("identifier regex"));
static IDENTIFIER_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{Alphabetic}\p{N}_]$").expect("identifier char regex"));
static IDENTIFIER_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{Alphabetic}_]").expect("identifier start regex"));

/// Reserved words of the host language; usable as keys, not as names.
const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

pub fn is_valid_identifier(raw: &str) -> bool {
    IDENTIFIER.is_match(raw) && !KEYWORDS.contains(&raw)
}

/// Turn an arbitrary schema key into a usable identifier. Path separators,
/// whitespace and punctuation become `_`; a leading digit gets a `_`
/// prefix; reserved words get a `_` suffix.
pub fn sanitize(raw: &str) -> String {
    if is_valid_identifier(raw) {
        return raw.to_string();
    }
    let mut buf = [0u8; 4];
    let mut out: String = raw
        .chars()
        .map(|c| if IDENTIFIER_CHAR.is_match(c.encode_utf8(&mut buf)) { c } else { '_' })
        .collect();
    if !IDENTIFIER_START.is_match(&out) {
        out.insert(0, '_');
    }
    if KEYWORDS.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

fn words(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `user_name`, `user-name` and `userName` all become `UserName`.
pub fn to_pascal_case(raw: &str) -> String {
    words(raw).map(capitalize).collect()
}

pub fn to_camel_case(raw: &str) -> String {
    let pascal = to_pascal_case(raw);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn to_snake_case(raw: &str) -> String {
    let mut out = String::new();
    for word in words(raw) {
        let mut prev_lower = false;
        if !out.is_empty() {
            out.push('_');
        }
        for c in word.chars() {
            if c.is_uppercase() && prev_lower {
                out.push('_');
            }
            prev_lower = c.is_lowercase() || c.is_numeric();
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// First unused name among `candidate`, `candidate1`, `candidate2`, …
pub fn resolve_conflict(candidate: &str, table: &DeclarationTable) -> String {
    if !table.contains(candidate) {
        return candidate.to_string();
    }
    (1..)
        .map(|n| format!("{candidate}{n}"))
        .find(|name| !table.contains(name))
        .unwrap_or_else(|| candidate.to_string())
}

/// Declaration name for a hint: Pascal-cased, sanitized, collision-free.
pub fn declaration_name(hint: &str, table: &DeclarationTable) -> String {
    let pascal = to_pascal_case(hint);
    let base = if pascal.is_empty() { sanitize(hint) } else { sanitize(&pascal) };
    resolve_conflict(&base, table)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
