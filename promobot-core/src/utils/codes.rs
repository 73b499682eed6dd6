// promobot-core/src/utils/codes.rs
//
// Pure helpers for code text. Everything here is total and deterministic;
// no storage is touched.

use once_cell::sync::Lazy;
use regex::Regex;

/// Codes are 6 letters + 4 digits, with at most one separator in between.
static WELL_FORMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{6}-?[0-9]{4}$").unwrap()
});

/// Reduce raw text to the canonical key: uppercase, keep `[A-Z0-9]` only.
/// Idempotent.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Re-insert the single display separator after the 6th character.
/// Keys shorter than 10 characters are returned as-is.
pub fn prettify(key: &str) -> String {
    if key.len() >= 10 && key.is_char_boundary(6) {
        format!("{}-{}", &key[..6], &key[6..])
    } else {
        key.to_string()
    }
}

/// A submission is well-formed only if, uppercased, it is exactly 6 letters,
/// an optional single separator, then 4 digits. Anything else is rejected
/// before any store lookup.
pub fn is_well_formed(raw: &str) -> bool {
    WELL_FORMED.is_match(&raw.trim().to_uppercase())
}
