//! Identifier rules.
//!
//! Global variable names are stored without their `$` sigil. Besides
//! ordinary identifiers a global may be a single punctuation character
//! (`$~`, `$/`), a dash option (`$-w`) or a match group number (`$1`).

/// Punctuation characters that name a special global.
const PUNCTUATION_GLOBALS: &str = "~&`'+_!@?/\\,;.<>*$:\"0";

/// `true` for ordinary identifiers: a letter or `_`, then letters, digits or `_`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// `true` if `name` (without the `$` sigil) is a legal global variable name.
pub fn is_global_name(name: &str) -> bool {
    if is_identifier(name) {
        return true;
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(c), None, None) => PUNCTUATION_GLOBALS.contains(c),
        (Some('-'), Some(c), None) => c.is_ascii_alphanumeric() || c == '_',
        _ => {
            !name.is_empty()
                && !name.starts_with('0')
                && name.bytes().all(|b| b.is_ascii_digit())
        }
    }
}

/// Strip a leading `$` sigil if present.
pub fn strip_sigil(name: &str) -> &str {
    name.strip_prefix('$').unwrap_or(name)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
