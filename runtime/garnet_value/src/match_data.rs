//! Result of a successful pattern match, as stored in `$~`.

use std::ops::Range;

/// Byte-offset capture groups over a source string.
///
/// Group 0 is the entire match. The regex engine producing these lives
/// outside the runtime core; hosts construct `MatchData` from its captures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchData {
    source: String,
    groups: Vec<Option<Range<usize>>>,
}

impl MatchData {
    /// Build match data, rejecting an absent group 0 or groups that are out of
    /// bounds or split a UTF-8 character.
    pub fn new(source: impl Into<String>, groups: Vec<Option<Range<usize>>>) -> Option<Self> {
        let source = source.into();
        let valid = |range: &Range<usize>| {
            range.start <= range.end
                && range.end <= source.len()
                && source.is_char_boundary(range.start)
                && source.is_char_boundary(range.end)
        };
        match groups.first() {
            Some(Some(_)) => {}
            _ => return None,
        }
        if !groups.iter().flatten().all(valid) {
            return None;
        }
        Some(MatchData { source, groups })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of groups including group 0.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Text of group `index`, or `None` if the group did not participate.
    pub fn group(&self, index: usize) -> Option<&str> {
        let range = self.groups.get(index)?.as_ref()?;
        self.source.get(range.clone())
    }

    /// Text before the entire match.
    pub fn pre_match(&self) -> &str {
        let start = self.entire().start;
        &self.source[..start]
    }

    /// Text after the entire match.
    pub fn post_match(&self) -> &str {
        let end = self.entire().end;
        &self.source[end..]
    }

    /// Highest-numbered group that participated in the match.
    pub fn last_group(&self) -> Option<&str> {
        (0..self.groups.len()).rev().find_map(|i| self.group(i))
    }

    fn entire(&self) -> Range<usize> {
        // `new` guarantees group 0 is present
        self.groups
            .first()
            .and_then(Clone::clone)
            .unwrap_or(0..0)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
