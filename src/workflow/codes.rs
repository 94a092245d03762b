//! Project code generation: `{CATEGORY}-{YEAR}-{VERTICAL_CODE}-{SEQ}`.
//!
//! These functions are pure. Callers must run `next_project_code` inside a
//! critical section scoped to the prefix (see `ProposalStore::convert`),
//! otherwise two conversions can compute the same sequence.

use portal_types::ProjectCategory;

/// Width of the zero-padded sequence segment.
pub const SEQUENCE_WIDTH: usize = 3;

/// The `(category, year, vertical)` part shared by all codes in a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodePrefix(String);

impl CodePrefix {
    pub fn new(category: ProjectCategory, year: i32, vertical_code: &str) -> Self {
        Self(format!("{}-{}-{}", category.as_str(), year, vertical_code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SQL `LIKE` pattern matching every code in this sequence.
    pub fn like_pattern(&self) -> String {
        let escaped = self
            .0
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("{}-%", escaped)
    }

    /// Sequence number of `code` if it belongs to this prefix.
    /// `GAP-2025-DM` does not claim `GAP-2025-DMX-001`.
    pub fn sequence_of(&self, code: &str) -> Option<u32> {
        let rest = code.strip_prefix(self.0.as_str())?.strip_prefix('-')?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse().ok()
    }

    pub fn code_for(&self, sequence: u32) -> String {
        format!("{}-{:0width$}", self.0, sequence, width = SEQUENCE_WIDTH)
    }
}

impl std::fmt::Display for CodePrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Next unused code after every existing code in the sequence. Gaps left by
/// removed projects are never refilled.
pub fn next_project_code<'a, I>(prefix: &CodePrefix, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let max = existing
        .into_iter()
        .filter_map(|code| prefix.sequence_of(code))
        .max()
        .unwrap_or(0);
    prefix.code_for(max + 1)
}
