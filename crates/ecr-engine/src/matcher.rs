//! Set intersection of candidate codes against reference codes.

use std::collections::BTreeSet;

/// Outcome of matching one candidate set against a reference set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeMatch {
    pub intersection: BTreeSet<String>,
    pub is_match: bool,
}

/// Intersects `candidates` with `reference`.
///
/// Codes are opaque tokens compared by exact string equality; case and
/// whitespace are significant.
pub fn match_codes(candidates: &BTreeSet<String>, reference: &BTreeSet<String>) -> CodeMatch {
    let (small, large) = if candidates.len() <= reference.len() {
        (candidates, reference)
    } else {
        (reference, candidates)
    };

    let intersection: BTreeSet<String> = small
        .iter()
        .filter(|code| large.contains(*code))
        .cloned()
        .collect();

    CodeMatch {
        is_match: !intersection.is_empty(),
        intersection,
    }
}
