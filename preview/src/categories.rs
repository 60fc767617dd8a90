//! Category visibility bookkeeping for the metadata field editor.

use api_client::Category;
use std::collections::BTreeSet;

/// Every category minus the suppressed ones.
pub fn enabled_categories(all: &[Category], suppressed: &[u64]) -> BTreeSet<u64> {
    let suppressed: BTreeSet<u64> = suppressed.iter().copied().collect();
    all.iter()
        .map(|c| c.id)
        .filter(|id| !suppressed.contains(id))
        .collect()
}

/// Suppression calls needed to move from one enabled set to another.
///
/// `suppress` and `unsuppress` are disjoint and sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDiff {
    pub suppress: Vec<u64>,
    pub unsuppress: Vec<u64>,
}

impl CategoryDiff {
    pub fn is_empty(&self) -> bool {
        self.suppress.is_empty() && self.unsuppress.is_empty()
    }
}

pub fn diff_categories(original: &BTreeSet<u64>, edited: &BTreeSet<u64>) -> CategoryDiff {
    CategoryDiff {
        suppress: original.difference(edited).copied().collect(),
        unsuppress: edited.difference(original).copied().collect(),
    }
}
