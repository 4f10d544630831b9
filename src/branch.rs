//! Branch-name emit filter (SPEC_FULL.md §4.7 "`-b` branch match"),
//! retargeted from the historical byte-string `HashSet` filter to the
//! already-resolved branch [`model::SymbolId`] `symtab::resolve_restrict`
//! computes from the `-b`/`-r` interaction (§4.5.1): comparing by id
//! avoids re-deriving the branch name's precedence rules a second time
//! in the emitter.

use model::SymbolId;

pub(crate) struct BranchFilter {
    branch: Option<SymbolId>,
}

impl BranchFilter {
    pub(crate) fn new(branch: Option<SymbolId>) -> Self {
        Self { branch }
    }

    pub(crate) fn contains(&self, branch: SymbolId) -> bool {
        match self.branch {
            Some(wanted) => wanted == branch,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_restriction_matches_everything() {
        let filter = BranchFilter::new(None);
        assert!(filter.contains(SymbolId::from(0usize)));
        assert!(filter.contains(SymbolId::from(7usize)));
    }

    #[test]
    fn test_restriction_matches_only_the_named_branch() {
        let filter = BranchFilter::new(Some(SymbolId::from(3usize)));
        assert!(filter.contains(SymbolId::from(3usize)));
        assert!(!filter.contains(SymbolId::from(4usize)));
    }
}
