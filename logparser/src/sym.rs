//! Classification of one `symbolic names:` entry (`tag: rev;`) into the
//! branch kind its revision string encodes, mirroring the `0`-magic-branch,
//! vendor-branch and plain-static cases handled inline in `parse_sym`.

use model::BranchKind;
use revstr::Rev;

/// The parsed shape of a `symbolic names:` entry: the truncated revision
/// the Tag should be attached to, the branch kind it carries, and (for
/// branch/vendor kinds) the Symbol depth implied by the branch's own
/// dotted identity (2 = trunk, 3 = a branch off trunk, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub rev: Rev,
    pub branch: BranchKind,
    pub depth: u16,
}

/// Classifies a raw revision string found against a symbolic name.
///
/// - A magic branch tag (`a.b.0.c`) strips the `0` and uses `c` as the
///   branch leaf id, attached to the revision `a.b`. The Symbol's depth
///   is derived from the branch's own identity (`a.b.c`, one component
///   deeper than the attachment revision `a.b`), not from the attachment
///   revision itself.
/// - A vendor branch tag (even dot count, e.g. `1.1.1`) is truncated the
///   same way, so the Tag attaches to the real trunk revision it forks
///   from (`1.1`) rather than to the unreachable branch-identity string
///   itself, with a vendor branch id equal to its own leaf.
/// - Anything else is a static tag at the revision itself (depth is
///   meaningless for static tags and reported as 0).
pub fn classify(rev: &Rev) -> Classified {
    if let Some(identity) = rev.strip_magic_branch() {
        if let Some((truncated, leaf)) = identity.branch_ext() {
            return Classified {
                rev: truncated,
                branch: BranchKind::Branch(leaf),
                depth: identity.count_dots() as u16 + 1,
            };
        }
    }

    if rev.is_vendor_branch_shape() {
        if let Some((truncated, leaf)) = rev.branch_ext() {
            return Classified {
                rev: truncated,
                branch: BranchKind::Vendor(leaf),
                depth: rev.count_dots() as u16 + 1,
            };
        }
    }

    Classified {
        rev: rev.clone(),
        branch: BranchKind::Static,
        depth: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_magic_branch_tag() {
        let rev = Rev::parse("1.2.0.4").unwrap();
        let got = classify(&rev);
        assert_eq!(got.rev, Rev::parse("1.2").unwrap());
        assert_eq!(got.branch, BranchKind::Branch(4));
        assert_eq!(got.depth, 3);
    }

    #[test]
    fn test_classify_vendor_branch_tag() {
        let rev = Rev::parse("1.1.1").unwrap();
        let got = classify(&rev);
        assert_eq!(got.rev, Rev::parse("1.1").unwrap());
        assert_eq!(got.branch, BranchKind::Vendor(1));
        assert_eq!(got.depth, 3);
    }

    #[test]
    fn test_classify_static_tag() {
        let rev = Rev::parse("1.4").unwrap();
        let got = classify(&rev);
        assert_eq!(got.rev, rev);
        assert_eq!(got.branch, BranchKind::Static);
    }
}
