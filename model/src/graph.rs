//! Structural graph-building helpers used while walking the revision log:
//! resolving each revision's branch identity (§4.2 "Revision finalization")
//! and linking it into the per-file prev/next/branch_children tree
//! (§4.2 `assign_pre_revision`).
//!
//! Patch-set assignment and vendor-shadow synthesis are deliberately kept
//! out of this module: they live in the `patchset` crate, which depends on
//! `model` rather than the other way around. [`assign_pre_revision`]
//! reports enough ([`LinkOutcome::VendorCandidate`]) for that crate to
//! decide whether to synthesize shadows, without `model` needing to know
//! what a patch set is.

use crate::{error::Error, ids::FileId, ids::RevisionId, model::Model};

/// What [`assign_pre_revision`] discovered about a revision's place in its
/// file's history tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Linked into an existing prev/next chain on the same branch as the
    /// previously-seen revision.
    SameBranch,
    /// The first (chronologically oldest-seen-so-far) revision recorded
    /// on a branch diverging at `parent`.
    BranchChild { parent: RevisionId },
    /// `1.1` with no predecessor: accepted silently per SPEC_FULL.md §8.
    RootRevision,
    /// No parent could be derived; the caller should log a warning.
    Orphan,
    /// The revision lies on a vendor branch whose parent is `parent`; the
    /// caller should check whether vendor-shadow synthesis conditions
    /// (SPEC_FULL.md §4.3) are met.
    VendorCandidate { parent: RevisionId },
}

/// Resolves `rev_id`'s `branch` field (§4.2 "Revision finalization"): the
/// revision string is truncated to its branch identity, and the Tag
/// recorded on the expected parent revision (by branch leaf id) is looked
/// up. A revision with a single-component revision string (`"1"`,
/// vanishingly rare) has no branch to resolve and stays on head.
pub fn resolve_branch(model: &mut Model, file_id: FileId, rev_id: RevisionId) -> Result<(), Error> {
    let rev = model.revision(rev_id).rev.clone();
    let rev_str = model.revision(rev_id).rev_str.clone();

    // First truncation gives the revision's own branch identity (e.g.
    // `1.2.2` for a revision `1.2.2.1`); a second truncation of *that*
    // identity gives the real parent revision it was cut from and the
    // branch leaf id (e.g. `1.2`, leaf `2`) — not to be confused with the
    // revision's own sequence number within the branch.
    let branch_id = match rev.branch() {
        Some(b) => b,
        None => return Ok(()),
    };
    let (branch_rev, leaf) = match branch_id.branch_ext() {
        Some(pair) => pair,
        None => return Ok(()), // single-component branch identity: on head
    };

    let parent_id = model
        .find_revision(file_id, &branch_rev.to_string())
        .ok_or_else(|| {
            Error::UnresolvedBranch(rev_str.to_string(), path_of(model, file_id))
        })?;

    let tag_id = model
        .revision(parent_id)
        .tags
        .iter()
        .copied()
        .find(|&t| model.tag(t).branch.is_branch() && model.tag(t).branch.leaf() == Some(leaf));

    match tag_id {
        Some(tag_id) => {
            model.revision_mut(rev_id).branch = Some(tag_id);
            Ok(())
        }
        None => Err(Error::UnresolvedBranch(rev_str.to_string(), path_of(model, file_id))),
    }
}

/// Links `rev_id` into its file's history tree given `prev_seen`, the
/// revision most recently handled for the same file in stream order (`cvs
/// log`/`rlog` lists revisions newest-first, so `prev_seen`, if any, is
/// chronologically newer than `rev_id`).
pub fn assign_pre_revision(
    model: &mut Model,
    rev_id: RevisionId,
    prev_seen: Option<RevisionId>,
) -> LinkOutcome {
    if let Some(prev_id) = prev_seen {
        if model.revision(prev_id).branch == model.revision(rev_id).branch {
            model.revision_mut(prev_id).prev_rev = Some(rev_id);
            model.revision_mut(rev_id).next_rev = Some(prev_id);
            return LinkOutcome::SameBranch;
        }
    }

    if is_root_revision(model, rev_id) {
        return LinkOutcome::RootRevision;
    }

    match branch_point(model, rev_id) {
        Some((parent_id, is_vendor)) => {
            model.revision_mut(parent_id).branch_children.push(rev_id);
            if is_vendor {
                LinkOutcome::VendorCandidate { parent: parent_id }
            } else {
                LinkOutcome::BranchChild { parent: parent_id }
            }
        }
        None => LinkOutcome::Orphan,
    }
}

fn is_root_revision(model: &Model, rev_id: RevisionId) -> bool {
    model.revision(rev_id).branch.is_none() && model.revision(rev_id).rev.components() == [1, 1]
}

fn branch_point(model: &Model, rev_id: RevisionId) -> Option<(RevisionId, bool)> {
    let tag_id = model.revision(rev_id).branch?;
    let tag = model.tag(tag_id);
    Some((tag.rev, tag.branch.is_vendor()))
}

fn path_of(model: &Model, file_id: FileId) -> String {
    model.file(file_id).path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::Context, types::BranchKind};
    use std::{path::PathBuf, time::SystemTime};

    #[test]
    fn test_root_revision_accepted() {
        let mut ctx = Context::default();
        let file = ctx.model.get_or_create_file(&PathBuf::from("foo.c"));
        let rev = ctx
            .model
            .get_or_create_revision(file, "1.1", SystemTime::UNIX_EPOCH)
            .unwrap();
        resolve_branch(&mut ctx.model, file, rev).unwrap();
        assert_eq!(assign_pre_revision(&mut ctx.model, rev, None), LinkOutcome::RootRevision);
    }

    #[test]
    fn test_branch_child_links_into_branch_children() {
        let mut ctx = Context::default();
        let file = ctx.model.get_or_create_file(&PathBuf::from("foo.c"));
        let trunk = ctx
            .model
            .get_or_create_revision(file, "1.2", SystemTime::UNIX_EPOCH)
            .unwrap();
        ctx.model.add_tag(file, Some("REL_A"), trunk, BranchKind::Branch(2), 3);

        let branch_rev = ctx
            .model
            .get_or_create_revision(file, "1.2.2.1", SystemTime::UNIX_EPOCH)
            .unwrap();
        resolve_branch(&mut ctx.model, file, branch_rev).unwrap();
        let outcome = assign_pre_revision(&mut ctx.model, branch_rev, None);
        assert_eq!(outcome, LinkOutcome::BranchChild { parent: trunk });
        assert_eq!(ctx.model.revision(trunk).branch_children, vec![branch_rev]);
    }

    #[test]
    fn test_vendor_candidate() {
        let mut ctx = Context::default();
        let file = ctx.model.get_or_create_file(&PathBuf::from("foo.c"));
        let trunk = ctx
            .model
            .get_or_create_revision(file, "1.1", SystemTime::UNIX_EPOCH)
            .unwrap();
        ctx.model.add_tag(file, Some("VENDOR"), trunk, BranchKind::Vendor(1), 3);

        let vendor_rev = ctx
            .model
            .get_or_create_revision(file, "1.1.1.1", SystemTime::UNIX_EPOCH)
            .unwrap();
        resolve_branch(&mut ctx.model, file, vendor_rev).unwrap();
        let outcome = assign_pre_revision(&mut ctx.model, vendor_rev, None);
        assert_eq!(outcome, LinkOutcome::VendorCandidate { parent: trunk });
    }

    #[test]
    fn test_unresolved_branch_is_an_error() {
        let mut ctx = Context::default();
        let file = ctx.model.get_or_create_file(&PathBuf::from("foo.c"));
        let rev = ctx
            .model
            .get_or_create_revision(file, "1.2.2.1", SystemTime::UNIX_EPOCH)
            .unwrap();
        assert!(resolve_branch(&mut ctx.model, file, rev).is_err());
    }
}
