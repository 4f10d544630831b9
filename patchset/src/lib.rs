//! Groups dated, per-file Revisions into atomic PatchSets (SPEC_FULL.md
//! §4.3), generalizing the historical single-bucket `Detector` (keyed only
//! on author+message, with no notion of branch, vendor shadows, or member
//! collisions) into the full (branch, branch_add, author, message)
//! equivalence class with a sliding fuzz window.
//!
//! Revisions must be fed to [`Aggregator::add_revision`] in ascending date
//! order across the whole repository (not grouped per file) so that a
//! bucket's currently-open PatchSet is always the most recent one created
//! for that key — the same invariant the historical bucket-sort-then-walk
//! approach relied on, just computed incrementally here instead of via a
//! pre-sorted heap.

mod error;

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};

use model::{FileId, Model, PatchSetId, RevisionId, SymbolId};

pub use error::Error;

/// Mirrors the historical `enum funk_factor`: only ever set by the symbol
/// resolver (`-r`/`-F` handling, SPEC_FULL.md §4.5.1), never by the
/// aggregator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunkFactor {
    None,
    ShowSome,
    ShowAll,
    HideAll,
    HideSome,
}

impl Default for FunkFactor {
    fn default() -> Self {
        FunkFactor::None
    }
}

/// A project-wide atomic commit inferred from same-author/same-message
/// revisions across files that landed within a fuzz window of each other
/// (SPEC_FULL.md §3 "PatchSet").
#[derive(Debug, Clone)]
pub struct PatchSet {
    pub id: PatchSetId,
    /// The user-facing patch set number (SPEC_FULL.md §3 "monotonic id
    /// (assigned late)"): `-1` until the symbol table's psid assignment
    /// pass runs over the final emit order, then a 1-based number in that
    /// order, skipping `branch_add` sets entirely (mirroring
    /// `assign_patchset_id`). Never use `id.index()` where this is what's
    /// meant; `id` only indexes the patch-set arena.
    pub psid: i64,
    pub date: SystemTime,
    pub min_date: SystemTime,
    pub max_date: SystemTime,
    pub author: Arc<str>,
    pub message: Arc<str>,
    pub branch: SymbolId,
    pub branch_add: bool,
    pub members: Vec<(FileId, RevisionId)>,
    pub funk_factor: FunkFactor,
    pub tags: Vec<SymbolId>,
    /// Set on a synthetic shadow PatchSet: the real vendor-branch PatchSet
    /// it stands in for on the parent branch.
    pub vendor_shadowed: Option<PatchSetId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CoarseKey {
    branch_add: bool,
    author: Arc<str>,
    message: Arc<str>,
}

/// Incrementally groups revisions into patch sets. One `Aggregator` per
/// invocation; consume it with [`Aggregator::finish`] once every revision
/// has been fed in.
pub struct Aggregator {
    fuzz: Duration,
    // `-U`: whether two distinct files' unnamed branches that otherwise
    // land in the same equivalence class should be unified into one
    // Symbol (SPEC_FULL.md §8 scenario 5). Off by default, since merging
    // unrelated unnamed branches on no more evidence than a shared
    // author/message/fuzz-window coincidence is a lossy guess.
    unify_unnamed: bool,
    patch_sets: Vec<PatchSet>,
    // Candidate open buckets, grouped coarsely by (branch_add, author,
    // message); within a bucket, entries are further split by branch
    // symbol, since two different branches can otherwise share a key.
    open: HashMap<CoarseKey, Vec<(SymbolId, PatchSetId)>>,
    // Canonicalizes an unnamed branch symbol onto the first one seen for
    // the same apparent branch, once two have been recognized as the same
    // (SPEC_FULL.md §4.3's unnamed-branch merge).
    alias: HashMap<SymbolId, SymbolId>,
    // One open shadow-chain tail per vendor-import parent revision.
    shadow_tail: HashMap<RevisionId, RevisionId>,
    collisions: Vec<PatchSetId>,
}

impl Aggregator {
    pub fn new(fuzz: Duration, unify_unnamed: bool) -> Self {
        Self {
            fuzz,
            unify_unnamed,
            patch_sets: Vec::new(),
            open: HashMap::new(),
            alias: HashMap::new(),
            shadow_tail: HashMap::new(),
            collisions: Vec::new(),
        }
    }

    /// Folds one Revision of one File into its patch set, creating a new
    /// one if none of the open candidates for its equivalence class fall
    /// within the fuzz window. Must be called in ascending-date order.
    pub fn add_revision(&mut self, model: &mut Model, file_id: FileId, rev_id: RevisionId) {
        let date = model.revision(rev_id).date;
        let author = model.revision(rev_id).author.clone();
        let message = model.revision(rev_id).message.clone();
        let branch_add = model.revision(rev_id).branch_add;
        let branch_sym = self.canonical(self.branch_symbol(model, rev_id));

        let key = CoarseKey {
            branch_add,
            author,
            message,
        };

        let ps_id = self.find_or_open(model, &key, branch_sym, date);
        self.add_member(model, ps_id, file_id, rev_id);

        if let Some(tag_id) = model.revision(rev_id).branch {
            if model.tag(tag_id).branch.is_vendor() {
                let parent_id = model.tag(tag_id).rev;
                self.maybe_shadow(model, rev_id, parent_id, ps_id);
            }
        }
    }

    /// Finds an open candidate whose branch (after unnamed-branch
    /// canonicalization) matches and whose window contains `date`,
    /// absorbing into it; otherwise opens a new PatchSet under `branch`.
    fn find_or_open(
        &mut self,
        model: &mut Model,
        key: &CoarseKey,
        branch: SymbolId,
        date: SystemTime,
    ) -> PatchSetId {
        if let Some(candidates) = self.open.get(key) {
            // Exact branch match first.
            if let Some(&(_, id)) = candidates.iter().find(|&&(b, _)| b == branch) {
                if date <= self.patch_sets[id.index()].max_date {
                    self.absorb(id, date);
                    return id;
                }
            }

            // Otherwise, an unnamed branch may be the same branch as an
            // already-open unnamed branch under this key: merge them,
            // if `-U` asked for that guess to be made.
            if self.unify_unnamed && model.symbol(branch).name.is_none() {
                for &(other_branch, id) in candidates {
                    if other_branch == branch {
                        continue;
                    }
                    if model.symbol(other_branch).name.is_some() {
                        continue;
                    }
                    if date <= self.patch_sets[id.index()].max_date {
                        // Open Question 3 (DESIGN.md): two unnamed
                        // branches whose Symbol depth has conflicting
                        // parity can't be the same branch identity, since
                        // depth parity tracks branch-vs-trunk-lineage
                        // shape. Reject the merge rather than guess which
                        // one is wrong.
                        if model.symbol(branch).depth % 2 != model.symbol(other_branch).depth % 2 {
                            log::warn!(
                                "not unifying unnamed branches with conflicting depth parity ({} vs {})",
                                model.symbol(branch).depth,
                                model.symbol(other_branch).depth
                            );
                            continue;
                        }
                        model.merge_symbol(other_branch, branch);
                        self.alias.insert(branch, other_branch);
                        self.absorb(id, date);
                        return id;
                    }
                }
            }
        }

        let id = self.new_patch_set(date, branch, key.branch_add, key.author.clone(), key.message.clone());
        self.open.entry(key.clone()).or_default().push((branch, id));
        id
    }

    fn canonical(&self, mut sym: SymbolId) -> SymbolId {
        while let Some(&next) = self.alias.get(&sym) {
            if next == sym {
                break;
            }
            sym = next;
        }
        sym
    }

    fn branch_symbol(&self, model: &mut Model, rev_id: RevisionId) -> SymbolId {
        match model.revision(rev_id).branch {
            Some(tag_id) => model.tag(tag_id).sym,
            None => model.trunk_symbol(),
        }
    }

    fn new_patch_set(
        &mut self,
        date: SystemTime,
        branch: SymbolId,
        branch_add: bool,
        author: Arc<str>,
        message: Arc<str>,
    ) -> PatchSetId {
        let id = PatchSetId::from(self.patch_sets.len());
        self.patch_sets.push(PatchSet {
            id,
            psid: -1,
            date,
            min_date: sub_fuzz(date, self.fuzz),
            max_date: add_fuzz(date, self.fuzz),
            author,
            message,
            branch,
            branch_add,
            members: Vec::new(),
            funk_factor: FunkFactor::default(),
            tags: Vec::new(),
            vendor_shadowed: None,
        });
        id
    }

    fn absorb(&mut self, id: PatchSetId, date: SystemTime) {
        let ps = &mut self.patch_sets[id.index()];
        if date < ps.date {
            ps.date = date;
        }
        if date < ps.min_date {
            ps.min_date = date;
        }
        let extended = add_fuzz(date, self.fuzz);
        if extended > ps.max_date {
            ps.max_date = extended;
        }
    }

    /// `patch_set_add_member`: at most one member per File survives. A
    /// same-revision re-add is a collision; a different-revision re-add is
    /// resolved by the revision comparator, newer wins.
    fn add_member(&mut self, model: &mut Model, ps_id: PatchSetId, file_id: FileId, rev_id: RevisionId) {
        let ps = &mut self.patch_sets[ps_id.index()];
        if let Some(pos) = ps.members.iter().position(|&(f, _)| f == file_id) {
            let (_, existing_rev) = ps.members[pos];
            if existing_rev == rev_id {
                return;
            }
            let existing = model.revision(existing_rev).rev.clone();
            let incoming = model.revision(rev_id).rev.clone();
            if existing == incoming {
                self.collisions.push(ps_id);
                return;
            }
            if incoming > existing {
                ps.members[pos] = (file_id, rev_id);
                model.revision_mut(rev_id).ps = Some(ps_id);
            }
            return;
        }
        ps.members.push((file_id, rev_id));
        model.revision_mut(rev_id).ps = Some(ps_id);
    }

    /// Vendor-shadow synthesis (SPEC_FULL.md §4.3): a vendor-branch
    /// revision whose parent's own patch set is the initial import commit
    /// gets a synthetic twin spliced onto the parent's branch, so that a
    /// vendor import reads as ordinary trunk history too. `cvs import`
    /// writes the trunk `1.1` and the vendor `1.1.1.1` at the same instant,
    /// so a vendor revision dated no earlier than its parent still shadows;
    /// only a vendor revision strictly older than its parent is rejected.
    fn maybe_shadow(&mut self, model: &mut Model, vendor_rev: RevisionId, parent_id: RevisionId, vendor_ps: PatchSetId) {
        let parent_date = model.revision(parent_id).date;
        let vendor_date = model.revision(vendor_rev).date;
        if vendor_date < parent_date {
            return;
        }

        let parent_ps = match model.revision(parent_id).ps {
            Some(id) => id,
            None => return,
        };
        if self.patch_sets[parent_ps.index()].message.as_ref() != "Initial revision" {
            return;
        }

        let cutoff = match model.revision(parent_id).next_rev {
            Some(n) => model.revision(n).date,
            None => SystemTime::now(),
        };
        if vendor_date >= cutoff {
            return;
        }

        model.revision_mut(parent_id).import_add = true;

        let tail = *self.shadow_tail.get(&parent_id).unwrap_or(&parent_id);
        let file_id = model.revision(vendor_rev).file;
        let rev = model.revision(vendor_rev).rev.clone();
        let rev_str = model.revision(vendor_rev).rev_str.clone();
        let dead = model.revision(vendor_rev).dead;
        let branch = model.revision(parent_id).branch;

        let shadow_id = model.push_shadow_revision(file_id, rev, rev_str, vendor_date);
        {
            let shadow = model.revision_mut(shadow_id);
            shadow.dead = dead;
            shadow.shadow = true;
            shadow.branch = branch;
        }
        model.revision_mut(vendor_rev).vendor_shadow = Some(shadow_id);

        let old_next = model.revision(tail).next_rev;
        model.revision_mut(tail).next_rev = Some(shadow_id);
        model.revision_mut(shadow_id).prev_rev = Some(tail);
        model.revision_mut(shadow_id).next_rev = old_next;
        if let Some(n) = old_next {
            model.revision_mut(n).prev_rev = Some(shadow_id);
        }
        self.shadow_tail.insert(parent_id, shadow_id);

        let branch_sym = self.branch_symbol(model, parent_id);
        let shadow_ps_id = PatchSetId::from(self.patch_sets.len());
        let vendor_author = model.revision(vendor_rev).author.clone();
        let vendor_message = model.revision(vendor_rev).message.clone();
        self.patch_sets.push(PatchSet {
            id: shadow_ps_id,
            psid: -1,
            date: vendor_date,
            min_date: vendor_date,
            max_date: vendor_date,
            author: vendor_author,
            message: vendor_message,
            branch: branch_sym,
            branch_add: false,
            members: vec![(file_id, shadow_id)],
            funk_factor: FunkFactor::default(),
            tags: Vec::new(),
            vendor_shadowed: Some(vendor_ps),
        });
        model.revision_mut(shadow_id).ps = Some(shadow_ps_id);
    }

    /// Consumes the aggregator, returning every patch set (in creation/id
    /// order — not yet the final emit order, which is the total-order
    /// sorter's job) and the list of patch sets that recorded a member
    /// collision.
    pub fn finish(self) -> (Vec<PatchSet>, Vec<PatchSetId>) {
        (self.patch_sets, self.collisions)
    }
}

fn add_fuzz(date: SystemTime, fuzz: Duration) -> SystemTime {
    date.checked_add(fuzz).unwrap_or(date)
}

fn sub_fuzz(date: SystemTime, fuzz: Duration) -> SystemTime {
    date.checked_sub(fuzz).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ts(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn seed_revision(model: &mut Model, file: FileId, rev: &str, date: SystemTime, author: &str, message: &str) -> RevisionId {
        let id = model.get_or_create_revision(file, rev, date).unwrap();
        model.revision_mut(id).present = true;
        model.set_revision_log(id, author, message);
        id
    }

    #[test]
    fn test_same_key_within_fuzz_merges_into_one_patch_set() {
        let mut model = Model::new();
        let file_a = model.get_or_create_file(&PathBuf::from("a.c"));
        let file_b = model.get_or_create_file(&PathBuf::from("b.c"));
        let rev_a = seed_revision(&mut model, file_a, "1.1", ts(1000), "alice", "did a thing");
        let rev_b = seed_revision(&mut model, file_b, "1.1", ts(1010), "alice", "did a thing");

        let mut agg = Aggregator::new(Duration::from_secs(300), false);
        agg.add_revision(&mut model, file_a, rev_a);
        agg.add_revision(&mut model, file_b, rev_b);

        let (patch_sets, collisions) = agg.finish();
        assert_eq!(patch_sets.len(), 1);
        assert_eq!(patch_sets[0].members.len(), 2);
        assert!(collisions.is_empty());
    }

    #[test]
    fn test_gap_beyond_fuzz_opens_a_new_patch_set() {
        let mut model = Model::new();
        let file = model.get_or_create_file(&PathBuf::from("a.c"));
        let rev1 = seed_revision(&mut model, file, "1.1", ts(1000), "alice", "first");
        let rev2 = seed_revision(&mut model, file, "1.2", ts(5000), "alice", "first");

        let mut agg = Aggregator::new(Duration::from_secs(300), false);
        agg.add_revision(&mut model, file, rev1);
        agg.add_revision(&mut model, file, rev2);

        let (patch_sets, _) = agg.finish();
        assert_eq!(patch_sets.len(), 2);
    }

    #[test]
    fn test_same_file_same_revision_is_a_collision() {
        let mut model = Model::new();
        let file_a = model.get_or_create_file(&PathBuf::from("a.c"));
        let rev1 = seed_revision(&mut model, file_a, "1.1", ts(1000), "alice", "msg");

        let mut agg = Aggregator::new(Duration::from_secs(300), false);
        agg.add_revision(&mut model, file_a, rev1);
        agg.add_revision(&mut model, file_a, rev1);

        let (patch_sets, collisions) = agg.finish();
        assert_eq!(patch_sets.len(), 1);
        assert_eq!(patch_sets[0].members.len(), 1);
        assert_eq!(collisions.len(), 1);
    }

    #[test]
    fn test_newer_revision_of_same_file_replaces_older_member() {
        let mut model = Model::new();
        let file_a = model.get_or_create_file(&PathBuf::from("a.c"));
        let rev1 = seed_revision(&mut model, file_a, "1.1", ts(1000), "alice", "msg");
        let rev2 = seed_revision(&mut model, file_a, "1.2", ts(1010), "alice", "msg");

        let mut agg = Aggregator::new(Duration::from_secs(300), false);
        agg.add_revision(&mut model, file_a, rev1);
        agg.add_revision(&mut model, file_a, rev2);

        let (patch_sets, _) = agg.finish();
        assert_eq!(patch_sets.len(), 1);
        assert_eq!(patch_sets[0].members, vec![(file_a, rev2)]);
    }
}
