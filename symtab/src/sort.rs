//! Total-order sorter (SPEC_FULL.md §4.6): each branch's patch sets are
//! sorted locally, then merged into one global order by repeatedly picking
//! the smallest next patch set among the currently reachable ("head")
//! branches.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use model::{Model, PatchSetId, SymbolId};
use patchset::PatchSet;

pub fn total_order(model: &Model, patch_sets: &[PatchSet]) -> Vec<PatchSetId> {
    let mut by_branch: HashMap<SymbolId, Vec<PatchSetId>> = HashMap::new();
    for ps in patch_sets {
        by_branch.entry(ps.branch).or_default().push(ps.id);
    }
    for list in by_branch.values_mut() {
        list.sort_by(|&a, &b| branch_local_cmp(model, patch_sets, a, b));
    }

    // Every branch-kind Tag roots a branch at the patch set its parent
    // revision belongs to; once that patch set is appended, the branch
    // becomes reachable.
    let mut anchors: HashMap<PatchSetId, Vec<SymbolId>> = HashMap::new();
    for sym_id in model.symbol_ids() {
        if by_branch.get(&sym_id).map_or(true, |l| l.is_empty()) {
            continue;
        }
        match anchor_patch_set(model, sym_id) {
            Some(anchor_ps) => anchors.entry(anchor_ps).or_default().push(sym_id),
            None => {} // no anchor found yet; treated as an initial head below
        }
    }

    let trunk = by_branch
        .keys()
        .copied()
        .find(|&s| model.symbol(s).name.as_deref() == Some("HEAD"));

    let mut heads: HashSet<SymbolId> = HashSet::new();
    for &sym_id in by_branch.keys() {
        if Some(sym_id) == trunk || anchor_patch_set(model, sym_id).is_none() {
            heads.insert(sym_id);
        }
    }

    let mut cursor: HashMap<SymbolId, usize> = HashMap::new();
    let mut order = Vec::with_capacity(patch_sets.len());
    let total_expected = patch_sets.len();

    loop {
        if order.len() >= total_expected {
            break;
        }

        if heads.is_empty() {
            let remaining = by_branch
                .iter()
                .find(|(s, list)| *cursor.get(*s).unwrap_or(&0) < list.len());
            match remaining {
                Some((&sym_id, _)) => {
                    log::warn!("branch reachability failure; forcing an orphaned branch into the head set");
                    heads.insert(sym_id);
                }
                None => break,
            }
        }

        let best = heads
            .iter()
            .copied()
            .filter(|s| cursor.get(s).copied().unwrap_or(0) < by_branch.get(s).map_or(0, |l| l.len()))
            .min_by(|&a, &b| {
                let pa = by_branch[&a][cursor.get(&a).copied().unwrap_or(0)];
                let pb = by_branch[&b][cursor.get(&b).copied().unwrap_or(0)];
                final_cmp(model, patch_sets, pa, pb)
            });

        let branch = match best {
            Some(b) => b,
            None => {
                heads.clear();
                continue;
            }
        };

        let idx = cursor.entry(branch).or_insert(0);
        let ps_id = by_branch[&branch][*idx];
        *idx += 1;
        order.push(ps_id);

        if *idx >= by_branch[&branch].len() {
            heads.remove(&branch);
        }

        if let Some(newly_rooted) = anchors.get(&ps_id) {
            for &sym_id in newly_rooted {
                heads.insert(sym_id);
            }
        }
    }

    order
}

/// Walks `order` (the final emit order from [`total_order`]) assigning each
/// patch set its user-facing psid: 1-based, monotonic in that order, and
/// skipping `branch_add` sets entirely — they keep the `-1` sentinel they
/// were created with, same as `assign_patchset_id` leaving them unnumbered.
pub fn assign_psids(patch_sets: &mut [PatchSet], order: &[PatchSetId]) {
    let mut counter: i64 = 0;
    for &id in order {
        let ps = &mut patch_sets[id.index()];
        if ps.branch_add {
            continue;
        }
        counter += 1;
        ps.psid = counter;
    }
}

fn anchor_patch_set(model: &Model, branch_sym: SymbolId) -> Option<PatchSetId> {
    for tag_id in model.symbol(branch_sym).tags.iter().copied() {
        let tag = model.tag(tag_id);
        if tag.branch.is_branch() && tag.sym == branch_sym {
            return model.revision(tag.rev).ps;
        }
    }
    None
}

fn get_ps<'a>(patch_sets: &'a [PatchSet], id: PatchSetId) -> &'a PatchSet {
    &patch_sets[id.index()]
}

fn branch_local_cmp(model: &Model, patch_sets: &[PatchSet], a: PatchSetId, b: PatchSetId) -> Ordering {
    let pa = get_ps(patch_sets, a);
    let pb = get_ps(patch_sets, b);

    if pa.max_date < pb.date {
        return Ordering::Less;
    }
    if pa.date > pb.max_date {
        return Ordering::Greater;
    }

    if let Some(ord) = member_tie_break(model, pa, pb) {
        return ord;
    }

    pa.date.cmp(&pb.date)
}

fn member_tie_break(model: &Model, a: &PatchSet, b: &PatchSet) -> Option<Ordering> {
    for &(file_id, rev_a) in &a.members {
        if let Some(&(_, rev_b)) = b.members.iter().find(|&&(f, _)| f == file_id) {
            let ra = &model.revision(rev_a).rev;
            let rb = &model.revision(rev_b).rev;
            if ra != rb {
                return Some(ra.cmp(rb));
            }
        }
    }
    None
}

/// Extends [`branch_local_cmp`] with the two global-merge tie-breaks: a
/// vendor-shadowed patch set always yields to the vendor patch set it
/// mirrors, and at equal date a deeper branch goes first.
fn final_cmp(model: &Model, patch_sets: &[PatchSet], a: PatchSetId, b: PatchSetId) -> Ordering {
    let pa = get_ps(patch_sets, a);
    let pb = get_ps(patch_sets, b);

    if pa.vendor_shadowed == Some(b) {
        return Ordering::Greater;
    }
    if pb.vendor_shadowed == Some(a) {
        return Ordering::Less;
    }

    let base = branch_local_cmp(model, patch_sets, a, b);
    if base != Ordering::Equal {
        return base;
    }

    let depth_a = model.symbol(pa.branch).depth;
    let depth_b = model.symbol(pb.branch).depth;
    depth_b.cmp(&depth_a)
}
