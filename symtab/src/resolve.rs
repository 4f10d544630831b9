//! Two-pass symbolic tag resolution (SPEC_FULL.md §4.5): the first pass
//! picks, for each Symbol, the highest-numbered patch set any of its
//! (eligible) Tags resolves to; the second classifies every Tag of that
//! Symbol as SPLIT/LATE/FUNKY/INVALID against the chosen patch set.
//!
//! This runs before the user-facing psid is assigned, so "highest" below
//! means the patch-set arena id (`PatchSetId`, assigned at aggregation time
//! in ascending global commit date order), not the display psid — the two
//! coincide for "chronologically latest patch set this symbol was tagged
//! at" either way; see DESIGN.md.

use model::{Model, TagFlags};
use patchset::PatchSet;

/// Resolves every Symbol's `ps` and classifies its Tags' flags in place.
/// `strict` mirrors the `-F` CLI flag (distinguishes FUNKY from INVALID).
/// Also records, on each resolved-to [`PatchSet`], which Symbols chose it
/// (`PatchSet::tags`), so the emitter can print the `Tag:` block.
pub fn resolve_symbols(model: &mut Model, patch_sets: &mut [PatchSet], strict: bool) {
    let symbol_ids: Vec<_> = model.symbol_ids().collect();
    for sym_id in symbol_ids.iter().copied() {
        resolve_one(model, patch_sets, sym_id);
    }
    for sym_id in symbol_ids {
        classify_one(model, patch_sets, sym_id, strict);
    }
}

fn resolve_one(model: &mut Model, patch_sets: &mut [PatchSet], sym_id: model::SymbolId) {
    let tag_ids = model.symbol(sym_id).tags.clone();
    let mut chosen: Option<model::PatchSetId> = None;

    for tag_id in tag_ids {
        let rev_id = model.tag(tag_id).rev;

        if !model.revision(rev_id).present {
            log::warn!("tag references a revision never seen in the log body");
            continue;
        }

        let branch_kind = model.tag(tag_id).branch;
        let dead_init = {
            let rev_branch_add = model.revision(rev_id).branch_add;
            let mut dead_init = rev_branch_add || branch_kind.is_vendor();
            if branch_kind.is_branch() && !dead_init {
                if let Some(first) = branch_first_commit(model, tag_id) {
                    dead_init = model.revision(first).branch_add;
                }
            }
            dead_init
        };
        model.tag_mut(tag_id).dead_init = dead_init;

        if dead_init {
            continue;
        }

        let effective_rev = model.revision(rev_id).vendor_shadow.unwrap_or(rev_id);
        if let Some(ps_id) = model.revision(effective_rev).ps {
            chosen = Some(match chosen {
                Some(best) if best.index() >= ps_id.index() => best,
                _ => ps_id,
            });
        }
    }

    model.symbol_mut(sym_id).ps = chosen;
    if let Some(ps_id) = chosen {
        // patch_sets is indexed by PatchSetId; record this resolution on
        // the Symbol's patch-set list for the emitter/"-A" diagnostics,
        // and back-reference it from the patch set itself for the
        // emitter's `Tag:` block.
        if !model.symbol(sym_id).patch_sets.contains(&ps_id) {
            model.symbol_mut(sym_id).patch_sets.push(ps_id);
        }
        let ps = &mut patch_sets[ps_id.index()];
        if !ps.tags.contains(&sym_id) {
            ps.tags.push(sym_id);
        }
    }
}

fn classify_one(model: &mut Model, patch_sets: &[PatchSet], sym_id: model::SymbolId, strict: bool) {
    let chosen_ps = match model.symbol(sym_id).ps {
        Some(id) => id,
        None => return,
    };
    let chosen = &patch_sets[chosen_ps.index()];

    let tag_ids = model.symbol(sym_id).tags.clone();
    let mut accum = TagFlags::empty();

    for tag_id in tag_ids {
        let rev_id = model.tag(tag_id).rev;
        let rev = model.revision(rev_id).rev.clone();
        let file_id = model.revision(rev_id).file;

        let mut flags = TagFlags::empty();

        let member = chosen.members.iter().find(|&&(f, _)| f == file_id);
        if let Some(&(_, member_rev)) = member {
            let member_rev_str = model.revision(member_rev).rev.clone();
            if !rev.affects(&member_rev_str) && !member_rev_str.affects(&rev) {
                flags.insert(TagFlags::SPLIT);
            }
        }

        let branch_kind = model.tag(tag_id).branch;
        if branch_kind.is_branch() {
            if let Some(first) = branch_first_commit(model, tag_id) {
                if let Some(first_ps) = model.revision(first).ps {
                    if first_ps.index() <= chosen_ps.index() {
                        flags.insert(TagFlags::LATE);
                    }
                }
            }
        }

        if let Some(later) = later_revision_before(model, rev_id, chosen.date) {
            let later_rev = model.revision(later).rev.clone();
            if strict && !rev.affects(&later_rev) {
                flags.insert(TagFlags::INVALID);
            } else {
                flags.insert(TagFlags::FUNKY);
            }
        }

        model.tag_mut(tag_id).flags = flags;
        accum.insert(flags);
    }

    model.symbol_mut(sym_id).flags = accum;
}

/// The earliest revision actually committed on the branch `tag_id` names
/// (as opposed to the parent revision the branch forks from).
fn branch_first_commit(model: &Model, tag_id: model::TagId) -> Option<model::RevisionId> {
    let parent = model.tag(tag_id).rev;
    model
        .revision(parent)
        .branch_children
        .iter()
        .copied()
        .filter(|&c| model.revision(c).branch == Some(tag_id))
        .min_by(|&a, &b| model.revision(a).rev.cmp(&model.revision(b).rev))
}

/// Walks forward along the tagged revision's own branch chain (via
/// `prev_rev`, which points to the chronologically older revision;
/// "forward" here means toward more recent revisions, i.e. via the
/// revision whose `next_rev` is `rev_id`) looking for a later revision
/// that lands at or before `cutoff`.
fn later_revision_before(model: &Model, rev_id: model::RevisionId, cutoff: std::time::SystemTime) -> Option<model::RevisionId> {
    let mut cur = rev_id;
    while let Some(next) = model.revision(cur).next_rev {
        let date = model.revision(next).date;
        if date > cutoff {
            break;
        }
        if date >= model.revision(rev_id).date {
            return Some(next);
        }
        cur = next;
    }
    None
}
