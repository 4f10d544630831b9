//! `-r`/`-b` interaction (SPEC_FULL.md §4.5.1): turns one or two `-r <tag>`
//! options into a psid range, and reconciles an implied branch restriction
//! from the second `-r` against an explicit `-b`.

use model::{Model, SymbolId, TagFlags};
use patchset::{FunkFactor, PatchSet};

pub const CVSPS_EPOCH: &str = "#CVSPS_EPOCH";

#[derive(Debug, Clone, Default)]
pub struct RestrictBounds {
    pub ps_start: Option<i64>,
    pub ps_end: Option<i64>,
    pub branch: Option<SymbolId>,
    /// Whether the start/end `-r` tag's Symbol carries `FUNKY`/`INVALID`
    /// flags (SPEC_FULL.md §4.5), meaning the resolver isn't fully
    /// confident the boundary lands exactly where the tag claims.
    pub start_funky: bool,
    pub end_funky: bool,
}

/// `restrict_tags` is the `-r` values in the order given (one or two);
/// `explicit_branch` is the `-b` value, if any. `patch_sets` must already
/// have its psids assigned (see [`crate::assign_psids`]), since the `-r`
/// bounds are expressed in that user-facing psid space, not the patch-set
/// arena index.
pub fn resolve_restrict(
    model: &mut Model,
    patch_sets: &[PatchSet],
    restrict_tags: &[String],
    explicit_branch: Option<&str>,
) -> RestrictBounds {
    let mut bounds = RestrictBounds::default();

    if let Some(first) = restrict_tags.first() {
        bounds.ps_start = tag_ps(model, patch_sets, first);
        bounds.start_funky = is_funky(model, first);
    }

    if let Some(second) = restrict_tags.get(1) {
        bounds.ps_end = tag_ps(model, patch_sets, second);
        bounds.end_funky = is_funky(model, second);

        if explicit_branch.is_none() {
            if let Some(sym_id) = model.find_symbol(second) {
                log::info!("NOTICE: implicitly restricting to branch {} from second -r tag", second);
                bounds.branch = Some(sym_id);
            }
        }
    }

    if let Some(explicit) = explicit_branch {
        if let Some(sym_id) = model.find_symbol(explicit) {
            if let Some(implied) = bounds.branch {
                if implied != sym_id {
                    log::warn!(
                        "explicit -b {} conflicts with the branch implied by the second -r tag; -b wins",
                        explicit
                    );
                }
            }
            bounds.branch = Some(sym_id);
        }
    }

    bounds
}

fn tag_ps(model: &Model, patch_sets: &[PatchSet], tag: &str) -> Option<i64> {
    if tag == CVSPS_EPOCH {
        return Some(i64::MIN);
    }
    model
        .find_symbol(tag)
        .and_then(|sym_id| model.symbol(sym_id).ps)
        .map(|ps_id| patch_sets[ps_id.index()].psid)
}

fn is_funky(model: &Model, tag: &str) -> bool {
    if tag == CVSPS_EPOCH {
        return false;
    }
    model
        .find_symbol(tag)
        .map(|sym_id| {
            let flags = model.symbol(sym_id).flags;
            flags.contains(TagFlags::FUNKY) || flags.contains(TagFlags::INVALID)
        })
        .unwrap_or(false)
}

/// Marks the patch set immediately outside a funky/invalid restrict
/// boundary as [`FunkFactor::ShowSome`], so the emitter includes it
/// despite falling outside the nominal `-r` psid bounds (SPEC_FULL.md
/// §4.7's "funk_factor overrides -r bounds" filter). A FUNKY/INVALID
/// boundary tag means the resolver isn't fully confident the cut lands
/// exactly where the tag claims, so the adjacent patch set is surfaced
/// rather than silently dropped.
///
/// `HideSome`/`HideAll` are not assigned by this implementation: the
/// historical trigger conditions for them are not specified precisely
/// enough in the distilled design to ground confidently (see DESIGN.md);
/// the variants are kept on [`FunkFactor`] for fidelity but unused here.
pub fn apply_funk_overrides(patch_sets: &mut [PatchSet], bounds: &RestrictBounds) {
    if bounds.start_funky {
        if let Some(start) = bounds.ps_start {
            if let Some(ps) = patch_sets
                .iter_mut()
                .filter(|p| p.psid >= 0 && p.psid < start)
                .max_by_key(|p| p.psid)
            {
                ps.funk_factor = FunkFactor::ShowSome;
            }
        }
    }
    if bounds.end_funky {
        if let Some(end) = bounds.ps_end {
            if let Some(ps) = patch_sets
                .iter_mut()
                .filter(|p| p.psid >= 0 && p.psid > end)
                .min_by_key(|p| p.psid)
            {
                ps.funk_factor = FunkFactor::ShowSome;
            }
        }
    }
}

/// Best-effort `-A`-equivalent ancestry diagnostic (SPEC_FULL.md §4.5.1):
/// for the first patch set assigned on each branch, records the deepest
/// branch its predecessor revisions are actually committed on.
pub fn record_ancestor_hints(model: &mut Model) {
    let symbol_ids: Vec<_> = model.symbol_ids().collect();
    for sym_id in symbol_ids {
        if model.symbol(sym_id).patch_sets.is_empty() {
            continue;
        }
        let mut deepest: Option<(u16, std::sync::Arc<str>)> = None;
        for &tag_id in model.symbol(sym_id).tags.clone().iter() {
            let parent = model.tag(tag_id).rev;
            if let Some(prev) = model.revision(parent).prev_rev {
                if let Some(branch_tag) = model.revision(prev).branch {
                    let branch_sym = model.tag(branch_tag).sym;
                    let depth = model.symbol(branch_sym).depth;
                    if let Some(name) = model.symbol(branch_sym).name.clone() {
                        if deepest.as_ref().map_or(true, |(d, _)| depth > *d) {
                            deepest = Some((depth, name));
                        }
                    }
                }
            }
        }
        if let Some((_, name)) = deepest {
            model.symbol_mut(sym_id).ancestor_branch = Some(name);
        }
    }
}
