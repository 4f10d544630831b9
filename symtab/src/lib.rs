//! Resolves symbolic tags against the patch-set graph, classifies
//! anomalous tags, and computes the final total emit order (SPEC_FULL.md
//! §4.5/§4.6).

mod resolve;
mod restrict;
mod sort;

pub use resolve::resolve_symbols;
pub use restrict::{apply_funk_overrides, record_ancestor_hints, resolve_restrict, RestrictBounds, CVSPS_EPOCH};
pub use sort::{assign_psids, total_order};
