//! The File/Revision/Tag/Symbol graph and the ambient `Options`/`Context`
//! types threaded through every phase of patch-set reconstruction.

mod context;
mod error;
mod graph;
mod ids;
mod interner;
mod model;
mod types;

pub use context::{Context, Diagnostics, Options, PatchSetRange};
pub use error::Error;
pub use graph::{assign_pre_revision, resolve_branch, LinkOutcome};
pub use ids::{FileId, PatchSetId, RevisionId, SymbolId, TagId};
pub use interner::Interner;
pub use model::Model;
pub use types::{BranchKind, File, Revision, Symbol, Tag, TagFlags};
