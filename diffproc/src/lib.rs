//! Synchronous external-process collaborators for the two boundaries
//! SPEC_FULL.md keeps out of the core: the log producer (`cvs log`/
//! `rlog`) and the diff renderer (`cvs rdiff`/`cvs diff`). Grounded on
//! `internal/process`'s `Process`/`Worker` shape, retargeted from driving
//! `git fast-import`'s stdin to spawning `cvs` and made synchronous —
//! nothing downstream of this crate needs to overlap I/O with compute.

mod diff;
mod error;
mod log_producer;

pub use diff::run_diff;
pub use error::Error;
pub use log_producer::LogProducer;
