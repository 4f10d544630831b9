//! Turns a `cvs log`/`rlog` text stream into a [`model::Context`]'s
//! File/Revision/Tag/Symbol graph (SPEC_FULL.md §4.1/§4.2). Patch-set
//! aggregation, symbol resolution, and total ordering are later phases
//! owned by other crates.

mod error;
mod parser;
mod path;
mod reader;
mod sym;

pub use error::Error;
pub use parser::{ParseStats, Parser};
pub use path::PathResolver;
pub use reader::{str_source, LineSource};
pub use sym::{classify, Classified};
