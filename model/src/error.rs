use thiserror::Error;

/// Graph-consistency errors: the revision/tag/symbol structure the parser
/// handed us doesn't satisfy an invariant the rest of the pipeline
/// depends on. These are always local to one file or one symbol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("revision {0} not found on file {1}")]
    UnknownRevision(String, String),

    #[error("no branch tag found for parent of revision {0} on file {1}")]
    UnresolvedBranch(String, String),

    #[error("invalid revision string {0:?}: {1}")]
    InvalidRevision(String, revstr::Error),

    #[error("symbol {0:?} already defined with a conflicting kind on file {1}")]
    ConflictingSymbol(String, String),
}
