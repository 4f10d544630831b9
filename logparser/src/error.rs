use thiserror::Error;

/// Failures while walking a `cvs log`/`rlog` stream into a [`model::Context`].
///
/// Every variant but [`Error::Io`] carries the line number the parser was
/// at, mirroring `load_from_cvs`'s use of `debug(DEBUG_APPERROR, ...)`
/// followed by `exit(1)` on any of the same conditions.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: 'symbolic names:' not found in log output (try running without -n/-norc assumptions)")]
    MissingSymbolicNames { line: usize },

    #[error("line {line}: log file parsing error, parser ended in state {state}")]
    UnexpectedEof { line: usize, state: &'static str },

    #[error("line {line}: malformed revision line {text:?}")]
    MalformedRevision { line: usize, text: String },

    #[error("line {line}: malformed date/author/state line {text:?}")]
    MalformedDateAuthorState { line: usize, text: String },

    #[error("line {line}: revision {rev} is marked dead with leaf 1 but its log message doesn't look like a branch add: {text:?}")]
    NotABranchAdd {
        line: usize,
        rev: String,
        text: String,
    },

    #[error("line {line}: malformed symbolic name entry {text:?}")]
    MalformedSymbol { line: usize, text: String },

    #[error(transparent)]
    Model(#[from] model::Error),

    #[error(transparent)]
    Revision(#[from] revstr::Error),
}
