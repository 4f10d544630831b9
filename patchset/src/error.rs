use thiserror::Error;

/// Reserved for failures surfaced once the aggregator is driven from a
/// fallible context (e.g. a corrupt persisted graph); the in-memory
/// aggregation pass itself cannot fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error("patch set {0} not found")]
    NotFound(usize),
}
