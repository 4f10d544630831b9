use thiserror::Error;

/// Top-level error composing every component crate's own error type plus
/// the operator/configuration failures that only make sense at the CLI
/// boundary (SPEC_FULL.md §7). `main` maps any `Err` here to exit code 1;
/// everything that can instead be downgraded to a warning already was,
/// inside the component that detected it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("couldn't read rc file {path}: {err}")]
    RcFile { path: String, err: std::io::Error },

    #[error("couldn't open test log {path}: {err}")]
    TestLog { path: String, err: std::io::Error },

    #[error("couldn't create patch set directory {path}: {err}")]
    PatchDir { path: String, err: std::io::Error },

    #[error("couldn't write patch file {path}: {err}")]
    PatchFile { path: String, err: std::io::Error },

    #[error(transparent)]
    Parse(#[from] logparser::Error),

    #[error(transparent)]
    Model(#[from] model::Error),

    #[error(transparent)]
    Process(#[from] diffproc::Error),

    #[error(transparent)]
    Args(#[from] structopt::clap::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
