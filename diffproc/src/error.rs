use std::os::unix::process::ExitStatusExt;

use thiserror::Error;

/// Failures from the two external-process collaborators (SPEC_FULL.md
/// §6.1/§6.2): the log producer (`cvs log`/`rlog`) and the diff renderer
/// (`cvs rdiff`/`cvs diff`). Mirrors `internal/process`'s `Error` shape,
/// made synchronous.
#[derive(Debug, Error)]
pub enum Error {
    #[error("error spawning {command}: {err}")]
    Spawn { command: String, err: std::io::Error },

    #[error("{command} exited with a non-zero status: {code}")]
    ExitStatus { command: String, code: i32 },

    #[error("{command} exited due to signal {signal:?}")]
    ExitSignal { command: String, signal: Option<i32> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("the direct protocol client is not built in; pass --no-cvs-direct or omit --cvs-direct")]
    CvsDirectUnsupported,
}

impl Error {
    pub(crate) fn from_status(command: &str, status: std::process::ExitStatus) -> Option<Self> {
        match status.code() {
            Some(0) => None,
            Some(code) => Some(Error::ExitStatus {
                command: command.to_string(),
                code,
            }),
            None => Some(Error::ExitSignal {
                command: command.to_string(),
                signal: status.signal(),
            }),
        }
    }
}
