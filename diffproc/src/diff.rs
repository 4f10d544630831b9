//! Invokes the external diff renderer per patch-set member (SPEC_FULL.md
//! §6.2) and streams its stdout directly into the emitter's current
//! output sink. `cvs diff`/`cvs rdiff` exiting `1` means "files differ",
//! which is success here, not failure (SPEC_FULL.md §7).

use std::{
    ffi::OsStr,
    io::{self, Write},
    path::Path,
    process::{Command, Stdio},
};

use crate::error::Error;

/// Runs the diff command for one member (`prev` is `None` for a file's
/// first revision, rendered as `INITIAL` in the emitter's summary line)
/// and copies its stdout into `sink`.
pub fn run_diff(
    cvs_command: &OsStr,
    diff_opts: Option<&str>,
    cvsroot: Option<&OsStr>,
    repository: &Path,
    file: &str,
    prev: Option<&str>,
    rev: &str,
    sink: &mut dyn Write,
) -> Result<(), Error> {
    let mut cmd = Command::new(cvs_command);
    if let Some(root) = cvsroot {
        cmd.arg("-d").arg(root);
    }

    match diff_opts {
        None => {
            cmd.arg("rdiff").arg("-u");
            if let Some(prev) = prev {
                cmd.arg(format!("-r{}", prev));
            }
            cmd.arg(format!("-r{}", rev));
            cmd.arg(repository.join(file));
        }
        Some(opts) => {
            cmd.arg("diff");
            for opt in opts.split_whitespace() {
                cmd.arg(opt);
            }
            if let Some(prev) = prev {
                cmd.arg(format!("-r{}", prev));
            }
            cmd.arg(format!("-r{}", rev));
            cmd.arg(file);
        }
    }

    let command = format!("{:?}", cmd);

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|err| Error::Spawn {
            command: command.clone(),
            err,
        })?;

    let mut stdout = child.stdout.take().expect("stdout was piped");
    io::copy(&mut stdout, sink)?;
    drop(stdout);

    let status = child.wait()?;
    match status.code() {
        Some(0) | Some(1) => Ok(()),
        _ => match Error::from_status(&command, status) {
            Some(err) => Err(err),
            None => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_one_is_files_differ_not_failure() {
        let mut sink = Vec::new();
        // `false` ignores every argument and exits 1; run_diff must treat
        // that as success per SPEC_FULL.md §7.
        let result = run_diff(
            OsStr::new("false"),
            None,
            None,
            Path::new("/tmp"),
            "foo.c",
            Some("1.1"),
            "1.2",
            &mut sink,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let mut sink = Vec::new();
        let result = run_diff(
            OsStr::new("definitely-not-a-real-cvs-binary"),
            None,
            None,
            Path::new("/tmp"),
            "foo.c",
            None,
            "1.1",
            &mut sink,
        );
        assert!(matches!(result, Err(Error::Spawn { .. })));
    }
}
