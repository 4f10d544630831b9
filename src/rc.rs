//! The `<config-dir>/cvspsrc` loader (SPEC_FULL.md §6): one option per
//! line, first whitespace-separated token the flag, the rest its
//! argument. Rather than parse the rc file into an `Opt` of its own and
//! merge field-by-field, its lines are tokenized into `argv`-shaped
//! strings and concatenated ahead of the real command line, then the
//! whole thing is parsed once through [`Opt::from_iter`] — clap's own
//! "last wins for a single-valued flag, values accumulate for a `Vec`
//! flag" behavior is exactly the precedence SPEC_FULL.md §3.1 asks for.

use std::{fs, path::PathBuf};

use structopt::StructOpt;

use crate::{error::Error, opt::Opt};

pub const RC_FILE_NAME: &str = "cvspsrc";

/// Parses the process's real `argv` (including `argv[0]`), honoring
/// `--norc` wherever it appears (command line or rc file) per §6.
pub fn parse_with_rc(config_dir: Option<PathBuf>, argv: Vec<String>) -> Result<Opt, Error> {
    if argv.iter().any(|a| a == "--norc") {
        return Ok(Opt::from_iter_safe(argv)?);
    }

    let rc_args = match config_dir {
        Some(dir) => load_rc_args(&dir.join(RC_FILE_NAME))?,
        None => Vec::new(),
    };

    if rc_args.iter().any(|a| a == "--norc") {
        log::info!("NOTICE: --norc found in rc file; ignoring its other contents");
        return Ok(Opt::from_iter_safe(argv)?);
    }

    let mut combined = Vec::with_capacity(argv.len() + rc_args.len());
    combined.push(argv[0].clone());
    combined.extend(rc_args);
    combined.extend(argv.into_iter().skip(1));

    Ok(Opt::from_iter_safe(combined)?)
}

/// Reads and tokenizes the rc file's lines, or returns an empty list if
/// the file simply doesn't exist (having no rc file is not an error).
fn load_rc_args(path: &std::path::Path) -> Result<Vec<String>, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(Error::RcFile {
                path: path.display().to_string(),
                err,
            })
        }
    };

    let mut args = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let flag = parts.next().unwrap_or("");
        args.push(flag.to_string());
        if let Some(rest) = parts.next() {
            let rest = rest.trim();
            if !rest.is_empty() {
                args.push(rest.to_string());
            }
        }
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rc_file_missing_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let opt = parse_with_rc(Some(dir.path().to_path_buf()), vec!["cvsps".to_string()]).unwrap();
        assert_eq!(opt.fuzz, std::time::Duration::from_secs(300));
    }

    #[test]
    fn test_rc_file_values_merge_with_cli_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join(RC_FILE_NAME)).unwrap();
        writeln!(f, "-z 60").unwrap();
        writeln!(f, "-v").unwrap();
        drop(f);

        let opt = parse_with_rc(
            Some(dir.path().to_path_buf()),
            vec!["cvsps".to_string(), "-z".to_string(), "90".to_string()],
        )
        .unwrap();

        // command line wins on the single-valued -z ...
        assert_eq!(opt.fuzz, std::time::Duration::from_secs(90));
        // ... while a rc-only flag still takes effect.
        assert!(opt.verbose);
    }

    #[test]
    fn test_norc_in_rc_file_disables_its_own_contents() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join(RC_FILE_NAME)).unwrap();
        writeln!(f, "-z 60").unwrap();
        writeln!(f, "--norc").unwrap();
        drop(f);

        let opt = parse_with_rc(Some(dir.path().to_path_buf()), vec!["cvsps".to_string()]).unwrap();
        assert_eq!(opt.fuzz, std::time::Duration::from_secs(300));
    }

    #[test]
    fn test_norc_on_command_line_skips_rc_entirely() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join(RC_FILE_NAME)).unwrap();
        writeln!(f, "-z 60").unwrap();
        drop(f);

        let opt = parse_with_rc(
            Some(dir.path().to_path_buf()),
            vec!["cvsps".to_string(), "--norc".to_string()],
        )
        .unwrap();
        assert_eq!(opt.fuzz, std::time::Duration::from_secs(300));
    }

    #[test]
    fn test_d_accumulates_up_to_two_values() {
        let opt = Opt::from_iter_safe(vec![
            "cvsps".to_string(),
            "-d".to_string(),
            "2020-01-01".to_string(),
            "-d".to_string(),
            "2020-02-01".to_string(),
        ])
        .unwrap();
        assert_eq!(opt.dates, vec!["2020-01-01", "2020-02-01"]);
    }
}
