//! The CLI surface of §6, reproduced flag-for-flag. An `Opt` is parsed
//! twice in the general case — once from the rc file's tokenized lines,
//! once (merged) from the real command line — through the one parser, so
//! that clap's own single-valued/`Vec`-valued merge rules do the "command
//! line wins, `-d`/`-r` accumulate" work rather than hand-rolled field
//! merging (see `rc.rs`).

use std::{ffi::OsString, path::PathBuf, time::Duration};

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "cvsps", about = "reconstructs patch sets from a CVS log")]
pub struct Opt {
    #[structopt(
        short = "z",
        default_value = "300s",
        parse(try_from_str = parse_duration::parse::parse),
        help = "fuzz factor: maximum time between same-author/same-message commits before they're considered different patch sets"
    )]
    pub fuzz: Duration,

    #[structopt(short = "g", help = "invoke the diff collaborator for each member")]
    pub diff: bool,

    #[structopt(
        short = "s",
        help = "comma-separated patch set id ranges, e.g. 10-20,35",
        number_of_values = 1
    )]
    pub ranges: Vec<String>,

    #[structopt(short = "a", help = "only patch sets by this author")]
    pub author: Option<String>,

    #[structopt(short = "f", help = "only patch sets with a member matching this filename regex")]
    pub file_regex: Option<String>,

    #[structopt(
        short = "d",
        help = "date bound; given once a lower bound, twice a range",
        max_values = 2,
        number_of_values = 1
    )]
    pub dates: Vec<String>,

    #[structopt(short = "b", help = "only patch sets on this branch", number_of_values = 1)]
    pub branch: Vec<String>,

    #[structopt(short = "l", help = "only patch sets whose log message matches this regex")]
    pub log_regex: Option<String>,

    #[structopt(
        short = "r",
        help = "restrict tag; given once a start bound, twice start/end (accepts #CVSPS_EPOCH)",
        max_values = 2,
        number_of_values = 1
    )]
    pub restrict_tags: Vec<String>,

    #[structopt(short = "p", help = "write each matched patch set to <dir>/<psid>.patch")]
    pub patch_dir: Option<PathBuf>,

    #[structopt(short = "v", help = "verbose diagnostics")]
    pub verbose: bool,

    #[structopt(short = "t", help = "report aggregation statistics")]
    pub statistics: bool,

    #[structopt(long = "norc", help = "don't read the rc file")]
    pub norc: bool,

    #[structopt(long = "summary-first", help = "print every summary before any diff")]
    pub summary_first: bool,

    #[structopt(long = "test-log", help = "read the log from this file instead of spawning cvs")]
    pub test_log: Option<PathBuf>,

    #[structopt(long = "no-rlog", help = "use 'cvs log' instead of 'cvs rlog'")]
    pub no_rlog: bool,

    #[structopt(long = "diff-opts", help = "use 'cvs diff <opts>' instead of 'cvs rdiff -u'")]
    pub diff_opts: Option<String>,

    #[structopt(long = "cvs-direct", help = "use the direct protocol client (not built in)")]
    pub cvs_direct: bool,

    #[structopt(long = "no-cvs-direct")]
    pub no_cvs_direct: bool,

    #[structopt(long = "debuglvl", help = "trace-level diagnostic mask", default_value = "0")]
    pub debug_level: u32,

    #[structopt(short = "Z", help = "compression level passed to cvs (0-9)")]
    pub compress: Option<u8>,

    #[structopt(long = "root", help = "CVSROOT, if not the repository's own")]
    pub cvsroot: Option<OsString>,

    #[structopt(short = "q", help = "suppress informational notices")]
    pub quiet: bool,

    #[structopt(short = "F", help = "distinguish FUNKY tags from INVALID ones")]
    pub strict_tag_check: bool,

    #[structopt(short = "U", help = "unify distinct files' unnamed branches sharing a key")]
    pub unify_unnamed: bool,

    #[structopt(short = "D", help = "strftime format for the Date: line")]
    pub date_format: Option<String>,

    #[structopt(help = "repository module/subdirectory, if not the CVSROOT itself")]
    pub repository: Option<PathBuf>,
}

impl Opt {
    /// Folds a parsed `Opt` into [`model::Options`]. Called once, on the
    /// already rc-merged `Opt` (see `rc.rs`), so there is no further
    /// precedence logic here beyond what clap already resolved.
    pub fn into_options(self) -> model::Options {
        model::Options {
            fuzz: self.fuzz,
            show_diffs: self.diff,
            ranges: self.ranges.iter().flat_map(|s| parse_ranges(s)).collect(),
            author: self.author,
            file_regex: self.file_regex,
            dates: self.dates,
            branch: self.branch,
            log_regex: self.log_regex,
            restrict_tags: self.restrict_tags,
            patch_dir: self.patch_dir,
            verbose: self.verbose,
            statistics: self.statistics,
            no_rc: self.norc,
            summary_first: self.summary_first,
            test_log: self.test_log,
            no_rlog: self.no_rlog,
            diff_opts: self.diff_opts,
            cvs_direct: self.cvs_direct && !self.no_cvs_direct,
            debug_level: self.debug_level,
            compress: self.compress,
            cvsroot: self.cvsroot,
            quiet: self.quiet,
            strict_tag_check: self.strict_tag_check,
            // Not exposed as its own CLI flag (SPEC_FULL.md §4.5.1 treats
            // ancestor-branch tracking as an always-on diagnostic aid, not
            // an `-A`-style opt-in); always recorded since it never feeds
            // the resolver, comparator, or sorter.
            ancestor_hints: true,
            unify_unnamed: self.unify_unnamed,
            date_format: self.date_format,
            repository: self.repository,
        }
    }
}

/// Splits one `-s` value on commas into `min-max` pairs. A bound with no
/// dash is treated as `min==max`; a malformed entry is skipped with a
/// warning rather than aborting the whole run (SPEC_FULL.md §8: "a range
/// with min > max emits nothing", not "the program refuses to start").
fn parse_ranges(s: &str) -> Vec<model::PatchSetRange> {
    s.split(',')
        .filter(|part| !part.is_empty())
        .filter_map(|part| match part.split_once('-') {
            Some((min, max)) => match (min.trim().parse(), max.trim().parse()) {
                (Ok(min), Ok(max)) => Some(model::PatchSetRange { min, max }),
                _ => {
                    log::warn!("malformed -s range {:?}; skipping", part);
                    None
                }
            },
            None => match part.trim().parse() {
                Ok(n) => Some(model::PatchSetRange { min: n, max: n }),
                Err(_) => {
                    log::warn!("malformed -s range {:?}; skipping", part);
                    None
                }
            },
        })
        .collect()
}
