use std::{ffi::OsString, path::PathBuf, time::Duration};

use crate::model::Model;

/// A closed `[min,max]` interval of patch-set ids, as accepted by `-s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSetRange {
    pub min: i64,
    pub max: i64,
}

impl PatchSetRange {
    pub fn contains(&self, psid: i64) -> bool {
        psid >= self.min && psid <= self.max
    }
}

/// The merged result of rc-file options followed by command-line
/// options. Constructed once per invocation by the CLI layer and never
/// mutated again.
#[derive(Debug, Clone)]
pub struct Options {
    pub fuzz: Duration,
    pub show_diffs: bool,
    pub ranges: Vec<PatchSetRange>,
    pub author: Option<String>,
    pub file_regex: Option<String>,
    /// Lower (and, if given twice, upper) date bound for `-d`.
    pub dates: Vec<String>,
    pub branch: Vec<String>,
    pub log_regex: Option<String>,
    /// Start (and, if given twice, end) tag bounds for `-r`.
    pub restrict_tags: Vec<String>,
    pub patch_dir: Option<PathBuf>,
    pub verbose: bool,
    pub statistics: bool,
    pub no_rc: bool,
    pub summary_first: bool,
    pub test_log: Option<PathBuf>,
    pub no_rlog: bool,
    pub diff_opts: Option<String>,
    pub cvs_direct: bool,
    pub debug_level: u32,
    pub compress: Option<u8>,
    pub cvsroot: Option<OsString>,
    pub quiet: bool,
    pub strict_tag_check: bool,
    pub ancestor_hints: bool,
    /// `-U`: unify two distinct files' unnamed branches that otherwise
    /// land in the same patch-set equivalence class into one Symbol.
    pub unify_unnamed: bool,
    pub date_format: Option<String>,
    pub repository: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            fuzz: Duration::from_secs(300),
            show_diffs: false,
            ranges: Vec::new(),
            author: None,
            file_regex: None,
            dates: Vec::new(),
            branch: Vec::new(),
            log_regex: None,
            restrict_tags: Vec::new(),
            patch_dir: None,
            verbose: false,
            statistics: false,
            no_rc: false,
            summary_first: false,
            test_log: None,
            no_rlog: false,
            diff_opts: None,
            cvs_direct: false,
            debug_level: 0,
            compress: None,
            cvsroot: None,
            quiet: false,
            strict_tag_check: false,
            ancestor_hints: false,
            unify_unnamed: false,
            date_format: None,
            repository: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    pub warnings: u64,
    pub errors: u64,
}

impl Diagnostics {
    pub fn warn(&mut self) {
        self.warnings += 1;
    }

    pub fn error(&mut self) {
        self.errors += 1;
    }
}

/// Everything threaded through the phases of one invocation: the merged
/// options, the graph being built, and running diagnostic counters for
/// `-t` statistics reporting.
#[derive(Debug, Default)]
pub struct Context {
    pub options: Options,
    pub model: Model,
    pub diagnostics: Diagnostics,
}

impl Context {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            model: Model::new(),
            diagnostics: Diagnostics::default(),
        }
    }
}
