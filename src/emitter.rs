//! The filtered emitter (SPEC_FULL.md §4.7): evaluates the full filter
//! chain over the final emit order, then prints each surviving patch set
//! as a summary block, optionally redirected per-patchset under `-p`
//! (§4.7.1) and optionally followed by a diff from the external
//! collaborator (§6.2), finishing with the collisions report (§4.7.2).

use std::{ffi::OsString, fs, io::Write, path::PathBuf, time::SystemTime};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use model::{Model, PatchSetId, PatchSetRange};
use patchset::{FunkFactor, PatchSet};
use regex::Regex;
use symtab::RestrictBounds;

use crate::{branch::BranchFilter, error::Error};

const DEFAULT_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

pub struct Emitter<'a> {
    model: &'a Model,
    patch_sets: &'a [PatchSet],
    bounds: &'a RestrictBounds,
    branch_filter: BranchFilter,
    author: Option<String>,
    file_regex: Option<Regex>,
    log_regex: Option<Regex>,
    ranges: Vec<PatchSetRange>,
    date_min: Option<SystemTime>,
    date_max: Option<SystemTime>,
    date_format: String,
    patch_dir: Option<PathBuf>,
    show_diffs: bool,
    summary_first: bool,
    cvs_command: OsString,
    diff_opts: Option<String>,
    cvsroot: Option<OsString>,
    repository: PathBuf,
}

pub struct EmitterConfig<'a> {
    pub model: &'a Model,
    pub patch_sets: &'a [PatchSet],
    pub bounds: &'a RestrictBounds,
    pub options: &'a model::Options,
    pub cvs_command: OsString,
    pub repository: PathBuf,
}

impl<'a> Emitter<'a> {
    pub fn new(cfg: EmitterConfig<'a>) -> Result<Self, Error> {
        let options = cfg.options;

        let file_regex = options.file_regex.as_deref().and_then(|s| match Regex::new(s) {
            Ok(re) => Some(re),
            Err(err) => {
                log::warn!("malformed -f regex {:?}: {}; ignoring", s, err);
                None
            }
        });
        let log_regex = options.log_regex.as_deref().and_then(|s| match Regex::new(s) {
            Ok(re) => Some(re),
            Err(err) => {
                log::warn!("malformed -l regex {:?}: {}; ignoring", s, err);
                None
            }
        });

        let (date_min, date_max) = parse_date_bounds(&options.dates);

        Ok(Self {
            model: cfg.model,
            patch_sets: cfg.patch_sets,
            bounds: cfg.bounds,
            branch_filter: BranchFilter::new(cfg.bounds.branch),
            author: options.author.clone(),
            file_regex,
            log_regex,
            ranges: options.ranges.clone(),
            date_min,
            date_max,
            date_format: options.date_format.clone().unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()),
            patch_dir: options.patch_dir.clone(),
            show_diffs: options.show_diffs,
            summary_first: options.summary_first,
            cvs_command: cfg.cvs_command,
            diff_opts: options.diff_opts.clone(),
            cvsroot: options.cvsroot.clone(),
            repository: cfg.repository,
        })
    }

    /// Runs the whole filter-then-print pipeline over `order`, and
    /// reports `collisions` to stderr afterward.
    pub fn run(&self, order: &[PatchSetId], collisions: &[PatchSetId], out: &mut dyn Write) -> Result<(), Error> {
        let matched: Vec<PatchSetId> = order.iter().copied().filter(|&id| self.passes(self.ps(id))).collect();

        if self.summary_first && self.show_diffs {
            for &id in &matched {
                self.emit_one(id, out, false)?;
            }
            for &id in &matched {
                self.emit_one(id, out, true)?;
            }
        } else {
            for &id in &matched {
                self.emit_one(id, out, self.show_diffs)?;
            }
        }

        self.report_collisions(collisions);
        Ok(())
    }

    fn ps(&self, id: PatchSetId) -> &PatchSet {
        &self.patch_sets[id.index()]
    }

    /// Filter order per SPEC_FULL.md §4.7: any failure skips the patch
    /// set, evaluated in this exact sequence.
    fn passes(&self, ps: &PatchSet) -> bool {
        if ps.branch_add {
            return false;
        }

        let funk_override = matches!(ps.funk_factor, FunkFactor::ShowSome | FunkFactor::ShowAll);

        if !funk_override {
            if let Some(min) = self.bounds.ps_start {
                if ps.psid <= min {
                    return false;
                }
            }
            if let Some(max) = self.bounds.ps_end {
                if ps.psid > max {
                    return false;
                }
            }
        }

        if let Some(min) = self.date_min {
            if ps.date < min {
                return false;
            }
        }
        if let Some(max) = self.date_max {
            if ps.date > max {
                return false;
            }
        }

        if let Some(author) = &self.author {
            if ps.author.as_ref() != author.as_str() {
                return false;
            }
        }

        if let Some(re) = &self.log_regex {
            if !re.is_match(&ps.message) {
                return false;
            }
        }

        if let Some(re) = &self.file_regex {
            let any = ps
                .members
                .iter()
                .any(|&(file_id, _)| re.is_match(&self.model.file(file_id).path.to_string_lossy()));
            if !any {
                return false;
            }
        }

        if !self.branch_filter.contains(ps.branch) {
            return false;
        }

        if !self.ranges.is_empty() && !self.ranges.iter().any(|r| r.contains(ps.psid)) {
            return false;
        }

        true
    }

    fn emit_one(&self, id: PatchSetId, out: &mut dyn Write, diffs_only: bool) -> Result<(), Error> {
        let ps = self.ps(id);

        match &self.patch_dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|err| Error::PatchDir {
                    path: dir.display().to_string(),
                    err,
                })?;
                let path = dir.join(format!("{}.patch", ps.psid));
                let mut file = fs::File::create(&path).map_err(|err| Error::PatchFile {
                    path: path.display().to_string(),
                    err,
                })?;
                self.write_one(ps, &mut file, diffs_only)
            }
            None => self.write_one(ps, out, diffs_only),
        }
    }

    fn write_one(&self, ps: &PatchSet, out: &mut dyn Write, diffs_only: bool) -> Result<(), Error> {
        if diffs_only {
            if self.show_diffs {
                self.write_diffs(ps, out)?;
            }
            return Ok(());
        }

        writeln!(out, "---------------------")?;
        match funk_label(ps.funk_factor) {
            Some(label) => writeln!(out, "PatchSet {} {}", ps.psid, label)?,
            None => writeln!(out, "PatchSet {}", ps.psid)?,
        }
        writeln!(out, "Date: {}", format_date(ps.date, &self.date_format))?;
        writeln!(out, "Author: {}", ps.author)?;
        writeln!(out, "Branch: {}", self.branch_name(ps.branch))?;
        if let Some(vendor) = ps.vendor_shadowed {
            writeln!(out, "Vendor Merge: {}", self.ps(vendor).psid)?;
        }
        writeln!(out, "Log:")?;
        writeln!(out, "{}", ps.message)?;
        writeln!(out, "Members:")?;
        for &(file_id, rev_id) in &ps.members {
            let file = &self.model.file(file_id).path;
            let rev = &self.model.revision(rev_id).rev_str;
            let prev = match self.model.revision(rev_id).prev_rev {
                Some(prev_id) => self.model.revision(prev_id).rev_str.to_string(),
                None => "INITIAL".to_string(),
            };
            let dead = if self.model.revision(rev_id).dead { "(DEAD)" } else { "" };
            writeln!(out, "\t{}:{}->{}{}", file.display(), prev, rev, dead)?;
        }

        self.write_tags(ps, out)?;
        writeln!(out)?;

        if self.show_diffs && !self.summary_first {
            self.write_diffs(ps, out)?;
        }

        Ok(())
    }

    fn write_tags(&self, ps: &PatchSet, out: &mut dyn Write) -> Result<(), Error> {
        for &sym_id in &ps.tags {
            let sym = self.model.symbol(sym_id);
            let label = match tag_label(sym.flags) {
                Some(label) => label,
                None => continue,
            };
            writeln!(out, "Tag: {} {}", sym.name.as_deref().unwrap_or(""), label)?;
            for &tag_id in &sym.tags {
                let tag = self.model.tag(tag_id);
                if tag.dead_init {
                    continue;
                }
                let rev_id = tag.rev;
                let member_ps = match self.model.revision(rev_id).ps {
                    Some(id) => id,
                    None => continue,
                };
                let file = &self.model.file(self.model.revision(rev_id).file).path;
                let rev = &self.model.revision(rev_id).rev_str;
                let dead = if self.model.revision(rev_id).dead { "(DEAD)" } else { "" };
                writeln!(out, "\t{}:{}{}#{}", file.display(), rev, dead, self.ps(member_ps).psid)?;
            }
        }
        Ok(())
    }

    fn write_diffs(&self, ps: &PatchSet, out: &mut dyn Write) -> Result<(), Error> {
        for &(file_id, rev_id) in &ps.members {
            let file = self.model.file(file_id).path.to_string_lossy().to_string();
            let rev = self.model.revision(rev_id).rev_str.to_string();
            let prev = self
                .model
                .revision(rev_id)
                .prev_rev
                .map(|p| self.model.revision(p).rev_str.to_string());

            diffproc::run_diff(
                &self.cvs_command,
                self.diff_opts.as_deref(),
                self.cvsroot.as_deref(),
                &self.repository,
                &file,
                prev.as_deref(),
                &rev,
                out,
            )?;
        }
        Ok(())
    }

    fn branch_name(&self, branch: model::SymbolId) -> String {
        self.model.symbol(branch).name.as_deref().unwrap_or("").to_string()
    }

    fn report_collisions(&self, collisions: &[PatchSetId]) {
        for &id in collisions {
            eprintln!("PatchSet {} has collisions", self.ps(id).psid);
        }
    }
}

fn funk_label(funk: FunkFactor) -> Option<&'static str> {
    match funk {
        FunkFactor::None => None,
        FunkFactor::ShowSome => Some("**SHOW_SOME**"),
        FunkFactor::ShowAll => Some("**SHOW_ALL**"),
        FunkFactor::HideSome => Some("**HIDE_SOME**"),
        FunkFactor::HideAll => Some("**HIDE_ALL**"),
    }
}

fn tag_label(flags: model::TagFlags) -> Option<&'static str> {
    if flags.contains(model::TagFlags::SPLIT) {
        Some("**SPLIT**")
    } else if flags.contains(model::TagFlags::INVALID) {
        Some("**INVALID**")
    } else if flags.contains(model::TagFlags::FUNKY) {
        Some("**FUNKY**")
    } else if flags.contains(model::TagFlags::LATE) {
        Some("**LATE**")
    } else {
        None
    }
}

fn format_date(date: SystemTime, fmt: &str) -> String {
    let dt: DateTime<Utc> = date.into();
    dt.format(fmt).to_string()
}

/// `-d` accepts up to two bounds; each is parsed permissively against a
/// handful of common date shapes, matching the producer's own
/// `date:`-line format plus a bare calendar date for operator
/// convenience. An unparsable bound is warned about and ignored rather
/// than aborting the run.
fn parse_date_bounds(dates: &[String]) -> (Option<SystemTime>, Option<SystemTime>) {
    let mut parsed: Vec<SystemTime> = dates.iter().filter_map(|s| parse_one_date(s)).collect();
    let min = if !parsed.is_empty() { Some(parsed.remove(0)) } else { None };
    let max = if !parsed.is_empty() { Some(parsed.remove(0)) } else { None };
    (min, max)
}

fn parse_one_date(s: &str) -> Option<SystemTime> {
    NaiveDateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(|d| d.and_hms(0, 0, 0)))
        .or_else(|| NaiveDate::parse_from_str(s, "%Y/%m/%d").ok().map(|d| d.and_hms(0, 0, 0)))
        .map(|naive| DateTime::<Utc>::from_utc(naive, Utc).into())
        .or_else(|| {
            log::warn!("couldn't parse -d date {:?}; ignoring", s);
            None
        })
}
