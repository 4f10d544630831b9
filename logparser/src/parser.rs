//! The line-driven state machine described in SPEC_FULL.md §4.1, grounded
//! on `examples/original_source/cvsps.c`'s `load_from_cvs` (state
//! transitions) and `parse_sym` (symbolic-names parsing). Builds the
//! File/Revision/Tag/Symbol graph in a [`model::Context`]; patch-set
//! aggregation is a separate later phase owned by the `patchset` crate.

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use model::{BranchKind, Context, FileId, RevisionId};
use regex::Regex;

use crate::{error::Error, path::PathResolver, reader::LineSource, sym};

const REVISION_SEPARATOR: &str = "----------------------------";
const FILE_SEPARATOR: &str =
    "=============================================================================";

lazy_static! {
    static ref DATE_AUTHOR_STATE: Regex = Regex::new(
        r"^date:\s*([0-9/]+\s+[0-9:]+);\s*author:\s*([^;]+);\s*state:\s*([^;]+);"
    )
    .unwrap();
    static ref REVISION_LINE: Regex = Regex::new(r"^revision\s+(\S+)\s*$").unwrap();
    static ref BRANCHES_LINE: Regex = Regex::new(r"^branches:\s*(.*?);?\s*$").unwrap();
    static ref SYMBOL_LINE: Regex = Regex::new(r"^\s+([^:\s]+):\s*([0-9.]+)\s*$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectFile,
    ExpectWorkingFile,
    ExpectSymbols,
    InsideSymbols,
    ExpectStartLog,
    ExpectRevision,
    ExpectDateAuthorState,
    ExpectEndOfMessage,
}

impl State {
    fn code(&self) -> &'static str {
        match self {
            State::ExpectFile => "expect-file",
            State::ExpectWorkingFile => "expect-working-file",
            State::ExpectSymbols => "expect-symbols",
            State::InsideSymbols => "inside-symbols",
            State::ExpectStartLog => "expect-start-log",
            State::ExpectRevision => "expect-revision",
            State::ExpectDateAuthorState => "expect-date-author-state",
            State::ExpectEndOfMessage => "expect-end-of-message",
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ParseStats {
    pub files: usize,
    pub revisions: usize,
    pub warnings: usize,
}

/// Drives one `cvs log`/`rlog` stream into a [`model::Context`].
pub struct Parser {
    state: State,
    line_no: usize,
    path_resolver: PathResolver,
    stats: ParseStats,

    current_file: Option<FileId>,
    prev_seen: Option<RevisionId>,

    current_rev: Option<RevisionId>,
    current_author: String,
    current_cvs_state: String,
    current_date: Option<std::time::SystemTime>,
    message: String,
}

impl Parser {
    pub fn new(repository_path: impl Into<String>) -> Self {
        Self {
            state: State::ExpectFile,
            line_no: 0,
            path_resolver: PathResolver::new(repository_path),
            stats: ParseStats::default(),
            current_file: None,
            prev_seen: None,
            current_rev: None,
            current_author: String::new(),
            current_cvs_state: String::new(),
            current_date: None,
            message: String::new(),
        }
    }

    /// Parses `source` to completion, mutating `ctx.model`. Consumes the
    /// parser (one parser per stream, mirroring the historical
    /// single-pass `load_from_cvs`).
    pub fn parse<S: LineSource>(mut self, ctx: &mut Context, source: &mut S) -> Result<ParseStats, Error> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = source.read_line(&mut line)?;
            if n == 0 {
                return self.finish_eof();
            }
            self.line_no += 1;
            self.step(ctx, &line)?;
        }
    }

    fn finish_eof(self) -> Result<ParseStats, Error> {
        if self.state == State::ExpectFile {
            Ok(self.stats)
        } else if self.state == State::ExpectSymbols {
            Err(Error::MissingSymbolicNames { line: self.line_no })
        } else {
            Err(Error::UnexpectedEof {
                line: self.line_no,
                state: self.state.code(),
            })
        }
    }

    fn step(&mut self, ctx: &mut Context, raw_line: &str) -> Result<(), Error> {
        let line = raw_line.trim_end_matches(['\n', '\r']);

        match self.state {
            State::ExpectFile => {
                if let Some(path) = line.strip_prefix("RCS file: ") {
                    let path = path.trim_start();
                    match self.path_resolver.resolve(path) {
                        Some(resolved) => {
                            let file_id = ctx.model.get_or_create_file(&resolved);
                            self.current_file = Some(file_id);
                            self.prev_seen = None;
                            self.stats.files += 1;
                            self.state = State::ExpectWorkingFile;
                        }
                        None => {
                            ctx.diagnostics.warn();
                            self.stats.warnings += 1;
                            // stay in ExpectFile; the unresolvable file's
                            // remaining header lines will be skipped until
                            // the next RCS file: line or file separator.
                        }
                    }
                }
                // any other line (blank lines between files) is ignored
            }

            State::ExpectWorkingFile => {
                if line.starts_with("Working file: ") {
                    self.state = State::ExpectSymbols;
                }
            }

            State::ExpectSymbols => {
                if line.trim_end() == "symbolic names:" {
                    self.state = State::InsideSymbols;
                }
                // head:, branch:, locks:, access list: and anything else
                // is unrecognized revision metadata and skipped.
            }

            State::InsideSymbols => {
                if let Some(caps) = SYMBOL_LINE.captures(line) {
                    self.add_symbol(ctx, &caps[1], &caps[2])?;
                } else if let Some(rest) = line.trim_start().strip_prefix("total revisions: ") {
                    let _ = parse_revision_counts(rest);
                    self.state = State::ExpectStartLog;
                }
                // keyword substitution:, description: and other
                // unrecognized lines between the symbol block and
                // "total revisions:" are skipped.
            }

            State::ExpectStartLog => {
                if line == REVISION_SEPARATOR {
                    self.state = State::ExpectRevision;
                }
                // "description:" (and its body, if any) is skipped.
            }

            State::ExpectRevision => {
                if line == FILE_SEPARATOR {
                    self.finish_file(ctx);
                    self.state = State::ExpectFile;
                } else if let Some(caps) = REVISION_LINE.captures(line) {
                    let rev_str = caps[1].to_string();
                    self.begin_revision(ctx, &rev_str)?;
                    self.state = State::ExpectDateAuthorState;
                } else {
                    return Err(Error::MalformedRevision {
                        line: self.line_no,
                        text: line.to_string(),
                    });
                }
            }

            State::ExpectDateAuthorState => {
                let caps = DATE_AUTHOR_STATE
                    .captures(line)
                    .ok_or_else(|| Error::MalformedDateAuthorState {
                        line: self.line_no,
                        text: line.to_string(),
                    })?;
                let date = parse_cvs_date(&caps[1]).ok_or_else(|| Error::MalformedDateAuthorState {
                    line: self.line_no,
                    text: line.to_string(),
                })?;
                self.current_date = Some(date);
                self.current_author = caps[2].trim().to_string();
                self.current_cvs_state = caps[3].trim().to_string();
                self.message.clear();
                self.state = State::ExpectEndOfMessage;
            }

            State::ExpectEndOfMessage => {
                if line == REVISION_SEPARATOR {
                    self.finish_revision(ctx)?;
                    self.state = State::ExpectRevision;
                } else if line == FILE_SEPARATOR {
                    self.finish_revision(ctx)?;
                    self.finish_file(ctx);
                    self.state = State::ExpectFile;
                } else if let Some(caps) = BRANCHES_LINE.captures(line) {
                    self.record_branches(ctx, &caps[1]);
                } else if is_unknown_metadata(line) {
                    // skip
                } else {
                    if !self.message.is_empty() {
                        self.message.push('\n');
                    }
                    self.message.push_str(line);
                }
            }
        }

        Ok(())
    }

    fn add_symbol(&mut self, ctx: &mut Context, name: &str, rev_str: &str) -> Result<(), Error> {
        let rev = revstr::Rev::parse(rev_str)?;
        let classified = sym::classify(&rev);

        let file_id = self.current_file.ok_or_else(|| Error::MalformedSymbol {
            line: self.line_no,
            text: format!("{}: {}", name, rev_str),
        })?;

        let rev_id = ctx
            .model
            .get_or_create_revision(file_id, &classified.rev.to_string(), std::time::SystemTime::UNIX_EPOCH)?;

        ctx.model
            .add_tag(file_id, Some(name), rev_id, classified.branch, classified.depth);
        Ok(())
    }

    fn begin_revision(&mut self, ctx: &mut Context, rev_str: &str) -> Result<(), Error> {
        let file_id = self.current_file.ok_or_else(|| Error::MalformedRevision {
            line: self.line_no,
            text: rev_str.to_string(),
        })?;

        // the date isn't known yet; it's filled in once the date/author/state
        // line is parsed, a few lines later.
        let rev_id = ctx
            .model
            .get_or_create_revision(file_id, rev_str, std::time::SystemTime::UNIX_EPOCH)?;
        self.current_rev = Some(rev_id);
        Ok(())
    }

    fn record_branches(&mut self, ctx: &mut Context, list: &str) {
        let file_id = match self.current_file {
            Some(id) => id,
            None => return,
        };

        for raw in list.split(';') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let rev = match revstr::Rev::parse(raw) {
                Ok(r) => r,
                Err(_) => continue,
            };
            let (attach_rev, leaf) = match rev.branch_ext() {
                Some(pair) => pair,
                None => continue,
            };

            let attach_id = match ctx.model.find_revision(file_id, &attach_rev.to_string()) {
                Some(id) => id,
                None => continue,
            };

            let already_named = ctx
                .model
                .revision(attach_id)
                .tags
                .iter()
                .any(|&t| ctx.model.tag(t).branch.leaf() == Some(leaf) && ctx.model.tag(t).branch.is_branch());

            if !already_named {
                let depth = rev.count_dots() as u16 + 1;
                ctx.model
                    .add_tag(file_id, None, attach_id, BranchKind::Branch(leaf), depth);
            }
        }
    }

    fn finish_revision(&mut self, ctx: &mut Context) -> Result<(), Error> {
        let file_id = self.current_file.ok_or_else(|| Error::MalformedRevision {
            line: self.line_no,
            text: "no current file".to_string(),
        })?;
        let rev_id = self.current_rev.take().ok_or_else(|| Error::MalformedRevision {
            line: self.line_no,
            text: "no current revision".to_string(),
        })?;
        let date = self.current_date.take().unwrap_or(std::time::SystemTime::UNIX_EPOCH);

        let dead = self.current_cvs_state.eq_ignore_ascii_case("dead");
        let leaf_is_one = ctx.model.revision(rev_id).rev.leaf() == 1;
        let looks_like_branch_add = dead
            && leaf_is_one
            && self.message.starts_with("file ")
            && self.message.contains("added on branch");

        if dead && leaf_is_one && !looks_like_branch_add {
            let err = Error::NotABranchAdd {
                line: self.line_no,
                rev: ctx.model.revision(rev_id).rev_str.to_string(),
                text: self.message.trim_end_matches('\n').to_string(),
            };
            log::warn!("{}", err);
            ctx.diagnostics.warn();
            self.stats.warnings += 1;
        }

        {
            let rev = ctx.model.revision_mut(rev_id);
            rev.date = date;
            rev.dead = dead;
            rev.present = true;
            rev.branch_add = looks_like_branch_add;
        }

        model::resolve_branch(&mut ctx.model, file_id, rev_id)?;

        match model::assign_pre_revision(&mut ctx.model, rev_id, self.prev_seen) {
            model::LinkOutcome::Orphan => {
                log::warn!(
                    "revision {} of {} has no resolvable parent",
                    ctx.model.revision(rev_id).rev_str,
                    ctx.model.file(file_id).path.display()
                );
                ctx.diagnostics.warn();
                self.stats.warnings += 1;
            }
            _ => {}
        }

        self.prev_seen = Some(rev_id);
        self.stats.revisions += 1;

        ctx.model
            .set_revision_log(rev_id, &self.current_author, self.message.trim_end_matches('\n'));

        Ok(())
    }

    fn finish_file(&mut self, _ctx: &mut Context) {
        self.current_file = None;
        self.prev_seen = None;
        self.current_rev = None;
    }
}

fn is_unknown_metadata(line: &str) -> bool {
    if let Some(rest) = line.split_once(": ") {
        let (key, value) = rest;
        !key.is_empty() && value.trim_end().ends_with(';') && !key.contains(' ')
    } else {
        false
    }
}

fn parse_revision_counts(rest: &str) -> (Option<usize>, Option<usize>) {
    // "<n>" or "<n>;\tselected revisions: <m>"
    let mut total = None;
    let mut selected = None;
    if let Some((first, second)) = rest.split_once(';') {
        total = first.trim().parse().ok();
        if let Some(sel) = second.trim().strip_prefix("selected revisions: ") {
            selected = sel.trim().parse().ok();
        }
    } else {
        total = rest.trim().parse().ok();
    }
    (total, selected)
}

fn parse_cvs_date(s: &str) -> Option<std::time::SystemTime> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()?;
    let secs = naive.timestamp();
    if secs >= 0 {
        Some(std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(secs as u64))
    } else {
        Some(std::time::SystemTime::UNIX_EPOCH - std::time::Duration::from_secs((-secs) as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Context;

    const FIXTURE: &str = "\
RCS file: /cvsroot/proj/foo.c,v
Working file: foo.c
head: 1.2
branch:
locks: strict
access list:
symbolic names:
\tREL_A: 1.2.0.2
keyword substitution: kv
total revisions: 3;\tselected revisions: 3
description:
----------------------------
revision 1.2
date: 2020/01/02 00:00:00;  author: alice;  state: Exp;  lines: +1 -1
second commit
----------------------------
revision 1.1
date: 2020/01/01 00:00:00;  author: alice;  state: Exp;
Initial revision
----------------------------
revision 1.2.2.1
date: 2020/01/03 00:00:00;  author: bob;  state: Exp;
branch commit
=============================================================================
";

    #[test]
    fn test_parses_fixture_into_graph() {
        let mut ctx = Context::default();
        let parser = Parser::new("proj");
        let stats = parser
            .parse(&mut ctx, &mut crate::reader::str_source(FIXTURE))
            .expect("parse should succeed");

        assert_eq!(stats.files, 1);
        assert_eq!(stats.revisions, 3);

        let file = ctx.model.find_file(&std::path::PathBuf::from("foo.c")).unwrap();
        let r1_2 = ctx.model.find_revision(file, "1.2").unwrap();
        let r1_1 = ctx.model.find_revision(file, "1.1").unwrap();
        let r1_2_2_1 = ctx.model.find_revision(file, "1.2.2.1").unwrap();

        assert_eq!(ctx.model.revision(r1_2).prev_rev, Some(r1_1));
        assert_eq!(ctx.model.revision(r1_1).next_rev, Some(r1_2));
        assert!(ctx.model.revision(r1_2_2_1).branch.is_some());
        assert!(ctx.model.revision(r1_2).branch_children.contains(&r1_2_2_1));
    }

    #[test]
    fn test_missing_symbolic_names_is_an_error() {
        let mut ctx = Context::default();
        let parser = Parser::new("proj");
        let broken = "RCS file: /cvsroot/proj/foo.c,v\nWorking file: foo.c\n";
        let err = parser
            .parse(&mut ctx, &mut crate::reader::str_source(broken))
            .unwrap_err();
        assert!(matches!(err, Error::MissingSymbolicNames { .. }));
    }

    #[test]
    fn test_branch_add_is_detected() {
        let mut ctx = Context::default();
        let parser = Parser::new("proj");
        let fixture = "\
RCS file: /cvsroot/proj/foo.c,v
Working file: foo.c
symbolic names:
total revisions: 2
----------------------------
revision 1.1
date: 2020/01/01 00:00:00;  author: alice;  state: Exp;
branches:  1.1.2;
Initial revision
----------------------------
revision 1.1.2.1
date: 2020/01/02 00:00:00;  author: alice;  state: dead;
file foo.c was added on branch
=============================================================================
";
        parser.parse(&mut ctx, &mut crate::reader::str_source(fixture)).unwrap();
        let file = ctx.model.find_file(&std::path::PathBuf::from("foo.c")).unwrap();
        let rev = ctx.model.find_revision(file, "1.1.2.1").unwrap();
        assert!(ctx.model.revision(rev).branch_add);
        assert!(ctx.model.revision(rev).dead);
    }
}
