//! Batch entry point: parses the CLI surface (merged with the rc file),
//! drives the log stream through the parser/aggregator/resolver/sorter
//! pipeline, and hands the result to the filtered emitter. See
//! `SPEC_FULL.md` §2 for the full data-flow diagram this mirrors.

mod branch;
mod emitter;
mod error;
mod opt;
mod rc;

use std::{
    ffi::OsStr,
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    time::SystemTime,
};

use diffproc::LogProducer;
use error::Error;
use flexi_logger::Logger;

fn main() {
    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let argv: Vec<String> = std::env::args().collect();
    let opt = rc::parse_with_rc(config_dir(), argv)?;

    init_logging(&opt);

    let repository = opt.repository.clone().unwrap_or_default();
    let options = opt.into_options();

    let mut ctx = model::Context::new(options);

    let mut producer: Option<LogProducer> = None;
    let mut reader: Box<dyn BufRead> = match &ctx.options.test_log {
        Some(test_log) => Box::new(BufReader::new(File::open(test_log).map_err(|err| Error::TestLog {
            path: test_log.display().to_string(),
            err,
        })?)),
        None => {
            if ctx.options.cvs_direct {
                return Err(diffproc::Error::CvsDirectUnsupported.into());
            }
            let mut p = LogProducer::spawn(
                OsStr::new("cvs"),
                ctx.options.compress,
                !ctx.options.no_rlog,
                ctx.options.cvsroot.as_deref(),
                ctx.options.repository.as_deref(),
            )?;
            let stdout = Box::new(p.stdout());
            producer = Some(p);
            stdout
        }
    };

    let repository_path_component = repository.to_string_lossy().to_string();
    let parser = logparser::Parser::new(repository_path_component);
    let stats = parser.parse(&mut ctx, &mut reader)?;
    log::debug!("parsed {} files, {} revisions", stats.files, stats.revisions);

    if let Some(p) = producer {
        p.wait()?;
    }

    let mut revisions: Vec<(SystemTime, model::FileId, model::RevisionId)> = ctx
        .model
        .revision_ids()
        .filter(|&id| ctx.model.revision(id).present)
        .map(|id| (ctx.model.revision(id).date, ctx.model.revision(id).file, id))
        .collect();
    revisions.sort_by_key(|&(date, _, _)| date);

    let mut aggregator = patchset::Aggregator::new(ctx.options.fuzz, ctx.options.unify_unnamed);
    for (_, file_id, rev_id) in revisions {
        aggregator.add_revision(&mut ctx.model, file_id, rev_id);
    }
    let (mut patch_sets, collisions) = aggregator.finish();

    let named = ctx.model.name_unnamed_branches();
    log::debug!("named {} unnamed branch symbols", named);

    symtab::resolve_symbols(&mut ctx.model, &mut patch_sets, ctx.options.strict_tag_check);
    symtab::record_ancestor_hints(&mut ctx.model);

    let order = symtab::total_order(&ctx.model, &patch_sets);
    symtab::assign_psids(&mut patch_sets, &order);

    let explicit_branch = ctx.options.branch.last().map(|s| s.as_str());
    let bounds = symtab::resolve_restrict(&mut ctx.model, &patch_sets, &ctx.options.restrict_tags, explicit_branch);
    symtab::apply_funk_overrides(&mut patch_sets, &bounds);

    let emitter = emitter::Emitter::new(emitter::EmitterConfig {
        model: &ctx.model,
        patch_sets: &patch_sets,
        bounds: &bounds,
        options: &ctx.options,
        cvs_command: OsStr::new("cvs").to_os_string(),
        repository,
    })?;

    let mut stdout = io::stdout();
    emitter.run(&order, &collisions, &mut stdout)?;

    if ctx.options.statistics {
        eprintln!(
            "cvsps: {} warning(s), {} error(s)",
            ctx.diagnostics.warnings, ctx.diagnostics.errors
        );
    }

    Ok(())
}

fn init_logging(opt: &opt::Opt) {
    let spec = if opt.debug_level > 0 {
        "trace"
    } else if opt.quiet {
        "error"
    } else if opt.verbose {
        "info"
    } else {
        "warn"
    };

    if let Err(err) = Logger::try_with_str(spec).and_then(|l| l.start()) {
        eprintln!("cvsps: couldn't initialize logging: {}", err);
    }
}

fn config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
