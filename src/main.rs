mod classify;
mod cli;
mod crawl;
mod diff;
mod entry;
mod filelist;
mod report;
mod run;
mod signals;
mod snapshot;

use anyhow::Context;
use cli::Cli;
use crawl::CrawlPolicy;
use globset::Glob;
use report::{FormatSink, ReportFormat, ReportGates};
use run::RunOutcome;
use std::fmt as stdfmt;
use std::io;
use std::process::ExitCode;
use tracing::{Event, Level, Subscriber, error, info, warn};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

struct SnapExitCode;

impl SnapExitCode {
    /// Exit code after a cooperative signal abort (128 + SIGINT).
    fn interrupted() -> ExitCode {
        ExitCode::from(130)
    }

    /// Exit code for other failures (I/O errors, invalid arguments,
    /// policy refusals).
    fn any_error() -> ExitCode {
        ExitCode::from(255)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match dump(cli) {
        Ok(RunOutcome::Completed(_)) => ExitCode::SUCCESS,
        Ok(RunOutcome::Aborted) => {
            warn!("interrupted; filelist left untouched");
            SnapExitCode::interrupted()
        }
        Err(err) => {
            error!("{err:#}");
            SnapExitCode::any_error()
        }
    }
}

fn dump(cli: Cli) -> anyhow::Result<RunOutcome> {
    let abort = signals::install().context("could not install signal handlers")?;

    let delimiter = if cli.null_delimited { 0 } else { b'\n' };
    let exclude = cli
        .exclude
        .as_deref()
        .map(|pattern| Glob::new(pattern).map(|glob| glob.compile_matcher()))
        .transpose()
        .context("invalid exclusion pattern")?;
    let format = ReportFormat::parse(cli.format.as_deref().unwrap_or(report::DEFAULT_FORMAT))
        .context("invalid report format")?;

    let config = run::Config {
        filelist: cli.filelist,
        roots: cli.roots,
        delimiter,
        anchor: cli.timestamp,
        local_compare: cli.local,
        crawl: CrawlPolicy {
            one_file_system: cli.one_file_system,
            honor_nobackup: !cli.no_nobackup,
            max_size: cli.max_size,
            exclude,
            capture_xattrs: cli.xattrs,
        },
    };

    let stdout = io::stdout().lock();
    let mut sink = FormatSink::new(
        stdout,
        format,
        delimiter,
        ReportGates {
            removed_only: cli.removed_only,
            modified_only: cli.modified_only,
        },
    );

    let outcome = run::run(&config, &mut sink, &abort)?;
    if let RunOutcome::Completed(totals) = outcome {
        info!(
            "{} removed, {} modified, {} new",
            totals.removed, totals.modified, totals.added
        );
    }
    Ok(outcome)
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_fmt::layer()
        .event_format(LevelPrefixFormatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Plain `LEVEL: message` lines on stderr; diagnostics must stay trivially
/// greppable and never mix with the record stream on stdout.
struct LevelPrefixFormatter;

impl<S, N> FormatEvent<S, N> for LevelPrefixFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        match *event.metadata().level() {
            Level::TRACE => writer.write_str("TRACE: ")?,
            Level::DEBUG => writer.write_str("DEBUG: ")?,
            Level::INFO => writer.write_str("INFO: ")?,
            Level::WARN => writer.write_str("WARN: ")?,
            Level::ERROR => writer.write_str("ERROR: ")?,
            _ => {}
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
