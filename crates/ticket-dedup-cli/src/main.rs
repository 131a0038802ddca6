#![forbid(unsafe_code)]

mod output;
mod report;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use report::{RunOutput, render_run};
use std::env;
use std::path::PathBuf;
use ticket_dedup_core::config::{self, ConfigLayer};
use ticket_dedup_core::timing::timing_enabled_from_env;
use ticket_dedup_core::{DedupError, RunOptions, RunReport, TimestampOrder};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "ticket-dedup",
    author,
    version,
    about = "Remove superseded ticket JSON exports, keeping the newest version of each ticket",
    long_about = "Scan an export tree for ticket JSON files, group them by ticket.id, keep the \
                  file with the greatest ticket.updated_at, and delete the rest. Directories \
                  left empty by the deletions are removed as well.",
    after_help = "EXAMPLES:\n    # Preview what would be removed\n    ticket-dedup --dry-run\n\n\
                  # Deduplicate a specific export\n    ticket-dedup --export-path /data/export\n\n\
                  # Compare timestamps as instants rather than strings\n    \
                  ticket-dedup --timestamp-order chronological\n\n\
                  # Machine-readable output\n    ticket-dedup --dry-run --json"
)]
struct Cli {
    /// Report what would be removed without deleting anything.
    #[arg(long)]
    dry_run: bool,

    /// Root directory to scan [default: export].
    #[arg(long, value_name = "PATH", env = "EXPORT_DIR")]
    export_path: Option<PathBuf>,

    /// Number of worker threads for reading and deleting files [default: CPU count].
    #[arg(short, long, value_name = "N", value_parser = parse_jobs)]
    jobs: Option<usize>,

    /// How `updated_at` values are compared.
    #[arg(long, value_enum, value_name = "ORDER")]
    timestamp_order: Option<OrderArg>,

    /// Exit non-zero if any superseded file could not be removed.
    #[arg(long)]
    strict: bool,

    /// Output format.
    #[arg(long, value_enum, global = true)]
    format: Option<OutputMode>,

    /// Emit JSON output (alias for `--format json`).
    #[arg(long, hide = true, global = true)]
    json: bool,

    /// Report per-phase timings (stderr, or a `timing` field in JSON output).
    #[arg(long)]
    timing: bool,

    /// Suppress per-ticket detail and skipped-file listings.
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Generate shell completion scripts",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    ticket-dedup completions bash"
    )]
    Completions(CompletionsArgs),
}

/// Arguments for `ticket-dedup completions`.
#[derive(Args, Debug)]
struct CompletionsArgs {
    /// Target shell for completion script generation.
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OrderArg {
    /// Byte-wise string comparison.
    Lexical,
    /// RFC 3339 instants; unparseable values rank oldest.
    Chronological,
}

impl From<OrderArg> for TimestampOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Lexical => Self::Lexical,
            OrderArg::Chronological => Self::Chronological,
        }
    }
}

fn parse_jobs(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(err) => Err(err.to_string()),
    }
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }

    /// Settings given on the command line (or their env fallbacks).
    fn overrides(&self) -> ConfigLayer {
        ConfigLayer {
            export_path: self.export_path.clone(),
            jobs: self.jobs,
            timestamp_order: self.timestamp_order.map(TimestampOrder::from),
            strict: self.strict.then_some(true),
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TICKET_DEDUP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "ticket_dedup=debug,info"
        } else if verbose {
            "ticket_dedup=info,warn"
        } else {
            "warn"
        })
    });

    let format = env::var("TICKET_DEDUP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn fail(output: OutputMode, err: &DedupError) -> anyhow::Result<()> {
    render_error(output, &CliError::from(err))?;
    Err(anyhow::anyhow!("{}", err.code().message()))
}

/// Exit policy for failed removals: reported but successful unless `strict`.
fn exit_for(report: &RunReport, strict: bool) -> anyhow::Result<()> {
    if !report.has_remove_failures() {
        return Ok(());
    }
    if strict {
        anyhow::bail!(
            "{} superseded file(s) could not be removed",
            report.failed_count()
        );
    }
    info!(
        failed = report.failed_count(),
        "some removals failed; exiting 0 (pass --strict to fail)"
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(Commands::Completions(args)) = &cli.command {
        let mut command = Cli::command();
        generate(args.shell, &mut command, "ticket-dedup", &mut std::io::stdout());
        return Ok(());
    }

    let output = cli.output_mode();
    let timing_enabled = cli.timing || timing_enabled_from_env();

    let cwd = env::current_dir()?;
    let settings = match config::resolve(&cwd, cli.overrides()) {
        Ok(settings) => settings,
        Err(err) => return fail(output, &err),
    };
    debug!(?settings, dry_run = cli.dry_run, "resolved settings");

    let report = match ticket_dedup_core::run(&RunOptions::from_settings(&settings, cli.dry_run)) {
        Ok(report) => report,
        Err(err) => return fail(output, &err),
    };

    render_run(
        output,
        &RunOutput::new(&report, cli.quiet, timing_enabled && output.is_json()),
    )?;

    if timing_enabled && !output.is_json() {
        eprintln!("timing report:");
        eprintln!("{}", report.timing.display_table());
        eprintln!("timing report (json):");
        eprintln!("{}", serde_json::to_string_pretty(&report.timing.to_json())?);
    }

    if let Err(err) = exit_for(&report, settings.strict) {
        render_error(output, &CliError::new(err.to_string()))?;
        return Err(err);
    }

    Ok(())
}
