//! End-to-end deduplication run: scan, select, then remove (or report).

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::config::Settings;
use crate::error::DedupError;
use crate::prune::{self, PruneOutcome};
use crate::scan::{self, ScanIssue};
use crate::select::{self, Plan, TimestampOrder};
use crate::timing::TimingReport;

/// Inputs for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub export_path: PathBuf,
    pub dry_run: bool,
    pub jobs: usize,
    pub timestamp_order: TimestampOrder,
}

impl RunOptions {
    #[must_use]
    pub fn from_settings(settings: &Settings, dry_run: bool) -> Self {
        Self {
            export_path: settings.export_path.clone(),
            dry_run,
            jobs: settings.jobs,
            timestamp_order: settings.timestamp_order,
        }
    }
}

/// Everything a run observed and did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub export_path: PathBuf,
    pub dry_run: bool,
    /// Number of `*.json` files discovered.
    pub files_seen: usize,
    /// Files that yielded a ticket record.
    pub records: usize,
    pub issues: Vec<ScanIssue>,
    pub plan: Plan,
    /// `None` for dry runs.
    pub prune: Option<PruneOutcome>,
    #[serde(skip)]
    pub timing: TimingReport,
}

impl RunReport {
    /// Paths scheduled for removal (dry run) or targeted for removal.
    pub fn planned_removals(&self) -> impl Iterator<Item = &Path> + '_ {
        self.plan.removals()
    }

    /// Files actually deleted; always zero for a dry run.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.prune.as_ref().map_or(0, |p| p.removed.len())
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.prune.as_ref().map_or(0, |p| p.failed.len())
    }

    #[must_use]
    pub fn has_remove_failures(&self) -> bool {
        self.failed_count() > 0
    }
}

/// Scan the export tree, pick the newest version of every ticket, and
/// delete the rest unless `dry_run` is set.
///
/// # Errors
///
/// Returns [`DedupError::ExportRootMissing`] before scanning if the export
/// path is not a directory, or [`DedupError::Pool`] if the worker pool cannot be built.
/// Per-file read and delete failures are reported inside [`RunReport`].
pub fn run(opts: &RunOptions) -> Result<RunReport, DedupError> {
    let mut timing = TimingReport::default();
    let root = opts.export_path.as_path();

    let outcome = timing.time("scan", || scan::scan_export(root, opts.jobs))?;
    let files_seen = outcome.files_seen;
    let records = outcome.records.len();

    let plan = timing.time("select", || {
        select::plan(outcome.records, opts.timestamp_order)
    });
    info!(
        tickets = plan.tickets,
        duplicated = plan.duplicates.len(),
        superseded = plan.removal_count(),
        "selection complete"
    );

    let prune = if opts.dry_run {
        info!(would_remove = plan.removal_count(), "dry run: nothing removed");
        None
    } else {
        Some(timing.time("prune", || prune::apply(&plan, root, opts.jobs))?)
    };

    Ok(RunReport {
        export_path: opts.export_path.clone(),
        dry_run: opts.dry_run,
        files_seen,
        records,
        issues: outcome.issues,
        plan,
        prune,
        timing,
    })
}
