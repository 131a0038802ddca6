//! Export directory scanner.
//!
//! Discovery is a single sequential walk (sorted by file name so results are
//! reproducible); reading and parsing each file runs on the worker pool.
//! Per-file failures become [`ScanIssue`]s and never abort the scan.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{DedupError, ErrorCode};
use crate::pool;
use crate::record::{ExtractError, TicketRecord};

/// Category of a recoverable scan failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanIssueKind {
    /// The file could not be read.
    Read,
    /// The file is not valid JSON.
    Parse,
    /// Valid JSON without a usable `ticket.id` / `ticket.updated_at`.
    Shape,
    /// A directory entry could not be visited.
    Walk,
}

impl ScanIssueKind {
    #[must_use]
    pub const fn code(self) -> ErrorCode {
        match self {
            Self::Read => ErrorCode::TicketReadFailed,
            Self::Parse => ErrorCode::TicketParseFailed,
            Self::Shape => ErrorCode::TicketShapeInvalid,
            Self::Walk => ErrorCode::DirectoryWalkFailed,
        }
    }
}

/// A file (or directory) skipped during the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub kind: ScanIssueKind,
    pub detail: String,
}

impl ScanIssue {
    fn new(path: impl Into<PathBuf>, kind: ScanIssueKind, detail: impl ToString) -> Self {
        Self {
            path: path.into(),
            kind,
            detail: detail.to_string(),
        }
    }
}

impl From<(PathBuf, ExtractError)> for ScanIssue {
    fn from((path, err): (PathBuf, ExtractError)) -> Self {
        let kind = match err {
            ExtractError::Parse(_) => ScanIssueKind::Parse,
            ExtractError::Shape(_) => ScanIssueKind::Shape,
        };
        Self::new(path, kind, err)
    }
}

/// Everything the scan phase learned about the export tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutcome {
    /// Number of `*.json` files discovered.
    pub files_seen: usize,
    /// Records in discovery (path) order.
    pub records: Vec<TicketRecord>,
    /// Files and directories that were skipped.
    pub issues: Vec<ScanIssue>,
}

/// Fail fast unless `root` is an existing directory.
///
/// # Errors
///
/// Returns [`DedupError::ExportRootMissing`] otherwise.
pub fn ensure_export_root(root: &Path) -> Result<(), DedupError> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(DedupError::ExportRootMissing(root.to_path_buf()))
    }
}

/// Collect every regular `*.json` file under `root`, without following symlinks.
///
/// Entries that cannot be visited are returned as [`ScanIssueKind::Walk`] issues.
#[must_use]
pub fn discover_json_files(root: &Path) -> (Vec<PathBuf>, Vec<ScanIssue>) {
    let mut files = Vec::new();
    let mut issues = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_json_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                debug!(path = %path.display(), error = %err, "skipping unwalkable entry");
                issues.push(ScanIssue::new(path, ScanIssueKind::Walk, err));
            }
        }
    }

    (files, issues)
}

// Byte-level match so names that are not valid UTF-8 are still scanned.
fn is_json_file(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.as_encoded_bytes().ends_with(b".json"))
}

/// Read and extract a single ticket file.
///
/// # Errors
///
/// Returns a [`ScanIssue`] describing why the file was skipped.
pub fn read_ticket(path: &Path) -> Result<TicketRecord, ScanIssue> {
    let bytes = fs::read(path).map_err(|err| ScanIssue::new(path, ScanIssueKind::Read, err))?;
    TicketRecord::from_json_slice(&bytes, path).map_err(|err| (path.to_path_buf(), err).into())
}

/// Scan `root` for ticket files using up to `jobs` reader threads.
///
/// # Errors
///
/// Returns [`DedupError::ExportRootMissing`] before touching the tree if
/// `root` is not a directory, or [`DedupError::Pool`] if the reader pool cannot be built.
pub fn scan_export(root: &Path, jobs: usize) -> Result<ScanOutcome, DedupError> {
    ensure_export_root(root)?;

    let (files, mut issues) = discover_json_files(root);
    info!(root = %root.display(), files = files.len(), jobs, "scanning ticket files");

    let results = pool::map_ordered(&files, jobs, |path| read_ticket(path))?;

    let mut records = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(record) => records.push(record),
            Err(issue) => {
                debug!(
                    path = %issue.path.display(),
                    code = %issue.kind.code(),
                    detail = %issue.detail,
                    "skipping ticket file"
                );
                issues.push(issue);
            }
        }
    }

    info!(
        records = records.len(),
        issues = issues.len(),
        "scan complete"
    );

    Ok(ScanOutcome {
        files_seen: files.len(),
        records,
        issues,
    })
}
