//! Removal of superseded ticket files.
//!
//! Deletion is best-effort: each failure is logged and recorded, and the
//! remaining files are still removed. Afterwards, directories emptied by the
//! removals are deleted bottom-up, never including the export root itself.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DedupError, ErrorCode};
use crate::pool;
use crate::select::Plan;

/// A file that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Result of applying a [`Plan`] to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneOutcome {
    /// Files actually deleted.
    pub removed: Vec<PathBuf>,
    /// Files whose deletion failed.
    pub failed: Vec<RemoveFailure>,
    /// Directories deleted because the removals left them empty.
    pub pruned_dirs: Vec<PathBuf>,
}

impl PruneOutcome {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Delete every superseded file in `plan` using up to `jobs` threads, then
/// prune directories left empty under `root`.
///
/// # Errors
///
/// Only [`DedupError::Pool`]; individual deletion failures are reported in
/// [`PruneOutcome::failed`].
pub fn apply(plan: &Plan, root: &Path, jobs: usize) -> Result<PruneOutcome, DedupError> {
    let targets: Vec<&Path> = plan.removals().collect();
    info!(files = targets.len(), jobs, "removing superseded ticket files");

    let results = pool::map_ordered(&targets, jobs, |path| fs::remove_file(path))?;

    let mut outcome = PruneOutcome::default();
    for (path, result) in targets.into_iter().zip(results) {
        match result {
            Ok(()) => {
                debug!(path = %path.display(), "removed");
                outcome.removed.push(path.to_path_buf());
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    code = %ErrorCode::RemoveFailed,
                    error = %err,
                    "failed to remove superseded ticket file"
                );
                outcome.failed.push(RemoveFailure {
                    path: path.to_path_buf(),
                    error: err.to_string(),
                });
            }
        }
    }

    outcome.pruned_dirs = prune_empty_dirs(root, &outcome.removed);

    info!(
        removed = outcome.removed.len(),
        failed = outcome.failed.len(),
        pruned_dirs = outcome.pruned_dirs.len(),
        "removal complete"
    );
    Ok(outcome)
}

/// Remove directories under `root` that became empty after `removed` files
/// were deleted, deepest first. Returns the directories that were removed.
///
/// Only ancestors of removed files are considered, so directories that were
/// already empty before the run are left alone. Cleanup failures are logged.
pub fn prune_empty_dirs(root: &Path, removed: &[PathBuf]) -> Vec<PathBuf> {
    let mut candidates = BTreeSet::new();
    for path in removed {
        let mut dir = path.parent();
        while let Some(d) = dir {
            if d == root || !d.starts_with(root) {
                break;
            }
            candidates.insert(d.to_path_buf());
            dir = d.parent();
        }
    }

    // Children sort after their parents, so reverse order visits leaves first.
    let mut pruned = Vec::new();
    for dir in candidates.into_iter().rev() {
        match is_empty_dir(&dir) {
            Ok(true) => match fs::remove_dir(&dir) {
                Ok(()) => {
                    debug!(dir = %dir.display(), "removed empty directory");
                    pruned.push(dir);
                }
                Err(err) => {
                    warn!(dir = %dir.display(), error = %err, "failed to remove empty directory");
                }
            },
            Ok(false) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "failed to inspect directory");
            }
        }
    }
    pruned
}

fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}
