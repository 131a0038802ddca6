//! Rendering of a completed run.
//!
//! The JSON shape is stable: `export_path`, `dry_run`, `scan`, `issues`,
//! `duplicates`, `failures`, `summary`, and (with `--timing`) `timing`.

use crate::output::{OutputMode, pretty_kv, pretty_section, write_mode};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use ticket_dedup_core::RunReport;
use ticket_dedup_core::prune::RemoveFailure;
use ticket_dedup_core::scan::ScanIssue;
use ticket_dedup_core::select::{DuplicateGroup, Version};

#[derive(Debug, Serialize)]
pub struct ScanOutput {
    pub files_seen: usize,
    pub records: usize,
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
pub struct IssueOutput {
    pub path: PathBuf,
    pub error_code: &'static str,
    pub detail: String,
}

impl From<&ScanIssue> for IssueOutput {
    fn from(issue: &ScanIssue) -> Self {
        Self {
            path: issue.path.clone(),
            error_code: issue.kind.code().code(),
            detail: issue.detail.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DuplicateOutput {
    pub ticket_id: String,
    pub versions: usize,
    pub retained: Version,
    pub removed: Vec<Version>,
}

impl From<&DuplicateGroup> for DuplicateOutput {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            ticket_id: group.ticket_id.clone(),
            versions: group.version_count(),
            retained: group.retained.clone(),
            removed: group.removed.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryOutput {
    /// Files deleted this run.
    pub removed: usize,
    /// Files a non-dry run would delete.
    pub would_remove: usize,
    /// Distinct tickets; each keeps exactly one version.
    pub kept: usize,
    /// Tickets that were never duplicated.
    pub unique: usize,
    pub failed: usize,
    pub pruned_dirs: usize,
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub export_path: PathBuf,
    pub dry_run: bool,
    pub scan: ScanOutput,
    pub issues: Vec<IssueOutput>,
    pub duplicates: Vec<DuplicateOutput>,
    pub failures: Vec<RemoveFailure>,
    pub summary: SummaryOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<serde_json::Value>,
    #[serde(skip)]
    pub quiet: bool,
}

impl RunOutput {
    pub fn new(report: &RunReport, quiet: bool, with_timing: bool) -> Self {
        let prune = report.prune.as_ref();
        Self {
            export_path: report.export_path.clone(),
            dry_run: report.dry_run,
            scan: ScanOutput {
                files_seen: report.files_seen,
                records: report.records,
                skipped: report.issues.len(),
            },
            issues: report.issues.iter().map(IssueOutput::from).collect(),
            duplicates: report
                .plan
                .duplicates
                .iter()
                .map(DuplicateOutput::from)
                .collect(),
            failures: prune.map(|p| p.failed.clone()).unwrap_or_default(),
            summary: SummaryOutput {
                removed: report.removed_count(),
                would_remove: report.plan.removal_count(),
                kept: report.plan.kept_count(),
                unique: report.plan.unique,
                failed: report.failed_count(),
                pruned_dirs: prune.map_or(0, |p| p.pruned_dirs.len()),
            },
            timing: with_timing.then(|| report.timing.to_json()),
            quiet,
        }
    }

    const fn remove_verb(&self) -> &'static str {
        if self.dry_run { "would remove" } else { "remove" }
    }
}

/// Write `output` to stdout in `mode`.
pub fn render_run(mode: OutputMode, output: &RunOutput) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_run(mode, output, &mut out)
}

pub fn write_run(mode: OutputMode, output: &RunOutput, out: &mut dyn Write) -> anyhow::Result<()> {
    write_mode(mode, output, out, render_text, render_pretty)
}

fn stamp(version: &Version) -> &str {
    version.updated_at.as_deref().unwrap_or("unknown")
}

fn render_pretty(o: &RunOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Export {}", o.export_path.display()))?;
    pretty_kv(w, "json files", o.scan.files_seen.to_string())?;
    pretty_kv(w, "tickets read", o.scan.records.to_string())?;
    pretty_kv(w, "skipped", o.scan.skipped.to_string())?;

    if !o.quiet && !o.issues.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Skipped files ({})", o.issues.len()))?;
        for issue in &o.issues {
            writeln!(w, "  {}  {}", issue.error_code, issue.path.display())?;
            writeln!(w, "         {}", issue.detail)?;
        }
    }

    if !o.duplicates.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Duplicate tickets ({})", o.duplicates.len()))?;
        for dup in &o.duplicates {
            if o.quiet {
                if o.dry_run {
                    for v in &dup.removed {
                        writeln!(w, "  would remove  {}", v.path.display())?;
                    }
                }
                continue;
            }
            writeln!(w, "ticket {}: {} versions", dup.ticket_id, dup.versions)?;
            writeln!(
                w,
                "  keep          {}  ({})",
                dup.retained.path.display(),
                stamp(&dup.retained)
            )?;
            for v in &dup.removed {
                writeln!(
                    w,
                    "  {:<13} {}  ({})",
                    o.remove_verb(),
                    v.path.display(),
                    stamp(v)
                )?;
            }
        }
    }

    if !o.failures.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Failed removals ({})", o.failures.len()))?;
        for failure in &o.failures {
            writeln!(w, "  {}  {}", failure.path.display(), failure.error)?;
        }
    }

    writeln!(w)?;
    pretty_section(w, if o.dry_run { "Summary (dry run)" } else { "Summary" })?;
    if o.dry_run {
        pretty_kv(w, "would remove", format!("{} file(s)", o.summary.would_remove))?;
    } else {
        pretty_kv(w, "removed", format!("{} file(s)", o.summary.removed))?;
    }
    pretty_kv(w, "kept", format!("{} ticket(s)", o.summary.kept))?;
    pretty_kv(w, "unique", format!("{} ticket(s)", o.summary.unique))?;
    if !o.dry_run {
        pretty_kv(w, "failed", o.summary.failed.to_string())?;
        pretty_kv(w, "pruned dirs", o.summary.pruned_dirs.to_string())?;
    }
    Ok(())
}

fn render_text(o: &RunOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "scan path={} files={} records={} skipped={}",
        o.export_path.display(),
        o.scan.files_seen,
        o.scan.records,
        o.scan.skipped
    )?;

    if !o.quiet {
        for issue in &o.issues {
            writeln!(
                w,
                "skip {} {} {}",
                issue.error_code,
                issue.path.display(),
                issue.detail
            )?;
        }
    }

    let verb = if o.dry_run { "would-remove" } else { "remove" };
    for dup in &o.duplicates {
        if !o.quiet {
            writeln!(
                w,
                "dup {} versions={} keep={} updated_at={}",
                dup.ticket_id,
                dup.versions,
                dup.retained.path.display(),
                stamp(&dup.retained)
            )?;
        }
        if !o.quiet || o.dry_run {
            for v in &dup.removed {
                writeln!(w, "{verb} {} updated_at={}", v.path.display(), stamp(v))?;
            }
        }
    }

    for failure in &o.failures {
        writeln!(w, "failed {} {}", failure.path.display(), failure.error)?;
    }

    let removed = if o.dry_run {
        o.summary.would_remove
    } else {
        o.summary.removed
    };
    writeln!(
        w,
        "summary dry_run={} {}={} kept={} failed={} pruned_dirs={}",
        o.dry_run,
        if o.dry_run { "would_remove" } else { "removed" },
        removed,
        o.summary.kept,
        o.summary.failed,
        o.summary.pruned_dirs
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(path: &str, ts: Option<&str>) -> Version {
        Version {
            path: PathBuf::from(path),
            updated_at: ts.map(str::to_string),
        }
    }

    fn sample(dry_run: bool, quiet: bool) -> RunOutput {
        RunOutput {
            export_path: PathBuf::from("export"),
            dry_run,
            scan: ScanOutput {
                files_seen: 4,
                records: 3,
                skipped: 1,
            },
            issues: vec![IssueOutput {
                path: PathBuf::from("export/bad.json"),
                error_code: "E2002",
                detail: "invalid JSON: EOF".into(),
            }],
            duplicates: vec![DuplicateOutput {
                ticket_id: "1".into(),
                versions: 2,
                retained: version("export/b.json", Some("2024-02-01")),
                removed: vec![version("export/a.json", Some("2024-01-01"))],
            }],
            failures: Vec::new(),
            summary: SummaryOutput {
                removed: usize::from(!dry_run),
                would_remove: 1,
                kept: 2,
                unique: 1,
                failed: 0,
                pruned_dirs: 0,
            },
            timing: None,
            quiet,
        }
    }

    fn text(mode: OutputMode, output: &RunOutput) -> String {
        let mut buf = Vec::new();
        write_run(mode, output, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_mode_lists_removals_and_summary() {
        let s = text(OutputMode::Text, &sample(false, false));
        assert!(s.contains("skip E2002 export/bad.json"));
        assert!(s.contains("dup 1 versions=2 keep=export/b.json"));
        assert!(s.contains("remove export/a.json updated_at=2024-01-01"));
        assert!(s.ends_with("summary dry_run=false removed=1 kept=2 failed=0 pruned_dirs=0\n"));
    }

    #[test]
    fn quiet_dry_run_still_lists_would_remove_paths() {
        let s = text(OutputMode::Text, &sample(true, true));
        assert!(!s.contains("skip "));
        assert!(!s.contains("dup "));
        assert!(s.contains("would-remove export/a.json"));
        assert!(s.contains("would_remove=1"));
    }

    #[test]
    fn pretty_mode_has_sections() {
        let s = text(OutputMode::Pretty, &sample(true, false));
        assert!(s.contains("Skipped files (1)"));
        assert!(s.contains("ticket 1: 2 versions"));
        assert!(s.contains("would remove  export/a.json"));
        assert!(s.contains("Summary (dry run)"));
    }

    #[test]
    fn pretty_summary_counts_tickets_not_files() {
        let mut output = sample(false, false);
        output.summary.failed = 1;
        let s = text(OutputMode::Pretty, &output);
        assert!(s.contains("kept:         2 ticket(s)"));
        assert!(s.contains("unique:       1 ticket(s)"));
        assert!(s.contains("failed:       1"));
    }

    #[test]
    fn json_mode_is_stable_object() {
        let s = text(OutputMode::Json, &sample(false, true));
        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert_eq!(v["dry_run"], false);
        assert_eq!(v["scan"]["files_seen"], 4);
        assert_eq!(v["duplicates"][0]["retained"]["path"], "export/b.json");
        assert_eq!(v["summary"]["kept"], 2);
        assert_eq!(v["summary"]["unique"], 1);
        assert!(v.get("timing").is_none());
        assert!(v.get("quiet").is_none());
    }

    #[test]
    fn missing_timestamp_renders_as_unknown() {
        assert_eq!(stamp(&version("x.json", None)), "unknown");
    }
}
