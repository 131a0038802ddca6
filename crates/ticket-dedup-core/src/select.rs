//! Newest-version selection.
//!
//! Records are grouped by ticket id. Within a group the retained version is
//! the one with the greatest `updated_at`; ties go to the smallest path. Every
//! other version in the group is scheduled for removal.
//!
//! # Ordering
//!
//! - [`TimestampOrder::Lexical`] compares raw strings byte-wise. For
//!   ISO-8601 timestamps in one offset this is chronological.
//! - [`TimestampOrder::Chronological`] parses RFC 3339 and compares instants,
//!   so `2024-01-01T10:00:00+02:00` is older than `2024-01-01T09:00:00Z`.
//!   Values that fail to parse rank below every parseable one and compare
//!   lexically among themselves.
//!
//! In both modes a missing or `null` timestamp is the oldest possible value.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::record::TicketRecord;

/// How `updated_at` values are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampOrder {
    #[default]
    Lexical,
    Chronological,
}

impl fmt::Display for TimestampOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lexical => "lexical",
            Self::Chronological => "chronological",
        })
    }
}

impl FromStr for TimestampOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lexical" => Ok(Self::Lexical),
            "chronological" => Ok(Self::Chronological),
            other => Err(format!(
                "unknown timestamp order '{other}' (expected lexical or chronological)"
            )),
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey<'a> {
    Unknown,
    Text(&'a str),
    Instant(DateTime<FixedOffset>, &'a str),
}

impl TimestampOrder {
    fn key(self, value: Option<&str>) -> SortKey<'_> {
        match (self, value) {
            (_, None) => SortKey::Unknown,
            (Self::Lexical, Some(s)) => SortKey::Text(s),
            (Self::Chronological, Some(s)) => DateTime::parse_from_rfc3339(s)
                .map_or(SortKey::Text(s), |instant| SortKey::Instant(instant, s)),
        }
    }

    /// Ascending comparison of two `updated_at` values (older first).
    #[must_use]
    pub fn compare(self, a: Option<&str>, b: Option<&str>) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }
}

/// One on-disk version of a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Version {
    pub path: PathBuf,
    pub updated_at: Option<String>,
}

impl From<TicketRecord> for Version {
    fn from(record: TicketRecord) -> Self {
        Self {
            path: record.path,
            updated_at: record.updated_at,
        }
    }
}

/// A ticket found in more than one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub ticket_id: String,
    pub retained: Version,
    /// Superseded versions, newest first.
    pub removed: Vec<Version>,
}

impl DuplicateGroup {
    /// Total versions found for this ticket, including the retained one.
    #[must_use]
    pub fn version_count(&self) -> usize {
        self.removed.len() + 1
    }
}

/// The removal plan for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Tickets with more than one version, ordered by ticket id.
    pub duplicates: Vec<DuplicateGroup>,
    /// Distinct ticket ids seen; equals the number of files kept.
    pub tickets: usize,
    /// Tickets that had exactly one version.
    pub unique: usize,
}

impl Plan {
    /// Paths of every superseded version.
    pub fn removals(&self) -> impl Iterator<Item = &Path> + '_ {
        self.duplicates
            .iter()
            .flat_map(|group| group.removed.iter().map(|v| v.path.as_path()))
    }

    #[must_use]
    pub fn removal_count(&self) -> usize {
        self.duplicates.iter().map(|g| g.removed.len()).sum()
    }

    #[must_use]
    pub const fn kept_count(&self) -> usize {
        self.tickets
    }
}

/// Group `records` by ticket id and choose the version to keep for each.
#[must_use]
pub fn plan(records: Vec<TicketRecord>, order: TimestampOrder) -> Plan {
    let mut by_id: BTreeMap<String, Vec<TicketRecord>> = BTreeMap::new();
    for record in records {
        by_id.entry(record.ticket_id.clone()).or_default().push(record);
    }

    let tickets = by_id.len();
    let mut duplicates = Vec::new();

    for (ticket_id, mut versions) in by_id {
        if versions.len() < 2 {
            continue;
        }
        versions.sort_by(|a, b| newest_first(order, a, b));

        let mut versions = versions.into_iter().map(Version::from);
        let Some(retained) = versions.next() else {
            continue;
        };
        duplicates.push(DuplicateGroup {
            ticket_id,
            retained,
            removed: versions.collect(),
        });
    }

    Plan {
        unique: tickets - duplicates.len(),
        duplicates,
        tickets,
    }
}

fn newest_first(order: TimestampOrder, a: &TicketRecord, b: &TicketRecord) -> Ordering {
    order
        .compare(b.updated_at.as_deref(), a.updated_at.as_deref())
        .then_with(|| a.path.cmp(&b.path))
}
