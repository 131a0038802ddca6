use std::fmt;
use std::io;
use std::path::PathBuf;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ExportRootMissing,
    ConfigParseError,
    TicketReadFailed,
    TicketParseFailed,
    TicketShapeInvalid,
    DirectoryWalkFailed,
    RemoveFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ExportRootMissing => "E1001",
            Self::ConfigParseError => "E1002",
            Self::TicketReadFailed => "E2001",
            Self::TicketParseFailed => "E2002",
            Self::TicketShapeInvalid => "E2003",
            Self::DirectoryWalkFailed => "E2004",
            Self::RemoveFailed => "E3001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ExportRootMissing => "Export directory not found",
            Self::ConfigParseError => "Config file parse error",
            Self::TicketReadFailed => "Ticket file could not be read",
            Self::TicketParseFailed => "Ticket file is not valid JSON",
            Self::TicketShapeInvalid => "Ticket file has no usable ticket.id",
            Self::DirectoryWalkFailed => "Directory could not be walked",
            Self::RemoveFailed => "File removal failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ExportRootMissing => {
                Some("Pass --export-path (or set EXPORT_DIR) to an existing directory.")
            }
            Self::ConfigParseError => Some("Fix syntax in .ticket-dedup.toml and retry."),
            Self::TicketReadFailed | Self::DirectoryWalkFailed => {
                Some("Check read permissions under the export directory.")
            }
            Self::TicketParseFailed => None,
            Self::TicketShapeInvalid => {
                Some("Expected {\"ticket\": {\"id\": ..., \"updated_at\": ...}}.")
            }
            Self::RemoveFailed => Some("Check write permissions, then re-run; scanning is idempotent."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Fatal errors that stop a run before or during planning.
#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    /// The export root does not exist or is not a directory.
    #[error("export path does not exist or is not a directory: {}", .0.display())]
    ExportRootMissing(PathBuf),

    /// A config file exists but could not be read or parsed.
    #[error("failed to load config {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    /// The worker pool could not be started.
    #[error("worker pool failed: {0}")]
    Pool(String),

    /// Unexpected I/O failure outside the per-file recoverable paths.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DedupError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ExportRootMissing(_) => ErrorCode::ExportRootMissing,
            Self::Config { .. } => ErrorCode::ConfigParseError,
            Self::Pool(_) | Self::Io(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// Remediation hint for operators and agents.
    #[must_use]
    pub fn suggestion(&self) -> String {
        self.code()
            .hint()
            .unwrap_or_else(|| self.code().message())
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{DedupError, ErrorCode};
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ExportRootMissing,
            ErrorCode::ConfigParseError,
            ErrorCode::TicketReadFailed,
            ErrorCode::TicketParseFailed,
            ErrorCode::TicketShapeInvalid,
            ErrorCode::DirectoryWalkFailed,
            ErrorCode::RemoveFailed,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::TicketShapeInvalid.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn missing_root_mentions_path_and_has_hint() {
        let err = DedupError::ExportRootMissing(PathBuf::from("does-not-exist"));
        assert!(err.to_string().contains("does-not-exist"));
        assert_eq!(err.code(), ErrorCode::ExportRootMissing);
        assert!(err.suggestion().contains("--export-path"));
    }

    #[test]
    fn suggestion_falls_back_to_message() {
        assert!(ErrorCode::TicketParseFailed.hint().is_none());
        assert_eq!(
            ErrorCode::TicketParseFailed.message(),
            "Ticket file is not valid JSON"
        );
    }
}
