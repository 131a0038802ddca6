//! Ticket records extracted from exported JSON documents.
//!
//! An export file looks like `{"ticket": {"id": 42, "updated_at": "...", ...}}`
//! with arbitrarily large conversation and activity payloads alongside. Only
//! `ticket.id` and `ticket.updated_at` are read; everything else is ignored.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

/// One successfully extracted ticket version on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketRecord {
    /// Ticket identifier, normalized to text (`42` and `"42"` are the same ticket).
    pub ticket_id: String,
    /// Raw `ticket.updated_at` value; `None` when absent or `null`.
    pub updated_at: Option<String>,
    /// File the version was read from.
    pub path: PathBuf,
}

/// Why a JSON document could not be turned into a [`TicketRecord`].
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The bytes are not a JSON document.
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Valid JSON, but not the expected ticket shape.
    #[error("{0}")]
    Shape(&'static str),
}

impl TicketRecord {
    /// Extract a record from the raw bytes of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Parse`] when the bytes are not JSON and
    /// [`ExtractError::Shape`] when `ticket.id` is missing or ill-typed, or
    /// `ticket.updated_at` is neither a string nor `null`.
    pub fn from_json_slice(bytes: &[u8], path: &Path) -> Result<Self, ExtractError> {
        let doc: Value = serde_json::from_slice(bytes)?;
        Self::from_value(&doc, path)
    }

    /// Extract a record from an already parsed document.
    ///
    /// # Errors
    ///
    /// See [`TicketRecord::from_json_slice`].
    pub fn from_value(doc: &Value, path: &Path) -> Result<Self, ExtractError> {
        let ticket = match doc.get("ticket") {
            Some(Value::Object(ticket)) => ticket,
            Some(_) => return Err(ExtractError::Shape("ticket is not an object")),
            None => return Err(ExtractError::Shape("missing ticket object")),
        };

        let ticket_id = match ticket.get("id") {
            None | Some(Value::Null) => return Err(ExtractError::Shape("missing ticket.id")),
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(ExtractError::Shape("ticket.id is empty"));
            }
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) if n.is_i64() || n.is_u64() => n.to_string(),
            Some(_) => {
                return Err(ExtractError::Shape(
                    "ticket.id must be an integer or a string",
                ));
            }
        };

        let updated_at = match ticket.get("updated_at") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(ExtractError::Shape(
                    "ticket.updated_at must be a string or null",
                ));
            }
        };

        Ok(Self {
            ticket_id,
            updated_at,
            path: path.to_path_buf(),
        })
    }
}
