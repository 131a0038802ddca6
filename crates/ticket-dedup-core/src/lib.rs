//! ticket-dedup-core library.
//!
//! Prunes a ticket export tree down to the newest version of every ticket.
//! The pipeline is [`scan`] → [`select`] → [`prune`], driven by [`run::run`].
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums carrying an [`error::ErrorCode`];
//!   per-file failures are data, not errors.
//! - **Logging**: `tracing` macros (`info!` per phase, `debug!` per file,
//!   `warn!` for failed removals).

pub mod config;
pub mod error;
pub mod pool;
pub mod prune;
pub mod record;
pub mod run;
pub mod scan;
pub mod select;
pub mod timing;

pub use error::{DedupError, ErrorCode};
pub use record::TicketRecord;
pub use run::{RunOptions, RunReport, run};
pub use select::TimestampOrder;
