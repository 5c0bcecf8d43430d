//! Attendance ledger and the backlog reconciliation that follows it.
//!
//! Every ledger mutation yields a [`LedgerChange`], which the caller feeds
//! into [`backlog::reconcile`] within the same operation.

pub mod backlog;
pub mod ledger;

pub use backlog::{BacklogOutcome, backlog_title, past_occurrences, reconcile, retroactive_backlog};
pub use ledger::{LedgerChange, clear_attendance, record_attendance, status_for};
