//! # Aggregation Store
//!
//! Holds the canonical client copies of transactions, budgets, summary and
//! available months, plus the current month selection, and orchestrates
//! fetch and edit cycles against a [`RemoteDataSource`](crate::services::RemoteDataSource).
//!
//! ## Guarantees
//! - Month-scoped results are tagged with the month and session they were
//!   requested for, and dropped if either is no longer current.
//! - Category edits are optimistic and roll back on failure; edits to the
//!   same transaction are applied one after another.
//! - A budget draft never replaces the confirmed budgets until a save
//!   succeeds, and survives a failed save.
//! - Derived views are recomputed whenever the summary changes; subscribers
//!   get a new [`DashboardSnapshot`] after every transition.
//! - Logging out (explicitly or because the server rejected the token)
//!   discards all in-memory data.

mod aggregation_store;
mod snapshot;
mod state;
mod tracked;

#[cfg(test)]
mod fake_remote;

pub use aggregation_store::AggregationStore;
pub use snapshot::{DashboardSnapshot, Notice, NoticeLevel, TransactionView};
pub use tracked::Tracked;
