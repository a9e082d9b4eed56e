//! # Budget Dashboard Core
//!
//! Client-side state engine for the budget dashboard. It owns the session
//! token, fetches month-scoped data from the remote budget service, keeps the
//! canonical client copy of that data, and derives totals and chart series
//! from it.
//!
//! ## Layers
//! ```text
//! screens / CLI
//!     ↓ subscribe, select_month, edit_*
//! store::AggregationStore ── views::build_views
//!     ↓
//! services::RemoteDataSource (ApiClient)
//!     ↓ Authorization header
//! session::SessionGate ── TokenStore
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod services;
pub mod session;
pub mod store;
pub mod views;

pub use config::DashboardConfig;
pub use error::{ApiError, DashboardError};
pub use services::{ApiClient, RemoteDataSource, StatementFile, UploadOutcome};
pub use session::{FileTokenStore, MemoryTokenStore, SessionGate, SessionState, TokenStore};
pub use store::{AggregationStore, DashboardSnapshot, Notice, NoticeLevel};
pub use views::{BudgetStatus, DerivedViews, Totals};
