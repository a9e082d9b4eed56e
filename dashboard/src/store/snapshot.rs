//! Immutable views of the store handed to subscribers.

use shared::{BudgetMap, MonthKey, Summary, Transaction};

use crate::views::{DerivedViews, Totals};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    /// A read failed; previously loaded data is still shown
    Warning,
    /// A write failed and was rolled back or kept as a draft
    Error,
}

/// User-facing message about the last operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

/// A transaction as displayed, with its edit state
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionView {
    pub transaction: Transaction,
    /// True while a category edit awaits server confirmation
    pub edit_pending: bool,
}

/// Everything a screen needs to render the dashboard at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSnapshot {
    pub authenticated: bool,
    pub current_month: Option<MonthKey>,
    pub available_months: Vec<MonthKey>,
    pub transactions: Vec<TransactionView>,
    pub summary: Summary,
    pub views: DerivedViews,
    /// Confirmed budget limits
    pub budgets: BudgetMap,
    /// Budget limits being edited, if an edit is open
    pub budget_draft: Option<BudgetMap>,
    pub notice: Option<Notice>,
    /// True while any fetch for the current session is outstanding
    pub loading: bool,
}

impl DashboardSnapshot {
    pub fn totals(&self) -> Totals {
        self.views.totals
    }
}
