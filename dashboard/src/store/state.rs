//! Mutable store state and its synchronous transitions.
//!
//! Every method here runs under the store lock and never awaits, so no
//! caller can observe a half-applied transition.

use shared::{AmountOverflow, BudgetMap, Category, CategorySummary, MonthKey, Summary, Transaction};
use std::collections::HashMap;
use tracing::warn;

use super::snapshot::{DashboardSnapshot, Notice, TransactionView};
use super::tracked::Tracked;
use crate::views::{build_views, DerivedViews};

/// A transaction whose category may carry an optimistic edit
#[derive(Debug, Clone)]
pub(crate) struct TrackedTransaction {
    record: Transaction,
    pub(crate) category: Tracked<Category>,
}

impl TrackedTransaction {
    pub(crate) fn id(&self) -> i64 {
        self.record.id
    }

    /// The transaction as it should be displayed
    pub(crate) fn displayed(&self) -> Transaction {
        Transaction {
            category: *self.category.current(),
            ..self.record.clone()
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    /// Bumped on login/logout; results from older sessions are discarded
    pub(crate) epoch: u64,
    pub(crate) current_month: Option<MonthKey>,
    /// The user picked the current month themselves
    pub(crate) month_explicit: bool,
    /// Newest-month auto-selection already happened this session
    pub(crate) auto_selected: bool,
    pub(crate) available_months: Vec<MonthKey>,
    pub(crate) transactions: Vec<TrackedTransaction>,
    /// Summary as served, before missing categories are filled in
    served_summary: Summary,
    summary: Summary,
    views: DerivedViews,
    budgets: BudgetMap,
    pub(crate) budget_draft: Option<BudgetMap>,
    pub(crate) notice: Option<Notice>,
    in_flight: usize,
    /// Count of confirmed writes. Reads remember it when they are sent so a
    /// reply older than a confirmed write can be recognized.
    writes: u64,
    /// Category edits awaiting the server, kept across month switches
    pending_edits: HashMap<i64, Category>,
    /// Last confirmed category per transaction and the write that confirmed it
    confirmed_edits: HashMap<i64, (Category, u64)>,
    /// Write that last confirmed the budget map
    budgets_written: u64,
}

impl StoreState {
    /// Drop everything and start a new session epoch
    pub(crate) fn reset(&mut self) {
        *self = StoreState {
            epoch: self.epoch + 1,
            ..StoreState::default()
        };
    }

    /// Whether a result requested under `epoch` for `month` may still be applied
    pub(crate) fn accepts(&self, epoch: u64, month: &MonthKey) -> bool {
        self.epoch == epoch && self.current_month.as_ref() == Some(month)
    }

    /// Marker a read records when it is sent
    pub(crate) fn writes(&self) -> u64 {
        self.writes
    }

    pub(crate) fn summary(&self) -> &Summary {
        &self.summary
    }

    pub(crate) fn views(&self) -> &DerivedViews {
        &self.views
    }

    pub(crate) fn budgets(&self) -> &BudgetMap {
        &self.budgets
    }

    /// Replace the summary and recompute everything derived from it.
    ///
    /// A summary requested before the latest confirmed write is ignored; the
    /// write schedules its own refetch. Categories the server left out are
    /// filled in with no spending against their current limit.
    pub(crate) fn set_summary(&mut self, summary: Summary, requested_at: u64) -> Result<(), AmountOverflow> {
        if requested_at < self.writes {
            return Ok(());
        }
        let previous = std::mem::replace(&mut self.served_summary, summary);
        if let Err(err) = self.rebuild_summary() {
            self.served_summary = previous;
            return Err(err);
        }
        Ok(())
    }

    fn rebuild_summary(&mut self) -> Result<(), AmountOverflow> {
        let mut summary = self.served_summary.clone();
        for category in Category::ALL {
            summary
                .entry(category)
                .or_insert_with(|| CategorySummary::unspent(self.budgets.limit(category)));
        }
        self.views = build_views(&summary)?;
        self.summary = summary;
        Ok(())
    }

    /// Take a fetched budget map unless a save was confirmed after it was requested
    pub(crate) fn set_budgets(&mut self, budgets: BudgetMap, requested_at: u64) -> bool {
        if requested_at < self.budgets_written {
            return false;
        }
        self.replace_budgets(budgets);
        true
    }

    /// The server accepted `budgets`
    pub(crate) fn confirm_budgets(&mut self, budgets: BudgetMap) {
        self.writes += 1;
        self.budgets_written = self.writes;
        self.budget_draft = None;
        self.replace_budgets(budgets);
    }

    fn replace_budgets(&mut self, budgets: BudgetMap) {
        self.budgets = budgets;
        if !self.summary.is_empty() {
            if let Err(err) = self.rebuild_summary() {
                warn!("Keeping previous summary views: {}", err);
            }
        }
    }

    /// Switch the current month, clearing data that belonged to the old one
    pub(crate) fn switch_month(&mut self, month: MonthKey) {
        if self.current_month.as_ref() == Some(&month) {
            return;
        }
        self.current_month = Some(month);
        self.transactions.clear();
        self.served_summary.clear();
        self.summary.clear();
        self.views = DerivedViews::default();
    }

    /// Take a fresh transaction list requested when `requested_at` writes had
    /// been confirmed.
    ///
    /// In-flight edits stay displayed, and an edit confirmed after the list
    /// was requested wins over the category the server sent.
    pub(crate) fn set_transactions(&mut self, fresh: Vec<Transaction>, requested_at: u64) {
        let mut previous: HashMap<i64, Tracked<Category>> = self
            .transactions
            .drain(..)
            .map(|t| (t.id(), t.category))
            .collect();

        let transactions: Vec<TrackedTransaction> = fresh
            .into_iter()
            .map(|record| {
                let served = match self.confirmed_edits.get(&record.id) {
                    Some((category, written)) if *written > requested_at => *category,
                    _ => record.category,
                };
                let mut category = previous.remove(&record.id).unwrap_or_else(|| Tracked::new(served));
                category.refresh_confirmed(served);
                match self.pending_edits.get(&record.id) {
                    Some(pending) => category.propose(*pending),
                    None => category.rollback(),
                }
                TrackedTransaction { record, category }
            })
            .collect();
        self.transactions = transactions;

        // Later reads are requested after these writes and already reflect them
        self.confirmed_edits.retain(|_, (_, written)| *written > requested_at);
    }

    pub(crate) fn transaction_mut(&mut self, id: i64) -> Option<&mut TrackedTransaction> {
        self.transactions.iter_mut().find(|t| t.id() == id)
    }

    /// Display `category` for a loaded transaction until the server answers
    pub(crate) fn propose_edit(&mut self, id: i64, category: Category) -> bool {
        let Some(tracked) = self.transaction_mut(id) else {
            return false;
        };
        tracked.category.propose(category);
        self.pending_edits.insert(id, category);
        true
    }

    /// The server accepted `category`; applies even if the month changed meanwhile
    pub(crate) fn confirm_edit(&mut self, id: i64, category: Category) {
        self.writes += 1;
        self.pending_edits.remove(&id);
        self.confirmed_edits.insert(id, (category, self.writes));
        if let Some(tracked) = self.transaction_mut(id) {
            tracked.category.confirm(category);
        }
    }

    pub(crate) fn rollback_edit(&mut self, id: i64) {
        self.pending_edits.remove(&id);
        if let Some(tracked) = self.transaction_mut(id) {
            tracked.category.rollback();
        }
    }

    pub(crate) fn fetch_started(&mut self) {
        self.in_flight += 1;
    }

    pub(crate) fn fetch_finished(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub(crate) fn snapshot(&self, authenticated: bool) -> DashboardSnapshot {
        DashboardSnapshot {
            authenticated,
            current_month: self.current_month.clone(),
            available_months: self.available_months.clone(),
            transactions: self
                .transactions
                .iter()
                .map(|t| TransactionView {
                    transaction: t.displayed(),
                    edit_pending: t.category.is_pending(),
                })
                .collect(),
            summary: self.summary.clone(),
            views: self.views.clone(),
            budgets: self.budgets.clone(),
            budget_draft: self.budget_draft.clone(),
            notice: self.notice.clone(),
            loading: self.in_flight > 0,
        }
    }
}
