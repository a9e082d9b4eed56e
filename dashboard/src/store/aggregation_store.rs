use rust_decimal::Decimal;
use shared::{AccountFormat, BudgetMap, Category, MonthKey, Summary, Transaction};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::snapshot::{DashboardSnapshot, Notice};
use super::state::StoreState;
use crate::error::{ApiError, DashboardError};
use crate::services::{RemoteDataSource, StatementFile, UploadOutcome};
use crate::session::{SessionGate, SessionState};
use crate::views::Totals;

/// Single source of truth for the dashboard's data.
///
/// Share it behind an `Arc`; all methods take `&self`. Local transitions are
/// applied under a lock that is never held across a remote call.
pub struct AggregationStore {
    remote: Arc<dyn RemoteDataSource>,
    session: Arc<SessionGate>,
    state: Mutex<StoreState>,
    /// Serializes category edits per transaction id
    edit_locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
    updates: watch::Sender<Arc<DashboardSnapshot>>,
}

impl AggregationStore {
    pub fn new(remote: Arc<dyn RemoteDataSource>, session: Arc<SessionGate>) -> Self {
        let state = StoreState::default();
        let (updates, _) = watch::channel(Arc::new(state.snapshot(session.is_authenticated())));
        Self {
            remote,
            session,
            state: Mutex::new(state),
            edit_locks: Mutex::new(HashMap::new()),
            updates,
        }
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    /// Receive a fresh snapshot after every state transition
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardSnapshot>> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        self.updates.borrow().clone()
    }

    pub fn current_month(&self) -> Option<MonthKey> {
        self.lock().current_month.clone()
    }

    /// Transactions as displayed, pending edits applied
    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.iter().map(|t| t.displayed()).collect()
    }

    pub fn transaction(&self, id: i64) -> Option<Transaction> {
        self.lock()
            .transactions
            .iter()
            .find(|t| t.id() == id)
            .map(|t| t.displayed())
    }

    pub fn summary(&self) -> Summary {
        self.lock().summary().clone()
    }

    pub fn totals(&self) -> Totals {
        self.lock().views().totals
    }

    pub fn budgets(&self) -> BudgetMap {
        self.lock().budgets().clone()
    }

    pub fn budget_draft(&self) -> Option<BudgetMap> {
        self.lock().budget_draft.clone()
    }

    pub fn available_months(&self) -> Vec<MonthKey> {
        self.lock().available_months.clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.lock().notice.clone()
    }

    pub fn dismiss_notice(&self) {
        self.update(|state| state.notice = None);
    }

    // ---------------------------------------------------------------------
    // Session
    // ---------------------------------------------------------------------

    /// Adopt a persisted token, starting from an empty store
    pub fn restore_session(&self) -> SessionState {
        let session_state = self.session.restore_session();
        self.update(|state| state.reset());
        session_state
    }

    /// Log in as a (possibly different) user. Previous data is discarded.
    pub fn login(&self, token: &str) -> Result<(), DashboardError> {
        self.session.login(token)?;
        self.update(|state| state.reset());
        Ok(())
    }

    /// Log out and discard every piece of in-memory financial data
    pub fn logout(&self) -> Result<(), DashboardError> {
        let result = self.session.logout();
        self.update(|state| state.reset());
        result.map_err(DashboardError::from)
    }

    // ---------------------------------------------------------------------
    // Fetch cycles
    // ---------------------------------------------------------------------

    /// Make `month` current and refetch its summary and transactions.
    ///
    /// The selection counts as explicit and suppresses newest-month
    /// auto-selection. Months outside the available list are honored.
    pub async fn select_month(&self, month: MonthKey) {
        info!("Selecting month {}", month);
        let epoch = self.update(|state| {
            state.month_explicit = true;
            state.switch_month(month.clone());
            state.epoch
        });

        if !self.session.is_authenticated() {
            debug!("Not authenticated, skipping fetch for {}", month);
            return;
        }
        self.load_month(&month, epoch).await;
    }

    /// Fetch summary, transactions, budgets and available months concurrently.
    ///
    /// The first successful months fetch auto-selects the newest month unless
    /// the user already chose one.
    pub async fn refresh_all(&self) {
        if !self.session.is_authenticated() {
            debug!("Not authenticated, skipping refresh");
            return;
        }
        let (epoch, month) = {
            let state = self.lock();
            (state.epoch, state.current_month.clone())
        };
        info!("Refreshing all dashboard data (month: {:?})", month.as_ref().map(|m| m.as_str()));

        let month_data = async {
            if let Some(month) = &month {
                self.load_month(month, epoch).await;
            }
        };
        let months_then_auto_select = async {
            if let Some(newest) = self.load_months(epoch).await {
                self.load_month(&newest, epoch).await;
            }
        };

        tokio::join!(month_data, self.load_budgets(epoch), months_then_auto_select);
    }

    async fn load_month(&self, month: &MonthKey, epoch: u64) {
        tokio::join!(self.load_summary(month, epoch), self.load_transactions(month, epoch));
    }

    async fn load_summary(&self, month: &MonthKey, epoch: u64) {
        let requested_at = self.begin_fetch(epoch);
        let result = self.remote.fetch_summary(month).await;
        self.finish_month_fetch(epoch, month, "summary", result, |state, summary| {
            debug!("Applying summary with {} categories for {}", summary.len(), month);
            state
                .set_summary(summary, requested_at)
                .map_err(|e| ApiError::MalformedResponse(e.to_string()))
        });
    }

    async fn load_transactions(&self, month: &MonthKey, epoch: u64) {
        let requested_at = self.begin_fetch(epoch);
        let result = self.remote.fetch_transactions(month).await;
        self.finish_month_fetch(epoch, month, "transactions", result, |state, transactions| {
            debug!("Applying {} transactions for {}", transactions.len(), month);
            state.set_transactions(transactions, requested_at);
            Ok(())
        });
    }

    async fn load_budgets(&self, epoch: u64) {
        let requested_at = self.begin_fetch(epoch);
        let result = self.remote.fetch_budgets().await;
        let failure = self.update(|state| {
            if state.epoch != epoch {
                return None;
            }
            state.fetch_finished();
            match result {
                Ok(budgets) => {
                    if !state.set_budgets(budgets, requested_at) {
                        debug!("Discarding budgets requested before the last save");
                    }
                    None
                }
                Err(err) => Some(Self::read_failed(state, "budgets", err)),
            }
        });
        self.handle_failure(epoch, failure);
    }

    /// Returns the month to load when this fetch triggered auto-selection
    async fn load_months(&self, epoch: u64) -> Option<MonthKey> {
        self.begin_fetch(epoch);
        let result = self.remote.fetch_available_months().await;
        let (auto_selected, failure) = self.update(|state| {
            if state.epoch != epoch {
                return (None, None);
            }
            state.fetch_finished();
            match result {
                Ok(mut months) => {
                    months.sort_by(|a, b| b.cmp(a));
                    months.dedup();
                    state.available_months = months;

                    if state.auto_selected || state.month_explicit {
                        return (None, None);
                    }
                    let newest = state.available_months.first().cloned();
                    if let Some(newest) = &newest {
                        info!("Auto-selecting newest month {}", newest);
                        state.auto_selected = true;
                        state.switch_month(newest.clone());
                    }
                    (newest, None)
                }
                Err(err) => (None, Some(Self::read_failed(state, "available months", err))),
            }
        });
        self.handle_failure(epoch, failure);
        auto_selected
    }

    fn finish_month_fetch<T>(
        &self,
        epoch: u64,
        month: &MonthKey,
        what: &str,
        result: Result<T, ApiError>,
        apply: impl FnOnce(&mut StoreState, T) -> Result<(), ApiError>,
    ) {
        let failure = self.update(|state| {
            if state.epoch != epoch {
                return None;
            }
            state.fetch_finished();
            if !state.accepts(epoch, month) {
                debug!("Discarding stale {} for {}", what, month);
                return None;
            }
            match result.and_then(|value| apply(state, value)) {
                Ok(()) => None,
                Err(err) => Some(Self::read_failed(state, what, err)),
            }
        });
        self.handle_failure(epoch, failure);
    }

    /// Keep prior data and surface a non-fatal notice
    fn read_failed(state: &mut StoreState, what: &str, err: ApiError) -> ApiError {
        warn!("Failed to load {}: {}", what, err);
        state.notice = Some(Notice::warning(format!("Could not load {}: {}", what, err.user_message())));
        err
    }

    /// Count the fetch as in flight and return the write marker it was sent under
    fn begin_fetch(&self, epoch: u64) -> u64 {
        self.update(|state| {
            if state.epoch == epoch {
                state.fetch_started();
            }
            state.writes()
        })
    }

    fn handle_failure(&self, epoch: u64, failure: Option<ApiError>) {
        if let Some(err) = failure {
            if err.is_unauthorized() {
                self.expire_session(epoch);
            }
        }
    }

    /// The server rejected our token: force a logout, once per session
    fn expire_session(&self, epoch: u64) {
        if self.lock().epoch != epoch {
            return;
        }
        warn!("Session rejected by server, logging out");
        if let Err(e) = self.session.logout() {
            error!("Failed to clear persisted session: {}", e);
        }
        self.update(|state| {
            if state.epoch == epoch {
                state.reset();
                state.notice = Some(Notice::error("Your session has expired. Please log in again."));
            }
        });
    }

    // ---------------------------------------------------------------------
    // Transaction edits
    // ---------------------------------------------------------------------

    /// Recategorize a transaction optimistically, then confirm with the server.
    ///
    /// Success refetches the month's summary. Failure restores the last
    /// confirmed category and returns the error. A second edit to the same
    /// transaction waits until the first one is resolved.
    pub async fn edit_transaction_category(&self, id: i64, category: Category) -> Result<(), DashboardError> {
        if !self.session.is_authenticated() {
            return Err(DashboardError::NotAuthenticated);
        }

        let edit_lock = self.edit_lock(id);
        let result = {
            let _guard = edit_lock.lock().await;
            self.apply_category_edit(id, category).await
        };
        drop(edit_lock);
        self.release_edit_lock(id);
        result
    }

    async fn apply_category_edit(&self, id: i64, category: Category) -> Result<(), DashboardError> {
        let epoch = self.update(|state| {
            if !state.propose_edit(id, category) {
                return Err(DashboardError::UnknownTransaction(id));
            }
            debug!("Optimistically moving transaction {} to {}", id, category);
            Ok(state.epoch)
        })?;

        match self.remote.update_transaction_category(id, category).await {
            Ok(()) => {
                info!("Transaction {} recategorized to {}", id, category);
                let month = self.update(|state| {
                    if state.epoch != epoch {
                        return None;
                    }
                    state.confirm_edit(id, category);
                    state.current_month.clone()
                });
                if let Some(month) = month {
                    self.load_summary(&month, epoch).await;
                }
                Ok(())
            }
            Err(err) => {
                warn!("Category update for transaction {} failed: {}", id, err);
                self.update(|state| {
                    if state.epoch != epoch {
                        return;
                    }
                    state.rollback_edit(id);
                    state.notice = Some(Notice::error(format!(
                        "Could not change category: {}",
                        err.user_message()
                    )));
                });
                if err.is_unauthorized() {
                    self.expire_session(epoch);
                }
                Err(err.into())
            }
        }
    }

    fn edit_lock(&self, id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.edit_locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(id).or_default().clone()
    }

    fn release_edit_lock(&self, id: i64) {
        let mut locks = self.edit_locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&id);
        }
    }

    // ---------------------------------------------------------------------
    // Budget edits
    // ---------------------------------------------------------------------

    /// Open a draft initialized from the confirmed budgets
    pub fn begin_budget_edit(&self) -> BudgetMap {
        self.update(|state| {
            let draft = state.budgets().clone();
            state.budget_draft = Some(draft.clone());
            draft
        })
    }

    /// Change one limit in the open draft, opening one if needed
    pub fn set_draft_budget(&self, category: Category, limit: Decimal) -> Result<(), DashboardError> {
        if limit.is_sign_negative() && !limit.is_zero() {
            return Err(DashboardError::NegativeBudget { category });
        }
        self.update(|state| {
            let confirmed = state.budgets().clone();
            state
                .budget_draft
                .get_or_insert(confirmed)
                .set_limit(category, limit);
        });
        Ok(())
    }

    pub fn cancel_budget_edit(&self) {
        self.update(|state| state.budget_draft = None);
    }

    /// Save `draft` as the new budget map.
    ///
    /// On success the draft becomes the confirmed map and the summary is
    /// refetched once. On failure the draft is kept so no input is lost.
    pub async fn commit_budget_edit(&self, draft: BudgetMap) -> Result<(), DashboardError> {
        let epoch = self.update(|state| {
            state.budget_draft = Some(draft.clone());
            state.epoch
        });

        if let Some(category) = draft.first_negative() {
            return Err(DashboardError::NegativeBudget { category });
        }
        if !self.session.is_authenticated() {
            return Err(DashboardError::NotAuthenticated);
        }

        match self.remote.save_budgets(&draft).await {
            Ok(()) => {
                info!("Budgets saved");
                let month = self.update(|state| {
                    if state.epoch != epoch {
                        return None;
                    }
                    state.confirm_budgets(draft);
                    state.notice = Some(Notice::info("Budgets saved"));
                    state.current_month.clone()
                });
                if let Some(month) = month {
                    self.load_summary(&month, epoch).await;
                }
                Ok(())
            }
            Err(err) => {
                warn!("Saving budgets failed: {}", err);
                self.update(|state| {
                    if state.epoch == epoch {
                        state.notice = Some(Notice::error(format!(
                            "Could not save budgets: {}",
                            err.user_message()
                        )));
                    }
                });
                if err.is_unauthorized() {
                    self.expire_session(epoch);
                }
                Err(err.into())
            }
        }
    }

    // ---------------------------------------------------------------------
    // Statement import
    // ---------------------------------------------------------------------

    /// Submit a bank statement, then reload months and the current month
    pub async fn upload_statement(
        &self,
        file: StatementFile,
        format: AccountFormat,
    ) -> Result<UploadOutcome, DashboardError> {
        if !self.session.is_authenticated() {
            return Err(DashboardError::NotAuthenticated);
        }
        let epoch = self.lock().epoch;
        info!("Uploading statement {} ({})", file.file_name, format);

        match self.remote.upload_statement(file, format).await {
            Ok(outcome) => {
                info!(
                    "Imported {} new of {} transactions",
                    outcome.new_transactions, outcome.total_transactions
                );
                self.update(|state| {
                    if state.epoch == epoch {
                        state.notice = Some(Notice::info(format!(
                            "Imported {} new of {} transactions",
                            outcome.new_transactions, outcome.total_transactions
                        )));
                    }
                });
                self.refresh_all().await;
                Ok(outcome)
            }
            Err(err) => {
                warn!("Statement upload failed: {}", err);
                self.update(|state| {
                    if state.epoch == epoch {
                        state.notice = Some(Notice::error(format!("Upload failed: {}", err.user_message())));
                    }
                });
                if err.is_unauthorized() {
                    self.expire_session(epoch);
                }
                Err(err.into())
            }
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply a synchronous transition and publish the resulting snapshot
    fn update<R>(&self, transition: impl FnOnce(&mut StoreState) -> R) -> R {
        let mut state = self.lock();
        let result = transition(&mut state);
        let snapshot = state.snapshot(self.session.is_authenticated());
        self.updates.send_replace(Arc::new(snapshot));
        result
    }
}
