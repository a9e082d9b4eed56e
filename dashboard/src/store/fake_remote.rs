//! Scriptable in-memory remote for store tests.
//!
//! Fetches and category updates can be held at a gate so tests decide the
//! order in which concurrent requests complete. A held fetch reads its data
//! before waiting, like a server that answered while the reply was in transit.

use async_trait::async_trait;
use shared::{AccountFormat, BudgetMap, Category, MonthKey, Summary, Transaction};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::error::ApiError;
use crate::services::{RemoteDataSource, StatementFile, UploadOutcome};

#[derive(Default)]
pub(crate) struct FakeRemote {
    pub summaries: Mutex<HashMap<MonthKey, Summary>>,
    pub transactions: Mutex<HashMap<MonthKey, Vec<Transaction>>>,
    pub budgets: Mutex<BudgetMap>,
    pub months: Mutex<Vec<MonthKey>>,

    pub fail_summary: Mutex<Option<ApiError>>,
    pub fail_transactions: Mutex<Option<ApiError>>,
    pub fail_months: Mutex<Option<ApiError>>,
    pub fail_update: Mutex<Option<ApiError>>,
    pub fail_save: Mutex<Option<ApiError>>,
    pub fail_upload: Mutex<Option<ApiError>>,

    month_gates: Mutex<HashMap<MonthKey, Arc<Semaphore>>>,
    months_gate: Mutex<Option<Arc<Semaphore>>>,
    transactions_gate: Mutex<Option<Arc<Semaphore>>>,
    budgets_gate: Mutex<Option<Arc<Semaphore>>>,
    update_gate: Mutex<Option<Arc<Semaphore>>>,

    pub summary_calls: AtomicUsize,
    pub transaction_calls: AtomicUsize,
    pub budget_calls: AtomicUsize,
    pub months_calls: AtomicUsize,
    pub update_calls: Mutex<Vec<(i64, Category)>>,
    pub saved_budgets: Mutex<Vec<BudgetMap>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_month(&self, month: &MonthKey, summary: Summary, transactions: Vec<Transaction>) {
        self.summaries.lock().unwrap().insert(month.clone(), summary);
        self.transactions.lock().unwrap().insert(month.clone(), transactions);
    }

    pub fn set_months(&self, months: &[&MonthKey]) {
        *self.months.lock().unwrap() = months.iter().map(|m| (*m).clone()).collect();
    }

    /// Hold summary and transaction fetches for `month` until released
    pub fn hold_month(&self, month: &MonthKey) {
        self.month_gates
            .lock()
            .unwrap()
            .insert(month.clone(), Arc::new(Semaphore::new(0)));
    }

    pub fn release_month(&self, month: &MonthKey) {
        if let Some(gate) = self.month_gates.lock().unwrap().remove(month) {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn hold_months(&self) {
        Self::hold(&self.months_gate);
    }

    pub fn release_months(&self) {
        Self::release(&self.months_gate);
    }

    /// Hold transaction fetches for every month
    pub fn hold_transactions(&self) {
        Self::hold(&self.transactions_gate);
    }

    pub fn release_transactions(&self) {
        Self::release(&self.transactions_gate);
    }

    pub fn hold_budgets(&self) {
        Self::hold(&self.budgets_gate);
    }

    pub fn release_budgets(&self) {
        Self::release(&self.budgets_gate);
    }

    pub fn hold_updates(&self) {
        Self::hold(&self.update_gate);
    }

    pub fn release_updates(&self) {
        Self::release(&self.update_gate);
    }

    fn hold(slot: &Mutex<Option<Arc<Semaphore>>>) {
        *slot.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    fn release(slot: &Mutex<Option<Arc<Semaphore>>>) {
        if let Some(gate) = slot.lock().unwrap().take() {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    async fn wait(gate: Option<Arc<Semaphore>>) {
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn month_gate(&self, month: &MonthKey) -> Option<Arc<Semaphore>> {
        self.month_gates.lock().unwrap().get(month).cloned()
    }

    fn failure(slot: &Mutex<Option<ApiError>>) -> Result<(), ApiError> {
        match slot.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteDataSource for FakeRemote {
    async fn fetch_summary(&self, month: &MonthKey) -> Result<Summary, ApiError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        let summary = self.summaries.lock().unwrap().get(month).cloned().unwrap_or_default();
        Self::wait(self.month_gate(month)).await;
        Self::failure(&self.fail_summary)?;
        Ok(summary)
    }

    async fn fetch_transactions(&self, month: &MonthKey) -> Result<Vec<Transaction>, ApiError> {
        self.transaction_calls.fetch_add(1, Ordering::SeqCst);
        let transactions = self.transactions.lock().unwrap().get(month).cloned().unwrap_or_default();
        Self::wait(self.month_gate(month)).await;
        let gate = self.transactions_gate.lock().unwrap().clone();
        Self::wait(gate).await;
        Self::failure(&self.fail_transactions)?;
        Ok(transactions)
    }

    async fn fetch_budgets(&self) -> Result<BudgetMap, ApiError> {
        self.budget_calls.fetch_add(1, Ordering::SeqCst);
        let budgets = self.budgets.lock().unwrap().clone();
        let gate = self.budgets_gate.lock().unwrap().clone();
        Self::wait(gate).await;
        Ok(budgets)
    }

    async fn fetch_available_months(&self) -> Result<Vec<MonthKey>, ApiError> {
        self.months_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.months_gate.lock().unwrap().clone();
        Self::wait(gate).await;
        Self::failure(&self.fail_months)?;
        Ok(self.months.lock().unwrap().clone())
    }

    async fn upload_statement(
        &self,
        file: StatementFile,
        _format: AccountFormat,
    ) -> Result<UploadOutcome, ApiError> {
        Self::failure(&self.fail_upload)?;
        let lines = String::from_utf8_lossy(&file.contents).lines().count() as u32;
        Ok(UploadOutcome {
            total_transactions: lines,
            new_transactions: lines,
        })
    }

    async fn update_transaction_category(&self, id: i64, category: Category) -> Result<(), ApiError> {
        self.update_calls.lock().unwrap().push((id, category));
        let gate = self.update_gate.lock().unwrap().clone();
        Self::wait(gate).await;
        Self::failure(&self.fail_update)?;
        for list in self.transactions.lock().unwrap().values_mut() {
            if let Some(tx) = list.iter_mut().find(|t| t.id == id) {
                tx.category = category;
            }
        }
        Ok(())
    }

    async fn save_budgets(&self, budgets: &BudgetMap) -> Result<(), ApiError> {
        self.saved_budgets.lock().unwrap().push(budgets.clone());
        Self::failure(&self.fail_save)?;
        *self.budgets.lock().unwrap() = budgets.clone();
        Ok(())
    }
}
