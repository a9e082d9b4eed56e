//! # Remote Data Source
//!
//! Stateless fetch and mutate operations against the remote service. Every
//! operation returns a typed payload or a classified [`ApiError`]; nothing is
//! retried or cached here, so the store's reconciliation logic can be reasoned
//! about without transport noise.

use async_trait::async_trait;
use shared::{AccountFormat, BudgetMap, Category, MonthKey, Summary, Transaction};
use std::path::Path;

use crate::error::ApiError;

/// A bank statement to submit for server-side parsing
#[derive(Debug, Clone, PartialEq)]
pub struct StatementFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl StatementFile {
    pub fn new(file_name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }

    /// Read a statement from disk, keeping only the file name for the upload
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let contents = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "statement.csv".to_string());
        Ok(Self { file_name, contents })
    }
}

/// Counts reported after a statement import
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOutcome {
    pub total_transactions: u32,
    pub new_transactions: u32,
}

#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    /// Per-category summary for `month`
    async fn fetch_summary(&self, month: &MonthKey) -> Result<Summary, ApiError>;

    /// Transactions booked in `month`
    async fn fetch_transactions(&self, month: &MonthKey) -> Result<Vec<Transaction>, ApiError>;

    /// Month-independent budget limits
    async fn fetch_budgets(&self) -> Result<BudgetMap, ApiError>;

    /// Months that have data, newest first
    async fn fetch_available_months(&self) -> Result<Vec<MonthKey>, ApiError>;

    async fn upload_statement(
        &self,
        file: StatementFile,
        format: AccountFormat,
    ) -> Result<UploadOutcome, ApiError>;

    async fn update_transaction_category(&self, id: i64, category: Category) -> Result<(), ApiError>;

    /// Replace the full budget map
    async fn save_budgets(&self, budgets: &BudgetMap) -> Result<(), ApiError>;
}
