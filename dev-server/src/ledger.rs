//! # In-Memory Ledger
//!
//! Transactions and budgets held by the dev server, plus the server-side
//! rules the dashboard relies on:
//! - summaries are computed from the month's transactions and the budgets,
//!   with one entry for every known category
//! - months are reported newest first
//! - statement imports skip rows already present, matched on
//!   (date, description, amount)
//!
//! Spending is stored as positive amounts; refunds are negative.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use shared::{AccountFormat, BudgetMap, Category, CategorySummary, MonthKey, Summary, Transaction};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("Transaction {0} not found")]
    UnknownTransaction(i64),

    #[error("Budget for {0} cannot be negative")]
    NegativeBudget(Category),

    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    #[error("Amounts for {0} exceed the supported range")]
    AmountOverflow(Category),
}

/// Counts reported back to the uploader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub total: u32,
    pub new: u32,
}

#[derive(Debug, Deserialize)]
struct StatementRow {
    date: String,
    description: String,
    amount: String,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Default)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    budgets: BudgetMap,
    next_id: i64,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Three months of sample data, January to March 2024
    pub fn seeded() -> Self {
        let mut ledger = Self::new();
        ledger.budgets = [
            (Category::Groceries, dec!(400)),
            (Category::DiningAndRestaurants, dec!(150)),
            (Category::Transportation, dec!(100)),
            (Category::Utilities, dec!(150)),
            (Category::Shopping, dec!(100)),
            (Category::Entertainment, dec!(75)),
            (Category::Subscriptions, dec!(30)),
        ]
        .into_iter()
        .collect();

        let rows = [
            ("2024-01-04", "Whole Foods Market", dec!(120.35), Category::Groceries),
            ("2024-01-11", "Blue Bottle Coffee", dec!(45.00), Category::DiningAndRestaurants),
            ("2024-01-15", "City Power & Light", dec!(89.99), Category::Utilities),
            ("2024-01-22", "Metro Card Reload", dec!(40.00), Category::Transportation),
            ("2024-02-02", "Trader Joe's", dec!(250.00), Category::Groceries),
            ("2024-02-09", "Target", dec!(60.00), Category::Shopping),
            ("2024-02-14", "Cinema Paradiso", dec!(30.00), Category::Entertainment),
            ("2024-02-14", "Osteria Francescana", dec!(80.50), Category::DiningAndRestaurants),
            ("2024-03-01", "Amazon Marketplace", dec!(80.00), Category::Shopping),
            ("2024-03-03", "Sushi Den", dec!(45.50), Category::DiningAndRestaurants),
            ("2024-03-08", "Safeway", dec!(310.20), Category::Groceries),
            ("2024-03-12", "Streaming Plus", dec!(15.99), Category::Subscriptions),
            ("2024-03-18", "City Power & Light", dec!(92.10), Category::Utilities),
        ];
        for (date, description, amount, category) in rows {
            ledger.insert(date, description, amount, category, AccountFormat::ChaseCredit);
        }
        ledger
    }

    pub fn budgets(&self) -> &BudgetMap {
        &self.budgets
    }

    pub fn set_budgets(&mut self, budgets: BudgetMap) -> Result<(), LedgerError> {
        if let Some(category) = budgets.first_negative() {
            return Err(LedgerError::NegativeBudget(category));
        }
        self.budgets = budgets;
        Ok(())
    }

    /// Months with at least one transaction, newest first
    pub fn months(&self) -> Vec<MonthKey> {
        let months: BTreeSet<MonthKey> = self.transactions.iter().filter_map(|t| month_of(&t.date)).collect();
        months.into_iter().rev().collect()
    }

    pub fn transactions_in(&self, month: &MonthKey) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|t| month_of(&t.date).as_ref() == Some(month))
            .cloned()
            .collect()
    }

    pub fn summary(&self, month: &MonthKey) -> Result<Summary, LedgerError> {
        let mut spending: BTreeMap<Category, (Decimal, u32)> =
            Category::ALL.iter().map(|c| (*c, (Decimal::ZERO, 0))).collect();
        for tx in self.transactions_in(month) {
            let entry = spending.entry(tx.category).or_insert((Decimal::ZERO, 0));
            entry.0 = entry
                .0
                .checked_add(tx.amount)
                .ok_or(LedgerError::AmountOverflow(tx.category))?;
            entry.1 = entry.1.saturating_add(1);
        }

        spending
            .into_iter()
            .map(|(category, (spent, count))| {
                CategorySummary::new(spent, self.budgets.limit(category), count)
                    .map(|entry| (category, entry))
                    .map_err(|_| LedgerError::AmountOverflow(category))
            })
            .collect()
    }

    pub fn set_category(&mut self, id: i64, category: Category) -> Result<(), LedgerError> {
        let tx = self
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(LedgerError::UnknownTransaction(id))?;
        debug!("Transaction {} moved from {} to {}", id, tx.category, category);
        tx.category = category;
        Ok(())
    }

    /// Import a `date,description,amount[,category]` statement.
    ///
    /// Every row is validated before anything is stored, so a bad row leaves
    /// the ledger untouched.
    pub fn import_statement(&mut self, contents: &[u8], format: AccountFormat) -> Result<ImportStats, LedgerError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(contents);

        let mut parsed = Vec::new();
        for (index, row) in reader.deserialize::<StatementRow>().enumerate() {
            let line = index + 2;
            let row = row.map_err(|e| LedgerError::InvalidStatement(format!("line {}: {}", line, e)))?;
            if month_of(&row.date).is_none() {
                return Err(LedgerError::InvalidStatement(format!(
                    "line {}: date '{}' is not YYYY-MM-DD",
                    line, row.date
                )));
            }
            let amount = Decimal::from_str(&row.amount).map_err(|_| {
                LedgerError::InvalidStatement(format!("line {}: amount '{}' is not a number", line, row.amount))
            })?;
            let category = row
                .category
                .as_deref()
                .and_then(|c| c.parse().ok())
                .unwrap_or(Category::Other);
            parsed.push((row.date, row.description, amount, category));
        }

        let mut stats = ImportStats { total: 0, new: 0 };
        for (date, description, amount, category) in parsed {
            stats.total += 1;
            if self.insert(&date, &description, amount, category, format).is_some() {
                stats.new += 1;
            }
        }
        info!("Imported {} new of {} statement rows", stats.new, stats.total);
        Ok(stats)
    }

    /// Store a transaction unless an identical one exists; returns the new id
    fn insert(
        &mut self,
        date: &str,
        description: &str,
        amount: Decimal,
        category: Category,
        format: AccountFormat,
    ) -> Option<i64> {
        let duplicate = self
            .transactions
            .iter()
            .any(|t| t.date == date && t.description == description && t.amount == amount);
        if duplicate {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.transactions.push(Transaction {
            id,
            date: date.to_string(),
            description: description.to_string(),
            category,
            amount,
            account_type: format.as_str().to_string(),
        });
        Some(id)
    }
}

/// Month of a `YYYY-MM-DD` date
fn month_of(date: &str) -> Option<MonthKey> {
    if date.len() != 10 || date.as_bytes()[7] != b'-' {
        return None;
    }
    MonthKey::parse(date.get(..7)?).ok()
}
