use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Spending classification applied to transactions and budgets.
///
/// The set is fixed; declaration order is the canonical category order used
/// for summaries, chart series and palette assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Groceries,
    #[serde(rename = "Dining & Restaurants")]
    DiningAndRestaurants,
    Transportation,
    Utilities,
    Housing,
    Shopping,
    Entertainment,
    Healthcare,
    Travel,
    Subscriptions,
    Income,
    Other,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Groceries,
        Category::DiningAndRestaurants,
        Category::Transportation,
        Category::Utilities,
        Category::Housing,
        Category::Shopping,
        Category::Entertainment,
        Category::Healthcare,
        Category::Travel,
        Category::Subscriptions,
        Category::Income,
        Category::Other,
    ];

    /// Wire and display name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::DiningAndRestaurants => "Dining & Restaurants",
            Category::Transportation => "Transportation",
            Category::Utilities => "Utilities",
            Category::Housing => "Housing",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Healthcare => "Healthcare",
            Category::Travel => "Travel",
            Category::Subscriptions => "Subscriptions",
            Category::Income => "Income",
            Category::Other => "Other",
        }
    }

    /// Position of the category in the fixed category order
    pub fn index(&self) -> usize {
        Category::ALL
            .iter()
            .position(|c| c == self)
            .unwrap_or(Category::ALL.len() - 1)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Accepts the wire name, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Month selector key in `YYYY-MM` form.
///
/// Keys compare chronologically because the format is zero padded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey(String);

impl MonthKey {
    /// Build a key from a year and a 1-based month
    pub fn new(year: i32, month: u32) -> Result<Self, MonthKeyError> {
        if !(0..=9999).contains(&year) {
            return Err(MonthKeyError(format!("{year}-{month}")));
        }
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|date| MonthKey(format!("{:04}-{:02}", date.year(), date.month())))
            .ok_or_else(|| MonthKeyError(format!("{year}-{month}")))
    }

    pub fn parse(raw: &str) -> Result<Self, MonthKeyError> {
        let raw = raw.trim();
        if raw.len() != 7 {
            return Err(MonthKeyError(raw.to_string()));
        }
        let date = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
            .map_err(|_| MonthKeyError(raw.to_string()))?;
        Self::new(date.year(), date.month())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn year(&self) -> i32 {
        self.0[..4].parse().unwrap_or_default()
    }

    pub fn month(&self) -> u32 {
        self.0[5..].parse().unwrap_or_default()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MonthKey {
    type Err = MonthKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MonthKey::parse(s)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = MonthKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MonthKey::parse(&value)
    }
}

impl From<MonthKey> for String {
    fn from(value: MonthKey) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthKeyError(pub String);

impl fmt::Display for MonthKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid month key (expected YYYY-MM): {}", self.0)
    }
}

impl std::error::Error for MonthKeyError {}

/// A categorized transaction as served by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Server-assigned identifier
    pub id: i64,
    /// Booking date as reported by the bank statement
    pub date: String,
    pub description: String,
    pub category: Category,
    /// Signed amount; spending is positive in summaries
    pub amount: Decimal,
    /// Statement format the transaction was imported from
    pub account_type: String,
}

/// Per-category spend for one month.
///
/// `remaining`, `percentage_used` and `over_budget` are always derived from
/// `spent` and `budget`; values sent by the server for those fields are
/// ignored on deserialization. Entries whose derived fields do not fit a
/// `Decimal` are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CategorySummaryWire")]
pub struct CategorySummary {
    pub spent: Decimal,
    pub budget: Decimal,
    pub remaining: Decimal,
    pub percentage_used: Decimal,
    pub transaction_count: u32,
    pub over_budget: bool,
}

impl CategorySummary {
    pub fn new(spent: Decimal, budget: Decimal, transaction_count: u32) -> Result<Self, AmountOverflow> {
        let percentage_used = if budget.is_zero() {
            Decimal::ZERO
        } else {
            spent
                .checked_div(budget)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .ok_or(AmountOverflow)?
        };
        Ok(Self {
            spent,
            budget,
            remaining: budget.checked_sub(spent).ok_or(AmountOverflow)?,
            percentage_used,
            transaction_count,
            over_budget: spent > budget,
        })
    }

    /// Placeholder for a category with no spending this month
    pub fn unspent(budget: Decimal) -> Self {
        Self {
            spent: Decimal::ZERO,
            budget,
            remaining: budget,
            percentage_used: Decimal::ZERO,
            transaction_count: 0,
            over_budget: budget < Decimal::ZERO,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategorySummaryWire {
    spent: Decimal,
    budget: Decimal,
    #[serde(default)]
    transaction_count: u32,
}

impl TryFrom<CategorySummaryWire> for CategorySummary {
    type Error = AmountOverflow;

    fn try_from(wire: CategorySummaryWire) -> Result<Self, Self::Error> {
        CategorySummary::new(wire.spent, wire.budget, wire.transaction_count)
    }
}

/// An amount derived from a summary does not fit in a `Decimal`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountOverflow;

impl fmt::Display for AmountOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Amount out of range")
    }
}

impl std::error::Error for AmountOverflow {}

/// Summary of one month: exactly one entry per known category
pub type Summary = BTreeMap<Category, CategorySummary>;

/// Budget limits keyed by category. Missing categories read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BudgetMap(BTreeMap<Category, Decimal>);

impl BudgetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(&self, category: Category) -> Decimal {
        self.0.get(&category).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn set_limit(&mut self, category: Category, limit: Decimal) {
        self.0.insert(category, limit);
    }

    /// Every known category with its limit, defaults included
    pub fn limits(&self) -> impl Iterator<Item = (Category, Decimal)> + '_ {
        Category::ALL.iter().map(move |c| (*c, self.limit(*c)))
    }

    /// First category whose limit is negative, if any
    pub fn first_negative(&self) -> Option<Category> {
        self.0
            .iter()
            .find(|(_, limit)| limit.is_sign_negative() && !limit.is_zero())
            .map(|(category, _)| *category)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Category, Decimal)> for BudgetMap {
    fn from_iter<I: IntoIterator<Item = (Category, Decimal)>>(iter: I) -> Self {
        BudgetMap(iter.into_iter().collect())
    }
}

/// Bank statement layouts accepted by the upload endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountFormat {
    ChaseChecking,
    ChaseCredit,
    BankOfAmerica,
    CapitalOne,
    Discover,
    Generic,
}

impl AccountFormat {
    pub const ALL: [AccountFormat; 6] = [
        AccountFormat::ChaseChecking,
        AccountFormat::ChaseCredit,
        AccountFormat::BankOfAmerica,
        AccountFormat::CapitalOne,
        AccountFormat::Discover,
        AccountFormat::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountFormat::ChaseChecking => "chase_checking",
            AccountFormat::ChaseCredit => "chase_credit",
            AccountFormat::BankOfAmerica => "bank_of_america",
            AccountFormat::CapitalOne => "capital_one",
            AccountFormat::Discover => "discover",
            AccountFormat::Generic => "generic",
        }
    }
}

impl fmt::Display for AccountFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountFormat::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown account format: {}", s))
    }
}

/// Body of `PUT /transactions/{id}/category`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    pub category: Category,
}

/// Acknowledgement returned by write endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()) }
    }
}

/// Response of `POST /upload-csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_transactions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_transactions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error body shapes the remote service may use on non-2xx responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    /// First non-empty message carried by the body
    pub fn into_message(self) -> Option<String> {
        [self.error, self.message, self.detail]
            .into_iter()
            .flatten()
            .map(|m| m.trim().to_string())
            .find(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_category_wire_names() {
        let json = serde_json::to_string(&Category::DiningAndRestaurants).unwrap();
        assert_eq!(json, "\"Dining & Restaurants\"");

        let parsed: Category = serde_json::from_str("\"Shopping\"").unwrap();
        assert_eq!(parsed, Category::Shopping);

        assert!(serde_json::from_str::<Category>("\"Lottery\"").is_err());
    }

    #[test]
    fn test_category_from_str_is_case_insensitive() {
        assert_eq!("dining & restaurants".parse::<Category>().unwrap(), Category::DiningAndRestaurants);
        assert_eq!(" Groceries ".parse::<Category>().unwrap(), Category::Groceries);
        assert!("Gambling".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_index_follows_declaration_order() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
        assert!(Category::Groceries < Category::Other);
    }

    #[test]
    fn test_month_key_parsing() {
        let key = MonthKey::parse("2024-03").unwrap();
        assert_eq!(key.as_str(), "2024-03");
        assert_eq!(key.year(), 2024);
        assert_eq!(key.month(), 3);

        assert!(MonthKey::parse("2024-13").is_err());
        assert!(MonthKey::parse("2024-3").is_err());
        assert!(MonthKey::parse("March").is_err());
        assert!(MonthKey::parse("").is_err());
    }

    #[test]
    fn test_month_key_year_must_have_four_digits() {
        assert!(MonthKey::new(10000, 1).is_err());
        assert!(MonthKey::new(-1, 6).is_err());

        let key = MonthKey::new(9999, 12).unwrap();
        assert_eq!(key.as_str(), "9999-12");
        assert_eq!(key.year(), 9999);
        assert_eq!(MonthKey::new(7, 2).unwrap().as_str(), "0007-02");
    }

    #[test]
    fn test_month_key_ordering_is_chronological() {
        let mut months = vec![
            MonthKey::parse("2024-02").unwrap(),
            MonthKey::parse("2023-12").unwrap(),
            MonthKey::parse("2024-10").unwrap(),
        ];
        months.sort();
        let ordered: Vec<&str> = months.iter().map(|m| m.as_str()).collect();
        assert_eq!(ordered, vec!["2023-12", "2024-02", "2024-10"]);
    }

    #[test]
    fn test_month_key_serde_rejects_invalid() {
        let parsed: Vec<MonthKey> = serde_json::from_str(r#"["2024-03","2024-02"]"#).unwrap();
        assert_eq!(parsed[0].as_str(), "2024-03");
        assert!(serde_json::from_str::<MonthKey>("\"2024-00\"").is_err());
    }

    #[test]
    fn test_transaction_uses_camel_case_wire_fields() {
        let json = r#"{
            "id": 7,
            "date": "2024-03-04",
            "description": "Corner store",
            "category": "Shopping",
            "amount": 42.5,
            "accountType": "chase_credit"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.id, 7);
        assert_eq!(tx.category, Category::Shopping);
        assert_eq!(tx.amount, dec!(42.5));
        assert_eq!(tx.account_type, "chase_credit");
    }

    #[test]
    fn test_category_summary_derives_fields() {
        let summary = CategorySummary::new(dec!(75), dec!(100), 3).unwrap();
        assert_eq!(summary.remaining, dec!(25));
        assert_eq!(summary.percentage_used, dec!(75));
        assert!(!summary.over_budget);

        let over = CategorySummary::new(dec!(120), dec!(100), 1).unwrap();
        assert_eq!(over.remaining, dec!(-20));
        assert!(over.over_budget);
    }

    #[test]
    fn test_category_summary_zero_budget_has_zero_percentage() {
        let summary = CategorySummary::new(dec!(12), Decimal::ZERO, 2).unwrap();
        assert_eq!(summary.percentage_used, Decimal::ZERO);
        assert!(summary.over_budget);
    }

    #[test]
    fn test_category_summary_ignores_inconsistent_server_fields() {
        let json = r#"{
            "Groceries": {
                "spent": 80,
                "budget": 100,
                "remaining": 999,
                "percentageUsed": 1,
                "transactionCount": 4,
                "overBudget": true
            }
        }"#;
        let summary: Summary = serde_json::from_str(json).unwrap();
        let groceries = &summary[&Category::Groceries];
        assert_eq!(groceries.remaining, dec!(20));
        assert_eq!(groceries.percentage_used, dec!(80));
        assert_eq!(groceries.transaction_count, 4);
        assert!(!groceries.over_budget);
    }

    #[test]
    fn test_category_summary_rejects_overflowing_amounts() {
        let json = r#"{"Groceries": {"spent": 100000000000000000000, "budget": 0.0000000001, "transactionCount": 1}}"#;
        assert!(serde_json::from_str::<Summary>(json).is_err());

        assert_eq!(CategorySummary::new(Decimal::MIN, Decimal::MAX, 0), Err(AmountOverflow));
        assert!(CategorySummary::new(Decimal::MAX, Decimal::ONE, 1).is_err());
    }

    #[test]
    fn test_unspent_summary_matches_derived_fields() {
        assert_eq!(
            CategorySummary::unspent(dec!(150)),
            CategorySummary::new(Decimal::ZERO, dec!(150), 0).unwrap()
        );
        assert_eq!(
            CategorySummary::unspent(Decimal::ZERO),
            CategorySummary::new(Decimal::ZERO, Decimal::ZERO, 0).unwrap()
        );
    }

    #[test]
    fn test_budget_map_defaults_to_zero() {
        let mut budgets = BudgetMap::new();
        budgets.set_limit(Category::Utilities, dec!(150));

        assert_eq!(budgets.limit(Category::Utilities), dec!(150));
        assert_eq!(budgets.limit(Category::Travel), Decimal::ZERO);
        assert_eq!(budgets.limits().count(), Category::ALL.len());
    }

    #[test]
    fn test_budget_map_wire_shape() {
        let budgets: BudgetMap = serde_json::from_str(r#"{"Groceries": 400, "Dining & Restaurants": 120.5}"#).unwrap();
        assert_eq!(budgets.limit(Category::Groceries), dec!(400));
        assert_eq!(budgets.limit(Category::DiningAndRestaurants), dec!(120.5));

        let value = serde_json::to_value(&budgets).unwrap();
        assert!(value.get("Dining & Restaurants").is_some());
    }

    #[test]
    fn test_budget_map_detects_negative_limits() {
        let mut budgets = BudgetMap::new();
        budgets.set_limit(Category::Housing, dec!(1200));
        assert_eq!(budgets.first_negative(), None);

        budgets.set_limit(Category::Travel, dec!(-5));
        assert_eq!(budgets.first_negative(), Some(Category::Travel));
    }

    #[test]
    fn test_account_format_round_trip_names() {
        assert_eq!("bank_of_america".parse::<AccountFormat>().unwrap(), AccountFormat::BankOfAmerica);
        assert_eq!(
            serde_json::to_string(&AccountFormat::ChaseChecking).unwrap(),
            "\"chase_checking\""
        );
        assert!("mystery_bank".parse::<AccountFormat>().is_err());
    }

    #[test]
    fn test_error_response_prefers_first_non_empty_field() {
        let body: ErrorResponse = serde_json::from_str(r#"{"error": "  ", "detail": "Token expired"}"#).unwrap();
        assert_eq!(body.into_message(), Some("Token expired".to_string()));

        assert_eq!(ErrorResponse::default().into_message(), None);
    }
}
