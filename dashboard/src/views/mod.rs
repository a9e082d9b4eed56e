//! # Derived Views
//!
//! Pure, synchronous functions turning store state into chart-ready series,
//! totals and per-category status classifications. Nothing here holds state;
//! the store calls [`build_views`] after every change to its summary.

mod series;
mod status;
mod totals;

use serde::Serialize;
use shared::{AmountOverflow, Category, Summary};
use std::collections::BTreeMap;

pub use series::{to_bar_series, to_pie_series, BarEntry, PieSlice, BAR_LABEL_MAX_CHARS, PALETTE};
pub use status::{status_of, BudgetStatus, APPROACHING_THRESHOLD, LIMIT_THRESHOLD};
pub use totals::{totals_of, Totals};

/// Everything the dashboard and budget screens render from one summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedViews {
    pub totals: Totals,
    pub pie: Vec<PieSlice>,
    pub bar: Vec<BarEntry>,
    pub statuses: BTreeMap<Category, BudgetStatus>,
}

pub fn build_views(summary: &Summary) -> Result<DerivedViews, AmountOverflow> {
    Ok(DerivedViews {
        totals: totals_of(summary)?,
        pie: to_pie_series(summary),
        bar: to_bar_series(summary),
        statuses: summary
            .iter()
            .map(|(category, entry)| (*category, status_of(entry)))
            .collect(),
    })
}
