use rust_decimal::Decimal;
use serde::Serialize;
use shared::{AmountOverflow, Summary};

/// Month totals: always the fold of the loaded summary, never fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total_spent: Decimal,
    pub total_budget: Decimal,
    pub remaining: Decimal,
}

/// Fails only when a sum leaves the `Decimal` range
pub fn totals_of(summary: &Summary) -> Result<Totals, AmountOverflow> {
    let (total_spent, total_budget) = summary
        .values()
        .try_fold((Decimal::ZERO, Decimal::ZERO), |(spent, budget), entry| {
            Some((spent.checked_add(entry.spent)?, budget.checked_add(entry.budget)?))
        })
        .ok_or(AmountOverflow)?;
    Ok(Totals {
        total_spent,
        total_budget,
        remaining: total_budget.checked_sub(total_spent).ok_or(AmountOverflow)?,
    })
}
