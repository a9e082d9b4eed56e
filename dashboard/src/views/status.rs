use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use shared::CategorySummary;

/// Usage above this percentage is `Approaching`
pub const APPROACHING_THRESHOLD: Decimal = dec!(70);
/// Usage above this percentage is `AtOrOverLimit`
pub const LIMIT_THRESHOLD: Decimal = dec!(90);

/// Budget health of one category, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum BudgetStatus {
    OnTrack,
    Approaching,
    AtOrOverLimit,
}

impl BudgetStatus {
    /// Progress bar color
    pub fn color(&self) -> &'static str {
        match self {
            BudgetStatus::OnTrack => "#22c55e",
            BudgetStatus::Approaching => "#eab308",
            BudgetStatus::AtOrOverLimit => "#ef4444",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            BudgetStatus::OnTrack => "✓",
            BudgetStatus::Approaching => "!",
            BudgetStatus::AtOrOverLimit => "✗",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BudgetStatus::OnTrack => "On track",
            BudgetStatus::Approaching => "Approaching limit",
            BudgetStatus::AtOrOverLimit => "At or over limit",
        }
    }
}

/// Classify a category by how much of its budget is used.
///
/// Bands include their lower boundary: exactly 70% is still on track and
/// exactly 90% is still approaching.
pub fn status_of(summary: &CategorySummary) -> BudgetStatus {
    if summary.over_budget || summary.percentage_used > LIMIT_THRESHOLD {
        BudgetStatus::AtOrOverLimit
    } else if summary.percentage_used > APPROACHING_THRESHOLD {
        BudgetStatus::Approaching
    } else {
        BudgetStatus::OnTrack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_percentage(p: Decimal) -> CategorySummary {
        CategorySummary::new(p, dec!(100), 1).unwrap()
    }

    #[test]
    fn test_boundaries_belong_to_lower_band() {
        assert_eq!(status_of(&at_percentage(dec!(70.0))), BudgetStatus::OnTrack);
        assert_eq!(status_of(&at_percentage(dec!(70.01))), BudgetStatus::Approaching);
        assert_eq!(status_of(&at_percentage(dec!(90.0))), BudgetStatus::Approaching);
        assert_eq!(status_of(&at_percentage(dec!(90.01))), BudgetStatus::AtOrOverLimit);
    }

    #[test]
    fn test_over_budget_flag_wins() {
        // Zero budget reports 0% used but any spend is over budget
        let summary = CategorySummary::new(dec!(5), Decimal::ZERO, 1).unwrap();
        assert_eq!(summary.percentage_used, Decimal::ZERO);
        assert_eq!(status_of(&summary), BudgetStatus::AtOrOverLimit);
    }

    #[test]
    fn test_unused_budget_is_on_track() {
        assert_eq!(status_of(&CategorySummary::new(Decimal::ZERO, Decimal::ZERO, 0).unwrap()), BudgetStatus::OnTrack);
        assert_eq!(status_of(&at_percentage(Decimal::ZERO)), BudgetStatus::OnTrack);
    }

    #[test]
    fn test_classification_is_monotonic() {
        // Sweep 0%..150% in 0.25% steps
        let mut previous = BudgetStatus::OnTrack;
        for step in 0..=600 {
            let p = Decimal::from(step) / dec!(4);
            let status = status_of(&at_percentage(p));
            assert!(status >= previous, "status dropped from {:?} to {:?} at {}%", previous, status, p);
            previous = status;
        }
        assert_eq!(previous, BudgetStatus::AtOrOverLimit);
    }

    #[test]
    fn test_presentation_helpers_are_distinct() {
        let all = [BudgetStatus::OnTrack, BudgetStatus::Approaching, BudgetStatus::AtOrOverLimit];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.color(), b.color());
                assert_ne!(a.label(), b.label());
            }
        }
    }
}
