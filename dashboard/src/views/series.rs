use rust_decimal::Decimal;
use serde::Serialize;
use shared::{Category, Summary};

/// Slice colors, assigned by category position modulo palette size
pub const PALETTE: [&str; 8] = [
    "#3b82f6", "#ef4444", "#10b981", "#f59e0b", "#8b5cf6", "#ec4899", "#14b8a6", "#f97316",
];

/// Bar labels longer than this many characters are shortened for display
pub const BAR_LABEL_MAX_CHARS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub category: Category,
    pub label: String,
    pub value: Decimal,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarEntry {
    /// Untruncated key for lookups and edits
    pub category: Category,
    /// Display label, possibly truncated
    pub label: String,
    pub budget: Decimal,
    pub spent: Decimal,
}

/// Spend per category, one slice per summary entry
pub fn to_pie_series(summary: &Summary) -> Vec<PieSlice> {
    summary
        .iter()
        .map(|(category, entry)| PieSlice {
            category: *category,
            label: category.as_str().to_string(),
            value: entry.spent,
            color: palette_color(*category),
        })
        .collect()
}

/// Budget against spend per category
pub fn to_bar_series(summary: &Summary) -> Vec<BarEntry> {
    summary
        .iter()
        .map(|(category, entry)| BarEntry {
            category: *category,
            label: truncate_label(category.as_str(), BAR_LABEL_MAX_CHARS),
            budget: entry.budget,
            spent: entry.spent,
        })
        .collect()
}

fn palette_color(category: Category) -> &'static str {
    PALETTE[category.index() % PALETTE.len()]
}

fn truncate_label(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let mut label: String = name.chars().take(max_chars).collect();
    label.push_str("...");
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::CategorySummary;

    fn summary_of(categories: &[Category]) -> Summary {
        categories
            .iter()
            .map(|c| (*c, CategorySummary::new(dec!(10), dec!(20), 1).unwrap()))
            .collect()
    }

    #[test]
    fn test_pie_series_values_are_spend() {
        let mut summary = summary_of(&[Category::Groceries, Category::Housing]);
        summary.insert(Category::Housing, CategorySummary::new(dec!(1500), dec!(1500), 1).unwrap());

        let pie = to_pie_series(&summary);

        assert_eq!(pie.len(), 2);
        assert_eq!(pie[0].category, Category::Groceries);
        assert_eq!(pie[0].value, dec!(10));
        assert_eq!(pie[1].value, dec!(1500));
    }

    #[test]
    fn test_pie_colors_follow_palette_cycle() {
        let summary = summary_of(&Category::ALL);
        let pie = to_pie_series(&summary);

        for slice in &pie {
            assert_eq!(slice.color, PALETTE[slice.category.index() % PALETTE.len()]);
        }
        // Categories eight apart share a color
        assert_eq!(pie[0].color, pie[PALETTE.len()].color);
    }

    #[test]
    fn test_pie_colors_are_stable_across_recomputations() {
        let full = to_pie_series(&summary_of(&Category::ALL));
        let partial = to_pie_series(&summary_of(&[Category::Shopping, Category::Travel]));

        let color_in = |series: &[PieSlice], category: Category| {
            series.iter().find(|s| s.category == category).map(|s| s.color)
        };
        assert_eq!(color_in(&full, Category::Shopping), color_in(&partial, Category::Shopping));
        assert_eq!(color_in(&full, Category::Travel), color_in(&partial, Category::Travel));
    }

    #[test]
    fn test_bar_labels_truncate_without_touching_keys() {
        let summary = summary_of(&[Category::DiningAndRestaurants, Category::Housing]);
        let bar = to_bar_series(&summary);

        let dining = &bar[0];
        assert_eq!(dining.category, Category::DiningAndRestaurants);
        assert_eq!(dining.label, "Dining & Res...");
        assert_eq!(dining.category.as_str(), "Dining & Restaurants");

        assert_eq!(bar[1].label, "Housing");
        assert_eq!(bar[1].budget, dec!(20));
        assert_eq!(bar[1].spent, dec!(10));
    }

    #[test]
    fn test_truncate_label_boundaries() {
        assert_eq!(truncate_label("Subscriptions", 13), "Subscriptions");
        assert_eq!(truncate_label("Subscriptions", 12), "Subscription...");
        assert_eq!(truncate_label("Entertainment", 12), "Entertainmen...");
        assert_eq!(truncate_label("", 12), "");
    }
}
