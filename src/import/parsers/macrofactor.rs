use std::collections::BTreeMap;

use time::Date;
use tracing::debug;

use super::{DayBuilder, NutritionParser};
use crate::import::sources::ImportSource;
use crate::import::utils::{get_value, has_required_headers, parse_date, parse_number, RowRecord};
use crate::nutrition::{MealType, NutritionTotals, ParsedFood, ParsedNutritionDay};

const REQUIRED_HEADERS: &[&str] = &["date", "calories (kcal)", "protein (g)"];

/// Handles both the Quick Export nutrition sheet (one totals row per day) and the
/// food log export (one row per food).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MacroFactorParser;

fn row_totals(row: &RowRecord) -> NutritionTotals {
    NutritionTotals::new(
        parse_number(&get_value(row, &["Calories (kcal)", "Calories"])),
        parse_number(&get_value(row, &["Protein (g)"])),
        parse_number(&get_value(row, &["Carbs (g)"])),
        parse_number(&get_value(row, &["Fat (g)"])),
    )
}

impl NutritionParser for MacroFactorParser {
    fn source(&self) -> ImportSource {
        ImportSource::MacroFactor
    }

    fn detect(&self, headers: &[String]) -> bool {
        has_required_headers(headers, REQUIRED_HEADERS)
    }

    fn parse(&self, rows: &[RowRecord]) -> Vec<ParsedNutritionDay> {
        let mut foods = DayBuilder::default();
        let mut daily: BTreeMap<Date, NutritionTotals> = BTreeMap::new();

        for row in rows {
            let Some(date) = parse_date(&get_value(row, &["Date"])) else {
                continue;
            };
            let totals = row_totals(row);
            let name = get_value(row, &["Food Name", "Food"]);

            if name.is_empty() {
                *daily.entry(date).or_default() += totals;
                continue;
            }

            let serving = get_value(row, &["Serving Size", "Amount"]);
            let food = ParsedFood {
                name,
                amount: (!serving.is_empty()).then_some(serving),
                calories: totals.calories,
                protein: totals.protein,
                carbs: totals.carbs,
                fat: totals.fat,
            };
            foods.push_food(date, MealType::from_label(&get_value(row, &["Meal"])), food);
        }

        // Food rows carry more detail than a daily summary of the same date.
        daily.retain(|date, _| !foods.contains(date));
        debug!(
            rows = rows.len(),
            totals_days = daily.len(),
            "parsed macrofactor export"
        );

        let mut days = foods.build();
        days.extend(
            daily
                .into_iter()
                .map(|(date, totals)| ParsedNutritionDay::totals_only(date, totals)),
        );
        days.sort_by_key(|d| d.date);
        days
    }
}
