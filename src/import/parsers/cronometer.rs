use tracing::debug;

use super::{DayBuilder, NutritionParser};
use crate::import::sources::ImportSource;
use crate::import::utils::{get_value, has_required_headers, parse_date, parse_number, RowRecord};
use crate::nutrition::{MealType, ParsedFood, ParsedNutritionDay};

const REQUIRED_HEADERS: &[&str] = &["day", "group", "food name", "energy (kcal)"];

/// "Food & Recipe Entries" export: one row per food, grouped into meals by `Group`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CronometerParser;

impl NutritionParser for CronometerParser {
    fn source(&self) -> ImportSource {
        ImportSource::Cronometer
    }

    fn detect(&self, headers: &[String]) -> bool {
        has_required_headers(headers, REQUIRED_HEADERS)
    }

    fn parse(&self, rows: &[RowRecord]) -> Vec<ParsedNutritionDay> {
        let mut builder = DayBuilder::default();
        let mut dropped = 0usize;

        for row in rows {
            let name = get_value(row, &["Food Name"]);
            let date = parse_date(&get_value(row, &["Day", "Date"]));
            let (Some(date), false) = (date, name.is_empty()) else {
                dropped += 1;
                continue;
            };

            let amount = get_value(row, &["Amount"]);
            let food = ParsedFood {
                name,
                amount: (!amount.is_empty()).then_some(amount),
                calories: parse_number(&get_value(row, &["Energy (kcal)", "Calories"])),
                protein: parse_number(&get_value(row, &["Protein (g)"])),
                carbs: parse_number(&get_value(row, &["Carbs (g)", "Net Carbs (g)"])),
                fat: parse_number(&get_value(row, &["Fat (g)"])),
            };
            let meal_type = MealType::from_label(&get_value(row, &["Group"]));
            builder.push_food(date, meal_type, food);
        }

        debug!(rows = rows.len(), dropped, "parsed cronometer export");
        builder.build()
    }
}
