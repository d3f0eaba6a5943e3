use std::collections::BTreeMap;

use time::Date;
use tracing::debug;

use super::NutritionParser;
use crate::import::sources::ImportSource;
use crate::import::utils::{get_value, has_required_headers, parse_date, parse_number, RowRecord};
use crate::nutrition::{MealType, NutritionTotals, ParsedMeal, ParsedNutritionDay};

const REQUIRED_HEADERS: &[&str] = &["date", "meal", "calories"];

/// Nutrition Summary export: one pre-aggregated row per meal, no foods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MyFitnessPalParser;

impl NutritionParser for MyFitnessPalParser {
    fn source(&self) -> ImportSource {
        ImportSource::MyFitnessPal
    }

    fn detect(&self, headers: &[String]) -> bool {
        has_required_headers(headers, REQUIRED_HEADERS)
    }

    fn parse(&self, rows: &[RowRecord]) -> Vec<ParsedNutritionDay> {
        let mut days: BTreeMap<Date, BTreeMap<MealType, NutritionTotals>> = BTreeMap::new();

        for row in rows {
            let Some(date) = parse_date(&get_value(row, &["Date"])) else {
                continue;
            };
            let meal_type = MealType::from_label(&get_value(row, &["Meal"]));
            let totals = NutritionTotals::new(
                parse_number(&get_value(row, &["Calories"])),
                parse_number(&get_value(row, &["Protein (g)", "Protein"])),
                parse_number(&get_value(row, &["Carbohydrates (g)", "Carbs (g)", "Carbohydrates"])),
                parse_number(&get_value(row, &["Fat (g)", "Fat"])),
            );

            *days.entry(date).or_default().entry(meal_type).or_default() += totals;
        }

        debug!(days = days.len(), rows = rows.len(), "parsed myfitnesspal export");

        days.into_iter()
            .map(|(date, meals)| {
                let meals = meals
                    .into_iter()
                    .map(|(meal_type, totals)| ParsedMeal::totals_only(meal_type, totals))
                    .collect();
                ParsedNutritionDay::from_meals(date, meals)
            })
            .collect()
    }
}
