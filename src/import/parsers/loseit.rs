use tracing::debug;

use super::{DayBuilder, NutritionParser, UNNAMED_FOOD};
use crate::import::sources::ImportSource;
use crate::import::utils::{get_value, has_required_headers, parse_date, parse_number, RowRecord};
use crate::nutrition::{MealType, ParsedFood, ParsedNutritionDay};

const REQUIRED_HEADERS: &[&str] = &["date", "name", "type", "calories"];

/// Weekly spreadsheet export. Food and exercise rows share one sheet and there is
/// no meal grouping, so each date becomes a single `Snack` meal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoseItParser;

fn is_exercise(row: &RowRecord) -> bool {
    get_value(row, &["Type"]).eq_ignore_ascii_case("exercise")
}

impl NutritionParser for LoseItParser {
    fn source(&self) -> ImportSource {
        ImportSource::LoseIt
    }

    fn detect(&self, headers: &[String]) -> bool {
        has_required_headers(headers, REQUIRED_HEADERS)
    }

    fn parse(&self, rows: &[RowRecord]) -> Vec<ParsedNutritionDay> {
        let mut builder = DayBuilder::default();
        let mut exercise_rows = 0usize;

        for row in rows {
            // Exercise calories are burned, not eaten; they never offset food.
            if is_exercise(row) {
                exercise_rows += 1;
                continue;
            }
            let Some(date) = parse_date(&get_value(row, &["Date"])) else {
                continue;
            };

            let quantity = get_value(row, &["Quantity"]);
            let units = get_value(row, &["Units"]);
            let amount = format!("{quantity} {units}").trim().to_string();

            let name = get_value(row, &["Name"]);
            let food = ParsedFood {
                name: if name.is_empty() { UNNAMED_FOOD.to_string() } else { name },
                amount: (!amount.is_empty()).then_some(amount),
                calories: parse_number(&get_value(row, &["Calories"])),
                protein: parse_number(&get_value(row, &["Protein (g)", "Protein"])),
                carbs: parse_number(&get_value(row, &["Carbohydrates (g)", "Carbs (g)"])),
                fat: parse_number(&get_value(row, &["Fat (g)", "Fat"])),
            };
            builder.push_food(date, MealType::Snack, food);
        }

        debug!(rows = rows.len(), exercise_rows, "parsed lose it! export");
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::parsers::test_rows::{headers, row};
    use time::macros::date;

    fn line(date: &str, kind: &str, name: &str, calories: &str) -> RowRecord {
        row(&[
            ("Date", date),
            ("Name", name),
            ("Type", kind),
            ("Quantity", "1"),
            ("Units", "Each"),
            ("Calories", calories),
            ("Protein (g)", "1"),
        ])
    }

    #[test]
    fn detection_needs_type_column() {
        let p = LoseItParser;
        assert!(p.detect(&headers(&["Date", "Name", "Type", "Quantity", "Units", "Calories"])));
        assert!(!p.detect(&headers(&["Date", "Name", "Calories"])));
    }

    #[test]
    fn exercise_rows_are_dropped_not_subtracted() {
        let rows = vec![
            line("03/15/2024", "Food", "Banana", "105"),
            line("03/15/2024", "Exercise", "Running", "-280"),
            line("03/15/2024", "Food", "Chicken Sandwich", "281"),
        ];

        let days = LoseItParser.parse(&rows);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].totals.calories, 386.0);
        assert_eq!(days[0].totals.protein, 2.0);
    }

    #[test]
    fn exercise_only_day_is_absent() {
        let rows = vec![line("03/15/2024", "Exercise", "Running", "-280")];
        assert!(LoseItParser.parse(&rows).is_empty());

        let rows = vec![
            line("03/15/2024", "Exercise", "Running", "-280"),
            line("03/16/2024", "Food", "Apple", "95"),
        ];
        let days = LoseItParser.parse(&rows);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, date!(2024 - 03 - 16));
    }

    #[test]
    fn each_day_has_one_snack_meal_summing_its_foods() {
        let rows = vec![
            line("12/31/2023", "Food", "Bagel", "270"),
            line("12/31/2023", "Food", "Coffee", "5"),
            line("01/01/2024", "food", "Soup", "180"),
        ];

        let days = LoseItParser.parse(&rows);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, date!(2023 - 12 - 31));
        assert_eq!(days[1].date, date!(2024 - 01 - 01));
        for day in &days {
            assert_eq!(day.meals.len(), 1);
            assert_eq!(day.meals[0].meal_type, MealType::Snack);
            assert_eq!(day.meals[0].totals, day.totals);
        }
        assert_eq!(days[0].totals.calories, 275.0);
        let foods = days[0].meals[0].foods.as_ref().unwrap();
        assert_eq!(foods[0].name, "Bagel");
        assert_eq!(foods[0].amount.as_deref(), Some("1 Each"));
    }

    #[test]
    fn blank_name_gets_a_placeholder() {
        let rows = vec![
            line("03/15/2024", "Food", "", "100"),
            line("03/15/2024", "Food", "Apple", "95"),
        ];

        let days = LoseItParser.parse(&rows);

        let foods = days[0].meals[0].foods.as_ref().unwrap();
        assert_eq!(foods.len(), 2);
        assert_eq!(foods[0].name, UNNAMED_FOOD);
        assert_eq!(days[0].totals.calories, 195.0);
    }
}
