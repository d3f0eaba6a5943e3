use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::{debug, warn};

use super::{NutritionParser, UNNAMED_FOOD};
use crate::import::sources::ImportSource;
use crate::import::utils::{
    format_date_key, get_value, has_required_headers, parse_date, parse_number, RowRecord,
};
use crate::nutrition::{MealType, NutritionTotals, ParsedFood, ParsedMeal, ParsedNutritionDay};

const REQUIRED_HEADERS: &[&str] = &["date", "meal type", "food name", "calories"];

pub const BACKUP_HEADERS: [&str; 8] = [
    "Date",
    "Meal Type",
    "Food Name",
    "Amount",
    "Calories",
    "Protein (g)",
    "Carbs (g)",
    "Fat (g)",
];

pub const BACKUP_VERSION: u32 = 1;

/// JSON form of a backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPayload {
    pub version: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub exported_at: OffsetDateTime,
    pub days: Vec<ParsedNutritionDay>,
}

/// This app's own export. Rows come in three shapes:
/// a food (food name set), a totals-only meal (meal type set, no food name), or a
/// day-level total (neither set).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupParser;

#[derive(Default)]
struct MealRows {
    foods: Vec<ParsedFood>,
    totals: NutritionTotals,
    totals_rows: usize,
}

impl MealRows {
    /// A meal with foods keeps any stray totals rows as one extra unnamed food.
    fn into_meal(mut self, date: Date, meal_type: MealType) -> ParsedMeal {
        if self.foods.is_empty() {
            return ParsedMeal::totals_only(meal_type, self.totals);
        }
        if self.totals_rows > 0 {
            warn!(
                date = %format_date_key(date),
                meal = meal_type.as_str(),
                rows = self.totals_rows,
                "meal totals rows alongside foods, kept as an unnamed food"
            );
            self.foods.push(ParsedFood {
                name: UNNAMED_FOOD.to_string(),
                amount: None,
                calories: self.totals.calories,
                protein: self.totals.protein,
                carbs: self.totals.carbs,
                fat: self.totals.fat,
            });
        }
        ParsedMeal::from_foods(meal_type, self.foods)
    }
}

#[derive(Default)]
struct DayRows {
    meals: BTreeMap<MealType, MealRows>,
    totals: NutritionTotals,
    totals_rows: usize,
}

impl DayRows {
    fn into_day(mut self, date: Date) -> ParsedNutritionDay {
        if self.meals.is_empty() {
            return ParsedNutritionDay::totals_only(date, self.totals);
        }
        // Day-level rows next to meals have nowhere else to go.
        if self.totals_rows > 0 {
            let snack = self.meals.entry(MealType::Snack).or_default();
            snack.totals += self.totals;
            snack.totals_rows += self.totals_rows;
        }
        let meals = self
            .meals
            .into_iter()
            .map(|(meal_type, m)| m.into_meal(date, meal_type))
            .collect();
        ParsedNutritionDay::from_meals(date, meals)
    }
}

impl BackupParser {
    pub fn parse_json(&self, text: &str) -> Result<Vec<ParsedNutritionDay>, serde_json::Error> {
        let payload: BackupPayload = serde_json::from_str(text)?;
        debug!(
            version = payload.version,
            days = payload.days.len(),
            "parsed json backup"
        );
        let mut days = payload.days;
        days.sort_by_key(|d| d.date);
        Ok(days)
    }
}

impl NutritionParser for BackupParser {
    fn source(&self) -> ImportSource {
        ImportSource::Backup
    }

    fn detect(&self, headers: &[String]) -> bool {
        has_required_headers(headers, REQUIRED_HEADERS)
    }

    fn parse(&self, rows: &[RowRecord]) -> Vec<ParsedNutritionDay> {
        let mut days: BTreeMap<Date, DayRows> = BTreeMap::new();

        for row in rows {
            let Some(date) = parse_date(&get_value(row, &["Date"])) else {
                continue;
            };
            let totals = NutritionTotals::new(
                parse_number(&get_value(row, &["Calories"])),
                parse_number(&get_value(row, &["Protein (g)"])),
                parse_number(&get_value(row, &["Carbs (g)"])),
                parse_number(&get_value(row, &["Fat (g)"])),
            );
            let meal_label = get_value(row, &["Meal Type"]);
            let name = get_value(row, &["Food Name"]);
            let day = days.entry(date).or_default();

            if meal_label.is_empty() && name.is_empty() {
                day.totals += totals;
                day.totals_rows += 1;
                continue;
            }

            let meal = day.meals.entry(MealType::from_label(&meal_label)).or_default();
            if name.is_empty() {
                meal.totals += totals;
                meal.totals_rows += 1;
            } else {
                let amount = get_value(row, &["Amount"]);
                meal.foods.push(ParsedFood {
                    name,
                    amount: (!amount.is_empty()).then_some(amount),
                    calories: totals.calories,
                    protein: totals.protein,
                    carbs: totals.carbs,
                    fat: totals.fat,
                });
            }
        }

        days.into_iter()
            .map(|(date, rows)| rows.into_day(date))
            .collect()
    }
}

fn write_row<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    cells: [&str; 4],
    totals: &NutritionTotals,
) -> Result<(), csv::Error> {
    let [date, meal, name, amount] = cells;
    writer.write_record([
        date.to_string(),
        meal.to_string(),
        name.to_string(),
        amount.to_string(),
        totals.calories.to_string(),
        totals.protein.to_string(),
        totals.carbs.to_string(),
        totals.fat.to_string(),
    ])
}

/// Writes days in the backup CSV layout.
pub fn export_backup_csv(days: &[ParsedNutritionDay]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(BACKUP_HEADERS)?;

    for day in days {
        let date = format_date_key(day.date);
        if day.meals.is_empty() {
            write_row(&mut writer, [&date, "", "", ""], &day.totals)?;
            continue;
        }

        for meal in &day.meals {
            let meal_name = meal.meal_type.display_name();
            match meal.foods.as_deref() {
                Some(foods) if !foods.is_empty() => {
                    for food in foods {
                        let amount = food.amount.as_deref().unwrap_or_default();
                        // A blank name would read back as a meal totals row.
                        let name = match food.name.trim() {
                            "" => UNNAMED_FOOD,
                            name => name,
                        };
                        write_row(&mut writer, [&date, meal_name, name, amount], &food.totals())?;
                    }
                }
                _ => write_row(&mut writer, [&date, meal_name, "", ""], &meal.totals)?,
            }
        }
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn export_backup_json(days: &[ParsedNutritionDay]) -> Result<String, serde_json::Error> {
    let payload = BackupPayload {
        version: BACKUP_VERSION,
        exported_at: OffsetDateTime::now_utc(),
        days: days.to_vec(),
    };
    serde_json::to_string_pretty(&payload)
}
