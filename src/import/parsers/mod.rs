mod backup;
mod cronometer;
mod loseit;
mod macrofactor;
mod myfitnesspal;

use std::collections::BTreeMap;

use time::Date;

use crate::import::sources::ImportSource;
use crate::import::utils::RowRecord;
use crate::nutrition::{MealType, ParsedFood, ParsedMeal, ParsedNutritionDay};

pub use backup::{export_backup_csv, export_backup_json, BackupParser, BackupPayload};
pub use cronometer::CronometerParser;
pub use loseit::LoseItParser;
pub use macrofactor::MacroFactorParser;
pub use myfitnesspal::MyFitnessPalParser;

/// Stored name for a food row whose name cell was blank.
pub const UNNAMED_FOOD: &str = "Unnamed food";

/// Capabilities every source format provides.
pub trait NutritionParser {
    fn source(&self) -> ImportSource;

    /// Pure function of the header row; rows are never inspected.
    fn detect(&self, headers: &[String]) -> bool;

    /// Never fails: bad cells default, rows without a usable date are dropped.
    fn parse(&self, rows: &[RowRecord]) -> Vec<ParsedNutritionDay>;
}

/// The closed set of supported formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceParser {
    MyFitnessPal(MyFitnessPalParser),
    Cronometer(CronometerParser),
    LoseIt(LoseItParser),
    MacroFactor(MacroFactorParser),
    Backup(BackupParser),
}

impl SourceParser {
    pub fn for_source(source: ImportSource) -> Self {
        match source {
            ImportSource::MyFitnessPal => Self::MyFitnessPal(MyFitnessPalParser),
            ImportSource::Cronometer => Self::Cronometer(CronometerParser),
            ImportSource::LoseIt => Self::LoseIt(LoseItParser),
            ImportSource::MacroFactor => Self::MacroFactor(MacroFactorParser),
            ImportSource::Backup => Self::Backup(BackupParser),
        }
    }

    fn inner(&self) -> &dyn NutritionParser {
        match self {
            Self::MyFitnessPal(p) => p,
            Self::Cronometer(p) => p,
            Self::LoseIt(p) => p,
            Self::MacroFactor(p) => p,
            Self::Backup(p) => p,
        }
    }
}

impl NutritionParser for SourceParser {
    fn source(&self) -> ImportSource {
        self.inner().source()
    }

    fn detect(&self, headers: &[String]) -> bool {
        self.inner().detect(headers)
    }

    fn parse(&self, rows: &[RowRecord]) -> Vec<ParsedNutritionDay> {
        self.inner().parse(rows)
    }
}

/// Accumulates foods per date and meal, then folds them into days.
#[derive(Debug, Default)]
pub(crate) struct DayBuilder {
    days: BTreeMap<Date, BTreeMap<MealType, Vec<ParsedFood>>>,
}

impl DayBuilder {
    pub(crate) fn push_food(&mut self, date: Date, meal_type: MealType, food: ParsedFood) {
        self.days
            .entry(date)
            .or_default()
            .entry(meal_type)
            .or_default()
            .push(food);
    }

    pub(crate) fn contains(&self, date: &Date) -> bool {
        self.days.contains_key(date)
    }

    pub(crate) fn build(self) -> Vec<ParsedNutritionDay> {
        self.days
            .into_iter()
            .map(|(date, meals)| {
                let meals = meals
                    .into_iter()
                    .map(|(meal_type, foods)| ParsedMeal::from_foods(meal_type, foods))
                    .collect();
                ParsedNutritionDay::from_meals(date, meals)
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_rows {
    use crate::import::utils::RowRecord;

    pub(crate) fn row(pairs: &[(&str, &str)]) -> RowRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub(crate) fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }
}
