use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::import::utils::at_noon;
use crate::nutrition::{MealType, NutritionTotals, ParsedFood, ParsedMeal, ParsedNutritionDay};

/// A stored food log line.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FoodEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_date: Date,
    pub logged_at: PrimitiveDateTime,
    pub meal_type: Option<String>,
    pub food_name: String,
    pub amount: Option<String>,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub created_at: OffsetDateTime,
}

/// A row about to be inserted. The owning user is supplied by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFoodEntry {
    pub entry_date: Date,
    pub logged_at: PrimitiveDateTime,
    pub meal_type: Option<MealType>,
    pub food_name: String,
    pub amount: Option<String>,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

impl NewFoodEntry {
    fn new(
        date: Date,
        meal_type: Option<MealType>,
        food_name: String,
        amount: Option<String>,
        totals: NutritionTotals,
    ) -> Self {
        Self {
            entry_date: date,
            logged_at: at_noon(date),
            meal_type,
            food_name,
            amount,
            calories: totals.calories,
            protein_g: totals.protein,
            carbs_g: totals.carbs,
            fat_g: totals.fat,
        }
    }

    /// Flattens a parsed day into rows: one per food, one per totals-only meal,
    /// or a single "Daily total" row when the day has no meals.
    pub fn from_day(day: &ParsedNutritionDay) -> Vec<Self> {
        if day.meals.is_empty() {
            return vec![Self::new(day.date, None, "Daily total".into(), None, day.totals)];
        }

        let mut rows = Vec::with_capacity(day.food_count().max(day.meals.len()));
        for meal in &day.meals {
            match meal.foods.as_deref() {
                Some(foods) if !foods.is_empty() => {
                    rows.extend(foods.iter().map(|f| {
                        Self::new(day.date, Some(meal.meal_type), f.name.clone(), f.amount.clone(), f.totals())
                    }));
                }
                _ => rows.push(Self::new(
                    day.date,
                    Some(meal.meal_type),
                    format!("{} total", meal.meal_type.display_name()),
                    None,
                    meal.totals,
                )),
            }
        }
        rows
    }
}

impl FoodEntry {
    fn totals(&self) -> NutritionTotals {
        NutritionTotals::new(self.calories, self.protein_g, self.carbs_g, self.fat_g)
    }
}

/// Rebuilds the day a user already has on record, for conflict review.
pub fn day_from_entries(date: Date, entries: &[FoodEntry]) -> ParsedNutritionDay {
    if entries.iter().all(|e| e.meal_type.is_none()) {
        let totals = entries.iter().map(FoodEntry::totals).sum();
        return ParsedNutritionDay::totals_only(date, totals);
    }

    let mut meals: Vec<(MealType, Vec<ParsedFood>)> = Vec::new();
    for entry in entries {
        let meal_type = entry
            .meal_type
            .as_deref()
            .map(MealType::from_label)
            .unwrap_or(MealType::Snack);
        let food = ParsedFood {
            name: entry.food_name.clone(),
            amount: entry.amount.clone(),
            calories: entry.calories,
            protein: entry.protein_g,
            carbs: entry.carbs_g,
            fat: entry.fat_g,
        };
        match meals.iter_mut().find(|(m, _)| *m == meal_type) {
            Some((_, foods)) => foods.push(food),
            None => meals.push((meal_type, vec![food])),
        }
    }

    let meals = meals
        .into_iter()
        .map(|(meal_type, foods)| ParsedMeal::from_foods(meal_type, foods))
        .collect();
    ParsedNutritionDay::from_meals(date, meals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn stored(meal: Option<&str>, name: &str, calories: f64) -> FoodEntry {
        FoodEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            entry_date: date!(2024 - 06 - 01),
            logged_at: datetime!(2024-06-01 12:00),
            meal_type: meal.map(str::to_string),
            food_name: name.into(),
            amount: None,
            calories,
            protein_g: 1.0,
            carbs_g: 2.0,
            fat_g: 3.0,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn totals_only_day_becomes_single_row_at_noon() {
        let day = ParsedNutritionDay::totals_only(
            date!(2024 - 06 - 01),
            NutritionTotals::new(1800.0, 100.0, 200.0, 50.0),
        );
        let rows = NewFoodEntry::from_day(&day);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].meal_type, None);
        assert_eq!(rows[0].food_name, "Daily total");
        assert_eq!(rows[0].logged_at, datetime!(2024-06-01 12:00));
    }

    #[test]
    fn foods_and_meal_totals_become_rows() {
        let day = ParsedNutritionDay::from_meals(
            date!(2024 - 06 - 01),
            vec![
                ParsedMeal::totals_only(MealType::Lunch, NutritionTotals::new(600.0, 30.0, 60.0, 20.0)),
                ParsedMeal::from_foods(
                    MealType::Breakfast,
                    vec![
                        ParsedFood { name: "Egg".into(), amount: Some("2 large".into()), calories: 140.0, protein: 12.0, carbs: 1.0, fat: 10.0 },
                        ParsedFood { name: "Toast".into(), amount: None, calories: 80.0, protein: 3.0, carbs: 15.0, fat: 1.0 },
                    ],
                ),
            ],
        );
        let rows = NewFoodEntry::from_day(&day);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].food_name, "Egg");
        assert_eq!(rows[0].amount.as_deref(), Some("2 large"));
        assert_eq!(rows[2].food_name, "Lunch total");
        assert_eq!(rows[2].meal_type, Some(MealType::Lunch));
    }

    #[test]
    fn stored_entries_rebuild_a_day() {
        let entries = vec![
            stored(Some("dinner"), "Pasta", 700.0),
            stored(Some("breakfast"), "Cereal", 250.0),
            stored(Some("dinner"), "Salad", 90.0),
        ];
        let day = day_from_entries(date!(2024 - 06 - 01), &entries);

        assert_eq!(day.meals.len(), 2);
        assert_eq!(day.meals[0].meal_type, MealType::Breakfast);
        assert_eq!(day.meals[1].totals.calories, 790.0);
        assert_eq!(day.totals.calories, 1040.0);

        let totals_only = day_from_entries(date!(2024 - 06 - 01), &[stored(None, "Daily total", 1900.0)]);
        assert!(totals_only.meals.is_empty());
        assert_eq!(totals_only.totals.calories, 1900.0);
    }
}
