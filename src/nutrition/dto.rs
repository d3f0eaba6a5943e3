use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use time::Date;

time::serde::format_description!(date_key, Date, "[year]-[month]-[day]");

/// Canonical meal slot. Declaration order is the order meals appear within a day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Map a source-specific meal label onto the canonical taxonomy.
    /// Anything unrecognised ("Snacks", "Uncategorized", "Meal 5") lands in `Snack`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        if label.contains("breakfast") {
            Self::Breakfast
        } else if label.contains("lunch") {
            Self::Lunch
        } else if label.contains("dinner") || label.contains("supper") {
            Self::Dinner
        } else {
            Self::Snack
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::Snack => "Snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calories (kcal) and macros (g) for a food, meal or day.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct NutritionTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl NutritionTotals {
    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fat,
        }
    }
}

impl Add for NutritionTotals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
        }
    }
}

impl AddAssign for NutritionTotals {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for NutritionTotals {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// One food line within a meal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFood {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl ParsedFood {
    pub fn totals(&self) -> NutritionTotals {
        NutritionTotals::new(self.calories, self.protein, self.carbs, self.fat)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMeal {
    pub meal_type: MealType,
    pub totals: NutritionTotals,
    /// `None` for sources that only export meal totals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foods: Option<Vec<ParsedFood>>,
}

impl ParsedMeal {
    /// Meal whose totals are the sum of its foods.
    pub fn from_foods(meal_type: MealType, foods: Vec<ParsedFood>) -> Self {
        let totals = foods.iter().map(ParsedFood::totals).sum();
        Self {
            meal_type,
            totals,
            foods: Some(foods),
        }
    }

    pub fn totals_only(meal_type: MealType, totals: NutritionTotals) -> Self {
        Self {
            meal_type,
            totals,
            foods: None,
        }
    }
}

/// The unit of import: everything eaten on one calendar date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedNutritionDay {
    #[serde(with = "date_key")]
    pub date: Date,
    pub meals: Vec<ParsedMeal>,
    pub totals: NutritionTotals,
}

impl ParsedNutritionDay {
    /// Builds a day from its meals, ordering them canonically and deriving day totals.
    pub fn from_meals(date: Date, mut meals: Vec<ParsedMeal>) -> Self {
        meals.sort_by_key(|m| m.meal_type);
        let totals = meals.iter().map(|m| m.totals).sum();
        Self {
            date,
            meals,
            totals,
        }
    }

    /// Day reported only as a daily total, with no meal breakdown.
    pub fn totals_only(date: Date, totals: NutritionTotals) -> Self {
        Self {
            date,
            meals: Vec::new(),
            totals,
        }
    }

    pub fn has_foods(&self) -> bool {
        self.meals
            .iter()
            .any(|m| m.foods.as_ref().is_some_and(|f| !f.is_empty()))
    }

    pub fn food_count(&self) -> usize {
        self.meals
            .iter()
            .filter_map(|m| m.foods.as_ref())
            .map(Vec::len)
            .sum()
    }

    /// Same day with food detail dropped; meal and day totals are kept.
    pub fn without_foods(&self) -> Self {
        Self {
            date: self.date,
            meals: self
                .meals
                .iter()
                .map(|m| ParsedMeal::totals_only(m.meal_type, m.totals))
                .collect(),
            totals: self.totals,
        }
    }
}
