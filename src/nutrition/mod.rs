mod dto;

pub use dto::{MealType, NutritionTotals, ParsedFood, ParsedMeal, ParsedNutritionDay};
