use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use super::repo_types::NewFoodEntry;

/// Rows per multi-row INSERT. Keeps a statement at 500 bound parameters.
pub const MAX_ROWS_PER_INSERT: usize = 50;

pub const ENTRY_COLUMNS: [&str; 10] = [
    "user_id",
    "entry_date",
    "logged_at",
    "meal_type",
    "food_name",
    "amount",
    "calories",
    "protein_g",
    "carbs_g",
    "fat_g",
];

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Uuid(Uuid),
    Date(Date),
    Timestamp(PrimitiveDateTime),
    Text(Option<String>),
    Float(f64),
}

/// One multi-row INSERT and its positional values.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertBatch {
    pub sql: String,
    pub values: Vec<SqlValue>,
    pub rows: usize,
}

fn row_values(user_id: Uuid, e: &NewFoodEntry) -> [SqlValue; 10] {
    [
        SqlValue::Uuid(user_id),
        SqlValue::Date(e.entry_date),
        SqlValue::Timestamp(e.logged_at),
        SqlValue::Text(e.meal_type.map(|m| m.as_str().to_string())),
        SqlValue::Text(Some(e.food_name.clone())),
        SqlValue::Text(e.amount.clone()),
        SqlValue::Float(e.calories),
        SqlValue::Float(e.protein_g),
        SqlValue::Float(e.carbs_g),
        SqlValue::Float(e.fat_g),
    ]
}

fn insert_sql(rows: usize) -> String {
    let width = ENTRY_COLUMNS.len();
    let tuples: Vec<String> = (0..rows)
        .map(|r| {
            let params: Vec<String> = (1..=width).map(|c| format!("${}", r * width + c)).collect();
            format!("({})", params.join(", "))
        })
        .collect();
    format!(
        "INSERT INTO food_entries ({}) VALUES {}",
        ENTRY_COLUMNS.join(", "),
        tuples.join(", ")
    )
}

/// Splits `entries` into INSERT statements of at most [`MAX_ROWS_PER_INSERT`] rows.
/// No entries, no statements.
pub fn build_insert_batches(user_id: Uuid, entries: &[NewFoodEntry]) -> Vec<InsertBatch> {
    entries
        .chunks(MAX_ROWS_PER_INSERT)
        .map(|chunk| InsertBatch {
            sql: insert_sql(chunk.len()),
            values: chunk.iter().flat_map(|e| row_values(user_id, e)).collect(),
            rows: chunk.len(),
        })
        .collect()
}
