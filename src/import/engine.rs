use std::collections::HashMap;

use time::Date;
use tracing::{debug, info, instrument, warn};

use super::dto::{ConflictResolution, ImportConflict, ImportError, ImportResult, ImportType};
use super::session::NutritionImportSession;
use super::utils::format_date_key;
use crate::nutrition::ParsedNutritionDay;
use crate::storage::{day_from_entries, EntryStore, NewFoodEntry};

/// How to treat dates that already have stored entries.
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    /// Applied to every conflict without an explicit choice.
    pub default_resolution: ConflictResolution,
    /// Per-date choices made while reviewing conflicts.
    pub resolutions: HashMap<Date, ConflictResolution>,
}

impl CommitOptions {
    pub fn with_default(default_resolution: ConflictResolution) -> Self {
        Self {
            default_resolution,
            resolutions: HashMap::new(),
        }
    }

    pub fn resolve(mut self, date: Date, resolution: ConflictResolution) -> Self {
        self.resolutions.insert(date, resolution);
        self
    }

    pub fn resolution_for(&self, date: Date) -> ConflictResolution {
        self.resolutions
            .get(&date)
            .copied()
            .unwrap_or(self.default_resolution)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayOutcome {
    Imported,
    Skipped,
    Merged,
}

/// Lists the parsed days that collide with stored data. Read-only.
pub async fn find_conflicts<S>(
    store: &S,
    days: &[ParsedNutritionDay],
) -> anyhow::Result<Vec<ImportConflict>>
where
    S: EntryStore + ?Sized,
{
    let mut conflicts = Vec::new();
    for day in days {
        let existing = store.entries_for_date(day.date).await?;
        if existing.is_empty() {
            continue;
        }
        conflicts.push(ImportConflict {
            date: day.date,
            existing: day_from_entries(day.date, &existing),
            incoming: day.clone(),
            resolution: None,
        });
    }
    Ok(conflicts)
}

fn rows_for(day: &ParsedNutritionDay, import_type: ImportType) -> Vec<NewFoodEntry> {
    match import_type {
        ImportType::IndividualFoods => NewFoodEntry::from_day(day),
        ImportType::DailyTotals => NewFoodEntry::from_day(&day.without_foods()),
    }
}

async fn commit_day<S>(
    store: &S,
    day: &ParsedNutritionDay,
    import_type: ImportType,
    options: &CommitOptions,
) -> anyhow::Result<DayOutcome>
where
    S: EntryStore + ?Sized,
{
    let existing = store.entries_for_date(day.date).await?;
    let rows = rows_for(day, import_type);

    if existing.is_empty() {
        store.insert_entries(&rows).await?;
        return Ok(DayOutcome::Imported);
    }

    let conflict = ImportConflict {
        date: day.date,
        existing: day_from_entries(day.date, &existing),
        incoming: day.clone(),
        resolution: Some(options.resolution_for(day.date)),
    };
    debug!(
        date = %format_date_key(conflict.date),
        existing_kcal = conflict.existing.totals.calories,
        incoming_kcal = conflict.incoming.totals.calories,
        resolution = ?conflict.resolution,
        "conflict"
    );

    match conflict.resolution.unwrap_or_default() {
        ConflictResolution::Skip => Ok(DayOutcome::Skipped),
        ConflictResolution::Overwrite => {
            store.replace_entries_for_date(day.date, &rows).await?;
            Ok(DayOutcome::Imported)
        }
        ConflictResolution::Merge => {
            store.insert_entries(&rows).await?;
            Ok(DayOutcome::Merged)
        }
    }
}

/// Writes every parsed day of `session`, one after another.
///
/// A day that fails is recorded against its date and the rest carry on. The
/// session's counters advance as each day finishes.
#[instrument(skip_all, fields(session_id = %session.id, days = session.parsed_days.len()))]
pub async fn commit_session<S>(
    store: &S,
    session: &mut NutritionImportSession,
    options: &CommitOptions,
) -> ImportResult
where
    S: EntryStore + ?Sized,
{
    let mut result = ImportResult::default();

    for i in 0..session.parsed_days.len() {
        let date = session.parsed_days[i].date;
        let outcome = commit_day(store, &session.parsed_days[i], session.import_type, options).await;
        session.processed_days += 1;

        match outcome {
            Ok(DayOutcome::Imported) => {
                result.imported_days += 1;
                session.imported_days += 1;
            }
            Ok(DayOutcome::Merged) => {
                result.merged_days += 1;
                session.merged_days += 1;
            }
            Ok(DayOutcome::Skipped) => {
                result.skipped_days += 1;
                session.skipped_days += 1;
            }
            Err(e) => {
                warn!(date = %format_date_key(date), error = %e, "day import failed");
                result
                    .errors
                    .push(ImportError::for_date(date, format!("{e:#}")));
            }
        }
    }

    result.success = result.errors.is_empty();
    info!(
        imported = result.imported_days,
        merged = result.merged_days,
        skipped = result.skipped_days,
        errors = result.errors.len(),
        "import committed"
    );
    result
}
