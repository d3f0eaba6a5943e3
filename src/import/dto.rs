use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::nutrition::ParsedNutritionDay;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    DailyTotals,
    IndividualFoods,
}

/// Lifecycle of an import session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    #[default]
    Pending,
    Analyzing,
    Ready,
    Importing,
    Completed,
    Error,
}

impl ImportStatus {
    /// Legal edges of the session state machine. `Ready` may also be entered
    /// straight from `Pending` (or re-entered) when pre-parsed days are supplied.
    pub fn can_transition_to(self, next: ImportStatus) -> bool {
        use ImportStatus::*;
        matches!(
            (self, next),
            (Pending, Analyzing)
                | (Pending, Ready)
                | (Ready, Ready)
                | (Analyzing, Ready)
                | (Analyzing, Error)
                | (Ready, Importing)
                | (Importing, Completed)
                | (Importing, Error)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Error)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Analyzing => "analyzing",
            ImportStatus::Ready => "ready",
            ImportStatus::Importing => "importing",
            ImportStatus::Completed => "completed",
            ImportStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    /// Leave stored entries alone.
    #[default]
    Skip,
    /// Delete stored entries for the date, then insert.
    Overwrite,
    /// Insert next to stored entries. No duplicate suppression.
    Merge,
}

impl FromStr for ConflictResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            "merge" => Ok(Self::Merge),
            other => Err(format!("unknown conflict resolution '{other}'")),
        }
    }
}

/// A date that already has stored entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportConflict {
    pub date: Date,
    pub existing: ParsedNutritionDay,
    pub incoming: ParsedNutritionDay,
    pub resolution: Option<ConflictResolution>,
}

/// A problem tied to part of the import. Recorded, never raised.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ImportError {
    pub fn for_date(date: Date, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            date: Some(date),
            line: None,
            field: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub imported_days: usize,
    pub skipped_days: usize,
    pub merged_days: usize,
    pub errors: Vec<ImportError>,
}
