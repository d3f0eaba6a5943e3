mod batch;
mod memory;
mod repo;
mod repo_types;

use async_trait::async_trait;
use time::Date;

pub use batch::{build_insert_batches, InsertBatch, SqlValue, ENTRY_COLUMNS, MAX_ROWS_PER_INSERT};
pub use memory::InMemoryEntryStore;
pub use repo::PgEntryStore;
pub use repo_types::{day_from_entries, FoodEntry, NewFoodEntry};

/// Day-indexed food log storage for one user.
///
/// Inserts go out as chunked multi-row statements (see [`build_insert_batches`]),
/// one chunk at a time.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Cheap round trip used before an import starts writing.
    async fn check_available(&self) -> anyhow::Result<()>;

    async fn entries_for_date(&self, date: Date) -> anyhow::Result<Vec<FoodEntry>>;

    /// All chunks land together or not at all. Returns the number of rows written.
    async fn insert_entries(&self, entries: &[NewFoodEntry]) -> anyhow::Result<usize>;

    /// Deletes everything on `date` and inserts `entries`, atomically.
    async fn replace_entries_for_date(
        &self,
        date: Date,
        entries: &[NewFoodEntry],
    ) -> anyhow::Result<usize>;
}
