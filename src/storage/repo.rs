use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgArguments, query::Query, PgPool, Postgres};
use time::Date;
use tracing::debug;
use uuid::Uuid;

use super::batch::{build_insert_batches, InsertBatch, SqlValue};
use super::repo_types::{FoodEntry, NewFoodEntry};
use super::EntryStore;

/// `food_entries` table scoped to a single user.
#[derive(Clone)]
pub struct PgEntryStore {
    db: PgPool,
    user_id: Uuid,
}

impl PgEntryStore {
    pub fn new(db: PgPool, user_id: Uuid) -> Self {
        Self { db, user_id }
    }
}

fn bind_batch(batch: &InsertBatch) -> Query<'_, Postgres, PgArguments> {
    batch
        .values
        .iter()
        .fold(sqlx::query(&batch.sql), |q, value| match value {
            SqlValue::Uuid(v) => q.bind(*v),
            SqlValue::Date(v) => q.bind(*v),
            SqlValue::Timestamp(v) => q.bind(*v),
            SqlValue::Text(v) => q.bind(v.clone()),
            SqlValue::Float(v) => q.bind(*v),
        })
}

#[async_trait]
impl EntryStore for PgEntryStore {
    async fn check_available(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.db)
            .await
            .context("ping database")?;
        Ok(())
    }

    async fn entries_for_date(&self, date: Date) -> anyhow::Result<Vec<FoodEntry>> {
        let rows = sqlx::query_as::<_, FoodEntry>(
            r#"
            SELECT id, user_id, entry_date, logged_at, meal_type, food_name, amount,
                   calories, protein_g, carbs_g, fat_g, created_at
              FROM food_entries
             WHERE user_id = $1 AND entry_date = $2
             ORDER BY logged_at ASC, created_at ASC
            "#,
        )
        .bind(self.user_id)
        .bind(date)
        .fetch_all(&self.db)
        .await
        .context("list food entries by date")?;
        Ok(rows)
    }

    async fn insert_entries(&self, entries: &[NewFoodEntry]) -> anyhow::Result<usize> {
        let batches = build_insert_batches(self.user_id, entries);
        if batches.is_empty() {
            return Ok(0);
        }

        let mut tx = self.db.begin().await.context("begin tx")?;
        let mut written = 0;
        for batch in &batches {
            bind_batch(batch)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("insert {} food entries", batch.rows))?;
            written += batch.rows;
        }
        tx.commit().await.context("commit tx")?;

        debug!(user_id = %self.user_id, written, "food entries inserted");
        Ok(written)
    }

    async fn replace_entries_for_date(
        &self,
        date: Date,
        entries: &[NewFoodEntry],
    ) -> anyhow::Result<usize> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        sqlx::query("DELETE FROM food_entries WHERE user_id = $1 AND entry_date = $2")
            .bind(self.user_id)
            .bind(date)
            .execute(&mut *tx)
            .await
            .context("delete food entries by date")?;

        let mut written = 0;
        for batch in build_insert_batches(self.user_id, entries) {
            bind_batch(&batch)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("insert {} food entries", batch.rows))?;
            written += batch.rows;
        }

        tx.commit().await.context("commit tx")?;
        Ok(written)
    }
}
