use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::batch::{build_insert_batches, MAX_ROWS_PER_INSERT};
use super::repo_types::{FoodEntry, NewFoodEntry};
use super::EntryStore;
use crate::import::utils::format_date_key;

#[derive(Default)]
struct State {
    entries: Vec<FoodEntry>,
    insert_calls: Vec<usize>,
    failing_dates: HashSet<Date>,
    offline: bool,
}

/// Process-local store. Runs inserts through the same chunking as the database
/// store and records the bound-value count of every statement it "executes".
pub struct InMemoryEntryStore {
    user_id: Uuid,
    state: Mutex<State>,
}

impl InMemoryEntryStore {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| anyhow!("entry store lock poisoned"))
    }

    /// Every write touching `date` fails from now on.
    pub fn fail_writes_for(&self, date: Date) {
        if let Ok(mut s) = self.lock() {
            s.failing_dates.insert(date);
        }
    }

    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut s) = self.lock() {
            s.offline = offline;
        }
    }

    /// Bound values per executed INSERT, in order.
    pub fn insert_calls(&self) -> Vec<usize> {
        self.lock().map(|s| s.insert_calls.clone()).unwrap_or_default()
    }

    pub fn entries(&self) -> Vec<FoodEntry> {
        self.lock().map(|s| s.entries.clone()).unwrap_or_default()
    }

    fn write(&self, state: &mut State, entries: &[NewFoodEntry]) -> anyhow::Result<usize> {
        if state.offline {
            bail!("entry store offline");
        }
        if let Some(e) = entries.iter().find(|e| state.failing_dates.contains(&e.entry_date)) {
            bail!("write rejected for {}", format_date_key(e.entry_date));
        }

        let batches = build_insert_batches(self.user_id, entries);
        for (batch, chunk) in batches.iter().zip(entries.chunks(MAX_ROWS_PER_INSERT)) {
            state.insert_calls.push(batch.values.len());
            let now = OffsetDateTime::now_utc();
            state.entries.extend(chunk.iter().map(|e| FoodEntry {
                id: Uuid::new_v4(),
                user_id: self.user_id,
                entry_date: e.entry_date,
                logged_at: e.logged_at,
                meal_type: e.meal_type.map(|m| m.as_str().to_string()),
                food_name: e.food_name.clone(),
                amount: e.amount.clone(),
                calories: e.calories,
                protein_g: e.protein_g,
                carbs_g: e.carbs_g,
                fat_g: e.fat_g,
                created_at: now,
            }));
        }
        Ok(entries.len())
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn check_available(&self) -> anyhow::Result<()> {
        if self.lock()?.offline {
            bail!("entry store offline");
        }
        Ok(())
    }

    async fn entries_for_date(&self, date: Date) -> anyhow::Result<Vec<FoodEntry>> {
        let state = self.lock()?;
        if state.offline {
            bail!("entry store offline");
        }
        Ok(state
            .entries
            .iter()
            .filter(|e| e.entry_date == date)
            .cloned()
            .collect())
    }

    async fn insert_entries(&self, entries: &[NewFoodEntry]) -> anyhow::Result<usize> {
        let mut state = self.lock()?;
        self.write(&mut state, entries)
    }

    async fn replace_entries_for_date(
        &self,
        date: Date,
        entries: &[NewFoodEntry],
    ) -> anyhow::Result<usize> {
        let mut state = self.lock()?;
        if state.failing_dates.contains(&date) {
            bail!("write rejected for {}", format_date_key(date));
        }
        let kept: Vec<FoodEntry> = state
            .entries
            .iter()
            .filter(|e| e.entry_date != date)
            .cloned()
            .collect();
        let previous = std::mem::replace(&mut state.entries, kept);
        match self.write(&mut state, entries) {
            Ok(n) => Ok(n),
            Err(e) => {
                state.entries = previous;
                Err(e)
            }
        }
    }
}
