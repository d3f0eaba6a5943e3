use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::csv_input::read_csv;
use super::detector::{detect_parser, get_parser};
use super::dto::{ConflictResolution, ImportConflict, ImportResult, ImportStatus, ImportType};
use super::engine::{commit_session, find_conflicts, CommitOptions};
use super::parsers::{BackupParser, NutritionParser, SourceParser};
use super::sources::ImportSource;
use crate::error::{PipelineError, Result};
use crate::nutrition::ParsedNutritionDay;
use crate::storage::EntryStore;

/// One import attempt, from file selection to result. Lives in memory only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionImportSession {
    pub id: Uuid,
    pub source: Option<ImportSource>,
    pub import_type: ImportType,
    pub status: ImportStatus,
    pub file_name: Option<String>,
    /// Header row of the analysed file, kept for troubleshooting failed detection.
    pub headers: Vec<String>,
    #[serde(skip)]
    pub parsed_days: Vec<ParsedNutritionDay>,
    pub total_days: usize,
    pub processed_days: usize,
    pub imported_days: usize,
    pub skipped_days: usize,
    pub merged_days: usize,
    pub error: Option<String>,
    pub result: Option<ImportResult>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl NutritionImportSession {
    pub fn new(file_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: None,
            import_type: ImportType::DailyTotals,
            status: ImportStatus::Pending,
            file_name,
            headers: Vec::new(),
            parsed_days: Vec::new(),
            total_days: 0,
            processed_days: 0,
            imported_days: 0,
            skipped_days: 0,
            merged_days: 0,
            error: None,
            result: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Moves to `next` if the state machine allows it.
    pub fn transition(&mut self, next: ImportStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn set_ready(
        &mut self,
        source: ImportSource,
        import_type: ImportType,
        days: Vec<ParsedNutritionDay>,
    ) -> Result<()> {
        self.transition(ImportStatus::Ready)?;
        self.source = Some(source);
        self.import_type = import_type;
        self.total_days = days.len();
        self.parsed_days = days;
        self.processed_days = 0;
        self.imported_days = 0;
        self.skipped_days = 0;
        self.merged_days = 0;
        self.error = None;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.transition(ImportStatus::Error)?;
        self.error = Some(message.into());
        Ok(())
    }

    pub fn complete(&mut self, result: ImportResult) -> Result<()> {
        self.transition(ImportStatus::Completed)?;
        self.result = Some(result);
        Ok(())
    }

    pub fn date_range(&self) -> Option<(time::Date, time::Date)> {
        let first = self.parsed_days.iter().map(|d| d.date).min()?;
        let last = self.parsed_days.iter().map(|d| d.date).max()?;
        Some((first, last))
    }
}

/// Individual foods when the source exports them and the file actually has them.
fn default_import_type(source: ImportSource, days: &[ParsedNutritionDay]) -> ImportType {
    if source.config().supports_individual_foods && days.iter().any(|d| d.has_foods()) {
        ImportType::IndividualFoods
    } else {
        ImportType::DailyTotals
    }
}

fn decode(content: &[u8]) -> String {
    String::from_utf8_lossy(content)
        .trim_start_matches('\u{feff}')
        .to_string()
}

fn looks_like_json(text: &str) -> bool {
    text.trim_start().starts_with('{')
}

/// Reads the file with an explicit parser, or detects one from its headers.
fn parse_content(
    text: &str,
    parser: Option<SourceParser>,
    headers_out: &mut Vec<String>,
) -> Result<(ImportSource, Vec<ParsedNutritionDay>)> {
    if text.trim().is_empty() {
        return Err(PipelineError::EmptyFile);
    }

    let json_backup = matches!(parser, None | Some(SourceParser::Backup(_)));
    if json_backup && looks_like_json(text) {
        return Ok((ImportSource::Backup, BackupParser.parse_json(text)?));
    }

    let table = read_csv(text)?;
    *headers_out = table.headers.clone();

    let parser = match parser {
        Some(p) => p,
        None => {
            detect_parser(&table.headers)
                .ok_or_else(|| PipelineError::UnrecognizedFormat {
                    headers: table.headers.clone(),
                })?
                .parser
        }
    };
    Ok((parser.source(), parser.parse(&table.rows)))
}

/// Drives the single live import session.
pub struct ImportSessionManager<S: EntryStore + ?Sized> {
    store: Arc<S>,
    session: Option<NutritionImportSession>,
    default_resolution: ConflictResolution,
}

impl<S: EntryStore + ?Sized> ImportSessionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            session: None,
            default_resolution: ConflictResolution::default(),
        }
    }

    /// Policy for conflicts the user didn't decide individually.
    pub fn with_default_resolution(mut self, resolution: ConflictResolution) -> Self {
        self.default_resolution = resolution;
        self
    }

    /// Starting point for [`commit`](Self::commit), carrying the configured default.
    pub fn commit_options(&self) -> CommitOptions {
        CommitOptions::with_default(self.default_resolution)
    }

    pub fn session(&self) -> Option<&NutritionImportSession> {
        self.session.as_ref()
    }

    fn session_mut(&mut self) -> Result<&mut NutritionImportSession> {
        self.session.as_mut().ok_or(PipelineError::NoSession)
    }

    /// Starts a fresh session, discarding whatever was in flight.
    pub fn start_session(&mut self, file_name: Option<String>) -> &NutritionImportSession {
        let session = NutritionImportSession::new(file_name);
        info!(session_id = %session.id, file = ?session.file_name, "import session started");
        self.session.insert(session)
    }

    /// Abandons the session from any state. Nothing already written is undone.
    pub fn discard(&mut self) -> Option<NutritionImportSession> {
        self.session.take()
    }

    /// Auto-detects the format of `content` and parses it.
    pub async fn analyze_file(&mut self, content: Bytes) -> Result<&NutritionImportSession> {
        self.analyze(content, None).await
    }

    /// Retry path after failed detection: the user names the source.
    pub async fn analyze_with_source(
        &mut self,
        source: ImportSource,
        content: Bytes,
    ) -> Result<&NutritionImportSession> {
        self.analyze(content, Some(get_parser(source))).await
    }

    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn analyze(
        &mut self,
        content: Bytes,
        parser: Option<SourceParser>,
    ) -> Result<&NutritionImportSession> {
        let session = self.session_mut()?;
        session.transition(ImportStatus::Analyzing)?;

        let text = decode(&content);
        drop(content);

        let mut headers = Vec::new();
        let parsed = parse_content(&text, parser, &mut headers);
        session.headers = headers;

        let outcome = parsed.and_then(|(source, days)| {
            if days.is_empty() {
                Err(PipelineError::NoDays { format: source })
            } else {
                Ok((source, days))
            }
        });

        match outcome {
            Ok((source, days)) => {
                let import_type = default_import_type(source, &days);
                info!(%source, days = days.len(), ?import_type, "file analyzed");
                session.set_ready(source, import_type, days)?;
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, headers = ?session.headers, "file analysis failed");
                session.fail(e.to_string())?;
                Err(e)
            }
        }
    }

    /// Enters `ready` with days parsed elsewhere, e.g. a bundled sample file.
    pub fn load_parsed(
        &mut self,
        source: ImportSource,
        days: Vec<ParsedNutritionDay>,
    ) -> Result<&NutritionImportSession> {
        let session = self.session_mut()?;
        let import_type = default_import_type(source, &days);
        session.set_ready(source, import_type, days)?;
        Ok(session)
    }

    /// Switches between food-level and totals-only import while previewing.
    pub fn choose_import_type(&mut self, import_type: ImportType) -> Result<&NutritionImportSession> {
        let session = self.session_mut()?;
        if session.status != ImportStatus::Ready {
            return Err(PipelineError::InvalidTransition {
                from: session.status,
                to: ImportStatus::Ready,
            });
        }
        if import_type == ImportType::IndividualFoods {
            let source = session.source.ok_or(PipelineError::NoSession)?;
            if !source.config().supports_individual_foods {
                return Err(PipelineError::UnsupportedImportType { format: source });
            }
        }
        session.import_type = import_type;
        Ok(session)
    }

    /// Dates in the parsed file that already have stored entries.
    pub async fn find_conflicts(&self) -> Result<Vec<ImportConflict>> {
        let session = self.session.as_ref().ok_or(PipelineError::NoSession)?;
        if session.status != ImportStatus::Ready {
            return Err(PipelineError::InvalidTransition {
                from: session.status,
                to: ImportStatus::Importing,
            });
        }
        find_conflicts(&*self.store, &session.parsed_days)
            .await
            .map_err(|e| PipelineError::StorageUnavailable(format!("{e:#}")))
    }

    /// Writes the parsed days. Ends in `completed` (possibly with per-day errors)
    /// or, when storage can't be reached at all, in `error`.
    pub async fn commit(&mut self, options: CommitOptions) -> Result<&ImportResult> {
        let store = Arc::clone(&self.store);
        let session = self.session_mut()?;
        session.transition(ImportStatus::Importing)?;

        if let Err(e) = store.check_available().await {
            error!(error = %e, session_id = %session.id, "storage unavailable, aborting import");
            let err = PipelineError::StorageUnavailable(format!("{e:#}"));
            session.fail(err.to_string())?;
            return Err(err);
        }

        let result = commit_session(&*store, session, &options).await;
        session.complete(result)?;
        session.result.as_ref().ok_or(PipelineError::NoSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::dto::ConflictResolution;
    use crate::import::parsers::export_backup_json;
    use crate::nutrition::{MealType, NutritionTotals};
    use crate::storage::{InMemoryEntryStore, NewFoodEntry};
    use time::macros::date;

    const LOSE_IT_CSV: &str = "\
Date,Name,Icon,Type,Quantity,Units,Calories,Fat (g),Protein (g),Carbohydrates (g)
03/15/2024,Banana,Banana,Food,1,Each,105,0.4,1.3,27
03/15/2024,Running,Running,Exercise,30,Minutes,-280,,,
03/15/2024,Chicken Sandwich,Sandwich,Food,1,Each,281,9,20,30
03/16/2024,Walking,Walking,Exercise,45,Minutes,-150,,,
";

    const MFP_CSV: &str = "\
Date,Meal,Calories,Fat (g),Carbohydrates (g),Protein (g)
2024-01-01,Breakfast,350,12,40,20
2024-01-01,Dinner,700,25,60,45
2024-01-02,Lunch,550,18,50,35
";

    fn manager() -> (Arc<InMemoryEntryStore>, ImportSessionManager<InMemoryEntryStore>) {
        let store = Arc::new(InMemoryEntryStore::new(Uuid::new_v4()));
        (store.clone(), ImportSessionManager::new(store))
    }

    #[tokio::test]
    async fn lose_it_file_runs_to_completion() {
        let (store, mut mgr) = manager();
        mgr.start_session(Some("loseit.csv".into()));

        let session = mgr.analyze_file(Bytes::from_static(LOSE_IT_CSV.as_bytes())).await.unwrap();
        assert_eq!(session.status, ImportStatus::Ready);
        assert_eq!(session.source, Some(ImportSource::LoseIt));
        assert_eq!(session.total_days, 1);
        assert_eq!(session.parsed_days[0].totals.calories, 386.0);
        assert_eq!(session.import_type, ImportType::IndividualFoods);
        assert!(store.entries().is_empty());

        let result = mgr.commit(CommitOptions::default()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.imported_days, 1);

        let session = mgr.session().unwrap();
        assert_eq!(session.status, ImportStatus::Completed);
        assert_eq!(session.imported_days, 1);
        assert_eq!(store.entries().len(), 2);
    }

    #[tokio::test]
    async fn unrecognized_file_errors_with_headers() {
        let (_, mut mgr) = manager();
        mgr.start_session(None);

        let err = mgr
            .analyze_file(Bytes::from_static(b"Random,Headers\n1,2\n"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::UnrecognizedFormat { .. }));
        let session = mgr.session().unwrap();
        assert_eq!(session.status, ImportStatus::Error);
        assert_eq!(session.headers, vec!["Random", "Headers"]);
        assert!(session.error.as_deref().unwrap().contains("Random, Headers"));
    }

    #[tokio::test]
    async fn errored_session_cannot_import_but_new_one_can_retry() {
        let (_, mut mgr) = manager();
        mgr.start_session(None);
        let _ = mgr.analyze_file(Bytes::from_static(b"Random,Headers\n1,2\n")).await;

        let err = mgr.commit(CommitOptions::default()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition { from: ImportStatus::Error, to: ImportStatus::Importing }
        ));

        mgr.start_session(None);
        let session = mgr
            .analyze_with_source(ImportSource::MyFitnessPal, Bytes::from_static(MFP_CSV.as_bytes()))
            .await
            .unwrap();
        assert_eq!(session.status, ImportStatus::Ready);
        assert_eq!(session.total_days, 2);
        assert_eq!(session.import_type, ImportType::DailyTotals);
    }

    #[tokio::test]
    async fn all_exercise_file_has_no_days() {
        let (_, mut mgr) = manager();
        mgr.start_session(None);
        let csv = "Date,Name,Type,Calories\n03/16/2024,Walking,Exercise,-150\n";

        let err = mgr.analyze_file(Bytes::from(csv)).await.unwrap_err();

        assert!(matches!(err, PipelineError::NoDays { format: ImportSource::LoseIt }));
        assert_eq!(mgr.session().unwrap().status, ImportStatus::Error);
    }

    #[tokio::test]
    async fn json_backup_is_recognised() {
        let (_, mut mgr) = manager();
        let days = vec![ParsedNutritionDay::totals_only(
            date!(2024 - 02 - 01),
            NutritionTotals::new(2000.0, 150.0, 200.0, 70.0),
        )];
        let json = export_backup_json(&days).unwrap();
        mgr.start_session(Some("backup.json".into()));

        let session = mgr.analyze_file(Bytes::from(json)).await.unwrap();

        assert_eq!(session.source, Some(ImportSource::Backup));
        assert_eq!(session.parsed_days, days);
    }

    #[tokio::test]
    async fn empty_file_is_an_error() {
        let (_, mut mgr) = manager();
        mgr.start_session(None);
        let err = mgr.analyze_file(Bytes::from_static(b"  \n")).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyFile));
    }

    #[tokio::test]
    async fn pre_parsed_days_enter_ready_directly() {
        let (_, mut mgr) = manager();
        mgr.start_session(None);
        let days = vec![ParsedNutritionDay::totals_only(date!(2024 - 02 - 01), NutritionTotals::default())];

        let session = mgr.load_parsed(ImportSource::MacroFactor, days.clone()).unwrap();
        assert_eq!(session.status, ImportStatus::Ready);
        assert_eq!(session.import_type, ImportType::DailyTotals);

        let session = mgr.load_parsed(ImportSource::MacroFactor, days).unwrap();
        assert_eq!(session.status, ImportStatus::Ready);
    }

    #[tokio::test]
    async fn import_type_choice_respects_source() {
        let (_, mut mgr) = manager();
        mgr.start_session(None);
        mgr.analyze_file(Bytes::from_static(MFP_CSV.as_bytes())).await.unwrap();

        let err = mgr.choose_import_type(ImportType::IndividualFoods).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedImportType { .. }));

        mgr.start_session(None);
        mgr.analyze_file(Bytes::from_static(LOSE_IT_CSV.as_bytes())).await.unwrap();
        let session = mgr.choose_import_type(ImportType::DailyTotals).unwrap();
        assert_eq!(session.import_type, ImportType::DailyTotals);
    }

    #[tokio::test]
    async fn conflicts_are_listed_then_resolved() {
        let (store, mut mgr) = manager();
        let existing = ParsedNutritionDay::totals_only(date!(2024 - 01 - 01), NutritionTotals::new(1500.0, 0.0, 0.0, 0.0));
        store.insert_entries(&NewFoodEntry::from_day(&existing)).await.unwrap();
        mgr.start_session(None);
        mgr.analyze_file(Bytes::from_static(MFP_CSV.as_bytes())).await.unwrap();

        let conflicts = mgr.find_conflicts().await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].existing.totals.calories, 1500.0);
        assert_eq!(conflicts[0].incoming.totals.calories, 1050.0);

        let options = CommitOptions::default().resolve(conflicts[0].date, ConflictResolution::Overwrite);
        let result = mgr.commit(options).await.unwrap();
        assert_eq!(result.imported_days, 2);
        assert_eq!(result.skipped_days, 0);

        let day1 = store.entries_for_date(date!(2024 - 01 - 01)).await.unwrap();
        assert_eq!(day1.len(), 2);
        assert!(day1.iter().all(|e| e.meal_type.is_some()));
        assert_eq!(day1[0].food_name, "Breakfast total");
        assert_eq!(day1[0].meal_type.as_deref(), Some(MealType::Breakfast.as_str()));
    }

    #[tokio::test]
    async fn unreachable_storage_fails_the_session() {
        let (store, mut mgr) = manager();
        mgr.start_session(None);
        mgr.analyze_file(Bytes::from_static(MFP_CSV.as_bytes())).await.unwrap();
        store.set_offline(true);

        let err = mgr.commit(CommitOptions::default()).await.unwrap_err();

        assert!(matches!(err, PipelineError::StorageUnavailable(_)));
        let session = mgr.session().unwrap();
        assert_eq!(session.status, ImportStatus::Error);
        assert_eq!(session.processed_days, 0);
    }

    #[tokio::test]
    async fn no_session_is_reported() {
        let (_, mut mgr) = manager();
        let err = mgr.analyze_file(Bytes::from_static(MFP_CSV.as_bytes())).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoSession));

        mgr.start_session(None);
        assert!(mgr.discard().is_some());
        assert!(mgr.session().is_none());
    }

    #[tokio::test]
    async fn preview_reports_date_range() {
        let (_, mut mgr) = manager();
        mgr.start_session(Some("mfp.csv".into()));

        let session = mgr.analyze_file(Bytes::from_static(MFP_CSV.as_bytes())).await.unwrap();

        assert_eq!(
            session.date_range(),
            Some((date!(2024 - 01 - 01), date!(2024 - 01 - 02)))
        );
        assert_eq!(NutritionImportSession::new(None).date_range(), None);
    }

    #[tokio::test]
    async fn configured_default_resolution_applies_on_commit() {
        let store = Arc::new(InMemoryEntryStore::new(Uuid::new_v4()));
        let mut mgr = ImportSessionManager::new(store.clone())
            .with_default_resolution(ConflictResolution::Overwrite);
        let existing = ParsedNutritionDay::totals_only(date!(2024 - 01 - 01), NutritionTotals::new(1500.0, 0.0, 0.0, 0.0));
        store.insert_entries(&NewFoodEntry::from_day(&existing)).await.unwrap();
        mgr.start_session(None);
        mgr.analyze_file(Bytes::from_static(MFP_CSV.as_bytes())).await.unwrap();

        let options = mgr.commit_options();
        let result = mgr.commit(options).await.unwrap();

        assert_eq!(result.imported_days, 2);
        assert_eq!(result.skipped_days, 0);
        let day1 = store.entries_for_date(date!(2024 - 01 - 01)).await.unwrap();
        assert!(day1.iter().all(|e| e.food_name != "Daily total"));
        assert_eq!(day1.iter().map(|e| e.calories).sum::<f64>(), 1050.0);
    }
}
