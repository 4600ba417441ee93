// Builder session store - single owner of the open dashboard and its editing state
use crate::application::auto_save::{AutoSavePolicy, AutoSaveStatus};
use crate::application::concurrency::ConcurrencyGuard;
use crate::application::dashboard_api::{ApiError, ApiResult, DashboardApi};
use crate::application::error::{CONFLICT_MESSAGE, SessionError};
use crate::application::history::History;
use crate::application::layout::PendingPositions;
use crate::application::query_cache::QueryCache;
use crate::application::shortcuts::{HistoryAction, KeyChord};
use crate::application::wizard::{WizardSession, WizardStep, restore};
use crate::domain::catalog::CatalogItem;
use crate::domain::chart::TimeRange;
use crate::domain::dashboard::{Dashboard, DashboardUpdate, MetaPatch};
use crate::domain::grid::GridPosition;
use crate::domain::report::{NewReport, Placement, Report, ReportPatch, placements};
use crate::infrastructure::config::{CacheSettings, SessionSettings};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

pub type SharedSession = Arc<Mutex<SessionStore>>;

/// Editing state for a dashboard that exists server-side
#[derive(Debug, Clone)]
pub struct EditSession {
    dashboard: Dashboard,
    guard: ConcurrencyGuard,
    pending: PendingPositions,
    history: History<Vec<Placement>>,
    meta_dirty: bool,
    selected_report: Option<String>,
    report_config_open: bool,
}

impl EditSession {
    fn new(dashboard: Dashboard, history_limit: usize) -> Self {
        Self {
            guard: ConcurrencyGuard::new(&dashboard),
            dashboard,
            pending: PendingPositions::new(),
            history: History::new(history_limit),
            meta_dirty: false,
            selected_report: None,
            report_config_open: false,
        }
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn selected_report_id(&self) -> Option<&str> {
        self.selected_report.as_deref()
    }

    pub fn is_report_config_open(&self) -> bool {
        self.report_config_open
    }

    fn is_dirty(&self) -> bool {
        self.meta_dirty || !self.pending.is_empty()
    }

    fn adopt_server_copy(&mut self, dashboard: Dashboard) {
        self.guard.observe(&dashboard);
        self.dashboard = dashboard;
    }

    /// Restore a history snapshot; restored positions queue for the next commit.
    /// Returns false when nothing moved, e.g. the snapshot only covers removed reports.
    fn step_history(&mut self, action: HistoryAction) -> bool {
        let current = placements(&self.dashboard.reports);
        let snapshot = match action {
            HistoryAction::Undo => self.history.undo(current),
            HistoryAction::Redo => self.history.redo(current),
        };
        let Some(snapshot) = snapshot else {
            return false;
        };
        let changed = restore(&mut self.dashboard.reports, &snapshot);
        let moved = !changed.is_empty();
        for placement in changed {
            self.pending.insert(placement.id, placement.position);
        }
        moved
    }
}

/// What the session is currently holding; wizard and edit state never coexist
#[derive(Debug, Clone)]
pub enum SessionMode {
    Empty,
    Editing(EditSession),
    Wizard(WizardSession),
}

/// Handle for one load request; results from superseded tickets are dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    dashboard_id: String,
    generation: u64,
}

#[derive(Debug)]
pub struct LoadOutcome {
    ticket: LoadTicket,
    result: ApiResult<Dashboard>,
}

impl LoadTicket {
    pub fn dashboard_id(&self) -> &str {
        &self.dashboard_id
    }

    pub async fn fetch(self, api: &dyn DashboardApi) -> LoadOutcome {
        let result = api.fetch_dashboard(&self.dashboard_id).await;
        LoadOutcome {
            ticket: self,
            result,
        }
    }
}

/// Clears the loading flag if a `load` future is dropped before it finishes
struct PendingLoad<'a> {
    store: &'a mut SessionStore,
    generation: u64,
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        if self.store.load_generation == self.generation && self.store.is_loading {
            self.store.is_loading = false;
            self.store.touch();
        }
    }
}

pub struct SessionStore {
    api: Arc<dyn DashboardApi>,
    settings: SessionSettings,
    policy: AutoSavePolicy,
    mode: SessionMode,
    load_generation: u64,
    is_loading: bool,
    load_error: Option<SessionError>,
    is_saving: bool,
    save_error: Option<SessionError>,
    auto_save_status: AutoSaveStatus,
    auto_save_failures: u32,
    report_data: QueryCache<String, serde_json::Value>,
    changes: watch::Sender<u64>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn DashboardApi>, settings: SessionSettings, cache: CacheSettings) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            api,
            policy: settings.auto_save.policy(),
            settings,
            mode: SessionMode::Empty,
            load_generation: 0,
            is_loading: false,
            load_error: None,
            is_saving: false,
            save_error: None,
            auto_save_status: AutoSaveStatus::Idle,
            auto_save_failures: 0,
            report_data: QueryCache::new(cache.capacity, cache.ttl()),
            changes,
        }
    }

    pub fn with_defaults(api: Arc<dyn DashboardApi>) -> Self {
        Self::new(api, SessionSettings::default(), CacheSettings::default())
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    // ---- read-only view ----

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn dashboard(&self) -> Option<&Dashboard> {
        match &self.mode {
            SessionMode::Editing(edit) => Some(&edit.dashboard),
            _ => None,
        }
    }

    pub fn wizard(&self) -> Option<&WizardSession> {
        match &self.mode {
            SessionMode::Wizard(wizard) => Some(wizard),
            _ => None,
        }
    }

    pub fn is_wizard_mode(&self) -> bool {
        matches!(self.mode, SessionMode::Wizard(_))
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn load_error(&self) -> Option<&SessionError> {
        self.load_error.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        match &self.mode {
            SessionMode::Editing(edit) => edit.is_dirty(),
            _ => false,
        }
    }

    pub fn is_saving(&self) -> bool {
        self.is_saving
    }

    pub fn save_error(&self) -> Option<&SessionError> {
        self.save_error.as_ref()
    }

    pub fn save_error_status(&self) -> Option<u16> {
        self.save_error.as_ref().and_then(SessionError::status)
    }

    pub fn auto_save_status(&self) -> AutoSaveStatus {
        self.auto_save_status
    }

    pub fn auto_save_failures(&self) -> u32 {
        self.auto_save_failures
    }

    /// Status line for the auto-save indicator
    pub fn auto_save_message(&self) -> Option<&'static str> {
        let conflicted = self.save_error.as_ref().is_some_and(SessionError::is_conflict);
        if conflicted && self.auto_save_status == AutoSaveStatus::Error {
            return Some(CONFLICT_MESSAGE);
        }
        self.policy
            .status_message(self.auto_save_status, self.auto_save_failures)
    }

    pub fn selected_report_id(&self) -> Option<&str> {
        match &self.mode {
            SessionMode::Editing(edit) => edit.selected_report_id(),
            _ => None,
        }
    }

    pub fn is_report_config_open(&self) -> bool {
        match &self.mode {
            SessionMode::Editing(edit) => edit.is_report_config_open(),
            _ => false,
        }
    }

    pub fn concurrency_token(&self) -> Option<DateTime<Utc>> {
        match &self.mode {
            SessionMode::Editing(edit) => Some(edit.guard.token()),
            _ => None,
        }
    }

    pub fn can_save(&self) -> bool {
        if self.is_saving {
            return false;
        }
        match &self.mode {
            SessionMode::Editing(edit) => edit.is_dirty() && edit.dashboard.can_edit(),
            SessionMode::Wizard(wizard) => wizard.can_save(),
            SessionMode::Empty => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        match &self.mode {
            SessionMode::Editing(edit) => edit.history.can_undo(),
            _ => false,
        }
    }

    pub fn can_redo(&self) -> bool {
        match &self.mode {
            SessionMode::Editing(edit) => edit.history.can_redo(),
            _ => false,
        }
    }

    /// Monotonic counter bumped on every observable state change
    pub fn revision(&self) -> u64 {
        *self.changes.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn touch(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }

    fn editing(&self) -> Result<&EditSession, SessionError> {
        match &self.mode {
            SessionMode::Editing(edit) => Ok(edit),
            _ => Err(SessionError::NoSession),
        }
    }

    fn editing_mut(&mut self) -> Result<&mut EditSession, SessionError> {
        match &mut self.mode {
            SessionMode::Editing(edit) => Ok(edit),
            _ => Err(SessionError::NoSession),
        }
    }

    fn wizard_mut(&mut self) -> Result<&mut WizardSession, SessionError> {
        match &mut self.mode {
            SessionMode::Wizard(wizard) => Ok(wizard),
            _ => Err(SessionError::Guard("The dashboard wizard is not open".to_string())),
        }
    }

    fn reset_auto_save(&mut self) {
        self.auto_save_failures = 0;
        self.auto_save_status = AutoSaveStatus::Idle;
    }

    /// Once nothing is left to persist, auto-save may start over
    fn settle_dirty(&mut self) {
        if !self.is_dirty() {
            self.reset_auto_save();
        }
    }

    // ---- loading ----

    /// Start a load; any earlier ticket is superseded
    pub fn begin_load(&mut self, dashboard_id: &str) -> LoadTicket {
        self.load_generation += 1;
        self.is_loading = true;
        self.touch();
        LoadTicket {
            dashboard_id: dashboard_id.to_string(),
            generation: self.load_generation,
        }
    }

    /// Abandon the in-flight load, e.g. when the view goes away
    pub fn cancel_load(&mut self) {
        self.load_generation += 1;
        self.is_loading = false;
        self.touch();
    }

    /// Apply a fetched dashboard. Returns `Ok(false)` when the ticket was superseded.
    pub fn finish_load(&mut self, outcome: LoadOutcome) -> Result<bool, SessionError> {
        if outcome.ticket.generation != self.load_generation {
            tracing::debug!(dashboard = %outcome.ticket.dashboard_id, "discarding superseded load");
            return Ok(false);
        }
        self.is_loading = false;

        match outcome.result {
            Ok(dashboard) => {
                if self.dashboard().is_none_or(|current| current.id != dashboard.id) {
                    self.report_data.clear();
                }
                tracing::info!(
                    dashboard = %dashboard.id,
                    reports = dashboard.reports.len(),
                    version = dashboard.version_number,
                    "dashboard loaded"
                );
                self.mode = SessionMode::Editing(EditSession::new(dashboard, self.settings.history_limit));
                self.load_error = None;
                self.save_error = None;
                self.is_saving = false;
                self.reset_auto_save();
                self.touch();
                Ok(true)
            }
            Err(error) => {
                let err = ConcurrencyGuard::classify_load_error(error);
                tracing::warn!(dashboard = %outcome.ticket.dashboard_id, error = %err, "dashboard load failed");
                self.load_error = Some(err.clone());
                self.touch();
                Err(err)
            }
        }
    }

    /// Fetch and apply a dashboard. Dropping the future mid-fetch leaves the
    /// current state untouched and clears the loading flag.
    pub async fn load(&mut self, dashboard_id: &str) -> Result<(), SessionError> {
        let ticket = self.begin_load(dashboard_id);
        let api = Arc::clone(&self.api);
        let mut pending = PendingLoad {
            generation: ticket.generation,
            store: self,
        };
        let outcome = ticket.fetch(api.as_ref()).await;
        pending.store.finish_load(outcome).map(|_| ())
    }

    /// Reload the open dashboard, discarding unsaved local state
    pub async fn refresh(&mut self) -> Result<(), SessionError> {
        let id = self.editing()?.dashboard.id.clone();
        self.load(&id).await
    }

    // ---- dashboard fields ----

    pub fn update_meta(&mut self, patch: MetaPatch) -> Result<(), SessionError> {
        match &mut self.mode {
            SessionMode::Editing(edit) => {
                if let Some(name) = patch.name {
                    edit.dashboard.name = name;
                }
                if let Some(description) = patch.description {
                    edit.dashboard.description = Some(description);
                }
                edit.meta_dirty = true;
            }
            SessionMode::Wizard(wizard) => wizard.apply_meta(patch),
            SessionMode::Empty => return Err(SessionError::NoSession),
        }
        self.touch();
        Ok(())
    }

    /// Persist the session: finalizes the wizard, or writes pending layout and
    /// dashboard fields guarded by the concurrency token
    pub async fn save(&mut self) -> Result<(), SessionError> {
        if self.is_wizard_mode() {
            return self.finalize_wizard().await;
        }
        self.editing()?;

        let result = self.persist().await;
        match &result {
            Ok(()) => self.reset_auto_save(),
            Err(err) => self.save_error = Some(err.clone()),
        }
        self.touch();
        result
    }

    async fn persist(&mut self) -> Result<(), SessionError> {
        if !self.editing()?.pending.is_empty() {
            self.flush_layout().await?;
        }

        let (id, update) = {
            let edit = self.editing()?;
            let update = DashboardUpdate {
                name: Some(edit.dashboard.name.clone()),
                description: edit.dashboard.description.clone(),
                layout: Some(edit.dashboard.layout),
                filters: edit.dashboard.filters.clone(),
                expected_updated_at: Some(edit.guard.token()),
            };
            (edit.dashboard.id.clone(), update)
        };

        self.is_saving = true;
        self.save_error = None;
        self.touch();
        let api = Arc::clone(&self.api);
        let result = api.update_dashboard(&id, update).await;
        self.is_saving = false;

        let dashboard = result.map_err(|error| {
            let err = ConcurrencyGuard::classify_write_error(error);
            tracing::warn!(dashboard = %id, error = %err, "dashboard save failed");
            err
        })?;

        let edit = self.editing_mut()?;
        edit.adopt_server_copy(dashboard);
        edit.meta_dirty = false;
        edit.pending.clear();
        tracing::info!(dashboard = %id, version = edit.dashboard.version_number, "dashboard saved");
        Ok(())
    }

    /// Save pending changes if needed, then publish
    pub async fn publish(&mut self) -> Result<(), SessionError> {
        if self.is_dirty() {
            self.save().await?;
        }

        let (id, token) = {
            let edit = self.editing()?;
            (edit.dashboard.id.clone(), edit.guard.token())
        };
        self.is_saving = true;
        self.save_error = None;
        self.touch();
        let api = Arc::clone(&self.api);
        let result = api.publish_dashboard(&id, Some(token)).await;
        self.is_saving = false;

        let outcome = match result {
            Ok(dashboard) => {
                tracing::info!(dashboard = %id, "dashboard published");
                self.editing_mut()?.adopt_server_copy(dashboard);
                Ok(())
            }
            Err(error) => {
                let err = ConcurrencyGuard::classify_write_error(error);
                tracing::warn!(dashboard = %id, error = %err, "dashboard publish failed");
                self.save_error = Some(err.clone());
                Err(err)
            }
        };
        self.touch();
        outcome
    }

    // ---- reports ----

    pub async fn add_report(&mut self, body: NewReport) -> Result<Report, SessionError> {
        body.chart.validate()?;
        let dashboard_id = self.editing()?.dashboard.id.clone();

        let api = Arc::clone(&self.api);
        let report = api
            .create_report(&dashboard_id, body)
            .await
            .map_err(|e| mutation_failure("add report", e))?;

        let edit = self.editing_mut()?;
        edit.dashboard.upsert_report(report.clone());
        edit.guard.record_own_writes(1);
        tracing::debug!(dashboard = %dashboard_id, report = %report.id, "report added");
        self.refresh_token().await;
        self.touch();
        Ok(report)
    }

    pub async fn update_report(&mut self, report_id: &str, patch: ReportPatch) -> Result<Report, SessionError> {
        if let Some(chart) = &patch.chart {
            chart.validate()?;
        }
        let edit = self.editing()?;
        if edit.dashboard.report(report_id).is_none() {
            return Err(SessionError::UnknownReport(report_id.to_string()));
        }
        let dashboard_id = edit.dashboard.id.clone();

        let api = Arc::clone(&self.api);
        let report = api
            .update_report(&dashboard_id, report_id, patch.clone())
            .await
            .map_err(|e| mutation_failure("update report", e))?;

        let edit = self.editing_mut()?;
        if patch.position.is_some() {
            edit.pending.remove(report_id);
        }
        edit.dashboard.upsert_report(report.clone());
        edit.guard.record_own_writes(1);
        if patch.touches_query() {
            self.report_data.invalidate(&report.id);
        }
        self.refresh_token().await;
        self.settle_dirty();
        self.touch();
        Ok(report)
    }

    pub async fn remove_report(&mut self, report_id: &str) -> Result<(), SessionError> {
        if let SessionMode::Wizard(wizard) = &mut self.mode {
            wizard.remove_widget(report_id)?;
            self.touch();
            return Ok(());
        }

        let edit = self.editing()?;
        if edit.dashboard.report(report_id).is_none() {
            return Err(SessionError::UnknownReport(report_id.to_string()));
        }
        let dashboard_id = edit.dashboard.id.clone();

        let api = Arc::clone(&self.api);
        api.delete_report(&dashboard_id, report_id)
            .await
            .map_err(|e| mutation_failure("remove report", e))?;

        let edit = self.editing_mut()?;
        edit.dashboard.remove_report(report_id);
        edit.guard.record_own_writes(1);
        edit.pending.remove(report_id);
        if edit.selected_report.as_deref() == Some(report_id) {
            edit.selected_report = None;
            edit.report_config_open = false;
        }
        self.report_data.invalidate(&report_id.to_string());
        tracing::debug!(dashboard = %dashboard_id, report = %report_id, "report removed");
        self.refresh_token().await;
        self.settle_dirty();
        self.touch();
        Ok(())
    }

    /// Best-effort refresh of the concurrency token after report writes.
    /// Failures are logged and swallowed. The token only advances when the
    /// server version matches our own writes; a foreign write keeps it stale.
    async fn refresh_token(&mut self) {
        let Ok(edit) = self.editing() else {
            return;
        };
        let id = edit.dashboard.id.clone();
        let api = Arc::clone(&self.api);
        match api.fetch_dashboard(&id).await {
            Ok(latest) => {
                if let Ok(edit) = self.editing_mut() {
                    if edit.guard.reconcile(&latest) {
                        edit.dashboard.updated_at = latest.updated_at;
                        edit.dashboard.version_number = latest.version_number;
                    } else {
                        tracing::warn!(
                            dashboard = %id,
                            expected = edit.guard.version(),
                            found = latest.version_number,
                            "dashboard changed in another session; keeping concurrency token"
                        );
                    }
                }
            }
            Err(error) => {
                tracing::warn!(dashboard = %id, error = %error, "could not refresh concurrency token");
            }
        }
    }

    // ---- layout ----

    /// Optimistic local move, recorded for undo and queued for the next commit
    pub fn move_report(&mut self, report_id: &str, position: GridPosition) -> Result<(), SessionError> {
        match &mut self.mode {
            SessionMode::Wizard(wizard) => wizard.move_widget(report_id, position)?,
            SessionMode::Editing(edit) => {
                let Some(index) = edit.dashboard.reports.iter().position(|r| r.id == report_id) else {
                    return Err(SessionError::UnknownReport(report_id.to_string()));
                };
                if edit.dashboard.reports[index].position == position {
                    return Ok(());
                }
                edit.history.record(placements(&edit.dashboard.reports));
                edit.dashboard.reports[index].position = position;
                edit.pending.insert(report_id, position);
            }
            SessionMode::Empty => return Err(SessionError::NoSession),
        }
        self.touch();
        Ok(())
    }

    /// Persist every pending position as one batch of per-report writes
    pub async fn commit_layout(&mut self) -> Result<(), SessionError> {
        if !matches!(self.mode, SessionMode::Editing(_)) {
            return match self.mode {
                SessionMode::Wizard(_) => Ok(()),
                _ => Err(SessionError::NoSession),
            };
        }
        let result = self.flush_layout().await;
        match &result {
            // A conflict still needs a reload, whatever the layout did
            Ok(()) if !self.save_error.as_ref().is_some_and(SessionError::is_conflict) => {
                self.save_error = None;
            }
            Ok(()) => {}
            Err(err) => self.save_error = Some(err.clone()),
        }
        self.touch();
        result
    }

    /// Writes that fail are re-queued unless a newer move replaced them;
    /// successful writes are merged and stay committed.
    async fn flush_layout(&mut self) -> Result<(), SessionError> {
        let edit = self.editing_mut()?;
        let batch = edit.pending.take_all();
        if batch.is_empty() {
            return Ok(());
        }
        let dashboard_id = edit.dashboard.id.clone();

        self.is_saving = true;
        self.touch();
        let api = Arc::clone(&self.api);
        let results = join_all(batch.iter().map(|(report_id, position)| {
            api.update_report(&dashboard_id, report_id, ReportPatch::position(*position))
        }))
        .await;
        self.is_saving = false;

        let edit = self.editing_mut()?;
        let mut committed = 0u64;
        let mut first_error = None;
        for ((report_id, position), result) in batch.into_iter().zip(results) {
            match result {
                Ok(report) => {
                    committed += 1;
                    edit.dashboard.upsert_report(report);
                }
                Err(error) => {
                    tracing::warn!(report = %report_id, error = %error, "layout write failed");
                    edit.pending.requeue(report_id, position);
                    first_error.get_or_insert(error);
                }
            }
        }

        edit.guard.record_own_writes(committed);
        let requeued = edit.pending.len();
        if committed > 0 {
            self.refresh_token().await;
        }
        self.settle_dirty();

        match first_error {
            None => {
                tracing::debug!(dashboard = %dashboard_id, committed, "layout committed");
                Ok(())
            }
            Some(error) => {
                tracing::warn!(dashboard = %dashboard_id, committed, requeued, "layout commit incomplete");
                Err(mutation_failure("save layout", error))
            }
        }
    }

    // ---- history ----

    pub fn undo(&mut self) -> bool {
        self.step_history(HistoryAction::Undo)
    }

    pub fn redo(&mut self) -> bool {
        self.step_history(HistoryAction::Redo)
    }

    fn step_history(&mut self, action: HistoryAction) -> bool {
        let changed = match (&mut self.mode, action) {
            (SessionMode::Editing(edit), action) => edit.step_history(action),
            (SessionMode::Wizard(wizard), HistoryAction::Undo) => wizard.undo(),
            (SessionMode::Wizard(wizard), HistoryAction::Redo) => wizard.redo(),
            (SessionMode::Empty, _) => false,
        };
        if changed {
            self.touch();
        }
        changed
    }

    /// Global undo/redo chords; returns true when the history moved
    pub fn handle_shortcut(&mut self, chord: &KeyChord) -> bool {
        match HistoryAction::from_chord(chord) {
            Some(action) => self.step_history(action),
            None => false,
        }
    }

    // ---- report configurator ----

    /// Open the configurator for a report, or for a new one with `None`
    pub fn open_report_config(&mut self, report_id: Option<&str>) {
        if let SessionMode::Editing(edit) = &mut self.mode {
            edit.selected_report = report_id.map(str::to_string);
            edit.report_config_open = true;
            self.touch();
        }
    }

    pub fn close_report_config(&mut self) {
        if let SessionMode::Editing(edit) = &mut self.mode {
            edit.selected_report = None;
            edit.report_config_open = false;
            self.touch();
        }
    }

    // ---- report data cache ----

    pub fn cached_report_data(&mut self, report_id: &str) -> Option<serde_json::Value> {
        self.report_data.get(&report_id.to_string())
    }

    pub fn cache_report_data(&mut self, report_id: &str, data: serde_json::Value) {
        self.report_data.insert(report_id.to_string(), data);
    }

    // ---- auto-save ----

    /// Delay until the next auto-save attempt, or `None` when it should not run
    pub fn auto_save_delay(&self) -> Option<std::time::Duration> {
        let SessionMode::Editing(edit) = &self.mode else {
            return None;
        };
        if !edit.dashboard.is_draft() || !edit.is_dirty() || self.is_saving {
            return None;
        }
        self.policy.next_delay(self.auto_save_failures)
    }

    /// One unattended save attempt. Failures feed the backoff ladder instead of
    /// `save_error`; a conflict stops auto-save and is surfaced.
    pub async fn auto_save(&mut self) -> Result<(), SessionError> {
        if self.auto_save_delay().is_none() {
            return Ok(());
        }
        self.auto_save_status = AutoSaveStatus::Saving;
        self.touch();

        let result = self.persist().await;
        let outcome = match result {
            Ok(()) => {
                self.reset_auto_save();
                Ok(())
            }
            Err(err) if err.is_conflict() => {
                self.auto_save_failures = self.policy.max_failures;
                self.auto_save_status = AutoSaveStatus::Error;
                self.save_error = Some(err.clone());
                Err(err)
            }
            Err(err) => {
                self.auto_save_failures += 1;
                self.auto_save_status = AutoSaveStatus::Error;
                tracing::warn!(failures = self.auto_save_failures, error = %err, "auto-save failed");
                Err(SessionError::AutoSave {
                    status: err.status(),
                    message: err.to_string(),
                })
            }
        };
        self.touch();
        outcome
    }

    // ---- wizard ----

    /// Enter wizard mode, dropping whatever the session held
    pub fn start_wizard(&mut self) {
        self.load_generation += 1;
        self.is_loading = false;
        self.mode = SessionMode::Wizard(WizardSession::new(self.settings.history_limit));
        self.load_error = None;
        self.save_error = None;
        self.reset_auto_save();
        self.report_data.clear();
        self.touch();
    }

    /// Leave wizard mode without saving; all wizard state is discarded
    pub fn exit_wizard(&mut self) {
        if self.is_wizard_mode() {
            self.mode = SessionMode::Empty;
            self.save_error = None;
            self.touch();
        }
    }

    pub fn set_builder_step(&mut self, step: WizardStep) -> Result<(), SessionError> {
        let result = self.wizard_mut()?.set_step(step);
        self.touch();
        result
    }

    pub fn set_wizard_category(&mut self, category: Option<String>) -> Result<(), SessionError> {
        self.wizard_mut()?.set_category(category);
        self.touch();
        Ok(())
    }

    /// Add a catalog item to the wizard; returns the new widget's temporary id
    pub fn add_catalog_widget(&mut self, item: &CatalogItem) -> Result<String, SessionError> {
        let id = self.wizard_mut()?.add_catalog_widget(item, Utc::now())?.id.clone();
        self.touch();
        Ok(id)
    }

    pub fn set_preview_date_range(&mut self, date_range: TimeRange) -> Result<(), SessionError> {
        self.wizard_mut()?.set_preview_date_range(date_range);
        self.touch();
        Ok(())
    }

    pub fn set_save_as_template(&mut self, save_as_template: bool) -> Result<(), SessionError> {
        self.wizard_mut()?.set_save_as_template(save_as_template);
        self.touch();
        Ok(())
    }

    /// Create the dashboard, then its widgets concurrently, then adopt the
    /// server copy as a regular edit session
    async fn finalize_wizard(&mut self) -> Result<(), SessionError> {
        let (draft, bodies) = {
            let wizard = self.wizard_mut()?;
            if !wizard.can_save() {
                return Err(SessionError::Guard(
                    "Name the dashboard and add at least one widget before saving".to_string(),
                ));
            }
            (wizard.draft(), wizard.new_reports())
        };
        let names: Vec<String> = bodies.iter().map(|b| b.name.clone()).collect();
        let attempted = bodies.len();

        self.is_saving = true;
        self.save_error = None;
        self.touch();
        let api = Arc::clone(&self.api);

        let created = match api.create_dashboard(draft).await {
            Ok(created) => created,
            Err(error) => {
                self.is_saving = false;
                let err = ConcurrencyGuard::classify_write_error(error);
                tracing::warn!(error = %err, "wizard dashboard creation failed");
                self.save_error = Some(err.clone());
                self.touch();
                return Err(err);
            }
        };
        tracing::info!(dashboard = %created.id, widgets = attempted, "dashboard created from wizard");

        let results = join_all(
            bodies
                .into_iter()
                .map(|body| api.create_report(&created.id, body)),
        )
        .await;

        let mut reports = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(report) => reports.push(report),
                Err(error) => {
                    tracing::warn!(dashboard = %created.id, widget = %name, error = %error, "widget creation failed");
                    failed.push(name);
                }
            }
        }

        let refetched = api.fetch_dashboard(&created.id).await;
        let dashboard = match refetched {
            Ok(dashboard) => dashboard,
            Err(error) => {
                tracing::warn!(dashboard = %created.id, error = %error, "re-fetch after wizard save failed; using creation responses");
                Dashboard { reports, ..created }
            }
        };
        let dashboard_id = dashboard.id.clone();

        self.is_saving = false;
        self.mode = SessionMode::Editing(EditSession::new(dashboard, self.settings.history_limit));
        self.reset_auto_save();

        let outcome = if failed.is_empty() {
            Ok(())
        } else {
            let err = SessionError::PartialWizard {
                dashboard_id,
                attempted,
                failed,
            };
            self.save_error = Some(err.clone());
            Err(err)
        };
        self.touch();
        outcome
    }
}

fn mutation_failure(action: &str, error: ApiError) -> SessionError {
    tracing::warn!(error = %error, "failed to {}", action);
    SessionError::Mutation {
        status: error.status(),
        message: format!("Failed to {}: {}", action, error),
    }
}
