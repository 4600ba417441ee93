// Wizard sub-machine - composing a dashboard that does not exist server-side yet
use crate::application::error::SessionError;
use crate::application::history::History;
use crate::domain::catalog::CatalogItem;
use crate::domain::chart::TimeRange;
use crate::domain::dashboard::{MetaPatch, NewDashboard};
use crate::domain::grid::{GRID_COLUMNS, GridPosition, stack_bottom};
use crate::domain::report::{NewReport, Placement, Report, TEMPORARY_ID_SEPARATOR, placements};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    Select,
    Customize,
    Preview,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreviewSettings {
    pub date_range: TimeRange,
    pub save_as_template: bool,
}

#[derive(Debug, Clone)]
pub struct WizardSession {
    step: WizardStep,
    category: Option<String>,
    widgets: Vec<Report>,
    name: String,
    description: String,
    preview: PreviewSettings,
    /// Set once the customize guard has passed; unlocks jumping to preview
    customize_completed: bool,
    history: History<Vec<Placement>>,
}

impl WizardSession {
    pub fn new(history_limit: usize) -> Self {
        Self {
            step: WizardStep::Select,
            category: None,
            widgets: Vec::new(),
            name: String::new(),
            description: String::new(),
            preview: PreviewSettings::default(),
            customize_completed: false,
            history: History::new(history_limit),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn widgets(&self) -> &[Report] {
        &self.widgets
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn preview(&self) -> &PreviewSettings {
        &self.preview
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.category = category;
    }

    pub fn set_preview_date_range(&mut self, date_range: TimeRange) {
        self.preview.date_range = date_range;
    }

    pub fn set_save_as_template(&mut self, save_as_template: bool) {
        self.preview.save_as_template = save_as_template;
    }

    pub fn apply_meta(&mut self, patch: MetaPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
    }

    /// Preview is read-only; widgets change only in the earlier steps
    fn ensure_editable(&self) -> Result<(), SessionError> {
        if self.step == WizardStep::Preview {
            return Err(SessionError::Guard(
                "Go back to customize to change widgets".to_string(),
            ));
        }
        Ok(())
    }

    /// Build a report from a catalog item and stack it under the existing widgets.
    /// The same item may be added any number of times.
    pub fn add_catalog_widget(
        &mut self,
        item: &CatalogItem,
        now: DateTime<Utc>,
    ) -> Result<&Report, SessionError> {
        self.ensure_editable()?;
        let (min_w, min_h) = item.kind().min_size();
        let position = GridPosition::new(
            0,
            stack_bottom(self.widgets.iter().map(|w| &w.position)),
            (min_w * 2).min(GRID_COLUMNS),
            min_h * 2,
        );

        let report = Report {
            id: self.unique_id(&item.id, now.timestamp_millis()),
            name: item.name.clone(),
            description: item.description.clone(),
            dataset: item.dataset.clone(),
            chart: item.chart.clone(),
            position,
            sort_order: self.widgets.len() as i32,
            created_by: None,
            created_at: now,
            updated_at: now,
            warnings: Vec::new(),
        };
        tracing::debug!(widget = %report.id, catalog_item = %item.id, "widget added to wizard");

        let index = self.widgets.len();
        self.widgets.push(report);
        Ok(&self.widgets[index])
    }

    fn unique_id(&self, catalog_id: &str, mut millis: i64) -> String {
        loop {
            let id = format!("{catalog_id}{TEMPORARY_ID_SEPARATOR}{millis}");
            if !self.widgets.iter().any(|w| w.id == id) {
                return id;
            }
            millis += 1;
        }
    }

    fn widget_index(&self, id: &str) -> Result<usize, SessionError> {
        self.widgets
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| SessionError::UnknownReport(id.to_string()))
    }

    pub fn remove_widget(&mut self, id: &str) -> Result<Report, SessionError> {
        self.ensure_editable()?;
        let index = self.widget_index(id)?;
        Ok(self.widgets.remove(index))
    }

    /// Optimistic local move, recorded for undo
    pub fn move_widget(&mut self, id: &str, position: GridPosition) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let index = self.widget_index(id)?;
        if self.widgets[index].position == position {
            return Ok(());
        }
        self.history.record(placements(&self.widgets));
        self.widgets[index].position = position;
        Ok(())
    }

    /// Returns true only when a widget actually moved; never in preview
    pub fn undo(&mut self) -> bool {
        if self.ensure_editable().is_err() {
            return false;
        }
        let current = placements(&self.widgets);
        match self.history.undo(current) {
            Some(snapshot) => !restore(&mut self.widgets, &snapshot).is_empty(),
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.ensure_editable().is_err() {
            return false;
        }
        let current = placements(&self.widgets);
        match self.history.redo(current) {
            Some(snapshot) => !restore(&mut self.widgets, &snapshot).is_empty(),
            None => false,
        }
    }

    pub fn can_leave_select(&self) -> bool {
        !self.widgets.is_empty()
    }

    pub fn can_leave_customize(&self) -> bool {
        !self.name.trim().is_empty() && !self.widgets.is_empty()
    }

    pub fn can_save(&self) -> bool {
        self.can_leave_customize()
    }

    /// Move to another step. Going back is always allowed; going forward
    /// must pass the guard of every step being left.
    pub fn set_step(&mut self, target: WizardStep) -> Result<(), SessionError> {
        if target <= self.step {
            self.step = target;
            return Ok(());
        }

        if self.step == WizardStep::Select && !self.can_leave_select() {
            return Err(SessionError::Guard(
                "Select at least one widget to continue".to_string(),
            ));
        }

        if target == WizardStep::Preview {
            if self.step == WizardStep::Select && !self.customize_completed {
                return Err(SessionError::Guard(
                    "Customize the dashboard before previewing it".to_string(),
                ));
            }
            if !self.can_leave_customize() {
                return Err(SessionError::Guard(
                    "Name the dashboard and keep at least one widget to continue".to_string(),
                ));
            }
            self.customize_completed = true;
        }

        tracing::debug!(from = ?self.step, to = ?target, "wizard step changed");
        self.step = target;
        Ok(())
    }

    pub fn draft(&self) -> NewDashboard {
        let description = self.description.trim();
        NewDashboard {
            name: self.name.trim().to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
        }
    }

    /// Creation bodies for every widget, in wizard order
    pub fn new_reports(&self) -> Vec<NewReport> {
        self.widgets
            .iter()
            .enumerate()
            .map(|(index, widget)| NewReport {
                sort_order: Some(index as i32),
                ..widget.to_new_report()
            })
            .collect()
    }
}

/// Apply snapshot positions to the reports still present; reports missing
/// from the snapshot keep their current position
pub(crate) fn restore(reports: &mut [Report], snapshot: &[Placement]) -> Vec<Placement> {
    let mut changed = Vec::new();
    for placement in snapshot {
        if let Some(report) = reports.iter_mut().find(|r| r.id == placement.id) {
            if report.position != placement.position {
                report.position = placement.position;
                changed.push(placement.clone());
            }
        }
    }
    changed
}
