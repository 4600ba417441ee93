// Report domain model - a single chart placed on the dashboard grid
use super::chart::{ChartConfig, ChartKind};
use super::grid::GridPosition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator between catalog item id and timestamp in client-generated ids
pub const TEMPORARY_ID_SEPARATOR: &str = "::";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub dataset: String,
    pub chart: ChartConfig,
    pub position: GridPosition,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Non-fatal configuration problems, e.g. a dataset that no longer exists
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Report {
    pub fn kind(&self) -> ChartKind {
        self.chart.kind()
    }

    /// Whether the id was generated client-side and has never been persisted
    pub fn is_temporary(&self) -> bool {
        self.id.contains(TEMPORARY_ID_SEPARATOR)
    }

    /// Request body that would recreate this report on a dashboard
    pub fn to_new_report(&self) -> NewReport {
        NewReport {
            name: self.name.clone(),
            description: self.description.clone(),
            dataset: self.dataset.clone(),
            chart: self.chart.clone(),
            position: self.position,
            sort_order: Some(self.sort_order),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReport {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub dataset: String,
    pub chart: ChartConfig,
    pub position: GridPosition,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<GridPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

impl ReportPatch {
    pub fn position(position: GridPosition) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// True when the patch changes what the chart queries, not just where it sits
    pub fn touches_query(&self) -> bool {
        self.chart.is_some() || self.dataset.is_some()
    }

    pub fn apply_to(&self, report: &mut Report) {
        if let Some(name) = &self.name {
            report.name = name.clone();
        }
        if let Some(description) = &self.description {
            report.description = Some(description.clone());
        }
        if let Some(dataset) = &self.dataset {
            report.dataset = dataset.clone();
        }
        if let Some(chart) = &self.chart {
            report.chart = chart.clone();
        }
        if let Some(position) = self.position {
            report.position = position;
        }
        if let Some(sort_order) = self.sort_order {
            report.sort_order = sort_order;
        }
    }
}

/// Id/position pair captured for undo/redo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub id: String,
    pub position: GridPosition,
}

impl Placement {
    pub fn of(report: &Report) -> Self {
        Self {
            id: report.id.clone(),
            position: report.position,
        }
    }
}

/// Position copy of every report, in display order
pub fn placements(reports: &[Report]) -> Vec<Placement> {
    reports.iter().map(Placement::of).collect()
}
