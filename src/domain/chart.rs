// Chart definitions - one configuration shape per chart kind
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Area,
    Pie,
    Kpi,
    Table,
}

impl ChartKind {
    /// Minimum `(w, h)` in grid units a chart of this kind can be rendered at
    pub fn min_size(&self) -> (u32, u32) {
        match self {
            ChartKind::Line | ChartKind::Bar | ChartKind::Area => (4, 3),
            ChartKind::Pie => (3, 3),
            ChartKind::Kpi => (2, 2),
            ChartKind::Table => (4, 3),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Bar => "bar",
            ChartKind::Area => "area",
            ChartKind::Pie => "pie",
            ChartKind::Kpi => "kpi",
            ChartKind::Table => "table",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartConfigError {
    #[error("{kind} chart needs at least one metric")]
    MissingMetric { kind: &'static str },

    #[error("{kind} chart needs a dimension")]
    MissingDimension { kind: &'static str },

    #[error("table chart needs at least one column")]
    EmptyTable,

    #[error("time range starts after it ends ({start} > {end})")]
    InvertedTimeRange { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    NotEq,
    In,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "preset", rename_all = "snake_case")]
pub enum TimeRange {
    Last7Days,
    #[default]
    Last30Days,
    Last90Days,
    MonthToDate,
    YearToDate,
    Custom { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeGrain {
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// Filters and time window shared by every chart kind
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryScope {
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub grain: Option<TimeGrain>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayOptions {
    #[serde(default = "default_true")]
    pub show_legend: bool,
    #[serde(default)]
    pub stacked: bool,
    #[serde(default)]
    pub color_scheme: Option<String>,
    #[serde(default)]
    pub value_format: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_legend: true,
            stacked: false,
            color_scheme: None,
            value_format: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesChart {
    pub metrics: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub scope: QueryScope,
    #[serde(default)]
    pub display: DisplayOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChart {
    pub metric: String,
    pub dimension: String,
    #[serde(default)]
    pub scope: QueryScope,
    #[serde(default)]
    pub display: DisplayOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiComparison {
    PreviousPeriod,
    PreviousYear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiChart {
    pub metric: String,
    #[serde(default)]
    pub comparison: Option<KpiComparison>,
    #[serde(default)]
    pub scope: QueryScope,
    #[serde(default)]
    pub display: DisplayOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableChart {
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub scope: QueryScope,
    #[serde(default)]
    pub display: DisplayOptions,
}

/// Chart configuration, tagged by chart kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartConfig {
    Line(SeriesChart),
    Bar(SeriesChart),
    Area(SeriesChart),
    Pie(PieChart),
    Kpi(KpiChart),
    Table(TableChart),
}

impl ChartConfig {
    /// Build a line, bar or area chart. Any other kind falls back to a line chart.
    pub fn series(
        kind: ChartKind,
        metrics: Vec<String>,
        dimensions: Vec<String>,
    ) -> Result<Self, ChartConfigError> {
        let chart = SeriesChart {
            metrics,
            dimensions,
            scope: QueryScope::default(),
            display: DisplayOptions::default(),
        };
        let config = match kind {
            ChartKind::Bar => ChartConfig::Bar(chart),
            ChartKind::Area => ChartConfig::Area(chart),
            _ => ChartConfig::Line(chart),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn pie(metric: impl Into<String>, dimension: impl Into<String>) -> Result<Self, ChartConfigError> {
        let config = ChartConfig::Pie(PieChart {
            metric: metric.into(),
            dimension: dimension.into(),
            scope: QueryScope::default(),
            display: DisplayOptions::default(),
        });
        config.validate()?;
        Ok(config)
    }

    pub fn kpi(metric: impl Into<String>) -> Result<Self, ChartConfigError> {
        let config = ChartConfig::Kpi(KpiChart {
            metric: metric.into(),
            comparison: None,
            scope: QueryScope::default(),
            display: DisplayOptions::default(),
        });
        config.validate()?;
        Ok(config)
    }

    pub fn table(metrics: Vec<String>, dimensions: Vec<String>) -> Result<Self, ChartConfigError> {
        let config = ChartConfig::Table(TableChart {
            metrics,
            dimensions,
            page_size: None,
            scope: QueryScope::default(),
            display: DisplayOptions::default(),
        });
        config.validate()?;
        Ok(config)
    }

    pub fn kind(&self) -> ChartKind {
        match self {
            ChartConfig::Line(_) => ChartKind::Line,
            ChartConfig::Bar(_) => ChartKind::Bar,
            ChartConfig::Area(_) => ChartKind::Area,
            ChartConfig::Pie(_) => ChartKind::Pie,
            ChartConfig::Kpi(_) => ChartKind::Kpi,
            ChartConfig::Table(_) => ChartKind::Table,
        }
    }

    pub fn scope(&self) -> &QueryScope {
        match self {
            ChartConfig::Line(c) | ChartConfig::Bar(c) | ChartConfig::Area(c) => &c.scope,
            ChartConfig::Pie(c) => &c.scope,
            ChartConfig::Kpi(c) => &c.scope,
            ChartConfig::Table(c) => &c.scope,
        }
    }

    /// Check the per-kind shape rules; deserialized payloads go through this too
    pub fn validate(&self) -> Result<(), ChartConfigError> {
        let kind = self.kind().as_str();
        match self {
            ChartConfig::Line(c) | ChartConfig::Bar(c) | ChartConfig::Area(c) => {
                if c.metrics.iter().all(|m| m.trim().is_empty()) {
                    return Err(ChartConfigError::MissingMetric { kind });
                }
            }
            ChartConfig::Pie(c) => {
                if c.metric.trim().is_empty() {
                    return Err(ChartConfigError::MissingMetric { kind });
                }
                if c.dimension.trim().is_empty() {
                    return Err(ChartConfigError::MissingDimension { kind });
                }
            }
            ChartConfig::Kpi(c) => {
                if c.metric.trim().is_empty() {
                    return Err(ChartConfigError::MissingMetric { kind });
                }
            }
            ChartConfig::Table(c) => {
                if c.metrics.is_empty() && c.dimensions.is_empty() {
                    return Err(ChartConfigError::EmptyTable);
                }
            }
        }

        if let Some(TimeRange::Custom { start, end }) = &self.scope().time_range {
            if start > end {
                return Err(ChartConfigError::InvertedTimeRange {
                    start: *start,
                    end: *end,
                });
            }
        }

        Ok(())
    }
}
