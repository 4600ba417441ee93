// Domain layer - dashboards, reports and the grid they sit on
pub mod catalog;
pub mod chart;
pub mod dashboard;
pub mod grid;
pub mod report;
