// Widget catalog model - templates the wizard builds reports from
use super::chart::{ChartConfig, ChartConfigError, ChartKind};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    pub dataset: String,
    pub chart: ChartConfig,
}

impl CatalogItem {
    pub fn kind(&self) -> ChartKind {
        self.chart.kind()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    pub fn get(&self, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Distinct categories in first-seen order
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for item in &self.items {
            if !categories.contains(&item.category.as_str()) {
                categories.push(&item.category);
            }
        }
        categories
    }

    /// Items in a category, or everything when no category is selected
    pub fn filter<'a>(&'a self, category: Option<&'a str>) -> impl Iterator<Item = &'a CatalogItem> + 'a {
        self.items
            .iter()
            .filter(move |item| category.is_none_or(|c| item.category == c))
    }

    /// Validate every chart; returns the id of the first offending item
    pub fn validate(&self) -> Result<(), (String, ChartConfigError)> {
        for item in &self.items {
            item.chart.validate().map_err(|e| (item.id.clone(), e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, category: &str) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            category: category.to_string(),
            dataset: "orders".to_string(),
            chart: ChartConfig::kpi("order_count").unwrap(),
        }
    }

    #[test]
    fn test_filter_by_category() {
        let catalog = Catalog::new(vec![
            item("a", "sales"),
            item("b", "marketing"),
            item("c", "sales"),
        ]);

        let sales: Vec<&str> = catalog.filter(Some("sales")).map(|i| i.id.as_str()).collect();
        assert_eq!(sales, vec!["a", "c"]);
        assert_eq!(catalog.filter(None).count(), 3);
        assert_eq!(catalog.categories(), vec!["sales", "marketing"]);
    }

    #[test]
    fn test_validate_reports_offending_item() {
        let mut bad = item("broken", "sales");
        bad.chart = ChartConfig::Kpi(crate::domain::chart::KpiChart {
            metric: String::new(),
            comparison: None,
            scope: Default::default(),
            display: Default::default(),
        });
        let catalog = Catalog::new(vec![item("ok", "sales"), bad]);

        let (id, _) = catalog.validate().unwrap_err();
        assert_eq!(id, "broken");
    }
}
