use crate::core::units::{centimetres_to_metres, watts_to_kilowatts};
use anyhow::bail;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::io::{BufReader, Cursor, Read};
use std::sync::LazyLock;

/// This module contains reference data on solar panel models sold in the UK, with helpers for
/// picking one by efficiency, warranty, budget or popularity.

static BUNDLED_CATALOG: LazyLock<PanelCatalog> = LazyLock::new(|| {
    PanelCatalog::from_csv(BufReader::new(Cursor::new(include_str!(
        "panel_catalog.csv"
    ))))
    .expect("bundled panel catalog should be well formed")
});

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolarPanelSpec {
    #[serde(alias = "Brand")]
    pub brand: String,
    #[serde(alias = "Model")]
    pub model: String,
    #[serde(alias = "Power (W)")]
    pub power_w: f64,
    #[serde(alias = "Efficiency (%)")]
    pub efficiency: f64,
    #[serde(alias = "Length (cm)")]
    pub length_cm: f64,
    #[serde(alias = "Width (cm)")]
    pub width_cm: f64,
    #[serde(alias = "Thickness (cm)")]
    pub thickness_cm: f64,
    #[serde(alias = "Weight (kg)")]
    pub weight_kg: f64,
    #[serde(alias = "Product Warranty (years)")]
    pub product_warranty_years: u32,
    #[serde(alias = "Performance Warranty (years)")]
    pub performance_warranty_years: u32,
    #[serde(alias = "UK Market Share (%)")]
    pub uk_market_share: f64,
    #[serde(alias = "Price per Watt (GBP)")]
    pub price_per_watt: f64,
}

impl SolarPanelSpec {
    /// Module face area in m2
    pub fn area_m2(&self) -> f64 {
        centimetres_to_metres(self.length_cm) * centimetres_to_metres(self.width_cm)
    }

    pub fn power_kw(&self) -> f64 {
        watts_to_kilowatts(self.power_w)
    }

    /// Indicative module cost in GBP for `panel_count` panels, excluding installation.
    pub fn system_cost_gbp(&self, panel_count: u32) -> f64 {
        panel_count as f64 * self.power_w * self.price_per_watt
    }

    fn warranty_key(&self) -> (u32, u32) {
        (self.product_warranty_years, self.performance_warranty_years)
    }
}

#[derive(Clone, Debug)]
pub struct PanelCatalog {
    panels: Vec<SolarPanelSpec>,
}

impl PanelCatalog {
    /// Read a catalog from CSV with one header row. An empty catalog is rejected so that
    /// selection always has an answer.
    pub fn from_csv(csv: impl Read) -> anyhow::Result<Self> {
        let panels: Vec<SolarPanelSpec> = csv::Reader::from_reader(csv)
            .deserialize::<SolarPanelSpec>()
            .collect::<Result<_, _>>()?;
        if panels.is_empty() {
            bail!("Panel catalog contains no panels");
        }
        if let Some(panel) = panels
            .iter()
            .find(|panel| panel.power_w <= 0. || panel.length_cm <= 0. || panel.width_cm <= 0.)
        {
            bail!(
                "Panel {} {} has non-positive power or dimensions",
                panel.brand,
                panel.model
            );
        }
        Ok(Self { panels })
    }

    /// The catalog shipped with the crate.
    pub fn bundled() -> &'static Self {
        &BUNDLED_CATALOG
    }

    pub fn list(&self) -> &[SolarPanelSpec] {
        &self.panels
    }

    pub fn find(&self, brand: &str, model: &str) -> Option<&SolarPanelSpec> {
        self.panels.iter().find(|panel| {
            panel.brand.eq_ignore_ascii_case(brand) && panel.model.eq_ignore_ascii_case(model)
        })
    }

    /// Pick a panel. Efficiency preference wins outright, then warranty preference; otherwise a
    /// budget (GBP per watt) keeps the panels at or under it and takes the most popular of those.
    /// With no criteria the most popular panel overall is returned. If nothing fits the budget,
    /// the cheapest panel is the closest answer.
    pub fn select_optimal(
        &self,
        budget: Option<f64>,
        prefer_efficiency: bool,
        prefer_warranty: bool,
    ) -> &SolarPanelSpec {
        if prefer_efficiency {
            return self.most_efficient();
        }
        if prefer_warranty {
            return self.longest_warranty();
        }
        match budget {
            Some(max_price_per_watt) => self
                .within_budget(max_price_per_watt)
                .into_iter()
                .next()
                .unwrap_or_else(|| self.cheapest()),
            None => self.most_popular(),
        }
    }

    /// Highest efficiency; the earliest catalog entry wins a tie.
    pub fn most_efficient(&self) -> &SolarPanelSpec {
        self.first_max_by(|a, b| a.efficiency.total_cmp(&b.efficiency))
    }

    /// Longest product warranty, then longest performance warranty.
    pub fn longest_warranty(&self) -> &SolarPanelSpec {
        self.first_max_by(|a, b| a.warranty_key().cmp(&b.warranty_key()))
    }

    /// Largest UK market share.
    pub fn most_popular(&self) -> &SolarPanelSpec {
        self.first_max_by(|a, b| a.uk_market_share.total_cmp(&b.uk_market_share))
    }

    pub fn cheapest(&self) -> &SolarPanelSpec {
        self.first_max_by(|a, b| b.price_per_watt.total_cmp(&a.price_per_watt))
    }

    /// Panels priced at or under `max_price_per_watt`, most popular first.
    pub fn within_budget(&self, max_price_per_watt: f64) -> Vec<&SolarPanelSpec> {
        self.panels
            .iter()
            .filter(|panel| panel.price_per_watt <= max_price_per_watt)
            .sorted_by(|a, b| b.uk_market_share.total_cmp(&a.uk_market_share))
            .collect()
    }

    /// Panels grouped by brand, brands in order of first appearance.
    pub fn by_brand(&self) -> IndexMap<&str, Vec<&SolarPanelSpec>> {
        let mut brands: IndexMap<&str, Vec<&SolarPanelSpec>> = IndexMap::new();
        for panel in &self.panels {
            brands.entry(panel.brand.as_str()).or_default().push(panel);
        }
        brands
    }

    /// Panels sorted by efficiency, best first. Equal efficiencies keep catalog order.
    pub fn sorted_by_efficiency(&self) -> Vec<&SolarPanelSpec> {
        self.panels
            .iter()
            .sorted_by(|a, b| b.efficiency.total_cmp(&a.efficiency))
            .collect()
    }

    fn first_max_by(
        &self,
        compare: impl Fn(&SolarPanelSpec, &SolarPanelSpec) -> Ordering,
    ) -> &SolarPanelSpec {
        let (first, rest) = self
            .panels
            .split_first()
            .expect("catalog is never empty once constructed");
        rest.iter().fold(first, |best, panel| {
            if compare(panel, best) == Ordering::Greater {
                panel
            } else {
                best
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn catalog() -> &'static PanelCatalog {
        PanelCatalog::bundled()
    }

    #[rstest]
    fn should_load_bundled_catalog(catalog: &PanelCatalog) {
        assert_eq!(catalog.list().len(), 10);
        let first = &catalog.list()[0];
        assert_eq!(first.brand, "JA Solar");
        assert_eq!(first.power_w, 415.);
        assert_eq!(first.product_warranty_years, 12);
    }

    #[rstest]
    fn should_select_most_efficient_when_efficiency_preferred(catalog: &PanelCatalog) {
        let max_efficiency = catalog
            .list()
            .iter()
            .map(|panel| panel.efficiency)
            .fold(f64::MIN, f64::max);

        let selected = catalog.select_optimal(None, true, false);

        assert_eq!(selected.efficiency, max_efficiency);
        assert_eq!(selected.brand, "Aiko");
        // efficiency wins even when other criteria are supplied
        assert_eq!(catalog.select_optimal(Some(0.3), true, true), selected);
    }

    #[rstest]
    fn should_select_longest_warranty_when_warranty_preferred(catalog: &PanelCatalog) {
        assert_eq!(catalog.select_optimal(Some(0.4), false, true).brand, "Maxeon");
    }

    #[rstest]
    fn should_select_most_popular_within_budget(catalog: &PanelCatalog) {
        let selected = catalog.select_optimal(Some(0.40), false, false);

        assert_eq!(selected.brand, "JA Solar");
        assert!(selected.price_per_watt <= 0.40);
    }

    #[rstest]
    fn should_fall_back_to_cheapest_when_nothing_fits_budget(catalog: &PanelCatalog) {
        assert_eq!(
            catalog.select_optimal(Some(0.10), false, false).brand,
            "Canadian Solar"
        );
    }

    #[rstest]
    fn should_select_most_popular_without_criteria(catalog: &PanelCatalog) {
        assert_eq!(catalog.select_optimal(None, false, false).brand, "LONGi");
    }

    #[rstest]
    fn should_break_efficiency_ties_by_catalog_order() {
        let csv = "\
Brand,Model,Power (W),Efficiency (%),Length (cm),Width (cm),Thickness (cm),Weight (kg),Product Warranty (years),Performance Warranty (years),UK Market Share (%),Price per Watt (GBP)
First,A,400,22.0,172.2,113.4,3.0,21.0,12,25,1.0,0.40
Second,B,410,22.0,172.2,113.4,3.0,21.0,12,25,2.0,0.40
";
        let catalog = PanelCatalog::from_csv(csv.as_bytes()).unwrap();

        assert_eq!(catalog.select_optimal(None, true, false).brand, "First");
        assert_eq!(
            catalog
                .sorted_by_efficiency()
                .iter()
                .map(|panel| panel.brand.as_str())
                .collect::<Vec<_>>(),
            vec!["First", "Second"]
        );
    }

    #[rstest]
    fn should_reject_empty_catalog() {
        let csv = "Brand,Model,Power (W),Efficiency (%),Length (cm),Width (cm),Thickness (cm),Weight (kg),Product Warranty (years),Performance Warranty (years),UK Market Share (%),Price per Watt (GBP)\n";
        assert!(PanelCatalog::from_csv(csv.as_bytes()).is_err());
    }

    #[rstest]
    fn should_list_budget_panels_by_popularity(catalog: &PanelCatalog) {
        let brands: Vec<&str> = catalog
            .within_budget(0.40)
            .iter()
            .map(|panel| panel.brand.as_str())
            .collect();

        assert_eq!(brands, vec!["JA Solar", "Jinko Solar", "Canadian Solar", "DMEGC"]);
    }

    #[rstest]
    fn should_group_by_brand(catalog: &PanelCatalog) {
        let brands = catalog.by_brand();
        assert_eq!(brands.len(), 10);
        assert_eq!(brands.get_index(0).map(|(brand, _)| *brand), Some("JA Solar"));
    }

    #[rstest]
    fn should_derive_area_power_and_cost(catalog: &PanelCatalog) {
        let panel = catalog.find("longi", "Hi-MO 6 LR5-54HTH-430M").unwrap();

        assert_relative_eq!(panel.area_m2(), 1.722 * 1.134, max_relative = 1e-12);
        assert_relative_eq!(panel.power_kw(), 0.43);
        assert_relative_eq!(panel.system_cost_gbp(10), 1806., max_relative = 1e-12);
    }
}
