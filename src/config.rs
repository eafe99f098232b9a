use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::io::Read;

/// Tunable settings for the whole engine. Every field has a default, so an empty JSON object
/// is a complete configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    #[validate]
    pub clustering: ClusterConfig,
    #[validate]
    pub layout: LayoutConfig,
    #[validate]
    pub resolver: ResolverConfig,
}

impl EngineConfig {
    pub fn from_json(json: impl Read) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_reader(json)?;
        config
            .validate()
            .map_err(|errors| ConfigError::Invalid(errors.to_string()))?;
        config.layout.check_bands()?;
        config.resolver.check_bands()?;
        Ok(config)
    }
}

/// Thresholds for grouping roof segments into physical properties. The defaults come from
/// observed UK terraced and semi-detached captures and are heuristics, not physical constants.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    #[validate(exclusive_minimum = 0.)]
    pub max_centroid_distance_m: f64,
    #[validate(exclusive_minimum = 0.)]
    #[validate(maximum = 180.)]
    pub max_orientation_difference_deg: f64,
    #[validate(exclusive_minimum = 0.)]
    pub metres_per_degree: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_centroid_distance_m: 50.,
            max_orientation_difference_deg: 45.,
            metres_per_degree: crate::core::units::METRES_PER_DEGREE,
        }
    }
}

/// Spacing in metres.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Footprint assumed for one panel when no physical panel is specified, in m2
    #[validate(exclusive_minimum = 0.)]
    pub assumed_panel_area_m2: f64,
    /// Share of the roof the area-fill fallback is allowed to cover
    #[validate(exclusive_minimum = 0.)]
    #[validate(maximum = 1.)]
    pub fallback_utilisation_cap: f64,
    /// Reference installations must score strictly above this (out of 100) to be used
    #[validate(minimum = 0.)]
    #[validate(maximum = 100.)]
    pub reference_match_threshold: f64,
    #[validate(minimum = 0.)]
    pub edge_clearance_m: f64,
    #[validate(minimum = 0.)]
    pub min_panel_gap_m: f64,
    #[validate(minimum = 0.)]
    pub walkway_m: f64,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub min_realistic_utilisation: f64,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub max_realistic_utilisation: f64,
    #[validate(minimum = 0.)]
    pub min_realistic_gap_m: f64,
    #[validate(minimum = 0.)]
    pub min_realistic_edge_clearance_m: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            assumed_panel_area_m2: 1.89,
            fallback_utilisation_cap: 0.6,
            reference_match_threshold: 50.,
            edge_clearance_m: 0.6,
            min_panel_gap_m: 0.02,
            walkway_m: 0.9,
            min_realistic_utilisation: 0.3,
            max_realistic_utilisation: 0.7,
            min_realistic_gap_m: 0.01,
            min_realistic_edge_clearance_m: 0.5,
        }
    }
}

impl LayoutConfig {
    fn check_bands(&self) -> Result<(), ConfigError> {
        if self.min_realistic_utilisation > self.max_realistic_utilisation {
            return Err(ConfigError::Invalid(format!(
                "min_realistic_utilisation ({}) is above max_realistic_utilisation ({})",
                self.min_realistic_utilisation, self.max_realistic_utilisation
            )));
        }
        // an area-fill plan must never be judged overcrowded
        if self.fallback_utilisation_cap > self.max_realistic_utilisation {
            return Err(ConfigError::Invalid(format!(
                "fallback_utilisation_cap ({}) is above max_realistic_utilisation ({})",
                self.fallback_utilisation_cap, self.max_realistic_utilisation
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Page sizes requested for the four lookup strategies, most specific first
    #[validate(minimum = 1)]
    pub exact_match_size: usize,
    #[validate(minimum = 1)]
    pub outward_postcode_size: usize,
    #[validate(minimum = 1)]
    pub house_number_size: usize,
    #[validate(minimum = 1)]
    pub postcode_only_size: usize,
    /// Plausible annual energy consumption band in kWh; readings outside it are dropped
    #[validate(minimum = 0.)]
    pub min_energy_consumption_kwh: f64,
    #[validate(minimum = 0.)]
    pub max_energy_consumption_kwh: f64,
    /// Certificates inspected longer ago than this are flagged as old
    #[validate(maximum = 200)]
    pub epc_age_limit_years: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            exact_match_size: 1,
            outward_postcode_size: 5,
            house_number_size: 5,
            postcode_only_size: 10,
            min_energy_consumption_kwh: 500.,
            max_energy_consumption_kwh: 20_000.,
            epc_age_limit_years: 10,
        }
    }
}

impl ResolverConfig {
    fn check_bands(&self) -> Result<(), ConfigError> {
        if self.min_energy_consumption_kwh > self.max_energy_consumption_kwh {
            return Err(ConfigError::Invalid(format!(
                "min_energy_consumption_kwh ({}) is above max_energy_consumption_kwh ({})",
                self.min_energy_consumption_kwh, self.max_energy_consumption_kwh
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Cursor;

    #[rstest]
    fn should_default_every_field_from_empty_object() {
        let config = EngineConfig::from_json(Cursor::new("{}")).unwrap();

        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.layout.assumed_panel_area_m2, 1.89);
        assert_eq!(config.resolver.postcode_only_size, 10);
        assert_eq!(config.clustering.max_centroid_distance_m, 50.);
    }

    #[rstest]
    fn should_override_nested_fields() {
        let config = EngineConfig::from_json(Cursor::new(
            r#"{"clustering": {"max_centroid_distance_m": 30.0}, "resolver": {"epc_age_limit_years": 8}}"#,
        ))
        .unwrap();

        assert_eq!(config.clustering.max_centroid_distance_m, 30.);
        assert_eq!(config.clustering.max_orientation_difference_deg, 45.);
        assert_eq!(config.resolver.epc_age_limit_years, 8);
    }

    #[rstest]
    #[case(r#"{"layout": {"fallback_utilisation_cap": 1.5}}"#)]
    #[case(r#"{"clustering": {"max_centroid_distance_m": 0.0}}"#)]
    #[case(r#"{"resolver": {"exact_match_size": 0}}"#)]
    #[case(r#"{"layout": {"min_realistic_utilisation": 0.8, "max_realistic_utilisation": 0.7}}"#)]
    #[case(r#"{"resolver": {"min_energy_consumption_kwh": 3000.0, "max_energy_consumption_kwh": 2000.0}}"#)]
    #[case(r#"{"layout": {"fallback_utilisation_cap": 0.9, "max_realistic_utilisation": 0.7}}"#)]
    #[case(r#"{"resolver": {"epc_age_limit_years": 400000000}}"#)]
    fn should_reject_out_of_range_values(#[case] json: &str) {
        assert!(matches!(
            EngineConfig::from_json(Cursor::new(json)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[rstest]
    fn should_reject_unknown_fields() {
        assert!(matches!(
            EngineConfig::from_json(Cursor::new(r#"{"layuot": {}}"#)),
            Err(ConfigError::Parse(_))
        ));
    }
}
