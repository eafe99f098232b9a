use crate::config::EngineConfig;
use crate::core::clustering::{MultiPropertyDetection, PropertyClusterDetector, RoofSegment};
use crate::core::layout::planner::{
    LayoutPlan, LayoutPlanner, McsSpacing, RealismReport, RoofDimensions,
};
use crate::core::layout::reference_installations::ReferenceLibrary;
use crate::core::layout::{HouseType, PanelOrientation, RoofGeometry};
use crate::core::panels::catalog::{PanelCatalog, SolarPanelSpec};
use crate::core::units::watts_to_kilowatts;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct PanelPreferences {
    /// GBP per watt
    pub budget: Option<f64>,
    pub prefer_efficiency: bool,
    pub prefer_warranty: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoofAssessmentRequest {
    pub house_type: HouseType,
    pub roof: RoofGeometry,
    /// segmentation of the aerial capture the roof was measured from
    #[serde(default)]
    pub segments: Vec<RoofSegment>,
    #[serde(default)]
    pub panel_preferences: PanelPreferences,
    #[serde(default)]
    pub panel_orientation: PanelOrientation,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoofAssessment {
    pub property_detection: MultiPropertyDetection,
    /// the capture seems to cover more than one property, so the roof should be confirmed
    /// before the layout is relied on
    pub needs_confirmation: bool,
    pub layout: LayoutPlan,
    pub realism: RealismReport,
    pub panel: SolarPanelSpec,
    /// physical packing of the chosen panel, when roof width and height are known
    pub packing: Option<McsSpacing>,
    pub system_size_kw: f64,
    /// panel cost only, excluding installation
    pub estimated_panel_cost_gbp: f64,
}

/// Runs the roof-side pipeline: multi-property check, layout, realism check and panel choice.
pub struct RoofAssessor<'a> {
    detector: PropertyClusterDetector,
    planner: LayoutPlanner<'a>,
    catalog: &'a PanelCatalog,
}

impl<'a> RoofAssessor<'a> {
    pub fn new(
        config: &EngineConfig,
        catalog: &'a PanelCatalog,
        library: &'a ReferenceLibrary,
    ) -> Self {
        Self {
            detector: PropertyClusterDetector::new(config.clustering.clone()),
            planner: LayoutPlanner::new(library, config.layout.clone()),
            catalog,
        }
    }

    /// An assessor over the bundled catalog and reference installations.
    pub fn bundled(config: &EngineConfig) -> RoofAssessor<'static> {
        RoofAssessor::new(config, PanelCatalog::bundled(), ReferenceLibrary::bundled())
    }

    pub fn planner(&self) -> &LayoutPlanner<'a> {
        &self.planner
    }

    pub fn assess_roof(&self, request: &RoofAssessmentRequest) -> RoofAssessment {
        let property_detection = self.detector.detect_multiple_properties(&request.segments);
        let needs_confirmation = property_detection.spans_multiple_properties();
        if needs_confirmation {
            warn!(
                properties = property_detection.property_count,
                confidence = property_detection.confidence,
                "roof capture appears to span several properties"
            );
        }

        let layout = self
            .planner
            .generate_realistic_layout(&request.roof, request.house_type);
        let realism = self.planner.validate_plan(&layout, request.roof.area);
        debug!(
            panels = layout.panel_count,
            realistic = realism.is_realistic,
            "planned layout"
        );

        let preferences = &request.panel_preferences;
        let panel = self.catalog.select_optimal(
            preferences.budget,
            preferences.prefer_efficiency,
            preferences.prefer_warranty,
        );

        let packing = (request.roof.width > 0. && request.roof.height > 0.).then(|| {
            self.planner.calculate_mcs_compliant_spacing(
                panel,
                RoofDimensions::from(&request.roof),
                request.panel_orientation,
            )
        });

        RoofAssessment {
            property_detection,
            needs_confirmation,
            system_size_kw: watts_to_kilowatts(layout.panel_count as f64 * panel.power_w),
            estimated_panel_cost_gbp: panel.system_cost_gbp(layout.panel_count),
            layout,
            realism,
            panel: panel.clone(),
            packing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clustering::LatLng;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn assessor() -> RoofAssessor<'static> {
        RoofAssessor::bundled(&EngineConfig::default())
    }

    fn request(segments: Vec<RoofSegment>) -> RoofAssessmentRequest {
        RoofAssessmentRequest {
            house_type: HouseType::SemiDetached,
            roof: RoofGeometry {
                area: 30.,
                width: 7.5,
                height: 4.,
                orientation: 180.,
                pitch: 35.,
            },
            segments,
            panel_preferences: PanelPreferences::default(),
            panel_orientation: PanelOrientation::Portrait,
        }
    }

    fn segment(id: &str, lat: f64) -> RoofSegment {
        RoofSegment {
            id: id.into(),
            orientation: 180.,
            boundary_points: vec![LatLng { lat, lng: -1.89 }],
        }
    }

    #[rstest]
    fn should_assess_single_property_roof(assessor: RoofAssessor) {
        let assessment = assessor.assess_roof(&request(vec![segment("a", 52.4862)]));

        assert!(!assessment.needs_confirmation);
        assert_eq!(assessment.property_detection.property_count, 1);
        assert_eq!(assessment.layout.panel_count, 10);
        assert!(assessment.realism.is_realistic);
        assert_eq!(assessment.panel.brand, "LONGi");
        assert_relative_eq!(assessment.system_size_kw, 4.3);
        assert_relative_eq!(assessment.estimated_panel_cost_gbp, 1806., max_relative = 1e-12);
        let packing = assessment.packing.unwrap();
        // (6.3 + 0.02) / 1.154 -> 5 across, (2.8 + 0.9) / 2.622 -> 1 row
        assert_eq!(packing.total_panels, 5);
    }

    #[rstest]
    fn should_flag_capture_spanning_several_properties(assessor: RoofAssessor) {
        let assessment = assessor.assess_roof(&request(vec![
            segment("a", 52.4862),
            segment("b", 52.4872),
        ]));

        assert!(assessment.needs_confirmation);
        assert_eq!(assessment.property_detection.property_count, 2);
    }

    #[rstest]
    fn should_skip_packing_without_roof_dimensions(assessor: RoofAssessor) {
        let mut request = request(vec![]);
        request.roof.width = 0.;

        let assessment = assessor.assess_roof(&request);

        assert_eq!(assessment.packing, None);
        assert_eq!(assessment.property_detection.property_count, 0);
        assert!(!assessment.needs_confirmation);
    }

    #[rstest]
    fn should_deserialise_request_with_defaults() {
        let request: RoofAssessmentRequest = serde_json::from_str(
            r#"{
                "house_type": "detached",
                "roof": {"area": 45.0, "width": 9.0, "height": 5.0, "orientation": 170.0, "pitch": 30.0}
            }"#,
        )
        .unwrap();

        assert_eq!(request.house_type, HouseType::Detached);
        assert!(request.segments.is_empty());
        assert_eq!(request.panel_orientation, PanelOrientation::Portrait);
        assert_eq!(request.panel_preferences, PanelPreferences::default());
    }
}
