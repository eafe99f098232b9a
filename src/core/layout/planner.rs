use crate::config::LayoutConfig;
use crate::core::layout::reference_installations::{
    ReferenceInstallationMatcher, ReferenceLibrary, ScoredInstallation,
};
use crate::core::layout::{HouseType, PanelOrientation, PanelSpacing, RoofGeometry};
use crate::core::panels::catalog::SolarPanelSpec;
use crate::core::units::centimetres_to_metres;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// This module plans panel layouts for a roof face.
///
/// There are two independent estimates. `generate_realistic_layout` scales a similar real
/// installation, falling back to a conservative area fill. `calculate_mcs_compliant_spacing`
/// packs a specific panel model into the roof rectangle after clearances. Neither constrains the
/// other; `validate_layout_realism` can be applied to the output of either.

const FALLBACK_PATTERN: &str = "grid";
const EMPTY_PATTERN: &str = "none";
/// Ceiling on the panels in any one plan, far beyond any real roof
pub const MAX_PLAN_PANELS: u32 = 100_000;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LayoutSource {
    /// scaled from a reference installation
    Reference { id: String, score: f64 },
    /// conservative fill of the roof area
    AreaFill,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayoutPlan {
    pub panel_count: u32,
    pub rows: usize,
    /// sums to `panel_count`; no row is empty
    pub panels_per_row: Vec<u32>,
    /// total panel footprint in m2
    pub total_area: f64,
    pub spacing: PanelSpacing,
    pub pattern: String,
    pub source: LayoutSource,
}

/// Result of packing a specific panel into a roof rectangle. Spacing in metres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct McsSpacing {
    pub panels_per_row: u32,
    pub number_of_rows: u32,
    pub total_panels: u32,
    pub spacing_x: f64,
    pub spacing_y: f64,
}

/// Width and height of a roof face in metres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RoofDimensions {
    pub width: f64,
    pub height: f64,
}

impl From<&RoofGeometry> for RoofDimensions {
    fn from(roof: &RoofGeometry) -> Self {
        Self {
            width: roof.width,
            height: roof.height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "kebab-case")]
pub enum RealismIssue {
    NoRoofArea,
    Overcrowded { utilisation: f64 },
    UnderUsed { utilisation: f64 },
    PanelGapTooSmall { gap: f64 },
    EdgeClearanceTooSmall { clearance: f64 },
}

impl RealismIssue {
    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::NoRoofArea => "Measure the usable roof area before planning a layout",
            Self::Overcrowded { .. } => {
                "Reduce the panel count to leave room for access and edge clearance"
            }
            Self::UnderUsed { .. } => "Consider adding panels to make better use of the roof",
            Self::PanelGapTooSmall { .. } => {
                "Leave at least 1 cm between panels for thermal expansion and mounting clamps"
            }
            Self::EdgeClearanceTooSmall { .. } => {
                "Keep panels at least 0.5 m from roof edges to meet wind-load guidance"
            }
        }
    }
}

impl Display for RealismIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRoofArea => write!(f, "Roof area must be greater than zero"),
            Self::Overcrowded { utilisation } => write!(
                f,
                "Roof utilisation too high: panels cover {:.0}% of the roof",
                utilisation * 100.
            ),
            Self::UnderUsed { utilisation } => write!(
                f,
                "Roof utilisation low: panels cover only {:.0}% of the roof",
                utilisation * 100.
            ),
            Self::PanelGapTooSmall { gap } => {
                write!(f, "Gap between panels of {:.1} cm is too small", gap * 100.)
            }
            Self::EdgeClearanceTooSmall { clearance } => {
                write!(f, "Edge clearance of {clearance:.2} m is too small")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RealismReport {
    pub is_realistic: bool,
    /// panel footprint as a share of roof area
    pub utilisation: f64,
    pub issues: Vec<RealismIssue>,
    pub recommendations: Vec<String>,
}

impl RealismReport {
    pub fn issue_messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

pub struct LayoutPlanner<'a> {
    matcher: ReferenceInstallationMatcher<'a>,
    config: LayoutConfig,
}

impl<'a> LayoutPlanner<'a> {
    pub fn new(library: &'a ReferenceLibrary, config: LayoutConfig) -> Self {
        Self {
            matcher: ReferenceInstallationMatcher::new(library)
                .with_threshold(config.reference_match_threshold),
            config,
        }
    }

    /// Spacing used by the area-fill fallback.
    pub fn conservative_spacing(&self) -> PanelSpacing {
        PanelSpacing {
            between_panels: self.config.min_panel_gap_m,
            from_edge: self.config.edge_clearance_m,
            walkway: self.config.walkway_m,
        }
    }

    /// Plan a layout from the closest reference installation, or fill the area conservatively
    /// when nothing is close enough. A roof with no positive area gets an empty plan.
    pub fn generate_realistic_layout(
        &self,
        roof: &RoofGeometry,
        house_type: HouseType,
    ) -> LayoutPlan {
        if !(roof.area.is_finite() && roof.area > 0.) {
            return self.plan_from_rows(
                vec![],
                self.conservative_spacing(),
                EMPTY_PATTERN.into(),
                LayoutSource::AreaFill,
            );
        }

        match self
            .matcher
            .best_match(house_type, roof.area, roof.orientation, roof.pitch)
        {
            Some(reference) => self.scale_reference(&reference, roof.area),
            None => self.area_fill(roof.area),
        }
    }

    /// Scales each row of the reference by the square root of the area ratio, so the grid grows
    /// in both directions. Rows that round to nothing are dropped and no plan exceeds
    /// `MAX_PLAN_PANELS`.
    fn scale_reference(&self, reference: &ScoredInstallation, roof_area: f64) -> LayoutPlan {
        let installation = reference.installation;
        let scale = (roof_area / installation.roof_characteristics.area).sqrt();
        let reference_rows = &installation.panel_layout.panels_per_row;
        let row_ceiling = MAX_PLAN_PANELS / reference_rows.len().max(1) as u32;
        let panels_per_row = reference_rows
            .iter()
            .map(|&panels| ((panels as f64 * scale).round() as u32).min(row_ceiling))
            .filter(|&panels| panels > 0)
            .collect::<Vec<_>>();
        let pattern = if panels_per_row.is_empty() {
            EMPTY_PATTERN.into()
        } else {
            installation.layout_pattern.clone()
        };

        self.plan_from_rows(
            panels_per_row,
            installation.panel_layout.spacing,
            pattern,
            LayoutSource::Reference {
                id: installation.id.clone(),
                score: reference.score,
            },
        )
    }

    /// Covers at most the configured share of the roof with a roughly square grid.
    fn area_fill(&self, roof_area: f64) -> LayoutPlan {
        let max_panels = (roof_area * self.config.fallback_utilisation_cap
            / self.config.assumed_panel_area_m2)
            .floor() as u32;
        let max_panels = max_panels.min(MAX_PLAN_PANELS);
        let pattern = if max_panels == 0 {
            EMPTY_PATTERN
        } else {
            FALLBACK_PATTERN
        };

        self.plan_from_rows(
            square_grid(max_panels),
            self.conservative_spacing(),
            pattern.into(),
            LayoutSource::AreaFill,
        )
    }

    fn plan_from_rows(
        &self,
        panels_per_row: Vec<u32>,
        spacing: PanelSpacing,
        pattern: String,
        source: LayoutSource,
    ) -> LayoutPlan {
        let panel_count: u32 = panels_per_row.iter().sum();
        LayoutPlan {
            panel_count,
            rows: panels_per_row.len(),
            panels_per_row,
            total_area: panel_count as f64 * self.config.assumed_panel_area_m2,
            spacing,
            pattern,
            source,
        }
    }

    /// Pack `panel` into the roof rectangle. The edge clearance comes off every side; panels sit
    /// the minimum gap apart across a row and rows are separated by the walkway. Whatever space is
    /// left is shared out evenly between panels and between rows.
    pub fn calculate_mcs_compliant_spacing(
        &self,
        panel: &SolarPanelSpec,
        roof: RoofDimensions,
        orientation: PanelOrientation,
    ) -> McsSpacing {
        let (panel_across, panel_down) = match orientation {
            PanelOrientation::Portrait => (
                centimetres_to_metres(panel.width_cm),
                centimetres_to_metres(panel.length_cm),
            ),
            PanelOrientation::Landscape => (
                centimetres_to_metres(panel.length_cm),
                centimetres_to_metres(panel.width_cm),
            ),
        };
        let usable_width = roof.width - 2. * self.config.edge_clearance_m;
        let usable_height = roof.height - 2. * self.config.edge_clearance_m;

        let (panels_per_row, spacing_x) =
            pack_along(usable_width, panel_across, self.config.min_panel_gap_m);
        let (number_of_rows, spacing_y) =
            pack_along(usable_height, panel_down, self.config.walkway_m);

        if panels_per_row == 0 || number_of_rows == 0 {
            return McsSpacing {
                panels_per_row: 0,
                number_of_rows: 0,
                total_panels: 0,
                spacing_x: self.config.min_panel_gap_m,
                spacing_y: self.config.walkway_m,
            };
        }

        McsSpacing {
            panels_per_row,
            number_of_rows,
            total_panels: panels_per_row * number_of_rows,
            spacing_x,
            spacing_y,
        }
    }

    /// Check a layout against installer rules of thumb. Realistic only when no issue is raised.
    pub fn validate_layout_realism(
        &self,
        panel_count: u32,
        roof_area: f64,
        spacing: &PanelSpacing,
    ) -> RealismReport {
        let mut issues = vec![];
        let mut utilisation = 0.;

        if roof_area.is_finite() && roof_area > 0. {
            utilisation = panel_count as f64 * self.config.assumed_panel_area_m2 / roof_area;
            if utilisation > self.config.max_realistic_utilisation {
                issues.push(RealismIssue::Overcrowded { utilisation });
            } else if utilisation < self.config.min_realistic_utilisation {
                issues.push(RealismIssue::UnderUsed { utilisation });
            }
        } else {
            issues.push(RealismIssue::NoRoofArea);
        }
        if spacing.between_panels < self.config.min_realistic_gap_m {
            issues.push(RealismIssue::PanelGapTooSmall {
                gap: spacing.between_panels,
            });
        }
        if spacing.from_edge < self.config.min_realistic_edge_clearance_m {
            issues.push(RealismIssue::EdgeClearanceTooSmall {
                clearance: spacing.from_edge,
            });
        }

        RealismReport {
            is_realistic: issues.is_empty(),
            utilisation,
            recommendations: issues
                .iter()
                .map(|issue| issue.recommendation().to_string())
                .collect(),
            issues,
        }
    }

    pub fn validate_plan(&self, plan: &LayoutPlan, roof_area: f64) -> RealismReport {
        self.validate_layout_realism(plan.panel_count, roof_area, &plan.spacing)
    }
}

/// Rows of a roughly square grid holding `panel_count` panels: `ceil(sqrt(n))` rows' worth of
/// panels per row, with any shortfall in the last row.
fn square_grid(panel_count: u32) -> Vec<u32> {
    if panel_count == 0 {
        return vec![];
    }
    let rows = (panel_count as f64).sqrt().ceil() as u32;
    let per_row = panel_count.div_ceil(rows);

    let mut remaining = panel_count;
    let mut panels_per_row = vec![];
    while remaining > 0 {
        let in_row = per_row.min(remaining);
        panels_per_row.push(in_row);
        remaining -= in_row;
    }
    panels_per_row
}

/// How many items of `item_length` fit along `available` with at least `min_gap` between them,
/// and the even gap once leftover space is shared out. The gap never drops below `min_gap`.
fn pack_along(available: f64, item_length: f64, min_gap: f64) -> (u32, f64) {
    if !(available.is_finite() && item_length.is_finite()) || available <= 0. || item_length <= 0.
    {
        return (0, min_gap);
    }

    let count = ((available + min_gap) / (item_length + min_gap)).floor().max(0.) as u32;
    let gap = if count > 1 {
        ((available - count as f64 * item_length) / (count - 1) as f64).max(min_gap)
    } else {
        min_gap
    };
    (count, gap)
}
