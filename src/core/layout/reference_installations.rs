use crate::core::clustering::LatLng;
use crate::core::layout::{HouseType, PanelOrientation, PanelSpacing, RoofType};
use crate::core::units::{linear_similarity, Orientation360};
use anyhow::bail;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Cursor, Read};
use std::sync::LazyLock;

/// This module holds a corpus of real installations and scores them as analogues for a new roof.

static BUNDLED_LIBRARY: LazyLock<ReferenceLibrary> = LazyLock::new(|| {
    ReferenceLibrary::from_json(BufReader::new(Cursor::new(include_str!(
        "reference_installations.json"
    ))))
    .expect("bundled reference installations should be well formed")
});

const HOUSE_TYPE_WEIGHT: f64 = 40.;
const ROOF_AREA_WEIGHT: f64 = 30.;
const ORIENTATION_WEIGHT: f64 = 20.;
const PITCH_WEIGHT: f64 = 10.;
/// orientation similarity reaches zero at opposite bearings
const ORIENTATION_SPAN: f64 = 180.;
/// pitch similarity reaches zero at this difference
const PITCH_SPAN: f64 = 45.;
pub const DEFAULT_MATCH_THRESHOLD: f64 = 50.;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ReferencePanelLayout {
    pub rows: usize,
    pub panels_per_row: Vec<u32>,
    pub orientation: PanelOrientation,
    /// degrees
    pub tilt: f64,
    pub spacing: PanelSpacing,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoofCharacteristics {
    /// m2
    pub area: f64,
    /// degrees
    pub pitch: f64,
    /// compass bearing, degrees
    pub orientation: f64,
    #[serde(default)]
    pub obstacles: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SolarInstallationExample {
    pub id: String,
    pub house_type: HouseType,
    pub roof_type: RoofType,
    pub panel_count: u32,
    pub system_size_kw: f64,
    pub layout_pattern: String,
    pub panel_brand: String,
    pub coordinates: LatLng,
    pub panel_layout: ReferencePanelLayout,
    pub roof_characteristics: RoofCharacteristics,
}

/// Per-criterion contributions to a match score, each already weighted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub house_type: f64,
    pub roof_area: f64,
    pub orientation: f64,
    pub pitch: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.house_type + self.roof_area + self.orientation + self.pitch
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredInstallation<'a> {
    pub installation: &'a SolarInstallationExample,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

#[derive(Clone, Debug)]
pub struct ReferenceLibrary {
    installations: Vec<SolarInstallationExample>,
}

impl ReferenceLibrary {
    /// Read installations from a JSON array, checking each layout is self-consistent.
    pub fn from_json(json: impl Read) -> anyhow::Result<Self> {
        let installations: Vec<SolarInstallationExample> = serde_json::from_reader(json)?;
        for installation in &installations {
            let layout = &installation.panel_layout;
            let row_total: u32 = layout.panels_per_row.iter().sum();
            if row_total != installation.panel_count {
                bail!(
                    "Reference installation {} lists {} panels but its rows hold {}",
                    installation.id,
                    installation.panel_count,
                    row_total
                );
            }
            if layout.rows != layout.panels_per_row.len() {
                bail!(
                    "Reference installation {} declares {} rows but lists {}",
                    installation.id,
                    layout.rows,
                    layout.panels_per_row.len()
                );
            }
            if installation.roof_characteristics.area <= 0. {
                bail!(
                    "Reference installation {} has a non-positive roof area",
                    installation.id
                );
            }
        }
        Ok(Self { installations })
    }

    pub fn bundled() -> &'static Self {
        &BUNDLED_LIBRARY
    }

    pub fn installations(&self) -> &[SolarInstallationExample] {
        &self.installations
    }

    pub fn by_house_type(&self, house_type: HouseType) -> Vec<&SolarInstallationExample> {
        self.installations
            .iter()
            .filter(|installation| installation.house_type == house_type)
            .collect()
    }

    /// Every installation scored against the target, best first. Equal scores keep corpus order.
    pub fn scored(
        &self,
        house_type: HouseType,
        roof_area: f64,
        roof_orientation: f64,
        roof_pitch: f64,
    ) -> Vec<ScoredInstallation<'_>> {
        self.installations
            .iter()
            .map(|installation| {
                let breakdown = score_installation(
                    installation,
                    house_type,
                    roof_area,
                    roof_orientation,
                    roof_pitch,
                );
                ScoredInstallation {
                    installation,
                    score: breakdown.total(),
                    breakdown,
                }
            })
            .sorted_by(|a, b| b.score.total_cmp(&a.score))
            .collect()
    }
}

/// Scores a target roof against a reference on a 100-point scale: 40 for the same house type,
/// up to 30 for roof area, 20 for orientation and 10 for pitch, each falling linearly with the
/// difference.
pub fn score_installation(
    installation: &SolarInstallationExample,
    house_type: HouseType,
    roof_area: f64,
    roof_orientation: f64,
    roof_pitch: f64,
) -> ScoreBreakdown {
    let roof = &installation.roof_characteristics;

    let relative_area_difference = (roof_area - roof.area) / roof.area;
    let orientation_difference = Orientation360::orientation_difference(
        roof_orientation.into(),
        roof.orientation.into(),
    );

    ScoreBreakdown {
        house_type: if installation.house_type == house_type {
            HOUSE_TYPE_WEIGHT
        } else {
            0.
        },
        roof_area: ROOF_AREA_WEIGHT * linear_similarity(relative_area_difference, 1.),
        orientation: ORIENTATION_WEIGHT
            * linear_similarity(orientation_difference, ORIENTATION_SPAN),
        pitch: PITCH_WEIGHT * linear_similarity(roof_pitch - roof.pitch, PITCH_SPAN),
    }
}

/// Finds the reference installation that best resembles a roof, provided it is similar enough
/// to anchor a layout.
#[derive(Clone, Debug)]
pub struct ReferenceInstallationMatcher<'a> {
    library: &'a ReferenceLibrary,
    threshold: f64,
}

impl<'a> ReferenceInstallationMatcher<'a> {
    pub fn new(library: &'a ReferenceLibrary) -> Self {
        Self {
            library,
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }

    /// Only scores strictly above `threshold` count as a match.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn best_match(
        &self,
        house_type: HouseType,
        roof_area: f64,
        roof_orientation: f64,
        roof_pitch: f64,
    ) -> Option<ScoredInstallation<'a>> {
        self.library
            .scored(house_type, roof_area, roof_orientation, roof_pitch)
            .into_iter()
            .next()
            .filter(|best| best.score > self.threshold)
    }
}
