pub mod planner;
pub mod reference_installations;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(
    Clone, Copy, Debug, Deserialize, Display, EnumIter, EnumString, Eq, Hash, PartialEq, Serialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum HouseType {
    Detached,
    SemiDetached,
    Terraced,
    EndTerrace,
    Bungalow,
    Flat,
}

#[derive(Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum RoofType {
    Gable,
    Hip,
    Flat,
    Mansard,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum PanelOrientation {
    #[default]
    Portrait,
    Landscape,
}

/// Clearances around and between panels, in metres.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PanelSpacing {
    pub between_panels: f64,
    pub from_edge: f64,
    pub walkway: f64,
}

/// A roof face to plan for. Lengths in metres, area in m2, angles in degrees.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoofGeometry {
    pub area: f64,
    pub width: f64,
    pub height: f64,
    /// compass bearing the face points towards, S=180
    pub orientation: f64,
    pub pitch: f64,
}
