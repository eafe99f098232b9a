pub mod assessment;
pub mod config;
pub mod core;
pub mod errors;


pub use crate::assessment::{RoofAssessment, RoofAssessmentRequest, RoofAssessor};
pub use crate::config::EngineConfig;
pub use crate::core::address::{validate_address, AddressSpecificity, AddressValidation};
pub use crate::core::clustering::{MultiPropertyDetection, PropertyClusterDetector, RoofSegment};
pub use crate::core::epc::property_data::PropertyData;
pub use crate::core::epc::registry::EpcRegistry;
pub use crate::core::epc::resolver::EpcResolver;
pub use crate::core::layout::planner::LayoutPlanner;
pub use crate::core::layout::reference_installations::{
    ReferenceInstallationMatcher, ReferenceLibrary,
};
pub use crate::core::panels::catalog::{PanelCatalog, SolarPanelSpec};
