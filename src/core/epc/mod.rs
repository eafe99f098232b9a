pub mod property_data;
pub mod registry;
pub mod resolver;
