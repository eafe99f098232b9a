pub mod address;
pub mod clustering;
pub mod epc;
pub mod layout;
pub mod panels;
pub mod units;
