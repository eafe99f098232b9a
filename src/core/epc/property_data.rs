use crate::config::ResolverConfig;
use crate::core::epc::registry::CertificateRow;
use chrono::{Months, NaiveDate, NaiveDateTime};
use serde::Serialize;
use strum::Display;

const SMALL_HOME_MAX_FLOOR_AREA: f64 = 80.;
const MEDIUM_HOME_MAX_FLOOR_AREA: f64 = 150.;

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum HomeSize {
    Small,
    Medium,
    Large,
}

impl HomeSize {
    /// Small below 80 m2, Large above 150 m2, Medium in between (both ends inclusive).
    pub fn from_floor_area(floor_area: f64) -> Option<Self> {
        if !floor_area.is_finite() || floor_area <= 0. {
            return None;
        }
        Some(if floor_area < SMALL_HOME_MAX_FLOOR_AREA {
            Self::Small
        } else if floor_area <= MEDIUM_HOME_MAX_FLOOR_AREA {
            Self::Medium
        } else {
            Self::Large
        })
    }
}

/// Authoritative property characteristics taken from an energy performance certificate.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyData {
    pub property_type: Option<String>,
    pub built_form: Option<String>,
    pub current_energy_rating: Option<String>,
    pub potential_energy_rating: Option<String>,
    /// m2
    pub floor_area: Option<f64>,
    pub construction_age_band: Option<String>,
    pub inspection_date: Option<NaiveDate>,
    /// kWh/year, only present when within the plausible band
    pub energy_consumption: Option<f64>,
    /// tonnes/year
    pub co2_emissions: Option<f64>,
    /// GBP/year
    pub heating_costs: Option<f64>,
    pub home_size: Option<HomeSize>,
    pub is_epc_old: bool,
    pub full_address: String,
    pub lmk_key: String,
}

impl PropertyData {
    /// Shape a certificate row into property data, judging certificate age against `today`.
    pub fn from_certificate(row: CertificateRow, config: &ResolverConfig, today: NaiveDate) -> Self {
        let inspection_date = row.inspection_date.as_deref().and_then(parse_registry_date);
        let is_epc_old = inspection_date.is_some_and(|inspected| {
            today
                .checked_sub_months(Months::new(config.epc_age_limit_years.saturating_mul(12)))
                .is_some_and(|cutoff| inspected < cutoff)
        });
        let energy_consumption = row.energy_consumption_current.filter(|kwh| {
            (config.min_energy_consumption_kwh..=config.max_energy_consumption_kwh).contains(kwh)
        });
        let full_address = full_address(&row);

        Self {
            property_type: row.property_type,
            built_form: row.built_form,
            current_energy_rating: row.current_energy_rating,
            potential_energy_rating: row.potential_energy_rating,
            floor_area: row.total_floor_area,
            construction_age_band: row.construction_age_band,
            inspection_date,
            energy_consumption,
            co2_emissions: row.co2_emissions_current,
            heating_costs: row.heating_cost_current,
            home_size: row.total_floor_area.and_then(HomeSize::from_floor_area),
            is_epc_old,
            full_address,
            lmk_key: row.lmk_key,
        }
    }
}

fn parse_registry_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .ok()
}

/// The registry's combined address line when present, otherwise the individual lines and town,
/// always followed by the postcode.
fn full_address(row: &CertificateRow) -> String {
    let street = match &row.address {
        Some(address) => vec![address.as_str()],
        None => [&row.address1, &row.address2, &row.address3, &row.posttown]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect(),
    };

    street
        .into_iter()
        .chain(row.postcode.as_deref())
        .collect::<Vec<_>>()
        .join(", ")
}
