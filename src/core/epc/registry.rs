use crate::errors::RegistryError;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;

/// Parameters for one registry search. Absent fields are left off the request entirely.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct SearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    pub size: usize,
}

impl SearchQuery {
    /// Query-string pairs in the order a transport should send them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![];
        if let Some(address) = &self.address {
            pairs.push(("address", address.clone()));
        }
        if let Some(postcode) = &self.postcode {
            pairs.push(("postcode", postcode.clone()));
        }
        pairs.push(("size", self.size.to_string()));
        pairs
    }
}

/// Access to the energy-certificate registry. Implementations own their transport and
/// credentials; the resolver only builds queries and interprets rows.
pub trait EpcRegistry {
    fn search(&self, query: &SearchQuery) -> Result<SearchResponse, RegistryError>;

    fn certificate(&self, lmk_key: &str) -> Result<CertificateRow, RegistryError>;
}

impl<T: EpcRegistry + ?Sized> EpcRegistry for &T {
    fn search(&self, query: &SearchQuery) -> Result<SearchResponse, RegistryError> {
        (**self).search(query)
    }

    fn certificate(&self, lmk_key: &str) -> Result<CertificateRow, RegistryError> {
        (**self).certificate(lmk_key)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(rename = "column-names", default)]
    pub column_names: Vec<String>,
    #[serde(default)]
    pub rows: Vec<CertificateRow>,
}

impl SearchResponse {
    pub fn from_json(json: impl Read) -> Result<Self, RegistryError> {
        Ok(serde_json::from_reader(json)?)
    }

    /// A certificate-detail response has the same shape as a search response with one row.
    pub fn single_certificate(self, lmk_key: &str) -> Result<CertificateRow, RegistryError> {
        self.rows
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::CertificateNotFound(lmk_key.to_string()))
    }
}

/// One registry row. The registry sends every value as a string, often empty; empty strings and
/// values that fail to parse come through as `None`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CertificateRow {
    pub lmk_key: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub address1: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub address2: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub address3: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub posttown: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub postcode: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub built_form: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub current_energy_rating: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub potential_energy_rating: Option<String>,
    #[serde(default, deserialize_with = "loose_number")]
    pub total_floor_area: Option<f64>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub construction_age_band: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub inspection_date: Option<String>,
    #[serde(default, deserialize_with = "loose_number")]
    pub energy_consumption_current: Option<f64>,
    #[serde(default, deserialize_with = "loose_number")]
    pub co2_emissions_current: Option<f64>,
    #[serde(default, deserialize_with = "loose_number")]
    pub heating_cost_current: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(f64),
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.and_then(|value| match value {
        StringOrNumber::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        StringOrNumber::Number(n) => Some(n.to_string()),
    }))
}

fn loose_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.and_then(|value| match value {
        StringOrNumber::String(s) => s.trim().parse::<f64>().ok(),
        StringOrNumber::Number(n) => Some(n),
    })
    .filter(|n| n.is_finite()))
}
