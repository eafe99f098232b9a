use crate::config::ResolverConfig;
use crate::core::epc::property_data::PropertyData;
use crate::core::epc::registry::{CertificateRow, EpcRegistry, SearchQuery};
use chrono::{Local, NaiveDate};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::{debug, info, warn};

/// This module finds the energy performance certificate for a property by trying progressively
/// looser registry searches until one returns rows.

static HOUSE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+[A-Za-z]?)").expect("house number pattern is valid"));

/// Registry searches in the order they are attempted, most specific first.
#[derive(Clone, Copy, Debug, Display, EnumIter, Eq, Hash, PartialEq, Serialize)]
pub enum LookupStrategy {
    /// full address with full postcode
    ExactAddress,
    /// full address with the outward half of the postcode
    AddressWithOutwardPostcode,
    /// house number with full postcode
    HouseNumberWithPostcode,
    /// every certificate in the postcode; may pick a neighbouring property
    PostcodeOnly,
}

impl LookupStrategy {
    /// The query for this strategy, or `None` when the inputs cannot support it.
    pub fn query(
        &self,
        address: &str,
        postcode: &str,
        config: &ResolverConfig,
    ) -> Option<SearchQuery> {
        let address = address.trim();
        let postcode = postcode.trim();
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

        match self {
            Self::ExactAddress => Some(SearchQuery {
                address: Some(non_empty(address)?),
                postcode: Some(non_empty(postcode)?),
                size: config.exact_match_size,
            }),
            Self::AddressWithOutwardPostcode => Some(SearchQuery {
                address: Some(non_empty(address)?),
                postcode: Some(non_empty(&outward_postcode(postcode))?),
                size: config.outward_postcode_size,
            }),
            Self::HouseNumberWithPostcode => Some(SearchQuery {
                address: Some(extract_house_number(address)?),
                postcode: Some(non_empty(postcode)?),
                size: config.house_number_size,
            }),
            Self::PostcodeOnly => Some(SearchQuery {
                address: None,
                postcode: Some(non_empty(postcode)?),
                size: config.postcode_only_size,
            }),
        }
    }
}

/// Leading digits of an address plus an optional single letter suffix, e.g. "12A".
pub fn extract_house_number(address: &str) -> Option<String> {
    HOUSE_NUMBER
        .captures(address)
        .and_then(|captures| captures.get(1))
        .map(|number| number.as_str().to_string())
}

/// The outward code of a postcode: everything before the first space, or the first half of the
/// characters when there is no space.
pub fn outward_postcode(postcode: &str) -> String {
    let postcode = postcode.trim();
    match postcode.split_once(' ') {
        Some((outward, _)) => outward.to_string(),
        None => {
            let half = postcode.chars().count() / 2;
            postcode.chars().take(half).collect()
        }
    }
}

/// How a resolution went, for diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub attempted: Vec<LookupStrategy>,
    pub matched_strategy: Option<LookupStrategy>,
    pub property_data: Option<PropertyData>,
}

/// Resolves EPC data for an address through an injected registry.
///
/// Every registry failure is treated as "nothing found" for the step that raised it. A `None`
/// result means the caller should carry on with the property details the user declared.
pub struct EpcResolver<R: EpcRegistry> {
    registry: R,
    config: ResolverConfig,
    reference_date: Option<NaiveDate>,
}

impl<R: EpcRegistry> EpcResolver<R> {
    pub fn new(registry: R, config: ResolverConfig) -> Self {
        Self {
            registry,
            config,
            reference_date: None,
        }
    }

    /// Judge certificate age against a fixed date rather than today.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn get_property_data(&self, address: &str, postcode: &str) -> Option<PropertyData> {
        self.resolve_with_trace(address, postcode).property_data
    }

    pub fn resolve_with_trace(&self, address: &str, postcode: &str) -> Resolution {
        let mut attempted = vec![];

        let found = LookupStrategy::iter().find_map(|strategy| {
            let Some(query) = strategy.query(address, postcode, &self.config) else {
                debug!(%strategy, "skipping EPC lookup strategy, inputs do not support it");
                return None;
            };
            attempted.push(strategy);
            self.first_row(strategy, &query).map(|row| (strategy, row))
        });

        let Some((strategy, row)) = found else {
            info!(postcode, "no EPC record found by any lookup strategy");
            return Resolution {
                attempted,
                matched_strategy: None,
                property_data: None,
            };
        };

        info!(%strategy, lmk_key = %row.lmk_key, "EPC search matched");
        let property_data = match self.registry.certificate(&row.lmk_key) {
            Ok(certificate) => Some(PropertyData::from_certificate(
                certificate,
                &self.config,
                self.today(),
            )),
            Err(error) => {
                warn!(lmk_key = %row.lmk_key, %error, "EPC certificate fetch failed");
                None
            }
        };

        Resolution {
            attempted,
            matched_strategy: Some(strategy),
            property_data,
        }
    }

    fn first_row(&self, strategy: LookupStrategy, query: &SearchQuery) -> Option<CertificateRow> {
        debug!(%strategy, ?query, "attempting EPC lookup strategy");
        match self.registry.search(query) {
            Ok(response) => response.rows.into_iter().next(),
            Err(error) => {
                warn!(%strategy, %error, "EPC search failed, treating as no results");
                None
            }
        }
    }

    fn today(&self) -> NaiveDate {
        self.reference_date.unwrap_or_else(|| Local::now().date_naive())
    }
}
