use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use strum::Display;

/// This module classifies free-text UK addresses by how precisely they pick out a single property.

static POSTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[A-Z]{1,2}\d[A-Z\d]?\s*\d[A-Z]{2}\b").expect("postcode pattern is valid")
});
static LEADING_HOUSE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[A-Za-z]?\b").expect("house number pattern is valid"));
static STANDALONE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+[A-Za-z]?\b").expect("number pattern is valid"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

pub const MISSING_HOUSE_NUMBER: &str =
    "Please include a house number or name (e.g. 42 Baker Street)";
pub const MISSING_POSTCODE: &str = "A full UK postcode is required (e.g. NW1 6XE)";
pub const MISSING_STREET_NAME: &str = "Please include the street name";

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum AddressSpecificity {
    Low,
    Medium,
    High,
}

impl AddressSpecificity {
    fn from_signals(has_house_number: bool, has_postcode: bool, has_street_name: bool) -> Self {
        match [has_house_number, has_postcode, has_street_name]
            .into_iter()
            .filter(|signal| *signal)
            .count()
        {
            3 => Self::High,
            2 => Self::Medium,
            _ => Self::Low,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressValidation {
    pub is_valid: bool,
    pub has_house_number: bool,
    pub has_postcode: bool,
    pub has_street_name: bool,
    /// first postcode found, upper-cased and spaced
    pub postcode: Option<String>,
    pub specificity: AddressSpecificity,
    pub errors: Vec<String>,
    pub normalized_address: String,
}

/// Classify an address by the presence of a house number, a UK postcode and a street name.
///
/// Never fails: empty or garbled input comes back as `Low` specificity with one error per
/// missing signal. Only `High` specificity counts as valid.
pub fn validate_address(address: &str) -> AddressValidation {
    let normalized_address = normalise_whitespace(address);

    let has_house_number = has_house_number(&normalized_address);
    let postcode = extract_postcode(&normalized_address);
    let has_postcode = postcode.is_some();
    let has_street_name = has_street_name(&normalized_address);

    let mut errors = vec![];
    if !has_house_number {
        errors.push(MISSING_HOUSE_NUMBER.to_string());
    }
    if !has_postcode {
        errors.push(MISSING_POSTCODE.to_string());
    }
    if !has_street_name {
        errors.push(MISSING_STREET_NAME.to_string());
    }

    let specificity =
        AddressSpecificity::from_signals(has_house_number, has_postcode, has_street_name);

    AddressValidation {
        is_valid: specificity == AddressSpecificity::High,
        has_house_number,
        has_postcode,
        has_street_name,
        postcode,
        specificity,
        errors,
        normalized_address,
    }
}

/// First UK postcode found in the text, upper-cased with a single space before the inward code.
pub fn extract_postcode(address: &str) -> Option<String> {
    POSTCODE.find(address).map(|found| {
        let compact: Vec<char> = found
            .as_str()
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect();
        let (outward, inward) = compact.split_at(compact.len().saturating_sub(3));
        format!(
            "{} {}",
            outward.iter().collect::<String>(),
            inward.iter().collect::<String>()
        )
    })
}

fn normalise_whitespace(address: &str) -> String {
    WHITESPACE.replace_all(address.trim(), " ").into_owned()
}

fn has_house_number(address: &str) -> bool {
    if LEADING_HOUSE_NUMBER.is_match(address) {
        return true;
    }

    // "Flat 3, ..." style addresses carry the number later in the first segment. The postcode is
    // removed first so that its digits never pass for a house number.
    let first_segment = address.split(',').next().unwrap_or_default();
    let first_segment = POSTCODE.replace_all(first_segment, "");
    STANDALONE_NUMBER.is_match(&first_segment)
}

fn has_street_name(address: &str) -> bool {
    address
        .split([',', ' '])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .any(|token| {
            token.chars().count() > 2
                && token.chars().all(char::is_alphabetic)
                && !POSTCODE.is_match(token)
        })
}
