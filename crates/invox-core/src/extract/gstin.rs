//! GST identifier validation and decomposition.
//!
//! A GSTIN is a fixed-format 15-character business tax registration code:
//! 2-digit state code, 10-character PAN segment, entity code, the literal
//! `Z`, and a check digit.

use serde::{Deserialize, Serialize};

use super::patterns::GSTIN_EXACT;

/// Validated components of a GST identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstDetails {
    pub raw: String,
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_digit: Option<String>,
}

impl GstDetails {
    /// Validate a candidate identifier and decompose it into components.
    /// Anything that is not exactly 15 conforming characters is invalid,
    /// with no components populated.
    pub fn parse(raw: &str) -> Self {
        let mut details = Self {
            raw: raw.to_string(),
            is_valid: false,
            state_code: None,
            pan: None,
            entity_type: None,
            check_digit: None,
        };

        if raw.len() != 15 || !GSTIN_EXACT.is_match(raw) {
            return details;
        }

        details.is_valid = true;
        details.state_code = Some(raw[0..2].to_string());
        details.pan = Some(raw[2..12].to_string());
        details.entity_type = Some(entity_type(raw.as_bytes()[12] as char).to_string());
        details.check_digit = Some(raw[14..15].to_string());
        details
    }
}

/// Registration entity type encoded in the 13th character.
fn entity_type(code: char) -> &'static str {
    match code {
        '1' => "Company",
        '2' => "Society",
        '3' => "Public Limited Company",
        '4' => "Partnership Firm",
        '5' => "LLP",
        '6' => "Government",
        '7' => "Trust",
        '8' => "HUF",
        '9' => "Individual",
        'A' => "Association of Persons",
        'B' => "Body of Individuals",
        'C' => "Company",
        'F' => "Firm",
        'G' => "Government",
        'H' => "HUF",
        'L' => "LLP",
        'P' => "Individual",
        'T' => "Trust",
        _ => "Unknown",
    }
}
