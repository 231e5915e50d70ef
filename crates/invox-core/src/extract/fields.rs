//! Pattern-catalog field extraction over the best OCR text.

use std::collections::BTreeMap;

use tracing::debug;

use super::normalize::{normalize_date, parse_amount};
use super::patterns::{FieldRule, GSTIN, PAN, RuleKind};
use crate::models::result::FieldValue;

/// Applies the injected rule catalog to text. Each rule is evaluated
/// independently; the first match wins per field and there is no global
/// backtracking.
pub struct FieldExtractor {
    catalog: Vec<FieldRule>,
}

impl FieldExtractor {
    pub fn new(catalog: Vec<FieldRule>) -> Self {
        Self { catalog }
    }

    /// Number of rules in the catalog; the denominator of the field
    /// completeness score.
    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }

    /// Populate the field map from cleaned text.
    pub fn extract(&self, text: &str) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();

        for rule in &self.catalog {
            let Some(caps) = rule.pattern.captures(text) else {
                continue;
            };
            match rule.kind {
                RuleKind::Text => {
                    if let Some(m) = caps.get(1) {
                        let value = m.as_str().trim();
                        if !value.is_empty() {
                            fields.insert(
                                rule.name.to_string(),
                                FieldValue::Text(value.to_string()),
                            );
                        }
                    }
                }
                RuleKind::Amount => {
                    if let Some(amount) = caps.get(1).and_then(|m| parse_amount(m.as_str())) {
                        fields.insert(rule.name.to_string(), FieldValue::Amount(amount));
                    }
                }
                RuleKind::Date => {
                    if let Some(m) = caps.get(1) {
                        fields.insert(
                            rule.name.to_string(),
                            FieldValue::Date(normalize_date(m.as_str())),
                        );
                    }
                }
                RuleKind::TaxPair => {
                    if let Some(rate) = caps.get(1) {
                        fields.insert(
                            format!("{}_rate", rule.name),
                            FieldValue::Text(rate.as_str().trim().to_string()),
                        );
                    }
                    if let Some(amount) = caps.get(2).and_then(|m| parse_amount(m.as_str())) {
                        fields.insert(format!("{}_amount", rule.name), FieldValue::Amount(amount));
                    }
                }
            }
        }

        self.extract_identifiers(text, &mut fields);

        debug!("Extracted {} fields", fields.len());
        fields
    }

    /// Identifier patterns are scanned globally - they can appear anywhere
    /// in the text, not near a label.
    fn extract_identifiers(&self, text: &str, fields: &mut BTreeMap<String, FieldValue>) {
        let mut gstins: Vec<&str> = Vec::new();
        for m in GSTIN.find_iter(text) {
            if !gstins.contains(&m.as_str()) {
                gstins.push(m.as_str());
            }
        }

        if let Some(&first) = gstins.first() {
            fields.insert("gstin".to_string(), FieldValue::Text(first.to_string()));
        }
        // Two distinct identifiers: label the first two positionally. A
        // heuristic with no semantic check of which party is which.
        if gstins.len() > 1 {
            fields.insert(
                "buyer_gstin".to_string(),
                FieldValue::Text(gstins[0].to_string()),
            );
            fields.insert(
                "seller_gstin".to_string(),
                FieldValue::Text(gstins[1].to_string()),
            );
        }

        if let Some(m) = PAN.find(text) {
            fields.insert("pan".to_string(), FieldValue::Text(m.as_str().to_string()));
        }
    }
}
