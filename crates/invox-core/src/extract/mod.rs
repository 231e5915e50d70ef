//! Structured extraction from recognized text: field rules, normalizers,
//! identifiers, line items, and validation.

pub mod fields;
pub mod gstin;
pub mod line_items;
pub mod normalize;
pub mod patterns;
pub mod validate;

pub use fields::FieldExtractor;
pub use gstin::GstDetails;
pub use line_items::LineItemParser;
pub use normalize::{clean_text, normalize_date, parse_amount};
pub use patterns::{FieldRule, RuleKind, field_catalog};
pub use validate::Validator;

use std::collections::BTreeMap;

use crate::models::result::{ConfidenceLevel, ExtractionSummary, FieldValue, LineItem};

/// Summary statistics over an extraction run.
pub fn summarize_extraction(
    fields: &BTreeMap<String, FieldValue>,
    line_items: &[LineItem],
) -> ExtractionSummary {
    let fields_extracted = fields.len();
    let has = |name: &str| fields.contains_key(name);

    ExtractionSummary {
        fields_extracted,
        has_vendor_info: has("vendor_name") || has("phone") || has("email"),
        has_amounts: has("total_amount") || has("subtotal"),
        has_tax_info: has("gstin") || has("igst_amount") || has("cgst_amount"),
        has_line_items: !line_items.is_empty(),
        line_items_count: line_items.len(),
        confidence_level: if fields_extracted > 8 {
            ConfidenceLevel::High
        } else if fields_extracted > 4 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_levels_follow_field_counts() {
        let mut fields = BTreeMap::new();
        assert_eq!(
            summarize_extraction(&fields, &[]).confidence_level,
            ConfidenceLevel::Low
        );

        for name in ["a", "b", "c", "d", "e"] {
            fields.insert(name.to_string(), FieldValue::Text("x".to_string()));
        }
        assert_eq!(
            summarize_extraction(&fields, &[]).confidence_level,
            ConfidenceLevel::Medium
        );

        for name in ["f", "g", "h", "i"] {
            fields.insert(name.to_string(), FieldValue::Text("x".to_string()));
        }
        assert_eq!(
            summarize_extraction(&fields, &[]).confidence_level,
            ConfidenceLevel::High
        );
    }

    #[test]
    fn summary_flags_reflect_field_presence() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "gstin".to_string(),
            FieldValue::Text("27AAPCS1234F1Z5".to_string()),
        );
        let summary = summarize_extraction(&fields, &[]);
        assert!(summary.has_tax_info);
        assert!(!summary.has_vendor_info);
        assert!(!summary.has_amounts);
        assert!(!summary.has_line_items);
        assert_eq!(summary.line_items_count, 0);
    }
}
