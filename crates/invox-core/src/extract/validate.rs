//! Cross-field consistency validation.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::patterns::GSTIN_EXACT;
use crate::models::result::{FieldValue, LineItem, ValidationReport};

/// Fields that must be present for the record to count as a valid invoice.
const REQUIRED_FIELDS: [&str; 3] = ["vendor_name", "total_amount", "date"];

/// Validates extracted fields for internal consistency. None of the rules
/// raise; validation failure is advisory and never halts the pipeline.
pub struct Validator {
    /// Absolute difference in currency units tolerated by the amount
    /// consistency rules; absorbs rounding.
    tolerance: Decimal,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            tolerance: Decimal::ONE,
        }
    }

    pub fn validate(
        &self,
        fields: &BTreeMap<String, FieldValue>,
        line_items: &[LineItem],
    ) -> ValidationReport {
        let mut report = ValidationReport {
            is_valid_invoice: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        for field in REQUIRED_FIELDS {
            if !fields.contains_key(field) {
                report
                    .errors
                    .push(format!("Missing required field: {field}"));
                report.is_valid_invoice = false;
            }
        }

        if let Some(FieldValue::Text(gstin)) = fields.get("gstin") {
            if !GSTIN_EXACT.is_match(gstin) {
                report.errors.push("Invalid GST format".to_string());
            }
        }

        let amount = |name: &str| fields.get(name).and_then(FieldValue::as_amount);
        let subtotal = amount("subtotal");
        let tax = amount("tax_amount");
        let total = amount("total_amount");

        if let (Some(subtotal), Some(tax), Some(total)) = (subtotal, tax, total) {
            let calculated = subtotal + tax;
            if (calculated - total).abs() > self.tolerance {
                report.warnings.push(format!(
                    "Amount mismatch: Subtotal + Tax ({calculated}) != Total ({total})"
                ));
            }
        }

        if !line_items.is_empty() {
            if let Some(subtotal) = subtotal {
                let items_total: Decimal = line_items.iter().map(|i| i.amount).sum();
                if (items_total - subtotal).abs() > self.tolerance {
                    report.warnings.push(format!(
                        "Line items total ({items_total}) doesn't match subtotal ({subtotal})"
                    ));
                }
            }
        }

        report
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn base_fields() -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();
        fields.insert(
            "vendor_name".to_string(),
            FieldValue::Text("ACME TRADING CO".to_string()),
        );
        fields.insert(
            "date".to_string(),
            FieldValue::Date("2024-01-15".to_string()),
        );
        fields.insert(
            "total_amount".to_string(),
            FieldValue::Amount(dec("590.00")),
        );
        fields
    }

    fn item(amount: &str) -> LineItem {
        LineItem {
            description: "Widget".to_string(),
            quantity: Decimal::ONE,
            rate: dec(amount),
            amount: dec(amount),
            tax_rate: None,
            discount: None,
            hsn_code: None,
        }
    }

    #[test]
    fn missing_required_fields_invalidate() {
        let report = Validator::new().validate(&BTreeMap::new(), &[]);
        assert!(!report.is_valid_invoice);
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors[0].contains("vendor_name"));
    }

    #[test]
    fn complete_required_fields_are_valid() {
        let report = Validator::new().validate(&base_fields(), &[]);
        assert!(report.is_valid_invoice);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn malformed_gstin_is_an_error() {
        let mut fields = base_fields();
        fields.insert(
            "gstin".to_string(),
            FieldValue::Text("NOT-A-GSTIN".to_string()),
        );
        let report = Validator::new().validate(&fields, &[]);
        assert!(report.errors.iter().any(|e| e == "Invalid GST format"));
    }

    #[test]
    fn amount_mismatch_is_a_warning_not_an_error() {
        let mut fields = base_fields();
        fields.insert("subtotal".to_string(), FieldValue::Amount(dec("500.00")));
        fields.insert("tax_amount".to_string(), FieldValue::Amount(dec("50.00")));
        let report = Validator::new().validate(&fields, &[]);

        assert!(report.is_valid_invoice);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("Amount mismatch"));
    }

    #[test]
    fn rounding_differences_are_tolerated() {
        let mut fields = base_fields();
        fields.insert("subtotal".to_string(), FieldValue::Amount(dec("500.00")));
        fields.insert("tax_amount".to_string(), FieldValue::Amount(dec("90.50")));
        // 590.50 vs 590.00 is within one currency unit.
        let report = Validator::new().validate(&fields, &[]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn line_item_total_mismatch_warns() {
        let mut fields = base_fields();
        fields.insert("subtotal".to_string(), FieldValue::Amount(dec("500.00")));
        fields.insert("tax_amount".to_string(), FieldValue::Amount(dec("90.00")));
        let items = vec![item("100.00"), item("200.00")];
        let report = Validator::new().validate(&fields, &items);

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("Line items total"));
        assert!(report.is_valid_invoice);
    }

    #[test]
    fn matching_line_items_produce_no_warning() {
        let mut fields = base_fields();
        fields.insert("subtotal".to_string(), FieldValue::Amount(dec("500.00")));
        fields.insert("tax_amount".to_string(), FieldValue::Amount(dec("90.00")));
        let items = vec![item("250.00"), item("250.00")];
        let report = Validator::new().validate(&fields, &items);
        assert!(report.warnings.is_empty());
    }
}
