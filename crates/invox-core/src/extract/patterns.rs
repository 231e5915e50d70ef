//! Compiled regex patterns and the ordered field-rule catalog.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Identifier patterns. Case-sensitive and scanned globally across the
    // whole text - identifiers can appear anywhere on an invoice.
    pub static ref GSTIN: Regex = Regex::new(
        r"\b\d{2}[A-Z]{5}\d{4}[A-Z]\d[Z]\d\b"
    ).unwrap();

    pub static ref GSTIN_EXACT: Regex = Regex::new(
        r"^\d{2}[A-Z]{5}\d{4}[A-Z]\d[Z]\d$"
    ).unwrap();

    pub static ref PAN: Regex = Regex::new(
        r"\b[A-Z]{5}\d{4}[A-Z]\b"
    ).unwrap();

    // Labeled header fields
    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:invoice|bill|receipt|voucher)\s*(?:no|number|#)?\s*:?\s*([A-Z0-9][A-Z0-9/\-]*)"
    ).unwrap();

    pub static ref PURCHASE_ORDER: Regex = Regex::new(
        r"(?i)\b(?:purchase\s*order|po)\s*(?:no|number|#)?\s*:?\s*([A-Z0-9][A-Z0-9/\-]*)"
    ).unwrap();

    pub static ref DATE_FIELD: Regex = Regex::new(
        r"(?i)\b(?:date|dated|dt)\s*:?\s*(\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4})"
    ).unwrap();

    pub static ref DUE_DATE: Regex = Regex::new(
        r"(?i)\b(?:due\s*date|payment\s*due)\s*:?\s*(\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4})"
    ).unwrap();

    // Vendor block
    pub static ref VENDOR_NAME: Regex = Regex::new(
        r"(?im)^([A-Z][A-Z\s&.]+)$"
    ).unwrap();

    pub static ref VENDOR_ADDRESS: Regex = Regex::new(
        r"(?i)([A-Z][A-Za-z\s,\-.0-9]+(?:Road|Street|Lane|Avenue|Nagar|Colony|Area|City))"
    ).unwrap();

    pub static ref PHONE: Regex = Regex::new(
        r"(\+?91[\s\-]?\d{10}|\d{10})"
    ).unwrap();

    pub static ref EMAIL: Regex = Regex::new(
        r"([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})"
    ).unwrap();

    pub static ref WEBSITE: Regex = Regex::new(
        r"(?i)(www\.[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}|https?://[a-zA-Z0-9.-]+)"
    ).unwrap();

    // Amount fields
    pub static ref SUBTOTAL: Regex = Regex::new(
        r"(?i)\bsub\s*total\b\s*:?\s*(?:rs\.?|₹)?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)"
    ).unwrap();

    pub static ref TAX_AMOUNT: Regex = Regex::new(
        r"(?i)\b(?:gst|tax|vat)\b\s*(?:amount)?\s*:?\s*(?:rs\.?|₹)?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)"
    ).unwrap();

    pub static ref TOTAL_AMOUNT: Regex = Regex::new(
        r"(?i)\b(?:grand\s*total|total|final\s*amount|amount)\b\s*:?\s*(?:rs\.?|₹)?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)"
    ).unwrap();

    // Tax components: rate and amount captured as a pair
    pub static ref IGST: Regex = Regex::new(
        r"(?i)\bigst\b\s*@?\s*(\d+(?:\.\d+)?%?).*?(?:rs\.?|₹)?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)"
    ).unwrap();

    pub static ref CGST: Regex = Regex::new(
        r"(?i)\bcgst\b\s*@?\s*(\d+(?:\.\d+)?%?).*?(?:rs\.?|₹)?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)"
    ).unwrap();

    pub static ref SGST: Regex = Regex::new(
        r"(?i)\bsgst\b\s*@?\s*(\d+(?:\.\d+)?%?).*?(?:rs\.?|₹)?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)"
    ).unwrap();

    pub static ref TCS: Regex = Regex::new(
        r"(?i)\btcs\b\s*@?\s*(\d+(?:\.\d+)?%?).*?(?:rs\.?|₹)?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)"
    ).unwrap();

    // Line-item sub-patterns
    pub static ref HSN_CODE: Regex = Regex::new(
        r"\b\d{4,8}\b"
    ).unwrap();

    pub static ref ITEM_QUANTITY: Regex = Regex::new(
        r"(?i)\b(?:qty|quantity)\s*:?\s*(\d+(?:\.\d+)?)"
    ).unwrap();

    pub static ref ITEM_RATE: Regex = Regex::new(
        r"(?i)\b(?:rate|price|unit\s*price)\s*:?\s*(?:rs\.?|₹)?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)"
    ).unwrap();

    pub static ref ITEM_DISCOUNT: Regex = Regex::new(
        r"(?i)\b(?:discount|disc)\s*:?\s*(\d+(?:\.\d+)?%?)"
    ).unwrap();

    pub static ref TRAILING_AMOUNT: Regex = Regex::new(
        r"(\d+(?:,\d{3})*(?:\.\d{2})?)\s*$"
    ).unwrap();

    pub static ref DESC_BEFORE_AMOUNT: Regex = Regex::new(
        r"^(.+?)\s+\d+(?:,\d{3})*(?:\.\d{2})?\s*$"
    ).unwrap();

    pub static ref QTY_IN_DESC: Regex = Regex::new(
        r"(?i)(\d+(?:\.\d+)?)\s*(?:nos|pcs|qty|units?)"
    ).unwrap();

    pub static ref DESC_START: Regex = Regex::new(
        r"^[A-Za-z][A-Za-z\s]+"
    ).unwrap();
}

/// Post-processor applied to a rule's captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Trimmed text capture.
    Text,
    /// Capture normalized into a decimal amount.
    Amount,
    /// Capture normalized into `YYYY-MM-DD`, passing through unparsable
    /// input unchanged.
    Date,
    /// Two captures: a percentage rate and a currency amount, stored as
    /// `<name>_rate` and `<name>_amount`.
    TaxPair,
}

/// One named text-pattern rule of the extraction catalog.
pub struct FieldRule {
    pub name: &'static str,
    pub pattern: &'static Regex,
    pub kind: RuleKind,
}

/// The ordered rule catalog. Built once at startup and injected into the
/// pipeline; rules are evaluated independently, first match wins per field.
pub fn field_catalog() -> Vec<FieldRule> {
    vec![
        FieldRule { name: "invoice_number", pattern: &INVOICE_NUMBER, kind: RuleKind::Text },
        FieldRule { name: "purchase_order", pattern: &PURCHASE_ORDER, kind: RuleKind::Text },
        FieldRule { name: "date", pattern: &DATE_FIELD, kind: RuleKind::Date },
        FieldRule { name: "due_date", pattern: &DUE_DATE, kind: RuleKind::Date },
        FieldRule { name: "vendor_name", pattern: &VENDOR_NAME, kind: RuleKind::Text },
        FieldRule { name: "vendor_address", pattern: &VENDOR_ADDRESS, kind: RuleKind::Text },
        FieldRule { name: "phone", pattern: &PHONE, kind: RuleKind::Text },
        FieldRule { name: "email", pattern: &EMAIL, kind: RuleKind::Text },
        FieldRule { name: "website", pattern: &WEBSITE, kind: RuleKind::Text },
        FieldRule { name: "subtotal", pattern: &SUBTOTAL, kind: RuleKind::Amount },
        FieldRule { name: "tax_amount", pattern: &TAX_AMOUNT, kind: RuleKind::Amount },
        FieldRule { name: "total_amount", pattern: &TOTAL_AMOUNT, kind: RuleKind::Amount },
        FieldRule { name: "igst", pattern: &IGST, kind: RuleKind::TaxPair },
        FieldRule { name: "cgst", pattern: &CGST, kind: RuleKind::TaxPair },
        FieldRule { name: "sgst", pattern: &SGST, kind: RuleKind::TaxPair },
        FieldRule { name: "tcs", pattern: &TCS, kind: RuleKind::TaxPair },
    ]
}
