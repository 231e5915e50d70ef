//! Normalizers: raw matched substrings into typed values, plus OCR text
//! cleanup applied before pattern matching.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Day/month/year formats attempted in order.
const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y"];

/// Frequent OCR confusions on invoice headings, repaired before matching.
const OCR_REPAIRS: [(&str, &str); 9] = [
    ("G5T", "GST"),
    ("lGST", "IGST"),
    ("CG5T", "CGST"),
    ("SG5T", "SGST"),
    ("AMT", "AMOUNT"),
    ("QTY", "QUANTITY"),
    ("TOTL", "TOTAL"),
    ("₹ ", "₹"),
    ("Rs ", "₹"),
];

/// Parse a currency amount: strip currency markers and thousands
/// separators, then parse the remainder as a decimal. Unparsable input is
/// `None`, not an error - most amount fields are optional.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let mut s = raw.trim();
    s = s.trim_start_matches('₹').trim_start();
    for marker in ["Rs.", "Rs", "rs.", "rs", "RS.", "RS"] {
        if let Some(rest) = s.strip_prefix(marker) {
            s = rest.trim_start();
            break;
        }
    }

    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Normalize a day/month/year date to `YYYY-MM-DD`. When no format
/// matches, the input passes through unchanged rather than failing.
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    raw.to_string()
}

/// Clean recognized text: collapse blank-line runs and in-line whitespace
/// runs, and repair common OCR confusions. Line structure is preserved -
/// the line-item heuristics depend on it.
pub fn clean_text(text: &str) -> String {
    let mut cleaned = text
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    for (from, to) in OCR_REPAIRS {
        cleaned = cleaned.replace(from, to);
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn parse_amount_plain() {
        assert_eq!(parse_amount("49.99"), Some(dec("49.99")));
        assert_eq!(parse_amount("0.01"), Some(dec("0.01")));
    }

    #[test]
    fn parse_amount_strips_currency_and_separators() {
        assert_eq!(parse_amount("₹1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("₹ 1,234.56"), Some(dec("1234.56")));
        assert_eq!(parse_amount("Rs. 500"), Some(dec("500")));
        assert_eq!(parse_amount("rs 2,000.00"), Some(dec("2000.00")));
    }

    #[test]
    fn parse_amount_rejects_non_numeric() {
        assert_eq!(parse_amount("twelve"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("12.34.56"), None);
    }

    #[test]
    fn normalize_date_formats() {
        assert_eq!(normalize_date("15/01/2024"), "2024-01-15");
        assert_eq!(normalize_date("15-01-2024"), "2024-01-15");
        assert_eq!(normalize_date("15.01.2024"), "2024-01-15");
        assert_eq!(normalize_date("15/01/24"), "2024-01-15");
    }

    #[test]
    fn normalize_date_passes_through_unparsable() {
        assert_eq!(normalize_date("January 15, 2024"), "January 15, 2024");
        assert_eq!(normalize_date("32/13/2024"), "32/13/2024");
    }

    #[test]
    fn clean_text_collapses_whitespace_but_keeps_lines() {
        let raw = "ACME   TRADERS\n\n\nTotal:\t 100.00\n";
        assert_eq!(clean_text(raw), "ACME TRADERS\nTotal: 100.00");
    }

    #[test]
    fn clean_text_repairs_ocr_confusions() {
        assert_eq!(clean_text("CG5T @9%"), "CGST @9%");
        assert_eq!(clean_text("G5T: 90"), "GST: 90");
        assert_eq!(clean_text("Rs 500"), "₹500");
    }
}
