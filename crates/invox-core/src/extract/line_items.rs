//! Heuristic line-item parsing.
//!
//! Two independent heuristics run over the same lines and may each emit an
//! item for the same physical line; results are not deduplicated.

use rust_decimal::Decimal;
use std::str::FromStr;

use tracing::debug;

use super::normalize::parse_amount;
use super::patterns::{
    DESC_BEFORE_AMOUNT, DESC_START, HSN_CODE, ITEM_DISCOUNT, ITEM_QUANTITY, ITEM_RATE,
    QTY_IN_DESC, TRAILING_AMOUNT,
};
use crate::models::result::LineItem;

/// How many lines after an item description are scanned for sub-fields.
const LOOKAHEAD_LINES: usize = 3;

/// Minimum description length for an item to be kept.
const MIN_DESCRIPTION_LEN: usize = 3;

/// Partially-populated item under construction.
#[derive(Debug, Default)]
struct PartialItem {
    description: String,
    hsn_code: Option<String>,
    quantity: Option<Decimal>,
    rate: Option<Decimal>,
    discount: Option<String>,
    amount: Option<Decimal>,
}

impl PartialItem {
    fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            ..Self::default()
        }
    }
}

/// Produces a bounded, ordered sequence of line items from invoice text.
pub struct LineItemParser {
    max_items: usize,
}

impl LineItemParser {
    pub fn new() -> Self {
        Self { max_items: 15 }
    }

    /// Bound the number of items returned.
    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = max;
        self
    }

    /// Parse line items out of cleaned text.
    pub fn parse(&self, text: &str) -> Vec<LineItem> {
        let lines: Vec<&str> = text.lines().collect();
        let mut partials: Vec<PartialItem> = Vec::new();
        let mut current: Option<PartialItem> = None;

        for (i, raw) in lines.iter().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if DESC_START.is_match(line)
                && !line.starts_with(|c: char| c.is_ascii_digit())
            {
                // Description-block heuristic: this line opens a new item;
                // scan the next few lines once each for sub-fields. The
                // first match per sub-field wins - later lines never
                // overwrite.
                if let Some(item) = current.take() {
                    partials.push(item);
                }

                let mut item = PartialItem::new(line);
                for next in lines.iter().skip(i + 1).take(LOOKAHEAD_LINES) {
                    let next = next.trim();

                    if item.hsn_code.is_none() {
                        if let Some(m) = HSN_CODE.find(next) {
                            item.hsn_code = Some(m.as_str().to_string());
                        }
                    }
                    if item.quantity.is_none() {
                        if let Some(caps) = ITEM_QUANTITY.captures(next) {
                            item.quantity = Decimal::from_str(&caps[1]).ok();
                        }
                    }
                    if item.rate.is_none() {
                        if let Some(caps) = ITEM_RATE.captures(next) {
                            item.rate = parse_amount(&caps[1]);
                        }
                    }
                    if item.discount.is_none() {
                        if let Some(caps) = ITEM_DISCOUNT.captures(next) {
                            item.discount = Some(caps[1].to_string());
                        }
                    }
                    if item.amount.is_none() {
                        if let Some(caps) = TRAILING_AMOUNT.captures(next) {
                            item.amount = parse_amount(&caps[1]);
                        }
                    }
                }
                current = Some(item);
            } else if let Some(caps) = TRAILING_AMOUNT.captures(line) {
                // Trailing-amount heuristic: a line ending in an amount is a
                // candidate single-line item.
                if let Some(single) = self.single_line_item(line, &caps[1]) {
                    partials.push(single);
                }
            }
        }

        if let Some(item) = current.take() {
            partials.push(item);
        }

        let items: Vec<LineItem> = partials
            .into_iter()
            .filter_map(finalize)
            .take(self.max_items)
            .collect();
        debug!("Parsed {} line items", items.len());
        items
    }

    fn single_line_item(&self, line: &str, amount_str: &str) -> Option<PartialItem> {
        let amount = parse_amount(amount_str).filter(|a| a.is_sign_positive() && !a.is_zero())?;
        let description = DESC_BEFORE_AMOUNT
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())?;

        let mut item = PartialItem::new(&description);
        item.amount = Some(amount);
        item.quantity = Some(Decimal::ONE);
        item.rate = Some(amount);

        // "2 pcs" style phrasing in the description overrides the defaults.
        if let Some(caps) = QTY_IN_DESC.captures(&description) {
            if let Ok(qty) = Decimal::from_str(&caps[1]) {
                if qty > Decimal::ZERO {
                    item.quantity = Some(qty);
                    item.rate = Some(amount / qty);
                }
            }
        }
        Some(item)
    }
}

impl Default for LineItemParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve defaults and keep only plausible items. Derivation priority:
/// a known amount stands; otherwise rate x quantity; otherwise the rate
/// alone doubles as the amount.
fn finalize(partial: PartialItem) -> Option<LineItem> {
    if partial.description.len() <= MIN_DESCRIPTION_LEN {
        return None;
    }

    let quantity = partial.quantity.unwrap_or(Decimal::ONE);
    let rate = partial
        .rate
        .or(partial.amount)
        .unwrap_or(Decimal::ZERO);
    let amount = partial.amount.unwrap_or(rate * quantity);

    if amount <= Decimal::ZERO {
        return None;
    }

    Some(LineItem {
        description: partial.description,
        quantity,
        rate,
        amount,
        tax_rate: None,
        discount: partial.discount,
        hsn_code: partial.hsn_code,
    })
}
