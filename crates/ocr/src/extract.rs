use std::sync::OnceLock;

use regex::Regex;
use tillscan_core::Money;
use tracing::warn;

use crate::config::MerchantOptions;
use crate::types::TextLine;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_total_label, r"(?i)\bTOTAL\b");
re!(re_amount, r"\$?(\d+\.\d{2})");
// Transaction numbers, dates, phone fragments. Only lines that start with a
// digit qualify; `-- 12/03 --` is left as a candidate.
re!(re_numeric_only, r"^\d[\d\s\-/]*$");
re!(re_name_noise, r"[^\w\s&'\-]");

/// Brand fragments that mark a line as the merchant name.
pub const MERCHANT_KEYWORDS: &[&str] = &[
    "TRADER JOE", "WALMART", "WHOLE FOODS", "COSTCO", "SAFEWAY", "KROGER",
    "TARGET", "CVS", "WALGREENS", "MCDONALD", "STARBUCKS", "SUBWAY",
    "SPAR", "WINCO", "MOMI", "TOY", "STORE", "MARKET", "SHOP",
];

// ── Public extraction API ─────────────────────────────────────────────────────

/// Heuristic field extraction over grouped, top-to-bottom lines.
#[derive(Debug, Clone)]
pub struct Extractor {
    scan_lines: usize,
    min_length: usize,
    /// Upper-cased at construction.
    keywords: Vec<String>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(&MerchantOptions::default())
    }
}

impl Extractor {
    pub fn new(options: &MerchantOptions) -> Self {
        Self {
            scan_lines: options.scan_lines,
            min_length: options.min_length,
            keywords: options.keywords.iter().map(|k| k.to_uppercase()).collect(),
        }
    }

    // ── Merchant ──────────────────────────────────────────────────────────────

    /// First of the top lines naming a known brand, else the first plausible
    /// top line. `None` when every top line is too short or purely numeric.
    pub fn merchant(&self, lines: &[TextLine]) -> Option<String> {
        let candidates: Vec<&str> = lines
            .iter()
            .take(self.scan_lines)
            .map(|l| l.text.trim())
            .filter(|t| t.chars().count() >= self.min_length)
            .filter(|t| !re_numeric_only().is_match(t))
            .collect();

        let chosen = candidates
            .iter()
            .find(|t| {
                let upper = t.to_uppercase();
                self.keywords.iter().any(|k| upper.contains(k.as_str()))
            })
            .or_else(|| candidates.first())?;

        Some(clean_name(chosen))
    }

    // ── Total ─────────────────────────────────────────────────────────────────

    /// The first amount on the first `TOTAL` line carrying one; failing that,
    /// the largest amount anywhere on the receipt.
    ///
    /// An amount found on a `TOTAL` line is final: if it cannot be represented
    /// the total is `None`, no other line is consulted.
    pub fn total(&self, lines: &[TextLine]) -> Option<Money> {
        let labeled = lines
            .iter()
            .filter(|l| re_total_label().is_match(&l.text))
            .find_map(|l| first_amount(&l.text));
        if let Some(raw) = labeled {
            return parse_amount(raw);
        }

        lines
            .iter()
            .flat_map(|l| re_amount().captures_iter(&l.text))
            .filter_map(|c| parse_amount(c.get(1)?.as_str()))
            .max()
    }
}

fn first_amount(text: &str) -> Option<&str> {
    Some(re_amount().captures(text)?.get(1)?.as_str())
}

fn parse_amount(raw: &str) -> Option<Money> {
    let amount = Money::parse(raw);
    if amount.is_none() {
        warn!(amount = raw, "amount out of range; ignored");
    }
    amount
}

/// Replace punctuation other than `&`, `'` and `-` with spaces, then trim.
fn clean_name(line: &str) -> String {
    re_name_noise().replace_all(line, " ").trim().to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(texts: &[&str]) -> Vec<TextLine> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| TextLine::new(*t, 20.0 * i as f32))
            .collect()
    }

    fn money(s: &str) -> Money {
        Money::parse(s).unwrap()
    }

    // ── Merchant ──────────────────────────────────────────────────────────────

    #[test]
    fn merchant_keyword_beats_earlier_line() {
        let l = lines(&["RECEIPT #123", "WALMART SUPERCENTER", "TOTAL $45.67"]);
        assert_eq!(Extractor::default().merchant(&l).as_deref(), Some("WALMART SUPERCENTER"));
    }

    #[test]
    fn merchant_keyword_match_is_case_insensitive() {
        let l = lines(&["Thank you", "Trader Joe's #552"]);
        assert_eq!(Extractor::default().merchant(&l).as_deref(), Some("Trader Joe's  552"));
    }

    #[test]
    fn merchant_falls_back_to_first_candidate() {
        let l = lines(&["12/03/2024", "Blue Door Cafe", "Latte 4.50"]);
        assert_eq!(Extractor::default().merchant(&l).as_deref(), Some("Blue Door Cafe"));
    }

    #[test]
    fn merchant_cleans_punctuation() {
        let l = lines(&["*** JOE'S FISH & CHIPS - PIER 39! ***"]);
        assert_eq!(
            Extractor::default().merchant(&l).as_deref(),
            Some("JOE'S FISH & CHIPS - PIER 39")
        );
    }

    #[test]
    fn merchant_none_when_only_numbers() {
        let l = lines(&["9999999"]);
        assert_eq!(Extractor::default().merchant(&l), None);

        let l = lines(&["0042-118", "12/03/2024", "555 123 4567", "ab", "7"]);
        assert_eq!(Extractor::default().merchant(&l), None);
    }

    #[test]
    fn merchant_only_looks_at_top_five() {
        let l = lines(&["1", "2", "3", "4", "5", "COSTCO WHOLESALE"]);
        assert_eq!(Extractor::default().merchant(&l), None);
    }

    #[test]
    fn merchant_keyword_beyond_first_candidate_within_window() {
        let l = lines(&["Welcome", "to", "the", "corner", "SAFEWAY #1021"]);
        assert_eq!(Extractor::default().merchant(&l).as_deref(), Some("SAFEWAY  1021"));
    }

    #[test]
    fn merchant_custom_keywords() {
        let options = MerchantOptions { keywords: vec!["deli".into()], ..MerchantOptions::default() };
        let l = lines(&["Receipt", "Corner Deli"]);
        assert_eq!(Extractor::new(&options).merchant(&l).as_deref(), Some("Corner Deli"));
    }

    #[test]
    fn merchant_empty_input() {
        assert_eq!(Extractor::default().merchant(&[]), None);
    }

    // ── Total ─────────────────────────────────────────────────────────────────

    #[test]
    fn total_from_labeled_line() {
        let l = lines(&["RECEIPT #123", "WALMART SUPERCENTER", "TOTAL $45.67"]);
        assert_eq!(Extractor::default().total(&l), Some(money("45.67")));
    }

    #[test]
    fn total_label_wins_over_larger_amounts() {
        let l = lines(&["TV 499.99", "TOTAL 45.67", "CASH 500.00"]);
        assert_eq!(Extractor::default().total(&l), Some(money("45.67")));
    }

    #[test]
    fn total_takes_first_labeled_line_with_amount() {
        let l = lines(&["TOTAL ITEMS", "Total: 12.00", "TOTAL 99.00"]);
        assert_eq!(Extractor::default().total(&l), Some(money("12.00")));
    }

    #[test]
    fn subtotal_is_not_a_total_label() {
        let l = lines(&["SUBTOTAL 10.00", "TAX 0.80", "AMOUNT 7.50"]);
        // No boundary-delimited TOTAL: falls back to the largest amount.
        assert_eq!(Extractor::default().total(&l), Some(money("10.00")));

        let l = lines(&["SUBTOTAL 10.00", "TAX 0.80", "TOTAL 10.80"]);
        assert_eq!(Extractor::default().total(&l), Some(money("10.80")));
    }

    #[test]
    fn total_falls_back_to_largest_amount() {
        let l = lines(&["ITEM A 12.50", "ITEM B 3.00", "DUE 15.50"]);
        assert_eq!(Extractor::default().total(&l), Some(money("15.50")));
    }

    #[test]
    fn total_fallback_scans_every_amount_on_a_line() {
        let l = lines(&["2 @ 3.25 6.50", "$1.99"]);
        assert_eq!(Extractor::default().total(&l), Some(money("6.50")));
    }

    #[test]
    fn total_none_without_amounts() {
        let l = lines(&["WALMART", "TOTAL", "THANK YOU 4"]);
        assert_eq!(Extractor::default().total(&l), None);
    }

    #[test]
    fn total_label_is_case_insensitive() {
        let l = lines(&["grand total $1234.56"]);
        assert_eq!(Extractor::default().total(&l), Some(money("1234.56")));
    }

    #[test]
    fn unrepresentable_labeled_total_is_not_replaced() {
        let l = lines(&["SHOP", "TOTAL 123456789012345678901234567890.00", "TOTAL 7.00", "CASH 5.00"]);
        assert_eq!(Extractor::default().total(&l), None);
    }

    #[test]
    fn fallback_skips_unrepresentable_amounts() {
        let l = lines(&["ITEM 123456789012345678901234567890.00", "ITEM 5.00"]);
        assert_eq!(Extractor::default().total(&l), Some(money("5.00")));
    }

    #[test]
    fn numeric_filter_needs_leading_digit() {
        let l = lines(&["-- 12/03 --", "Blue Door Cafe"]);
        assert_eq!(Extractor::default().merchant(&l).as_deref(), Some("-- 12 03 --"));
    }

    #[test]
    fn clean_name_collapses_only_noise() {
        assert_eq!(clean_name("  AT&T STORE.  "), "AT&T STORE");
        assert_eq!(clean_name("O'REILLY-AUTO"), "O'REILLY-AUTO");
    }
}
