use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

static DOLLAR_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s*(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)").expect("valid regex")
});
static BARE_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)").expect("valid regex")
});

/// First currency amount in `text`, preferring `$`-prefixed figures.
///
/// `"Member's Mark $29.99"` → `29.99`; `"$29.99 - $39.99"` → `29.99`.
#[must_use]
pub fn find_price(text: &str) -> Option<Decimal> {
    let caps = DOLLAR_AMOUNT_RE
        .captures(text)
        .or_else(|| BARE_AMOUNT_RE.captures(text))?;
    let digits = caps.get(1)?.as_str().replace(',', "");
    Decimal::from_str(&digits).ok()
}

/// Like [`find_price`] but yields `0` when no amount is present.
#[must_use]
pub fn parse_price(text: &str) -> Decimal {
    find_price(text).unwrap_or(Decimal::ZERO)
}

/// Converts a JSON price field, which retailers send as either a number or a
/// string.
#[must_use]
pub fn price_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        serde_json::Value::String(s) => find_price(s),
        _ => None,
    }
    .filter(|p| !p.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn parses_documented_cases() {
        assert_eq!(parse_price("$29.99"), dec("29.99"));
        assert_eq!(parse_price("Member's Mark $29.99"), dec("29.99"));
        assert_eq!(parse_price("$29.99 - $39.99"), dec("29.99"));
        assert_eq!(parse_price(""), Decimal::ZERO);
        assert_eq!(parse_price("invalid"), Decimal::ZERO);
    }

    #[test]
    fn handles_thousands_separators_and_bare_numbers() {
        assert_eq!(parse_price("$1,249.00"), dec("1249.00"));
        assert_eq!(parse_price("Price: 54.99"), dec("54.99"));
        assert_eq!(parse_price("$ 12"), dec("12"));
    }

    #[test]
    fn dollar_figure_beats_an_earlier_bare_number() {
        assert_eq!(parse_price("151 Booster Bundle $26.94"), dec("26.94"));
    }

    #[test]
    fn json_prices_accept_numbers_and_strings() {
        assert_eq!(price_from_json(&serde_json::json!(49.99)), Some(dec("49.99")));
        assert_eq!(price_from_json(&serde_json::json!("$5.49")), Some(dec("5.49")));
        assert_eq!(price_from_json(&serde_json::json!(0)), None);
        assert_eq!(price_from_json(&serde_json::Value::Null), None);
    }
}
