use std::fmt;

use crate::models::subscription::BillingCycle;

#[derive(Debug, Eq, PartialEq)]
pub enum MoneyError {
    NotAnAmount,
    AmountOutOfRange,
}

impl std::error::Error for MoneyError {}

impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyError::NotAnAmount => write!(f, "MoneyError: Input is not a monetary amount"),
            MoneyError::AmountOutOfRange => write!(f, "MoneyError: Amount is out of range"),
        }
    }
}

/// Parses an unsigned decimal amount string (at most two fraction digits) into
/// minor units. Rejects anything that isn't strictly `digits[.digits]`.
pub fn parse_amount(amount: &str) -> Result<i64, MoneyError> {
    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (amount, None),
    };

    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MoneyError::NotAnAmount);
    }

    if let Some(frac) = frac {
        if frac.is_empty() || frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyError::NotAnAmount);
        }
    }

    let whole = whole
        .parse::<i64>()
        .map_err(|_| MoneyError::AmountOutOfRange)?;

    let frac_cents = match frac {
        Some(f) => {
            let parsed = f.parse::<i64>().map_err(|_| MoneyError::NotAnAmount)?;
            if f.len() == 1 {
                parsed * 10
            } else {
                parsed
            }
        }
        None => 0,
    };

    whole
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(frac_cents))
        .ok_or(MoneyError::AmountOutOfRange)
}

/// Best-effort parse for display-only paths. Non-numeric input becomes 0
/// rather than an error. Never use this for validated input.
pub fn parse_amount_lenient(amount: &str) -> i64 {
    match amount.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => (value * 100.0).round() as i64,
        _ => 0,
    }
}

/// Renders minor units with two fraction digits and comma thousands
/// separators. Exact inverse of `parse_amount` for canonical inputs.
pub fn format_amount(cents: i64) -> String {
    let negative = cents < 0;
    let cents_abs = cents.unsigned_abs();
    let whole = cents_abs / 100;
    let frac = cents_abs % 100;

    let whole_digits = whole.to_string();
    let mut grouped = String::with_capacity(whole_digits.len() + whole_digits.len() / 3 + 1);

    for (pos, digit) in whole_digits.chars().enumerate() {
        if pos != 0 && (whole_digits.len() - pos) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}{}.{:02}", if negative { "-" } else { "" }, grouped, frac)
}

enum SymbolPlacement {
    Prefix(&'static str),
    Suffix(&'static str),
}

// Nordic krone currencies conventionally trail the amount. Everything else
// recognized here leads with its glyph.
const CURRENCY_SYMBOLS: &[(&str, SymbolPlacement)] = &[
    ("USD", SymbolPlacement::Prefix("$")),
    ("EUR", SymbolPlacement::Prefix("\u{20ac}")),
    ("GBP", SymbolPlacement::Prefix("\u{a3}")),
    ("JPY", SymbolPlacement::Prefix("\u{a5}")),
    ("CHF", SymbolPlacement::Prefix("CHF")),
    ("CAD", SymbolPlacement::Prefix("CA$")),
    ("AUD", SymbolPlacement::Prefix("A$")),
    ("SEK", SymbolPlacement::Suffix(" kr.")),
    ("NOK", SymbolPlacement::Suffix(" kr.")),
    ("DKK", SymbolPlacement::Suffix(" kr.")),
];

/// Renders minor units with the currency's symbol in its conventional
/// position. Unrecognized codes fall back to a `"<CODE> <amount>"` prefix.
pub fn format_with_symbol(cents: i64, currency: &str) -> String {
    let amount = format_amount(cents);

    match CURRENCY_SYMBOLS.iter().find(|(code, _)| *code == currency) {
        Some((_, SymbolPlacement::Prefix(symbol))) => format!("{symbol}{amount}"),
        Some((_, SymbolPlacement::Suffix(symbol))) => format!("{amount}{symbol}"),
        None => format!("{currency} {amount}"),
    }
}

/// Normalizes an amount to its monthly equivalent. Annual amounts divide by
/// twelve, rounded half-up. Monthly amounts pass through unchanged.
pub fn to_monthly_cents(amount_cents: i64, billing_cycle: BillingCycle) -> i64 {
    match billing_cycle {
        BillingCycle::Monthly => amount_cents,
        BillingCycle::Annual => (amount_cents + 6).div_euclid(12),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("10"), Ok(1000));
        assert_eq!(parse_amount("9.99"), Ok(999));
        assert_eq!(parse_amount("10.5"), Ok(1050));
        assert_eq!(parse_amount("0.01"), Ok(1));
        assert_eq!(parse_amount("0"), Ok(0));
        assert_eq!(parse_amount("1234567.89"), Ok(123456789));

        assert_eq!(parse_amount("abc"), Err(MoneyError::NotAnAmount));
        assert_eq!(parse_amount(""), Err(MoneyError::NotAnAmount));
        assert_eq!(parse_amount("10.555"), Err(MoneyError::NotAnAmount));
        assert_eq!(parse_amount("10."), Err(MoneyError::NotAnAmount));
        assert_eq!(parse_amount(".99"), Err(MoneyError::NotAnAmount));
        assert_eq!(parse_amount("-10"), Err(MoneyError::NotAnAmount));
        assert_eq!(parse_amount("10,00"), Err(MoneyError::NotAnAmount));
        assert_eq!(parse_amount("10 "), Err(MoneyError::NotAnAmount));
        assert_eq!(
            parse_amount("99999999999999999999"),
            Err(MoneyError::AmountOutOfRange),
        );
    }

    #[test]
    fn test_parse_amount_lenient() {
        assert_eq!(parse_amount_lenient("10"), 1000);
        assert_eq!(parse_amount_lenient("9.99"), 999);
        assert_eq!(parse_amount_lenient("15.994"), 1599);
        assert_eq!(parse_amount_lenient(" 12.50 "), 1250);

        // Non-numeric input degrades to zero instead of failing
        assert_eq!(parse_amount_lenient("abc"), 0);
        assert_eq!(parse_amount_lenient(""), 0);
        assert_eq!(parse_amount_lenient("NaN"), 0);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(999), "9.99");
        assert_eq!(format_amount(1000), "10.00");
        assert_eq!(format_amount(123456789), "1,234,567.89");
        assert_eq!(format_amount(0), "0.00");
        assert_eq!(format_amount(5), "0.05");
        assert_eq!(format_amount(-1050), "-10.50");
    }

    #[test]
    fn test_format_parse_round_trip() {
        for amount in ["9.99", "0.00", "10.50", "999999.99"] {
            let cents = parse_amount(amount).unwrap();
            assert_eq!(format_amount(cents).replace(',', ""), amount);
        }

        assert_eq!(format_amount(parse_amount("1234567.89").unwrap()), "1,234,567.89");
    }

    #[test]
    fn test_format_with_symbol() {
        assert_eq!(format_with_symbol(1599, "USD"), "$15.99");
        assert_eq!(format_with_symbol(1599, "EUR"), "\u{20ac}15.99");
        assert_eq!(format_with_symbol(1599, "GBP"), "\u{a3}15.99");
        assert_eq!(format_with_symbol(9900, "SEK"), "99.00 kr.");
        assert_eq!(format_with_symbol(9900, "NOK"), "99.00 kr.");
        assert_eq!(format_with_symbol(9900, "DKK"), "99.00 kr.");
        assert_eq!(format_with_symbol(1599, "PLN"), "PLN 15.99");
    }

    #[test]
    fn test_to_monthly_cents() {
        assert_eq!(to_monthly_cents(999, BillingCycle::Annual), 83);
        assert_eq!(to_monthly_cents(12000, BillingCycle::Annual), 1000);
        assert_eq!(to_monthly_cents(999, BillingCycle::Monthly), 999);

        // Half-up rounding
        assert_eq!(to_monthly_cents(6, BillingCycle::Annual), 1);
        assert_eq!(to_monthly_cents(5, BillingCycle::Annual), 0);
    }
}
