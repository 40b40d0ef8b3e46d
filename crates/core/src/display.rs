//! Presentation helpers for rendering amounts the way the results page shows them.

/// Formats an amount as dollars with two decimals and thousands separators,
/// e.g. `1234.5` -> `$1,234.50`. Non-finite amounts render as `n/a`.
pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        return "n/a".to_string();
    }

    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // "-0.00" would be confusing for tiny negative rounding noise.
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_small_amounts() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(9.99), "$9.99");
        assert_eq!(format_currency(0.866), "$0.87");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(format_currency(311.76), "$311.76");
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
    }

    #[test]
    fn negative_amounts_keep_sign() {
        assert_eq!(format_currency(-1500.0), "-$1,500.00");
        assert_eq!(format_currency(-0.001), "$0.00");
    }

    #[test]
    fn non_finite_amounts_are_not_rendered_as_numbers() {
        assert_eq!(format_currency(f64::INFINITY), "n/a");
        assert_eq!(format_currency(f64::NEG_INFINITY), "n/a");
        assert_eq!(format_currency(f64::NAN), "n/a");
    }
}
