use rust_decimal::{Decimal, RoundingStrategy};

/// 千分位分隔字元
const THOUSANDS_SEPARATOR: char = ' ';

/// Rounds to two decimal places, halves away from zero.
fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats a price or volume with two decimals and space separated thousands.
///
/// Returns `None` when the value is absent or zero so that the caller can
/// omit the whole block instead of printing `0.00`.
///
/// # Example
///
/// ```
/// let s = currency_format(Some(dec!(1234567.5)));
/// assert_eq!(s.as_deref(), Some("1 234 567.50"));
/// ```
pub fn currency_format(value: Option<Decimal>) -> Option<String> {
    let value = value.filter(|v| !v.is_zero())?;
    Some(group_thousands(&format!("{:.2}", round2(value))))
}

/// 漲跌幅，固定帶正負號，例︰+5.00%、-10.00%
///
/// 正負號取自未四捨五入的值，只有剛好為零才是 `+0.00%`。
pub fn percent_format(change: Decimal) -> String {
    let sign = if change.is_sign_negative() && !change.is_zero() {
        '-'
    } else {
        '+'
    };

    format!("{}{:.2}%", sign, round2(change).abs())
}

/// 將整數部分每三位插入一個分隔字元
fn group_thousands(number: &str) -> String {
    let (sign, unsigned) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let len = integer.chars().count();
    let mut grouped = String::with_capacity(number.len() + len / 3);
    grouped.push_str(sign);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(THOUSANDS_SEPARATOR);
        }
        grouped.push(c);
    }

    if let Some(f) = fraction {
        grouped.push('.');
        grouped.push_str(f);
    }

    grouped
}
