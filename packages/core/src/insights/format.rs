//! Number formatting shared by the narrative templates

/// `£1,234.56` style currency, with a leading minus for negatives.
pub fn currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}£{}", sign, grouped(value.abs(), 2))
}

/// Thousands-separated number with a fixed number of decimals.
pub fn grouped(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut out = String::with_capacity(fixed.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, out, frac),
        None => format!("{}{}", sign, out),
    }
}

/// Compact number for percentages in prose: at most two decimals, trailing zeros trimmed.
pub fn number(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `+12.5` / `-3` style signed number
pub fn signed(value: f64) -> String {
    if value >= 0.0 {
        format!("+{}", number(value))
    } else {
        number(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(currency(1234567.891), "£1,234,567.89");
        assert_eq!(currency(999.5), "£999.50");
        assert_eq!(currency(-1500.0), "-£1,500.00");
    }

    #[test]
    fn grouped_without_decimals() {
        assert_eq!(grouped(1000.0, 0), "1,000");
        assert_eq!(grouped(12.0, 0), "12");
    }

    #[test]
    fn number_trims_trailing_zeros() {
        assert_eq!(number(12.50), "12.5");
        assert_eq!(number(7.0), "7");
        assert_eq!(number(-0.001), "0");
        assert_eq!(number(3.14159), "3.14");
    }

    #[test]
    fn signed_prefixes_plus_for_non_negative() {
        assert_eq!(signed(5.0), "+5");
        assert_eq!(signed(0.0), "+0");
        assert_eq!(signed(-2.5), "-2.5");
    }
}
