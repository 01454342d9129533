const PHONE_DIGITS: usize = 10;
const IDENTIFIER_DIGITS: usize = 10;

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Progressive `(XXX) XXX-XXXX` mask. The area code closes at three digits
/// and the dash appears at six.
pub fn format_phone(raw: &str) -> String {
    let mut digits = digits_only(raw);
    digits.truncate(PHONE_DIGITS);

    match digits.len() {
        0..=2 => digits,
        3..=5 => format!("({}) {}", &digits[..3], &digits[3..]),
        _ => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
    }
}

pub fn format_identifier(raw: &str) -> String {
    let mut digits = digits_only(raw);
    digits.truncate(IDENTIFIER_DIGITS);
    digits
}

/// Groups a digit string with `,` separators. Leading zeros are dropped.
pub fn group_thousands(digits: &str) -> String {
    if digits.is_empty() {
        return String::new();
    }

    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return "0".to_string();
    }

    let mut output = String::with_capacity(trimmed.len() + trimmed.len() / 3);
    for (index, character) in trimmed.chars().enumerate() {
        if index > 0 && (trimmed.len() - index) % 3 == 0 {
            output.push(',');
        }
        output.push(character);
    }
    output
}

/// `$`-prefixed grouped amount, or empty when no digits were entered.
pub fn format_currency(raw: &str) -> String {
    let grouped = group_thousands(&digits_only(raw));
    if grouped.is_empty() {
        return grouped;
    }
    format!("${grouped}")
}

pub fn format_capped_currency(value: u64, cap: Option<u64>) -> String {
    match cap {
        Some(cap) if value >= cap && cap % 1000 == 0 => {
            format!("${}K+", group_thousands(&(cap / 1000).to_string()))
        }
        Some(cap) if value >= cap => format!("${}+", group_thousands(&cap.to_string())),
        _ => format!("${}", group_thousands(&value.to_string())),
    }
}
