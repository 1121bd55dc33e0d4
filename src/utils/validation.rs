use base64::prelude::*;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// NUBAN account numbers are exactly ten digits.
pub fn is_valid_account_number(value: &str) -> bool {
    value.len() == 10 && value.chars().all(|c| c.is_ascii_digit())
}

/// Size in bytes of a base64 payload, accepting optional `data:*;base64,` prefixes.
pub fn decoded_base64_len(data: &str) -> Option<usize> {
    let raw = match data.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => data,
    };
    BASE64_STANDARD.decode(raw.trim()).ok().map(|bytes| bytes.len())
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Substring pattern for `ILIKE` with `%`, `_` and `\` matched literally.
pub fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(contains_pattern("Lagos"), "%Lagos%");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
        assert_eq!(contains_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    #[test]
    fn normalizes_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn account_numbers_must_be_ten_digits() {
        assert!(is_valid_account_number("0123456789"));
        assert!(!is_valid_account_number("012345678"));
        assert!(!is_valid_account_number("01234567a9"));
    }

    #[test]
    fn measures_base64_payloads() {
        assert_eq!(decoded_base64_len("aGVsbG8gd29ybGQ="), Some(11));
        assert_eq!(
            decoded_base64_len("data:application/pdf;base64,aGVsbG8gd29ybGQ="),
            Some(11)
        );
        assert_eq!(decoded_base64_len("not base64!!"), None);
    }
}
