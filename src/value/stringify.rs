//! Lexical classification of numeric literals.

/// Numeric shape of a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberType {
    /// Optional sign followed by digits only.
    Long,
    /// Decimal point and/or exponent present.
    Double,
    /// Not a numeric literal.
    NaN,
}

/// Classify `literal` without parsing it.
///
/// Classification is purely lexical: `"99999999999999999999"` is a `Long`
/// even though it overflows, and `"1e"` is a `Double` even though it is
/// incomplete. Callers parse afterwards and report overflow or truncation
/// as a number-format failure.
pub fn detect_number(literal: &str) -> NumberType {
    let bytes = literal.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i = 1;
    }

    let mut int_digits = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        int_digits += 1;
        i += 1;
    }
    if i == bytes.len() {
        return if int_digits > 0 {
            NumberType::Long
        } else {
            NumberType::NaN
        };
    }

    let mut frac_digits = 0;
    if bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            frac_digits += 1;
            i += 1;
        }
    }
    if int_digits + frac_digits == 0 {
        return NumberType::NaN;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }

    if i == bytes.len() {
        NumberType::Double
    } else {
        NumberType::NaN
    }
}

/// Check if `token` is a non-empty run of ASCII digits.
pub fn is_index(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_long() {
        assert_eq!(detect_number("0"), NumberType::Long);
        assert_eq!(detect_number("-17"), NumberType::Long);
        assert_eq!(detect_number("+5"), NumberType::Long);
        assert_eq!(detect_number("99999999999999999999"), NumberType::Long);
    }

    #[test]
    fn test_detect_double() {
        assert_eq!(detect_number("1.5"), NumberType::Double);
        assert_eq!(detect_number("-.5"), NumberType::Double);
        assert_eq!(detect_number("3."), NumberType::Double);
        assert_eq!(detect_number("1e10"), NumberType::Double);
        assert_eq!(detect_number("2.5E-3"), NumberType::Double);
        assert_eq!(detect_number("1e"), NumberType::Double);
    }

    #[test]
    fn test_detect_nan() {
        assert_eq!(detect_number(""), NumberType::NaN);
        assert_eq!(detect_number("-"), NumberType::NaN);
        assert_eq!(detect_number("."), NumberType::NaN);
        assert_eq!(detect_number("abc"), NumberType::NaN);
        assert_eq!(detect_number("12abc"), NumberType::NaN);
        assert_eq!(detect_number("1.2.3"), NumberType::NaN);
        assert_eq!(detect_number(" 1"), NumberType::NaN);
    }

    #[test]
    fn test_is_index() {
        assert!(is_index("0"));
        assert!(is_index("42"));
        assert!(!is_index(""));
        assert!(!is_index("-1"));
        assert!(!is_index("name"));
    }
}
