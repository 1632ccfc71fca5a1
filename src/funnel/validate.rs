//! Checks applied to free-text answers

use once_cell::sync::Lazy;
use regex::Regex;

static MEASURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("measure regex is valid"));

/// Accepts any string containing both `@` and `.`, in any position.
///
/// No structure, domain or uniqueness checks.
pub fn is_valid_email(candidate: &str) -> bool {
    candidate.contains('@') && candidate.contains('.')
}

/// Something that reads like a name rather than a command or a bare number.
pub fn is_valid_name(candidate: &str) -> bool {
    let name = candidate.trim();
    let len = name.chars().count();
    (2..=40).contains(&len) && !name.starts_with('/') && name.chars().any(char::is_alphabetic)
}

/// First positive number in the text, decimal comma allowed ("65,5 кг").
pub fn parse_measure(text: &str) -> Option<f64> {
    let raw = MEASURE_RE.find(text)?.as_str().replace(',', ".");
    raw.parse::<f64>().ok().filter(|v| *v > 0.0)
}

/// Daily calorie hint: `weight + height / 2`, half-to-even rounding.
pub fn calories(height_cm: f64, weight_kg: f64) -> i64 {
    (weight_kg + height_cm / 2.0).round_ties_even() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rule_is_substring_presence() {
        assert!(is_valid_email("a@b.c"));
        assert!(is_valid_email("@."));
        assert!(is_valid_email(".@"));
        assert!(is_valid_email("ok@mail.ru"));
        assert!(!is_valid_email("abc"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a.b"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn names_reject_commands_and_numbers() {
        assert!(is_valid_name("Полина"));
        assert!(is_valid_name("  Anna Maria "));
        assert!(!is_valid_name("/start"));
        assert!(!is_valid_name("170"));
        assert!(!is_valid_name("A"));
        assert!(!is_valid_name(""));
    }

    #[test]
    fn measures_accept_units_and_commas() {
        assert_eq!(parse_measure("170"), Some(170.0));
        assert_eq!(parse_measure("рост 165 см"), Some(165.0));
        assert_eq!(parse_measure("65,5 кг"), Some(65.5));
        assert_eq!(parse_measure("58.2"), Some(58.2));
        assert_eq!(parse_measure("0"), None);
        assert_eq!(parse_measure("не знаю"), None);
    }

    #[test]
    fn calories_follow_weight_plus_half_height() {
        assert_eq!(calories(170.0, 65.0), 150);
        assert_eq!(calories(171.0, 60.0), 146);
        assert_eq!(calories(173.0, 60.0), 146);
        assert_eq!(calories(160.0, 55.4), 135);
    }
}
