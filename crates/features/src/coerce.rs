//! Numeric coercion of spreadsheet cells.

use carcupid_model::Cell;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?[0-9]+(?:\.[0-9]+)?").unwrap());
static CITY_HIGHWAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*/\s*([0-9]+(?:\.[0-9]+)?)").unwrap());

/// Extract a number from a loosely-typed cell.
///
/// `$` and `,` are stripped first, then the *last* numeric token is taken,
/// so `"MSRP: $45,000"` yields 45000 and `"24/31 mpg"` yields 31. Anything
/// without a digit yields 0.
pub fn num(cell: &Cell) -> f64 {
    if cell.is_absent() {
        return 0.0;
    }
    let text = cell.to_text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let stripped: String = trimmed.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    NUMBER
        .find_iter(&stripped)
        .last()
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Mean of a `"<city> / <highway>"` pair, e.g. `"24/31"` → 27.5.
pub fn parse_city_highway(text: &str) -> Option<f64> {
    let caps = CITY_HIGHWAY.captures(text)?;
    let city: f64 = caps[1].parse().ok()?;
    let highway: f64 = caps[2].parse().ok()?;
    if !city.is_finite() || !highway.is_finite() {
        return None;
    }
    Some((city + highway) / 2.0)
}

/// Whole-cell numeric read, used for counts and years.
///
/// Absent and blank cells read as 0, booleans as 1/0. Text that is not
/// entirely a decimal literal is `None`, so `"4 doors"` matches no bucket.
pub fn strict_number(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Null => 0.0,
        Cell::Bool(b) => f64::from(u8::from(*b)),
        Cell::Number(n) => *n,
        Cell::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().ok()?
            }
        }
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_num_currency() {
        assert_eq!(num(&"$45,000".into()), 45000.0);
        assert_eq!(num(&"MSRP: $45,000".into()), 45000.0);
    }

    #[test]
    fn test_num_last_token_wins() {
        assert_eq!(num(&"24/31 mpg".into()), 31.0);
        assert_eq!(num(&"300 hp @ 5200 rpm".into()), 5200.0);
    }

    #[test]
    fn test_num_non_text_cells() {
        assert_eq!(num(&Cell::Number(301.5)), 301.5);
        assert_eq!(num(&Cell::Null), 0.0);
        assert_eq!(num(&Cell::Bool(true)), 0.0);
        assert_eq!(num(&"   ".into()), 0.0);
        assert_eq!(num(&"-12.5".into()), -12.5);
    }

    #[test]
    fn test_parse_city_highway() {
        assert_eq!(parse_city_highway("24/31"), Some(27.5));
        assert_eq!(parse_city_highway("57 / 56 mpg"), Some(56.5));
        assert_eq!(parse_city_highway("n/a"), None);
        assert_eq!(parse_city_highway(""), None);
    }

    #[test]
    fn test_strict_number() {
        assert_eq!(strict_number(&"4".into()), Some(4.0));
        assert_eq!(strict_number(&" 5 ".into()), Some(5.0));
        assert_eq!(strict_number(&"".into()), Some(0.0));
        assert_eq!(strict_number(&Cell::Null), Some(0.0));
        assert_eq!(strict_number(&Cell::Number(2024.0)), Some(2024.0));
        assert_eq!(strict_number(&"4 doors".into()), None);
        assert_eq!(strict_number(&"inf".into()), None);
    }

    proptest! {
        #[test]
        fn prop_digitless_cells_are_zero(s in "[^0-9]*") {
            prop_assert_eq!(num(&Cell::Text(s)), 0.0);
        }

        #[test]
        fn prop_num_is_finite(s in ".*") {
            prop_assert!(num(&Cell::Text(s)).is_finite());
        }
    }
}
