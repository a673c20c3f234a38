//! Strict text grammar for scalar field kinds
//!
//! - integer / long: optional sign and ASCII digits, no whitespace
//! - double: plain decimal or scientific notation, finite values only
//! - decimal: optional sign, digits, optional fraction
//! - boolean: `true` / `false`, any case
//! - date: `YYYY-MM-DD`, must be a real calendar date
//! - timestamp: `YYYY-MM-DD HH:MM:SS`
//! - enum: a declared symbol, any case; decodes to the declared spelling
//!
//! Values are never trimmed: `" 5"` is not an integer.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::value::FieldValue;
use crate::schema::FieldKind;
use crate::store::RecordId;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses `raw` as a value of `kind`.
///
/// Reference kinds parse to the raw identity; whether the target record
/// exists is the resolver's concern. Returns `None` if the text is not in
/// the kind's grammar.
pub fn parse(kind: &FieldKind, raw: &str) -> Option<FieldValue> {
    match kind {
        FieldKind::String => Some(FieldValue::String(raw.to_string())),
        FieldKind::Integer => parse_integer(raw).map(FieldValue::Integer),
        FieldKind::Long => parse_integer(raw).map(FieldValue::Long),
        FieldKind::Double => parse_double(raw).map(FieldValue::Double),
        FieldKind::Decimal => parse_decimal(raw).map(FieldValue::Decimal),
        FieldKind::Boolean => parse_boolean(raw).map(FieldValue::Boolean),
        FieldKind::Date => parse_date(raw).map(FieldValue::Date),
        FieldKind::Timestamp => parse_timestamp(raw).map(FieldValue::Timestamp),
        FieldKind::Enum { symbols } => {
            let wanted = raw.to_lowercase();
            symbols
                .iter()
                .find(|symbol| symbol.to_lowercase() == wanted)
                .map(|symbol| FieldValue::Enum(symbol.clone()))
        }
        FieldKind::Reference { .. } => parse_identity(raw).map(FieldValue::Reference),
    }
}

/// Parses a record identity.
pub fn parse_identity(raw: &str) -> Option<RecordId> {
    parse_integer(raw).map(RecordId)
}

/// Canonical text of a value; `parse` accepts everything this produces.
pub fn format(value: &FieldValue) -> String {
    value.to_string()
}

/// Describes the expected grammar in type mismatch messages.
pub fn expected(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Date => "date (YYYY-MM-DD)".to_string(),
        FieldKind::Timestamp => "timestamp (YYYY-MM-DD HH:MM:SS)".to_string(),
        FieldKind::Enum { symbols } => format!("one of {}", symbols.join(", ")),
        FieldKind::Reference { target } => format!("{} id", target),
        other => other.type_name().to_string(),
    }
}

fn parse_integer<T: FromStr>(raw: &str) -> Option<T> {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn parse_double(raw: &str) -> Option<f64> {
    // Keeps out `inf`, `NaN` and friends, which the std parser accepts
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E');
    if !raw.chars().all(allowed) || !raw.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    let (whole, fraction) = match digits.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (digits, None),
    };

    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || !fraction.map_or(true, is_digits) {
        return None;
    }
    Decimal::from_str(raw).ok()
}

fn parse_boolean(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Checks `raw` against a layout where `#` is an ASCII digit and any other
/// byte must match literally.
fn has_shape(raw: &str, layout: &str) -> bool {
    raw.len() == layout.len()
        && raw.bytes().zip(layout.bytes()).all(|(c, l)| match l {
            b'#' => c.is_ascii_digit(),
            _ => c == l,
        })
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if !has_shape(raw, "####-##-##") {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if !has_shape(raw, "####-##-## ##:##:##") {
        return None;
    }
    // No leap seconds
    if &raw[17..] > "59" {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> FieldKind {
        FieldKind::Enum {
            symbols: vec!["ISSUED".into(), "PAID".into()],
        }
    }

    #[test]
    fn test_integer_grammar() {
        assert_eq!(parse(&FieldKind::Integer, "2010"), Some(FieldValue::Integer(2010)));
        assert_eq!(parse(&FieldKind::Integer, "-7"), Some(FieldValue::Integer(-7)));
        assert_eq!(parse(&FieldKind::Integer, "+7"), Some(FieldValue::Integer(7)));
        assert_eq!(parse(&FieldKind::Integer, "abc"), None);
        assert_eq!(parse(&FieldKind::Integer, " 5"), None);
        assert_eq!(parse(&FieldKind::Integer, "1.0"), None);
        assert_eq!(parse(&FieldKind::Integer, "-"), None);
        // Out of i32 range
        assert_eq!(parse(&FieldKind::Integer, "3000000000"), None);
        assert_eq!(
            parse(&FieldKind::Long, "3000000000"),
            Some(FieldValue::Long(3_000_000_000))
        );
    }

    #[test]
    fn test_double_grammar() {
        assert_eq!(parse(&FieldKind::Double, "2.5"), Some(FieldValue::Double(2.5)));
        assert_eq!(parse(&FieldKind::Double, "-1e3"), Some(FieldValue::Double(-1000.0)));
        assert_eq!(parse(&FieldKind::Double, ".5"), Some(FieldValue::Double(0.5)));
        assert_eq!(parse(&FieldKind::Double, "inf"), None);
        assert_eq!(parse(&FieldKind::Double, "NaN"), None);
        assert_eq!(parse(&FieldKind::Double, "1e400"), None);
        assert_eq!(parse(&FieldKind::Double, "1,5"), None);
        assert_eq!(parse(&FieldKind::Double, "e"), None);
    }

    #[test]
    fn test_decimal_grammar() {
        assert_eq!(
            parse(&FieldKind::Decimal, "10.50"),
            Some(FieldValue::Decimal(Decimal::from_str("10.50").unwrap()))
        );
        assert!(parse(&FieldKind::Decimal, "-3").is_some());
        assert_eq!(parse(&FieldKind::Decimal, "1."), None);
        assert_eq!(parse(&FieldKind::Decimal, ".5"), None);
        assert_eq!(parse(&FieldKind::Decimal, "1_000"), None);
        assert_eq!(parse(&FieldKind::Decimal, "1e3"), None);
    }

    #[test]
    fn test_boolean_grammar() {
        assert_eq!(parse(&FieldKind::Boolean, "TRUE"), Some(FieldValue::Boolean(true)));
        assert_eq!(parse(&FieldKind::Boolean, "false"), Some(FieldValue::Boolean(false)));
        assert_eq!(parse(&FieldKind::Boolean, "yes"), None);
        assert_eq!(parse(&FieldKind::Boolean, "1"), None);
    }

    #[test]
    fn test_date_grammar() {
        let expected = NaiveDate::from_ymd_opt(1985, 4, 12).unwrap();
        assert_eq!(parse(&FieldKind::Date, "1985-04-12"), Some(FieldValue::Date(expected)));
        assert_eq!(parse(&FieldKind::Date, "2023-02-30"), None);
        assert_eq!(parse(&FieldKind::Date, "1985-4-12"), None);
        assert_eq!(parse(&FieldKind::Date, "12.04.1985"), None);
        assert_eq!(parse(&FieldKind::Date, "1985-04-12 00:00:00"), None);
    }

    #[test]
    fn test_timestamp_grammar() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(13, 45, 0)
            .unwrap();
        assert_eq!(
            parse(&FieldKind::Timestamp, "2024-03-01 13:45:00"),
            Some(FieldValue::Timestamp(expected))
        );
        assert_eq!(parse(&FieldKind::Timestamp, "2024-03-01T13:45:00"), None);
        assert_eq!(parse(&FieldKind::Timestamp, "2024-03-01 25:00:00"), None);
        assert_eq!(parse(&FieldKind::Timestamp, "2024-03-01 23:59:60"), None);
        assert_eq!(parse(&FieldKind::Timestamp, "2024-03-01"), None);
    }

    #[test]
    fn test_enum_is_case_insensitive() {
        assert_eq!(parse(&symbols(), "paid"), Some(FieldValue::Enum("PAID".into())));
        assert_eq!(parse(&symbols(), "Issued"), Some(FieldValue::Enum("ISSUED".into())));
        assert_eq!(parse(&symbols(), "CANCELLED"), None);
    }

    #[test]
    fn test_enum_case_folding_beyond_ascii() {
        let kind = FieldKind::Enum {
            symbols: vec!["ВЫПИСАН".into(), "ОПЛАЧЕН".into()],
        };
        assert_eq!(parse(&kind, "оплачен"), Some(FieldValue::Enum("ОПЛАЧЕН".into())));
        assert_eq!(parse(&kind, "Выписан"), Some(FieldValue::Enum("ВЫПИСАН".into())));
        assert_eq!(parse(&kind, "отменён"), None);
    }

    #[test]
    fn test_reference_parses_identity_only() {
        let kind = FieldKind::Reference {
            target: "Driver".into(),
        };
        assert_eq!(parse(&kind, "3"), Some(FieldValue::Reference(RecordId(3))));
        assert_eq!(parse(&kind, "three"), None);
    }

    #[test]
    fn test_format_parses_back() {
        let kinds = [
            (FieldKind::Integer, "-12"),
            (FieldKind::Double, "0.1"),
            (FieldKind::Decimal, "99.90"),
            (FieldKind::Boolean, "false"),
            (FieldKind::Date, "2000-02-29"),
            (FieldKind::Timestamp, "1999-12-31 23:59:59"),
        ];
        for (kind, raw) in kinds {
            let value = parse(&kind, raw).unwrap();
            assert_eq!(format(&value), raw);
            assert_eq!(parse(&kind, &format(&value)), Some(value));
        }
    }

    #[test]
    fn test_expected_descriptions() {
        assert_eq!(expected(&FieldKind::Integer), "integer");
        assert_eq!(expected(&symbols()), "one of ISSUED, PAID");
    }
}
