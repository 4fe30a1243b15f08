//! Date normalizers for the two encodings found in I-94 extracts.
//!
//! Both converters are total: any input they cannot turn into a calendar
//! date yields `None`. Nothing is logged from here.

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;

/// Origin of SAS numeric dates.
pub const SAS_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1960, 1, 1) {
    Some(date) => date,
    None => panic!("invalid SAS epoch"),
};

/// Years a normalized date may fall in; outside this range the date has no
/// four-digit ISO form.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

/// `1960-01-01 + days`, or `None` when the result falls outside years 1-9999.
pub fn sas_date_from_days(days: i64) -> Option<NaiveDate> {
    let offset = Duration::try_days(days)?;
    SAS_EPOCH
        .checked_add_signed(offset)
        .filter(|date| YEAR_RANGE.contains(&date.year()))
}

/// Convert a SAS day offset carried in a loosely typed value.
///
/// Integers are used directly and floats are truncated toward zero. Strings
/// are trimmed and read the same way, so `"20545"` and `"20545.0"` both
/// work. Anything else, including null and booleans, gives `None`.
pub fn convert_sas_date(value: &Value) -> Option<NaiveDate> {
    let days = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => truncate_to_i64(n.as_f64()?)?,
        },
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => i,
                Err(_) => truncate_to_i64(s.parse::<f64>().ok()?)?,
            }
        }
        _ => return None,
    };
    sas_date_from_days(days)
}

fn truncate_to_i64(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    let truncated = f.trunc();
    // i64::MAX as f64 rounds up to 2^63
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return None;
    }
    Some(truncated as i64)
}

/// Parse an `MMDDYYYY` string such as `"01152021"`.
pub fn convert_string_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let month: u32 = s[0..2].parse().ok()?;
    let day: u32 = s[2..4].parse().ok()?;
    let year: i32 = s[4..8].parse().ok()?;
    if !YEAR_RANGE.contains(&year) {
        return None;
    }

    NaiveDate::from_ymd_opt(year, month, day)
}

/// [`convert_string_date`] for a loosely typed value; non-strings give `None`.
pub fn convert_string_date_value(value: &Value) -> Option<NaiveDate> {
    value.as_str().and_then(convert_string_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sas_date_epoch_arithmetic() {
        assert_eq!(sas_date_from_days(0), Some(date(1960, 1, 1)));
        // 1960 is a leap year
        assert_eq!(sas_date_from_days(365), Some(date(1960, 12, 31)));
        assert_eq!(sas_date_from_days(366), Some(date(1961, 1, 1)));
        assert_eq!(sas_date_from_days(-1), Some(date(1959, 12, 31)));
        assert_eq!(sas_date_from_days(20545), Some(date(2016, 4, 1)));
    }

    #[test]
    fn test_sas_date_overflow_is_none() {
        assert_eq!(sas_date_from_days(i64::MAX), None);
        assert_eq!(sas_date_from_days(i64::MIN), None);
        assert_eq!(sas_date_from_days(1_000_000_000), None);
    }

    #[test]
    fn test_sas_date_year_bounds() {
        assert_eq!(sas_date_from_days(2_936_549), Some(date(9999, 12, 31)));
        assert_eq!(sas_date_from_days(2_936_550), None);
        assert_eq!(sas_date_from_days(-715_509), Some(date(1, 1, 1)));
        assert_eq!(sas_date_from_days(-715_510), None);
        assert_eq!(sas_date_from_days(3_000_000), None);
        assert_eq!(convert_sas_date(&json!("-800000")), None);
    }

    #[test]
    fn test_convert_sas_date_from_values() {
        assert_eq!(convert_sas_date(&json!(20545)), Some(date(2016, 4, 1)));
        assert_eq!(convert_sas_date(&json!(20545.0)), Some(date(2016, 4, 1)));
        assert_eq!(convert_sas_date(&json!(20545.9)), Some(date(2016, 4, 1)));
        assert_eq!(convert_sas_date(&json!(-0.5)), Some(date(1960, 1, 1)));
        assert_eq!(convert_sas_date(&json!("20545")), Some(date(2016, 4, 1)));
        assert_eq!(convert_sas_date(&json!(" 366 ")), Some(date(1961, 1, 1)));
        assert_eq!(convert_sas_date(&json!("20545.0")), Some(date(2016, 4, 1)));
    }

    #[test]
    fn test_convert_sas_date_rejects_garbage() {
        assert_eq!(convert_sas_date(&Value::Null), None);
        assert_eq!(convert_sas_date(&json!(true)), None);
        assert_eq!(convert_sas_date(&json!("abc")), None);
        assert_eq!(convert_sas_date(&json!("NaN")), None);
        assert_eq!(convert_sas_date(&json!("inf")), None);
        assert_eq!(convert_sas_date(&json!("")), None);
        assert_eq!(convert_sas_date(&json!(1e300)), None);
        assert_eq!(convert_sas_date(&json!([1])), None);
    }

    #[test]
    fn test_convert_string_date() {
        assert_eq!(convert_string_date("01152021"), Some(date(2021, 1, 15)));
        assert_eq!(convert_string_date("02292016"), Some(date(2016, 2, 29)));
        assert_eq!(convert_string_date("12312099"), Some(date(2099, 12, 31)));
    }

    #[test]
    fn test_convert_string_date_rejects_malformed() {
        assert_eq!(convert_string_date("13152021"), None);
        assert_eq!(convert_string_date("02302021"), None);
        assert_eq!(convert_string_date("02292021"), None);
        assert_eq!(convert_string_date("1152021"), None);
        assert_eq!(convert_string_date("011520210"), None);
        assert_eq!(convert_string_date("01-15-21"), None);
        assert_eq!(convert_string_date("+1152021"), None);
        assert_eq!(convert_string_date("01150000"), None);
        assert_eq!(convert_string_date(""), None);
        assert_eq!(convert_string_date("０1152021"), None);
    }

    #[test]
    fn test_convert_string_date_value() {
        assert_eq!(
            convert_string_date_value(&json!("04302016")),
            Some(date(2016, 4, 30))
        );
        assert_eq!(convert_string_date_value(&json!(4302016)), None);
        assert_eq!(convert_string_date_value(&Value::Null), None);
    }
}
