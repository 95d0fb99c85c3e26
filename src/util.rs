// Utility helpers for coercion, rounding and display formatting.
//
// Every numeric cell read from the CSV files goes through `coerce_or_zero`,
// so the engine modules only ever see finite `f64` values.
use chrono::{NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Date layouts accepted for `Order Date`, tried in order.
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports.
///
/// - Trims whitespace and strips thousands separators (`","`).
/// - Returns `None` for empty cells, text, `NaN` and infinities.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// The one coercion policy for numeric columns: anything that does not
/// parse to a finite number becomes `0.0`.
///
/// Returns the value together with a flag telling whether coercion kicked
/// in for a non-empty cell, so the loader can count it.
pub fn coerce_or_zero(s: Option<&str>) -> (f64, bool) {
    match parse_f64_safe(s) {
        Some(v) => (v, false),
        None => (0.0, s.map_or(false, |raw| !raw.trim().is_empty())),
    }
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Text cells are trimmed; a missing cell becomes the empty string.
pub fn clean_text(s: Option<String>) -> String {
    s.map(|v| v.trim().to_string()).unwrap_or_default()
}

pub fn average(v: &[f64]) -> f64 {
    // Returns 0 for an empty slice so no NaN reaches the presentation layer.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Divide, reporting 0 instead of NaN/infinity when the denominator is 0.
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let r = numerator / denominator;
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(n: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (n * factor).round() / factor
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places plus `en` thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_val: u64 = parts.next().unwrap_or("0").parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if decimals > 0 {
        res.push('.');
        match parts.next() {
            Some(frac) => res.push_str(frac),
            None => res.push_str(&"0".repeat(decimals)),
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Rupee amount with thousands separators, e.g. `₹1,234.50`.
pub fn format_inr(n: f64, decimals: usize) -> String {
    format!("₹{}", format_number(n, decimals))
}

pub fn format_pct(n: &f64) -> String {
    format!("{}%", format_number(*n, 2))
}

/// Percentage at one decimal place, for values already rounded to 1 dp.
pub fn format_pct_1(n: &f64) -> String {
    format!("{}%", format_number(*n, 1))
}

pub fn format_f64_2(n: &f64) -> String {
    format_number(*n, 2)
}

pub fn format_optional_rating(v: &Option<f64>) -> String {
    v.map(|r| format!("{:.2}", r)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tolerates_separators_and_rejects_text() {
        assert_eq!(parse_f64_safe(Some(" 1,250.5 ")), Some(1250.5));
        assert_eq!(parse_f64_safe(Some("abc")), None);
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(Some("inf")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn coerce_flags_only_non_empty_garbage() {
        assert_eq!(coerce_or_zero(Some("12")), (12.0, false));
        assert_eq!(coerce_or_zero(Some("n/a")), (0.0, true));
        assert_eq!(coerce_or_zero(Some("  ")), (0.0, false));
        assert_eq!(coerce_or_zero(None), (0.0, false));
    }

    #[test]
    fn dates_in_several_layouts() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date_safe(Some("2024-03-09")), Some(d));
        assert_eq!(parse_date_safe(Some("09-03-2024")), Some(d));
        assert_eq!(parse_date_safe(Some("2024-03-09 17:45:00")), Some(d));
        assert_eq!(parse_date_safe(Some("yesterday")), None);
    }

    #[test]
    fn empty_mean_and_zero_division_are_zero() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[1.0, 2.0, 6.0]), 3.0);
        assert_eq!(ratio_or_zero(5.0, 0.0), 0.0);
        assert_eq!(ratio_or_zero(5.0, 2.0), 2.5);
    }

    #[test]
    fn rounding_and_formatting() {
        assert_eq!(round_to(66.6666, 1), 66.7);
        assert_eq!(round_to(33.3333, 2), 33.33);
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.6, 0), "-13");
        assert_eq!(format_number(0.0, 1), "0.0");
        assert_eq!(format_inr(600.0, 0), "₹600");
        assert_eq!(format_pct(&33.33), "33.33%");
        assert_eq!(format_pct_1(&66.7), "66.7%");
        assert_eq!(format_int(9855), "9,855");
    }
}
