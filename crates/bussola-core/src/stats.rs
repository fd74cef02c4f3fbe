//! Statistics Engine
//!
//! Extracts a numeric series from one column of the uploaded rows and
//! summarizes it. All degenerate inputs (missing column, no parseable
//! values) produce an all-zero record rather than an error: the statistics
//! boundary silently drops bad values and never fails.

use serde_json::Value;

use crate::models::{Row, Statistics};

/// Coerce a raw cell value to a finite number.
///
/// Numbers pass through; strings are trimmed and accept both decimal
/// separators (`1.234,5` style inputs are common in locale-formatted
/// exports, `1234,5` becomes `1234.5`). Everything else is dropped — bad
/// values are excluded from the series, never zero-filled.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let normalized = s.trim().replace(',', ".");
            normalized.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Extract the numeric series for `target` across the ordered rows
pub fn series(rows: &[Row], target: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| row.get(target))
        .filter_map(coerce_number)
        .collect()
}

/// Ordinary-least-squares fit of `y` against the sequential index 1..n.
///
/// Returns `(a, b)` of the line `a + b*x`. The slope is 0 when the series
/// has fewer than two points or the denominator vanishes.
pub fn ols_fit(y: &[f64]) -> (f64, f64) {
    let n = y.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean_x = (n as f64 + 1.0) / 2.0;
    let mean_y = y.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean_y, 0.0);
    }

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, value) in y.iter().enumerate() {
        let x = (i + 1) as f64;
        num += (x - mean_x) * (value - mean_y);
        den += (x - mean_x) * (x - mean_x);
    }

    if den == 0.0 {
        return (mean_y, 0.0);
    }
    let b = num / den;
    (mean_y - b * mean_x, b)
}

/// Summarize the series of `target` across `rows`.
///
/// `cv` and `growth_pct` guard a zero mean by dividing by 1 instead; see
/// the field docs on [`Statistics`].
pub fn summarize(rows: &[Row], target: &str) -> Statistics {
    let values = series(rows, target);
    if values.is_empty() {
        return Statistics::default();
    }

    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    let std = variance.sqrt();

    let mean_or_one = if mean == 0.0 { 1.0 } else { mean };
    let cv = std / mean_or_one;
    let growth_pct = (values[n - 1] - mean) / mean_or_one * 100.0;
    let (_, trend_slope) = ols_fit(&values);

    Statistics {
        count: n,
        mean,
        std,
        cv,
        min,
        max,
        trend_slope,
        growth_pct,
    }
}

/// Trailing moving average with window `k`, clamped to available history:
/// early points average over fewer than `k` values.
pub fn moving_average(values: &[f64], k: usize) -> Vec<f64> {
    if k <= 1 {
        return values.to_vec();
    }
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let start = i.saturating_sub(k - 1);
        let window = &values[start..=i];
        out.push(window.iter().sum::<f64>() / window.len() as f64);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows_from(values: &[Value]) -> Vec<Row> {
        values
            .iter()
            .map(|v| {
                let mut row = Row::new();
                row.insert("vendite".to_string(), v.clone());
                row
            })
            .collect()
    }

    #[test]
    fn test_coerce_number_locales() {
        assert_eq!(coerce_number(&json!(12.5)), Some(12.5));
        assert_eq!(coerce_number(&json!("12.5")), Some(12.5));
        assert_eq!(coerce_number(&json!("12,5")), Some(12.5));
        assert_eq!(coerce_number(&json!(" 40 ")), Some(40.0));
        assert_eq!(coerce_number(&json!("n/a")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!(true)), None);
    }

    #[test]
    fn test_series_drops_unparseable() {
        let rows = rows_from(&[json!(10), json!("20,0"), json!("boh"), json!(null), json!(30)]);
        assert_eq!(series(&rows, "vendite"), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_summarize_empty_never_fails() {
        let stats = summarize(&[], "vendite");
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.cv, 0.0);
        assert_eq!(stats.trend_slope, 0.0);

        let rows = rows_from(&[json!("x"), json!("y")]);
        let stats = summarize(&rows, "vendite");
        assert_eq!(stats.count, 0);
    }

    #[test]
    fn test_summarize_bounds_invariant() {
        let rows = rows_from(&[json!(3.0), json!(7.0), json!(5.0), json!(9.0)]);
        let stats = summarize(&rows, "vendite");
        assert_eq!(stats.count, 4);
        assert!(stats.min <= stats.mean && stats.mean <= stats.max);
        assert!(stats.std >= 0.0);
        assert_eq!(stats.min, 3.0);
        assert_eq!(stats.max, 9.0);
    }

    #[test]
    fn test_growth_pct_is_deviation_from_mean() {
        // mean = 20, last = 30: (30 - 20) / 20 * 100 = 50%
        let rows = rows_from(&[json!(10), json!(20), json!(30)]);
        let stats = summarize(&rows, "vendite");
        assert!((stats.growth_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_mean_guard() {
        let rows = rows_from(&[json!(-5), json!(5)]);
        let stats = summarize(&rows, "vendite");
        assert_eq!(stats.mean, 0.0);
        // cv and growth divide by 1 instead of 0
        assert_eq!(stats.cv, stats.std);
        assert_eq!(stats.growth_pct, 500.0);
    }

    #[test]
    fn test_trend_slope_degenerate() {
        assert_eq!(ols_fit(&[]).1, 0.0);
        assert_eq!(ols_fit(&[42.0]).1, 0.0);

        let rows = rows_from(&[json!(7)]);
        assert_eq!(summarize(&rows, "vendite").trend_slope, 0.0);
    }

    #[test]
    fn test_trend_slope_linear_series() {
        // Perfectly linear: y = 2x, slope must be 2
        let y: Vec<f64> = (1..=10).map(|i| 2.0 * i as f64).collect();
        let (a, b) = ols_fit(&y);
        assert!((b - 2.0).abs() < 1e-9);
        assert!(a.abs() < 1e-9);
    }

    #[test]
    fn test_constant_series_has_zero_slope_and_cv() {
        let rows = rows_from(&[json!(50), json!(50), json!(50), json!(50)]);
        let stats = summarize(&rows, "vendite");
        assert_eq!(stats.trend_slope, 0.0);
        assert_eq!(stats.cv, 0.0);
        assert_eq!(stats.std, 0.0);
    }

    #[test]
    fn test_moving_average_clamped_window() {
        let ma = moving_average(&[2.0, 4.0, 6.0, 8.0], 3);
        assert_eq!(ma, vec![2.0, 3.0, 4.0, 6.0]);
        // window 1 is the identity
        assert_eq!(moving_average(&[1.0, 2.0], 1), vec![1.0, 2.0]);
    }
}
