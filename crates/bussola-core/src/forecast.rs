//! Forecaster
//!
//! Projects a fixed horizon beyond the observed series with two estimators:
//! the last trailing moving average held flat, and the OLS trend line
//! extrapolated per step. The moving-average projection stays flat across
//! the whole horizon; it is never recomputed per projected step.

use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::models::{Forecast, ForecastPoint, Row, VolatilityLabel};
use crate::stats::{self, moving_average, ols_fit};

/// Options for one forecast run
#[derive(Debug, Clone)]
pub struct ForecastOptions<'a> {
    /// Numeric column to project
    pub target: &'a str,
    /// Optional date column; enables calendar-day projected dates
    pub date_col: Option<&'a str>,
    /// Number of projected steps
    pub horizon: usize,
    /// Moving-average window size
    pub window: usize,
}

impl<'a> ForecastOptions<'a> {
    pub fn new(target: &'a str) -> Self {
        Self {
            target,
            date_col: None,
            horizon: 12,
            window: 5,
        }
    }

    pub fn with_date_col(mut self, date_col: Option<&'a str>) -> Self {
        self.date_col = date_col;
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }
}

/// Compute the fixed-horizon projection for `opts.target` over `rows`.
///
/// An empty series yields empty points and a neutral insight, never an
/// error.
pub fn forecast(rows: &[Row], opts: &ForecastOptions<'_>) -> Forecast {
    let y = stats::series(rows, opts.target);
    if y.is_empty() {
        return Forecast {
            points: Vec::new(),
            insight: "Serie vuota: nessuna previsione disponibile.".to_string(),
        };
    }

    let n = y.len();
    let ma = moving_average(&y, opts.window);
    // moving_average is never empty for a non-empty series
    let last_ma = *ma.last().unwrap_or(&y[n - 1]);
    let (a, b) = ols_fit(&y);

    let last_date = opts
        .date_col
        .and_then(|col| last_date_in(rows, col))
        .and_then(|raw| parse_date(&raw));

    let points = (1..=opts.horizon)
        .map(|i| {
            let index = n + i;
            let date = match last_date {
                Some(d) => (d + Duration::days(i as i64)).format("%Y-%m-%d").to_string(),
                None => index.to_string(),
            };
            ForecastPoint {
                index,
                date,
                y_hat_moving_average: round2(last_ma),
                y_hat_trend: round2(a + b * index as f64),
            }
        })
        .collect();

    Forecast {
        points,
        insight: build_insight(&y, b),
    }
}

fn last_date_in(rows: &[Row], date_col: &str) -> Option<String> {
    rows.iter().rev().find_map(|row| match row.get(date_col) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}

/// Parse a date cell. Accepts ISO dates, slash-separated day-first and
/// month-first forms, and RFC 3339 timestamps truncated to the date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
}

fn build_insight(y: &[f64], slope: f64) -> String {
    let direction = if slope > 0.0 {
        "crescente"
    } else if slope < 0.0 {
        "decrescente"
    } else {
        "piatta"
    };
    let cv = series_cv(y);
    format!(
        "Trend {} (pendenza ~ {:.4}). Volatilità {} (CV={:.3}).",
        direction,
        slope,
        VolatilityLabel::from_cv(cv),
        cv
    )
}

fn series_cv(y: &[f64]) -> f64 {
    let n = y.len();
    if n == 0 {
        return 0.0;
    }
    let mean = y.iter().sum::<f64>() / n as f64;
    let variance = y.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    let std = variance.sqrt();
    std / if mean == 0.0 { 1.0 } else { mean }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
