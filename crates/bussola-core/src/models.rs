//! Domain models for Bussola

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One uploaded record: column name → raw value (string, number or
/// date-like string). Row order in a `Vec<Row>` is the time order of the
/// source file and is significant; column order is not.
pub type Row = HashMap<String, Value>;

/// Business domain the analysis is framed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Marketing,
    Sales,
    Finance,
    Business,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Marketing => "marketing",
            Self::Sales => "sales",
            Self::Finance => "finance",
            Self::Business => "business",
        }
    }

    /// Short context brief injected into stage prompts
    pub fn brief(&self) -> &'static str {
        match self {
            Self::Marketing => {
                "Marketing: campagne, conversion rate, CAC, ROAS, CPL, retention, mix paid/organic."
            }
            Self::Sales => {
                "Sales: pipeline, deal velocity, win rate, ACV, churn, upsell/cross-sell."
            }
            Self::Finance => {
                "Finance: ricavi, costi, margini, cassa, ROI, LTV/CAC, MRR/ARR, budget."
            }
            Self::Business => {
                "Business: KPI generali, crescita sostenibile, efficienza operativa, processi."
            }
        }
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::Business
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "marketing" => Ok(Self::Marketing),
            "sales" => Ok(Self::Sales),
            "finance" => Ok(Self::Finance),
            "business" => Ok(Self::Business),
            _ => Err(format!("Unknown domain: {}", s)),
        }
    }
}

/// Trend direction classified from the OLS slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Crescente,
    Decrescente,
    Piatto,
}

impl TrendLabel {
    /// Classify a slope with a ±0.0001 dead zone around zero
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0001 {
            Self::Crescente
        } else if slope < -0.0001 {
            Self::Decrescente
        } else {
            Self::Piatto
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crescente => "crescente",
            Self::Decrescente => "decrescente",
            Self::Piatto => "piatto",
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relative volatility bucketed from the coefficient of variation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityLabel {
    Bassa,
    Media,
    Alta,
}

impl VolatilityLabel {
    /// Bucket a coefficient of variation: <0.10 low, <0.25 medium, else high
    pub fn from_cv(cv: f64) -> Self {
        if cv < 0.10 {
            Self::Bassa
        } else if cv < 0.25 {
            Self::Media
        } else {
            Self::Alta
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bassa => "bassa",
            Self::Media => "media",
            Self::Alta => "alta",
        }
    }
}

impl fmt::Display for VolatilityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall health of the metric under analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Excellent,
    Good,
    Watch,
    Critical,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Watch => "watch",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary statistics over the numeric series of one column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Number of values kept after coercion
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Coefficient of variation, std/mean (mean 0 treated as 1)
    pub cv: f64,
    pub min: f64,
    pub max: f64,
    /// OLS slope of value against sequential index 1..n
    pub trend_slope: f64,
    /// Deviation of the last observation from the series mean, in percent.
    /// Not period-over-period growth despite the name.
    pub growth_pct: f64,
}

/// One projected step beyond the observed series
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    /// Absolute 1-based index, contiguous with the observed series
    pub index: usize,
    /// Observed last date + one calendar day per step when a date column
    /// exists and parses; otherwise the stringified index
    pub date: String,
    /// Last trailing moving average, held flat across the horizon
    pub y_hat_moving_average: f64,
    /// OLS trend line extrapolated at this index
    pub y_hat_trend: f64,
}

/// Forecast output: projected points plus a one-line reading of the series
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
    pub insight: String,
}

/// Recommended actions bucketed by time horizon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HorizonActions {
    /// 1-3 months
    #[serde(default)]
    pub short: Vec<String>,
    /// 3-6 months
    #[serde(default)]
    pub medium: Vec<String>,
    /// 6+ months
    #[serde(default)]
    pub long: Vec<String>,
}

impl HorizonActions {
    pub fn total(&self) -> usize {
        self.short.len() + self.medium.len() + self.long.len()
    }

    /// All actions across horizons, short → medium → long
    pub fn iter_all(&self) -> impl Iterator<Item = &String> {
        self.short
            .iter()
            .chain(self.medium.iter())
            .chain(self.long.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Canonical advisory shape shared by the rule-based advisor and the agent
/// pipeline; both producers normalize to this before the final merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    pub summary: String,
    pub tone: Option<String>,
    /// 0..100 when present
    pub risk: Option<f64>,
    pub horizon_actions: HorizonActions,
    pub risks: Vec<String>,
    pub narrative: String,
}

/// Quality warning codes raised by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    FewActions,
    NoNumbers,
    NarrativeShort,
    NoApiKey,
}

impl WarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FewActions => "FEW_ACTIONS",
            Self::NoNumbers => "NO_NUMBERS",
            Self::NarrativeShort => "NARRATIVE_SHORT",
            Self::NoApiKey => "NO_API_KEY",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A quality warning attached to the final report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub code: WarningCode,
    pub msg: String,
}

impl Warning {
    pub fn new(code: WarningCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
        }
    }
}

/// One stage attempt, including retried attempts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageLog {
    pub step: String,
    pub ok: bool,
    /// Wall-clock duration of the attempt in milliseconds
    pub ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Input to the analysis core
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub rows: Vec<Row>,
    /// Name of the numeric column to analyze
    pub target: String,
    /// Optional date column for time-aware forecasting
    pub date_col: Option<String>,
    #[serde(default)]
    pub domain: Domain,
}

/// Canonical advisory report returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryReport {
    pub summary: String,
    pub tone: Option<String>,
    pub risk: Option<f64>,
    pub horizon_actions: HorizonActions,
    pub risks: Vec<String>,
    pub narrative: String,
    pub warnings: Vec<Warning>,
    pub acceptable: bool,
    pub retry_applied: bool,
    pub logs: Vec<StageLog>,
}
