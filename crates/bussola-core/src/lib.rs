//! Bussola Core Library
//!
//! The analysis-and-advisory pipeline behind the Bussola dashboard:
//! - Statistics engine over a numeric column of uploaded rows
//! - Fixed-horizon forecasting (moving average + OLS trend)
//! - Deterministic rule-based advisor (always available, no network)
//! - LLM-backed agent pipeline with a quality gate and one guided retry
//! - Total normalization of model output into a canonical advisory shape
//! - Merge of the rule-based and agent advisories into one unified result
//!
//! File parsing, authentication, persistence backends, and the raw LLM
//! transport are external collaborators: this crate only defines their
//! boundaries and consumes them through injected interfaces.

pub mod advisor;
pub mod ai;
pub mod analysis;
pub mod error;
pub mod forecast;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod stats;
pub mod store;

pub use advisor::{advise, AdvisorOptions, RuleAdvisory, TrendSummary, VolatilitySummary};
pub use ai::{
    AiClient, CompletionBackend, CompletionOptions, MockBackend, OpenAiCompatibleBackend,
};
pub use analysis::{quick_advice, run_analysis, AnalysisOutcome};
pub use error::{Error, Result};
pub use forecast::{forecast, ForecastOptions};
pub use models::{
    Advisory, AdvisoryReport, AnalysisRequest, Domain, Forecast, ForecastPoint, Health,
    HorizonActions, Row, StageLog, Statistics, TrendLabel, VolatilityLabel, Warning, WarningCode,
};
pub use normalize::{extract_json, merge, normalize, normalize_text, to_array};
pub use pipeline::{AdvisoryPipeline, Evaluator, PipelineContext, RetryHint};
pub use stats::{moving_average, summarize};
pub use store::{AdvisoryStore, MemoryStore};
