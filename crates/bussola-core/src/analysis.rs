//! Analysis entry points
//!
//! `run_analysis` wires the whole advisory flow together: statistics →
//! {forecast, rule-based advisory} → agent pipeline (+ quality gate and
//! guided retry) → normalization → merge. `quick_advice` is the lighter
//! single-shot path: one completion call prompted for the canonical JSON
//! schema, normalized from whatever comes back.

use tracing::info;

use crate::advisor::{advise, AdvisorOptions, RuleAdvisory};
use crate::ai::{AiClient, CompletionBackend, CompletionOptions};
use crate::error::Result;
use crate::forecast::{forecast, ForecastOptions};
use crate::models::{Advisory, AdvisoryReport, AnalysisRequest, Forecast};
use crate::normalize::{merge, normalize_text};
use crate::pipeline::{AdvisoryPipeline, PipelineContext};
use crate::stats::summarize;

/// Full outcome of one analysis run: the canonical report plus the
/// baseline pieces kept for display and export.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: AdvisoryReport,
    /// The deterministic advisory, always available
    pub baseline: RuleAdvisory,
    pub forecast: Forecast,
}

/// Run the full analysis-and-advisory flow for one request.
///
/// The backend is injected: `None` means no credential is configured, the
/// agent pipeline short-circuits with a `NO_API_KEY` warning and the
/// report degrades to the rule-based advisory.
pub async fn run_analysis(ai: Option<&AiClient>, request: &AnalysisRequest) -> AnalysisOutcome {
    let stats = summarize(&request.rows, &request.target);
    info!(
        target = %request.target,
        domain = %request.domain,
        rows = request.rows.len(),
        series = stats.count,
        "Starting analysis"
    );

    let fc = forecast(
        &request.rows,
        &ForecastOptions::new(&request.target).with_date_col(request.date_col.as_deref()),
    );
    let baseline = advise(
        &request.rows,
        &AdvisorOptions {
            target: &request.target,
            date_col: request.date_col.as_deref(),
        },
    );

    let mut ctx = PipelineContext::new(request, stats);
    AdvisoryPipeline::new().run(ai, &mut ctx).await;

    let agent = ctx.to_advisory();
    let unified = merge(&baseline.to_advisory(), &agent);

    let report = AdvisoryReport {
        summary: unified.summary,
        tone: unified.tone,
        risk: unified.risk,
        horizon_actions: unified.horizon_actions,
        risks: unified.risks,
        narrative: unified.narrative,
        warnings: ctx.warnings.clone(),
        acceptable: ctx.acceptable,
        retry_applied: ctx.retry_applied,
        logs: ctx.logs.clone(),
    };

    AnalysisOutcome {
        report,
        baseline,
        forecast: fc,
    }
}

/// Single-shot advisory: one completion call prompted for the canonical
/// JSON schema over a preview of the rows, normalized from whatever text
/// the backend returns. Transport failures propagate to the caller.
pub async fn quick_advice(ai: &AiClient, request: &AnalysisRequest) -> Result<Advisory> {
    let sample: Vec<_> = request.rows.iter().take(50).collect();
    let preview = serde_json::to_string_pretty(&serde_json::json!({
        "target": request.target,
        "dateCol": request.date_col,
        "sample": sample,
    }))?;

    let system = "Sei un consulente analitico molto pragmatico. Genera un'analisi concisa e piani d'azione a orizzonte breve/medio/lungo.\n\
        Rispondi in JSON puro con questo schema:\n\
        {\n\
          \"summary\": \"testo\",\n\
          \"tone\": \"positivo|neutro|negativo\",\n\
          \"risk\": 0-100,\n\
          \"horizonActions\": {\n\
            \"short\": [\"azione 1\", \"azione 2\"],\n\
            \"medium\": [\"azione 1\", \"azione 2\"],\n\
            \"long\": [\"azione 1\", \"azione 2\"]\n\
          },\n\
          \"risks\": [\"rischio 1\"]\n\
        }";
    let user = format!(
        "Dati (anteprima):\n{}\n\nObiettivo: {} su metrica \"{}\"",
        preview, request.domain, request.target
    );

    let text = ai
        .complete(system, &user, &CompletionOptions::new(0.3))
        .await?;
    Ok(normalize_text(&text))
}
