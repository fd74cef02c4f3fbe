//! Agent Pipeline
//!
//! A fixed sequential state machine over four LLM-backed stages:
//! `dataQuality → actionPlanning → riskAssessment → narrativeWriting`.
//! Stages run strictly in order because later stages consume earlier
//! outputs; a failing stage is logged and skipped, never fatal. After the
//! pass the evaluator checks the quality predicates and triggers at most
//! one guided retry with a corrective instruction injected into the
//! prompts.
//!
//! Each request gets its own fresh [`PipelineContext`]; nothing is shared
//! across requests and no intermediate state outlives the request.

pub mod evaluator;
pub mod prompts;
pub mod stages;

pub use evaluator::{Evaluation, Evaluator, RetryHint};
pub use stages::{ActionPlanning, DataQuality, NarrativeWriting, RiskAssessment, StageId};

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::ai::AiClient;
use crate::error::Result;
use crate::models::{
    Advisory, AnalysisRequest, Domain, HorizonActions, Row, StageLog, Statistics, Warning,
    WarningCode,
};

/// Mutable accumulator threaded through the pipeline stages.
///
/// Created once per request, mutated in place by each stage, discarded
/// after the response is normalized.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub rows: Vec<Row>,
    pub target: String,
    pub date_col: Option<String>,
    pub domain: Domain,
    /// Statistics computed before the pipeline starts
    pub kpi: Statistics,
    /// Data-quality remark from the first stage
    pub quality: Option<String>,
    pub actions: HorizonActions,
    pub risks: Vec<String>,
    pub narrative: String,
    pub warnings: Vec<Warning>,
    pub acceptable: bool,
    /// Corrective instruction present only during the retry pass
    pub retry_hint: Option<RetryHint>,
    pub retry_applied: bool,
    /// Append-only: one entry per stage attempt, including retried attempts
    pub logs: Vec<StageLog>,
}

impl PipelineContext {
    pub fn new(request: &AnalysisRequest, kpi: Statistics) -> Self {
        Self {
            rows: request.rows.clone(),
            target: request.target.clone(),
            date_col: request.date_col.clone(),
            domain: request.domain,
            kpi,
            quality: None,
            actions: HorizonActions::default(),
            risks: Vec::new(),
            narrative: String::new(),
            warnings: Vec::new(),
            acceptable: false,
            retry_hint: None,
            retry_applied: false,
            logs: Vec::new(),
        }
    }

    /// Convert the threaded state into the canonical advisory shape.
    ///
    /// A run that produced nothing (short-circuit, every stage failed)
    /// yields an empty advisory so the merge falls back to the rule-based
    /// baseline.
    pub fn to_advisory(&self) -> Advisory {
        let produced = self.quality.is_some()
            || !self.actions.is_empty()
            || !self.risks.is_empty()
            || !self.narrative.is_empty();
        if !produced {
            return Advisory::default();
        }
        Advisory {
            summary: format!(
                "Analisi {} su {}: {}",
                self.domain,
                self.target,
                self.quality.as_deref().unwrap_or("completata")
            ),
            tone: None,
            risk: None,
            horizon_actions: self.actions.clone(),
            risks: self.risks.clone(),
            narrative: self.narrative.clone(),
        }
    }
}

/// One LLM-backed unit of the pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    /// Identity used as the `step` name in logs
    fn id(&self) -> StageId;

    /// Build the prompt from `ctx`, call the backend, parse into `ctx`
    async fn run(&self, ai: &AiClient, ctx: &mut PipelineContext) -> Result<()>;
}

/// The fixed stage sequence plus the quality gate
pub struct AdvisoryPipeline {
    stages: Vec<Box<dyn Stage>>,
    evaluator: Evaluator,
}

impl Default for AdvisoryPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvisoryPipeline {
    /// Create the pipeline with the built-in stage sequence
    pub fn new() -> Self {
        Self::with_evaluator(Evaluator::default())
    }

    /// Create with custom quality thresholds
    pub fn with_evaluator(evaluator: Evaluator) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(DataQuality),
            Box::new(ActionPlanning),
            Box::new(RiskAssessment),
            Box::new(NarrativeWriting::new(evaluator.min_narrative_lines)),
        ];
        Self { stages, evaluator }
    }

    /// Run the pipeline, evaluate, and retry at most once.
    ///
    /// Without a configured backend the whole run short-circuits: a single
    /// `NO_API_KEY` warning, `acceptable = false`, one `init` log entry.
    /// The rule-based advisor stays available for the degraded path.
    pub async fn run(&self, ai: Option<&AiClient>, ctx: &mut PipelineContext) {
        let Some(ai) = ai else {
            ctx.logs.push(StageLog {
                step: "init".to_string(),
                ok: false,
                ms: 0,
                error: Some("Missing API credential".to_string()),
            });
            ctx.warnings = vec![Warning::new(
                WarningCode::NoApiKey,
                "Backend AI non configurato: imposta OPENAI_API_KEY.",
            )];
            ctx.acceptable = false;
            return;
        };

        self.run_stages(ai, ctx).await;

        let evaluation = self.evaluator.evaluate(ctx);
        ctx.warnings = evaluation.warnings;
        ctx.acceptable = evaluation.acceptable;
        if ctx.acceptable {
            return;
        }

        // One guided retry: corrective bullets for the violated predicates
        // are injected into the stage prompts, then the whole sequence runs
        // again. Never more than one retry per request.
        let hint = RetryHint::from_warnings(&ctx.warnings);
        info!(reasons = ?hint.reasons, "Pipeline output below quality bar, retrying once");
        ctx.retry_hint = Some(hint);
        ctx.retry_applied = true;

        self.run_stages(ai, ctx).await;

        let evaluation = self.evaluator.evaluate(ctx);
        ctx.warnings = evaluation.warnings;
        ctx.acceptable = evaluation.acceptable;
    }

    /// One pass over the stage sequence. A stage failure is recorded in the
    /// logs and the next stage runs with whatever partial context exists.
    async fn run_stages(&self, ai: &AiClient, ctx: &mut PipelineContext) {
        for stage in &self.stages {
            let step = stage.id();
            let start = Instant::now();
            match stage.run(ai, ctx).await {
                Ok(()) => {
                    let ms = start.elapsed().as_millis() as u64;
                    debug!(step = step.as_str(), ms, "Stage complete");
                    ctx.logs.push(StageLog {
                        step: step.as_str().to_string(),
                        ok: true,
                        ms,
                        error: None,
                    });
                }
                Err(e) => {
                    let ms = start.elapsed().as_millis() as u64;
                    warn!(step = step.as_str(), ms, error = %e, "Stage failed");
                    ctx.logs.push(StageLog {
                        step: step.as_str().to_string(),
                        ok: false,
                        ms,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
    }
}
