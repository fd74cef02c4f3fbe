//! Pipeline stages
//!
//! The four LLM-backed units of the agent pipeline. Each stage builds its
//! prompt from the threaded context, makes one completion call, and parses
//! the response into the context. Parse and transport problems surface as
//! errors to the runner, which records them and moves on.

use std::fmt;

use async_trait::async_trait;
use regex::Regex;

use crate::ai::{AiClient, CompletionBackend, CompletionOptions};
use crate::error::{Error, Result};
use crate::models::HorizonActions;
use crate::normalize::strip_bullet;

use super::{prompts, PipelineContext, Stage};

/// Identity of a pipeline stage, used as the `step` name in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageId {
    DataQuality,
    ActionPlanning,
    RiskAssessment,
    NarrativeWriting,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataQuality => "dataQuality",
            Self::ActionPlanning => "actionPlanning",
            Self::RiskAssessment => "riskAssessment",
            Self::NarrativeWriting => "narrativeWriting",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One short remark on data quality from the computed statistics
pub struct DataQuality;

#[async_trait]
impl Stage for DataQuality {
    fn id(&self) -> StageId {
        StageId::DataQuality
    }

    async fn run(&self, ai: &AiClient, ctx: &mut PipelineContext) -> Result<()> {
        let (system, user) = prompts::data_quality(ctx);
        let opts = CompletionOptions::new(0.3).with_max_tokens(150);
        let text = ai.complete(&system, &user, &opts).await?;

        let remark = text.trim();
        if remark.is_empty() {
            return Err(Error::InvalidData("risposta vuota dal backend".into()));
        }
        ctx.quality = Some(remark.to_string());
        Ok(())
    }
}

/// 4+4+4 strategic actions under the BREVE/MEDIO/LUNGO sections
pub struct ActionPlanning;

#[async_trait]
impl Stage for ActionPlanning {
    fn id(&self) -> StageId {
        StageId::ActionPlanning
    }

    async fn run(&self, ai: &AiClient, ctx: &mut PipelineContext) -> Result<()> {
        let (system, user) = prompts::action_planning(ctx);
        let opts = CompletionOptions::new(0.7).with_max_tokens(1500);
        let text = ai.complete(&system, &user, &opts).await?;

        let actions = parse_actions(&text);
        if actions.is_empty() {
            return Err(Error::InvalidData(
                "nessuna azione riconosciuta nella risposta".into(),
            ));
        }
        ctx.actions = actions;
        Ok(())
    }
}

/// Exactly 3 risks tagged with probability band and impact
pub struct RiskAssessment;

#[async_trait]
impl Stage for RiskAssessment {
    fn id(&self) -> StageId {
        StageId::RiskAssessment
    }

    async fn run(&self, ai: &AiClient, ctx: &mut PipelineContext) -> Result<()> {
        let (system, user) = prompts::risk_assessment(ctx);
        let opts = CompletionOptions::new(0.5).with_max_tokens(400);
        let text = ai.complete(&system, &user, &opts).await?;

        let risks = parse_risks(&text);
        if risks.is_empty() {
            return Err(Error::InvalidData(
                "nessun rischio riconosciuto nella risposta".into(),
            ));
        }
        ctx.risks = risks;
        Ok(())
    }
}

/// Long-form discursive report over the accumulated context
pub struct NarrativeWriting {
    /// Minimum line-count target passed to the prompt
    pub min_lines: usize,
}

impl NarrativeWriting {
    pub fn new(min_lines: usize) -> Self {
        Self { min_lines }
    }
}

#[async_trait]
impl Stage for NarrativeWriting {
    fn id(&self) -> StageId {
        StageId::NarrativeWriting
    }

    async fn run(&self, ai: &AiClient, ctx: &mut PipelineContext) -> Result<()> {
        let (system, user) = prompts::narrative(ctx, self.min_lines);
        let opts = CompletionOptions::new(0.7).with_max_tokens(3000);
        let text = ai.complete(&system, &user, &opts).await?;

        let narrative = text.trim();
        if narrative.is_empty() {
            return Err(Error::InvalidData("report vuoto dal backend".into()));
        }
        ctx.narrative = narrative.to_string();
        Ok(())
    }
}

/// Parse the three labeled sections out of the planning response
pub fn parse_actions(text: &str) -> HorizonActions {
    HorizonActions {
        short: section_lines(text, "BREVE", 4),
        medium: section_lines(text, "MEDIO", 4),
        long: section_lines(text, "LUNGO", 4),
    }
}

/// Bullet lines of one labeled section: markers stripped, lines without a
/// digit or shorter than 20 characters dropped, at most `max` kept.
fn section_lines(text: &str, label: &str, max: usize) -> Vec<String> {
    let label_re = Regex::new(r"(?i)\b(BREVE|MEDIO|LUNGO)\b").expect("valid regex");
    let matches: Vec<(usize, usize, String)> = label_re
        .find_iter(text)
        .map(|m| (m.start(), m.end(), m.as_str().to_uppercase()))
        .collect();

    let Some(body_start) = matches
        .iter()
        .find(|(_, _, found)| found == label)
        .map(|&(_, end, _)| end)
    else {
        return Vec::new();
    };
    let body_end = matches
        .iter()
        .map(|&(start, _, _)| start)
        .find(|&start| start > body_start)
        .unwrap_or(text.len());

    text[body_start..body_end]
        .lines()
        .map(|line| strip_bullet(line.trim_start_matches(':')))
        .filter(|line| line.chars().count() > 20 && has_digit(line))
        .take(max)
        .collect()
}

/// Parse risk statements: one per line, at least 30 characters, numeric
pub fn parse_risks(text: &str) -> Vec<String> {
    text.lines()
        .map(strip_bullet)
        .filter(|line| line.chars().count() >= 30 && has_digit(line))
        .take(3)
        .collect()
}

fn has_digit(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::{canned_actions, canned_risks};

    #[test]
    fn test_parse_actions_three_sections() {
        let actions = parse_actions(&canned_actions());
        assert_eq!(actions.short.len(), 4);
        assert_eq!(actions.medium.len(), 4);
        assert_eq!(actions.long.len(), 4);
        assert!(actions.short[0].starts_with("Ottimizza il canale"));
        assert!(actions.long[3].contains("40000 euro"));
    }

    #[test]
    fn test_parse_actions_discards_numberless_lines() {
        let text = "BREVE:\n\
                    - Azione vaga senza alcun valore misurabile concreto\n\
                    - Aumenta il budget del 15% sul canale migliore in 30 giorni\n\
                    MEDIO:\n\
                    LUNGO:\n";
        let actions = parse_actions(text);
        assert_eq!(actions.short.len(), 1);
        assert!(actions.short[0].contains("15%"));
        assert!(actions.medium.is_empty());
        assert!(actions.long.is_empty());
    }

    #[test]
    fn test_parse_actions_caps_at_four_per_section() {
        let lines: Vec<String> = (0..7)
            .map(|i| format!("- Azione numero {} con incremento atteso del {}%", i, 10 + i))
            .collect();
        let text = format!("BREVE:\n{}", lines.join("\n"));
        let actions = parse_actions(&text);
        assert_eq!(actions.short.len(), 4);
    }

    #[test]
    fn test_parse_actions_missing_sections_is_empty() {
        assert!(parse_actions("testo senza alcuna sezione").is_empty());
    }

    #[test]
    fn test_parse_risks_filters_and_caps() {
        let risks = parse_risks(&canned_risks());
        assert_eq!(risks.len(), 3);
        assert!(risks[0].starts_with("[ALTO 70%]"));

        let noisy = "- [ALTO 50%] Rischio principale con impatto stimato del 20% sul fatturato\n\
                     - corto 1%\n\
                     - Nessun numero in questa riga di testo abbastanza lunga comunque\n";
        let parsed = parse_risks(noisy);
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_stage_ids() {
        assert_eq!(StageId::DataQuality.as_str(), "dataQuality");
        assert_eq!(StageId::NarrativeWriting.to_string(), "narrativeWriting");
    }
}
