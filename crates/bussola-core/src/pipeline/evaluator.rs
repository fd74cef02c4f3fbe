//! Evaluator & Retry Controller
//!
//! Validates the pipeline output against quality predicates and, on
//! failure, builds the corrective instruction for the single guided retry.

use crate::models::{Warning, WarningCode};

use super::PipelineContext;

/// Quality gate thresholds
#[derive(Debug, Clone)]
pub struct Evaluator {
    /// Minimum total actions across the three horizons
    pub min_actions: usize,
    /// Minimum fraction of actions carrying a numeric token
    pub numeric_fraction: f64,
    /// Minimum non-empty narrative lines
    pub min_narrative_lines: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            min_actions: 9,
            numeric_fraction: 0.7,
            min_narrative_lines: 35,
        }
    }
}

/// Outcome of one evaluation pass
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub acceptable: bool,
    pub warnings: Vec<Warning>,
}

impl Evaluator {
    /// Check every predicate; all must pass for `acceptable = true`
    pub fn evaluate(&self, ctx: &PipelineContext) -> Evaluation {
        let mut warnings = Vec::new();

        let total = ctx.actions.total();
        if total < self.min_actions {
            warnings.push(Warning::new(
                WarningCode::FewActions,
                format!("Solo {} azioni trovate, target minimo 12", total),
            ));
        }

        let with_numbers = ctx
            .actions
            .iter_all()
            .filter(|action| has_numeric_token(action))
            .count();
        if (with_numbers as f64) < (total as f64) * self.numeric_fraction {
            warnings.push(Warning::new(
                WarningCode::NoNumbers,
                format!(
                    "Solo {}/{} azioni hanno numeri specifici",
                    with_numbers, total
                ),
            ));
        }

        let narrative_lines = ctx
            .narrative
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count();
        if narrative_lines < self.min_narrative_lines {
            warnings.push(Warning::new(
                WarningCode::NarrativeShort,
                format!(
                    "Report troppo breve: {} righe (minimo {})",
                    narrative_lines, self.min_narrative_lines
                ),
            ));
        }

        Evaluation {
            acceptable: warnings.is_empty(),
            warnings,
        }
    }
}

/// Corrective instruction injected into stage prompts on the retry pass
#[derive(Debug, Clone)]
pub struct RetryHint {
    pub reasons: Vec<WarningCode>,
    /// One corrective bullet per violated predicate
    pub text: String,
}

impl RetryHint {
    /// Build the guided instruction from the evaluation warnings
    pub fn from_warnings(warnings: &[Warning]) -> Self {
        let reasons: Vec<WarningCode> = warnings.iter().map(|w| w.code).collect();
        let bullets: Vec<&str> = reasons
            .iter()
            .filter_map(|code| match code {
                WarningCode::FewActions => {
                    Some("- Genera almeno 12 azioni totali: 4 per ciascun orizzonte breve/medio/lungo.")
                }
                WarningCode::NoNumbers => {
                    Some("- Inserisci numeri, percentuali o KPI specifici in ogni azione.")
                }
                WarningCode::NarrativeShort => {
                    Some("- Estendi il report oltre 35 righe con esempi numerici e milestone temporalizzate.")
                }
                // Not correctable by prompting
                WarningCode::NoApiKey => None,
            })
            .collect();

        Self {
            reasons,
            text: bullets.join("\n"),
        }
    }

    pub fn includes(&self, code: WarningCode) -> bool {
        self.reasons.contains(&code)
    }
}

/// A numeric token is a percentage or a number of at least two digits
pub fn has_numeric_token(text: &str) -> bool {
    let mut run = 0usize;
    for c in text.chars() {
        if c.is_ascii_digit() {
            run += 1;
            if run >= 2 {
                return true;
            }
        } else {
            if c == '%' && run >= 1 {
                return true;
            }
            run = 0;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisRequest, Domain, HorizonActions, Statistics};
    use crate::pipeline::PipelineContext;

    fn ctx_with(actions: HorizonActions, narrative: String) -> PipelineContext {
        let request = AnalysisRequest {
            rows: vec![],
            target: "vendite".to_string(),
            date_col: None,
            domain: Domain::Business,
        };
        let mut ctx = PipelineContext::new(&request, Statistics::default());
        ctx.actions = actions;
        ctx.narrative = narrative;
        ctx
    }

    fn numeric_actions(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("Azione {} con target +{}% sul KPI principale", i, 10 + i))
            .collect()
    }

    fn narrative_of(lines: usize) -> String {
        (0..lines)
            .map(|i| format!("Riga {} del report con dettagli operativi.", i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_has_numeric_token() {
        assert!(has_numeric_token("riduci il CAC del 5%"));
        assert!(has_numeric_token("target 42 lead a settimana"));
        assert!(!has_numeric_token("una azione senza niente"));
        // a single digit with no percent is not enough
        assert!(!has_numeric_token("fase 1 del piano"));
    }

    #[test]
    fn test_eight_actions_long_narrative_flags_few_actions_only() {
        let actions = HorizonActions {
            short: numeric_actions(3),
            medium: numeric_actions(3),
            long: numeric_actions(2),
        };
        let ctx = ctx_with(actions, narrative_of(40));

        let eval = Evaluator::default().evaluate(&ctx);
        assert!(!eval.acceptable);
        let codes: Vec<WarningCode> = eval.warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![WarningCode::FewActions]);
    }

    #[test]
    fn test_short_narrative_flags_narrative_only() {
        let actions = HorizonActions {
            short: numeric_actions(3),
            medium: numeric_actions(3),
            long: numeric_actions(3),
        };
        let ctx = ctx_with(actions, narrative_of(20));

        let eval = Evaluator::default().evaluate(&ctx);
        assert!(!eval.acceptable);
        let codes: Vec<WarningCode> = eval.warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![WarningCode::NarrativeShort]);
    }

    #[test]
    fn test_numberless_actions_flag_no_numbers() {
        let plain: Vec<String> = (0..9)
            .map(|i| format!("azione generica numero indefinito variante {}", letter(i)))
            .collect();
        let actions = HorizonActions {
            short: plain.clone(),
            medium: vec![],
            long: vec![],
        };
        let ctx = ctx_with(actions, narrative_of(40));

        let eval = Evaluator::default().evaluate(&ctx);
        let codes: Vec<WarningCode> = eval.warnings.iter().map(|w| w.code).collect();
        assert_eq!(codes, vec![WarningCode::NoNumbers]);
    }

    fn letter(i: usize) -> char {
        (b'a' + (i % 26) as u8) as char
    }

    #[test]
    fn test_all_predicates_pass() {
        let actions = HorizonActions {
            short: numeric_actions(4),
            medium: numeric_actions(4),
            long: numeric_actions(4),
        };
        let ctx = ctx_with(actions, narrative_of(35));

        let eval = Evaluator::default().evaluate(&ctx);
        assert!(eval.acceptable);
        assert!(eval.warnings.is_empty());
    }

    #[test]
    fn test_retry_hint_lists_only_violations() {
        let warnings = vec![
            Warning::new(WarningCode::FewActions, "poche"),
            Warning::new(WarningCode::NarrativeShort, "breve"),
        ];
        let hint = RetryHint::from_warnings(&warnings);
        assert!(hint.includes(WarningCode::FewActions));
        assert!(hint.includes(WarningCode::NarrativeShort));
        assert!(!hint.includes(WarningCode::NoNumbers));
        assert!(hint.text.contains("12 azioni"));
        assert!(hint.text.contains("35 righe"));
        assert!(!hint.text.contains("percentuali o KPI specifici in ogni azione"));
    }
}
