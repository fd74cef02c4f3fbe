//! Mock backend for testing
//!
//! Provides well-formed canned responses for every pipeline stage, an
//! optional scripted response queue for per-call overrides, and a failing
//! mode for exercising transport-error paths. No LLM server required.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::{CompletionBackend, CompletionOptions};

/// Mock completion backend
///
/// By default every call returns a canned response matched to the stage
/// prompt (recognized by its distinctive phrasing). Scripted responses, when
/// present, are consumed first in FIFO order.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    /// When set, every completion call fails with a transport-style error
    fail_calls: bool,
    scripted: Arc<Mutex<VecDeque<String>>>,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            fail_calls: false,
            scripted: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Create a mock whose completion calls always fail
    pub fn failing() -> Self {
        Self {
            fail_calls: true,
            ..Self::new()
        }
    }

    /// Create a mock with a FIFO queue of scripted responses.
    ///
    /// Once the queue is drained, calls fall back to canned responses.
    pub fn scripted(responses: Vec<String>) -> Self {
        Self {
            healthy: true,
            fail_calls: false,
            scripted: Arc::new(Mutex::new(responses.into())),
        }
    }

    /// Create a new instance with a different model (no-op for mock)
    pub fn with_model(&self, _model: &str) -> Self {
        self.clone()
    }

    /// Pick a canned response by recognizing the stage prompt
    fn canned_response(user: &str) -> String {
        if user.contains("12 azioni") {
            canned_actions()
        } else if user.contains("RISCHI CRITICI") {
            canned_risks()
        } else if user.contains("REPORT") {
            canned_narrative(40)
        } else {
            "Dati solidi: campione sufficiente e varianza sotto controllo.".to_string()
        }
    }
}

/// 12 numeric-laden actions under the three labeled sections
pub fn canned_actions() -> String {
    "BREVE:\n\
     - Ottimizza il canale top performer: +15% CTR con A/B test su 3 varianti creative\n\
     - Riduci il CAC del 10% tagliando i 2 canali con ROI peggiore\n\
     - Introduci lead scoring: +25% conversion qualificando i lead sopra 70 punti\n\
     - Testa 5 audience lookalike mantenendo il CPL sotto 8 euro\n\
     MEDIO:\n\
     - Automation del funnel: velocity +30% con 4 sequence email mensili\n\
     - Chiudi 3 partnership di co-marketing: target 50000 contatti a trimestre\n\
     - Content hub SEO: 25 articoli pillar per 15000 visite organiche al mese\n\
     - CRM predittivo: churn -20% e upsell +35% entro 6 mesi\n\
     LUNGO:\n\
     - Personalizzazione AI: engagement +40% e ROAS 4.5x entro 12 mesi\n\
     - Espansione in 2 nuovi mercati: 500000 euro di ricavi nel primo anno\n\
     - Brand refresh: awareness +80% e NPS da 45 a 75\n\
     - Migrazione a stack custom: risparmio di 40000 euro l'anno di licenze"
        .to_string()
}

/// 6 actions only: enough to fail the minimum-count quality gate
pub fn canned_actions_short() -> String {
    "BREVE:\n\
     - Ottimizza il canale top performer: +15% CTR con A/B test su 3 varianti\n\
     - Riduci il CAC del 10% tagliando i 2 canali con ROI peggiore\n\
     MEDIO:\n\
     - Automation del funnel: velocity +30% con 4 sequence email mensili\n\
     - Chiudi 3 partnership di co-marketing: target 50000 contatti a trimestre\n\
     LUNGO:\n\
     - Personalizzazione AI: engagement +40% e ROAS 4.5x entro 12 mesi\n\
     - Espansione in 2 nuovi mercati: 500000 euro di ricavi nel primo anno"
        .to_string()
}

/// 3 risks tagged with probability band and impact
pub fn canned_risks() -> String {
    "- [ALTO 70%] Stagionalità Q4: impatto -25% sulle vendite, mitigazione: diversifica canali retail e B2B\n\
     - [MEDIO 45%] Pressione competitiva: rischio perdita 15% di quota, azione: differenziazione di prodotto\n\
     - [BASSO 20%] Dipendenza dal fornitore principale: rischio disruption, strategia: dual sourcing con 2 vendor"
        .to_string()
}

/// A discursive report with the requested number of non-empty lines
pub fn canned_narrative(lines: usize) -> String {
    (1..=lines)
        .map(|i| {
            format!(
                "Paragrafo {}: la metrica mostra un andamento coerente con gli obiettivi, con scostamenti nell'ordine del {}% rispetto al benchmark.",
                i,
                i % 20 + 1
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(
        &self,
        _system: &str,
        user: &str,
        _opts: &CompletionOptions,
    ) -> Result<String> {
        if self.fail_calls {
            return Err(Error::InvalidData("mock transport failure".into()));
        }
        if let Ok(mut queue) = self.scripted.lock() {
            if let Some(next) = queue.pop_front() {
                return Ok(next);
            }
        }
        Ok(Self::canned_response(user))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
