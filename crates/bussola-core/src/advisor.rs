//! Rule-Based Advisor
//!
//! Deterministic consulting heuristics over the computed statistics and
//! forecast: trend/volatility classification, a health/risk score from a
//! fixed decision table, and templated action lists per horizon. Needs no
//! network and never fails, so it doubles as the degraded-mode substitute
//! when the agent pipeline is unavailable and as the baseline half of the
//! final merge.

use serde::{Deserialize, Serialize};

use crate::forecast::{forecast, ForecastOptions};
use crate::models::{
    Advisory, ForecastPoint, Health, HorizonActions, Row, TrendLabel, VolatilityLabel,
};
use crate::stats::summarize;

/// Options for one advisor run
#[derive(Debug, Clone)]
pub struct AdvisorOptions<'a> {
    pub target: &'a str,
    pub date_col: Option<&'a str>,
}

/// Trend classification with the underlying numbers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSummary {
    pub slope: f64,
    pub label: TrendLabel,
    /// Deviation of the last observation from the mean, in percent
    pub growth_pct: f64,
}

/// Volatility classification with the underlying coefficient of variation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatilitySummary {
    pub cv: f64,
    pub label: VolatilityLabel,
}

/// Full output of the rule-based advisor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAdvisory {
    pub summary: String,
    pub trend: TrendSummary,
    pub volatility: VolatilitySummary,
    pub health: Health,
    /// 0..100, higher is worse
    pub risk: u8,
    pub horizon_actions: HorizonActions,
    pub forecast_insight: String,
    /// First projected points, for display alongside the advisory
    pub forecast_sample: Vec<ForecastPoint>,
}

impl RuleAdvisory {
    /// Convert to the canonical advisory shape used by the merge
    pub fn to_advisory(&self) -> Advisory {
        Advisory {
            summary: self.summary.clone(),
            tone: Some(self.health.as_str().to_string()),
            risk: Some(self.risk as f64),
            horizon_actions: self.horizon_actions.clone(),
            risks: Vec::new(),
            narrative: String::new(),
        }
    }
}

/// Run the rule-based analysis for `opts.target` over `rows`.
///
/// Pure and total: degenerate input (no rows, no parseable values) yields
/// a conservative default advisory instead of an error.
pub fn advise(rows: &[Row], opts: &AdvisorOptions<'_>) -> RuleAdvisory {
    let stats = summarize(rows, opts.target);
    if stats.count == 0 {
        return insufficient_data();
    }

    let fc = forecast(
        rows,
        &ForecastOptions::new(opts.target).with_date_col(opts.date_col),
    );

    let slope = stats.trend_slope;
    let trend_label = TrendLabel::from_slope(slope);
    let cv = stats.cv;
    let growth_pct = stats.growth_pct;

    let (health, risk) = score(trend_label, cv, growth_pct);
    let horizon_actions = suggest_actions(trend_label, cv, growth_pct);
    let summary = build_summary(trend_label, slope, cv, growth_pct, health, risk);

    let forecast_sample: Vec<ForecastPoint> = fc.points.iter().take(6).cloned().collect();

    RuleAdvisory {
        summary,
        trend: TrendSummary {
            slope,
            label: trend_label,
            growth_pct,
        },
        volatility: VolatilitySummary {
            cv,
            label: VolatilityLabel::from_cv(cv),
        },
        health,
        risk,
        horizon_actions,
        forecast_insight: fc.insight,
        forecast_sample,
    }
}

fn insufficient_data() -> RuleAdvisory {
    RuleAdvisory {
        summary: "Dati insufficienti per un'analisi affidabile.".to_string(),
        trend: TrendSummary {
            slope: 0.0,
            label: TrendLabel::Piatto,
            growth_pct: 0.0,
        },
        volatility: VolatilitySummary {
            cv: 0.0,
            label: VolatilityLabel::Bassa,
        },
        health: Health::Watch,
        risk: 50,
        horizon_actions: HorizonActions::default(),
        forecast_insight: String::new(),
        forecast_sample: Vec::new(),
    }
}

/// Fixed decision table over (trend, cv, growth)
fn score(trend: TrendLabel, cv: f64, growth_pct: f64) -> (Health, u8) {
    match trend {
        TrendLabel::Crescente if cv < 0.15 && growth_pct > 3.0 => (Health::Excellent, 20),
        TrendLabel::Crescente if cv <= 0.30 => (Health::Good, 35),
        TrendLabel::Piatto if cv <= 0.25 => (Health::Watch, 55),
        TrendLabel::Decrescente if cv > 0.20 => (Health::Critical, 75),
        _ => (Health::Watch, 60),
    }
}

fn suggest_actions(trend: TrendLabel, cv: f64, growth_pct: f64) -> HorizonActions {
    let mut actions = HorizonActions::default();

    match trend {
        TrendLabel::Crescente => {
            actions.short.push(
                "Aumenta leggermente la spesa sul canale top performer (A/B test 10-20%)."
                    .to_string(),
            );
            actions
                .short
                .push("Proteggi margine: rivedi sconti/promo con soglia minima.".to_string());
            actions.medium.push(
                "Amplia la capacità (stock/servizio) per evitare colli di bottiglia.".to_string(),
            );
            actions.medium.push(
                "Espandi 1 nuovo canale con ROI atteso > 1.5x rispetto attuale.".to_string(),
            );
            actions
                .long
                .push("Diversifica l'offerta: nuova linea/prodotto complementare.".to_string());
        }
        TrendLabel::Piatto => {
            actions.short.push(
                "Micro-ottimizzazioni CRO (landing, checkout) per +2-5% conversione.".to_string(),
            );
            actions
                .short
                .push("Ribilancia il budget verso campagne con CPA più basso.".to_string());
            actions.medium.push(
                "Sperimenta una promo \"back-in-motion\" per stimolare domanda.".to_string(),
            );
            actions
                .medium
                .push("Analizza segmenti poco penetrati e crea offerte mirate.".to_string());
            actions.long.push(
                "Ricerca di mercato per differenziazione di prodotto e pricing.".to_string(),
            );
        }
        TrendLabel::Decrescente => {
            actions
                .short
                .push("Stop/pausa delle campagne con ROI < 1.0; ridistribuisci budget.".to_string());
            actions.short.push(
                "Sonda cause: churn, prezzo, qualità lead, saturazione canale.".to_string(),
            );
            actions
                .medium
                .push("Piano di recupero: bundle, upsell, retention program.".to_string());
            actions
                .medium
                .push("Riposizionamento messaggi: enfatizza value proposition.".to_string());
            actions.long.push(
                "Ripensamento go-to-market: nuovi canali/partnership strategiche.".to_string(),
            );
            actions.long.push(
                "Roadmap prodotto: feature \"must-have\" secondo feedback clienti.".to_string(),
            );
        }
    }

    if cv >= 0.25 {
        actions.short.push(
            "Stabilizza la domanda: calendario promo meno \"a picchi\" e più continuo.".to_string(),
        );
        actions
            .medium
            .push("Riduci variabilità: forecast rolling e riordini più frequenti.".to_string());
        actions.long.push(
            "Automazioni data-driven per inventory e pianificazione (MRP leggero).".to_string(),
        );
    } else if cv < 0.10 && trend == TrendLabel::Crescente {
        actions.short.push(
            "Spingi sulla scalabilità: incremento graduale del 10-15% del budget best performer."
                .to_string(),
        );
    }

    if growth_pct > 8.0 && trend == TrendLabel::Crescente {
        actions.medium.push(
            "Fissa un target di crescita trimestrale e KPI settimanali di progresso.".to_string(),
        );
    } else if growth_pct < -3.0 {
        actions.short.push(
            "Allerta: stabilisci una review weekly per diagnosticare cause (prezzi, concorrenza, prodotto)."
                .to_string(),
        );
    }

    actions
}

/// Four sentences: trend, volatility, deviation-from-mean, health+risk
fn build_summary(
    trend: TrendLabel,
    slope: f64,
    cv: f64,
    growth_pct: f64,
    health: Health,
    risk: u8,
) -> String {
    format!(
        "Trend {} (pendenza ~ {:.4}). Volatilità {} (CV={:.3}). Scostamento ultimo vs media: {:.2}%. Stato complessivo: {} — rischio {}/100.",
        trend,
        slope,
        VolatilityLabel::from_cv(cv),
        cv,
        growth_pct,
        health.as_str().to_uppercase(),
        risk
    )
}
