//! Stage prompts
//!
//! Each builder returns `(system, user)` for one completion call. Prompts
//! are assembled from the threaded pipeline context; the corrective retry
//! hint, when present, is appended to the prompts of the stages it can
//! influence (action planning always, narrative when the report was short).

use crate::models::{TrendLabel, VolatilityLabel, WarningCode};

use super::PipelineContext;

pub fn data_quality(ctx: &PipelineContext) -> (String, String) {
    let system =
        "Sei un Data Quality Analyst. Rispondi in una sola frase, pratica e sintetica.".to_string();
    let user = format!(
        "Analizza questi dati:\n\n\
         Target: {}\n\
         Righe: {}\n\
         Media: {:.2}\n\
         Range: {:.2} - {:.2}\n\
         Std Dev: {:.2}\n\
         CV: {:.3}\n\n\
         Fornisci UNA singola raccomandazione pratica sulla qualità dei dati (massimo 100 caratteri).\n\
         Esempi: \"Dati solidi, campione sufficiente\" / \"Pochi dati, aumentare campione 3x\" / \"Alta varianza, segmentare per cluster\"",
        ctx.target, ctx.kpi.count, ctx.kpi.mean, ctx.kpi.min, ctx.kpi.max, ctx.kpi.std, ctx.kpi.cv
    );
    (system, user)
}

pub fn action_planning(ctx: &PipelineContext) -> (String, String) {
    let system = format!(
        "Sei un {} Strategist senior. Proponi azioni concrete e misurabili.",
        ctx.domain.as_str().to_uppercase()
    );

    let trend = TrendLabel::from_slope(ctx.kpi.trend_slope);
    let volatility = VolatilityLabel::from_cv(ctx.kpi.cv);
    let sample: Vec<_> = ctx.rows.iter().take(60).collect();
    let sample_json = serde_json::to_string(&sample).unwrap_or_default();
    let mut user = format!(
        "{}\n\n\
         Metrica: {}\n\
         Colonna data: {}\n\
         Trend: {} (pendenza ~ {:.4})\n\
         Volatilità: {} (CV={:.3})\n\
         Scostamento ultimo vs media: {:.2}%\n\
         Dati (anteprima): {}\n\n\
         Genera esattamente 12 azioni strategiche CONCRETE con numeri specifici:\n\
         - 4 azioni BREVE termine (1-3 mesi), quick win con KPI target\n\
         - 4 azioni MEDIO termine (3-6 mesi), ottimizzazioni strutturali\n\
         - 4 azioni LUNGO termine (6+ mesi), trasformazione strategica\n\n\
         Formato richiesto:\n\
         BREVE:\n\
         - azione con numeri e KPI\n\
         MEDIO:\n\
         - azione con numeri e KPI\n\
         LUNGO:\n\
         - azione con numeri e KPI\n\n\
         OBBLIGATORIO: ogni azione deve contenere numeri, percentuali o KPI specifici.",
        ctx.domain.brief(),
        ctx.target,
        ctx.date_col.as_deref().unwrap_or("nessuna"),
        trend,
        ctx.kpi.trend_slope,
        volatility,
        ctx.kpi.cv,
        ctx.kpi.growth_pct,
        sample_json
    );

    if let Some(hint) = &ctx.retry_hint {
        user.push_str(&format!(
            "\n\n*** CORREZIONI OBBLIGATORIE ***\n{}",
            hint.text
        ));
    }

    (system, user)
}

pub fn risk_assessment(ctx: &PipelineContext) -> (String, String) {
    let system =
        "Sei un Risk Management Analyst. Rispondi solo con l'elenco richiesto.".to_string();
    let user = format!(
        "Metrica: {}\n\
         Volatilità: {} (CV={:.3})\n\
         Trend: {} (pendenza ~ {:.4})\n\n\
         Identifica esattamente 3 RISCHI CRITICI con probabilità e impatto.\n\n\
         Formato richiesto:\n\
         - [ALTO 70%] Stagionalità Q4: impatto -25% vendite, mitigazione: diversifica canali retail+B2B\n\n\
         Ogni rischio deve avere probabilità in percentuale, impatto quantificato e una mitigazione specifica.",
        ctx.target,
        VolatilityLabel::from_cv(ctx.kpi.cv),
        ctx.kpi.cv,
        TrendLabel::from_slope(ctx.kpi.trend_slope),
        ctx.kpi.trend_slope
    );
    (system, user)
}

pub fn narrative(ctx: &PipelineContext, min_lines: usize) -> (String, String) {
    let system =
        "Sei un Business Consultant senior. Rispondi con testo piano, senza markdown.".to_string();

    let actions_text = numbered(ctx.actions.iter_all());
    let risks_text = numbered(ctx.risks.iter());

    let mut user = format!(
        "Scrivi un REPORT ESECUTIVO DETTAGLIATO di MINIMO {} RIGHE per il dominio {}.\n\n\
         CONTESTO ANALISI:\n\
         - Metrica: {}\n\
         - Trend: {} (scostamento ultimo vs media {:.2}%)\n\
         - Volatilità: {} (CV={:.3})\n\
         - Qualità dati: {}\n\n\
         AZIONI STRATEGICHE IDENTIFICATE:\n{}\n\n\
         RISCHI PRINCIPALI:\n{}\n\n\
         Struttura: executive summary, analisi approfondita, roadmap di implementazione con milestone trimestrali, next step operativi.\n\
         Ogni paragrafo deve contenere numeri specifici (percentuali, euro, KPI target).\n\
         Inizia subito con il report, senza premesse.",
        min_lines,
        ctx.domain,
        ctx.target,
        TrendLabel::from_slope(ctx.kpi.trend_slope),
        ctx.kpi.growth_pct,
        VolatilityLabel::from_cv(ctx.kpi.cv),
        ctx.kpi.cv,
        ctx.quality.as_deref().unwrap_or("Buona"),
        actions_text,
        risks_text
    );

    if let Some(hint) = &ctx.retry_hint {
        if hint.includes(WarningCode::NarrativeShort) {
            user.push_str(&format!(
                "\n\n*** OBBLIGO ***: estendi oltre {} righe, aggiungi esempi numerici e milestone temporalizzate.",
                min_lines
            ));
        }
    }

    (system, user)
}

fn numbered<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let list: Vec<String> = items
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect();
    if list.is_empty() {
        "(nessuna)".to_string()
    } else {
        list.join("\n")
    }
}
