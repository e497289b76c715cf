//! Human-readable formatting of engine results.

use openrate_core::{
    FactorScores, OpenRatePrediction, PredictionOutcome, ScoredVariant, SendTime, Tone,
};
use serde::Serialize;

/// `0.3831` → `"38.3%"`.
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// `"38.3% (30.8% - 45.8%)"`
pub fn format_rate(p: &OpenRatePrediction) -> String {
    format!(
        "{} ({} - {})",
        format_percent(p.prediction),
        format_percent(p.confidence_interval.lower),
        format_percent(p.confidence_interval.upper)
    )
}

pub fn format_factors(f: &FactorScores) -> String {
    format!(
        "time={:.3} day={:.3} subject={:.3} segment={:.3} device={:.3}",
        f.time_impact, f.day_impact, f.subject_line_score, f.segment_score, f.device_mix_impact
    )
}

pub fn prediction_report(subject: &str, send_time: SendTime, outcome: &PredictionOutcome) -> String {
    let p = outcome.prediction();
    let mut lines = vec![format!("subject:     {subject}")];
    if outcome.is_baseline() {
        lines.push("path:        baseline (empty subject)".to_string());
    } else {
        lines.push(format!(
            "send time:   {send_time} ({}, {:02}h)",
            send_time.weekday(),
            send_time.hour()
        ));
        lines.push("path:        computed".to_string());
    }
    lines.push(format!("open rate:   {}", format_rate(p)));
    lines.push(format!("factors:     {}", format_factors(&p.factors)));
    lines.join("\n")
}

pub fn variants_report(variants: &[ScoredVariant]) -> String {
    variants
        .iter()
        .map(|v| format!("{}\n    predicted open rate: {}", v.subject, format_rate(v.outcome.prediction())))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn tones_report() -> String {
    Tone::ALL
        .iter()
        .map(|tone| {
            format!(
                "{:<13} {:<30} [{}]",
                tone.name(),
                tone.description(),
                tone.modifiers().join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
