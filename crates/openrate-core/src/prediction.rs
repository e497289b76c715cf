//! Prediction aggregator.
//!
//! Composes the baseline rate, an optional historical rate and every scorer
//! multiplier into one probability, perturbs it with bounded jitter, and
//! wraps it in a 95% confidence interval. Scoring never fails: an empty
//! subject short-circuits to the baseline answer.

use serde::{Deserialize, Serialize};

use crate::constants::{
    BASELINE_INTERVAL_SPREAD, DEFAULT_DESKTOP_SHARE, DEFAULT_MOBILE_SHARE, DEFAULT_TABLET_SHARE,
    round_probability,
};
use crate::features::{
    day_of_week_multiplier_with, subject_line_multiplier_with, time_of_day_multiplier_with,
};
use crate::jitter::JitterSource;
use crate::tables::{DeviceWeights, ScoringTables};
use crate::time::{Clock, SendTime};

/// Audience split across device classes. Taken verbatim: not normalized,
/// not validated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceMix {
    pub mobile: f64,
    pub desktop: f64,
    pub tablet: f64,
}

impl DeviceMix {
    pub fn new(mobile: f64, desktop: f64, tablet: f64) -> Self {
        Self {
            mobile,
            desktop,
            tablet,
        }
    }

    /// Weighted sum of device engagement.
    pub fn impact(&self, weights: &DeviceWeights) -> f64 {
        self.mobile * weights.mobile + self.desktop * weights.desktop + self.tablet * weights.tablet
    }
}

impl Default for DeviceMix {
    fn default() -> Self {
        Self {
            mobile: DEFAULT_MOBILE_SHARE,
            desktop: DEFAULT_DESKTOP_SHARE,
            tablet: DEFAULT_TABLET_SHARE,
        }
    }
}

/// Everything known about a message before it is sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionFactors {
    pub subject: String,
    /// `None` means "now" according to the injected clock.
    #[serde(default)]
    pub send_time: Option<SendTime>,
    #[serde(default)]
    pub historical_open_rate: Option<f64>,
    #[serde(default = "default_segment_engagement")]
    pub segment_engagement: f64,
    #[serde(default)]
    pub device_mix: DeviceMix,
}

fn default_segment_engagement() -> f64 {
    1.0
}

impl PredictionFactors {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            send_time: None,
            historical_open_rate: None,
            segment_engagement: default_segment_engagement(),
            device_mix: DeviceMix::default(),
        }
    }

    pub fn with_send_time(mut self, send_time: SendTime) -> Self {
        self.send_time = Some(send_time);
        self
    }

    pub fn with_historical_open_rate(mut self, rate: f64) -> Self {
        self.historical_open_rate = Some(rate);
        self
    }

    pub fn with_segment_engagement(mut self, engagement: f64) -> Self {
        self.segment_engagement = engagement;
        self
    }

    pub fn with_device_mix(mut self, device_mix: DeviceMix) -> Self {
        self.device_mix = device_mix;
        self
    }
}

/// Per-signal multipliers behind a prediction, reported for transparency.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorScores {
    pub time_impact: f64,
    pub day_impact: f64,
    pub subject_line_score: f64,
    pub segment_score: f64,
    pub device_mix_impact: f64,
}

impl FactorScores {
    pub fn neutral() -> Self {
        Self {
            time_impact: 1.0,
            day_impact: 1.0,
            subject_line_score: 1.0,
            segment_score: 1.0,
            device_mix_impact: 1.0,
        }
    }

    /// Product of all five multipliers.
    pub fn combined(&self) -> f64 {
        self.time_impact
            * self.day_impact
            * self.subject_line_score
            * self.segment_score
            * self.device_mix_impact
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenRatePrediction {
    pub prediction: f64,
    pub confidence_interval: ConfidenceInterval,
    pub factors: FactorScores,
}

/// Which path produced a prediction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "path", content = "result", rename_all = "lowercase")]
pub enum PredictionOutcome {
    /// Subject was empty; the fixed baseline answer was returned.
    Baseline(OpenRatePrediction),
    /// All signals were scored.
    Computed(OpenRatePrediction),
}

impl PredictionOutcome {
    pub fn prediction(&self) -> &OpenRatePrediction {
        match self {
            PredictionOutcome::Baseline(p) | PredictionOutcome::Computed(p) => p,
        }
    }

    pub fn into_prediction(self) -> OpenRatePrediction {
        match self {
            PredictionOutcome::Baseline(p) | PredictionOutcome::Computed(p) => p,
        }
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self, PredictionOutcome::Baseline(_))
    }
}

/// Stateless predictor bound to one set of scoring tables.
#[derive(Clone, Copy, Debug)]
pub struct PredictionEngine<'t> {
    tables: &'t ScoringTables,
}

impl Default for PredictionEngine<'static> {
    fn default() -> Self {
        Self::new(ScoringTables::builtin())
    }
}

impl<'t> PredictionEngine<'t> {
    pub fn new(tables: &'t ScoringTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &'t ScoringTables {
        self.tables
    }

    /// Jitter-free multipliers for a non-empty subject sent at `send_time`.
    pub fn factor_scores(&self, factors: &PredictionFactors, send_time: SendTime) -> FactorScores {
        FactorScores {
            time_impact: time_of_day_multiplier_with(self.tables, send_time.hour()),
            day_impact: day_of_week_multiplier_with(self.tables, send_time.weekday()),
            subject_line_score: subject_line_multiplier_with(self.tables, &factors.subject),
            segment_score: factors.segment_engagement,
            device_mix_impact: factors.device_mix.impact(&self.tables.device),
        }
    }

    /// The fixed answer for an unscoreable subject: baseline ±10%.
    pub fn baseline(&self) -> OpenRatePrediction {
        let rate = self.tables.baseline_open_rate;
        OpenRatePrediction {
            prediction: rate,
            confidence_interval: ConfidenceInterval {
                lower: round_probability(rate * (1.0 - BASELINE_INTERVAL_SPREAD)),
                upper: round_probability(rate * (1.0 + BASELINE_INTERVAL_SPREAD)),
            },
            factors: FactorScores::neutral(),
        }
    }

    pub fn predict(
        &self,
        factors: &PredictionFactors,
        clock: &impl Clock,
        jitter: &mut impl JitterSource,
    ) -> PredictionOutcome {
        if factors.subject.is_empty() {
            tracing::debug!("empty subject, returning baseline prediction");
            return PredictionOutcome::Baseline(self.baseline());
        }

        let mut baseline = self.tables.baseline_open_rate;
        if let Some(historical) = factors.historical_open_rate
            && historical.is_finite()
        {
            baseline = (baseline + historical) / 2.0;
        }

        let send_time = factors.send_time.unwrap_or_else(|| clock.now());
        let scores = self.factor_scores(factors, send_time);
        let raw = baseline
            * scores.day_impact
            * scores.time_impact
            * scores.subject_line_score
            * scores.segment_score
            * scores.device_mix_impact;

        let offset = jitter.jitter(self.tables.jitter_amplitude);
        let jittered = raw + offset;
        let prediction = round_probability(if jittered.is_nan() {
            0.0
        } else {
            jittered.clamp(0.0, 1.0)
        });

        let margin = self.tables.z_score * prediction * self.tables.relative_standard_error;
        let confidence_interval = ConfidenceInterval {
            lower: round_probability((prediction - margin).clamp(0.0, 1.0)),
            upper: round_probability((prediction + margin).clamp(0.0, 1.0)),
        };

        tracing::debug!(
            subject = %factors.subject,
            send_time = %send_time,
            raw,
            jitter = offset,
            prediction,
            "computed open-rate prediction"
        );

        PredictionOutcome::Computed(OpenRatePrediction {
            prediction,
            confidence_interval,
            factors: scores,
        })
    }

    /// Score a bare subject with default context, sent now.
    pub fn predict_subject(
        &self,
        subject: &str,
        clock: &impl Clock,
        jitter: &mut impl JitterSource,
    ) -> PredictionOutcome {
        self.predict(&PredictionFactors::new(subject), clock, jitter)
    }
}

/// Predict with the built-in tables.
pub fn predict_open_rate(
    factors: &PredictionFactors,
    clock: &impl Clock,
    jitter: &mut impl JitterSource,
) -> PredictionOutcome {
    PredictionEngine::default().predict(factors, clock, jitter)
}

/// Predict a bare subject with the built-in tables and default context.
pub fn predict_subject_open_rate(
    subject: &str,
    clock: &impl Clock,
    jitter: &mut impl JitterSource,
) -> PredictionOutcome {
    PredictionEngine::default().predict_subject(subject, clock, jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jitter::{FixedJitter, NoJitter, RandomJitter};
    use crate::time::FixedClock;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    // 2024-01-02T09:00:00Z, a Tuesday
    const TUESDAY_9AM: i64 = 1_704_186_000;
    // 2024-01-06T22:00:00Z, a Saturday
    const SATURDAY_10PM: i64 = 1_704_578_400;

    fn tuesday_morning() -> FixedClock {
        FixedClock(SendTime::utc(TUESDAY_9AM))
    }

    #[test]
    fn test_empty_subject_takes_baseline_path() {
        let outcome = predict_open_rate(&PredictionFactors::new(""), &tuesday_morning(), &mut NoJitter);
        assert!(outcome.is_baseline());
        let p = outcome.prediction();
        assert_eq!(p.prediction, 0.22);
        assert_eq!(p.confidence_interval.lower, 0.198);
        assert_eq!(p.confidence_interval.upper, 0.242);
        assert_eq!(p.factors, FactorScores::neutral());
    }

    #[test]
    fn test_baseline_ignores_other_inputs() {
        let factors = PredictionFactors::new("")
            .with_historical_open_rate(0.9)
            .with_segment_engagement(3.0)
            .with_device_mix(DeviceMix::new(1.0, 0.0, 0.0));
        let outcome = predict_open_rate(&factors, &tuesday_morning(), &mut FixedJitter(0.02));
        assert!(outcome.is_baseline());
        assert_eq!(outcome.prediction().prediction, 0.22);
    }

    #[test]
    fn test_reference_scenario_without_jitter() {
        let subject = "Top 10 tips for the 2024!";
        assert_eq!(subject.chars().count(), 25);
        let factors = PredictionFactors::new(subject).with_send_time(SendTime::utc(TUESDAY_9AM));
        let outcome = predict_open_rate(&factors, &tuesday_morning(), &mut NoJitter);
        assert!(!outcome.is_baseline());

        let p = outcome.prediction();
        assert_relative_eq!(p.factors.subject_line_score, 1.2075, epsilon = 1e-12);
        assert_eq!(p.factors.time_impact, 1.20);
        assert_eq!(p.factors.day_impact, 1.15);
        assert_eq!(p.factors.segment_score, 1.0);
        assert_relative_eq!(p.factors.device_mix_impact, 1.045, epsilon = 1e-12);

        let expected = round_probability(0.22 * 1.15 * 1.20 * 1.2075 * 1.045);
        assert_relative_eq!(p.prediction, expected, epsilon = 1e-12);
        assert_relative_eq!(p.prediction, 0.3831, epsilon = 1e-12);
    }

    #[test]
    fn test_interval_is_95_percent_of_ten_percent_se() {
        let factors = PredictionFactors::new("Top 10 tips for the 2024!");
        let p = predict_open_rate(&factors, &tuesday_morning(), &mut NoJitter).into_prediction();
        let margin = 1.96 * p.prediction * 0.10;
        assert_relative_eq!(
            p.confidence_interval.lower,
            round_probability(p.prediction - margin),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            p.confidence_interval.upper,
            round_probability(p.prediction + margin),
            epsilon = 1e-12
        );
        assert!(p.confidence_interval.contains(p.prediction));
    }

    #[test]
    fn test_send_time_defaults_to_clock() {
        let factors = PredictionFactors::new("Weekend reading for the team");
        let clock = FixedClock(SendTime::utc(SATURDAY_10PM));
        let p = predict_open_rate(&factors, &clock, &mut NoJitter).into_prediction();
        assert_eq!(p.factors.day_impact, 0.80);
        assert_eq!(p.factors.time_impact, 0.70);
    }

    #[test]
    fn test_explicit_send_time_beats_clock() {
        let factors = PredictionFactors::new("Weekend reading for the team")
            .with_send_time(SendTime::utc(TUESDAY_9AM));
        let clock = FixedClock(SendTime::utc(SATURDAY_10PM));
        let p = predict_open_rate(&factors, &clock, &mut NoJitter).into_prediction();
        assert_eq!(p.factors.day_impact, 1.15);
        assert_eq!(p.factors.time_impact, 1.20);
    }

    #[test]
    fn test_historical_rate_is_averaged() {
        let subject = "Weekend reading for the team";
        let without = predict_open_rate(&PredictionFactors::new(subject), &tuesday_morning(), &mut NoJitter);
        let with = predict_open_rate(
            &PredictionFactors::new(subject).with_historical_open_rate(0.40),
            &tuesday_morning(),
            &mut NoJitter,
        );
        let combined = without.prediction().factors.combined();
        assert_relative_eq!(
            without.prediction().prediction,
            round_probability(0.22 * combined),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            with.prediction().prediction,
            round_probability(0.31 * combined),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_non_finite_historical_rate_is_ignored() {
        let subject = "Weekend reading for the team";
        let plain = predict_open_rate(&PredictionFactors::new(subject), &tuesday_morning(), &mut NoJitter);
        let nan = predict_open_rate(
            &PredictionFactors::new(subject).with_historical_open_rate(f64::NAN),
            &tuesday_morning(),
            &mut NoJitter,
        );
        assert_eq!(plain, nan);
    }

    #[test]
    fn test_device_mix_is_not_normalized() {
        let mix = DeviceMix::new(2.0, 0.0, 0.0);
        assert_relative_eq!(mix.impact(&DeviceWeights::default()), 2.2);
        let factors = PredictionFactors::new("Weekend reading for the team").with_device_mix(mix);
        let p = predict_open_rate(&factors, &tuesday_morning(), &mut NoJitter).into_prediction();
        assert_relative_eq!(p.factors.device_mix_impact, 2.2);
    }

    #[test]
    fn test_segment_engagement_scales_prediction() {
        let subject = "Weekend reading for the team";
        let p = predict_open_rate(
            &PredictionFactors::new(subject).with_segment_engagement(1.5),
            &tuesday_morning(),
            &mut NoJitter,
        )
        .into_prediction();
        assert_eq!(p.factors.segment_score, 1.5);
    }

    #[test]
    fn test_prediction_clamps_at_one() {
        let factors = PredictionFactors::new("Weekend reading for the team").with_segment_engagement(50.0);
        let p = predict_open_rate(&factors, &tuesday_morning(), &mut FixedJitter(0.02)).into_prediction();
        assert_eq!(p.prediction, 1.0);
        assert_eq!(p.confidence_interval.upper, 1.0);
        assert_relative_eq!(p.confidence_interval.lower, 0.804, epsilon = 1e-12);
    }

    #[test]
    fn test_prediction_clamps_at_zero() {
        let factors = PredictionFactors::new("Weekend reading for the team").with_segment_engagement(0.0);
        let p = predict_open_rate(&factors, &tuesday_morning(), &mut FixedJitter(-0.02)).into_prediction();
        assert_eq!(p.prediction, 0.0);
        assert_eq!(p.confidence_interval.lower, 0.0);
        assert_eq!(p.confidence_interval.upper, 0.0);
    }

    #[test]
    fn test_nan_inputs_degrade_to_zero() {
        let factors = PredictionFactors::new("Weekend reading for the team").with_segment_engagement(f64::NAN);
        let p = predict_open_rate(&factors, &tuesday_morning(), &mut NoJitter).into_prediction();
        assert_eq!(p.prediction, 0.0);
        assert!(p.confidence_interval.contains(p.prediction));
    }

    #[test]
    fn test_jitter_is_bounded() {
        let factors = PredictionFactors::new("Weekend reading for the team");
        let exact = predict_open_rate(&factors, &tuesday_morning(), &mut NoJitter)
            .prediction()
            .prediction;
        let mut jitter = RandomJitter::new(SmallRng::seed_from_u64(42));
        for _ in 0..1_000 {
            let p = predict_open_rate(&factors, &tuesday_morning(), &mut jitter).into_prediction();
            assert!((p.prediction - exact).abs() <= 0.02 + 1e-4, "{} vs {exact}", p.prediction);
            assert!(p.confidence_interval.contains(p.prediction));
        }
    }

    #[test]
    fn test_factor_scores_exclude_jitter() {
        let factors = PredictionFactors::new("Weekend reading for the team");
        let a = predict_open_rate(&factors, &tuesday_morning(), &mut FixedJitter(0.02)).into_prediction();
        let b = predict_open_rate(&factors, &tuesday_morning(), &mut FixedJitter(-0.02)).into_prediction();
        assert_eq!(a.factors, b.factors);
        assert!(a.prediction > b.prediction);
    }

    #[test]
    fn test_custom_tables_flow_through_engine() {
        let tables = ScoringTables {
            baseline_open_rate: 0.30,
            ..ScoringTables::default()
        };
        let engine = PredictionEngine::new(&tables);
        let baseline = engine.predict(&PredictionFactors::new(""), &tuesday_morning(), &mut NoJitter);
        assert_eq!(baseline.prediction().prediction, 0.30);
        assert_relative_eq!(baseline.prediction().confidence_interval.lower, 0.27, epsilon = 1e-12);
    }

    #[test]
    fn test_predict_subject_uses_defaults() {
        let outcome = predict_subject_open_rate("Weekend reading for the team", &tuesday_morning(), &mut NoJitter);
        let p = outcome.prediction();
        assert_eq!(p.factors.segment_score, 1.0);
        assert_relative_eq!(p.factors.device_mix_impact, 1.045, epsilon = 1e-12);
    }

    #[test]
    fn test_json_shape_is_camel_case() {
        let p = predict_open_rate(&PredictionFactors::new(""), &tuesday_morning(), &mut NoJitter);
        let json = serde_json::to_value(p).unwrap();
        assert_eq!(json["path"], "baseline");
        assert_eq!(json["result"]["prediction"], 0.22);
        assert_eq!(json["result"]["confidenceInterval"]["lower"], 0.198);
        assert_eq!(json["result"]["factors"]["subjectLineScore"], 1.0);
        assert_eq!(json["result"]["factors"]["deviceMixImpact"], 1.0);
    }

    #[test]
    fn test_factors_deserialize_with_defaults() {
        let factors: PredictionFactors =
            serde_json::from_str(r#"{"subject": "Hello {name}"}"#).unwrap();
        assert_eq!(factors, PredictionFactors::new("Hello {name}"));
    }

    #[test]
    fn test_far_future_send_time_does_not_overflow() {
        let factors: PredictionFactors = serde_json::from_str(
            r#"{"subject": "Hello there friends of ours",
                "sendTime": {"unixSecs": 9223372036854775807, "utcOffsetSecs": 3600}}"#,
        )
        .unwrap();
        let p = predict_open_rate(&factors, &tuesday_morning(), &mut NoJitter).into_prediction();
        assert!(p.confidence_interval.contains(p.prediction));
        assert!((0.0..=1.0).contains(&p.prediction));
    }

    #[test]
    fn test_out_of_range_offset_is_rejected_on_deserialize() {
        let err = serde_json::from_str::<PredictionFactors>(
            r#"{"subject": "Hello", "sendTime": {"unixSecs": 0, "utcOffsetSecs": 90000}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }
}
