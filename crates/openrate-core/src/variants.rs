//! Variant generator: alternative phrasings of a topic under a tone.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::jitter::JitterSource;
use crate::prediction::{PredictionEngine, PredictionFactors, PredictionOutcome};
use crate::time::Clock;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Exciting,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Professional, Tone::Casual, Tone::Exciting];

    /// Lexical modifiers, in output order.
    pub fn modifiers(self) -> &'static [&'static str; 3] {
        match self {
            Tone::Professional => &["Proven", "Essential", "Strategic"],
            Tone::Casual => &["Quick", "Simple", "Easy"],
            Tone::Exciting => &["Game-changing", "Revolutionary", "Breakthrough"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Exciting => "exciting",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tone::Professional => "Professional",
            Tone::Casual => "Casual",
            Tone::Exciting => "Exciting",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tone::Professional => "Formal and business-oriented",
            Tone::Casual => "Friendly and conversational",
            Tone::Exciting => "High-energy and impactful",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Tone::ALL
            .into_iter()
            .find(|tone| tone.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownTone(s.to_string()))
    }
}

/// `"{modifier}: {topic}"` for each of the tone's modifiers, in order.
///
/// At most one line per modifier: `count` above the modifier list yields the
/// whole list, below it truncates.
pub fn generate_subject_lines(topic: &str, tone: Tone, count: usize) -> Vec<String> {
    tone.modifiers()
        .iter()
        .take(count)
        .map(|modifier| format!("{modifier}: {topic}"))
        .collect()
}

/// A generated subject line together with its predicted open rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredVariant {
    pub subject: String,
    pub outcome: PredictionOutcome,
}

/// Generate variants and score each one. The whole batch shares a single
/// send time read from `clock`, so variants differ only by their text and
/// jitter.
pub fn score_variants(
    topic: &str,
    tone: Tone,
    count: usize,
    engine: &PredictionEngine<'_>,
    clock: &impl Clock,
    jitter: &mut impl JitterSource,
) -> Vec<ScoredVariant> {
    let send_time = clock.now();
    let variants: Vec<ScoredVariant> = generate_subject_lines(topic, tone, count)
        .into_iter()
        .map(|subject| {
            let factors = PredictionFactors::new(subject.as_str()).with_send_time(send_time);
            let outcome = engine.predict(&factors, clock, &mut *jitter);
            ScoredVariant { subject, outcome }
        })
        .collect();
    tracing::debug!(%tone, count = variants.len(), "scored subject line variants");
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_VARIANT_COUNT;
    use crate::jitter::NoJitter;
    use crate::time::{FixedClock, SendTime};

    #[test]
    fn test_casual_lines_in_order() {
        let lines = generate_subject_lines("newsletter growth", Tone::Casual, 3);
        assert_eq!(
            lines,
            vec![
                "Quick: newsletter growth",
                "Simple: newsletter growth",
                "Easy: newsletter growth",
            ]
        );
    }

    #[test]
    fn test_every_tone_has_three_modifiers() {
        for tone in Tone::ALL {
            let lines = generate_subject_lines("x", tone, DEFAULT_VARIANT_COUNT);
            assert_eq!(lines.len(), 3, "{tone}");
            assert!(lines[0].starts_with(tone.modifiers()[0]));
        }
    }

    #[test]
    fn test_professional_and_exciting() {
        assert_eq!(
            generate_subject_lines("Q3 report", Tone::Professional, 3),
            vec!["Proven: Q3 report", "Essential: Q3 report", "Strategic: Q3 report"]
        );
        assert_eq!(
            generate_subject_lines("launch", Tone::Exciting, 3)[0],
            "Game-changing: launch"
        );
    }

    #[test]
    fn test_generation_is_idempotent() {
        let a = generate_subject_lines("spring sale", Tone::Exciting, 3);
        let b = generate_subject_lines("spring sale", Tone::Exciting, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_count_truncates_but_never_cycles() {
        assert!(generate_subject_lines("t", Tone::Casual, 0).is_empty());
        assert_eq!(generate_subject_lines("t", Tone::Casual, 2), vec!["Quick: t", "Simple: t"]);
        assert_eq!(generate_subject_lines("t", Tone::Casual, 10).len(), 3);
    }

    #[test]
    fn test_tone_parsing() {
        assert_eq!("casual".parse::<Tone>().unwrap(), Tone::Casual);
        assert_eq!(" Exciting ".parse::<Tone>().unwrap(), Tone::Exciting);
        assert_eq!("PROFESSIONAL".parse::<Tone>().unwrap(), Tone::Professional);
        assert!(matches!("snarky".parse::<Tone>(), Err(Error::UnknownTone(_))));
        assert_eq!(Tone::default(), Tone::Professional);
    }

    #[test]
    fn test_score_variants_shares_send_time() {
        // 2024-01-02T09:00:00Z, a Tuesday
        let clock = FixedClock(SendTime::utc(1_704_186_000));
        let engine = PredictionEngine::default();
        let scored = score_variants("newsletter growth", Tone::Casual, 3, &engine, &clock, &mut NoJitter);
        assert_eq!(scored.len(), 3);
        assert_eq!(scored[1].subject, "Simple: newsletter growth");
        for variant in &scored {
            assert!(!variant.outcome.is_baseline());
            let factors = variant.outcome.prediction().factors;
            assert_eq!(factors.day_impact, 1.15);
            assert_eq!(factors.time_impact, 1.20);
        }
    }

    #[test]
    fn test_score_variants_empty_topic_still_scores() {
        let clock = FixedClock(SendTime::utc(0));
        let engine = PredictionEngine::default();
        let scored = score_variants("", Tone::Casual, 1, &engine, &clock, &mut NoJitter);
        assert_eq!(scored[0].subject, "Quick: ");
        assert!(!scored[0].outcome.is_baseline());
    }
}
