//! Email open-rate prediction engine.
//!
//! Scores a candidate subject line plus send context into a predicted open
//! probability with a 95% confidence interval, by composing fixed
//! multiplier tables over a 22% industry baseline. A companion generator
//! proposes subject-line variants for a topic under a chosen tone.
//!
//! Zero I/O during scoring. The clock and the jitter source are injected so
//! every prediction is reproducible under test.

pub mod constants;
pub mod error;
pub mod features;
pub mod jitter;
pub mod prediction;
pub mod tables;
pub mod time;
pub mod variants;

pub use constants::{BASELINE_OPEN_RATE, DEFAULT_VARIANT_COUNT, JITTER_AMPLITUDE};
pub use error::{Error, Result};
pub use features::{
    DayPart, LengthBucket, SubjectSignals, analyze_subject, day_of_week_multiplier,
    subject_line_multiplier, time_of_day_multiplier,
};
pub use jitter::{FixedJitter, JitterSource, NoJitter, RandomJitter};
pub use prediction::{
    ConfidenceInterval, DeviceMix, FactorScores, OpenRatePrediction, PredictionEngine,
    PredictionFactors, PredictionOutcome, predict_open_rate, predict_subject_open_rate,
};
pub use tables::ScoringTables;
pub use time::{Clock, FixedClock, SendTime, SystemClock, Weekday, parse_utc_offset};
pub use variants::{ScoredVariant, Tone, generate_subject_lines, score_variants};
