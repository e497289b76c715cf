/// Industry-average open rate used as the starting point of every prediction.
pub const BASELINE_OPEN_RATE: f64 = 0.22;

/// Half-width of the uniform jitter added to a computed prediction.
pub const JITTER_AMPLITUDE: f64 = 0.02;

/// Standard error as a fraction of the prediction.
pub const RELATIVE_STANDARD_ERROR: f64 = 0.10;

/// z-score for a two-sided 95% interval.
pub const Z_SCORE_95: f64 = 1.96;

/// Relative half-width of the interval reported on the baseline path (±10%).
pub const BASELINE_INTERVAL_SPREAD: f64 = 0.10;

/// Decimal places kept in reported probabilities.
pub const ROUNDING_DECIMALS: i32 = 4;

/// Subjects shorter than this many characters are "too short".
pub const SHORT_SUBJECT_CHARS: usize = 20;

/// Subjects longer than this many characters are "too long".
pub const LONG_SUBJECT_CHARS: usize = 60;

/// Number of variants produced when the caller does not ask for a count.
pub const DEFAULT_VARIANT_COUNT: usize = 3;

/// Default audience split across device classes.
pub const DEFAULT_MOBILE_SHARE: f64 = 0.6;
pub const DEFAULT_DESKTOP_SHARE: f64 = 0.3;
pub const DEFAULT_TABLET_SHARE: f64 = 0.1;

/// Round to `ROUNDING_DECIMALS` places.
pub fn round_probability(value: f64) -> f64 {
    let scale = 10f64.powi(ROUNDING_DECIMALS);
    (value * scale).round() / scale
}
