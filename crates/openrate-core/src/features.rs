//! Feature scorer: turns send time and subject text into independent
//! positive multipliers.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::constants::{LONG_SUBJECT_CHARS, SHORT_SUBJECT_CHARS};
use crate::tables::{ScoringTables, SubjectLineTable, TimeOfDayTable};
use crate::time::Weekday;

// Pictographs only: ASCII digits, '#' and '*' carry the plain Emoji property
// and must not count as emoji.
static EMOJI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{Extended_Pictographic}\p{Emoji_Presentation}]").unwrap());
static PERSONALIZATION_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{.*?\}").unwrap());

/// Which time-of-day bucket an hour falls in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayPart {
    /// Half-open buckets: [6,11) [11,14) [14,18), everything else is night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=10 => DayPart::Morning,
            11..=13 => DayPart::Afternoon,
            14..=17 => DayPart::Evening,
            _ => DayPart::Night,
        }
    }

    pub fn multiplier(self, table: &TimeOfDayTable) -> f64 {
        match self {
            DayPart::Morning => table.morning,
            DayPart::Afternoon => table.afternoon,
            DayPart::Evening => table.evening,
            DayPart::Night => table.night,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LengthBucket {
    TooShort,
    Optimal,
    TooLong,
}

impl LengthBucket {
    /// <20 chars is too short, 20..=60 optimal, >60 too long.
    pub fn from_chars(chars: usize) -> Self {
        if chars < SHORT_SUBJECT_CHARS {
            LengthBucket::TooShort
        } else if chars <= LONG_SUBJECT_CHARS {
            LengthBucket::Optimal
        } else {
            LengthBucket::TooLong
        }
    }

    pub fn multiplier(self, table: &SubjectLineTable) -> f64 {
        match self {
            LengthBucket::TooShort => table.too_short,
            LengthBucket::Optimal => table.optimal,
            LengthBucket::TooLong => table.too_long,
        }
    }
}

/// Signals detected in a subject line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSignals {
    pub length: LengthBucket,
    pub has_emoji: bool,
    pub has_digit: bool,
    pub has_personalization: bool,
    pub has_urgency: bool,
    pub has_question: bool,
}

impl SubjectSignals {
    /// Product of the length bucket and every present signal.
    pub fn multiplier(&self, table: &SubjectLineTable) -> f64 {
        let mut multiplier = self.length.multiplier(table);
        if self.has_emoji {
            multiplier *= table.emoji;
        }
        if self.has_digit {
            multiplier *= table.digit;
        }
        if self.has_personalization {
            multiplier *= table.personalization;
        }
        if self.has_urgency {
            multiplier *= table.urgency;
        }
        if self.has_question {
            multiplier *= table.question_mark;
        }
        multiplier
    }
}

/// Detect subject-line signals. Returns `None` for an empty subject.
pub fn analyze_subject_with(table: &SubjectLineTable, subject: &str) -> Option<SubjectSignals> {
    if subject.is_empty() {
        return None;
    }
    let lowered = subject.to_lowercase();
    let signals = SubjectSignals {
        length: LengthBucket::from_chars(subject.chars().count()),
        has_emoji: EMOJI.is_match(subject),
        has_digit: subject.bytes().any(|b| b.is_ascii_digit()),
        has_personalization: PERSONALIZATION_TOKEN.is_match(subject),
        has_urgency: table
            .urgency_keywords
            .iter()
            .any(|k| lowered.contains(&k.to_lowercase())),
        has_question: subject.contains('?'),
    };
    tracing::trace!(?signals, "analyzed subject");
    Some(signals)
}

pub fn analyze_subject(subject: &str) -> Option<SubjectSignals> {
    analyze_subject_with(&ScoringTables::builtin().subject, subject)
}

pub fn time_of_day_multiplier_with(tables: &ScoringTables, hour: u32) -> f64 {
    DayPart::from_hour(hour).multiplier(&tables.time_of_day)
}

/// Multiplier for the local hour of delivery.
pub fn time_of_day_multiplier(hour: u32) -> f64 {
    time_of_day_multiplier_with(ScoringTables::builtin(), hour)
}

pub fn day_of_week_multiplier_with(tables: &ScoringTables, day: Weekday) -> f64 {
    tables.day_of_week.get(day)
}

/// Multiplier for the local day of delivery.
pub fn day_of_week_multiplier(day: Weekday) -> f64 {
    day_of_week_multiplier_with(ScoringTables::builtin(), day)
}

/// Geometric product of subject-line signals. Empty subject → neutral 1.0.
pub fn subject_line_multiplier_with(tables: &ScoringTables, subject: &str) -> f64 {
    analyze_subject_with(&tables.subject, subject)
        .map(|signals| signals.multiplier(&tables.subject))
        .unwrap_or(1.0)
}

pub fn subject_line_multiplier(subject: &str) -> f64 {
    subject_line_multiplier_with(ScoringTables::builtin(), subject)
}
