//! Multiplier tables driving the scorer.
//!
//! The built-in tables are constructed once on first use and never mutated.
//! A deployment can override them from a TOML file at startup; any table
//! field left out of the file keeps its built-in value.

use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::constants::{
    BASELINE_OPEN_RATE, JITTER_AMPLITUDE, RELATIVE_STANDARD_ERROR, Z_SCORE_95,
};
use crate::error::{Error, Result};
use crate::time::Weekday;

static BUILTIN: LazyLock<ScoringTables> = LazyLock::new(ScoringTables::default);

/// Time-of-day bucket multipliers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeOfDayTable {
    /// 06:00–10:59
    pub morning: f64,
    /// 11:00–13:59
    pub afternoon: f64,
    /// 14:00–17:59
    pub evening: f64,
    /// everything else
    pub night: f64,
}

impl Default for TimeOfDayTable {
    fn default() -> Self {
        Self {
            morning: 1.20,
            afternoon: 0.90,
            evening: 1.10,
            night: 0.70,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DayOfWeekTable {
    pub monday: f64,
    pub tuesday: f64,
    pub wednesday: f64,
    pub thursday: f64,
    pub friday: f64,
    pub saturday: f64,
    pub sunday: f64,
}

impl DayOfWeekTable {
    pub fn get(&self, day: Weekday) -> f64 {
        match day {
            Weekday::Monday => self.monday,
            Weekday::Tuesday => self.tuesday,
            Weekday::Wednesday => self.wednesday,
            Weekday::Thursday => self.thursday,
            Weekday::Friday => self.friday,
            Weekday::Saturday => self.saturday,
            Weekday::Sunday => self.sunday,
        }
    }
}

impl Default for DayOfWeekTable {
    fn default() -> Self {
        Self {
            monday: 1.10,
            tuesday: 1.15,
            wednesday: 1.10,
            thursday: 1.05,
            friday: 0.95,
            saturday: 0.80,
            sunday: 0.85,
        }
    }
}

/// Subject-line signal weights. Length buckets are exclusive; every other
/// signal multiplies in independently when present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubjectLineTable {
    pub too_short: f64,
    pub optimal: f64,
    pub too_long: f64,
    pub emoji: f64,
    pub digit: f64,
    pub personalization: f64,
    pub urgency: f64,
    pub question_mark: f64,
    /// Matched as case-insensitive substrings.
    pub urgency_keywords: Vec<String>,
}

impl Default for SubjectLineTable {
    fn default() -> Self {
        Self {
            too_short: 0.85,
            optimal: 1.15,
            too_long: 0.90,
            emoji: 1.08,
            digit: 1.05,
            personalization: 1.12,
            urgency: 1.07,
            question_mark: 1.03,
            urgency_keywords: ["urgent", "limited", "expires", "last chance"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Engagement weight per device class, combined with the audience mix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceWeights {
    pub mobile: f64,
    pub desktop: f64,
    pub tablet: f64,
}

impl Default for DeviceWeights {
    fn default() -> Self {
        Self {
            mobile: 1.10,
            desktop: 0.95,
            tablet: 1.00,
        }
    }
}

/// Every constant the predictor consults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringTables {
    pub baseline_open_rate: f64,
    pub jitter_amplitude: f64,
    pub relative_standard_error: f64,
    pub z_score: f64,
    pub time_of_day: TimeOfDayTable,
    pub day_of_week: DayOfWeekTable,
    pub subject: SubjectLineTable,
    pub device: DeviceWeights,
}

impl Default for ScoringTables {
    fn default() -> Self {
        Self {
            baseline_open_rate: BASELINE_OPEN_RATE,
            jitter_amplitude: JITTER_AMPLITUDE,
            relative_standard_error: RELATIVE_STANDARD_ERROR,
            z_score: Z_SCORE_95,
            time_of_day: TimeOfDayTable::default(),
            day_of_week: DayOfWeekTable::default(),
            subject: SubjectLineTable::default(),
            device: DeviceWeights::default(),
        }
    }
}

impl ScoringTables {
    /// The built-in tables, shared for the life of the process.
    pub fn builtin() -> &'static ScoringTables {
        &BUILTIN
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let tables: ScoringTables = toml::from_str(content)?;
        tables.validate()?;
        Ok(tables)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let tables = Self::from_toml_str(&content)?;
        tracing::debug!("loaded scoring tables from {}", path.display());
        Ok(tables)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Multipliers must be finite and strictly positive; probabilities and
    /// spreads must be finite and in range.
    pub fn validate(&self) -> Result<()> {
        let multipliers = [
            ("time_of_day.morning", self.time_of_day.morning),
            ("time_of_day.afternoon", self.time_of_day.afternoon),
            ("time_of_day.evening", self.time_of_day.evening),
            ("time_of_day.night", self.time_of_day.night),
            ("day_of_week.monday", self.day_of_week.monday),
            ("day_of_week.tuesday", self.day_of_week.tuesday),
            ("day_of_week.wednesday", self.day_of_week.wednesday),
            ("day_of_week.thursday", self.day_of_week.thursday),
            ("day_of_week.friday", self.day_of_week.friday),
            ("day_of_week.saturday", self.day_of_week.saturday),
            ("day_of_week.sunday", self.day_of_week.sunday),
            ("subject.too_short", self.subject.too_short),
            ("subject.optimal", self.subject.optimal),
            ("subject.too_long", self.subject.too_long),
            ("subject.emoji", self.subject.emoji),
            ("subject.digit", self.subject.digit),
            ("subject.personalization", self.subject.personalization),
            ("subject.urgency", self.subject.urgency),
            ("subject.question_mark", self.subject.question_mark),
            ("device.mobile", self.device.mobile),
            ("device.desktop", self.device.desktop),
            ("device.tablet", self.device.tablet),
        ];
        for (name, value) in multipliers {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::InvalidTables(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.baseline_open_rate) {
            return Err(Error::InvalidTables(format!(
                "baseline_open_rate must be in [0, 1], got {}",
                self.baseline_open_rate
            )));
        }
        if !(0.0..=0.5).contains(&self.jitter_amplitude) {
            return Err(Error::InvalidTables(format!(
                "jitter_amplitude must be in [0, 0.5], got {}",
                self.jitter_amplitude
            )));
        }
        for (name, value) in [
            ("relative_standard_error", self.relative_standard_error),
            ("z_score", self.z_score),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::InvalidTables(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.subject.urgency_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(Error::InvalidTables(
                "subject.urgency_keywords must not contain blank entries".to_string(),
            ));
        }
        Ok(())
    }
}
