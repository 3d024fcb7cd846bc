//! Presentation helpers for estimates.

use serde::{Deserialize, Serialize};

/// Coarse severity used for colour coding. Not a safety claim.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BacLevel {
    Zero,
    Low,
    Moderate,
    High,
}

impl BacLevel {
    pub fn classify(concentration: f64) -> Self {
        if concentration <= 0.0 {
            BacLevel::Zero
        } else if concentration < 0.03 {
            BacLevel::Low
        } else if concentration < 0.05 {
            BacLevel::Moderate
        } else {
            BacLevel::High
        }
    }
}

/// Words used by [`format_time_to_zero`]
#[derive(Clone, Debug)]
pub struct TimeLabels {
    pub sober: String,
    pub hour_abbrev: String,
    pub hour_word: String,
}

impl Default for TimeLabels {
    fn default() -> Self {
        Self {
            sober: "sober".into(),
            hour_abbrev: "h".into(),
            hour_word: "hours".into(),
        }
    }
}

/// Concentration with exactly two decimals
pub fn format_concentration(concentration: f64) -> String {
    format!("{:.2}", concentration)
}

/// Human readable time until sober
///
/// `0` → "sober", `90` → "~1h 30min", `120` → "~2 hours", `45` → "~45 min"
pub fn format_time_to_zero(minutes: u32, labels: &TimeLabels) -> String {
    if minutes == 0 {
        return labels.sober.clone();
    }

    let hours = minutes / 60;
    let mins = minutes % 60;

    match (hours, mins) {
        (0, m) => format!("~{} min", m),
        (h, 0) => format!("~{} {}", h, labels.hour_word),
        (h, m) => format!("~{}{} {}min", h, labels.hour_abbrev, m),
    }
}
