use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Six hours, the default ceiling for open (count-up) focus.
pub const DEFAULT_COUNTUP_CAP_SECS: u64 = 6 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionType {
    Pomodoro,
    DeepWork,
    Break,
    Countup,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Pomodoro => "pomodoro",
            SessionType::DeepWork => "deep-work",
            SessionType::Break => "break",
            SessionType::Countup => "countup",
        }
    }

    pub fn is_countup(&self) -> bool {
        matches!(self, SessionType::Countup)
    }

    /// Work sessions can block apps, earn XP and extend streaks.
    pub fn is_work(&self) -> bool {
        !matches!(self, SessionType::Break)
    }
}

impl Default for SessionType {
    fn default() -> Self {
        SessionType::Pomodoro
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pomodoro" => Ok(SessionType::Pomodoro),
            "deep-work" | "deep_work" | "deepwork" => Ok(SessionType::DeepWork),
            "break" => Ok(SessionType::Break),
            "countup" | "count-up" | "open" => Ok(SessionType::Countup),
            other => Err(ValidationError::InvalidValue {
                field: "session_type".into(),
                message: format!("unknown session type '{other}'"),
            }),
        }
    }
}

/// What the user said they would focus on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusCategory {
    Work,
    Study,
    Creative,
    Reading,
    Personal,
    Other,
}

impl FocusCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FocusCategory::Work => "work",
            FocusCategory::Study => "study",
            FocusCategory::Creative => "creative",
            FocusCategory::Reading => "reading",
            FocusCategory::Personal => "personal",
            FocusCategory::Other => "other",
        }
    }
}

impl fmt::Display for FocusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FocusCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(FocusCategory::Work),
            "study" => Ok(FocusCategory::Study),
            "creative" => Ok(FocusCategory::Creative),
            "reading" => Ok(FocusCategory::Reading),
            "personal" => Ok(FocusCategory::Personal),
            "other" => Ok(FocusCategory::Other),
            other => Err(ValidationError::InvalidValue {
                field: "category".into(),
                message: format!("unknown focus category '{other}'"),
            }),
        }
    }
}

/// Durations (seconds) for each session type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presets {
    pub pomodoro_secs: u64,
    pub deep_work_secs: u64,
    pub break_secs: u64,
    pub countup_cap_secs: u64,
}

impl Presets {
    /// Countdown length for the type, or the cap for count-up.
    pub fn duration_for(&self, session_type: SessionType) -> u64 {
        match session_type {
            SessionType::Pomodoro => self.pomodoro_secs,
            SessionType::DeepWork => self.deep_work_secs,
            SessionType::Break => self.break_secs,
            SessionType::Countup => self.countup_cap_secs,
        }
    }
}

impl Default for Presets {
    fn default() -> Self {
        Self {
            pomodoro_secs: 25 * 60,
            deep_work_secs: 50 * 60,
            break_secs: 5 * 60,
            countup_cap_secs: DEFAULT_COUNTUP_CAP_SECS,
        }
    }
}
