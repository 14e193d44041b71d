//! The persisted record of the current focus session.
//!
//! Stored as a single JSON object with camelCase keys. Fields added after
//! the first release carry `#[serde(default)]` so older records still load.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::elapsed::{compute_countup_elapsed, compute_elapsed, compute_remaining};
use super::session::{FocusCategory, Presets, SessionType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub is_running: bool,
    pub is_countup: bool,
    /// Epoch milliseconds the running segment began. May be shifted
    /// backward on resume so that `session_duration - elapsed` stays equal
    /// to the remaining time captured at pause.
    pub start_time: Option<u64>,
    /// Countdown: planned length of the current running segment.
    /// Count-up: the cap.
    pub session_duration: u64,
    /// Countdown snapshot, valid while paused.
    pub time_left: u64,
    /// Count-up snapshot, valid while paused.
    pub elapsed_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<FocusCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_label: Option<String>,
    pub session_type: SessionType,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    /// Countdown length chosen at fresh start; unaffected by pauses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_duration: Option<u64>,
    /// Blocked-app attempts reported by the shield in earlier running
    /// segments. A pause lowers the shield and banks its count here.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub shield_attempts: u32,
}

fn default_true() -> bool {
    true
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl TimerState {
    /// Idle state for `session_type`, showing its full preset.
    pub fn idle(session_type: SessionType, presets: &Presets) -> Self {
        let duration = presets.duration_for(session_type);
        let countup = session_type.is_countup();
        Self {
            is_running: false,
            is_countup: countup,
            start_time: None,
            session_duration: duration,
            time_left: if countup { 0 } else { duration },
            elapsed_time: 0,
            category: None,
            task_label: None,
            session_type,
            sound_enabled: true,
            session_id: None,
            planned_duration: None,
            shield_attempts: 0,
        }
    }

    /// Back to the mode's defaults, keeping preferences and the mode itself.
    pub fn reset(&mut self, presets: &Presets) {
        let sound_enabled = self.sound_enabled;
        *self = Self::idle(self.session_type, presets);
        self.sound_enabled = sound_enabled;
    }

    /// True once a session has been started and not yet ended.
    pub fn in_progress(&self) -> bool {
        self.is_running || self.session_id.is_some() || self.category.is_some()
    }

    /// Remaining countdown seconds at `now_ms`.
    pub fn remaining_at(&self, now_ms: u64) -> u64 {
        match (self.is_running, self.start_time) {
            (true, Some(start)) => {
                compute_remaining(self.session_duration, compute_elapsed(start, now_ms))
            }
            _ => self.time_left,
        }
    }

    /// Count-up seconds at `now_ms`, capped at `session_duration`.
    pub fn countup_elapsed_at(&self, now_ms: u64) -> u64 {
        match (self.is_running, self.start_time) {
            (true, Some(start)) => compute_countup_elapsed(start, now_ms, self.session_duration),
            _ => self.elapsed_time.min(self.session_duration),
        }
    }

    /// What the timer face shows at `now_ms`.
    pub fn display_secs(&self, now_ms: u64) -> u64 {
        if self.is_countup {
            self.countup_elapsed_at(now_ms)
        } else {
            self.remaining_at(now_ms)
        }
    }

    /// Seconds already consumed from the current countdown segment, as
    /// captured by the last pause.
    pub fn consumed_before_resume(&self) -> u64 {
        if self.is_countup {
            self.elapsed_time
        } else {
            self.session_duration.saturating_sub(self.time_left)
        }
    }

    /// Planned length for analytics. Falls back to the segment length for
    /// records written before `planned_duration` existed.
    pub fn planned_secs(&self) -> u64 {
        self.planned_duration.unwrap_or(self.session_duration)
    }

    /// Repairs fields that cannot all be true at once. Returns the list of
    /// corrections applied, for logging.
    pub fn sanitize(&mut self, presets: &Presets) -> Vec<&'static str> {
        let mut fixes = Vec::new();

        let countup = self.session_type.is_countup();
        if self.is_countup != countup {
            self.is_countup = countup;
            fixes.push("isCountup disagreed with sessionType");
        }
        if self.is_running && self.start_time.is_none() {
            self.is_running = false;
            fixes.push("running without startTime, treating as paused");
        }
        if !self.is_running && self.start_time.is_some() {
            self.start_time = None;
            fixes.push("startTime set while not running");
        }
        if self.is_countup {
            if self.session_duration != presets.countup_cap_secs {
                self.session_duration = presets.countup_cap_secs;
                fixes.push("count-up duration reset to cap");
            }
            if self.elapsed_time > self.session_duration {
                self.elapsed_time = self.session_duration;
                fixes.push("elapsedTime clamped to cap");
            }
            if self.planned_duration.is_some() {
                self.planned_duration = None;
                fixes.push("count-up sessions have no plannedDuration");
            }
        } else {
            // No countdown outlasts both its preset and the count-up cap.
            let preset = presets.duration_for(self.session_type);
            let ceiling = preset.max(presets.countup_cap_secs);
            if self.session_duration == 0 || self.session_duration > ceiling {
                self.session_duration = preset;
                fixes.push("sessionDuration out of range, replaced with preset");
            }
            if self.time_left > self.session_duration {
                self.time_left = self.session_duration;
                fixes.push("timeLeft clamped to sessionDuration");
            }
            match self.planned_duration {
                Some(planned) if planned > ceiling => {
                    self.planned_duration = None;
                    fixes.push("plannedDuration out of range, dropped");
                }
                Some(planned) if planned < self.session_duration => {
                    self.planned_duration = Some(self.session_duration);
                    fixes.push("plannedDuration raised to sessionDuration");
                }
                _ => {}
            }
        }
        if self.session_type == SessionType::Break && self.category.is_some() {
            self.category = None;
            fixes.push("break sessions carry no category");
        }
        fixes
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::idle(SessionType::default(), &Presets::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_countdown_shows_full_preset() {
        let s = TimerState::idle(SessionType::Pomodoro, &Presets::default());
        assert!(!s.is_countup);
        assert_eq!(s.session_duration, 1500);
        assert_eq!(s.time_left, 1500);
        assert_eq!(s.display_secs(0), 1500);
    }

    #[test]
    fn idle_countup_starts_at_zero_with_cap() {
        let s = TimerState::idle(SessionType::Countup, &Presets::default());
        assert!(s.is_countup);
        assert_eq!(s.session_duration, 21_600);
        assert_eq!(s.display_secs(0), 0);
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let s = TimerState::default();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["isRunning"], false);
        assert_eq!(json["sessionType"], "pomodoro");
        assert_eq!(json["timeLeft"], 1500);
        assert!(json.get("category").is_none());
    }

    #[test]
    fn older_records_without_new_fields_load() {
        let json = r#"{
            "isRunning": false, "isCountup": false, "startTime": null,
            "sessionDuration": 1500, "timeLeft": 900, "elapsedTime": 0,
            "category": "work", "sessionType": "pomodoro"
        }"#;
        let s: TimerState = serde_json::from_str(json).unwrap();
        assert_eq!(s.category, Some(FocusCategory::Work));
        assert!(s.sound_enabled);
        assert_eq!(s.planned_duration, None);
        assert_eq!(s.planned_secs(), 1500);
    }

    #[test]
    fn reset_keeps_sound_and_mode() {
        let mut s = TimerState::idle(SessionType::DeepWork, &Presets::default());
        s.sound_enabled = false;
        s.category = Some(FocusCategory::Study);
        s.time_left = 10;
        s.reset(&Presets::default());
        assert_eq!(s.session_type, SessionType::DeepWork);
        assert!(!s.sound_enabled);
        assert_eq!(s.category, None);
        assert_eq!(s.time_left, 3000);
    }

    #[test]
    fn sanitize_repairs_running_without_start() {
        let mut s = TimerState::default();
        s.is_running = true;
        s.time_left = 2000;
        let fixes = s.sanitize(&Presets::default());
        assert!(!s.is_running);
        assert_eq!(s.time_left, 1500);
        assert_eq!(fixes.len(), 2);
    }

    #[test]
    fn sanitize_drops_out_of_range_planned_duration() {
        let presets = Presets::default();
        let mut s = TimerState::default();
        s.category = Some(FocusCategory::Work);
        s.time_left = 0;
        s.planned_duration = Some(100_000_000_000_000_000);
        let fixes = s.sanitize(&presets);
        assert_eq!(fixes, vec!["plannedDuration out of range, dropped"]);
        assert_eq!(s.planned_duration, None);
        assert_eq!(s.planned_secs(), 1500);

        s.planned_duration = Some(60);
        s.sanitize(&presets);
        assert_eq!(s.planned_duration, Some(1500));
    }

    #[test]
    fn sanitize_replaces_absurd_session_duration() {
        let mut s = TimerState::default();
        s.session_duration = u64::MAX;
        s.time_left = u64::MAX;
        s.sanitize(&Presets::default());
        assert_eq!(s.session_duration, 1500);
        assert_eq!(s.time_left, 1500);
    }

    #[test]
    fn shield_attempts_default_to_zero_and_stay_off_the_wire() {
        let s = TimerState::default();
        let json = serde_json::to_value(&s).unwrap();
        assert!(json.get("shieldAttempts").is_none());

        let mut s = s;
        s.shield_attempts = 4;
        let back: TimerState = serde_json::from_value(serde_json::to_value(&s).unwrap()).unwrap();
        assert_eq!(back.shield_attempts, 4);
    }

    #[test]
    fn sanitize_leaves_consistent_state_alone() {
        let mut s = TimerState::default();
        assert!(s.sanitize(&Presets::default()).is_empty());
    }

    #[test]
    fn remaining_uses_live_start_time() {
        let mut s = TimerState::default();
        s.is_running = true;
        s.start_time = Some(1_000);
        assert_eq!(s.remaining_at(1_000 + 600_000), 900);
        s.is_running = false;
        s.start_time = None;
        s.time_left = 42;
        assert_eq!(s.remaining_at(u64::MAX), 42);
    }
}
