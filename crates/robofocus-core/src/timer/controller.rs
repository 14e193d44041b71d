//! Focus session lifecycle.
//!
//! The controller is the single writer of [`TimerState`]. Each intent
//! commits the new state to the store first and only then dispatches side
//! effects as spawned tasks, returned to the caller in a [`Pending`] handle.
//! The one effect awaited inline is lifting the shield on pause and at the
//! end of a session, because its attempt count decides the focus-quality
//! label. Counts from paused segments are banked in the state.
//!
//! ## Phases
//!
//! ```text
//! Idle -> AwaitingIntention -> Running <-> Paused
//!                                 |          |
//!                                 +----------+--> (completed | abandoned | skipped) -> Idle
//! ```
//!
//! Intent methods spawn tasks and must be called from within a Tokio runtime.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::elapsed::{completed_minutes, Clock};
use super::quality::FocusQuality;
use super::session::{FocusCategory, Presets, SessionType};
use super::state::TimerState;
use crate::effects::{Effects, Pending, SessionRecord, SessionStatus, WidgetSnapshot};
use crate::error::ValidationError;
use crate::storage::KvStore;

/// Key the timer state lives under in the kv store.
pub const TIMER_STATE_KEY: &str = "timer_state";

/// Sessions this short are accidental starts and are not recorded.
pub const MIN_RECORDED_SECS: u64 = 10;

/// Completed minutes a work session needs before it earns XP.
pub const MIN_XP_MINUTES: u64 = 25;

pub const BLOCKING_FAILED_MESSAGE: &str = "Focus session started, but apps could not be blocked";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    AwaitingIntention,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StartOutcome {
    Started,
    Resumed,
    AwaitingIntention,
    /// Rejected: a session is already ticking.
    AlreadyRunning,
}

/// How a session is being ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Stop,
    Skip,
    Complete,
}

/// Summary of a session that just ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEnd {
    pub session_id: Uuid,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub planned_secs: u64,
    pub actual_secs: u64,
    pub shield_attempts: Option<u32>,
    pub focus_quality: Option<FocusQuality>,
    /// Long enough to be sent to analytics.
    pub recorded: bool,
    /// Long enough to earn XP and count toward the streak.
    pub rewarded: bool,
}

/// Derived display value. Never written back to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub phase: Phase,
    pub display_secs: u64,
    /// A countdown reached zero or a count-up reached its cap. The caller
    /// decides when to call [`SessionController::complete`].
    pub expired: bool,
}

/// Result of an intent plus the side effects it dispatched.
#[derive(Debug)]
#[must_use]
pub struct Transition<T> {
    pub outcome: T,
    pub pending: Pending,
}

impl<T> Transition<T> {
    fn immediate(outcome: T) -> Self {
        Self {
            outcome,
            pending: Pending::default(),
        }
    }

    /// Waits for the dispatched effects and returns the outcome.
    pub async fn settle(self) -> T {
        self.pending.settle().await;
        self.outcome
    }
}

pub struct SessionController<S: KvStore> {
    store: S,
    clock: Arc<dyn Clock>,
    effects: Effects,
    presets: Presets,
    state: TimerState,
    awaiting_intention: bool,
}

impl<S: KvStore> SessionController<S> {
    /// Loads the persisted state, falling back to defaults when it is
    /// missing or unreadable.
    pub fn new(store: S, clock: Arc<dyn Clock>, effects: Effects, presets: Presets) -> Self {
        let state = load_state(&store, &presets);
        Self {
            store,
            clock,
            effects,
            presets,
            state,
            awaiting_intention: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn presets(&self) -> &Presets {
        &self.presets
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn phase(&self) -> Phase {
        if self.state.is_running {
            Phase::Running
        } else if self.awaiting_intention {
            Phase::AwaitingIntention
        } else if self.state.in_progress() {
            Phase::Paused
        } else {
            Phase::Idle
        }
    }

    pub fn tick(&self) -> Tick {
        let now = self.clock.now_ms();
        let display_secs = self.state.display_secs(now);
        let expired = self.state.is_running
            && if self.state.is_countup {
                display_secs >= self.state.session_duration
            } else {
                display_secs == 0
            };
        Tick {
            phase: self.phase(),
            display_secs,
            expired,
        }
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        self.widget_snapshot(self.state.is_running && self.blocking_applies())
    }

    // ── Intents ──────────────────────────────────────────────────────

    /// Starts, resumes, or asks for an intention first.
    pub fn request_start(&mut self) -> Transition<StartOutcome> {
        if self.state.is_running {
            tracing::debug!("start requested while running; ignored");
            return Transition::immediate(StartOutcome::AlreadyRunning);
        }
        if self.state.session_type == SessionType::Break {
            return self.start_with_intent(None, None);
        }
        if self.state.category.is_some() {
            return self.resume();
        }
        self.awaiting_intention = true;
        Transition::immediate(StartOutcome::AwaitingIntention)
    }

    /// Closes the intention step without starting.
    pub fn cancel_intention(&mut self) {
        self.awaiting_intention = false;
    }

    /// Starts ticking with the captured intention.
    pub fn start_with_intent(
        &mut self,
        category: Option<FocusCategory>,
        task_label: Option<String>,
    ) -> Transition<StartOutcome> {
        if self.state.is_running {
            tracing::debug!("start_with_intent while running; ignored");
            return Transition::immediate(StartOutcome::AlreadyRunning);
        }
        let now = self.clock.now_ms();
        self.awaiting_intention = false;

        let is_break = self.state.session_type == SessionType::Break;
        let s = &mut self.state;
        if s.session_id.is_none() {
            s.session_id = Some(Uuid::new_v4());
            if !s.is_countup {
                s.planned_duration = Some(s.time_left);
            }
        }
        s.is_running = true;
        if s.is_countup {
            s.session_duration = self.presets.countup_cap_secs;
            s.start_time = Some(now.saturating_sub(s.elapsed_time.saturating_mul(1000)));
        } else {
            s.session_duration = s.time_left;
            s.start_time = Some(now);
        }
        s.category = if is_break { None } else { category };
        s.task_label = if is_break {
            None
        } else {
            task_label
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
        };

        tracing::info!(
            session_type = %self.state.session_type,
            duration_secs = self.state.session_duration,
            category = ?self.state.category,
            "focus session started"
        );
        self.persist();
        Transition {
            outcome: StartOutcome::Started,
            pending: self.dispatch_start(now),
        }
    }

    fn resume(&mut self) -> Transition<StartOutcome> {
        let now = self.clock.now_ms();
        self.awaiting_intention = false;
        let consumed = self.state.consumed_before_resume();
        let s = &mut self.state;
        s.start_time = Some(now.saturating_sub(consumed.saturating_mul(1000)));
        s.is_running = true;
        if s.session_id.is_none() {
            s.session_id = Some(Uuid::new_v4());
        }

        tracing::info!(
            session_type = %self.state.session_type,
            already_elapsed_secs = consumed,
            "focus session resumed"
        );
        self.persist();
        Transition {
            outcome: StartOutcome::Resumed,
            pending: self.dispatch_start(now),
        }
    }

    /// Freezes the session. Returns the seconds on the timer face, or
    /// `None` if nothing was running.
    pub async fn pause(&mut self) -> Transition<Option<u64>> {
        if !self.state.is_running {
            tracing::debug!("pause requested while not running; ignored");
            return Transition::immediate(None);
        }
        let now = self.clock.now_ms();
        let s = &mut self.state;
        if s.is_countup {
            s.elapsed_time = s.countup_elapsed_at(now);
        } else {
            s.time_left = s.remaining_at(now);
        }
        s.is_running = false;
        s.start_time = None;
        let shown = s.display_secs(now);

        tracing::info!(display_secs = shown, "focus session paused");
        self.persist();

        let mut pending = Pending::default();
        self.spawn_widget_sync(&mut pending, false);
        let notifications = self.effects.notifications.clone();
        pending.spawn(async move {
            if let Err(e) = notifications.cancel_completion().await {
                tracing::warn!(error = %e, "failed to cancel completion notification");
            }
        });
        if self.blocking_applies() {
            match self.effects.blocking.stop().await {
                Ok(stopped) => {
                    tracing::debug!(
                        shield_attempts = stopped.shield_attempts,
                        "apps unblocked for pause"
                    );
                    if stopped.shield_attempts > 0 {
                        self.state.shield_attempts = self
                            .state
                            .shield_attempts
                            .saturating_add(stopped.shield_attempts);
                        self.persist();
                    }
                }
                // A shield left up keeps counting and is read again at the end.
                Err(e) => tracing::warn!(error = %e, "failed to unblock apps on pause"),
            }
        }
        Transition {
            outcome: Some(shown),
            pending,
        }
    }

    /// Ends the session early. Recorded as `completed` when a countdown
    /// already hit zero or for open count-up focus, otherwise `abandoned`.
    pub async fn stop(&mut self) -> Transition<Option<SessionEnd>> {
        self.finish(Ending::Stop).await
    }

    /// Ends the session as `skipped`. Qualifying work sessions still earn
    /// XP and extend the streak.
    pub async fn skip(&mut self) -> Transition<Option<SessionEnd>> {
        self.finish(Ending::Skip).await
    }

    /// Ends a session whose timer ran out.
    pub async fn complete(&mut self) -> Transition<Option<SessionEnd>> {
        self.finish(Ending::Complete).await
    }

    pub fn toggle_sound(&mut self) -> bool {
        self.state.sound_enabled = !self.state.sound_enabled;
        self.persist();
        self.state.sound_enabled
    }

    /// Switches mode. Only allowed when no session is in progress.
    pub fn select_session_type(&mut self, session_type: SessionType) -> Result<(), ValidationError> {
        if self.state.in_progress() {
            if session_type == self.state.session_type {
                return Ok(());
            }
            return Err(ValidationError::SessionInProgress {
                current: self.state.session_type,
                requested: session_type,
            });
        }
        let sound_enabled = self.state.sound_enabled;
        self.state = TimerState::idle(session_type, &self.presets);
        self.state.sound_enabled = sound_enabled;
        self.awaiting_intention = false;
        self.persist();
        Ok(())
    }

    /// Lifts a shield left up by a session that ended without managing to
    /// stop it. Returns true when a repair was made.
    pub async fn guard_orphaned_blocking(&self) -> bool {
        if self.state.is_running && self.blocking_applies() {
            return false;
        }
        match self.effects.blocking.is_active().await {
            Ok(true) => {
                tracing::warn!("shield active with no running session; lifting it");
                match self.effects.blocking.stop().await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to lift orphaned shield");
                        false
                    }
                }
            }
            Ok(false) => false,
            Err(e) => {
                tracing::debug!(error = %e, "could not query shield state");
                false
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    async fn finish(&mut self, ending: Ending) -> Transition<Option<SessionEnd>> {
        self.awaiting_intention = false;
        if !self.state.in_progress() {
            tracing::debug!(?ending, "no session to end");
            return Transition::immediate(None);
        }

        let now = self.clock.now_ms();
        let ended = self.state.clone();
        let planned_secs;
        let actual_secs;
        let reached_end;
        if ended.is_countup {
            actual_secs = ended.countup_elapsed_at(now);
            planned_secs = actual_secs;
            reached_end = true;
        } else {
            let remaining = ended.remaining_at(now);
            planned_secs = ended.planned_secs();
            actual_secs = planned_secs.saturating_sub(remaining);
            reached_end = remaining == 0;
        }
        let status = match ending {
            Ending::Stop if reached_end => SessionStatus::Completed,
            Ending::Stop => SessionStatus::Abandoned,
            Ending::Skip => SessionStatus::Skipped,
            Ending::Complete => SessionStatus::Completed,
        };

        self.state.reset(&self.presets);
        self.persist();
        tracing::info!(
            status = status.as_str(),
            session_type = %ended.session_type,
            actual_secs,
            "focus session ended"
        );

        let mut pending = Pending::default();
        self.spawn_widget_sync(&mut pending, false);
        let notifications = self.effects.notifications.clone();
        pending.spawn(async move {
            if let Err(e) = notifications.cancel_completion().await {
                tracing::warn!(error = %e, "failed to cancel completion notification");
            }
        });

        // The shield counts as down from here on even if the native call
        // fails; the orphan guard lifts it later.
        let blocking_configured =
            ended.session_type.is_work() && self.effects.blocking.is_configured();
        let shield_attempts = if blocking_configured {
            match self.effects.blocking.stop().await {
                Ok(stopped) => Some(ended.shield_attempts.saturating_add(stopped.shield_attempts)),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to stop app blocking");
                    None
                }
            }
        } else {
            None
        };
        let focus_quality = FocusQuality::classify(blocking_configured, shield_attempts);

        let minutes = completed_minutes(actual_secs);
        let rewarded =
            ending != Ending::Stop && ended.session_type.is_work() && minutes >= MIN_XP_MINUTES;
        let recorded = actual_secs > MIN_RECORDED_SECS;
        let session_id = ended.session_id.unwrap_or_else(Uuid::new_v4);

        let ended_at = DateTime::from_timestamp_millis(now as i64).unwrap_or_else(Utc::now);
        let mut record = SessionRecord {
            session_id,
            session_type: ended.session_type,
            planned_secs,
            actual_secs,
            status,
            xp_earned: 0,
            category: ended.category,
            task_label: ended.task_label.clone(),
            shield_attempts,
            focus_quality,
            blocking_configured,
            started_at: i64::try_from(actual_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|d| ended_at.checked_sub_signed(d))
                .unwrap_or(ended_at),
            ended_at,
        };

        if rewarded || recorded {
            let rewards = self.effects.rewards.clone();
            let analytics = self.effects.analytics.clone();
            pending.spawn(async move {
                if rewarded {
                    match rewards.award_xp(minutes).await {
                        Ok(award) => record.xp_earned = award.xp_gained,
                        Err(e) => tracing::warn!(error = %e, minutes, "failed to award XP"),
                    }
                }
                if recorded {
                    if let Err(e) = analytics.record_session(record).await {
                        tracing::error!(error = %e, "failed to record session analytics");
                    }
                }
            });
        } else {
            tracing::debug!(actual_secs, "session too short to record");
        }

        if rewarded {
            let rewards = self.effects.rewards.clone();
            let notifications = self.effects.notifications.clone();
            pending.spawn(async move {
                match rewards.record_streak_session().await {
                    Ok(Some(milestone)) => {
                        if let Err(e) = notifications.celebrate(milestone).await {
                            tracing::warn!(error = %e, "failed to send streak celebration");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(error = %e, "failed to update streak"),
                }
            });
        }

        Transition {
            outcome: Some(SessionEnd {
                session_id,
                session_type: ended.session_type,
                status,
                planned_secs,
                actual_secs,
                shield_attempts,
                focus_quality,
                recorded,
                rewarded,
            }),
            pending,
        }
    }

    fn dispatch_start(&self, now: u64) -> Pending {
        let mut pending = Pending::default();
        let blocking_applies = self.blocking_applies();
        self.spawn_widget_sync(&mut pending, blocking_applies);

        if blocking_applies {
            let blocking = self.effects.blocking.clone();
            let alerts = self.effects.alerts.clone();
            pending.spawn(async move {
                match blocking.start().await {
                    Ok(started) => tracing::info!(
                        apps = started.apps_blocked,
                        categories = started.categories_blocked,
                        domains = started.domains_blocked,
                        "focus shield up"
                    ),
                    Err(e) => {
                        tracing::warn!(error = %e, "app blocking failed; session continues");
                        alerts.warn(BLOCKING_FAILED_MESSAGE);
                    }
                }
            });
        }

        let in_secs = if self.state.is_countup {
            self.state
                .session_duration
                .saturating_sub(self.state.countup_elapsed_at(now))
        } else {
            self.state.remaining_at(now)
        };
        if in_secs > 0 {
            let notifications = self.effects.notifications.clone();
            let session_type = self.state.session_type;
            pending.spawn(async move {
                if let Err(e) = notifications.schedule_completion(in_secs, session_type).await {
                    tracing::warn!(error = %e, "failed to schedule completion notification");
                }
            });
        }
        pending
    }

    fn spawn_widget_sync(&self, pending: &mut Pending, shield_active: bool) {
        let snapshot = self.widget_snapshot(shield_active);
        let widget = self.effects.widget.clone();
        pending.spawn(async move {
            if let Err(e) = widget.sync(snapshot).await {
                tracing::warn!(error = %e, "widget sync failed");
            }
        });
    }

    fn widget_snapshot(&self, shield_active: bool) -> WidgetSnapshot {
        let s = &self.state;
        WidgetSnapshot {
            session_type: s.session_type,
            is_running: s.is_running,
            is_countup: s.is_countup,
            start_time: s.start_time,
            session_duration: s.session_duration,
            display_secs: s.display_secs(self.clock.now_ms()),
            category: s.category,
            task_label: s.task_label.clone(),
            shield_active,
        }
    }

    fn blocking_applies(&self) -> bool {
        self.state.session_type.is_work() && self.effects.blocking.is_configured()
    }

    fn persist(&self) {
        match serde_json::to_string(&self.state) {
            Ok(json) => {
                if let Err(e) = self.store.kv_set(TIMER_STATE_KEY, &json) {
                    tracing::error!(error = %e, "failed to persist timer state");
                }
            }
            Err(e) => tracing::error!(error = %e, "failed to serialize timer state"),
        }
    }
}

/// Reads the timer state from `store`. Missing or malformed records yield
/// an idle pomodoro.
pub fn load_state<S: KvStore>(store: &S, presets: &Presets) -> TimerState {
    let mut state = match store.kv_get(TIMER_STATE_KEY) {
        Ok(Some(json)) => match serde_json::from_str::<TimerState>(&json) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "malformed timer state; using defaults");
                return TimerState::idle(SessionType::default(), presets);
            }
        },
        Ok(None) => return TimerState::idle(SessionType::default(), presets),
        Err(e) => {
            tracing::error!(error = %e, "failed to read timer state; using defaults");
            return TimerState::idle(SessionType::default(), presets);
        }
    };

    for fix in state.sanitize(presets) {
        tracing::warn!(fix, "repaired persisted timer state");
    }
    // Idle records follow preset changes made since they were written.
    if !state.in_progress() {
        state.reset(presets);
    }
    state
}
