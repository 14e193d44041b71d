//! Capabilities the session controller drives but does not implement.
//!
//! Every coordinator may fail. The controller wraps each call on its own so
//! that one degraded integration cannot stop the others or undo a timer
//! transition that has already been committed.

mod noop;

pub use noop::Noop;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::EffectError;
use crate::timer::{FocusCategory, FocusQuality, SessionType};

/// What the blocker reports after activating the shield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingStarted {
    pub apps_blocked: u32,
    pub categories_blocked: u32,
    pub domains_blocked: u32,
}

/// What the blocker reports after lifting the shield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingStopped {
    /// Times the user tried to open a blocked app during the session.
    pub shield_attempts: u32,
}

/// App and website blocking ("Focus Shield").
#[async_trait]
pub trait BlockingCoordinator: Send + Sync {
    /// Whether the user has chosen anything to block.
    fn is_configured(&self) -> bool;

    async fn start(&self) -> Result<BlockingStarted, EffectError>;

    async fn stop(&self) -> Result<BlockingStopped, EffectError>;

    /// Whether the native shield is currently up.
    async fn is_active(&self) -> Result<bool, EffectError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Completed,
    Abandoned,
    Skipped,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
            SessionStatus::Skipped => "skipped",
        }
    }
}

/// One finished session, as handed to analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub session_type: SessionType,
    pub planned_secs: u64,
    pub actual_secs: u64,
    pub status: SessionStatus,
    pub xp_earned: u64,
    pub category: Option<FocusCategory>,
    pub task_label: Option<String>,
    pub shield_attempts: Option<u32>,
    pub focus_quality: Option<FocusQuality>,
    pub blocking_configured: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

#[async_trait]
pub trait AnalyticsRecorder: Send + Sync {
    async fn record_session(&self, record: SessionRecord) -> Result<(), EffectError>;
}

/// Reached when a daily streak hits one of the celebrated lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakMilestone {
    pub days: u32,
}

/// Local notifications. Scheduled ones must survive process termination.
#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    async fn schedule_completion(
        &self,
        in_secs: u64,
        session_type: SessionType,
    ) -> Result<(), EffectError>;

    async fn cancel_completion(&self) -> Result<(), EffectError>;

    async fn celebrate(&self, milestone: StreakMilestone) -> Result<(), EffectError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpAward {
    pub xp_gained: u64,
}

/// XP and streak bookkeeping.
#[async_trait]
pub trait RewardLedger: Send + Sync {
    async fn award_xp(&self, minutes: u64) -> Result<XpAward, EffectError>;

    async fn record_streak_session(&self) -> Result<Option<StreakMilestone>, EffectError>;
}

/// What home-screen widgets and status bars render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub session_type: SessionType,
    pub is_running: bool,
    pub is_countup: bool,
    pub start_time: Option<u64>,
    pub session_duration: u64,
    pub display_secs: u64,
    pub category: Option<FocusCategory>,
    pub task_label: Option<String>,
    pub shield_active: bool,
}

#[async_trait]
pub trait WidgetSync: Send + Sync {
    async fn sync(&self, snapshot: WidgetSnapshot) -> Result<(), EffectError>;
}

/// Short, non-blocking messages to the user (toasts).
pub trait UserAlerts: Send + Sync {
    fn warn(&self, message: &str);
}

/// The full set of coordinators handed to the controller.
#[derive(Clone)]
pub struct Effects {
    pub blocking: Arc<dyn BlockingCoordinator>,
    pub analytics: Arc<dyn AnalyticsRecorder>,
    pub notifications: Arc<dyn NotificationScheduler>,
    pub rewards: Arc<dyn RewardLedger>,
    pub widget: Arc<dyn WidgetSync>,
    pub alerts: Arc<dyn UserAlerts>,
}

impl Effects {
    /// Every capability wired to [`Noop`].
    pub fn noop() -> Self {
        let noop = Arc::new(Noop);
        Self {
            blocking: noop.clone(),
            analytics: noop.clone(),
            notifications: noop.clone(),
            rewards: noop.clone(),
            widget: noop.clone(),
            alerts: noop,
        }
    }

    pub fn with_blocking(mut self, blocking: Arc<dyn BlockingCoordinator>) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsRecorder>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_notifications(mut self, notifications: Arc<dyn NotificationScheduler>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn with_rewards(mut self, rewards: Arc<dyn RewardLedger>) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn with_widget(mut self, widget: Arc<dyn WidgetSync>) -> Self {
        self.widget = widget;
        self
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn UserAlerts>) -> Self {
        self.alerts = alerts;
        self
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::noop()
    }
}

/// Side-effect tasks dispatched by one transition.
///
/// Dropping this detaches the tasks; they keep running on the runtime.
/// Short-lived callers (the CLI, tests) call [`Pending::settle`] so the
/// process does not exit before the effects land.
#[derive(Debug, Default)]
#[must_use = "call settle() before the runtime shuts down, or drop to detach"]
pub struct Pending {
    tasks: Vec<JoinHandle<()>>,
}

impl Pending {
    pub(crate) fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn extend(&mut self, other: Pending) {
        self.tasks.extend(other.tasks);
    }

    /// Waits for every dispatched effect. Panicked tasks are logged.
    pub async fn settle(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "side-effect task panicked");
            }
        }
    }
}
