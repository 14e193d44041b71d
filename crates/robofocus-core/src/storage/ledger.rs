//! On-device analytics, XP and streak bookkeeping.
//!
//! `LocalLedger` backs the analytics, reward and notification capabilities
//! with the SQLite database. The scheduled completion notification is kept
//! in the kv table so it outlives the process that scheduled it; whatever
//! delivers notifications on the platform polls [`LocalLedger::due_notification`].

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Database;
use crate::effects::{
    AnalyticsRecorder, NotificationScheduler, RewardLedger, SessionRecord, StreakMilestone, XpAward,
};
use crate::error::{DatabaseError, EffectError};
use crate::timer::{Clock, SessionType};

const STREAK_KEY: &str = "streak";
const NOTIFICATION_KEY: &str = "pending_notification";
const CELEBRATION_KEY: &str = "last_celebration";

pub const XP_PER_MINUTE: u64 = 1;
pub const XP_PER_LEVEL: u64 = 500;

/// Streak lengths (days) that trigger a celebration.
pub const STREAK_MILESTONES: [u32; 6] = [3, 7, 14, 30, 60, 100];

pub fn xp_for_minutes(minutes: u64) -> u64 {
    minutes.saturating_mul(XP_PER_MINUTE)
}

pub fn level_for_xp(total_xp: u64) -> u64 {
    1 + total_xp / XP_PER_LEVEL
}

/// Consecutive days with at least one qualifying session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub current: u32,
    pub longest: u32,
    pub last_day: Option<NaiveDate>,
}

impl Streak {
    /// Counts a qualifying session on `day`. Returns a milestone when the
    /// streak grows onto one of [`STREAK_MILESTONES`].
    pub fn record(&mut self, day: NaiveDate) -> Option<StreakMilestone> {
        match self.last_day {
            Some(last) if last == day => return None,
            Some(last) if last.succ_opt() == Some(day) => self.current += 1,
            // A clock moved backwards keeps the streak as it is.
            Some(last) if last > day => return None,
            _ => self.current = 1,
        }
        self.last_day = Some(day);
        self.longest = self.longest.max(self.current);
        STREAK_MILESTONES
            .contains(&self.current)
            .then_some(StreakMilestone { days: self.current })
    }

    /// The streak as of `today`: broken if the last session is older
    /// than yesterday.
    pub fn as_of(&self, today: NaiveDate) -> u32 {
        match self.last_day {
            Some(last) if last == today || last.succ_opt() == Some(today) => self.current,
            _ => 0,
        }
    }
}

/// A completion notification waiting to fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledNotification {
    pub fire_at_ms: u64,
    pub session_type: SessionType,
}

pub struct LocalLedger {
    db: Mutex<Database>,
    clock: Arc<dyn Clock>,
}

impl LocalLedger {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            db: Mutex::new(db),
            clock,
        }
    }

    fn db(&self) -> Result<MutexGuard<'_, Database>, EffectError> {
        self.db
            .lock()
            .map_err(|_| EffectError::failed("ledger", "database lock poisoned"))
    }

    fn today(&self) -> NaiveDate {
        DateTime::from_timestamp_millis(self.clock.now_ms() as i64)
            .map(|t| t.with_timezone(&Local).date_naive())
            .unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn streak(&self) -> Result<Streak, EffectError> {
        let db = self.db()?;
        read_json(&db, STREAK_KEY).map(Option::unwrap_or_default)
    }

    pub fn current_streak(&self) -> Result<u32, EffectError> {
        Ok(self.streak()?.as_of(self.today()))
    }

    pub fn total_xp(&self) -> Result<u64, EffectError> {
        Ok(self.db()?.total_xp()?)
    }

    pub fn scheduled_notification(&self) -> Result<Option<ScheduledNotification>, EffectError> {
        let db = self.db()?;
        read_json(&db, NOTIFICATION_KEY)
    }

    /// Takes the scheduled notification if its time has come.
    pub fn due_notification(&self) -> Result<Option<ScheduledNotification>, EffectError> {
        let db = self.db()?;
        let pending: Option<ScheduledNotification> = read_json(&db, NOTIFICATION_KEY)?;
        match pending {
            Some(n) if n.fire_at_ms <= self.clock.now_ms() => {
                db.kv_delete(NOTIFICATION_KEY)?;
                Ok(Some(n))
            }
            _ => Ok(None),
        }
    }

    pub fn last_celebration(&self) -> Result<Option<StreakMilestone>, EffectError> {
        let db = self.db()?;
        read_json(&db, CELEBRATION_KEY)
    }

    pub fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T, DatabaseError>) -> Result<T, EffectError> {
        let db = self.db()?;
        Ok(f(&db)?)
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(db: &Database, key: &str) -> Result<Option<T>, EffectError> {
    match db.kv_get(key)? {
        Some(json) => serde_json::from_str(&json).map(Some).map_err(|e| {
            EffectError::Database(DatabaseError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })
        }),
        None => Ok(None),
    }
}

fn write_json<T: Serialize>(db: &Database, key: &str, value: &T) -> Result<(), EffectError> {
    db.kv_set(key, &serde_json::to_string(value)?)?;
    Ok(())
}

#[async_trait]
impl AnalyticsRecorder for LocalLedger {
    async fn record_session(&self, record: SessionRecord) -> Result<(), EffectError> {
        self.db()?.insert_session(&record)?;
        tracing::debug!(session_id = %record.session_id, status = record.status.as_str(), "session recorded");
        Ok(())
    }
}

#[async_trait]
impl RewardLedger for LocalLedger {
    async fn award_xp(&self, minutes: u64) -> Result<XpAward, EffectError> {
        let xp_gained = xp_for_minutes(minutes);
        let at = DateTime::from_timestamp_millis(self.clock.now_ms() as i64).unwrap_or_else(Utc::now);
        self.db()?.record_xp(minutes, xp_gained, at)?;
        tracing::info!(minutes, xp_gained, "XP awarded");
        Ok(XpAward { xp_gained })
    }

    async fn record_streak_session(&self) -> Result<Option<StreakMilestone>, EffectError> {
        let today = self.today();
        let db = self.db()?;
        // An unreadable streak restarts rather than blocking every future update.
        let mut streak: Streak = read_json(&db, STREAK_KEY)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "streak record unreadable; starting over");
                None
            })
            .unwrap_or_default();
        let milestone = streak.record(today);
        write_json(&db, STREAK_KEY, &streak)?;
        Ok(milestone)
    }
}

#[async_trait]
impl NotificationScheduler for LocalLedger {
    async fn schedule_completion(
        &self,
        in_secs: u64,
        session_type: SessionType,
    ) -> Result<(), EffectError> {
        let pending = ScheduledNotification {
            fire_at_ms: self.clock.now_ms().saturating_add(in_secs.saturating_mul(1000)),
            session_type,
        };
        write_json(&*self.db()?, NOTIFICATION_KEY, &pending)
    }

    async fn cancel_completion(&self) -> Result<(), EffectError> {
        self.db()?.kv_delete(NOTIFICATION_KEY)?;
        Ok(())
    }

    async fn celebrate(&self, milestone: StreakMilestone) -> Result<(), EffectError> {
        tracing::info!(days = milestone.days, "streak milestone reached");
        write_json(&*self.db()?, CELEBRATION_KEY, &milestone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualClock;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn streak_grows_on_consecutive_days() {
        let mut s = Streak::default();
        assert_eq!(s.record(day(2026, 3, 1)), None);
        assert_eq!(s.record(day(2026, 3, 1)), None);
        assert_eq!(s.record(day(2026, 3, 2)), None);
        assert_eq!(s.record(day(2026, 3, 3)), Some(StreakMilestone { days: 3 }));
        assert_eq!(s.current, 3);
        assert_eq!(s.longest, 3);
    }

    #[test]
    fn streak_resets_after_gap() {
        let mut s = Streak::default();
        s.record(day(2026, 3, 1));
        s.record(day(2026, 3, 2));
        s.record(day(2026, 3, 5));
        assert_eq!(s.current, 1);
        assert_eq!(s.longest, 2);
        assert_eq!(s.as_of(day(2026, 3, 6)), 1);
        assert_eq!(s.as_of(day(2026, 3, 8)), 0);
    }

    #[test]
    fn level_steps_every_500_xp() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(499), 1);
        assert_eq!(level_for_xp(500), 2);
    }

    #[tokio::test]
    async fn award_xp_accumulates() {
        let ledger = LocalLedger::new(Database::open_memory().unwrap(), Arc::new(ManualClock::new(0)));
        assert_eq!(ledger.award_xp(25).await.unwrap().xp_gained, 25);
        ledger.award_xp(30).await.unwrap();
        assert_eq!(ledger.total_xp().unwrap(), 55);
    }

    #[tokio::test]
    async fn completion_notification_survives_until_due() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let ledger = LocalLedger::new(Database::open_memory().unwrap(), clock.clone());
        ledger
            .schedule_completion(60, SessionType::Pomodoro)
            .await
            .unwrap();
        assert!(ledger.due_notification().unwrap().is_none());
        assert!(ledger.scheduled_notification().unwrap().is_some());

        clock.advance_secs(60);
        let due = ledger.due_notification().unwrap().unwrap();
        assert_eq!(due.session_type, SessionType::Pomodoro);
        assert!(ledger.scheduled_notification().unwrap().is_none());
    }

    #[tokio::test]
    async fn far_future_notification_saturates() {
        let ledger = LocalLedger::new(Database::open_memory().unwrap(), Arc::new(ManualClock::new(5_000)));
        ledger
            .schedule_completion(u64::MAX, SessionType::DeepWork)
            .await
            .unwrap();
        let scheduled = ledger.scheduled_notification().unwrap().unwrap();
        assert_eq!(scheduled.fire_at_ms, u64::MAX);
        assert!(ledger.due_notification().unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_removes_scheduled_notification() {
        let ledger = LocalLedger::new(Database::open_memory().unwrap(), Arc::new(ManualClock::new(0)));
        ledger.schedule_completion(10, SessionType::Break).await.unwrap();
        ledger.cancel_completion().await.unwrap();
        assert!(ledger.scheduled_notification().unwrap().is_none());
    }

    #[tokio::test]
    async fn streak_session_is_persisted() {
        let clock = Arc::new(ManualClock::new(1_780_000_000_000));
        let ledger = LocalLedger::new(Database::open_memory().unwrap(), clock.clone());
        assert_eq!(ledger.record_streak_session().await.unwrap(), None);
        assert_eq!(ledger.streak().unwrap().current, 1);
        assert_eq!(ledger.current_streak().unwrap(), 1);
    }
}
