use async_trait::async_trait;

use super::{
    AnalyticsRecorder, BlockingCoordinator, BlockingStarted, BlockingStopped,
    NotificationScheduler, RewardLedger, SessionRecord, StreakMilestone, UserAlerts, WidgetSnapshot,
    WidgetSync, XpAward,
};
use crate::error::EffectError;
use crate::timer::SessionType;

/// Accepts every request and does nothing. Blocking reports itself as
/// unconfigured, so sessions driven through it never get a focus-quality
/// label.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

#[async_trait]
impl BlockingCoordinator for Noop {
    fn is_configured(&self) -> bool {
        false
    }

    async fn start(&self) -> Result<BlockingStarted, EffectError> {
        Err(EffectError::NotConfigured {
            service: "blocking".into(),
        })
    }

    async fn stop(&self) -> Result<BlockingStopped, EffectError> {
        Ok(BlockingStopped::default())
    }

    async fn is_active(&self) -> Result<bool, EffectError> {
        Ok(false)
    }
}

#[async_trait]
impl AnalyticsRecorder for Noop {
    async fn record_session(&self, _record: SessionRecord) -> Result<(), EffectError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationScheduler for Noop {
    async fn schedule_completion(
        &self,
        _in_secs: u64,
        _session_type: SessionType,
    ) -> Result<(), EffectError> {
        Ok(())
    }

    async fn cancel_completion(&self) -> Result<(), EffectError> {
        Ok(())
    }

    async fn celebrate(&self, _milestone: StreakMilestone) -> Result<(), EffectError> {
        Ok(())
    }
}

#[async_trait]
impl RewardLedger for Noop {
    async fn award_xp(&self, _minutes: u64) -> Result<XpAward, EffectError> {
        Ok(XpAward::default())
    }

    async fn record_streak_session(&self) -> Result<Option<StreakMilestone>, EffectError> {
        Ok(None)
    }
}

#[async_trait]
impl WidgetSync for Noop {
    async fn sync(&self, _snapshot: WidgetSnapshot) -> Result<(), EffectError> {
        Ok(())
    }
}

impl UserAlerts for Noop {
    fn warn(&self, message: &str) {
        tracing::warn!(message, "user alert");
    }
}
