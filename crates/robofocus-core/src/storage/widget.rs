use std::path::PathBuf;

use async_trait::async_trait;

use crate::effects::{WidgetSnapshot, WidgetSync};
use crate::error::EffectError;

/// Writes the latest snapshot to `widget.json` for status bars and
/// desktop widgets to pick up.
pub struct WidgetFile {
    path: PathBuf,
}

impl WidgetFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl WidgetSync for WidgetFile {
    async fn sync(&self, snapshot: WidgetSnapshot) -> Result<(), EffectError> {
        let json = serde_json::to_string_pretty(&snapshot)?;
        // Write-then-rename so readers never see a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::SessionType;

    #[tokio::test]
    async fn sync_overwrites_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget.json");
        let widget = WidgetFile::new(&path);

        let mut snapshot = WidgetSnapshot {
            session_type: SessionType::Pomodoro,
            is_running: true,
            is_countup: false,
            start_time: Some(1_000),
            session_duration: 1500,
            display_secs: 1500,
            category: None,
            task_label: None,
            shield_active: true,
        };
        widget.sync(snapshot.clone()).await.unwrap();
        snapshot.is_running = false;
        snapshot.shield_active = false;
        widget.sync(snapshot).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["isRunning"], false);
        assert_eq!(json["shieldActive"], false);
        assert_eq!(json["sessionType"], "pomodoro");
    }
}
