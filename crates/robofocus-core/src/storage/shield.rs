//! File-backed Focus Shield.
//!
//! The shield state lives in `shield.json`. An enforcer outside this crate
//! (hosts-file helper, browser extension, OS screen-time bridge) watches the
//! file, blocks what it lists while `active` is true, and reports each
//! blocked launch through [`ShieldFile::record_attempt`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BlockingConfig;
use crate::effects::{BlockingCoordinator, BlockingStarted, BlockingStopped};
use crate::error::EffectError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShieldState {
    pub active: bool,
    #[serde(default)]
    pub apps: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shield_attempts: u32,
}

pub struct ShieldFile {
    path: PathBuf,
    blocklist: BlockingConfig,
}

impl ShieldFile {
    pub fn new(path: impl Into<PathBuf>, blocklist: BlockingConfig) -> Self {
        Self {
            path: path.into(),
            blocklist,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<ShieldState, EffectError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ShieldState::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, state: &ShieldState) -> Result<(), EffectError> {
        std::fs::write(&self.path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }

    /// Counts one blocked launch. Ignored while the shield is down.
    pub fn record_attempt(&self) -> Result<u32, EffectError> {
        let mut state = self.read()?;
        if !state.active {
            return Ok(state.shield_attempts);
        }
        state.shield_attempts += 1;
        self.write(&state)?;
        Ok(state.shield_attempts)
    }
}

#[async_trait]
impl BlockingCoordinator for ShieldFile {
    fn is_configured(&self) -> bool {
        self.blocklist.is_configured()
    }

    async fn start(&self) -> Result<BlockingStarted, EffectError> {
        if !self.is_configured() {
            return Err(EffectError::NotConfigured {
                service: "focus shield".into(),
            });
        }
        let previous = self.read().unwrap_or_default();
        let state = ShieldState {
            active: true,
            apps: self.blocklist.apps.clone(),
            categories: self.blocklist.categories.clone(),
            domains: self.blocklist.domains.clone(),
            activated_at: Some(Utc::now()),
            // Raising an already-active shield keeps its count.
            shield_attempts: if previous.active { previous.shield_attempts } else { 0 },
        };
        self.write(&state)?;
        Ok(BlockingStarted {
            apps_blocked: state.apps.len() as u32,
            categories_blocked: state.categories.len() as u32,
            domains_blocked: state.domains.len() as u32,
        })
    }

    async fn stop(&self) -> Result<BlockingStopped, EffectError> {
        let mut state = self.read()?;
        let shield_attempts = state.shield_attempts;
        state.active = false;
        state.activated_at = None;
        state.shield_attempts = 0;
        self.write(&state)?;
        Ok(BlockingStopped { shield_attempts })
    }

    async fn is_active(&self) -> Result<bool, EffectError> {
        Ok(self.read()?.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocklist() -> BlockingConfig {
        BlockingConfig {
            enabled: true,
            apps: vec!["com.example.social".into(), "com.example.game".into()],
            categories: vec![],
            domains: vec!["video.example".into()],
        }
    }

    #[tokio::test]
    async fn start_counts_and_stop_reports_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let shield = ShieldFile::new(dir.path().join("shield.json"), blocklist());

        let started = shield.start().await.unwrap();
        assert_eq!(started.apps_blocked, 2);
        assert_eq!(started.domains_blocked, 1);
        assert!(shield.is_active().await.unwrap());

        shield.record_attempt().unwrap();
        shield.record_attempt().unwrap();
        let stopped = shield.stop().await.unwrap();
        assert_eq!(stopped.shield_attempts, 2);
        assert!(!shield.is_active().await.unwrap());
    }

    #[tokio::test]
    async fn attempts_are_ignored_while_down() {
        let dir = tempfile::tempdir().unwrap();
        let shield = ShieldFile::new(dir.path().join("shield.json"), blocklist());
        assert_eq!(shield.record_attempt().unwrap(), 0);
        assert_eq!(shield.stop().await.unwrap().shield_attempts, 0);
    }

    #[tokio::test]
    async fn unconfigured_shield_refuses_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let shield = ShieldFile::new(dir.path().join("shield.json"), BlockingConfig::default());
        assert!(!shield.is_configured());
        let err = shield.start().await.unwrap_err();
        assert!(matches!(err, EffectError::NotConfigured { .. }));
        assert!(!dir.path().join("shield.json").exists());
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shield.json");
        std::fs::write(&path, "{not json").unwrap();
        let shield = ShieldFile::new(path, blocklist());
        assert!(shield.is_active().await.is_err());
    }
}
