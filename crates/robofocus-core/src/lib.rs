//! # RoboFocus Core Library
//!
//! The focus session engine behind RoboFocus: a wall-clock timer state
//! machine for pomodoro, deep-work, break and open (count-up) sessions, and
//! the coordination of everything a session touches on the way (app
//! blocking, analytics, XP and streaks, notifications, widgets).
//!
//! ## Architecture
//!
//! - **Timer**: persisted [`TimerState`], pure elapsed-time arithmetic, and
//!   the [`SessionController`] that owns and mutates the state
//! - **Effects**: async capability traits the controller drives, each
//!   allowed to fail without aborting a timer transition
//! - **Storage**: SQLite kv/session/XP storage, TOML configuration, and
//!   file-backed shield and widget adapters
//!
//! ## Key Components
//!
//! - [`SessionController`]: the session lifecycle
//! - [`Effects`]: the bundle of side-effect coordinators
//! - [`Database`]: session, XP and kv persistence
//! - [`Config`]: user preferences

pub mod effects;
pub mod error;
pub mod storage;
pub mod timer;

pub use effects::{Effects, Pending, SessionRecord, SessionStatus};
pub use error::{ConfigError, CoreError, DatabaseError, EffectError, ValidationError};
pub use storage::{Config, Database, KvStore, LocalLedger, MemoryStore, ShieldFile, WidgetFile};
pub use timer::{
    FocusCategory, FocusQuality, Phase, Presets, SessionController, SessionEnd, SessionType,
    StartOutcome, Tick, TimerState,
};
