mod controller;
mod elapsed;
mod quality;
mod session;
mod state;

pub use controller::{
    load_state, Phase, SessionController, SessionEnd, StartOutcome, Tick, Transition,
    BLOCKING_FAILED_MESSAGE, MIN_RECORDED_SECS, MIN_XP_MINUTES, TIMER_STATE_KEY,
};
pub use elapsed::{
    completed_minutes, compute_countup_elapsed, compute_elapsed, compute_remaining, format_clock,
    Clock, ManualClock, SystemClock,
};
pub use quality::FocusQuality;
pub use session::{FocusCategory, Presets, SessionType, DEFAULT_COUNTUP_CAP_SECS};
pub use state::TimerState;
