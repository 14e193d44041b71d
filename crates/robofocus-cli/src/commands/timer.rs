use std::sync::Arc;

use clap::Subcommand;
use robofocus_core::effects::UserAlerts;
use robofocus_core::storage::data_dir;
use robofocus_core::timer::{format_clock, Clock, SystemClock};
use robofocus_core::{
    Config, Database, Effects, FocusCategory, LocalLedger, SessionController, SessionEnd,
    SessionType, ShieldFile, StartOutcome, WidgetFile,
};
use serde_json::json;

use super::print_json;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a new session, or resume the paused one
    Start {
        /// Focus category for a new work session
        /// (work, study, creative, reading, personal, other)
        #[arg(long)]
        category: Option<String>,
        /// What this session is for
        #[arg(long)]
        task: Option<String>,
    },
    /// Pause the running session
    Pause,
    /// End the session early
    Stop,
    /// Skip the rest of the session
    Skip,
    /// Print the current timer state as JSON, completing an expired session
    Status,
    /// Switch session type (pomodoro, deep-work, break, countup)
    Mode {
        session_type: String,
    },
    /// Toggle the completion sound
    Sound,
}

/// Surfaces user-facing warnings on stderr.
struct ConsoleAlerts;

impl UserAlerts for ConsoleAlerts {
    fn warn(&self, message: &str) {
        eprintln!("warning: {message}");
    }
}

fn open_controller(config: &Config) -> Result<SessionController<Database>, Box<dyn std::error::Error>> {
    let dir = data_dir()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ledger = Arc::new(LocalLedger::new(Database::open()?, clock.clone()));

    let mut effects = Effects::noop()
        .with_blocking(Arc::new(ShieldFile::new(
            dir.join("shield.json"),
            config.blocking.clone(),
        )))
        .with_analytics(ledger.clone())
        .with_rewards(ledger.clone())
        .with_widget(Arc::new(WidgetFile::new(dir.join("widget.json"))))
        .with_alerts(Arc::new(ConsoleAlerts));
    if config.notifications.enabled {
        effects = effects.with_notifications(ledger);
    }

    Ok(SessionController::new(
        Database::open()?,
        clock,
        effects,
        config.presets(),
    ))
}

fn print_status(ctl: &SessionController<Database>) -> Result<(), Box<dyn std::error::Error>> {
    let tick = ctl.tick();
    print_json(&json!({
        "phase": tick.phase,
        "display": format_clock(tick.display_secs),
        "displaySecs": tick.display_secs,
        "state": ctl.state(),
    }))
}

fn print_end(end: Option<SessionEnd>) -> Result<(), Box<dyn std::error::Error>> {
    match end {
        Some(end) => print_json(&end),
        None => print_json(&json!({ "ended": false, "reason": "no session in progress" })),
    }
}

pub async fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut ctl = open_controller(&config)?;

    if ctl.guard_orphaned_blocking().await {
        tracing::info!("lifted a shield left over from an earlier session");
    }

    match action {
        TimerAction::Start { category, task } => {
            let category = category
                .as_deref()
                .map(str::parse::<FocusCategory>)
                .transpose()?;

            let outcome = match ctl.request_start().settle().await {
                StartOutcome::AwaitingIntention => match category {
                    Some(category) => {
                        ctl.start_with_intent(Some(category), task).settle().await
                    }
                    None => {
                        ctl.cancel_intention();
                        return Err(
                            "a focus category is required to start a new session (--category)"
                                .into(),
                        );
                    }
                },
                other => {
                    if category.is_some() || task.is_some() {
                        tracing::debug!(?other, "intention flags ignored");
                        eprintln!(
                            "warning: --category/--task ignored; the {} session keeps its intention",
                            ctl.state().session_type
                        );
                    }
                    other
                }
            };
            tracing::debug!(?outcome, "start handled");

            let tick = ctl.tick();
            print_json(&json!({
                "outcome": outcome,
                "display": format_clock(tick.display_secs),
                "state": ctl.state(),
            }))?;
        }
        TimerAction::Pause => {
            let shown = ctl.pause().await.settle().await;
            print_json(&json!({
                "paused": shown.is_some(),
                "display": shown.map(format_clock),
                "state": ctl.state(),
            }))?;
        }
        TimerAction::Stop => {
            let end = ctl.stop().await.settle().await;
            print_end(end)?;
        }
        TimerAction::Skip => {
            let end = ctl.skip().await.settle().await;
            print_end(end)?;
        }
        TimerAction::Status => {
            if ctl.tick().expired {
                let end = ctl.complete().await.settle().await;
                print_end(end)?;
            } else {
                print_status(&ctl)?;
            }
        }
        TimerAction::Mode { session_type } => {
            let session_type: SessionType = session_type.parse()?;
            ctl.select_session_type(session_type)?;
            print_status(&ctl)?;
        }
        TimerAction::Sound => {
            let enabled = ctl.toggle_sound();
            print_json(&json!({ "soundEnabled": enabled }))?;
        }
    }
    Ok(())
}
