//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data dir.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_robofocus"))
        .args(args)
        .env("ROBOFOCUS_DATA_DIR", dir)
        .env("ROBOFOCUS_LOG", "off")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let (stdout, stderr, code) = run_cli(dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("{args:?} printed non-JSON ({e}): {stdout}"))
}

#[test]
fn test_status_on_fresh_install() {
    let dir = tempfile::tempdir().unwrap();
    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["phase"], "idle");
    assert_eq!(status["display"], "25:00");
    assert_eq!(status["state"]["sessionType"], "pomodoro");
    assert_eq!(status["state"]["isRunning"], false);
    assert!(dir.path().join("config.toml").exists());
}

#[test]
fn test_start_requires_category() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["timer", "start"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("category"), "stderr: {stderr}");

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["state"]["isRunning"], false);
}

#[test]
fn test_start_rejects_unknown_category() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["timer", "start", "--category", "gaming"]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"), "stderr: {stderr}");
}

#[test]
fn test_start_pause_resume() {
    let dir = tempfile::tempdir().unwrap();
    let started = run_json(
        dir.path(),
        &["timer", "start", "--category", "study", "--task", "chapter 3"],
    );
    assert_eq!(started["outcome"], "started");
    assert_eq!(started["state"]["isRunning"], true);
    assert_eq!(started["state"]["category"], "study");
    assert_eq!(started["state"]["taskLabel"], "chapter 3");

    let again = run_json(dir.path(), &["timer", "start"]);
    assert_eq!(again["outcome"], "already-running");

    let paused = run_json(dir.path(), &["timer", "pause"]);
    assert_eq!(paused["paused"], true);
    assert_eq!(paused["state"]["isRunning"], false);
    assert_eq!(paused["state"]["startTime"], Value::Null);

    // Category is kept, so no intention is needed to resume.
    let resumed = run_json(dir.path(), &["timer", "start"]);
    assert_eq!(resumed["outcome"], "resumed");
    assert_eq!(resumed["state"]["category"], "study");

    let widget: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("widget.json")).unwrap())
            .unwrap();
    assert_eq!(widget["isRunning"], true);
}

#[test]
fn test_resume_warns_about_ignored_category() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["timer", "start", "--category", "study"]);
    run_json(dir.path(), &["timer", "pause"]);

    let (stdout, stderr, code) =
        run_cli(dir.path(), &["timer", "start", "--category", "reading"]);
    assert_eq!(code, 0);
    assert!(stderr.contains("ignored"), "stderr: {stderr}");
    let resumed: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(resumed["outcome"], "resumed");
    assert_eq!(resumed["state"]["category"], "study");
}

#[test]
fn test_short_stop_is_abandoned_and_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["timer", "start", "--category", "work"]);

    let end = run_json(dir.path(), &["timer", "stop"]);
    assert_eq!(end["status"], "abandoned");
    assert_eq!(end["recorded"], false);
    assert_eq!(end["rewarded"], false);

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["phase"], "idle");
    assert_eq!(status["display"], "25:00");

    let stats = run_json(dir.path(), &["stats"]);
    assert_eq!(stats["stats"]["total_sessions"], 0);
    assert_eq!(stats["xp"]["total"], 0);
    assert_eq!(stats["xp"]["level"], 1);
}

#[test]
fn test_stop_when_idle_reports_nothing_ended() {
    let dir = tempfile::tempdir().unwrap();
    let end = run_json(dir.path(), &["timer", "stop"]);
    assert_eq!(end["ended"], false);
}

#[test]
fn test_mode_switch_and_lock() {
    let dir = tempfile::tempdir().unwrap();
    let status = run_json(dir.path(), &["timer", "mode", "deep-work"]);
    assert_eq!(status["state"]["sessionType"], "deep-work");
    assert_eq!(status["display"], "50:00");

    let status = run_json(dir.path(), &["timer", "mode", "countup"]);
    assert_eq!(status["state"]["isCountup"], true);
    assert_eq!(status["display"], "00:00");

    run_json(dir.path(), &["timer", "start", "--category", "creative"]);
    let (_, stderr, code) = run_cli(dir.path(), &["timer", "mode", "break"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("in progress"), "stderr: {stderr}");
}

#[test]
fn test_break_starts_without_category() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["timer", "mode", "break"]);
    let started = run_json(dir.path(), &["timer", "start"]);
    assert_eq!(started["outcome"], "started");
    assert_eq!(started["state"]["category"], Value::Null);
}

#[test]
fn test_sound_toggle_persists() {
    let dir = tempfile::tempdir().unwrap();
    let off = run_json(dir.path(), &["timer", "sound"]);
    assert_eq!(off["soundEnabled"], false);
    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["state"]["soundEnabled"], false);
    let on = run_json(dir.path(), &["timer", "sound"]);
    assert_eq!(on["soundEnabled"], true);
}

#[test]
fn test_config_set_changes_presets() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "set", "timer.pomodoro_minutes", "30"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "timer.pomodoro_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "30");

    let status = run_json(dir.path(), &["timer", "status"]);
    assert_eq!(status["display"], "30:00");

    let (_, _, code) = run_cli(dir.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let list = run_json(dir.path(), &["config", "list"]);
    assert_eq!(list["timer"]["pomodoro_minutes"], 25);
}

#[test]
fn test_config_get_unknown_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["config", "get", "timer.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_shield_goes_up_for_configured_blocking() {
    let dir = tempfile::tempdir().unwrap();
    run_cli(dir.path(), &["config", "set", "blocking.enabled", "true"]);
    run_cli(dir.path(), &["config", "set", "blocking.apps", "com.example.social"]);

    run_json(dir.path(), &["timer", "start", "--category", "work"]);
    let shield: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("shield.json")).unwrap())
            .unwrap();
    assert_eq!(shield["active"], true);

    let end = run_json(dir.path(), &["timer", "stop"]);
    assert_eq!(end["focus_quality"], "perfect");
    let shield: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("shield.json")).unwrap())
            .unwrap();
    assert_eq!(shield["active"], false);
}
