//! Integration tests for the session controller.
//!
//! The session is assembled from the same parts as the binary, with
//! `MockInputSource` in place of the hooks and `RecordingTransport` in place
//! of `SendInput`.  Playback tests run on Tokio's paused clock; tests that
//! cross into the hook worker threads use the real clock with short
//! timeouts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use macro_app::infrastructure::storage::config::HotkeyConfig;
use macro_app::infrastructure::storage::macro_store::load_macro_file;
use macro_app::{
    bind_hotkeys, run_commands, Command, MacroSession, RecordingToggle, SessionError,
    COMMAND_CHANNEL_CAPACITY,
};
use macro_player::infrastructure::desktop_metrics::mock::FixedDesktopMetrics;
use macro_player::infrastructure::input_injection::mock::RecordingTransport;
use macro_player::{PlaybackEngine, PlaybackOptions, PlaybackOutcome, SyntheticKind};
use macro_recorder::infrastructure::input_capture::mock::MockInputSource;
use macro_recorder::{HotkeyDispatcher, RawInputEvent, RawInputKind, Recorder};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const VK_A: u32 = 0x41;
const VK_F9: u32 = 0x78;
const VK_F10: u32 = 0x79;

const WAIT: Duration = Duration::from_secs(2);

/// Two key events ten seconds apart.
const SLOW_MACRO: &str = r#"{
  "events": [
    { "type": "key_press", "timestamp": 0.0, "key": "A", "vkCode": 65 },
    { "type": "key_release", "timestamp": 10.0, "key": "A", "vkCode": 65 }
  ]
}"#;

struct Harness {
    source: Arc<MockInputSource>,
    transport: Arc<RecordingTransport>,
    session: MacroSession,
}

fn harness() -> Harness {
    let source = Arc::new(MockInputSource::new());
    let transport = Arc::new(RecordingTransport::new());
    let player = Arc::new(PlaybackEngine::new(
        transport.clone(),
        transport.clone(),
        Arc::new(FixedDesktopMetrics::single_1080p()),
    ));
    let session = MacroSession::new(
        Recorder::new(source.clone()),
        player,
        PlaybackOptions::default(),
    );
    Harness {
        source,
        transport,
        session,
    }
}

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("macro-app-session-{}", uuid::Uuid::new_v4()))
}

fn write_file(dir: &Path, name: &str, text: &str) -> PathBuf {
    std::fs::create_dir_all(dir).expect("mkdir");
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write");
    path
}

fn key(vk_code: u32, down: bool) -> RawInputEvent {
    if down {
        RawInputEvent::now(RawInputKind::KeyDown { vk_code })
    } else {
        RawInputEvent::now(RawInputKind::KeyUp { vk_code })
    }
}

/// Polls `condition` on the real clock until it holds or `WAIT` elapses.
async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

// ── Recording ────────────────────────────────────────────────────────────────

#[test]
fn test_stopped_recording_becomes_current_and_is_autosaved() {
    // Arrange
    let dir = scratch_dir();
    let path = dir.join("recorded.json");
    let Harness {
        source, session, ..
    } = harness();
    let mut session = session.with_autosave(&path);

    // Act
    assert_eq!(
        session.toggle_recording().expect("start"),
        RecordingToggle::Started
    );
    source.inject_event(key(VK_A, true));
    source.inject_event(key(VK_A, false));
    let stopped = session.toggle_recording().expect("stop");

    // Assert
    assert_eq!(stopped, RecordingToggle::Stopped { events: 2 });
    let current = session.current_macro().expect("current macro");
    assert_eq!(current.len(), 2);
    let saved = load_macro_file(&path).expect("autosaved file");
    assert_eq!(&saved, current);
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test(start_paused = true)]
async fn test_start_playback_while_recording_is_busy() {
    // Arrange
    let mut h = harness();
    let dir = scratch_dir();
    h.session
        .load_macro(&write_file(&dir, "slow.json", SLOW_MACRO))
        .expect("load");
    h.session.toggle_recording().expect("start recording");

    // Act
    let result = h.session.start_playback();

    // Assert
    assert!(matches!(result, Err(SessionError::Busy { .. })));
    assert!(!h.session.is_playing());
    h.session.toggle_recording().expect("stop recording");
    let _ = std::fs::remove_dir_all(dir);
}

// ── Playback ─────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_loaded_macro_plays_to_completion() {
    // Arrange
    let mut h = harness();
    let dir = scratch_dir();
    h.session
        .load_macro(&write_file(&dir, "slow.json", SLOW_MACRO))
        .expect("load");

    // Act
    h.session.start_playback().expect("start playback");
    let report = h.session.wait_playback().await.expect("report");

    // Assert
    assert_eq!(report.outcome, PlaybackOutcome::Completed);
    assert_eq!(report.passes, 1);
    let keys: Vec<_> = h
        .transport
        .inputs()
        .into_iter()
        .map(|input| input.kind)
        .collect();
    assert_eq!(
        keys,
        vec![
            SyntheticKind::Key {
                vk_code: VK_A,
                pressed: true
            },
            SyntheticKind::Key {
                vk_code: VK_A,
                pressed: false
            },
        ]
    );
    assert!(!h.session.is_playing());
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_recording_while_playing_is_busy_then_stop_playback() {
    // Arrange
    let mut h = harness();
    let dir = scratch_dir();
    h.session
        .load_macro(&write_file(&dir, "slow.json", SLOW_MACRO))
        .expect("load");
    h.session.start_playback().expect("start playback");
    tokio::time::sleep(Duration::from_secs(1)).await;

    // Act
    let busy = h.session.toggle_recording();
    h.session.toggle_playback().expect("toggle stops playback");
    let report = h.session.wait_playback().await.expect("report");

    // Assert
    assert!(matches!(busy, Err(SessionError::Busy { .. })));
    assert!(!h.session.is_recording());
    assert_eq!(report.outcome, PlaybackOutcome::Stopped);
    assert_eq!(report.events_injected, 1);
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_playback_task_runs_injects_nothing() {
    // Arrange
    let mut h = harness();
    let dir = scratch_dir();
    h.session
        .load_macro(&write_file(&dir, "slow.json", SLOW_MACRO))
        .expect("load");

    // Act: the spawned task has not been polled yet.
    h.session.start_playback().expect("start playback");
    h.session.stop_playback();
    let report = h.session.wait_playback().await.expect("report");

    // Assert
    assert_ne!(report.outcome, PlaybackOutcome::Completed);
    assert_eq!(report.events_injected, 0);
    assert_eq!(h.transport.batch_count(), 0);
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test(start_paused = true)]
async fn test_second_start_while_playing_is_ignored() {
    // Arrange
    let mut h = harness();
    let dir = scratch_dir();
    h.session
        .load_macro(&write_file(&dir, "slow.json", SLOW_MACRO))
        .expect("load");
    h.session.start_playback().expect("first start");

    // Act
    let second = h.session.start_playback();
    let report = h.session.wait_playback().await.expect("report");

    // Assert
    assert!(second.is_ok());
    assert_eq!(report.outcome, PlaybackOutcome::Completed);
    assert_eq!(h.transport.batch_count(), 2);
    let _ = std::fs::remove_dir_all(dir);
}

// ── Macro files ──────────────────────────────────────────────────────────────

#[test]
fn test_malformed_file_leaves_current_macro_untouched() {
    // Arrange
    let mut h = harness();
    let dir = scratch_dir();
    h.session
        .load_macro(&write_file(&dir, "good.json", SLOW_MACRO))
        .expect("load good");

    // Act
    let empty = h
        .session
        .load_macro(&write_file(&dir, "empty.json", r#"{"events": []}"#));
    let broken = h
        .session
        .load_macro(&write_file(&dir, "broken.json", "{ not json"));

    // Assert
    assert!(matches!(empty, Err(SessionError::File(_))));
    assert!(matches!(broken, Err(SessionError::File(_))));
    assert_eq!(h.session.current_macro().map(|m| m.len()), Some(2));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn test_save_macro_writes_current_macro() {
    // Arrange
    let mut h = harness();
    let dir = scratch_dir();
    h.session
        .load_macro(&write_file(&dir, "in.json", SLOW_MACRO))
        .expect("load");
    let out = dir.join("copy").join("out.json");

    // Act
    h.session.save_macro(&out).expect("save");

    // Assert
    let saved = load_macro_file(&out).expect("reload");
    assert_eq!(Some(&saved), h.session.current_macro());
    let _ = std::fs::remove_dir_all(dir);
}

// ── Hotkeys and the command loop ─────────────────────────────────────────────

#[tokio::test]
async fn test_bound_hotkeys_send_their_commands() {
    // Arrange
    let hotkey_source = Arc::new(MockInputSource::new());
    let dispatcher = HotkeyDispatcher::new(hotkey_source.clone());
    let (tx, mut rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    bind_hotkeys(&dispatcher, &HotkeyConfig::default(), &tx).expect("bind");

    // Act
    hotkey_source.inject_event(key(VK_F9, true));
    hotkey_source.inject_event(key(VK_F9, false));
    hotkey_source.inject_event(key(VK_F10, true));

    // Assert
    let first = tokio::time::timeout(WAIT, rx.recv()).await.expect("first");
    let second = tokio::time::timeout(WAIT, rx.recv()).await.expect("second");
    assert_eq!(first, Some(Command::ToggleRecording));
    assert_eq!(second, Some(Command::TogglePlayback));
}

#[tokio::test]
async fn test_command_loop_records_between_two_toggles() {
    // Arrange
    let h = harness();
    let source = Arc::clone(&h.source);
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let shutdown = CancellationToken::new();
    let looped = tokio::spawn(run_commands(h.session, rx, shutdown));

    // Act
    tx.send(Command::ToggleRecording).await.expect("send");
    assert!(eventually(|| source.is_running()).await, "recording never started");
    source.inject_event(key(VK_A, true));
    tx.send(Command::ToggleRecording).await.expect("send");
    assert!(eventually(|| !source.is_running()).await, "recording never stopped");
    drop(tx);
    let session = looped.await.expect("command loop");

    // Assert
    assert_eq!(session.current_macro().map(|m| m.len()), Some(1));
}

#[tokio::test]
async fn test_shutdown_keeps_recording_in_progress() {
    // Arrange
    let h = harness();
    let source = Arc::clone(&h.source);
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let shutdown = CancellationToken::new();
    let looped = tokio::spawn(run_commands(h.session, rx, shutdown.clone()));
    tx.send(Command::ToggleRecording).await.expect("send");
    assert!(eventually(|| source.is_running()).await, "recording never started");
    source.inject_event(key(VK_A, true));

    // Act
    shutdown.cancel();
    let session = looped.await.expect("command loop");

    // Assert
    assert!(!session.is_recording());
    assert_eq!(session.current_macro().map(|m| m.len()), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_rejected_command_does_not_end_the_loop() {
    // Arrange: no macro loaded, so TogglePlayback is rejected.
    let h = harness();
    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let looped = tokio::spawn(run_commands(h.session, rx, CancellationToken::new()));

    // Act
    tx.send(Command::TogglePlayback).await.expect("send");
    tx.send(Command::TogglePlayback).await.expect("loop still receiving");
    drop(tx);
    let session = looped.await.expect("command loop");

    // Assert
    assert!(session.current_macro().is_none());
    assert!(!session.is_playing());
}
