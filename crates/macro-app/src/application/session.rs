//! Session controller: the single owner of "what is the app doing now".
//!
//! A session is either idle, recording, or playing, never recording and
//! playing at once.  Hotkeys do not touch the session directly; they push a
//! [`Command`] into a `tokio::sync::mpsc` channel from the hook worker thread
//! and [`run_commands`] applies them on the async side.
//!
//! ```text
//! hook worker ──Command──► run_commands ──► MacroSession ──► Recorder
//!                                                       └──► PlaybackEngine (spawned task)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use macro_core::EventStream;
use macro_player::{PlaybackEngine, PlaybackOptions, PlaybackReport};
use macro_recorder::{CaptureError, HotkeyDispatcher, HotkeyError, Recorder};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::infrastructure::storage::config::HotkeyConfig;
use crate::infrastructure::storage::macro_store::{
    load_macro_file, save_macro_file, MacroFileError,
};

/// Capacity of the hotkey → controller command channel.
pub const COMMAND_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The request conflicts with the activity in progress.
    #[error("cannot {action} while {activity}")]
    Busy {
        action: &'static str,
        activity: &'static str,
    },

    #[error("no macro is loaded")]
    NoMacro,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    File(#[from] MacroFileError),
}

/// Requests produced by the hotkeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleRecording,
    TogglePlayback,
}

/// Result of [`MacroSession::toggle_recording`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingToggle {
    Started,
    /// Recording ended with `events` captured.  An empty capture leaves the
    /// previously loaded macro in place.
    Stopped { events: usize },
}

struct ActivePlayback {
    handle: JoinHandle<Option<PlaybackReport>>,
    cancel: CancellationToken,
}

/// Headless controller tying a [`Recorder`] and a [`PlaybackEngine`] to one
/// current macro.
pub struct MacroSession {
    recorder: Recorder,
    player: Arc<PlaybackEngine>,
    options: PlaybackOptions,
    current: Option<EventStream>,
    autosave: Option<PathBuf>,
    playback: Option<ActivePlayback>,
}

impl MacroSession {
    pub fn new(recorder: Recorder, player: Arc<PlaybackEngine>, options: PlaybackOptions) -> Self {
        Self {
            recorder,
            player,
            options,
            current: None,
            autosave: None,
            playback: None,
        }
    }

    /// Writes every non-empty recording to `path` when it stops.
    pub fn with_autosave(mut self, path: impl Into<PathBuf>) -> Self {
        self.autosave = Some(path.into());
        self
    }

    pub fn options(&self) -> PlaybackOptions {
        self.options
    }

    /// Applies to the next playback; a running one keeps its options.
    pub fn set_options(&mut self, options: PlaybackOptions) {
        self.options = options;
    }

    pub fn current_macro(&self) -> Option<&EventStream> {
        self.current.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// True from [`start_playback`](Self::start_playback) until the playback
    /// task returns.
    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// Starts a recording, or stops the running one and makes its stream
    /// the current macro.
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`] while playing, [`SessionError::Capture`] if the
    /// hooks cannot be installed.
    pub fn toggle_recording(&mut self) -> Result<RecordingToggle, SessionError> {
        if self.recorder.is_recording() {
            return Ok(self.finish_recording());
        }
        if self.is_playing() {
            return Err(SessionError::Busy {
                action: "start recording",
                activity: "playing",
            });
        }
        self.recorder.start_recording()?;
        info!("recording started");
        Ok(RecordingToggle::Started)
    }

    fn finish_recording(&mut self) -> RecordingToggle {
        let stream = self.recorder.stop_recording();
        let events = stream.len();
        info!(events, "recording stopped");
        if stream.is_empty() {
            return RecordingToggle::Stopped { events };
        }
        if let Some(path) = &self.autosave {
            match save_macro_file(path, &stream) {
                Ok(()) => info!(path = %path.display(), "recording saved"),
                Err(e) => error!("failed to save recording: {e}"),
            }
        }
        self.current = Some(stream);
        RecordingToggle::Stopped { events }
    }

    /// Plays the current macro on a spawned task.  Does nothing if a
    /// playback is already running.  Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`SessionError::Busy`] while recording, [`SessionError::NoMacro`] if
    /// nothing is loaded.
    pub fn start_playback(&mut self) -> Result<(), SessionError> {
        if self.recorder.is_recording() {
            return Err(SessionError::Busy {
                action: "start playback",
                activity: "recording",
            });
        }
        let stream = self
            .current
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(SessionError::NoMacro)?;
        if self.is_playing() {
            debug!("start_playback ignored: already playing");
            return Ok(());
        }

        let player = Arc::clone(&self.player);
        let options = self.options;
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let report = player.play_macro(&stream, options, Some(token)).await;
            if let Some(report) = &report {
                info!(
                    outcome = ?report.outcome,
                    passes = report.passes,
                    events = report.events_injected,
                    "playback finished"
                );
            }
            report
        });
        info!(
            speed = options.speed,
            loops = options.loops,
            "playback started"
        );
        self.playback = Some(ActivePlayback { handle, cancel });
        Ok(())
    }

    /// Stops the running playback, if any.
    pub fn stop_playback(&mut self) {
        let Some(active) = &self.playback else {
            return;
        };
        // The task may not have entered the engine yet; the token covers
        // that window.
        let started = self.player.is_playing();
        self.player.stop();
        if !started {
            active.cancel.cancel();
        }
    }

    /// Stops a running playback or starts a new one.
    ///
    /// # Errors
    ///
    /// See [`start_playback`](Self::start_playback).
    pub fn toggle_playback(&mut self) -> Result<(), SessionError> {
        if self.is_playing() {
            self.stop_playback();
            Ok(())
        } else {
            self.start_playback()
        }
    }

    /// Waits for the playback task started last and returns its report.
    pub async fn wait_playback(&mut self) -> Option<PlaybackReport> {
        let active = self.playback.take()?;
        match active.handle.await {
            Ok(report) => report,
            Err(e) => {
                error!("playback task failed: {e}");
                None
            }
        }
    }

    /// Replaces the current macro with the file at `path`.  On error the
    /// current macro is left untouched.
    ///
    /// # Errors
    ///
    /// [`SessionError::File`] if the file cannot be read or decoded.
    pub fn load_macro(&mut self, path: &Path) -> Result<usize, SessionError> {
        let stream = load_macro_file(path)?;
        let events = stream.len();
        self.current = Some(stream);
        info!(path = %path.display(), events, "macro loaded");
        Ok(events)
    }

    /// # Errors
    ///
    /// [`SessionError::NoMacro`] if nothing is loaded, [`SessionError::File`]
    /// on write failure.
    pub fn save_macro(&self, path: &Path) -> Result<(), SessionError> {
        let stream = self.current.as_ref().ok_or(SessionError::NoMacro)?;
        save_macro_file(path, stream)?;
        info!(path = %path.display(), events = stream.len(), "macro saved");
        Ok(())
    }

    /// Applies one hotkey command, logging rather than returning failures.
    pub fn apply(&mut self, command: Command) {
        let result = match command {
            Command::ToggleRecording => self.toggle_recording().map(|_| ()),
            Command::TogglePlayback => self.toggle_playback(),
        };
        if let Err(e) = result {
            warn!(?command, "command rejected: {e}");
        }
    }

    /// Stops whatever is running.  A recording in progress is kept (and
    /// autosaved) as if it had been toggled off.
    pub async fn shutdown(&mut self) {
        if self.recorder.is_recording() {
            self.finish_recording();
        }
        self.stop_playback();
        self.wait_playback().await;
    }
}

/// Binds the configured hotkeys to commands on `commands`.
///
/// Callbacks run on the dispatcher's worker thread, so they only
/// `try_send`; a full channel drops the press with a warning.
///
/// # Errors
///
/// Propagates [`HotkeyError`] from registration.  A failure on the second
/// key leaves the first one registered.
pub fn bind_hotkeys(
    dispatcher: &HotkeyDispatcher,
    hotkeys: &HotkeyConfig,
    commands: &mpsc::Sender<Command>,
) -> Result<(), HotkeyError> {
    for (key, command) in [
        (&hotkeys.record, Command::ToggleRecording),
        (&hotkeys.play, Command::TogglePlayback),
    ] {
        let tx = commands.clone();
        dispatcher.register(key, move || {
            if let Err(e) = tx.try_send(command) {
                warn!(?command, "hotkey command dropped: {e}");
            }
        })?;
        info!(key = %key, ?command, "hotkey bound");
    }
    Ok(())
}

/// Applies commands until the channel closes or `shutdown` fires, then shuts
/// the session down and hands it back.
pub async fn run_commands(
    mut session: MacroSession,
    mut commands: mpsc::Receiver<Command>,
    shutdown: CancellationToken,
) -> MacroSession {
    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                debug!("command loop: shutdown requested");
                break;
            }
            command = commands.recv() => match command {
                Some(command) => session.apply(command),
                None => {
                    debug!("command loop: channel closed");
                    break;
                }
            },
        }
    }
    session.shutdown().await;
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use macro_player::infrastructure::desktop_metrics::mock::FixedDesktopMetrics;
    use macro_player::infrastructure::input_injection::mock::RecordingTransport;
    use macro_recorder::infrastructure::input_capture::mock::MockInputSource;

    fn session() -> (Arc<MockInputSource>, MacroSession) {
        let source = Arc::new(MockInputSource::new());
        let transport = Arc::new(RecordingTransport::new());
        let player = Arc::new(PlaybackEngine::new(
            transport.clone(),
            transport,
            Arc::new(FixedDesktopMetrics::single_1080p()),
        ));
        let session = MacroSession::new(
            Recorder::new(source.clone()),
            player,
            PlaybackOptions::default(),
        );
        (source, session)
    }

    #[tokio::test]
    async fn test_start_playback_without_macro_is_no_macro() {
        // Arrange
        let (_source, mut session) = session();

        // Act
        let result = session.start_playback();

        // Assert
        assert!(matches!(result, Err(SessionError::NoMacro)));
        assert!(!session.is_playing());
    }

    #[test]
    fn test_save_without_macro_is_no_macro() {
        let (_source, session) = session();
        let result = session.save_macro(Path::new("unused.json"));
        assert!(matches!(result, Err(SessionError::NoMacro)));
    }

    #[test]
    fn test_empty_recording_keeps_no_current_macro() {
        // Arrange
        let (_source, mut session) = session();

        // Act
        let started = session.toggle_recording().expect("start");
        let stopped = session.toggle_recording().expect("stop");

        // Assert
        assert_eq!(started, RecordingToggle::Started);
        assert_eq!(stopped, RecordingToggle::Stopped { events: 0 });
        assert!(session.current_macro().is_none());
    }

    #[test]
    fn test_hook_failure_surfaces_as_capture_error() {
        // Arrange
        let (source, mut session) = session();
        source.fail_start(true);

        // Act
        let result = session.toggle_recording();

        // Assert
        assert!(matches!(result, Err(SessionError::Capture(_))));
        assert!(!session.is_recording());
    }

    #[test]
    fn test_busy_error_message_names_both_activities() {
        let err = SessionError::Busy {
            action: "start playback",
            activity: "recording",
        };
        assert_eq!(err.to_string(), "cannot start playback while recording");
    }
}
