//! Macro recorder entry point.
//!
//! Installs the global hotkeys and then waits: the record hotkey starts and
//! stops a capture of every keyboard and mouse action, the play hotkey
//! replays (or stops replaying) the current macro.  Ctrl-C exits.
//!
//! # Usage
//!
//! ```text
//! macro-app [OPTIONS]
//!
//! Options:
//!   --config <PATH>       Preferences file [default: platform config dir]
//!   --macro-file <PATH>   Macro loaded at startup and written after each recording
//!   --speed <FACTOR>      Playback speed multiplier
//!   --loops <N>           Passes per playback, 0 = until stopped
//!   --interval <SECS>     Wait SECS between passes instead of the short gap
//!   --legacy-transport    Inject with mouse_event/keybd_event instead of SendInput
//!   --save-config         Write the merged preferences back to the config file
//! ```
//!
//! Command-line values override the preferences file.
//!
//! | Variable       | Description                                  |
//! |----------------|----------------------------------------------|
//! | `RUST_LOG`     | Log filter; falls back to `general.log_level` |
//! | `MACRO_CONFIG` | Same as `--config`                           |
//! | `MACRO_FILE`   | Same as `--macro-file`                       |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use macro_app::infrastructure::storage::config::{self, AppConfig};
use macro_app::{bind_hotkeys, run_commands, MacroSession, COMMAND_CHANNEL_CAPACITY};
use macro_player::{DesktopMetrics, InputTransport, PlaybackEngine};
use macro_recorder::{HotkeyDispatcher, InputSource, Recorder};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Records and replays keyboard and mouse macros, driven by global hotkeys.
#[derive(Debug, Parser)]
#[command(
    name = "macro-app",
    about = "Records and replays keyboard and mouse macros",
    version
)]
struct Cli {
    /// Preferences file.  Defaults to `config.toml` in the platform config
    /// directory.
    #[arg(long, env = "MACRO_CONFIG")]
    config: Option<PathBuf>,

    /// Macro file loaded at startup (if present) and overwritten each time a
    /// recording stops.
    #[arg(long, env = "MACRO_FILE")]
    macro_file: Option<PathBuf>,

    /// Playback speed multiplier; `2` plays twice as fast.
    #[arg(long)]
    speed: Option<f64>,

    /// Passes per playback; `0` repeats until stopped.
    #[arg(long, allow_negative_numbers = true)]
    loops: Option<i32>,

    /// Seconds to wait between passes.  Enables interval mode.
    #[arg(long, value_name = "SECS")]
    interval: Option<i64>,

    /// Use the legacy `mouse_event`/`keybd_event` transport.
    #[arg(long)]
    legacy_transport: bool,

    /// Write the preferences, with these overrides applied, back to the
    /// config file.
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    /// Overlays the command-line overrides onto `cfg`.
    fn apply_to(&self, cfg: &mut AppConfig) {
        if let Some(speed) = self.speed {
            cfg.playback.speed = speed;
        }
        if let Some(loops) = self.loops {
            cfg.playback.loops = loops;
        }
        if let Some(secs) = self.interval {
            cfg.playback.interval_mode = true;
            cfg.playback.interval_seconds = secs;
        }
        if self.legacy_transport {
            cfg.playback.use_send_input = false;
        }
    }
}

// ── Platform wiring ───────────────────────────────────────────────────────────

#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
struct Backends {
    capture: Arc<dyn InputSource>,
    hotkeys: Arc<dyn InputSource>,
    batched: Arc<dyn InputTransport>,
    legacy: Arc<dyn InputTransport>,
    metrics: Arc<dyn DesktopMetrics>,
}

#[cfg(target_os = "windows")]
fn platform_backends() -> anyhow::Result<Backends> {
    use macro_player::infrastructure::desktop_metrics::windows::WindowsDesktopMetrics;
    use macro_player::infrastructure::input_injection::windows::{
        LegacyEventTransport, SendInputTransport,
    };
    use macro_recorder::infrastructure::input_capture::windows::WindowsHookSource;

    Ok(Backends {
        capture: Arc::new(WindowsHookSource::keyboard_and_mouse()),
        hotkeys: Arc::new(WindowsHookSource::keyboard()),
        batched: Arc::new(SendInputTransport::new()),
        legacy: Arc::new(LegacyEventTransport::new()),
        metrics: Arc::new(WindowsDesktopMetrics::new()),
    })
}

#[cfg(not(target_os = "windows"))]
fn platform_backends() -> anyhow::Result<Backends> {
    Err(macro_recorder::CaptureError::UnsupportedPlatform(std::env::consts::OS.to_string()).into())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::config_file_path().context("locating preferences file")?,
    };
    let mut cfg = config::load_config_from(&config_path)
        .with_context(|| format!("loading preferences from {}", config_path.display()))?;
    cli.apply_to(&mut cfg);

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&cfg.general.log_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(config = %config_path.display(), "macro recorder starting");

    if cli.save_config {
        config::save_config_to(&config_path, &cfg)
            .with_context(|| format!("saving preferences to {}", config_path.display()))?;
        info!(config = %config_path.display(), "preferences saved");
    }

    let backends = platform_backends()?;

    let player = Arc::new(PlaybackEngine::new(
        backends.batched,
        backends.legacy,
        backends.metrics,
    ));
    player.set_use_send_input(cfg.playback.use_send_input);

    let mut session = MacroSession::new(
        Recorder::new(backends.capture),
        Arc::clone(&player),
        cfg.playback.to_options(),
    );
    if let Some(path) = &cli.macro_file {
        if path.exists() {
            if let Err(e) = session.load_macro(path) {
                warn!("starting without a macro: {e}");
            }
        }
        session = session.with_autosave(path);
    }

    let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let dispatcher = HotkeyDispatcher::new(backends.hotkeys);
    bind_hotkeys(&dispatcher, &cfg.hotkeys, &tx).context("registering hotkeys")?;
    info!(
        record = %cfg.hotkeys.record,
        play = %cfg.hotkeys.play,
        "ready; press Ctrl-C to exit"
    );

    // ── Shutdown signal ──────────────────────────────────────────────────────
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl-C: {e}");
                return;
            }
            info!("Ctrl-C received, shutting down");
            shutdown.cancel();
        });
    }

    run_commands(session, rx, shutdown).await;
    dispatcher.clear();

    info!("macro recorder stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
