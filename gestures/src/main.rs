//! ewwm-gestures - replay recorded input traces through the recognizer.
//!
//! Prints one s-expression per lifecycle event, then the final status.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use calloop::EventLoop;
use clap::Parser;
use tracing::{debug, info};

use ewwm_gestures::config::Config;
use ewwm_gestures::state::GestureState;
use ewwm_gestures::trace::{self, TraceStep};

#[derive(Parser, Debug)]
#[command(name = "ewwm-gestures", about = "EXWM-VR gesture recognizer")]
struct Cli {
    /// Gesture configuration file (s-expression)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input trace to replay
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Override the stroke timeout in milliseconds
    #[arg(long)]
    stroke_timeout_ms: Option<u64>,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("ewwm-gestures {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ewwm_gestures=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("ewwm-gestures v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(ms) = cli.stroke_timeout_ms {
        config.settings.stroke_timeout_ms = ms;
    }

    if cli.dump_config {
        println!("{}", config.config_sexp());
        return Ok(());
    }

    let Some(trace_path) = cli.trace else {
        bail!("no input trace given, use --trace <FILE> or --dump-config");
    };
    let steps = trace::load(&trace_path)?;
    info!(steps = steps.len(), "trace loaded");

    let mut event_loop: EventLoop<'static, GestureState> =
        EventLoop::try_new().context("failed to create event loop")?;
    let mut state = GestureState::new(config.settings, Some(event_loop.handle()));
    for gesture in config.gestures {
        state.recognizer.register_gesture(gesture);
    }

    for step in steps {
        match step {
            TraceStep::Input(event) => {
                let consumed = state.handle_input(event);
                debug!(consumed, "input replayed");
                event_loop.dispatch(Some(Duration::ZERO), &mut state)?;
            }
            TraceStep::Wait(duration) => {
                let deadline = Instant::now() + duration;
                loop {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    event_loop.dispatch(Some(remaining), &mut state)?;
                    if remaining.is_zero() {
                        break;
                    }
                }
            }
            TraceStep::RecordStroke => state.record_stroke(),
        }
        for event in state.drain_events() {
            println!("{}", state.recognizer.event_sexp(&event));
        }
    }

    println!("{}", state.status_sexp());
    Ok(())
}
