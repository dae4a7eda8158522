//! # DS5W Monitor
//!
//! Polls a DualSense controller, logs what it reports and drives its
//! lightbar, player LEDs, rumble motors and adaptive triggers.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, `config/default.toml`, or defaults)
//!    - Set up logging to stdout and optionally a daily log file
//!    - Enumerate controllers and open the first matching one
//!
//! 2. **Main Loop** (at `poll_rate_hz`)
//!    - Read and decode one input report
//!    - Log button transitions, optionally capture the state
//!    - Build and write the output report
//!    - On controller loss, wait and reconnect or reopen
//!
//! 3. **Graceful Shutdown** (Ctrl+C)
//!    - Send an all-off output report
//!    - Close the controller
//!
//! # Examples
//!
//! ```bash
//! ds5w-monitor config/default.toml
//! RUST_LOG=ds5w=trace ds5w-monitor
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tracing::{debug, info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ds5w::adapter::{Axis, ButtonTransition, Feedback, InputDispatcher, InputSink, Motion};
use ds5w::capture::InputRecorder;
use ds5w::config::{Config, LoggingConfig, PreferredConnection};
use ds5w::device::{enumerate, ContextState, DeviceContext, DeviceEnumInfo};
use ds5w::error::Ds5Error;
use ds5w::report::state::{Button, OutputState, Vec3};
use ds5w::transport::hid::{HidBackend, SystemHid};

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix of the daily log files
const LOG_FILE_PREFIX: &str = "ds5w-monitor.log";

/// Number of polls between status log messages
const STATUS_INTERVAL_POLLS: u64 = 1000;

/// Logs button transitions, analog and motion values at trace level
struct LoggingSink;

impl InputSink for LoggingSink {
    fn on_button(&mut self, button: Button, transition: ButtonTransition) {
        info!("{:?} {:?}", button, transition);
    }

    fn on_analog(&mut self, axis: Axis, ratio: f32) {
        trace!(?axis, ratio, "analog");
    }

    fn on_motion(&mut self, motion: Motion, value: Vec3) {
        trace!(?motion, x = value.x, y = value.y, z = value.z, "motion");
    }
}

/// Per-controller processing pipeline
struct Pipeline {
    dispatcher: InputDispatcher,
    feedback: Feedback,
    recorder: Option<InputRecorder>,
}

impl Pipeline {
    fn new(config: &Config) -> Result<Self> {
        let recorder = if config.capture.enabled {
            let recorder = InputRecorder::new(
                &config.capture.directory,
                config.capture.max_records_per_file,
                config.capture.max_files_to_keep,
            )
            .with_context(|| format!("cannot capture to {}", config.capture.directory))?;
            Some(recorder)
        } else {
            None
        };

        Ok(Self {
            dispatcher: InputDispatcher::new(config.axis_calibration()),
            feedback: Feedback::new(config.feedback_profile()),
            recorder,
        })
    }

    /// One read → dispatch → capture → write cycle
    fn poll(&mut self, context: &mut DeviceContext) -> ds5w::error::Result<()> {
        let input = tokio::task::block_in_place(|| context.read_input())?;
        let connection = context.connection();

        self.dispatcher.dispatch(&input, &mut LoggingSink);

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.record(connection, &input) {
                warn!("Failed to capture input: {}", e);
            }
        }

        let output = self.feedback.update(&input, connection);
        tokio::task::block_in_place(|| context.write_output(&output))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    let _log_guard = init_logging(&config.logging);

    info!("DS5W Monitor v{} starting...", env!("CARGO_PKG_VERSION"));

    let backend = SystemHid::new().context("cannot initialize HID subsystem")?;
    let Some(mut context) = wait_for_controller(&backend, &config).await? else {
        info!("Received Ctrl+C before a controller was found");
        return Ok(());
    };

    let mut pipeline = Pipeline::new(&config)?;
    let mut poll_interval = interval(poll_period(config.device.poll_rate_hz));
    poll_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Polling {} at {}Hz", context.path(), config.device.poll_rate_hz);
    info!("Press Ctrl+C to exit");

    let mut poll_count: u64 = 0;

    // Main control loop
    loop {
        tokio::select! {
            _ = poll_interval.tick() => {
                match pipeline.poll(&mut context) {
                    Ok(()) => {
                        poll_count += 1;
                        if poll_count % STATUS_INTERVAL_POLLS == 0 {
                            let battery = context.last_input().battery;
                            info!(
                                "{} polls over {}, battery {}%{}",
                                poll_count,
                                context.connection(),
                                u16::from(battery.level.min(10)) * 10,
                                if battery.charging { " (charging)" } else { "" }
                            );
                        }
                    }
                    Err(e) if is_dropped_frame(&e, context.state()) => {
                        debug!("Dropped input report: {}", e);
                    }
                    Err(e) if e.is_recoverable() => {
                        warn!("Controller lost: {}", e);
                        if !recover(&backend, &mut context, &config).await {
                            info!("Received Ctrl+C, shutting down...");
                            break;
                        }
                        pipeline.dispatcher.reset();
                    }
                    Err(e) => {
                        shutdown(&mut context, &mut pipeline);
                        bail!("controller I/O failed: {}", e);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    info!("Total polls: {}", poll_count);
    shutdown(&mut context, &mut pipeline);
    Ok(())
}

/// Load the configuration named on the command line, else the default file, else defaults
fn load_config() -> Result<Config> {
    if let Some(path) = std::env::args().nth(1) {
        return Config::load(&path).with_context(|| format!("cannot load config {}", path));
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("cannot load config {}", DEFAULT_CONFIG_PATH));
    }

    Ok(Config::default())
}

/// Install the stdout layer and, when a directory is configured, a daily file layer
///
/// The returned guard flushes the file writer when dropped.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = if config.directory.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer().with_writer(writer).with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Interval between polls for a rate in Hz
fn poll_period(rate_hz: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(rate_hz.max(1)))
}

/// Whether a poll error only lost one frame and the link is still up
///
/// Corrupt or truncated reports and stray report IDs leave the context
/// connected; removal and OS failures do not.
fn is_dropped_frame(error: &Ds5Error, state: ContextState) -> bool {
    state == ContextState::Connected
        && matches!(
            error,
            Ds5Error::BluetoothCommunication(_)
                | Ds5Error::InsufficientBuffer { .. }
                | Ds5Error::InvalidArguments(_)
        )
}

/// First enumerated controller accepted by `preference`
fn find_controller(
    backend: &dyn HidBackend,
    preference: PreferredConnection,
) -> ds5w::error::Result<Option<DeviceEnumInfo>> {
    let devices = enumerate(backend)?;
    Ok(devices.into_iter().find(|d| preference.accepts(d.connection())))
}

/// Enumerate until a controller opens, or `None` on Ctrl+C
async fn wait_for_controller(
    backend: &dyn HidBackend,
    config: &Config,
) -> Result<Option<DeviceContext>> {
    let retry = Duration::from_millis(config.device.reconnect_interval_ms);
    let mut announced = false;

    loop {
        match find_controller(backend, config.device.preferred_connection)? {
            Some(info) => match DeviceContext::open(backend, &info) {
                Ok(context) => {
                    info!("Opened {} controller at {}", info.connection(), info.path());
                    return Ok(Some(context));
                }
                Err(e) => warn!("Failed to open {}: {}", info.path(), e),
            },
            None if !announced => {
                info!("Waiting for a DualSense controller...");
                announced = true;
            }
            None => {}
        }

        tokio::select! {
            _ = sleep(retry) => {}
            _ = tokio::signal::ctrl_c() => return Ok(None),
        }
    }
}

/// Bring a lost controller back, first at its old path, then from a fresh enumeration
///
/// Returns `false` if interrupted by Ctrl+C.
async fn recover(backend: &dyn HidBackend, context: &mut DeviceContext, config: &Config) -> bool {
    let retry = Duration::from_millis(config.device.reconnect_interval_ms);

    loop {
        tokio::select! {
            _ = sleep(retry) => {}
            _ = tokio::signal::ctrl_c() => return false,
        }

        // Only a disconnected context can come back at its old path
        if context.state() == ContextState::Disconnected {
            match context.reconnect(backend) {
                Ok(()) => {
                    info!("Reconnected to {}", context.path());
                    return true;
                }
                Err(e) => debug!("Reconnect to {} failed: {}", context.path(), e),
            }
        }

        match find_controller(backend, config.device.preferred_connection) {
            Ok(Some(info)) => match context.reopen(backend, &info) {
                Ok(()) => {
                    info!("Reopened {} controller at {}", info.connection(), info.path());
                    return true;
                }
                Err(e) => warn!("Failed to reopen {}: {}", info.path(), e),
            },
            Ok(None) => debug!("No controller attached"),
            Err(e) => warn!("Enumeration failed: {}", e),
        }
    }
}

/// Turn every output off and release the controller
fn shutdown(context: &mut DeviceContext, pipeline: &mut Pipeline) {
    if context.state() == ContextState::Connected {
        let reset = tokio::task::block_in_place(|| context.write_output(&OutputState::default()));
        if let Err(e) = reset {
            warn!("Failed to reset controller outputs: {}", e);
        }
    }
    context.close();

    if let Some(recorder) = pipeline.recorder.as_mut() {
        if let Err(e) = recorder.flush() {
            warn!("Failed to flush capture: {}", e);
        }
    }
}
