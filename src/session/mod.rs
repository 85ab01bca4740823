//! Logging session lifecycle: `Idle -> Running -> Idle`.
//!
//! `start` validates parameters, opens the device and the log, sends the
//! sampling interval and hands everything to a read loop on Tokio's blocking
//! pool. `stop` raises a cooperative stop flag, waits for the loop to hand back
//! its statistics and reports the per-channel summaries. All reporting goes out
//! as [`SessionEvent`]s on the channel given to [`Session::new`].

pub mod events;
pub mod read_loop;

use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::StartParams;
use crate::error::{SessionError, ValidationError};
use crate::serial::DeviceOpener;
use crate::stats::SessionStats;
use crate::storage::SessionLog;
use crate::utils::{format_clock, local_now, parse_positive_int};

pub use events::{
    forward_events, EventReceiver, EventSender, LogObserver, SessionEvent, SessionObserver,
};
pub use read_loop::{format_sample, run_read_loop, ReadLoopExit, ERROR_BACKOFF};

use events::emit;

/// Upper bound on a single device read, and so on how long `stop` waits
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Start parameters after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedParams {
    pub port: String,
    pub baud_rate: u32,
    /// `None` when the interval text was not a positive integer
    pub interval_ms: Option<u32>,
    pub csv_path: PathBuf,
}

/// Check the raw parameters, naming the first bad field.
pub fn validate(params: &StartParams) -> Result<ValidatedParams, ValidationError> {
    let port = params.resolved_port();
    if port.is_empty() {
        return Err(ValidationError::MissingField("serial port"));
    }

    let baud_rate = parse_positive_int("baud rate", &params.baud_rate)?;

    let csv_path = params.csv_path.trim();
    if csv_path.is_empty() {
        return Err(ValidationError::MissingField("log file path"));
    }

    Ok(ValidatedParams {
        port: port.to_string(),
        baud_rate,
        interval_ms: parse_positive_int("interval", &params.interval_ms).ok(),
        csv_path: PathBuf::from(csv_path),
    })
}

pub struct RunningSession {
    port: String,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<ReadLoopExit>,
}

pub enum SessionState {
    Idle,
    Running(RunningSession),
}

pub struct Session<O: DeviceOpener> {
    opener: O,
    events: EventSender,
    state: SessionState,
}

impl<O: DeviceOpener> Session<O> {
    pub fn new(opener: O, events: EventSender) -> Self {
        Self {
            opener,
            events,
            state: SessionState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SessionState::Running(_))
    }

    /// Resolved port name of the running session
    pub fn port(&self) -> Option<&str> {
        match &self.state {
            SessionState::Running(running) => Some(&running.port),
            SessionState::Idle => None,
        }
    }

    /// Begin a logging session.
    ///
    /// Must be called from within a Tokio runtime. On error nothing is left
    /// open and the session stays idle.
    pub fn start(&mut self, params: &StartParams) -> Result<(), SessionError> {
        if self.is_running() {
            warn!("Start requested while logging is already running");
            return Err(SessionError::AlreadyRunning);
        }

        let params = validate(params)?;

        let mut device = self
            .opener
            .open(&params.port, params.baud_rate, READ_TIMEOUT)
            .map_err(|e| {
                error!("{}", e);
                SessionError::DeviceOpen(e)
            })?;

        let log = match SessionLog::create(&params.csv_path) {
            Ok(log) => log,
            Err(e) => {
                error!("{}", e);
                device.close();
                return Err(e.into());
            }
        };

        match params.interval_ms {
            Some(interval) => {
                let command = format!("GAP,{}\n", interval);
                match device.write(command.as_bytes()) {
                    Ok(()) => self.trace(format!("Sent interval command: {}", command.trim_end())),
                    Err(e) => {
                        warn!("Failed to send interval command: {}", e);
                        self.trace(format!("Error: failed to send interval command: {}", e));
                    }
                }
            }
            None => {
                warn!("Sampling interval is not numeric, GAP command skipped");
                self.trace("Warning: Interval is not numeric, skipping GAP command.".to_string());
            }
        }

        let mut stats = SessionStats::new();
        stats.reset_all();

        let now = local_now();
        self.trace(format!(
            "[{}] Port {} opened. Logging started.",
            format_clock(&now),
            params.port
        ));
        emit(
            &self.events,
            SessionEvent::Started {
                port: params.port.clone(),
                at: now,
            },
        );

        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let stop = Arc::clone(&stop);
            let events = self.events.clone();
            tokio::task::spawn_blocking(move || run_read_loop(device, log, stats, stop, events))
        };

        info!(
            "Logging {} at {} baud to {}",
            params.port,
            params.baud_rate,
            params.csv_path.display()
        );
        self.state = SessionState::Running(RunningSession {
            port: params.port,
            stop,
            handle,
        });
        Ok(())
    }

    /// End the session and report the summaries. Does nothing when idle.
    pub async fn stop(&mut self) {
        let SessionState::Running(running) = std::mem::replace(&mut self.state, SessionState::Idle)
        else {
            return;
        };

        running.stop.store(true, Ordering::Release);

        let stats = match running.handle.await {
            Ok(mut exit) => {
                exit.device.close();
                Some(exit.stats)
            }
            Err(e) => {
                error!("Read loop for {} terminated abnormally: {}", running.port, e);
                self.trace(format!("Error: read loop terminated abnormally: {}", e));
                None
            }
        };

        let now = local_now();
        self.trace(format!("[{}] Logging stopped. Port closed.", format_clock(&now)));
        emit(&self.events, SessionEvent::Stopped { at: now });
        info!("Logging on {} stopped", running.port);

        if let Some(stats) = stats {
            for (channel, report) in stats.summaries() {
                emit(&self.events, SessionEvent::Summary { channel, report });
            }
        }
    }

    fn trace(&self, text: String) {
        emit(&self.events, SessionEvent::Trace(text));
    }
}

impl<O: DeviceOpener> Drop for Session<O> {
    fn drop(&mut self) {
        // Let a still-running loop wind down on its own
        if let SessionState::Running(running) = &self.state {
            running.stop.store(true, Ordering::Release);
        }
    }
}
