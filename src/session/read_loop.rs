/// Read loop body: device -> parser -> classifier -> log, statistics, observer
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use crate::error::DeviceError;
use crate::models::Sample;
use crate::protocol::{classify, LineParser, Record, IDLE_BACKOFF};
use crate::serial::DeviceChannel;
use crate::session::events::{emit, EventSender, SessionEvent};
use crate::stats::SessionStats;
use crate::storage::SessionLog;
use crate::utils::format_datetime;

/// Pause after a failed read before trying again
pub const ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// What the loop hands back to the session once it exits.
pub struct ReadLoopExit {
    pub device: Box<dyn DeviceChannel>,
    pub stats: SessionStats,
}

/// Display line for an accepted sample
pub fn format_sample(sample: &Sample) -> String {
    format!(
        "{}, T={}, H={}, P={}",
        format_datetime(&sample.time),
        sample.temperature,
        sample.humidity,
        sample.pressure
    )
}

/// Run until `stop` is raised or the device goes away.
///
/// Owns the device and statistics for the whole session. No failure inside
/// the loop escapes it: everything is reported as a trace event.
pub fn run_read_loop(
    mut device: Box<dyn DeviceChannel>,
    log: SessionLog,
    mut stats: SessionStats,
    stop: Arc<AtomicBool>,
    events: EventSender,
) -> ReadLoopExit {
    debug!("Read loop started, logging to {}", log.path().display());

    while !stop.load(Ordering::Acquire) {
        let next = LineParser::new(device.as_mut()).next_line();

        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => {
                sleep(IDLE_BACKOFF);
                continue;
            }
            Err(DeviceError::Closed(reason)) => {
                // stop() raced the read; not worth reporting
                if !stop.load(Ordering::Acquire) {
                    warn!("Device channel closed: {}", reason);
                    emit(&events, SessionEvent::Trace(format!("Error: {}", reason)));
                }
                break;
            }
            Err(e) => {
                warn!("Read failed: {}", e);
                emit(&events, SessionEvent::Trace(format!("Error: {}", e)));
                sleep(ERROR_BACKOFF);
                continue;
            }
        };

        match classify(line.as_str()) {
            Record::Sample(sample) => {
                if let Err(e) = log.append(&sample) {
                    warn!("{}", e);
                    emit(&events, SessionEvent::Trace(format!("Error: {}", e)));
                }
                emit(&events, SessionEvent::Trace(format_sample(&sample)));
                // Counted even if the row could not be written
                stats.update_sample(&sample);
            }
            Record::Diagnostic(text) | Record::Malformed(text) => {
                emit(&events, SessionEvent::Trace(text));
            }
        }
    }

    if device.is_open() {
        device.close();
    }
    info!("Read loop finished");

    ReadLoopExit { device, stats }
}
