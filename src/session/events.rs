/// Observer events emitted by a logging session
use log::{debug, info};
use time::OffsetDateTime;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::models::Channel;
use crate::stats::Summary;

/// Everything a presentation layer needs to follow a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Informational line: sent commands, samples, diagnostics, errors
    Trace(String),
    Started { port: String, at: OffsetDateTime },
    Stopped { at: OffsetDateTime },
    Summary { channel: Channel, report: Summary },
}

pub type EventSender = UnboundedSender<SessionEvent>;
pub type EventReceiver = UnboundedReceiver<SessionEvent>;

/// Receives session events, in the order they were produced.
pub trait SessionObserver {
    fn on_trace(&mut self, text: &str);
    fn on_session_started(&mut self, port: &str, at: OffsetDateTime);
    fn on_session_stopped(&mut self, at: OffsetDateTime);
    fn on_summary(&mut self, channel: Channel, report: &Summary);

    fn notify(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Trace(text) => self.on_trace(text),
            SessionEvent::Started { port, at } => self.on_session_started(port, *at),
            SessionEvent::Stopped { at } => self.on_session_stopped(*at),
            SessionEvent::Summary { channel, report } => self.on_summary(*channel, report),
        }
    }
}

/// Deliver events to `observer` until every sender has been dropped.
pub async fn forward_events<O: SessionObserver>(mut events: EventReceiver, observer: &mut O) {
    while let Some(event) = events.recv().await {
        observer.notify(&event);
    }
}

/// Send an event, ignoring a receiver that has gone away.
pub(crate) fn emit(events: &EventSender, event: SessionEvent) {
    if let Err(e) = events.send(event) {
        debug!("Session event dropped, no observer attached: {:?}", e.0);
    }
}

/// Observer that writes every event to the log.
#[derive(Debug, Default)]
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn on_trace(&mut self, text: &str) {
        info!("{}", text);
    }

    fn on_session_started(&mut self, port: &str, at: OffsetDateTime) {
        info!("Session started on {} at {}", port, crate::utils::format_datetime(&at));
    }

    fn on_session_stopped(&mut self, at: OffsetDateTime) {
        info!("Session stopped at {}", crate::utils::format_datetime(&at));
    }

    fn on_summary(&mut self, channel: Channel, report: &Summary) {
        info!("Summary for {}: {}", channel, report);
    }
}
