//! End-to-end session tests against the scripted device.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serial_sensor_logger::serial::{DeviceChannel, ScriptedDevice, ScriptedOpener};
use serial_sensor_logger::session::{EventReceiver, Session, SessionEvent};
use serial_sensor_logger::{Channel, SessionError, StartParams, Summary, ValidationError};
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn params(path: &Path) -> StartParams {
    StartParams {
        port: "/dev/ttyUSB0 (CP2102 USB to UART Bridge)".to_string(),
        baud_rate: "115200".to_string(),
        interval_ms: "5000".to_string(),
        csv_path: path.to_string_lossy().into_owned(),
    }
}

fn is_sample_trace(event: &SessionEvent) -> bool {
    matches!(event, SessionEvent::Trace(text) if text.contains(", T="))
}

/// Collect events until `count` sample display lines have been seen.
async fn wait_for_samples(rx: &mut EventReceiver, count: usize) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while events.iter().filter(|e| is_sample_trace(e)).count() < count {
        let event = timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for samples")
            .expect("event channel closed");
        events.push(event);
    }
    events
}

fn drain(rx: &mut EventReceiver) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn summaries(events: &[SessionEvent]) -> Vec<(Channel, Summary)> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Summary { channel, report } => Some((*channel, *report)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_session_logs_and_summarises_every_sample() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ambient.csv");

    let device = ScriptedDevice::new();
    device.push_line("Interval updated to: 5000 ms");
    for i in 0..5 {
        device.push_line(&format!("DATA,{}.5,{},{}", 20 + i, 40 + i, 101800 + i));
    }

    let (tx, mut rx) = unbounded_channel();
    let mut session = Session::new(ScriptedOpener::new(device.clone()), tx);
    session.start(&params(&path)).unwrap();
    assert!(session.is_running());
    assert_eq!(session.port(), Some("/dev/ttyUSB0"));

    let mut events = wait_for_samples(&mut rx, 5).await;
    session.stop().await;
    assert!(!session.is_running());
    events.extend(drain(&mut rx));

    assert_eq!(device.written(), "GAP,5000\n");
    assert_eq!(device.last_baud_rate(), Some(115200));
    assert!(!device.is_open());

    assert_eq!(
        events[0],
        SessionEvent::Trace("Sent interval command: GAP,5000".to_string())
    );
    assert!(matches!(&events[1], SessionEvent::Trace(t) if t.ends_with("Port /dev/ttyUSB0 opened. Logging started.")));
    assert!(matches!(&events[2], SessionEvent::Started { port, .. } if port == "/dev/ttyUSB0"));
    assert_eq!(
        events[3],
        SessionEvent::Trace("Interval updated to: 5000 ms".to_string())
    );

    let stopped_at = events
        .iter()
        .position(|e| matches!(e, SessionEvent::Stopped { .. }))
        .expect("stopped event");
    assert!(events[..stopped_at].iter().filter(|e| is_sample_trace(e)).count() == 5);

    let reports = summaries(&events);
    assert_eq!(
        reports.iter().map(|(c, _)| *c).collect::<Vec<_>>(),
        Channel::ALL.to_vec()
    );
    for (_, report) in &reports {
        assert_eq!(report.count(), 5);
    }
    assert_eq!(reports[0].1.mean(), Some(22.5));
    assert_eq!(reports[1].1.mean(), Some(42.0));

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "Time,Temperature,Humidity,Pressure");
    assert!(lines[1].ends_with(",20.5,40,101800"));
    assert!(lines[5].ends_with(",24.5,44,101804"));
}

#[tokio::test]
async fn test_known_values_give_expected_summary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("known.csv");

    let device = ScriptedDevice::new();
    for value in [10, 12, 14] {
        device.push_line(&format!("DATA,{},{},{}", value, value, value));
    }

    let (tx, mut rx) = unbounded_channel();
    let mut session = Session::new(ScriptedOpener::new(device), tx);
    session.start(&params(&path)).unwrap();
    wait_for_samples(&mut rx, 3).await;
    session.stop().await;

    let reports = summaries(&drain(&mut rx));
    assert_eq!(reports.len(), 3);
    for (_, report) in reports {
        match report {
            Summary::Computed {
                count,
                mean,
                std_dev,
            } => {
                assert_eq!(count, 3);
                assert!((mean - 12.0).abs() < 1e-9);
                assert!((std_dev - 2.0).abs() < 1e-9);
            }
            other => panic!("unexpected summary {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_malformed_and_diagnostic_lines_are_not_logged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noise.csv");

    let device = ScriptedDevice::new();
    device.push_line("DATA,25.3,abc,101800");
    device.push_line("DATA,ERROR");
    device.push_line("DATA,1,2,3,4");
    device.push_line("DATA,21.0,50.0,101000.0");

    let (tx, mut rx) = unbounded_channel();
    let mut session = Session::new(ScriptedOpener::new(device), tx);
    session.start(&params(&path)).unwrap();
    let mut events = wait_for_samples(&mut rx, 1).await;
    session.stop().await;
    events.extend(drain(&mut rx));

    let traces: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Trace(t) => Some(t.as_str()),
            _ => None,
        })
        .collect();
    assert!(traces.contains(&"DATA,25.3,abc,101800"));
    assert!(traces.contains(&"DATA,ERROR"));
    assert!(traces.contains(&"DATA,1,2,3,4"));

    let reports = summaries(&events);
    assert_eq!(reports.len(), 3);
    for (_, report) in reports {
        assert_eq!(report.count(), 1);
    }
    assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
}

#[tokio::test]
async fn test_start_while_running_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("twice.csv");

    let device = ScriptedDevice::new();
    device.push_line("DATA,1,2,3");

    let (tx, mut rx) = unbounded_channel();
    let mut session = Session::new(ScriptedOpener::new(device.clone()), tx);
    session.start(&params(&path)).unwrap();
    wait_for_samples(&mut rx, 1).await;

    let err = session.start(&params(&path)).unwrap_err();
    assert!(matches!(err, SessionError::AlreadyRunning));
    assert_eq!(device.open_count(), 1);
    assert!(session.is_running());

    session.stop().await;
    // The sample seen before the rejected start survives
    let reports = summaries(&drain(&mut rx));
    assert_eq!(reports.len(), 3);
    for (_, report) in reports {
        assert_eq!(report.count(), 1);
    }
}

#[tokio::test]
async fn test_stop_while_idle_is_silent() {
    let (tx, mut rx) = unbounded_channel();
    let mut session = Session::new(ScriptedOpener::new(ScriptedDevice::new()), tx);

    session.stop().await;

    assert!(!session.is_running());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_validation_failure_opens_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let device = ScriptedDevice::new();
    let (tx, mut rx) = unbounded_channel();
    let mut session = Session::new(ScriptedOpener::new(device.clone()), tx);

    let mut bad = params(&dir.path().join("x.csv"));
    bad.baud_rate = "high".to_string();

    let err = session.start(&bad).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::NotNumeric { field: "baud rate", .. })
    ));
    assert_eq!(device.open_count(), 0);
    assert!(!dir.path().join("x.csv").exists());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_device_open_failure_leaves_session_idle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never.csv");
    let (tx, mut rx) = unbounded_channel();
    let mut session = Session::new(ScriptedOpener::unavailable(ScriptedDevice::new()), tx);

    let err = session.start(&params(&path)).unwrap_err();

    assert!(matches!(err, SessionError::DeviceOpen(_)));
    assert!(!session.is_running());
    assert!(!path.exists());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_log_init_failure_closes_device() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("log.csv");
    let device = ScriptedDevice::new();
    let (tx, _rx) = unbounded_channel();
    let mut session = Session::new(ScriptedOpener::new(device.clone()), tx);

    let err = session.start(&params(&path)).unwrap_err();

    assert!(matches!(err, SessionError::LogInit(_)));
    assert!(!session.is_running());
    assert_eq!(device.open_count(), 1);
    assert_eq!(device.close_count(), 1);
    assert!(device.written().is_empty());
}

#[tokio::test]
async fn test_unwritable_existing_log_fails_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a-directory");
    fs::create_dir(&path).unwrap();
    let device = ScriptedDevice::new();
    let (tx, mut rx) = unbounded_channel();
    let mut session = Session::new(ScriptedOpener::new(device.clone()), tx);

    let err = session.start(&params(&path)).unwrap_err();

    assert!(matches!(err, SessionError::LogInit(_)));
    assert!(!session.is_running());
    assert_eq!(device.open_count(), 1);
    assert_eq!(device.close_count(), 1);
    assert!(!device.is_open());
    assert!(device.written().is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_non_numeric_interval_skips_command() {
    let dir = tempfile::tempdir().unwrap();
    let device = ScriptedDevice::new();
    let (tx, mut rx) = unbounded_channel();
    let mut session = Session::new(ScriptedOpener::new(device.clone()), tx);

    let mut p = params(&dir.path().join("gap.csv"));
    p.interval_ms = "fast".to_string();
    session.start(&p).unwrap();
    assert!(session.is_running());
    session.stop().await;

    assert!(device.written().is_empty());
    let events = drain(&mut rx);
    assert_eq!(
        events[0],
        SessionEvent::Trace("Warning: Interval is not numeric, skipping GAP command.".to_string())
    );
    assert!(summaries(&events)
        .iter()
        .all(|(_, report)| *report == Summary::NoData));
}

#[tokio::test]
async fn test_restart_appends_to_same_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("resume.csv");

    let device = ScriptedDevice::new();
    let (tx, mut rx) = unbounded_channel();
    let mut session = Session::new(ScriptedOpener::new(device.clone()), tx);

    device.push_line("DATA,1,2,3");
    session.start(&params(&path)).unwrap();
    wait_for_samples(&mut rx, 1).await;
    session.stop().await;
    drain(&mut rx);

    device.push_line("DATA,4,5,6");
    session.start(&params(&path)).unwrap();
    wait_for_samples(&mut rx, 1).await;
    session.stop().await;

    // Statistics are per session; the log spans both
    let reports = summaries(&drain(&mut rx));
    assert_eq!(reports.len(), 3);
    for (_, report) in reports {
        assert_eq!(report.count(), 1);
    }
    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.matches("Time,Temperature,Humidity,Pressure").count(), 1);
    assert_eq!(content.lines().count(), 3);
    assert_eq!(device.open_count(), 2);
}
