use log::{error, info};
use tokio::sync::mpsc::unbounded_channel;

use serial_sensor_logger::config::LoggerConfig;
use serial_sensor_logger::serial::SerialOpener;
use serial_sensor_logger::session::{forward_events, LogObserver, Session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match LoggerConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Observer events are printed on their own task, in arrival order
    let (tx, rx) = unbounded_channel();
    let printer = tokio::spawn(async move {
        let mut observer = LogObserver;
        forward_events(rx, &mut observer).await;
    });

    let mut session = Session::new(SerialOpener, tx);
    if let Err(e) = session.start(&config.params) {
        error!("Failed to start logging: {}", e);
        drop(session);
        let _ = printer.await;
        return Err(e.into());
    }

    info!("Logging started. Press Ctrl+C to stop.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }

    session.stop().await;

    // Dropping the session closes the event channel and lets the printer finish
    drop(session);
    if let Err(e) = printer.await {
        error!("Event printer failed: {}", e);
    }

    info!("Program terminated by user. Exiting gracefully.");
    Ok(())
}
