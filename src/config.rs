use std::env;

const DEFAULT_BAUD_RATE: &str = "115200";
const DEFAULT_INTERVAL_MS: &str = "5000";

/// Raw session parameters as entered by the user.
///
/// Values stay as text until `Session::start` validates them, so a bad value is
/// reported against the field it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartParams {
    pub port: String,
    pub baud_rate: String,
    pub interval_ms: String,
    pub csv_path: String,
}

impl StartParams {
    /// Device name without a trailing `(description)` added by port pickers
    pub fn resolved_port(&self) -> &str {
        resolve_port_name(&self.port)
    }
}

/// Strip the `" (USB-SERIAL CH340)"` style description from a port label.
pub fn resolve_port_name(label: &str) -> &str {
    let label = label.trim();
    match label.split_once('(') {
        Some((device, _)) => device.trim(),
        None => label,
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub params: StartParams,
}

impl LoggerConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let params = StartParams {
            port: env::var("SERIAL_PORT").unwrap_or_default(),
            baud_rate: env::var("BAUD_RATE").unwrap_or_else(|_| DEFAULT_BAUD_RATE.to_string()),
            interval_ms: env::var("INTERVAL_MS")
                .unwrap_or_else(|_| DEFAULT_INTERVAL_MS.to_string()),
            csv_path: env::var("CSV_PATH").unwrap_or_default(),
        };

        if params.port.trim().is_empty() {
            return Err("No serial port configured. Please set the SERIAL_PORT environment variable".into());
        }
        if params.csv_path.trim().is_empty() {
            return Err("No log file configured. Please set the CSV_PATH environment variable".into());
        }

        Ok(LoggerConfig { params })
    }
}
