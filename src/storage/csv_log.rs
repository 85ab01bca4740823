/// Append-only CSV session log
///
/// Every row is written with its own open/write/close so the file only ever
/// holds complete rows and nothing stays locked between samples.
use log::{debug, info};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::LogError;
use crate::models::Sample;
use crate::utils::format_datetime;

pub const HEADER: [&str; 4] = ["Time", "Temperature", "Humidity", "Pressure"];

/// Handle to a session's log file. Holds the path only, never an open file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    /// Make sure the log exists, writing the header if it had to be created
    ///
    /// An existing file is left untouched and logging resumes by appending.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, LogError> {
        let path = path.into();

        if !path.exists() {
            write_rows(&path, true, None).map_err(|source| LogError::Init {
                path: path.clone(),
                source,
            })?;
            info!("Created session log {}", path.display());
        } else {
            // Fail now rather than on every sample if the file is not writable
            OpenOptions::new()
                .append(true)
                .open(&path)
                .map_err(|e| LogError::Init {
                    path: path.clone(),
                    source: e.into(),
                })?;
            info!("Appending to existing session log {}", path.display());
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, sample: &Sample) -> Result<(), LogError> {
        append(&self.path, sample)
    }
}

/// Append one sample row to `path`
///
/// If the file does not exist yet it is created with the header first.
pub fn append(path: &Path, sample: &Sample) -> Result<(), LogError> {
    let is_new = !path.exists();
    write_rows(path, is_new, Some(sample)).map_err(|source| LogError::Append {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Appended sample to {}", path.display());
    Ok(())
}

/// Format a sample as a log row: timestamp then the three readings.
pub fn sample_row(sample: &Sample) -> [String; 4] {
    [
        format_datetime(&sample.time),
        sample.temperature.to_string(),
        sample.humidity.to_string(),
        sample.pressure.to_string(),
    ]
}

fn write_rows(path: &Path, header: bool, sample: Option<&Sample>) -> Result<(), csv::Error> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file);

    if header {
        writer.write_record(HEADER)?;
    }
    if let Some(sample) = sample {
        writer.write_record(sample_row(sample))?;
    }

    writer.flush()?;
    Ok(())
}
