/// Record classifier for the sensor board's line protocol
///
/// Data records look like `DATA,<temperature>,<humidity>,<pressure>`, e.g.
/// `DATA,25.30,55.32,101825.32`. Anything else the board prints (interval
/// acknowledgements, `DATA,ERROR`, boot banners) is a diagnostic.
use log::{debug, warn};
use time::OffsetDateTime;

use crate::models::Sample;
use crate::utils::local_now;

const DATA_PREFIX: &str = "DATA,";
const DATA_FIELD_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Sample(Sample),
    /// Free text from the device, passed through for display only
    Diagnostic(String),
    /// A data record with a field that is not a finite number
    Malformed(String),
}

/// Classify a line, stamping accepted samples with the current local time.
pub fn classify(line: &str) -> Record {
    classify_at(line, local_now())
}

/// Classify a line, stamping an accepted sample with `now`.
pub fn classify_at(line: &str, now: OffsetDateTime) -> Record {
    if !line.starts_with(DATA_PREFIX) {
        return Record::Diagnostic(line.to_string());
    }

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != DATA_FIELD_COUNT {
        debug!("Data line with {} fields: {}", fields.len(), line);
        return Record::Diagnostic(line.to_string());
    }

    match (
        parse_reading(fields[1]),
        parse_reading(fields[2]),
        parse_reading(fields[3]),
    ) {
        (Some(temperature), Some(humidity), Some(pressure)) => Record::Sample(Sample {
            time: now,
            temperature,
            humidity,
            pressure,
        }),
        _ => {
            warn!("Malformed data record: {}", line);
            Record::Malformed(line.to_string())
        }
    }
}

fn parse_reading(field: &str) -> Option<f64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
