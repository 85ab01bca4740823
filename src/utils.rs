/// Utility functions for timestamps and parameter parsing
use time::macros::format_description;
use time::OffsetDateTime;

use crate::error::ValidationError;

/// Current wall-clock time in the local zone.
///
/// The local offset cannot always be determined once other threads are running;
/// UTC is used in that case.
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Format a timestamp as written to the session log
///
/// Produces `YYYY-MM-DD HH:MM:SS` at second resolution.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    dt.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| dt.to_string())
}

/// Format just the time of day, `HH:MM:SS`, for status messages.
pub fn format_clock(dt: &OffsetDateTime) -> String {
    dt.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_else(|_| dt.to_string())
}

/// Parse a decimal start parameter into a positive integer
///
/// Shared by the baud rate and sampling interval so both are validated the same
/// way. Surrounding whitespace is ignored; signs, decimals and empty text are
/// rejected.
pub fn parse_positive_int(field: &'static str, text: &str) -> Result<u32, ValidationError> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::NotNumeric {
            field,
            value: text.to_string(),
        });
    }

    let value: u32 = text.parse().map_err(|_| ValidationError::NotNumeric {
        field,
        value: text.to_string(),
    })?;

    if value == 0 {
        return Err(ValidationError::NotPositive { field });
    }

    Ok(value)
}
