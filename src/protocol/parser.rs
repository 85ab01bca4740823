/// Line parser: turns raw device bytes into trimmed text lines
use std::time::Duration;

use crate::error::DeviceError;
use crate::serial::DeviceChannel;

/// How long to wait before polling again after a read produced nothing
pub const IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// One decoded line from the device, without terminator or surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine(String);

impl RawLine {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Decode bytes permissively
///
/// Invalid UTF-8 sequences are dropped rather than failing the line, then
/// whitespace (including `\r\n`) is trimmed from both ends.
pub fn decode_line(bytes: &[u8]) -> RawLine {
    let text: String = String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .collect();
    RawLine(text.trim().to_string())
}

/// Pulls decoded lines from a device channel, one per call.
pub struct LineParser<'a> {
    channel: &'a mut dyn DeviceChannel,
}

impl<'a> LineParser<'a> {
    pub fn new(channel: &'a mut dyn DeviceChannel) -> Self {
        Self { channel }
    }

    /// Read the next non-empty line
    ///
    /// `Ok(None)` means nothing usable arrived within the read timeout (or the
    /// line was blank); callers should wait [`IDLE_BACKOFF`] and try again.
    pub fn next_line(&mut self) -> Result<Option<RawLine>, DeviceError> {
        let Some(bytes) = self.channel.read_line()? else {
            return Ok(None);
        };

        let line = decode_line(&bytes);
        if line.0.is_empty() {
            return Ok(None);
        }
        Ok(Some(line))
    }
}
