/// Serial device channel: the physical link to the sensor board
use log::{debug, trace};
use serialport::SerialPort;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::time::Duration;

use crate::error::DeviceError;

/// A line-oriented, timed link to a device.
///
/// Implementations are owned by exactly one thread at a time; the read loop
/// takes the channel over for the whole session.
pub trait DeviceChannel: Send {
    /// Read one newline-terminated line of raw bytes.
    ///
    /// Returns `Ok(None)` when the read timeout elapsed before a full line
    /// arrived. Bytes received so far are kept and completed by the next call.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, DeviceError>;

    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError>;

    /// Release the link. Safe to call more than once.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Opens device channels by port name.
pub trait DeviceOpener: Send + Sync {
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Box<dyn DeviceChannel>, DeviceError>;
}

/// Newline framing over any timed byte source.
///
/// Bytes read before a timeout stay in `pending` and are completed by the
/// next call, so a line split across reads is never lost or duplicated.
pub struct LineReader<R> {
    name: String,
    reader: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(name: &str, inner: R) -> Self {
        Self {
            name: name.to_string(),
            reader: BufReader::new(inner),
            pending: Vec::new(),
        }
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.reader.get_mut()
    }

    /// Read one line, or `Ok(None)` if the source timed out first.
    pub fn read_line(&mut self) -> Result<Option<Vec<u8>>, DeviceError> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => {
                Err(DeviceError::Closed(format!("{} reached end of stream", self.name)))
            }
            // Either a full line or the final unterminated bytes before end of stream
            Ok(_) => Ok(Some(std::mem::take(&mut self.pending))),
            Err(e) if matches!(
                e.kind(),
                ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
            ) =>
            {
                Ok(None)
            }
            Err(e) => Err(DeviceError::from_io(e)),
        }
    }
}

/// [`DeviceChannel`] over a `serialport` handle.
pub struct SerialDevice {
    port_name: String,
    reader: Option<LineReader<Box<dyn SerialPort>>>,
}

impl SerialDevice {
    pub fn new(port_name: &str, port: Box<dyn SerialPort>) -> Self {
        Self {
            port_name: port_name.to_string(),
            reader: Some(LineReader::new(port_name, port)),
        }
    }
}

impl DeviceChannel for SerialDevice {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, DeviceError> {
        self.reader
            .as_mut()
            .ok_or_else(|| DeviceError::Closed(format!("{} is not open", self.port_name)))?
            .read_line()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| DeviceError::Closed(format!("{} is not open", self.port_name)))?;

        trace!(
            "Writing to {}: '{}'",
            self.port_name,
            String::from_utf8_lossy(bytes).escape_default()
        );

        let port = reader.get_mut();
        port.write_all(bytes).map_err(DeviceError::from_io)?;
        port.flush().map_err(DeviceError::from_io)
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!("Closed serial port {}", self.port_name);
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}

/// Opens real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl DeviceOpener for SerialOpener {
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Box<dyn DeviceChannel>, DeviceError> {
        let handle = serialport::new(port, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| DeviceError::Open {
                port: port.to_string(),
                source: e.into(),
            })?;

        debug!("Opened serial port {} at {} baud", port, baud_rate);
        Ok(Box::new(SerialDevice::new(port, handle)))
    }
}
