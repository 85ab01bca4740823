//! Scripted in-memory device for exercising the session without hardware.
//!
//! A [`ScriptedDevice`] is a cheap handle onto shared state: tests keep one
//! handle to feed lines and inspect what was written, while the session owns
//! the clone handed out by [`ScriptedOpener`].

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::DeviceError;
use crate::serial::device::{DeviceChannel, DeviceOpener};

#[derive(Debug)]
enum ScriptedRead {
    Bytes(Vec<u8>),
    Timeout,
    Error(io::ErrorKind),
}

#[derive(Debug, Default)]
struct ScriptState {
    reads: VecDeque<ScriptedRead>,
    written: Vec<u8>,
    open: bool,
    open_count: usize,
    close_count: usize,
    last_baud_rate: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedDevice {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a line; the newline terminator is added.
    pub fn push_line(&self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        self.push_bytes(&bytes);
    }

    pub fn push_bytes(&self, bytes: &[u8]) {
        self.state().reads.push_back(ScriptedRead::Bytes(bytes.to_vec()));
    }

    pub fn push_timeout(&self) {
        self.state().reads.push_back(ScriptedRead::Timeout);
    }

    pub fn push_error(&self, kind: io::ErrorKind) {
        self.state().reads.push_back(ScriptedRead::Error(kind));
    }

    /// Number of queued reads not yet consumed
    pub fn remaining(&self) -> usize {
        self.state().reads.len()
    }

    /// Everything written to the device so far, lossily decoded
    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.state().written).into_owned()
    }

    pub fn open_count(&self) -> usize {
        self.state().open_count
    }

    pub fn close_count(&self) -> usize {
        self.state().close_count
    }

    pub fn last_baud_rate(&self) -> Option<u32> {
        self.state().last_baud_rate
    }
}

impl DeviceChannel for ScriptedDevice {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, DeviceError> {
        let mut state = self.state();
        if !state.open {
            return Err(DeviceError::Closed("scripted device is not open".to_string()));
        }

        match state.reads.pop_front() {
            Some(ScriptedRead::Bytes(bytes)) => Ok(Some(bytes)),
            Some(ScriptedRead::Error(kind)) => Err(DeviceError::from_io(io::Error::new(
                kind,
                "scripted read failure",
            ))),
            Some(ScriptedRead::Timeout) | None => Ok(None),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        let mut state = self.state();
        if !state.open {
            return Err(DeviceError::Closed("scripted device is not open".to_string()));
        }
        state.written.extend_from_slice(bytes);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state();
        if state.open {
            state.open = false;
            state.close_count += 1;
        }
    }

    fn is_open(&self) -> bool {
        self.state().open
    }
}

/// Hands out the shared [`ScriptedDevice`], or refuses to open when built with
/// [`ScriptedOpener::unavailable`].
#[derive(Debug, Clone)]
pub struct ScriptedOpener {
    device: ScriptedDevice,
    available: bool,
}

impl ScriptedOpener {
    pub fn new(device: ScriptedDevice) -> Self {
        Self {
            device,
            available: true,
        }
    }

    pub fn unavailable(device: ScriptedDevice) -> Self {
        Self {
            device,
            available: false,
        }
    }
}

impl DeviceOpener for ScriptedOpener {
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        _timeout: Duration,
    ) -> Result<Box<dyn DeviceChannel>, DeviceError> {
        if !self.available {
            return Err(DeviceError::Open {
                port: port.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such device"),
            });
        }

        {
            let mut state = self.device.state();
            state.open = true;
            state.open_count += 1;
            state.last_baud_rate = Some(baud_rate);
        }
        Ok(Box::new(self.device.clone()))
    }
}
