//! Serial sensor logger.
//!
//! Reads `DATA,<temperature>,<humidity>,<pressure>` records from a serial
//! sensor board, appends each accepted reading to a CSV log and keeps running
//! per-channel statistics for the session.

pub mod config;
pub mod error;
pub mod models;
pub mod protocol;
pub mod serial;
pub mod session;
pub mod stats;
pub mod storage;
pub mod utils;

pub use config::{LoggerConfig, StartParams};
pub use error::{DeviceError, LogError, SessionError, ValidationError};
pub use models::{Channel, Sample};
pub use session::{Session, SessionEvent, SessionObserver};
pub use stats::{ChannelStats, SessionStats, Summary};
