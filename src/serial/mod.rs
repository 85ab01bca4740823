pub mod device;
pub mod mock;

pub use device::{DeviceChannel, DeviceOpener, LineReader, SerialDevice, SerialOpener};
pub use mock::{ScriptedDevice, ScriptedOpener};
