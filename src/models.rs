use std::fmt;
use time::OffsetDateTime;

/// One validated reading from the sensor board.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: OffsetDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
}

impl Sample {
    /// Value of a single measured quantity
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
            Channel::Pressure => self.pressure,
        }
    }
}

/// The three measured quantities, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Temperature,
    Humidity,
    Pressure,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Temperature, Channel::Humidity, Channel::Pressure];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Temperature => "Temperature",
            Channel::Humidity => "Humidity",
            Channel::Pressure => "Pressure",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Channel::Temperature => 0,
            Channel::Humidity => 1,
            Channel::Pressure => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
