//! Session statistics per measured channel
//!
//! Uses Welford's online algorithm so the mean and sample standard deviation
//! are available after any number of readings without keeping the readings
//! themselves.

use std::fmt;

use crate::models::{Channel, Sample};

/// Running aggregate for a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelStats {
    count: u64,
    mean: f64,
    /// Sum of squared differences from the mean (M2)
    m2: f64,
}

impl ChannelStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one reading into the aggregate.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sum_squared_deviation(&self) -> f64 {
        self.m2
    }

    /// Summarise the aggregate; sample (n - 1) standard deviation.
    pub fn finalize(&self) -> Summary {
        match self.count {
            0 => Summary::NoData,
            1 => Summary::OneSample { mean: self.mean },
            count => Summary::Computed {
                count,
                mean: self.mean,
                std_dev: (self.m2 / (count - 1) as f64).sqrt(),
            },
        }
    }
}

/// End-of-session report for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Summary {
    NoData,
    /// Standard deviation is zero by definition
    OneSample { mean: f64 },
    Computed { count: u64, mean: f64, std_dev: f64 },
}

impl Summary {
    pub fn count(&self) -> u64 {
        match self {
            Summary::NoData => 0,
            Summary::OneSample { .. } => 1,
            Summary::Computed { count, .. } => *count,
        }
    }

    pub fn mean(&self) -> Option<f64> {
        match self {
            Summary::NoData => None,
            Summary::OneSample { mean } | Summary::Computed { mean, .. } => Some(*mean),
        }
    }

    pub fn std_dev(&self) -> Option<f64> {
        match self {
            Summary::NoData => None,
            Summary::OneSample { .. } => Some(0.0),
            Summary::Computed { std_dev, .. } => Some(*std_dev),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Summary::NoData => write!(f, "no data"),
            Summary::OneSample { mean } => {
                write!(f, "mean {:.2}, std dev 0.00 (single sample)", mean)
            }
            Summary::Computed {
                count,
                mean,
                std_dev,
            } => write!(
                f,
                "mean {:.2}, std dev {:.2} over {} samples",
                mean, std_dev, count
            ),
        }
    }
}

/// Aggregates for all three channels, owned by one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    channels: [ChannelStats; 3],
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, channel: Channel, value: f64) {
        self.channels[channel.index()].update(value);
    }

    /// Fold every channel of a sample in.
    pub fn update_sample(&mut self, sample: &Sample) {
        for channel in Channel::ALL {
            self.update(channel, sample.value(channel));
        }
    }

    pub fn reset(&mut self, channel: Channel) {
        self.channels[channel.index()].reset();
    }

    pub fn reset_all(&mut self) {
        for channel in Channel::ALL {
            self.reset(channel);
        }
    }

    pub fn channel(&self, channel: Channel) -> &ChannelStats {
        &self.channels[channel.index()]
    }

    pub fn finalize(&self, channel: Channel) -> Summary {
        self.channel(channel).finalize()
    }

    /// Summaries in wire order: temperature, humidity, pressure
    pub fn summaries(&self) -> [(Channel, Summary); 3] {
        Channel::ALL.map(|channel| (channel, self.finalize(channel)))
    }
}
