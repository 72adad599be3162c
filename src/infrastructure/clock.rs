// Wall-clock adapter used to position playback within the day
use chrono::{Local, Timelike};

pub trait Clock: Send + Sync {
    /// Milliseconds elapsed since local midnight.
    fn millis_since_midnight(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn millis_since_midnight(&self) -> u64 {
        let now = Local::now();
        let seconds = now.num_seconds_from_midnight() as u64;
        // Leap seconds report nanos above 1e9; clamp to the last millisecond of the second
        let millis = (now.nanosecond() / 1_000_000).min(999) as u64;
        seconds * 1000 + millis
    }
}

/// A clock frozen at a given time of day.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    millis: u64,
}

#[cfg(test)]
impl FixedClock {
    pub fn at_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn at_hms(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self::at_millis(((hours * 60 + minutes) * 60 + seconds) * 1000)
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn millis_since_midnight(&self) -> u64 {
        self.millis
    }
}
