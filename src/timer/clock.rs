use std::time::Instant;

use chrono::{DateTime, Local};

use crate::calendar::truncate_to_millis;

/// Source of wall-clock and monotonic time.
pub trait Clock {
    fn wall_now(&self) -> DateTime<Local>;
    /// Milliseconds on a monotonic scale local to this process.
    fn monotonic_ms(&self) -> i64;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn wall_now(&self) -> DateTime<Local> {
        truncate_to_millis(Local::now())
    }

    fn monotonic_ms(&self) -> i64 {
        self.origin.elapsed().as_millis() as i64
    }
}
