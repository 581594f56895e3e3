//! Monotonic timing for the `dur_ms` field of log events.

use std::time::Instant;

/// Started on creation; reads elapsed milliseconds without stopping.
#[derive(Copy, Clone, Debug)]
pub struct Stopwatch(Instant);

impl Stopwatch {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.0.elapsed().as_millis()
    }
}
