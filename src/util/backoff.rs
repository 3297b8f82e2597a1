//! Idle backoff for queue workers waiting on new commands.

use std::hint::spin_loop;
use std::thread;
use std::time::Duration;

/// Spin, then yield, then park with a bounded timeout.
///
/// Parking is bounded so a worker that misses an unpark still notices new
/// work or shutdown within [`Backoff::PARK_TIMEOUT`].
#[derive(Debug, Default)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6;
    const YIELD_LIMIT: u32 = 10;
    pub const PARK_TIMEOUT: Duration = Duration::from_millis(5);

    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Whether the next [`snooze`](Self::snooze) will park the thread.
    pub fn is_parking(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }

    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..(1u32 << self.step) {
                spin_loop();
            }
        } else if self.step <= Self::YIELD_LIMIT {
            thread::yield_now();
        } else {
            thread::park_timeout(Self::PARK_TIMEOUT);
        }

        if self.step <= Self::YIELD_LIMIT {
            self.step += 1;
        }
    }
}
