use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use telemon_common::types::Reading;

/// Time-bounded window of readings for one (device sensor, rule) key.
///
/// Eviction is driven by the timestamps the engine passes in, never by wall
/// clock, so replaying a series is deterministic.
pub struct SlidingWindow {
    window_secs: i64,
    data: VecDeque<Reading>,
}

impl SlidingWindow {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window_secs: window_secs as i64,
            data: VecDeque::new(),
        }
    }

    pub fn push(&mut self, reading: Reading) {
        self.data.push_back(reading);
    }

    pub fn evict(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::seconds(self.window_secs);
        while let Some(front) = self.data.front() {
            if front.timestamp < cutoff {
                self.data.pop_front();
            } else {
                break;
            }
        }
    }

    /// Contiguous view of the window, oldest first, without allocating.
    pub fn as_contiguous_slice(&mut self) -> &[Reading] {
        self.data.make_contiguous()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
