/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::thread;
use std::time::{Duration, Instant};

/// Default clock rate: 100,000 cycles per second.
pub const DEFAULT_FREQUENCY_HZ: u64 = 100_000;

/// Paces the fetch/execute loop against a target clock using an
/// absolute deadline rather than a relative "sleep one period"
/// duration, so accumulated scheduling jitter doesn't drift the
/// average rate. `disabled()` skips sleeping entirely; tests that
/// only care about architectural state use it so they don't spend
/// wall-clock time on pacing that has no bearing on the result (§9).
pub struct Clock {
    period: Duration,
    deadline: Option<Instant>,
    enabled: bool,
}

impl Clock {
    pub fn new(frequency_hz: u64) -> Self {
        Clock { period: Duration::from_secs_f64(1.0 / frequency_hz as f64), deadline: None, enabled: true }
    }

    pub fn disabled() -> Self {
        Clock { period: Duration::ZERO, deadline: None, enabled: false }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY_HZ)
    }
}

impl Clock {
    /// Blocks until the next cycle boundary, then advances the
    /// deadline by one period.
    pub fn tick(&mut self) {
        if !self.enabled {
            return;
        }
        let now = Instant::now();
        let deadline = *self.deadline.get_or_insert(now);
        if deadline > now {
            thread::sleep(deadline - now);
        }
        self.deadline = Some(deadline + self.period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_clock_never_blocks() {
        let mut clock = Clock::disabled();
        let start = Instant::now();
        for _ in 0..1000 {
            clock.tick();
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn enabled_clock_tracks_a_deadline() {
        let mut clock = Clock::new(1_000_000);
        clock.tick();
        assert!(clock.deadline.is_some());
    }
}
