//! Tick rate measurement.

use std::time::Duration;

/// Number of samples in the rolling rate window.
pub const RATE_WINDOW: usize = 10;

/// Fixed ring of the most recent instantaneous rates with a running sum.
#[derive(Debug, Clone)]
pub struct RateWindow {
    samples: [f64; RATE_WINDOW],
    sum: f64,
    recorded: u64,
}

impl Default for RateWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl RateWindow {
    /// Creates an empty window.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            samples: [0.0; RATE_WINDOW],
            sum: 0.0,
            recorded: 0,
        }
    }

    /// Records `rate` in slot `recorded mod RATE_WINDOW` and returns the new
    /// average.
    pub fn record(&mut self, rate: f64) -> f64 {
        let slot = self.slot();
        if let Some(sample) = self.samples.get_mut(slot) {
            self.sum += rate - *sample;
            *sample = rate;
        }
        self.recorded += 1;
        self.average()
    }

    /// Mean of the `min(recorded, RATE_WINDOW)` most recent samples.
    #[must_use]
    pub fn average(&self) -> f64 {
        let filled = self.filled();
        if filled == 0 {
            return 0.0;
        }
        self.sum / f64::from(filled)
    }

    /// Total number of samples ever recorded.
    #[must_use]
    pub const fn recorded(&self) -> u64 {
        self.recorded
    }

    fn slot(&self) -> usize {
        // RATE_WINDOW is tiny, so the remainder always fits.
        usize::try_from(self.recorded % RATE_WINDOW as u64).unwrap_or_default()
    }

    fn filled(&self) -> u32 {
        u32::try_from(self.recorded.min(RATE_WINDOW as u64)).unwrap_or_default()
    }
}

/// Timing figures published after every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickSnapshot {
    /// Ticks completed since the engine started.
    pub tick_count: u64,
    /// Instantaneous rate of the last tick, in hertz.
    pub current_rate: f64,
    /// Rolling average over the last ten ticks, in hertz.
    pub average_rate: f64,
    /// Wall-clock time spent migrating and running work in the last tick.
    pub elapsed: Duration,
    /// Configured target rate, in hertz.
    pub target_rate: f64,
}

/// Converts a tick's measured duration into a rate.
///
/// Returns `None` for a non-positive duration, which callers treat as a clock
/// anomaly.
#[must_use]
pub fn instantaneous_rate(elapsed: Duration) -> Option<f64> {
    let seconds = elapsed.as_secs_f64();
    (seconds > 0.0).then(|| seconds.recip())
}
