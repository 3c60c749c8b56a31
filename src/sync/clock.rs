//! Transport clock and phase-locked bar scheduling

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

/// Epsilon below which an elapsed-bar offset is treated as exactly zero,
/// to absorb floating-point jitter in `now() - loop_start_time`.
const BAR_EPSILON: Duration = Duration::from_micros(100);

/// Monotonic audio-domain time source. `now()` is measured from
/// construction, not wall-clock time.
pub struct TransportClock {
    origin: Instant,
    bpm: Arc<Mutex<Option<f32>>>,
}

impl Default for TransportClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportClock {
    /// Create a new clock whose `now()` starts at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            bpm: Arc::new(Mutex::new(None)),
        }
    }

    /// Audio-domain seconds elapsed since construction.
    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    /// Record the derived master BPM, purely for reporting via
    /// `TransportChanged` events; does not affect scheduling.
    pub fn set_bpm(&self, bpm: f32) {
        *self.bpm.lock() = Some(bpm);
    }

    /// Currently known master BPM, if any.
    pub fn bpm(&self) -> Option<f32> {
        *self.bpm.lock()
    }

    /// Compute the next bar-aligned start time and wait, per spec §4.1.
    ///
    /// Given the master's `loop_start_time` (`t0`) and `master_duration`,
    /// the elapsed offset within the current bar is
    /// `e = (now - t0) mod master_duration` (treated as `0` when smaller
    /// than [`BAR_EPSILON`]). The dependent track should start recording
    /// at `now + (master_duration - e) * divider`.
    ///
    /// If no master is set (`master` is `None`), returns `(now, 0.0)`
    /// immediately — nothing to align to.
    pub fn schedule_next_bar(&self, master: Option<(f64, f64)>, divider: u32) -> (f64, f64) {
        let now = self.now();
        let Some((loop_start_time, master_duration)) = master else {
            return (now, 0.0);
        };
        if master_duration <= 0.0 {
            return (now, 0.0);
        }

        let mut elapsed = (now - loop_start_time).rem_euclid(master_duration);
        if elapsed < BAR_EPSILON.as_secs_f64() {
            elapsed = 0.0;
        }

        let wait_to_bar = master_duration - elapsed;

        let start_at = now + wait_to_bar * divider as f64;
        let wait = (start_at - now).max(0.0);
        (start_at, wait)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_master_means_immediate_start() {
        let clock = TransportClock::new();
        let (start_at, wait) = clock.schedule_next_bar(None, 1);
        assert!((start_at - clock.now()).abs() < 0.05);
        assert_eq!(wait, 0.0);
    }

    #[test]
    fn schedules_at_next_bar_boundary() {
        let clock = TransportClock::new();
        let now = clock.now();
        // Master started "now" (elapsed 0, treated as the boundary per
        // spec's `e < epsilon` => 0 => wait_to_bar = duration).
        let (start_at, wait) = clock.schedule_next_bar(Some((now, 2.0)), 1);
        assert!((wait - 2.0).abs() < 0.05);
        assert!((start_at - (now + 2.0)).abs() < 0.05);
    }

    #[test]
    fn divider_multiplies_wait() {
        let clock = TransportClock::new();
        let now = clock.now();
        let (_, wait) = clock.schedule_next_bar(Some((now, 2.0)), 3);
        assert!((wait - 6.0).abs() < 0.05);
    }

    #[test]
    fn never_returns_negative_wait() {
        let clock = TransportClock::new();
        let now = clock.now();
        for offset in [-10.0, -0.001, 0.0, 0.001, 10.0] {
            let (_, wait) = clock.schedule_next_bar(Some((now + offset, 1.5)), 2);
            assert!(wait >= 0.0);
        }
    }
}
