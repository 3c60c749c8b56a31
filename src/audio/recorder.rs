//! Single-capture recorder and the process-wide recording lease

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::core::buffer::AudioBuffer;
use crate::error::LoopEngineError;

/// Process-wide mutex serializing all capture operations (spec §3
/// "Recording Lease"). Only [`Recorder`] acquires it.
pub struct RecordingLease {
    acquired_at: Mutex<Option<Instant>>,
    hard_expiration: Duration,
}

impl RecordingLease {
    /// Build a lease with the given hard expiration (spec requires
    /// `>= 120s`; the caller is expected to pass
    /// `EngineConfig::recorder_global_timeout_ms`).
    pub fn new(hard_expiration: Duration) -> Self {
        Self {
            acquired_at: Mutex::new(None),
            hard_expiration,
        }
    }

    /// Try to acquire the lease. Succeeds if unheld, or if held past its
    /// hard expiration (in which case the stale holder is evicted).
    /// Returns the acquisition token the holder must present to
    /// [`RecordingLease::release`], so a stale holder that is dropped
    /// after being evicted can't release a newer holder's acquisition.
    pub fn try_acquire(&self) -> Result<Instant, LoopEngineError> {
        let mut guard = self.acquired_at.lock();
        if let Some(acquired_at) = *guard {
            let held_for = acquired_at.elapsed();
            if held_for < self.hard_expiration {
                return Err(LoopEngineError::RecorderBusy { held_for });
            }
        }
        let token = Instant::now();
        *guard = Some(token);
        Ok(token)
    }

    /// Release the lease, but only if `token` still matches the current
    /// holder — a stale holder evicted by [`RecordingLease::try_acquire`]
    /// must not release whoever stole it from under it.
    pub fn release(&self, token: Instant) {
        let mut guard = self.acquired_at.lock();
        if *guard == Some(token) {
            *guard = None;
        }
    }

    /// Whether the lease is currently held (including by a stale, not-yet
    /// evicted holder).
    pub fn is_held(&self) -> bool {
        self.acquired_at.lock().is_some()
    }
}

/// An in-flight capture. Returned by [`Recorder::start`]; frames are
/// pushed in as they arrive from the mic source, and `stop`/`abort`
/// finalize it. Owns an `Arc` to its lease (rather than borrowing) so it
/// can be stored as a plain field by a coordinator that also owns the
/// [`Recorder`].
pub struct ActiveRecording {
    lease: Arc<RecordingLease>,
    token: Instant,
    channels: usize,
    sample_rate: u32,
    chunks: Vec<Vec<f32>>,
    started_at: Instant,
    watchdog: Duration,
    released: bool,
}

impl ActiveRecording {
    /// Push one interleaved-by-channel chunk (`chunk[c]` is channel `c`'s
    /// new samples). All channels in a chunk must be equal length.
    pub fn push(&mut self, chunk: &[&[f32]]) -> Result<(), LoopEngineError> {
        if chunk.len() != self.channels {
            return Err(LoopEngineError::Audio(format!(
                "recorder channel mismatch: expected {}, got {}",
                self.channels,
                chunk.len()
            )));
        }
        for (dst, src) in self.chunks.iter_mut().zip(chunk.iter()) {
            dst.extend_from_slice(src);
        }
        Ok(())
    }

    /// Whether the watchdog timeout (`min(expected_ms + 2000, 120000)`)
    /// has elapsed; the caller's event loop should force a `stop` when
    /// this becomes true, as defense-in-depth against a mic source that
    /// never signals end-of-stream.
    pub fn watchdog_expired(&self) -> bool {
        self.started_at.elapsed() >= self.watchdog
    }

    /// Elapsed capture duration so far.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Finalize the capture into a decoded [`AudioBuffer`] and release
    /// the lease.
    pub fn stop(mut self) -> Result<AudioBuffer, LoopEngineError> {
        let buffer = AudioBuffer::from_data(std::mem::take(&mut self.chunks), self.sample_rate)
            .map_err(|e| LoopEngineError::DecodeError(e.to_string()));
        self.lease.release(self.token);
        self.released = true;
        buffer
    }

    /// Discard the in-flight capture and release the lease without
    /// producing a buffer (Recording -> Stop abort path, spec §4.4).
    pub fn abort(mut self) {
        self.lease.release(self.token);
        self.released = true;
    }
}

impl Drop for ActiveRecording {
    fn drop(&mut self) {
        if !self.released {
            self.lease.release(self.token);
        }
    }
}

/// Single global capture coordinator: enforces at-most-one active
/// capture via [`RecordingLease`], and decodes completed captures into
/// [`AudioBuffer`]s.
pub struct Recorder {
    lease: Arc<RecordingLease>,
}

impl Recorder {
    /// Build a recorder whose lease expires after `hard_expiration`
    /// (`>= 120s` per spec).
    pub fn new(hard_expiration: Duration) -> Self {
        Self {
            lease: Arc::new(RecordingLease::new(hard_expiration)),
        }
    }

    /// Start a capture of `expected_ms` expected duration, at the given
    /// channel count/sample rate (a *fresh copy of the raw microphone
    /// tracks*, never the mixed playback bus — spec §4.2's anti-feedback
    /// source-selection invariant is enforced by the caller choosing
    /// which source to wire in, not by this type).
    pub fn start(
        &self,
        expected_ms: u64,
        channels: usize,
        sample_rate: u32,
    ) -> Result<ActiveRecording, LoopEngineError> {
        let token = self.lease.try_acquire()?;
        let watchdog_ms = (expected_ms + 2000).min(120_000);
        Ok(ActiveRecording {
            lease: self.lease.clone(),
            token,
            channels,
            sample_rate,
            chunks: vec![Vec::new(); channels],
            started_at: Instant::now(),
            watchdog: Duration::from_millis(watchdog_ms),
            released: false,
        })
    }

    /// Whether a capture is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.lease.is_held()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_uniqueness_second_start_fails() {
        let recorder = Recorder::new(Duration::from_secs(120));
        let first = recorder.start(1000, 1, 44100).unwrap();
        let second = recorder.start(1000, 1, 44100);
        assert!(matches!(second, Err(LoopEngineError::RecorderBusy { .. })));
        drop(first);
        assert!(recorder.start(1000, 1, 44100).is_ok());
    }

    #[test]
    fn stop_decodes_pushed_chunks() {
        let recorder = Recorder::new(Duration::from_secs(120));
        let mut rec = recorder.start(0, 1, 44100).unwrap();
        rec.push(&[&[0.1, 0.2, 0.3]]).unwrap();
        rec.push(&[&[0.4]]).unwrap();
        let buffer = rec.stop().unwrap();
        assert_eq!(buffer.samples()[0], vec![0.1, 0.2, 0.3, 0.4]);
        assert!(!recorder.is_busy());
    }

    #[test]
    fn abort_releases_lease_without_buffer() {
        let recorder = Recorder::new(Duration::from_secs(120));
        let rec = recorder.start(0, 1, 44100).unwrap();
        rec.abort();
        assert!(!recorder.is_busy());
    }

    #[test]
    fn dropping_without_stop_still_releases_lease() {
        let recorder = Recorder::new(Duration::from_secs(120));
        {
            let _rec = recorder.start(0, 1, 44100).unwrap();
        }
        assert!(!recorder.is_busy());
    }

    #[test]
    fn watchdog_uses_min_of_expected_plus_2s_and_120s_cap() {
        let recorder = Recorder::new(Duration::from_secs(120));
        let rec = recorder.start(500_000, 1, 44100).unwrap();
        assert_eq!(rec.watchdog, Duration::from_millis(120_000));
    }

    #[test]
    fn expired_lease_can_be_stolen() {
        let recorder = Recorder::new(Duration::from_millis(1));
        let first = recorder.start(0, 1, 44100).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        // second acquire should succeed because the first is stale
        let second = recorder.start(0, 1, 44100);
        assert!(second.is_ok());
        assert!(recorder.is_busy());

        // Dropping the stale `first` handle must not release the lease
        // that `second` now holds (token-gated release).
        drop(first);
        assert!(recorder.is_busy());

        drop(second);
        assert!(!recorder.is_busy());
    }
}
