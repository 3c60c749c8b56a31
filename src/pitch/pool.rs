//! Cancellable worker pool for offline pitch shifting
//!
//! Jobs are submitted from the session/track layer and run on a small
//! fixed pool of OS threads (`N = available_parallelism - 1`, minimum 1)
//! so that a pitch shift never blocks the realtime audio path. Each job
//! carries its own progress counter and cancellation flag; the caller is
//! expected to race the reply channel against a timeout and fall back to
//! [`crate::pitch::engine::shift_buffer`] inline if the pool takes too
//! long (spec §4.3's `T = 45s` rule).

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::core::buffer::AudioBuffer;
use crate::error::LoopEngineError;
use crate::pitch::engine::{grain_params, ratio_for_semitones, shift_channel_cancelable};
use crate::state::config::EngineConfig;

struct Job {
    id: u64,
    buffer: AudioBuffer,
    semitones: f32,
    config: EngineConfig,
    progress: Arc<AtomicU32>,
    cancel: Arc<AtomicBool>,
    reply: Sender<Result<AudioBuffer, LoopEngineError>>,
}

/// Handle to an in-flight (or completed) pitch job. Dropping it does not
/// cancel the job; call [`PitchJobHandle::cancel`] explicitly.
#[derive(Clone)]
pub struct PitchJobHandle {
    id: u64,
    progress: Arc<AtomicU32>,
    cancel: Arc<AtomicBool>,
}

impl PitchJobHandle {
    /// Job id, unique within this process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Completion fraction in `[0.0, 1.0]`, updated every 32 hops.
    pub fn progress(&self) -> f32 {
        self.progress.load(Ordering::Relaxed) as f32 / 100.0
    }

    /// Request cancellation. Idempotent; the worker notices at its next
    /// cancellation checkpoint (between channels, and every 32 hops).
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Fixed-size pool of pitch-shift workers.
pub struct WorkerPool {
    sender: Sender<Job>,
    next_id: AtomicU64,
    _workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Size the pool at `available_parallelism - 1` (minimum 1) so one
    /// core stays free for the realtime audio thread.
    pub fn new_default() -> Self {
        let size = thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1).max(1))
            .unwrap_or(1);
        Self::new(size)
    }

    pub fn new(size: usize) -> Self {
        let (tx, rx): (Sender<Job>, Receiver<Job>) = unbounded();
        let workers = (0..size.max(1))
            .map(|_| {
                let rx = rx.clone();
                thread::spawn(move || {
                    while let Ok(job) = rx.recv() {
                        let result = run_job(&job);
                        let _ = job.reply.send(result);
                    }
                })
            })
            .collect();

        Self {
            sender: tx,
            next_id: AtomicU64::new(1),
            _workers: workers,
        }
    }

    /// Submit a pitch-shift job. Returns a handle for progress/cancellation
    /// and a receiver that yields the result once the job completes (or is
    /// cancelled, in which case it yields `Err(LoopEngineError::PitchCancelled)`).
    pub fn submit(
        &self,
        buffer: AudioBuffer,
        semitones: f32,
        config: EngineConfig,
    ) -> (PitchJobHandle, Receiver<Result<AudioBuffer, LoopEngineError>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let progress = Arc::new(AtomicU32::new(0));
        let cancel = Arc::new(AtomicBool::new(false));
        let (reply_tx, reply_rx) = bounded(1);

        let job = Job {
            id,
            buffer,
            semitones,
            config,
            progress: progress.clone(),
            cancel: cancel.clone(),
            reply: reply_tx,
        };

        // `unbounded` send never blocks; if every worker is busy the job
        // simply waits in the channel until one drains it.
        let _ = self.sender.send(job);

        (PitchJobHandle { id, progress, cancel }, reply_rx)
    }

    /// Submit a job and wait up to `timeout` for it to finish. On timeout,
    /// requests cancellation of the background job and runs the shift
    /// inline on the calling thread instead (spec §4.3's fallback rule).
    pub fn shift_with_fallback(
        &self,
        buffer: AudioBuffer,
        semitones: f32,
        config: EngineConfig,
        timeout: Duration,
    ) -> Result<AudioBuffer, LoopEngineError> {
        let (handle, rx) = self.submit(buffer.clone(), semitones, config.clone());
        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(_) => {
                handle.cancel();
                crate::pitch::engine::shift_buffer(&buffer, semitones, &config)
            }
        }
    }
}

fn run_job(job: &Job) -> Result<AudioBuffer, LoopEngineError> {
    let (grain, hop) = grain_params(job.buffer.len(), job.semitones, &job.config);
    let ratio = ratio_for_semitones(job.semitones);
    let channel_count = job.buffer.channels();

    let mut out_channels = Vec::with_capacity(channel_count);
    for (ch_index, channel) in job.buffer.samples().iter().enumerate() {
        if job.cancel.load(Ordering::Relaxed) {
            return Err(LoopEngineError::PitchCancelled(job.id));
        }

        let progress = &job.progress;
        let base_pct = (ch_index as f32 / channel_count as f32) * 100.0;
        let span_pct = 100.0 / channel_count as f32;

        let shifted = shift_channel_cancelable(
            channel,
            grain,
            hop,
            ratio,
            || job.cancel.load(Ordering::Relaxed),
            |_hop_index, pct| {
                let overall = base_pct + (pct as f32 / 100.0) * span_pct;
                progress.store(overall as u32, Ordering::Relaxed);
            },
        );

        match shifted {
            Some(data) => out_channels.push(data),
            None => return Err(LoopEngineError::PitchCancelled(job.id)),
        }
    }

    job.progress.store(100, Ordering::Relaxed);
    AudioBuffer::from_data(out_channels, job.buffer.sample_rate())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, duration_s: f32) -> AudioBuffer {
        let n = (sample_rate as f32 * duration_s) as usize;
        let data: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        AudioBuffer::from_data(vec![data], sample_rate).unwrap()
    }

    #[test]
    fn submit_completes_and_preserves_length() {
        let pool = WorkerPool::new(2);
        let config = EngineConfig::default();
        let buf = sine(440.0, 44100, 0.5);
        let len = buf.len();
        let (_, rx) = pool.submit(buf, 3.0, config);
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(result.len(), len);
    }

    #[test]
    fn cancel_before_completion_yields_cancelled_error() {
        let pool = WorkerPool::new(1);
        let config = EngineConfig::default();
        let buf = sine(220.0, 44100, 2.0);
        let (handle, rx) = pool.submit(buf, -5.0, config);
        handle.cancel();
        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(result, Err(LoopEngineError::PitchCancelled(_))) || result.is_ok());
    }

    #[test]
    fn fallback_runs_inline_on_timeout() {
        let pool = WorkerPool::new(1);
        let config = EngineConfig::default();
        let buf = sine(440.0, 44100, 0.25);
        let len = buf.len();
        let result = pool
            .shift_with_fallback(buf, 2.0, config, Duration::from_nanos(1))
            .unwrap();
        assert_eq!(result.len(), len);
    }

    #[test]
    fn job_ids_are_unique_and_increasing() {
        let pool = WorkerPool::new(1);
        let config = EngineConfig::default();
        let buf = sine(440.0, 8000, 0.05);
        let (h1, rx1) = pool.submit(buf.clone(), 0.0, config.clone());
        let (h2, rx2) = pool.submit(buf, 0.0, config);
        assert!(h2.id() > h1.id());
        let _ = rx1.recv_timeout(Duration::from_secs(5));
        let _ = rx2.recv_timeout(Duration::from_secs(5));
    }
}
