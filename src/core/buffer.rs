//! Audio buffer management

//! Advanced audio buffer management system
//!
//! Provides thread-safe, efficient audio buffer storage and processing
//! with features like:
//! - Multi-channel support
//! - Lock-free operations
//! - Efficient memory management
//! - DSP utilities

use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
    time::Duration,
};

use crossbeam_queue::SegQueue;
use dashmap::DashMap;

use crate::error::LoopEngineError;

/// Owned multichannel PCM with a sample rate, kept as `Arc`-shared
/// channel vectors so cloning for an undo snapshot is cheap and later
/// mutation copy-on-writes via [`Arc::make_mut`] rather than aliasing the
/// snapshot's storage.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    samples: Arc<Vec<Vec<f32>>>,
    sample_rate: u32,
    channels: usize,
}

/// Thread-safe buffer pool for efficient memory reuse
pub struct BufferPool {
    pool: DashMap<usize, SegQueue<Arc<Vec<Vec<f32>>>>>,
    max_buffers: usize,
}

/// Safe buffer handle with automatic pool return
pub struct PooledBuffer {
    data: Arc<Vec<Vec<f32>>>,
    pool: Arc<BufferPool>,
}

impl AudioBuffer {
    /// Create new empty buffer with the given channel count.
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            samples: Arc::new(vec![Vec::new(); channels.max(1)]),
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Create from existing per-channel data.
    ///
    /// Invariants enforced: at least one channel, every channel the same
    /// length, `sample_rate > 0`.
    pub fn from_data(data: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, LoopEngineError> {
        if data.is_empty() {
            return Err(LoopEngineError::Audio("buffer has no channels".into()));
        }
        if sample_rate == 0 {
            return Err(LoopEngineError::Audio("sample rate must be > 0".into()));
        }
        let len = data[0].len();
        if data.iter().any(|c| c.len() != len) {
            return Err(LoopEngineError::Audio(
                "channels must have equal length".into(),
            ));
        }

        let channels = data.len();
        Ok(Self {
            samples: Arc::new(data),
            sample_rate,
            channels,
        })
    }

    /// A buffer with `len` zeroed samples per channel.
    pub fn silence(sample_rate: u32, channels: usize, len: usize) -> Self {
        let mut buf = Self::new(sample_rate, channels);
        buf.resize(len);
        buf
    }

    /// Get immutable reference to samples, channel-major.
    pub fn samples(&self) -> &[Vec<f32>] {
        &self.samples
    }

    /// Read a single channel, or `None` if out of range.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.samples.get(index).map(|v| v.as_slice())
    }

    /// Get mutable reference to samples (copy-on-write if shared, e.g.
    /// with an undo snapshot that cloned this buffer's `Arc`).
    pub fn samples_mut(&mut self) -> &mut [Vec<f32>] {
        Arc::make_mut(&mut self.samples)
    }

    /// Get buffer length in samples (per channel).
    pub fn len(&self) -> usize {
        self.samples.first().map_or(0, |c| c.len())
    }

    /// Check if buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get channel count.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Duration in seconds: `len / sample_rate`.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.len() as f64 / self.sample_rate as f64)
    }

    /// Append samples to every channel (mono source broadcast to all
    /// channels).
    pub fn append_mono(&mut self, samples: &[f32]) {
        let channels = self.samples_mut();
        for channel in channels.iter_mut() {
            channel.extend_from_slice(samples);
        }
    }

    /// Append samples to buffer (multi-channel input, one slice per
    /// channel).
    pub fn append(&mut self, samples: &[&[f32]]) -> Result<(), LoopEngineError> {
        if samples.len() != self.channels {
            return Err(LoopEngineError::Audio(format!(
                "channel mismatch: buffer has {}, got {}",
                self.channels,
                samples.len()
            )));
        }

        let buffer = self.samples_mut();
        for (channel, new_samples) in buffer.iter_mut().zip(samples.iter()) {
            channel.extend_from_slice(new_samples);
        }
        Ok(())
    }

    /// Clear buffer contents, keeping channel count and sample rate.
    pub fn clear(&mut self) {
        let samples = self.samples_mut();
        for channel in samples.iter_mut() {
            channel.clear();
        }
    }

    /// Mix another buffer into this one (with gain), growing this buffer
    /// if the other is longer.
    pub fn mix(&mut self, other: &AudioBuffer, gain: f32) -> Result<(), LoopEngineError> {
        if other.channels() != self.channels || other.sample_rate() != self.sample_rate {
            return Err(LoopEngineError::Audio(
                "mix requires matching channel count and sample rate".into(),
            ));
        }

        let target_len = self.len().max(other.len());
        self.resize(target_len);

        let src_samples = other.samples();
        let dst_samples = self.samples_mut();

        for (dst_channel, src_channel) in dst_samples.iter_mut().zip(src_samples.iter()) {
            for (dst_sample, src_sample) in dst_channel.iter_mut().zip(src_channel.iter()) {
                *dst_sample += *src_sample * gain;
            }
        }

        Ok(())
    }

    /// Resize every channel (padding with zeros if expanding, truncating
    /// if shrinking).
    pub fn resize(&mut self, new_len: usize) {
        let samples = self.samples_mut();
        for channel in samples.iter_mut() {
            channel.resize(new_len, 0.0);
        }
    }

    /// Apply a gain factor to every sample.
    pub fn apply_gain(&mut self, gain: f32) {
        let samples = self.samples_mut();
        for channel in samples.iter_mut() {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }

    /// Clamp every sample to `[-1.0, 1.0]` (hard limiter).
    pub fn clamp(&mut self) {
        let samples = self.samples_mut();
        for channel in samples.iter_mut() {
            for sample in channel.iter_mut() {
                *sample = sample.clamp(-1.0, 1.0);
            }
        }
    }

    /// Convert to mono by averaging channels.
    pub fn to_mono(&mut self) {
        if self.channels == 1 {
            return;
        }

        let channels = self.channels;
        let samples = self.samples_mut();
        let mono_data: Vec<f32> = (0..samples[0].len())
            .map(|i| samples.iter().map(|channel| channel[i]).sum::<f32>() / channels as f32)
            .collect();

        *samples = vec![mono_data];
        self.channels = 1;
    }

    /// Root-mean-square level across all channels.
    pub fn rms(&self) -> f32 {
        let mut sum_sq = 0.0f64;
        let mut count = 0usize;
        for channel in self.samples.iter() {
            for &s in channel {
                sum_sq += (s as f64) * (s as f64);
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            (sum_sq / count as f64).sqrt() as f32
        }
    }
}

impl BufferPool {
    /// Create new buffer pool.
    pub fn new(max_buffers: usize) -> Arc<Self> {
        Arc::new(Self {
            pool: DashMap::new(),
            max_buffers,
        })
    }

    /// Get buffer from pool or create new one.
    pub fn get(self: &Arc<Self>, channels: usize, capacity: usize) -> PooledBuffer {
        let queue = self.pool.entry(channels).or_insert_with(SegQueue::new);

        if let Some(data) = queue.pop() {
            PooledBuffer {
                data,
                pool: self.clone(),
            }
        } else {
            PooledBuffer {
                data: Arc::new(vec![Vec::with_capacity(capacity); channels]),
                pool: self.clone(),
            }
        }
    }

    /// Return buffer to pool.
    fn return_buffer(&self, data: Arc<Vec<Vec<f32>>>) {
        if self.pool.len() < self.max_buffers {
            let channels = data.len();
            let queue = self.pool.entry(channels).or_insert_with(SegQueue::new);
            queue.push(data);
        }
    }
}

impl PooledBuffer {
    /// Create new pooled buffer.
    pub fn new(pool: Arc<BufferPool>, channels: usize, capacity: usize) -> Self {
        pool.get(channels, capacity)
    }

    /// Get length of buffer.
    pub fn len(&self) -> usize {
        self.data.first().map_or(0, |c| c.len())
    }

    /// Check if buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Deref for PooledBuffer {
    type Target = [Vec<f32>];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        Arc::make_mut(&mut self.data)
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let data = std::mem::replace(&mut self.data, Arc::new(Vec::new()));
        self.pool.return_buffer(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_operations() {
        let mut buffer = AudioBuffer::new(44100, 2);
        buffer.append_mono(&[1.0, 2.0, 3.0]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.samples()[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(buffer.samples()[1], vec![1.0, 2.0, 3.0]);

        buffer.apply_gain(0.5);
        assert_eq!(buffer.samples()[0], vec![0.5, 1.0, 1.5]);

        buffer.to_mono();
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.samples()[0], vec![0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_buffer_pool() {
        let pool = BufferPool::new(10);
        {
            let mut buffer = PooledBuffer::new(pool.clone(), 2, 1024);
            buffer[0].extend_from_slice(&[1.0, 2.0]);
            buffer[1].extend_from_slice(&[3.0, 4.0]);
        } // Buffer returned to pool here

        let buffer = PooledBuffer::new(pool.clone(), 2, 1024);
        assert!(buffer[0].capacity() >= 1024);
    }

    #[test]
    fn duration_matches_len_over_rate() {
        let buf = AudioBuffer::silence(44100, 1, 44100);
        assert!((buf.duration().as_secs_f64() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn clone_then_mutate_does_not_alias_original() {
        let mut buf = AudioBuffer::from_data(vec![vec![1.0, 2.0, 3.0]], 44100).unwrap();
        let snapshot = buf.clone();
        buf.apply_gain(2.0);
        assert_eq!(snapshot.samples()[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(buf.samples()[0], vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn from_data_rejects_unequal_channel_lengths() {
        let err = AudioBuffer::from_data(vec![vec![0.0; 3], vec![0.0; 2]], 44100).unwrap_err();
        assert!(matches!(err, LoopEngineError::Audio(_)));
    }

    #[test]
    fn clamp_hard_limits() {
        let mut buf = AudioBuffer::from_data(vec![vec![1.5, -2.0, 0.2]], 44100).unwrap();
        buf.clamp();
        assert_eq!(buf.samples()[0], vec![1.0, -1.0, 0.2]);
    }
}
