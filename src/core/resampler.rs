//! Offline sample-rate conversion
//!
//! Used wherever two buffers of different sample rates must be combined
//! (overdub mixing, mic capture coming in at a different rate than the
//! existing loop). Runs offline/non-realtime: the whole buffer is
//! converted in one pass, no streaming state is kept between calls.

use dasp::{interpolate::linear::Linear, signal, Signal};

use crate::core::buffer::AudioBuffer;
use crate::error::LoopEngineError;

/// Converts an [`AudioBuffer`] to a target sample rate using linear
/// interpolation (`dasp::interpolate::linear`), channel by channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct Resampler;

impl Resampler {
    /// Construct a resampler. Stateless; kept as a type for symmetry with
    /// the other DSP components and to leave room for a stateful
    /// (e.g. windowed-sinc) implementation later without changing call
    /// sites.
    pub fn new() -> Self {
        Self
    }

    /// Resample `buffer` to `target_rate`. A no-op clone if the rates
    /// already match.
    pub fn resample(&self, buffer: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer, LoopEngineError> {
        if target_rate == 0 {
            return Err(LoopEngineError::Audio("target sample rate must be > 0".into()));
        }
        if buffer.sample_rate() == target_rate || buffer.is_empty() {
            return Ok(buffer.clone());
        }

        let ratio = target_rate as f64 / buffer.sample_rate() as f64;
        let out_len = ((buffer.len() as f64) * ratio).round() as usize;

        let mut out_channels = Vec::with_capacity(buffer.channels());
        for ch in buffer.samples() {
            out_channels.push(resample_channel(
                ch,
                buffer.sample_rate() as f64,
                target_rate as f64,
                out_len,
            ));
        }

        AudioBuffer::from_data(out_channels, target_rate)
    }
}

/// Linear-interpolated resample of a single channel, following the
/// `dasp` crate's documented `Signal::from_hz_to_hz` pattern.
fn resample_channel(input: &[f32], source_hz: f64, target_hz: f64, out_len: usize) -> Vec<f32> {
    if input.is_empty() || out_len == 0 {
        return vec![0.0; out_len];
    }
    if input.len() == 1 {
        return vec![input[0]; out_len];
    }

    let mut source = signal::from_iter(input.iter().map(|&s| [s as f64]));
    let a = source.next();
    let b = source.next();
    let interp = Linear::new(a, b);

    let mut out: Vec<f32> = source
        .from_hz_to_hz(interp, source_hz, target_hz)
        .until_exhausted()
        .take(out_len)
        .map(|frame: [f64; 1]| frame[0] as f32)
        .collect();

    out.resize(out_len, *out.last().unwrap_or(&0.0));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_rates_match() {
        let buf = AudioBuffer::from_data(vec![vec![0.1, 0.2, 0.3]], 44100).unwrap();
        let out = Resampler::new().resample(&buf, 44100).unwrap();
        assert_eq!(out.samples()[0], buf.samples()[0]);
    }

    #[test]
    fn upsampling_increases_length_proportionally() {
        let buf = AudioBuffer::from_data(vec![vec![0.0; 1000]], 22050).unwrap();
        let out = Resampler::new().resample(&buf, 44100).unwrap();
        assert_eq!(out.sample_rate(), 44100);
        assert!((out.len() as i64 - 2000).abs() <= 2);
    }

    #[test]
    fn downsampling_decreases_length_proportionally() {
        let buf = AudioBuffer::from_data(vec![vec![0.0; 2000]], 44100).unwrap();
        let out = Resampler::new().resample(&buf, 22050).unwrap();
        assert_eq!(out.sample_rate(), 22050);
        assert!((out.len() as i64 - 1000).abs() <= 2);
    }

    #[test]
    fn rejects_zero_target_rate() {
        let buf = AudioBuffer::from_data(vec![vec![0.0; 10]], 44100).unwrap();
        assert!(Resampler::new().resample(&buf, 0).is_err());
    }
}
