//! Granular (overlap-add) offline pitch shifter
//!
//! Pure, synchronous DSP core shared by the worker pool
//! ([`crate::pitch::pool`]) and the inline fallback path. Preserves the
//! input's sample count exactly (time-preserving pitch shift): the
//! output has the same length and sample rate as the input.

use crate::core::buffer::AudioBuffer;
use crate::error::LoopEngineError;
use crate::state::config::EngineConfig;

/// Grain size and hop (in samples) for a buffer of `len` samples and a
/// requested shift of `semitones`, per spec §4.3 step 1.
pub fn grain_params(len: usize, semitones: f32, config: &EngineConfig) -> (usize, usize) {
    let grain = if len < 22050 {
        1024
    } else if semitones.abs() > 8.0 {
        4096
    } else {
        config.pitch_grain_size
    };
    let hop = config.hop_size(grain).max(1);
    (grain, hop)
}

/// Hann window of length `g`: `W[i] = 0.5 * (1 - cos(2*pi*i/(g-1)))`.
pub fn hann_window(g: usize) -> Vec<f32> {
    if g <= 1 {
        return vec![1.0; g];
    }
    let denom = (g - 1) as f32;
    (0..g)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / denom).cos()))
        .collect()
}

/// Pitch ratio for a semitone offset: `r = 2^(s/12)`.
pub fn ratio_for_semitones(semitones: f32) -> f64 {
    2f64.powf(semitones as f64 / 12.0)
}

/// Overlap-add pitch shift of a single channel, per spec §4.3 steps 3-5.
/// Reports hop-granular progress and honors cooperative cancellation via
/// the supplied callbacks, returning `None` if cancelled.
pub fn shift_channel_cancelable(
    input: &[f32],
    grain: usize,
    hop: usize,
    ratio: f64,
    mut should_cancel: impl FnMut() -> bool,
    mut on_hop: impl FnMut(usize, usize),
) -> Option<Vec<f32>> {
    let n = input.len();
    if n == 0 {
        return Some(Vec::new());
    }

    let window = hann_window(grain);
    let mut output = vec![0.0f32; n];
    let mut envelope = vec![0.0f32; n];

    let half_grain = (grain / 2) as i64;
    let mut p: f64 = 0.0;
    let mut hop_index = 0usize;
    let total_hops = (n / hop.max(1)) + 2;

    let mut k: i64 = 0;
    while (k as usize) < n + hop {
        if hop_index % 32 == 0 && should_cancel() {
            return None;
        }

        let base = (p - half_grain as f64).floor() as i64;
        for i in 0..grain {
            let src_idx = base + i as i64;
            let x = if src_idx >= 0 && (src_idx as usize) < n {
                input[src_idx as usize]
            } else {
                0.0
            };
            let target = k + i as i64 - half_grain;
            if target >= 0 && (target as usize) < n {
                let t = target as usize;
                output[t] += x * window[i];
                envelope[t] += window[i];
            }
        }

        p += ratio * hop as f64;
        if p > (n as f64) + (grain as f64) {
            p = p.rem_euclid(n.max(1) as f64);
        }

        if hop_index % 32 == 0 {
            let pct = (hop_index as f32 / total_hops as f32).min(1.0);
            on_hop(hop_index, (pct * 100.0) as usize);
        }

        hop_index += 1;
        k += hop as i64;
    }

    for i in 0..n {
        output[i] /= envelope[i].max(1e-8);
    }

    Some(output)
}

/// Non-cancellable convenience wrapper used by the inline fallback and by
/// tests exercising the pure algorithm.
pub fn shift_channel(input: &[f32], grain: usize, hop: usize, ratio: f64) -> Vec<f32> {
    shift_channel_cancelable(input, grain, hop, ratio, || false, |_, _| {})
        .expect("non-cancellable shift never returns None")
}

/// Shift every channel of `buffer` by `semitones`, synchronously, with no
/// cancellation or progress reporting. Used for the `T = 45s` timeout's
/// inline fallback (spec §4.3) and directly by callers that do not need
/// the worker pool.
pub fn shift_buffer(
    buffer: &AudioBuffer,
    semitones: f32,
    config: &EngineConfig,
) -> Result<AudioBuffer, LoopEngineError> {
    if !(-12.0..=12.0).contains(&semitones) {
        return Err(LoopEngineError::Audio(format!(
            "pitch semitones out of range: {semitones}"
        )));
    }

    let (grain, hop) = grain_params(buffer.len(), semitones, config);
    let ratio = ratio_for_semitones(semitones);

    let channels: Vec<Vec<f32>> = buffer
        .samples()
        .iter()
        .map(|ch| shift_channel(ch, grain, hop, ratio))
        .collect();

    AudioBuffer::from_data(channels, buffer.sample_rate())
}
