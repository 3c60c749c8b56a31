//! Loopback probe and spectral analysis
//!
//! [`LoopbackProbe`]: a short sine burst is played through the master
//! bus; the mic input captured during that window is measured against a
//! configured RMS threshold. Playing the burst and capturing the mic
//! response are the audio I/O backend's job (spec §4.2's
//! external-collaborator split) — this module only synthesizes the
//! burst and evaluates the result.
//!
//! [`dominant_frequency`] is a small spectral helper used to check the
//! Granular Pitch Engine's output against spec §8 scenario 5 ("output
//! duration 1.0s, dominant frequency ≈ 880Hz within 2Hz"); it is not
//! part of the realtime path.

use realfft::RealFftPlanner;

use crate::core::buffer::AudioBuffer;

/// Probe burst frequency, per spec §4.2.
const BURST_HZ: f32 = 1000.0;
/// Probe burst duration, per spec §4.2.
const BURST_MS: u32 = 120;
/// Peak amplitude of the burst (kept well under clipping).
const BURST_AMPLITUDE: f32 = 0.5;

/// Synthesizes the loopback probe burst and evaluates a captured
/// response against a threshold.
pub struct LoopbackProbe;

impl LoopbackProbe {
    /// A mono 120ms, 1kHz sine burst at the given sample rate, to be
    /// played through the master bus at session start.
    pub fn burst(sample_rate: u32) -> AudioBuffer {
        let n = (sample_rate as f32 * (BURST_MS as f32 / 1000.0)) as usize;
        let data: Vec<f32> = (0..n)
            .map(|i| {
                BURST_AMPLITUDE * (2.0 * std::f32::consts::PI * BURST_HZ * i as f32 / sample_rate as f32).sin()
            })
            .collect();
        AudioBuffer::from_data(vec![data], sample_rate).unwrap_or_else(|_| AudioBuffer::new(sample_rate, 1))
    }

    /// Whether the mic signal captured during the burst window exceeds
    /// `threshold`, indicating the master bus is leaking back into the
    /// mic.
    pub fn evaluate(captured: &AudioBuffer, threshold: f32) -> bool {
        captured.rms() > threshold
    }
}

/// Estimate the dominant frequency (Hz) of a mono-summed signal via a
/// single real FFT, by taking the magnitude-peak bin. Used to verify
/// pitch-shift output rather than as part of any realtime path, so a
/// fresh planner per call is fine.
pub fn dominant_frequency(buffer: &AudioBuffer) -> f32 {
    let sample_rate = buffer.sample_rate() as f32;
    let channels = buffer.samples();
    let len = buffer.len();
    if len == 0 {
        return 0.0;
    }

    let mut mono = vec![0.0f32; len];
    for ch in channels {
        for (dst, &s) in mono.iter_mut().zip(ch.iter()) {
            *dst += s;
        }
    }
    let n = channels.len().max(1) as f32;
    for s in mono.iter_mut() {
        *s /= n;
    }

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(len);
    let mut spectrum = fft.make_output_vec();
    let mut input = mono;
    if fft.process(&mut input, &mut spectrum).is_err() {
        return 0.0;
    }

    let (peak_bin, _) = spectrum
        .iter()
        .enumerate()
        .skip(1) // ignore DC
        .map(|(i, c)| (i, c.norm_sqr()))
        .fold((0usize, 0.0f32), |best, cur| if cur.1 > best.1 { cur } else { best });

    peak_bin as f32 * sample_rate / len as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_frequency_finds_a_pure_tone() {
        let sample_rate = 44100;
        let freq = 880.0f32;
        let n = sample_rate as usize; // 1s, fine frequency resolution
        let data: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        let buffer = AudioBuffer::from_data(vec![data], sample_rate).unwrap();
        let detected = dominant_frequency(&buffer);
        assert!((detected - freq).abs() < 2.0, "detected {detected}, expected ~{freq}");
    }

    #[test]
    fn burst_has_expected_length_and_no_clipping() {
        let burst = LoopbackProbe::burst(44100);
        assert_eq!(burst.len(), (44100.0 * 0.12) as usize);
        assert!(burst.samples()[0].iter().all(|&s| s.abs() <= BURST_AMPLITUDE + 1e-6));
    }

    #[test]
    fn loud_capture_trips_the_threshold() {
        let loud = AudioBuffer::from_data(vec![vec![0.5; 1000]], 44100).unwrap();
        assert!(LoopbackProbe::evaluate(&loud, 0.02));
    }

    #[test]
    fn quiet_capture_stays_under_threshold() {
        let quiet = AudioBuffer::from_data(vec![vec![0.001; 1000]], 44100).unwrap();
        assert!(!LoopbackProbe::evaluate(&quiet, 0.02));
    }
}
