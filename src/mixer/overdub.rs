//! Overdub mixing policy
//!
//! Sums a freshly captured overdub into an existing loop buffer under
//! the fixed policy in spec §4.5: reconcile sample rate, fit the
//! overdub's length to the loop's (zero-fill short, optionally wrap),
//! widen channel count to the max of the two (missing channels
//! contribute silence), sum and hard-clip.

use crate::core::buffer::AudioBuffer;
use crate::core::resampler::Resampler;
use crate::error::LoopEngineError;

/// Stateless overdub mixer; holds only a [`Resampler`] instance.
#[derive(Debug, Default)]
pub struct OverdubMixer {
    resampler: Resampler,
}

impl OverdubMixer {
    /// Construct a mixer.
    pub fn new() -> Self {
        Self {
            resampler: Resampler::new(),
        }
    }

    /// Mix `overdub` into `existing`, producing a new buffer of the same
    /// length and sample rate as `existing`. `allow_wrap` selects the
    /// `ALLOW_WRAP_OVERDUB` policy for overdubs shorter than the loop
    /// (default: zero-fill, not wrap).
    pub fn mix(
        &self,
        existing: &AudioBuffer,
        overdub: &AudioBuffer,
        allow_wrap: bool,
    ) -> Result<AudioBuffer, LoopEngineError> {
        let resampled = if overdub.sample_rate() != existing.sample_rate() {
            self.resampler.resample(overdub, existing.sample_rate())?
        } else {
            overdub.clone()
        };

        let n = existing.len();
        let m = resampled.len();
        let channel_count = existing.channels().max(resampled.channels());

        let mut out = vec![vec![0.0f32; n]; channel_count];
        for (c, out_channel) in out.iter_mut().enumerate() {
            let loop_channel = existing.channel(c);
            let overdub_channel = resampled.channel(c);

            for (i, out_sample) in out_channel.iter_mut().enumerate() {
                let l = loop_channel.map_or(0.0, |ch| ch[i]);
                let o = if m == 0 {
                    0.0
                } else if i < m {
                    overdub_channel.map_or(0.0, |ch| ch[i])
                } else if allow_wrap {
                    overdub_channel.map_or(0.0, |ch| ch[i % m])
                } else {
                    0.0
                };
                *out_sample = (l + o).clamp(-1.0, 1.0);
            }
        }

        AudioBuffer::from_data(out, existing.sample_rate())
    }
}
