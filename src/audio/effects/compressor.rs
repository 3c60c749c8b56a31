//! Feed-forward peak compressor

/// A simple feed-forward compressor with instant attack/release on the
/// gain-reduction envelope (interface-level node; not a mastering-grade
/// design).
pub struct Compressor {
    threshold: f32,
    ratio: f32,
    envelope: f32,
}

impl Compressor {
    /// `threshold_db` is the level above which gain reduction kicks in;
    /// `ratio` is input:output above threshold (e.g. `4.0` == 4:1).
    pub fn new(threshold_db: f32, ratio: f32) -> Self {
        Self {
            threshold: db_to_linear(threshold_db),
            ratio: ratio.max(1.0),
            envelope: 0.0,
        }
    }

    /// Process one channel in place.
    pub fn process(&mut self, channel: &mut [f32]) {
        const ATTACK: f32 = 0.3;
        const RELEASE: f32 = 0.05;

        for sample in channel.iter_mut() {
            let level = sample.abs();
            let coeff = if level > self.envelope { ATTACK } else { RELEASE };
            self.envelope += (level - self.envelope) * coeff;

            if self.envelope > self.threshold {
                let over_db = linear_to_db(self.envelope / self.threshold);
                let reduced_db = over_db / self.ratio;
                let gain = db_to_linear(reduced_db - over_db);
                *sample *= gain;
            }
        }
    }
}

fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

fn linear_to_db(linear: f32) -> f32 {
    20.0 * linear.max(1e-9).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_quiet_signal_untouched() {
        let mut comp = Compressor::new(-6.0, 4.0);
        let mut buf = vec![0.01; 512];
        let original = buf.clone();
        comp.process(&mut buf);
        for (a, b) in buf.iter().zip(original.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn attenuates_signal_above_threshold() {
        let mut comp = Compressor::new(-12.0, 4.0);
        let mut buf = vec![0.9; 2048];
        comp.process(&mut buf);
        assert!(buf.last().unwrap().abs() < 0.9);
    }
}
