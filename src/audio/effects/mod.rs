//! Per-track effect chain: descriptors, runtime node graph, and rebuild
//!
//! An [`EffectDescriptor`] is a serializable, UI-facing entry in a track's
//! chain. [`EffectsChain`] holds the ordered descriptors and, separately,
//! the realtime node graph built from them. The graph is rebuilt
//! wholesale whenever the descriptor list changes or playback (re)starts
//! (spec §4.6) rather than patched incrementally, which keeps node
//! lifetime simple: disposing the old graph just drops it.
//!
//! `Pitch` is a descriptor-only kind — see [`pitch::semitones_of`] — and
//! never contributes a node to the graph.

pub mod compressor;
pub mod delay;
pub mod pitch;

use serde::{Deserialize, Serialize};

use crate::core::buffer::AudioBuffer;

/// The effect catalog. `Pitch` never appears in the runtime node graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Offline pitch shift in semitones, applied by the Granular Pitch
    /// Engine rather than a realtime node.
    Pitch {
        /// Semitone offset in `[-12, 12]`.
        semitones: i32,
    },
    /// One-pole low-pass filter.
    LowPass {
        /// Cutoff frequency in Hz.
        cutoff_hz: f32,
    },
    /// One-pole high-pass filter.
    HighPass {
        /// Cutoff frequency in Hz.
        cutoff_hz: f32,
    },
    /// Equal-power stereo pan.
    Pan {
        /// Position in `[-1.0, 1.0]`, left to right.
        position: f32,
    },
    /// Feedback delay line.
    Delay {
        /// Delay time in milliseconds.
        time_ms: f32,
        /// Feedback amount in `[0.0, 1.0)`.
        feedback: f32,
        /// Dry/wet mix in `[0.0, 1.0]`.
        mix: f32,
    },
    /// Feed-forward peak compressor.
    Compressor {
        /// Threshold in dBFS above which reduction applies.
        threshold_db: f32,
        /// Compression ratio (input:output above threshold).
        ratio: f32,
    },
}

/// A single entry in a track's effect chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    /// Stable id, unique within the owning chain.
    pub id: u64,
    /// Effect type and parameters.
    pub kind: EffectKind,
    /// Skipped in the runtime graph when true, but kept in the chain.
    pub bypass: bool,
}

impl EffectDescriptor {
    /// Build a descriptor, not bypassed.
    pub fn new(id: u64, kind: EffectKind) -> Self {
        Self {
            id,
            kind,
            bypass: false,
        }
    }

    /// Convenience constructor for a pitch descriptor.
    pub fn pitch(id: u64, semitones: i32) -> Self {
        Self::new(id, EffectKind::Pitch { semitones })
    }

    /// Convenience constructor for a low-pass descriptor.
    pub fn low_pass(id: u64, cutoff_hz: f32) -> Self {
        Self::new(id, EffectKind::LowPass { cutoff_hz })
    }

    /// Convenience constructor for a high-pass descriptor.
    pub fn high_pass(id: u64, cutoff_hz: f32) -> Self {
        Self::new(id, EffectKind::HighPass { cutoff_hz })
    }

    /// Convenience constructor for a pan descriptor.
    pub fn pan(id: u64, position: f32) -> Self {
        Self::new(id, EffectKind::Pan { position })
    }

    /// Convenience constructor for a delay descriptor.
    pub fn delay(id: u64, time_ms: f32, feedback: f32, mix: f32) -> Self {
        Self::new(
            id,
            EffectKind::Delay {
                time_ms,
                feedback,
                mix,
            },
        )
    }

    /// Convenience constructor for a compressor descriptor.
    pub fn compressor(id: u64, threshold_db: f32, ratio: f32) -> Self {
        Self::new(id, EffectKind::Compressor { threshold_db, ratio })
    }

    /// Whether this descriptor is the special offline Pitch kind.
    pub fn is_pitch(&self) -> bool {
        matches!(self.kind, EffectKind::Pitch { .. })
    }
}

/// One-pole low-pass filter node.
struct LowPassNode {
    coeff: f32,
    state: Vec<f32>,
}

impl LowPassNode {
    fn new(cutoff_hz: f32, sample_rate: u32, channels: usize) -> Self {
        let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz.max(1.0));
        let dt = 1.0 / sample_rate as f32;
        Self {
            coeff: dt / (rc + dt),
            state: vec![0.0; channels],
        }
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let samples = buffer.samples_mut();
        for (ch, state) in samples.iter_mut().zip(self.state.iter_mut()) {
            for sample in ch.iter_mut() {
                *state += self.coeff * (*sample - *state);
                *sample = *state;
            }
        }
    }
}

/// One-pole high-pass filter node (input minus its low-pass component).
struct HighPassNode {
    low_pass: LowPassNode,
}

impl HighPassNode {
    fn new(cutoff_hz: f32, sample_rate: u32, channels: usize) -> Self {
        Self {
            low_pass: LowPassNode::new(cutoff_hz, sample_rate, channels),
        }
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let original = buffer.samples().to_vec();
        self.low_pass.process(buffer);
        let samples = buffer.samples_mut();
        for (ch, orig_ch) in samples.iter_mut().zip(original.iter()) {
            for (sample, orig) in ch.iter_mut().zip(orig_ch.iter()) {
                *sample = orig - *sample;
            }
        }
    }
}

/// Equal-power pan node (stereo only; a no-op on mono/multi-channel
/// buffers with channel count != 2).
struct PanNode {
    position: f32,
}

impl PanNode {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        if buffer.channels() != 2 {
            return;
        }
        let theta = (self.position.clamp(-1.0, 1.0) + 1.0) * std::f32::consts::FRAC_PI_4;
        let left_gain = theta.cos();
        let right_gain = theta.sin();
        let samples = buffer.samples_mut();
        let (left, right) = samples.split_at_mut(1);
        for s in left[0].iter_mut() {
            *s *= left_gain;
        }
        for s in right[0].iter_mut() {
            *s *= right_gain;
        }
    }
}

struct DelayNode {
    lines: Vec<delay::DelayLine>,
}

impl DelayNode {
    fn new(sample_rate: u32, channels: usize, time_ms: f32, feedback: f32, mix: f32) -> Self {
        Self {
            lines: (0..channels)
                .map(|_| delay::DelayLine::new(sample_rate, time_ms, feedback, mix))
                .collect(),
        }
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let samples = buffer.samples_mut();
        for (ch, line) in samples.iter_mut().zip(self.lines.iter_mut()) {
            line.process(ch);
        }
    }
}

struct CompressorNode {
    compressors: Vec<compressor::Compressor>,
}

impl CompressorNode {
    fn new(channels: usize, threshold_db: f32, ratio: f32) -> Self {
        Self {
            compressors: (0..channels)
                .map(|_| compressor::Compressor::new(threshold_db, ratio))
                .collect(),
        }
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let samples = buffer.samples_mut();
        for (ch, comp) in samples.iter_mut().zip(self.compressors.iter_mut()) {
            comp.process(ch);
        }
    }
}

enum Node {
    LowPass(LowPassNode),
    HighPass(HighPassNode),
    Pan(PanNode),
    Delay(DelayNode),
    Compressor(CompressorNode),
}

impl Node {
    fn process(&mut self, buffer: &mut AudioBuffer) {
        match self {
            Node::LowPass(n) => n.process(buffer),
            Node::HighPass(n) => n.process(buffer),
            Node::Pan(n) => n.process(buffer),
            Node::Delay(n) => n.process(buffer),
            Node::Compressor(n) => n.process(buffer),
        }
    }

    fn build(kind: &EffectKind, sample_rate: u32, channels: usize) -> Option<Self> {
        match *kind {
            EffectKind::Pitch { .. } => None,
            EffectKind::LowPass { cutoff_hz } => {
                Some(Node::LowPass(LowPassNode::new(cutoff_hz, sample_rate, channels)))
            }
            EffectKind::HighPass { cutoff_hz } => {
                Some(Node::HighPass(HighPassNode::new(cutoff_hz, sample_rate, channels)))
            }
            EffectKind::Pan { position } => Some(Node::Pan(PanNode { position })),
            EffectKind::Delay { time_ms, feedback, mix } => Some(Node::Delay(DelayNode::new(
                sample_rate,
                channels,
                time_ms,
                feedback,
                mix,
            ))),
            EffectKind::Compressor { threshold_db, ratio } => {
                Some(Node::Compressor(CompressorNode::new(channels, threshold_db, ratio)))
            }
        }
    }
}

/// A track's ordered effect descriptors plus the realtime node graph
/// built from them. `source_node -> [nodes in chain order] -> track
/// gain -> master bus`, per spec §4.6; the gain/master-bus connection is
/// the Session Coordinator's responsibility, not this chain's.
pub struct EffectsChain {
    descriptors: Vec<EffectDescriptor>,
    nodes: Vec<Node>,
    sample_rate: u32,
    channels: usize,
    next_id: u64,
}

impl EffectsChain {
    /// Build an empty chain for a track at the given rate/channel count.
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            descriptors: Vec::new(),
            nodes: Vec::new(),
            sample_rate,
            channels,
            next_id: 1,
        }
    }

    /// Current descriptor list, in chain order.
    pub fn descriptors(&self) -> &[EffectDescriptor] {
        &self.descriptors
    }

    /// Add an effect at the end of the chain, assigning it a fresh id.
    /// Returns the assigned id.
    pub fn add(&mut self, kind: EffectKind) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.descriptors.push(EffectDescriptor::new(id, kind));
        self.rebuild();
        id
    }

    /// Move the effect with `id` one slot earlier (`dir < 0`) or later
    /// (`dir > 0`) in the chain. No-op if already at that end or if `id`
    /// is unknown.
    pub fn move_effect(&mut self, id: u64, dir: i32) {
        let Some(pos) = self.descriptors.iter().position(|d| d.id == id) else {
            return;
        };
        let new_pos = if dir < 0 {
            pos.saturating_sub(1)
        } else {
            (pos + 1).min(self.descriptors.len().saturating_sub(1))
        };
        if new_pos != pos {
            self.descriptors.swap(pos, new_pos);
            self.rebuild();
        }
    }

    /// Remove the effect with `id`, if present.
    pub fn remove(&mut self, id: u64) {
        let before = self.descriptors.len();
        self.descriptors.retain(|d| d.id != id);
        if self.descriptors.len() != before {
            self.rebuild();
        }
    }

    /// Toggle bypass for the effect with `id`, if present.
    pub fn toggle_bypass(&mut self, id: u64) {
        if let Some(d) = self.descriptors.iter_mut().find(|d| d.id == id) {
            d.bypass = !d.bypass;
            self.rebuild();
        }
    }

    /// Clear every effect from the chain.
    pub fn clear(&mut self) {
        self.descriptors.clear();
        self.nodes.clear();
    }

    /// Rebuild the runtime node graph from the current descriptor list:
    /// skip bypassed entries and Pitch entries entirely.
    pub fn rebuild(&mut self) {
        self.nodes = self
            .descriptors
            .iter()
            .filter(|d| !d.bypass)
            .filter_map(|d| Node::build(&d.kind, self.sample_rate, self.channels))
            .collect();
    }

    /// Run the buffer through every live node in chain order.
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        for node in self.nodes.iter_mut() {
            node.process(buffer);
        }
    }

    /// Replace the descriptor list wholesale (undo restore), preserving
    /// exact ids and bypass flags, and rebuild the node graph.
    pub fn restore(&mut self, descriptors: Vec<EffectDescriptor>) {
        self.next_id = descriptors.iter().map(|d| d.id).max().unwrap_or(0) + 1;
        self.descriptors = descriptors;
        self.rebuild();
    }

    /// Update one parameter of the effect with `id` by key name. Unknown
    /// keys for the effect's kind are ignored.
    pub fn set_param(&mut self, id: u64, key: &str, value: f32) {
        let Some(desc) = self.descriptors.iter_mut().find(|d| d.id == id) else {
            return;
        };
        match (&mut desc.kind, key) {
            (EffectKind::Pitch { semitones }, "semitones") => *semitones = value as i32,
            (EffectKind::LowPass { cutoff_hz }, "cutoff_hz") => *cutoff_hz = value,
            (EffectKind::HighPass { cutoff_hz }, "cutoff_hz") => *cutoff_hz = value,
            (EffectKind::Pan { position }, "position") => *position = value,
            (EffectKind::Delay { time_ms, .. }, "time_ms") => *time_ms = value,
            (EffectKind::Delay { feedback, .. }, "feedback") => *feedback = value,
            (EffectKind::Delay { mix, .. }, "mix") => *mix = value,
            (EffectKind::Compressor { threshold_db, .. }, "threshold_db") => *threshold_db = value,
            (EffectKind::Compressor { ratio, .. }, "ratio") => *ratio = value,
            _ => return,
        }
        self.rebuild();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bypassed_effect_is_excluded_from_graph() {
        let mut chain = EffectsChain::new(44100, 1);
        let id = chain.add(EffectKind::LowPass { cutoff_hz: 500.0 });
        assert_eq!(chain.nodes.len(), 1);
        chain.toggle_bypass(id);
        assert_eq!(chain.nodes.len(), 0);
    }

    #[test]
    fn pitch_effect_never_builds_a_node() {
        let mut chain = EffectsChain::new(44100, 1);
        chain.add(EffectKind::Pitch { semitones: 5 });
        assert_eq!(chain.nodes.len(), 0);
        assert_eq!(chain.descriptors().len(), 1);
    }

    #[test]
    fn remove_rebuilds_graph() {
        let mut chain = EffectsChain::new(44100, 1);
        let id = chain.add(EffectKind::Compressor {
            threshold_db: -12.0,
            ratio: 4.0,
        });
        chain.remove(id);
        assert!(chain.descriptors().is_empty());
        assert!(chain.nodes.is_empty());
    }

    #[test]
    fn move_effect_reorders_descriptors() {
        let mut chain = EffectsChain::new(44100, 1);
        let a = chain.add(EffectKind::LowPass { cutoff_hz: 200.0 });
        let b = chain.add(EffectKind::HighPass { cutoff_hz: 2000.0 });
        chain.move_effect(b, -1);
        assert_eq!(chain.descriptors()[0].id, b);
        assert_eq!(chain.descriptors()[1].id, a);
    }

    #[test]
    fn low_pass_attenuates_high_frequency_content() {
        let mut chain = EffectsChain::new(44100, 1);
        chain.add(EffectKind::LowPass { cutoff_hz: 200.0 });
        let n = 4096;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 8000.0 * i as f32 / 44100.0).sin())
            .collect();
        let mut buffer = AudioBuffer::from_data(vec![samples.clone()], 44100).unwrap();
        chain.process(&mut buffer);
        let input_rms = (samples.iter().map(|s| s * s).sum::<f32>() / n as f32).sqrt();
        let output_rms = buffer.rms();
        assert!(output_rms < input_rms * 0.5);
    }
}
