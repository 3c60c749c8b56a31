//! Pitch effect glue
//!
//! `EffectKind::Pitch` never runs as a realtime graph node (spec §4.6):
//! it is a marker that triggers an offline rewrite of the whole loop
//! buffer via [`crate::pitch::engine`] / [`crate::pitch::pool`]. This
//! module only extracts the descriptor's parameter; the algorithm lives
//! under `crate::pitch`.

use super::{EffectDescriptor, EffectKind};

/// The semitone offset carried by a descriptor, if it is a Pitch effect.
pub fn semitones_of(desc: &EffectDescriptor) -> Option<i32> {
    match desc.kind {
        EffectKind::Pitch { semitones } => Some(semitones),
        _ => None,
    }
}
