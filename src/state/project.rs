//! In-memory project snapshot
//!
//! A crash-safe, in-process snapshot of every track's transport-relative
//! state, distinct from a [`crate::core::track::UndoSnapshot`]: this
//! covers the whole session at once and is meant to be taken periodically
//! so a panic mid-operation can be diagnosed from the last known-good
//! state. Never written to disk (spec §1 non-goal: no cross-session
//! persistence).

use std::time::Duration;

use crate::core::track::TrackState;

/// One track's worth of state, summarized for a project snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    /// 1-indexed track number.
    pub index: usize,
    /// State at snapshot time.
    pub state: TrackState,
    /// Loop duration, if a buffer is present.
    pub loop_duration: Option<Duration>,
    /// Divider relative to the master track.
    pub divider: u32,
    /// Current pitch offset in semitones.
    pub pitch_semitones: i32,
}

/// A point-in-time snapshot of the whole session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectSnapshot {
    /// Master duration at snapshot time, if set.
    pub master_duration: Option<Duration>,
    /// Master BPM at snapshot time, if set.
    pub master_bpm: Option<u32>,
    /// Per-track summaries, in track order.
    pub tracks: Vec<TrackSnapshot>,
}

impl ProjectSnapshot {
    /// An empty snapshot (no master, no tracks captured).
    pub fn empty() -> Self {
        Self::default()
    }
}
