//! Error types

use std::time::Duration;

/// Errors produced by track-local state transitions.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// A command was issued in a state that cannot honor it, e.g. Overdub
    /// requested with no loop buffer recorded yet.
    #[error("invalid state transition for track {track}: {detail}")]
    InvalidStateTransition {
        /// 1-indexed track number.
        track: usize,
        /// Human-readable detail for logs/UI.
        detail: &'static str,
    },

    /// A dependent track (i >= 2) was pressed before Track 1 established
    /// the master duration.
    #[error("track {track} is gated: no master loop is set yet")]
    MasterNotSet {
        /// 1-indexed track number.
        track: usize,
    },

    /// `Undo` called with an empty undo stack.
    #[error("nothing to undo on track {track}")]
    NothingToUndo {
        /// 1-indexed track number.
        track: usize,
    },

    /// A channel/sample-rate mismatch that the overdub policy could not
    /// reconcile.
    #[error("buffer mismatch: {0}")]
    BufferMismatch(String),
}

/// Top-level error type surfaced across the loop engine's public API.
///
/// Mirrors spec §7's error kinds. Never panics across the library
/// boundary; every fallible operation returns this type.
#[derive(Debug, thiserror::Error)]
pub enum LoopEngineError {
    /// Capture source missing or lost mid-session.
    #[error("microphone unavailable")]
    MicUnavailable,

    /// The Recording Lease is already held by another operation.
    #[error("recorder busy: lease held since {held_for:?}")]
    RecorderBusy {
        /// How long the lease has been held at the time of refusal.
        held_for: Duration,
    },

    /// Captured bytes could not be decoded into an `AudioBuffer`.
    #[error("failed to decode captured audio: {0}")]
    DecodeError(String),

    /// An in-flight pitch job was cancelled before completion.
    #[error("pitch job {0} cancelled")]
    PitchCancelled(u64),

    /// A pitch job failed (neither completed nor was cancelled).
    #[error("pitch job {0} failed: {1}")]
    PitchFailed(u64, String),

    /// A command was issued in an impossible state.
    #[error("invalid state: {0}")]
    InvalidState(#[from] TrackError),

    /// The loopback probe measured RMS above the configured threshold;
    /// advisory, the caller may override with explicit confirmation.
    #[error("loopback detected: measured rms {measured:.4} exceeds threshold {threshold:.4}")]
    LoopbackDetected {
        /// Measured RMS of the probe burst.
        measured: f32,
        /// Configured threshold that was exceeded.
        threshold: f32,
    },

    /// Generic audio/engine-level failure (JACK, port registration, etc).
    /// Generalizes the teacher's `AudioError` top-level variants.
    #[error("audio error: {0}")]
    Audio(String),

    /// Surfaced by the `jack` backend; kept as a distinct variant so the
    /// external collaborator's error type does not leak into non-jack
    /// callers.
    #[cfg(feature = "jack_backend")]
    #[error("JACK audio error: {0}")]
    Jack(#[from] jack::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LoopEngineError>;

impl LoopEngineError {
    /// Stable machine-readable kind name for `Error` events (spec §6).
    pub fn kind(&self) -> &'static str {
        match self {
            LoopEngineError::MicUnavailable => "MicUnavailable",
            LoopEngineError::RecorderBusy { .. } => "RecorderBusy",
            LoopEngineError::DecodeError(_) => "DecodeError",
            LoopEngineError::PitchCancelled(_) => "PitchCancelled",
            LoopEngineError::PitchFailed(_, _) => "PitchFailed",
            LoopEngineError::InvalidState(_) => "InvalidState",
            LoopEngineError::LoopbackDetected { .. } => "LoopbackDetected",
            LoopEngineError::Audio(_) => "AudioError",
            #[cfg(feature = "jack_backend")]
            LoopEngineError::Jack(_) => "JackError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(LoopEngineError::MicUnavailable.kind(), "MicUnavailable");
        assert_eq!(
            LoopEngineError::RecorderBusy { held_for: Duration::ZERO }.kind(),
            "RecorderBusy"
        );
        let e: LoopEngineError = TrackError::NothingToUndo { track: 2 }.into();
        assert_eq!(e.kind(), "InvalidState");
    }
}
