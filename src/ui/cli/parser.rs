//! CLI command definitions, one per `SessionCommand` (spec §6)

use clap::{Parser, Subcommand};

use crate::audio::effects::EffectKind;
use crate::session::coordinator::{SessionCommand, TrackCommand};

/// `loop_engine` global options plus the one command to dispatch.
#[derive(Parser, Debug)]
#[command(name = "loop_engine", version, about = "Four-track phase-locked audio looper")]
pub struct Cli {
    /// Number of microphone input channels.
    #[arg(short, long, default_value_t = 2)]
    pub inputs: usize,

    /// Number of master bus output channels.
    #[arg(short, long, default_value_t = 2)]
    pub outputs: usize,

    /// JACK client name.
    #[arg(long, default_value = "loop_engine")]
    pub client_name: String,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// The command to dispatch.
    #[command(subcommand)]
    pub command: Command,
}

/// One engine command, mirroring spec §6's per-track and global command
/// lists.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Context-sensitive press: record, stop-record, arm-overdub, or
    /// finish-overdub depending on the track's current state.
    Press {
        /// 1-indexed track number.
        track: usize,
    },
    /// Context-sensitive stop/resume/abort.
    Stop {
        /// 1-indexed track number.
        track: usize,
    },
    /// Clear the track's loop buffer, undo history, and effects.
    Clear {
        /// 1-indexed track number.
        track: usize,
    },
    /// Set a dependent track's bar divider (only valid while Ready).
    Divider {
        /// 1-indexed track number.
        track: usize,
        /// Bar multiple relative to the master loop.
        divider: u32,
    },
    /// Append an effect to a track's chain.
    Effect {
        /// 1-indexed track number.
        track: usize,
        #[command(subcommand)]
        effect: EffectCommand,
    },
    /// Reorder an effect (`dir < 0` earlier, `dir > 0` later).
    Move {
        /// 1-indexed track number.
        track: usize,
        /// Effect id within the track's chain.
        id: u64,
        /// Negative moves earlier, positive moves later.
        dir: i32,
    },
    /// Remove an effect from a track's chain.
    Remove {
        /// 1-indexed track number.
        track: usize,
        /// Effect id within the track's chain.
        id: u64,
    },
    /// Toggle an effect's bypass flag.
    Bypass {
        /// 1-indexed track number.
        track: usize,
        /// Effect id within the track's chain.
        id: u64,
    },
    /// Update one parameter of an effect by key name (e.g. `cutoff_hz`,
    /// `semitones`).
    SetParam {
        /// 1-indexed track number.
        track: usize,
        /// Effect id within the track's chain.
        id: u64,
        /// Parameter name, specific to the effect kind.
        key: String,
        /// New value.
        value: f32,
    },
    /// Undo the track's most recent destructive mutation.
    Undo {
        /// 1-indexed track number.
        track: usize,
    },
    /// Toggle whether the mic monitor is routed to the master bus.
    Monitor,
    /// Confirm an overdub arm despite a flagged loopback risk.
    ConfirmLoopback,
    /// Begin capturing the master mix to the export sink.
    StartMixRecord,
    /// Stop capturing the master mix and write it to `output` as a
    /// canonical 16-bit PCM WAV file (requires the `file_io` feature).
    StopMixRecord {
        /// Destination path for the captured mix-down.
        output: Option<std::path::PathBuf>,
    },
}

/// Effect-specific parameters for the `Effect` subcommand, one variant
/// per entry in [`EffectKind`].
#[derive(Subcommand, Debug, Clone)]
pub enum EffectCommand {
    /// Offline pitch shift in `[-12, 12]` semitones.
    Pitch {
        /// Semitone offset.
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
        /// Threshold in dBFS.
        threshold_db: f32,
        /// Compression ratio.
        ratio: f32,
    },
}

impl From<EffectCommand> for EffectKind {
    fn from(cmd: EffectCommand) -> Self {
        match cmd {
            EffectCommand::Pitch { semitones } => EffectKind::Pitch { semitones },
            EffectCommand::LowPass { cutoff_hz } => EffectKind::LowPass { cutoff_hz },
            EffectCommand::HighPass { cutoff_hz } => EffectKind::HighPass { cutoff_hz },
            EffectCommand::Pan { position } => EffectKind::Pan { position },
            EffectCommand::Delay { time_ms, feedback, mix } => {
                EffectKind::Delay { time_ms, feedback, mix }
            }
            EffectCommand::Compressor { threshold_db, ratio } => {
                EffectKind::Compressor { threshold_db, ratio }
            }
        }
    }
}

impl Command {
    /// Translate a parsed CLI command into the engine's command type.
    pub fn into_session_command(self) -> SessionCommand {
        match self {
            Command::Press { track } => SessionCommand::Track(track, TrackCommand::Press),
            Command::Stop { track } => SessionCommand::Track(track, TrackCommand::Stop),
            Command::Clear { track } => SessionCommand::Track(track, TrackCommand::Clear),
            Command::Divider { track, divider } => {
                SessionCommand::Track(track, TrackCommand::SetDivider(divider))
            }
            Command::Effect { track, effect } => {
                SessionCommand::Track(track, TrackCommand::AddEffect(effect.into()))
            }
            Command::Move { track, id, dir } => SessionCommand::Track(track, TrackCommand::MoveEffect(id, dir)),
            Command::Remove { track, id } => SessionCommand::Track(track, TrackCommand::RemoveEffect(id)),
            Command::Bypass { track, id } => SessionCommand::Track(track, TrackCommand::ToggleBypass(id)),
            Command::SetParam { track, id, key, value } => {
                SessionCommand::Track(track, TrackCommand::SetParam(id, key, value))
            }
            Command::Undo { track } => SessionCommand::Track(track, TrackCommand::Undo),
            Command::Monitor => SessionCommand::ToggleMonitor,
            Command::ConfirmLoopback => SessionCommand::ConfirmLoopback,
            Command::StartMixRecord => SessionCommand::StartMixRecord,
            Command::StopMixRecord { .. } => SessionCommand::StopMixRecord,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_maps_to_track_command() {
        let cmd = Command::Press { track: 2 }.into_session_command();
        assert!(matches!(cmd, SessionCommand::Track(2, TrackCommand::Press)));
    }

    #[test]
    fn effect_pitch_maps_to_add_effect_pitch() {
        let cmd = Command::Effect {
            track: 1,
            effect: EffectCommand::Pitch { semitones: -5 },
        }
        .into_session_command();
        match cmd {
            SessionCommand::Track(1, TrackCommand::AddEffect(EffectKind::Pitch { semitones })) => {
                assert_eq!(semitones, -5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
