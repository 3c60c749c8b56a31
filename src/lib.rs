//! Loop Station Core Library
//!
//! Provides all audio processing, synchronization, and effect capabilities
//! for a professional-grade loop station application.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod core {
    //! Loop track state machine and audio buffer storage
    pub mod buffer;
    pub mod resampler;
    pub mod track;
}

pub mod pitch {
    //! Granular overlap-add pitch engine and its cancellable worker pool
    pub mod engine;
    pub mod pool;
}

pub mod mixer {
    //! Overdub mixing policy
    pub mod overdub;
}

pub mod session {
    //! Session Coordinator: owns the four Loop Tracks and the Transport State
    pub mod coordinator;

    pub use coordinator::Session;
}

pub mod audio {
    //! Audio processing modules
    pub mod analysis;
    pub mod effects;
    pub mod recorder;
    pub mod io {
        //! Audio input/output backends
        #[cfg(feature = "jack_backend")]
        pub mod jack;
        #[cfg(feature = "file_io")]
        pub mod file;
    }
}

pub mod midi {
    //! MIDI control surface input
    #[cfg(feature = "midi")]
    pub mod handler;
}

pub mod sync {
    //! Synchronization and timing
    pub mod clock;
}

pub mod error {
    //! Error handling and logging
    pub mod logger;
    pub mod types;

    pub use types::{LoopEngineError, Result, TrackError};
}

pub mod state {
    //! Application state management
    pub mod config;
    pub mod preset;
    pub mod project;
}

pub mod ui {
    //! User-facing command-line and terminal interfaces
    pub mod cli;
    pub mod tui;
}

/// Re-exports of commonly used types
pub mod prelude {
    pub use crate::{
        audio::effects::{EffectDescriptor, EffectKind, EffectsChain},
        core::track::{LoopTrack, TrackState},
        error::{LoopEngineError, Result},
        session::coordinator::{Session, SessionCommand, SessionEvent, TrackCommand},
        DEFAULT_SAMPLE_RATE,
    };
}

/// Sample rate used throughout the application.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;