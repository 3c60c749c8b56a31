//! Session Coordinator: owns the four Loop Tracks and the Transport State

pub mod coordinator;

pub use coordinator::{DispatchResult, Session, SessionCommand, SessionEvent, TrackCommand};
